use service_core::error::AppError;
use thiserror::Error;

/// Failures of the data store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Duplicate {0}")]
    Duplicate(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<mongodb::bson::ser::Error> for StoreError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<mongodb::bson::de::Error> for StoreError {
    fn from(err: mongodb::bson::de::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Failures reported by the external payment service.
#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Payment gateway not configured")]
    NotConfigured,

    #[error("Payment gateway request failed: {0}")]
    Connection(String),

    #[error("Payment gateway returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Payment order {0} has no purchase amount")]
    MissingAmount(String),

    #[error("Invalid payment gateway response: {0}")]
    InvalidResponse(String),
}

/// Failures of push delivery. These are logged, never returned to callers.
#[derive(Error, Debug)]
pub enum PushError {
    #[error("Push provider not enabled")]
    NotEnabled,

    #[error("Push configuration error: {0}")]
    Configuration(String),

    #[error("Push connection error: {0}")]
    Connection(String),

    #[error("Push send failed: {0}")]
    SendFailed(String),
}

/// Failures of order construction and the invoice ledger.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Quantity must be a positive integer, got {quantity} for product {product_id}")]
    InvalidQuantity { product_id: String, quantity: i64 },

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("No pending invoice")]
    NoPendingInvoice,

    #[error("Invoice not found: {0}")]
    InvoiceNotFound(String),

    #[error("Invoice {id} is {status}, not pending")]
    InvoiceNotPending { id: String, status: String },

    #[error("Amount mismatch: expected {expected:.2}, received {received:.2}")]
    AmountMismatch { expected: f64, received: f64 },

    #[error("Invoice creation failed: {0}")]
    InvoiceCreationFailed(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Payment(#[from] PaymentError),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(what) => {
                AppError::Conflict(anyhow::anyhow!("{} already exists", what))
            }
            other => AppError::DatabaseError(anyhow::Error::new(other)),
        }
    }
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::MissingAmount(_) => AppError::BadRequest(anyhow::Error::new(err)),
            PaymentError::NotConfigured => AppError::ServiceUnavailable,
            other => AppError::BadGateway(other.to_string()),
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::AmountMismatch { expected, received } => AppError::BadRequestWithDetails {
                message: err.to_string(),
                details: serde_json::json!({ "expected": expected, "received": received }),
            },
            LedgerError::Validation(_) | LedgerError::InvalidQuantity { .. } => {
                AppError::BadRequest(anyhow::Error::new(err))
            }
            LedgerError::ProductNotFound(_)
            | LedgerError::UserNotFound(_)
            | LedgerError::NoPendingInvoice
            | LedgerError::InvoiceNotFound(_) => AppError::NotFound(anyhow::Error::new(err)),
            LedgerError::InvoiceNotPending { .. } | LedgerError::Conflict(_) => {
                AppError::Conflict(anyhow::Error::new(err))
            }
            LedgerError::InvoiceCreationFailed(_) => AppError::InternalError(anyhow::Error::new(err)),
            LedgerError::Store(e) => e.into(),
            LedgerError::Payment(e) => e.into(),
        }
    }
}
