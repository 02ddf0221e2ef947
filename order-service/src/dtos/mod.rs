use serde::{Deserialize, Serialize};
use validator::Validate;

use service_core::error::AppError;

use crate::models::ProfileUpdate;
use crate::services::CartItem;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "firstName is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "lastName is required"))]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, message = "firstName must not be empty"))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, message = "lastName must not be empty"))]
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
}

impl From<UpdateProfileRequest> for ProfileUpdate {
    fn from(req: UpdateProfileRequest) -> Self {
        Self {
            first_name: req.first_name,
            last_name: req.last_name,
            phone_number: req.phone_number,
            address: req.address,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "currentPassword is required"))]
    pub current_password: String,
    #[validate(length(min = 8, message = "newPassword must be at least 8 characters"))]
    pub new_password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AssignRolesRequest {
    #[validate(length(min = 1, message = "at least one role is required"))]
    pub roles: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePaymentRequest {
    #[validate(length(min = 1, message = "cart must not be empty"))]
    #[validate(nested)]
    pub cart: Vec<CartItem>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CapturePaymentRequest {
    #[validate(length(min = 1, message = "paypalOrderId is required"))]
    pub paypal_order_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub message: String,
    pub invoice_id: String,
}

#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    pub start: Option<u64>,
    pub quantity: Option<i64>,
}

impl PaginationQuery {
    pub const DEFAULT_QUANTITY: i64 = 10;

    pub fn start(&self) -> u64 {
        self.start.unwrap_or(0)
    }

    pub fn quantity(&self) -> i64 {
        self.quantity.unwrap_or(Self::DEFAULT_QUANTITY)
    }

    /// `(skip, limit)` for a store query.
    pub fn window(&self) -> Result<(i64, i64), AppError> {
        let skip = i64::try_from(self.start()).map_err(|_| {
            AppError::BadRequest(anyhow::anyhow!("start {} is out of range", self.start()))
        })?;
        let limit = self.quantity();
        if limit <= 0 {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "quantity must be positive"
            )));
        }
        Ok((skip, limit))
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterTokenRequest {
    #[validate(length(min = 1, message = "token is required"))]
    pub token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NotifyRequest {
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "body is required"))]
    pub body: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EarningsResponse {
    pub earnings: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderCountResponse {
    pub total_commande: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AverageSpendingResponse {
    pub average_spending: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProductsSoldResponse {
    pub total_product_sold: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserCountResponse {
    pub total_user: u64,
}
