use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use service_core::error::AppError;
use validator::Validate;

use crate::{
    dtos::{CapturePaymentRequest, CreatePaymentRequest, PaymentResponse},
    middleware::Principal,
    AppState,
};

/// Opens a pending invoice for the cart, superseding the caller's previous
/// pending one.
pub async fn create_payment(
    State(state): State<AppState>,
    principal: Principal,
    Json(req): Json<CreatePaymentRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let invoice = state.ledger.create(&principal.user_id, &req.cart).await?;

    Ok((
        StatusCode::CREATED,
        Json(PaymentResponse {
            message: "Order created successfully".to_string(),
            invoice_id: invoice.id,
        }),
    ))
}

/// Marks the caller's pending invoice paid once the external amount matches.
pub async fn capture_payment(
    State(state): State<AppState>,
    principal: Principal,
    Json(req): Json<CapturePaymentRequest>,
) -> Result<Json<PaymentResponse>, AppError> {
    req.validate()?;

    let invoice = state
        .ledger
        .capture(&principal.user_id, &req.paypal_order_id)
        .await?;

    Ok(Json(PaymentResponse {
        message: "Order updated successfully".to_string(),
        invoice_id: invoice.id,
    }))
}
