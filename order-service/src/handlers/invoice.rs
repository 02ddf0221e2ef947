use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::PaginationQuery,
    middleware::Principal,
    models::{Invoice, InvoiceDetail, InvoiceSummary},
    AppState,
};

pub async fn cancel_self(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<Invoice>, AppError> {
    let invoice = state.ledger.cancel_last(&principal.user_id).await?;
    Ok(Json(invoice))
}

/// Invoices of every user, most recent first.
pub async fn list_all(
    State(state): State<AppState>,
    Query(page): Query<PaginationQuery>,
) -> Result<Json<Vec<Invoice>>, AppError> {
    let invoices = state
        .ledger
        .list_invoices(page.start(), page.quantity())
        .await?;
    Ok(Json(invoices))
}

pub async fn list_self(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<Vec<Invoice>>, AppError> {
    Ok(Json(state.ledger.list_user_invoices(&principal.user_id).await?))
}

pub async fn get_self_by_id(
    State(state): State<AppState>,
    principal: Principal,
    Path(invoice_id): Path<String>,
) -> Result<Json<InvoiceDetail>, AppError> {
    let detail = state
        .ledger
        .invoice_detail(&principal.user_id, &invoice_id)
        .await?;
    Ok(Json(detail))
}

pub async fn history_self(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<Vec<InvoiceSummary>>, AppError> {
    Ok(Json(state.ledger.invoice_history(&principal.user_id).await?))
}

pub async fn archive_self(
    State(state): State<AppState>,
    principal: Principal,
    Path(invoice_id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.ledger.archive(&principal.user_id, &invoice_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn archive_any(
    State(state): State<AppState>,
    principal: Principal,
    Path(invoice_id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.ledger.archive_any(&invoice_id).await?;
    tracing::info!(invoice_id = %invoice_id, archived_by = %principal.user_id, "Invoice archived by admin");
    Ok(StatusCode::NO_CONTENT)
}
