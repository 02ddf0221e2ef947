use axum::{extract::State, Json};
use service_core::error::AppError;

use crate::{
    dtos::{
        AverageSpendingResponse, EarningsResponse, OrderCountResponse, ProductsSoldResponse,
        UserCountResponse,
    },
    AppState,
};

pub async fn earnings(State(state): State<AppState>) -> Result<Json<EarningsResponse>, AppError> {
    let stats = state.ledger.stats().await?;
    Ok(Json(EarningsResponse {
        earnings: stats.earnings,
    }))
}

pub async fn order_count(
    State(state): State<AppState>,
) -> Result<Json<OrderCountResponse>, AppError> {
    let stats = state.ledger.stats().await?;
    Ok(Json(OrderCountResponse {
        total_commande: stats.order_count,
    }))
}

pub async fn average_spending(
    State(state): State<AppState>,
) -> Result<Json<AverageSpendingResponse>, AppError> {
    let stats = state.ledger.stats().await?;
    Ok(Json(AverageSpendingResponse {
        average_spending: stats.average_spending,
    }))
}

pub async fn products_sold(
    State(state): State<AppState>,
) -> Result<Json<ProductsSoldResponse>, AppError> {
    let stats = state.ledger.stats().await?;
    Ok(Json(ProductsSoldResponse {
        total_product_sold: stats.products_sold,
    }))
}

pub async fn user_total(State(state): State<AppState>) -> Result<Json<UserCountResponse>, AppError> {
    Ok(Json(UserCountResponse {
        total_user: state.users.count_users().await?,
    }))
}
