use axum::{
    extract::{Path, Query, State},
    Json,
};
use service_core::error::AppError;

use crate::{dtos::PaginationQuery, models::Product, AppState};

pub async fn list_products(
    State(state): State<AppState>,
    Query(page): Query<PaginationQuery>,
) -> Result<Json<Vec<Product>>, AppError> {
    let (skip, limit) = page.window()?;
    Ok(Json(state.products.list_products(skip, limit).await?))
}

/// Looks a product up by its barcode (the catalog reference).
pub async fn get_by_barcode(
    State(state): State<AppState>,
    Path(barcode): Path<String>,
) -> Result<Json<Product>, AppError> {
    state
        .products
        .product_by_reference(&barcode)
        .await?
        .filter(|product| !product.archived)
        .map(Json)
        .ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("Product with barcode {} not found", barcode))
        })
}
