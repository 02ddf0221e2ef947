use chrono::Utc;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::error::LedgerError;
use super::store::ProductCatalog;
use crate::models::{Order, OrderLine, OrderStatus, new_id};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    #[validate(length(min = 1, message = "productId is required"))]
    pub product_id: String,
    pub quantity: i64,
}

impl CartItem {
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// A pending order and its total, ready to be wrapped in an invoice.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltOrder {
    pub order: Order,
    pub total_price: f64,
}

/// Builds a pending order from a cart.
///
/// Every quantity is checked before any catalog lookup. A missing product
/// aborts the whole order. Line prices are `price_vat * quantity`.
#[tracing::instrument(skip(catalog, cart), fields(items = cart.len()))]
pub async fn build_order(
    catalog: &dyn ProductCatalog,
    cart: &[CartItem],
    payment_method: &str,
) -> Result<BuiltOrder, LedgerError> {
    if cart.is_empty() {
        return Err(LedgerError::Validation(
            "cart must contain at least one item".to_string(),
        ));
    }

    if let Some(item) = cart.iter().find(|item| item.quantity <= 0) {
        return Err(LedgerError::InvalidQuantity {
            product_id: item.product_id.clone(),
            quantity: item.quantity,
        });
    }

    let mut lines = Vec::with_capacity(cart.len());
    let mut total_price = 0.0;

    for item in cart {
        let product = catalog
            .product_by_id(&item.product_id)
            .await?
            .ok_or_else(|| LedgerError::ProductNotFound(item.product_id.clone()))?;

        let price = product.price_vat * item.quantity as f64;
        total_price += price;
        lines.push(OrderLine {
            product_id: item.product_id.clone(),
            quantity: item.quantity,
            price,
        });
    }

    Ok(BuiltOrder {
        order: Order {
            id: new_id(),
            date: Utc::now(),
            status: OrderStatus::Pending,
            products: lines,
            payment_method: payment_method.to_string(),
            payment_info: None,
        },
        total_price,
    })
}
