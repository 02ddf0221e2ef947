use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::product::ProductDetail;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One order line. `price` is the line total (unit price times quantity)
/// captured when the order was built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: String,
    pub quantity: i64,
    pub price: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paypal_order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub date: DateTime<Utc>,
    pub status: OrderStatus,
    pub products: Vec<OrderLine>,
    pub payment_method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_info: Option<PaymentInfo>,
}

impl Order {
    pub fn total_price(&self) -> f64 {
        self.products.iter().map(|line| line.price).sum()
    }
}

/// An invoice embedded in its owner's user document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    /// Fixed-width RFC 3339 timestamp; lexicographic order is chronological.
    pub date: String,
    pub total_price: f64,
    pub order: Order,
    #[serde(default)]
    pub archived: bool,
}

impl Invoice {
    pub fn status(&self) -> OrderStatus {
        self.order.status
    }

    pub fn is_pending(&self) -> bool {
        self.order.status == OrderStatus::Pending
    }

    /// Marks the invoice superseded: cancelled and archived together.
    pub fn cancel(&mut self) {
        self.order.status = OrderStatus::Cancelled;
        self.archived = true;
    }

    pub fn summary(&self) -> InvoiceSummary {
        InvoiceSummary {
            id: self.id.clone(),
            date: self.date.clone(),
            total_price: self.total_price,
        }
    }
}

/// Timestamp format used for invoice dates.
pub fn invoice_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A user's invoices, addressed by their stable embedded id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvoiceBook {
    invoices: Vec<Invoice>,
}

impl InvoiceBook {
    pub fn new(invoices: Vec<Invoice>) -> Self {
        Self { invoices }
    }

    pub fn get(&self, id: &str) -> Option<&Invoice> {
        self.invoices.iter().find(|invoice| invoice.id == id)
    }

    /// The invoice with the greatest date string.
    pub fn most_recent(&self) -> Option<&Invoice> {
        self.invoices.iter().max_by(|a, b| a.date.cmp(&b.date))
    }

    /// Applies `f` to the invoice with the given id and returns the updated copy.
    pub fn update<F>(&mut self, id: &str, f: F) -> Option<&Invoice>
    where
        F: FnOnce(&mut Invoice),
    {
        let invoice = self.invoices.iter_mut().find(|invoice| invoice.id == id)?;
        f(invoice);
        Some(invoice)
    }

    pub fn pending(&self) -> impl Iterator<Item = &Invoice> {
        self.invoices.iter().filter(|invoice| invoice.is_pending())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Invoice> {
        self.invoices.iter()
    }

    pub fn into_vec(self) -> Vec<Invoice> {
        self.invoices
    }
}

impl From<Vec<Invoice>> for InvoiceBook {
    fn from(invoices: Vec<Invoice>) -> Self {
        Self::new(invoices)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceSummary {
    pub id: String,
    pub date: String,
    pub total_price: f64,
}

/// Order line joined with the product's current catalog entry. `quantity`
/// and `price` are always the values recorded at purchase time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineDetail {
    pub product_id: String,
    pub product: Option<ProductDetail>,
    pub quantity: i64,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    pub id: String,
    pub date: DateTime<Utc>,
    pub status: OrderStatus,
    pub products: Vec<OrderLineDetail>,
    pub payment_method: String,
    pub payment_info: Option<PaymentInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDetail {
    pub id: String,
    pub date: String,
    pub total_price: f64,
    pub order: OrderDetail,
    pub archived: bool,
}

/// Aggregates over paid invoices.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceStats {
    pub earnings: f64,
    pub order_count: u64,
    pub average_spending: f64,
    pub products_sold: i64,
}

impl InvoiceStats {
    /// Folds the paid invoices out of `invoices`; other statuses are ignored.
    pub fn from_invoices<'a, I>(invoices: I) -> Self
    where
        I: IntoIterator<Item = &'a Invoice>,
    {
        let mut stats = InvoiceStats::default();
        for invoice in invoices.into_iter().filter(|i| i.status() == OrderStatus::Paid) {
            stats.earnings += invoice.total_price;
            stats.order_count += 1;
            stats.products_sold += invoice.order.products.iter().map(|l| l.quantity).sum::<i64>();
        }
        if stats.order_count > 0 {
            stats.average_spending = stats.earnings / stats.order_count as f64;
        }
        stats
    }
}
