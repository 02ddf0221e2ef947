//! Invoice ledger: the lifecycle of invoices embedded in user documents.
//!
//! Order status moves `pending -> paid` (capture) or `pending -> cancelled`
//! (cancel, including the implicit cancel on create). Archival is a separate
//! soft-delete flag. Every write is a single-document atomic update
//! addressed by the invoice's embedded id and conditioned on the status the
//! ledger read, so a transition never lands on an invoice another writer
//! already moved. Create is cancel-then-append, which is two operations and
//! can race unless `PendingPolicy::Strict`.

use chrono::Utc;
use metrics::counter;
use std::collections::HashMap;
use std::sync::Arc;

use super::error::LedgerError;
use super::order::{CartItem, build_order};
use super::paypal::PaymentGateway;
use super::store::{AppendGuard, InvoiceStore, ProductCatalog};
use crate::models::{
    Invoice, InvoiceBook, InvoiceDetail, InvoiceStats, InvoiceSummary, OrderDetail,
    OrderLineDetail, OrderStatus, PaymentInfo, ProductDetail, invoice_timestamp, new_id,
};

/// Largest accepted gap between the invoice total and the captured amount.
pub const AMOUNT_TOLERANCE: f64 = 0.01;
const FLOAT_SLACK: f64 = 1e-9;
const PAYMENT_COMPLETED: &str = "COMPLETED";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PendingPolicy {
    /// Cancel the most recent pending invoice, then append.
    #[default]
    BestEffort,
    /// Cancel every pending invoice, then append only if none is pending;
    /// contention surfaces as `LedgerError::Conflict`.
    Strict,
}

#[derive(Clone)]
pub struct InvoiceLedger {
    invoices: Arc<dyn InvoiceStore>,
    products: Arc<dyn ProductCatalog>,
    payments: Arc<dyn PaymentGateway>,
    policy: PendingPolicy,
    payment_method: String,
}

impl InvoiceLedger {
    pub fn new(
        invoices: Arc<dyn InvoiceStore>,
        products: Arc<dyn ProductCatalog>,
        payments: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            invoices,
            products,
            payments,
            policy: PendingPolicy::default(),
            payment_method: "PAYPAL".to_string(),
        }
    }

    pub fn with_policy(mut self, policy: PendingPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_payment_method(mut self, payment_method: impl Into<String>) -> Self {
        self.payment_method = payment_method.into();
        self
    }

    pub fn policy(&self) -> PendingPolicy {
        self.policy
    }

    async fn book(&self, user_id: &str) -> Result<InvoiceBook, LedgerError> {
        self.invoices
            .user_invoices(user_id)
            .await?
            .ok_or_else(|| LedgerError::UserNotFound(user_id.to_string()))
    }

    /// Writes `invoice` back if the stored element is still pending.
    async fn persist_transition(&self, user_id: &str, invoice: &Invoice) -> Result<(), LedgerError> {
        if self
            .invoices
            .replace_invoice(user_id, invoice, OrderStatus::Pending)
            .await?
        {
            return Ok(());
        }
        Err(LedgerError::Conflict(format!(
            "invoice {} changed concurrently",
            invoice.id
        )))
    }

    async fn persist_cancel(
        &self,
        user_id: &str,
        book: &mut InvoiceBook,
        invoice_id: &str,
    ) -> Result<Invoice, LedgerError> {
        let cancelled = book
            .update(invoice_id, Invoice::cancel)
            .cloned()
            .ok_or_else(|| LedgerError::InvoiceNotFound(invoice_id.to_string()))?;

        self.persist_transition(user_id, &cancelled).await?;

        counter!("invoices_cancelled_total").increment(1);
        tracing::info!(user_id = %user_id, invoice_id = %cancelled.id, "Invoice cancelled");
        Ok(cancelled)
    }

    /// Creates a pending invoice for `cart`, superseding the previous
    /// pending one.
    ///
    /// The order is built first so an invalid cart leaves existing invoices
    /// untouched.
    #[tracing::instrument(skip(self, cart), fields(items = cart.len()))]
    pub async fn create(&self, user_id: &str, cart: &[CartItem]) -> Result<Invoice, LedgerError> {
        let built = build_order(self.products.as_ref(), cart, &self.payment_method).await?;
        let mut book = self.book(user_id).await?;

        let superseded: Vec<String> = match self.policy {
            PendingPolicy::BestEffort => book
                .most_recent()
                .filter(|invoice| invoice.is_pending())
                .map(|invoice| invoice.id.clone())
                .into_iter()
                .collect(),
            PendingPolicy::Strict => book.pending().map(|invoice| invoice.id.clone()).collect(),
        };
        for invoice_id in &superseded {
            self.persist_cancel(user_id, &mut book, invoice_id).await?;
        }

        let guard = match self.policy {
            PendingPolicy::BestEffort => AppendGuard::Unconditional,
            PendingPolicy::Strict => AppendGuard::NoPendingInvoice,
        };

        let invoice = Invoice {
            id: new_id(),
            date: invoice_timestamp(Utc::now()),
            total_price: built.total_price,
            order: built.order,
            archived: false,
        };

        if !self.invoices.push_invoice(user_id, &invoice, guard).await? {
            return Err(match guard {
                AppendGuard::NoPendingInvoice => LedgerError::Conflict(
                    "another pending invoice was created concurrently".to_string(),
                ),
                AppendGuard::Unconditional => {
                    LedgerError::InvoiceCreationFailed(format!("user {} vanished", user_id))
                }
            });
        }

        let created = self
            .invoices
            .user_invoices(user_id)
            .await?
            .and_then(|book| book.get(&invoice.id).cloned())
            .ok_or_else(|| {
                LedgerError::InvoiceCreationFailed(format!(
                    "invoice {} not readable after append",
                    invoice.id
                ))
            })?;

        counter!("invoices_created_total").increment(1);
        tracing::info!(
            user_id = %user_id,
            invoice_id = %created.id,
            total_price = created.total_price,
            "Invoice created"
        );
        Ok(created)
    }

    /// Reconciles an external payment against the most recent invoice and
    /// marks it paid.
    #[tracing::instrument(skip(self))]
    pub async fn capture(&self, user_id: &str, paypal_order_id: &str) -> Result<Invoice, LedgerError> {
        let details = self.payments.payment_details(paypal_order_id).await?;
        let mut book = self.book(user_id).await?;

        let last = book
            .most_recent()
            .filter(|invoice| invoice.is_pending())
            .ok_or(LedgerError::NoPendingInvoice)?;
        let last_id = last.id.clone();

        if (last.total_price - details.amount).abs() > AMOUNT_TOLERANCE + FLOAT_SLACK {
            counter!("invoice_amount_mismatch_total").increment(1);
            tracing::warn!(
                user_id = %user_id,
                invoice_id = %last.id,
                expected = last.total_price,
                received = details.amount,
                "Captured amount does not match invoice total"
            );
            return Err(LedgerError::AmountMismatch {
                expected: last.total_price,
                received: details.amount,
            });
        }

        let paid = book
            .update(&last_id, |invoice| {
                invoice.order.status = OrderStatus::Paid;
                invoice.order.payment_info = Some(PaymentInfo {
                    paypal_order_id: Some(paypal_order_id.to_string()),
                    status: Some(PAYMENT_COMPLETED.to_string()),
                });
            })
            .cloned()
            .ok_or_else(|| LedgerError::InvoiceNotFound(last_id.clone()))?;

        self.persist_transition(user_id, &paid).await?;

        counter!("invoices_captured_total").increment(1);
        tracing::info!(
            user_id = %user_id,
            invoice_id = %paid.id,
            amount = details.amount,
            currency = %details.currency,
            "Invoice paid"
        );
        Ok(paid)
    }

    /// Cancels and archives the most recent invoice.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_last(&self, user_id: &str) -> Result<Invoice, LedgerError> {
        let mut book = self.book(user_id).await?;
        let last = book.most_recent().ok_or(LedgerError::NoPendingInvoice)?;

        if !last.is_pending() {
            return Err(LedgerError::InvoiceNotPending {
                id: last.id.clone(),
                status: last.status().to_string(),
            });
        }

        let last_id = last.id.clone();
        self.persist_cancel(user_id, &mut book, &last_id).await
    }

    /// One invoice with each line joined to the product's current catalog
    /// entry. Lines whose product left the catalog carry `product: None`.
    #[tracing::instrument(skip(self))]
    pub async fn invoice_detail(
        &self,
        user_id: &str,
        invoice_id: &str,
    ) -> Result<InvoiceDetail, LedgerError> {
        let book = self.book(user_id).await?;
        let invoice = book
            .get(invoice_id)
            .ok_or_else(|| LedgerError::InvoiceNotFound(invoice_id.to_string()))?;

        let mut ids: Vec<String> = invoice
            .order
            .products
            .iter()
            .map(|line| line.product_id.clone())
            .collect();
        ids.sort();
        ids.dedup();

        let catalog: HashMap<String, ProductDetail> = self
            .products
            .products_by_ids(&ids)
            .await?
            .iter()
            .map(|product| (product.id.clone(), ProductDetail::from(product)))
            .collect();

        let lines = invoice
            .order
            .products
            .iter()
            .map(|line| OrderLineDetail {
                product_id: line.product_id.clone(),
                product: catalog.get(&line.product_id).cloned(),
                quantity: line.quantity,
                price: line.price,
            })
            .collect();

        Ok(InvoiceDetail {
            id: invoice.id.clone(),
            date: invoice.date.clone(),
            total_price: invoice.total_price,
            order: OrderDetail {
                id: invoice.order.id.clone(),
                date: invoice.order.date,
                status: invoice.order.status,
                products: lines,
                payment_method: invoice.order.payment_method.clone(),
                payment_info: invoice.order.payment_info.clone(),
            },
            archived: invoice.archived,
        })
    }

    /// Soft-deletes one of the user's invoices. Archiving twice is not an error.
    #[tracing::instrument(skip(self))]
    pub async fn archive(&self, user_id: &str, invoice_id: &str) -> Result<(), LedgerError> {
        if !self.invoices.archive_invoice(user_id, invoice_id).await? {
            return Err(LedgerError::InvoiceNotFound(invoice_id.to_string()));
        }
        tracing::info!(user_id = %user_id, invoice_id = %invoice_id, "Invoice archived");
        Ok(())
    }

    /// Archives an invoice of any user, locating its owner first.
    pub async fn archive_any(&self, invoice_id: &str) -> Result<(), LedgerError> {
        let owner = self
            .invoices
            .find_invoice_owner(invoice_id)
            .await?
            .ok_or_else(|| LedgerError::InvoiceNotFound(invoice_id.to_string()))?;
        self.archive(&owner, invoice_id).await
    }

    pub async fn list_user_invoices(&self, user_id: &str) -> Result<Vec<Invoice>, LedgerError> {
        Ok(self.book(user_id).await?.into_vec())
    }

    pub async fn invoice_history(&self, user_id: &str) -> Result<Vec<InvoiceSummary>, LedgerError> {
        let book = self.book(user_id).await?;
        let mut history: Vec<InvoiceSummary> = book.iter().map(Invoice::summary).collect();
        history.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(history)
    }

    pub async fn list_invoices(&self, start: u64, quantity: i64) -> Result<Vec<Invoice>, LedgerError> {
        if quantity <= 0 {
            return Err(LedgerError::Validation(
                "quantity must be positive".to_string(),
            ));
        }
        let skip = i64::try_from(start)
            .map_err(|_| LedgerError::Validation(format!("start {} is out of range", start)))?;
        Ok(self.invoices.list_invoices(skip, quantity).await?)
    }

    pub async fn stats(&self) -> Result<InvoiceStats, LedgerError> {
        Ok(self.invoices.invoice_stats().await?)
    }
}
