//! Data-store seams. Handlers and the ledger depend on these traits; MongoDB
//! implementations live in sibling modules and tests supply in-memory ones.

use async_trait::async_trait;

use super::error::StoreError;
use crate::models::{
    Invoice, InvoiceBook, InvoiceStats, OrderStatus, Product, ProfileUpdate, Role, User,
};

/// Extra condition applied to an invoice append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendGuard {
    /// Append unconditionally.
    Unconditional,
    /// Append only if none of the user's invoices is pending.
    NoPendingInvoice,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `StoreError::Duplicate` when the email is taken.
    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;

    async fn find_user(&self, id: &str) -> Result<Option<User>, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Replaces the user's role snapshot. Returns false if the user is unknown.
    async fn set_roles(&self, user_id: &str, roles: &[Role]) -> Result<bool, StoreError>;

    async fn set_device_token(&self, user_id: &str, token: &str) -> Result<bool, StoreError>;

    /// Device tokens of every non-archived user that registered one.
    async fn device_tokens(&self) -> Result<Vec<String>, StoreError>;

    /// Applies the present fields. Returns false if the user is unknown.
    async fn update_profile(&self, user_id: &str, changes: &ProfileUpdate)
        -> Result<bool, StoreError>;

    async fn set_password(&self, user_id: &str, password_hash: &str) -> Result<bool, StoreError>;

    /// Soft-deletes the user. Archiving twice is not an error.
    async fn archive_user(&self, user_id: &str) -> Result<bool, StoreError>;

    /// Non-archived users in insertion order.
    async fn list_users(&self, skip: i64, limit: i64) -> Result<Vec<User>, StoreError>;

    async fn count_users(&self) -> Result<u64, StoreError>;
}

/// Access to the invoices embedded in user documents. Every mutation is a
/// single-document atomic update addressed by the invoice's embedded id.
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// `None` when the user does not exist.
    async fn user_invoices(&self, user_id: &str) -> Result<Option<InvoiceBook>, StoreError>;

    /// Appends to the user's invoice array. Returns false when the user or
    /// the guard condition did not match.
    async fn push_invoice(
        &self,
        user_id: &str,
        invoice: &Invoice,
        guard: AppendGuard,
    ) -> Result<bool, StoreError>;

    /// Overwrites the element whose id equals `invoice.id`, provided its
    /// stored status is still `expected`. Returns false when no element
    /// matches both.
    async fn replace_invoice(
        &self,
        user_id: &str,
        invoice: &Invoice,
        expected: OrderStatus,
    ) -> Result<bool, StoreError>;

    /// Sets the archived flag. Returns false when no such element exists;
    /// an already archived invoice still matches.
    async fn archive_invoice(&self, user_id: &str, invoice_id: &str) -> Result<bool, StoreError>;

    async fn find_invoice_owner(&self, invoice_id: &str) -> Result<Option<String>, StoreError>;

    /// Invoices of all users, most recent first.
    async fn list_invoices(&self, skip: i64, limit: i64) -> Result<Vec<Invoice>, StoreError>;

    /// Aggregates over paid invoices of all users.
    async fn invoice_stats(&self) -> Result<InvoiceStats, StoreError>;
}

#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn product_by_id(&self, id: &str) -> Result<Option<Product>, StoreError>;

    async fn product_by_reference(&self, reference: &str) -> Result<Option<Product>, StoreError>;

    /// Non-archived products, ordered by name.
    async fn list_products(&self, skip: i64, limit: i64) -> Result<Vec<Product>, StoreError>;

    /// Batch lookup; unknown ids are simply absent from the result.
    async fn products_by_ids(&self, ids: &[String]) -> Result<Vec<Product>, StoreError>;
}

#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Provisioning only. Fails with `StoreError::Duplicate` on a taken name.
    async fn create_role(&self, role: &Role) -> Result<(), StoreError>;

    async fn role_by_name(&self, name: &str) -> Result<Option<Role>, StoreError>;

    async fn role_by_id(&self, id: &str) -> Result<Option<Role>, StoreError>;

    async fn roles_by_names(&self, names: &[String]) -> Result<Vec<Role>, StoreError>;

    async fn roles_by_ids(&self, ids: &[String]) -> Result<Vec<Role>, StoreError>;
}
