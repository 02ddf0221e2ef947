pub mod invoice;
pub mod product;
pub mod role;
pub mod user;

pub use invoice::{
    Invoice, InvoiceBook, InvoiceDetail, InvoiceStats, InvoiceSummary, Order, OrderDetail,
    OrderLine, OrderLineDetail, OrderStatus, PaymentInfo, invoice_timestamp,
};
pub use product::{Product, ProductDetail, ProductImages};
pub use role::{Permission, Role};
pub use user::{ProfileUpdate, User, UserProfile};

/// Generates a store identifier in ObjectId hex form.
pub fn new_id() -> String {
    mongodb::bson::oid::ObjectId::new().to_hex()
}
