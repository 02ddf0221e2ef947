pub mod authorization;
pub mod database;
pub mod error;
pub mod invoices;
pub mod jwt;
pub mod ledger;
pub mod metrics;
pub mod order;
pub mod paypal;
pub mod products;
pub mod push;
pub mod roles;
pub mod store;
pub mod users;

pub use authorization::authorize;
pub use database::{DatabaseHandle, MongoDb};
pub use error::{LedgerError, PaymentError, PushError, StoreError};
pub use invoices::MongoInvoiceStore;
pub use jwt::{AccessTokenClaims, JwtService};
pub use ledger::{InvoiceLedger, PendingPolicy};
pub use self::metrics::{get_metrics, init_metrics};
pub use order::{BuiltOrder, CartItem, build_order};
pub use paypal::{PayPalClient, PaymentDetails, PaymentGateway};
pub use products::MongoProductCatalog;
pub use push::{FcmDispatcher, Notifier, PushDispatcher, PushMessage};
pub use roles::{MongoRoleStore, default_roles, provision_default_roles};
pub use store::{AppendGuard, InvoiceStore, ProductCatalog, RoleStore, UserStore};
pub use users::MongoUserStore;
