pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;
pub mod utils;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post, put},
    Router,
};
use service_core::middleware::{metrics_middleware, request_id_middleware};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{health, invoice, payment, product, push, stats, user};
use crate::middleware::{auth_middleware, permission_middleware};
use crate::services::{
    DatabaseHandle, InvoiceLedger, JwtService, Notifier, ProductCatalog, RoleStore, UserStore,
};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub roles: Arc<dyn RoleStore>,
    pub products: Arc<dyn ProductCatalog>,
    pub ledger: InvoiceLedger,
    pub jwt: JwtService,
    pub notifier: Notifier,
    /// Absent when the stores are not backed by MongoDB.
    pub database: Option<Arc<DatabaseHandle>>,
}

pub fn build_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics_endpoint))
        .route("/user", post(user::register))
        .route("/user/login", post(user::login))
        .route("/product/barcode/:barcode", get(product::get_by_barcode));

    // Layers run bottom-up: authentication first, then the permission check
    // against the matched route template.
    let protected = Router::new()
        .route("/user", get(user::list_users))
        .route(
            "/user/self",
            get(user::get_self)
                .put(user::update_self)
                .delete(user::archive_self),
        )
        .route("/user/self/password", put(user::change_password))
        .route("/user/:id", get(user::get_user).delete(user::archive_user))
        .route("/user/:id/roles", put(user::assign_roles))
        .route("/product", get(product::list_products))
        .route("/payment/create", post(payment::create_payment))
        .route("/payment/capture", post(payment::capture_payment))
        .route("/invoice", get(invoice::list_all))
        .route("/invoice/self", get(invoice::list_self))
        .route(
            "/invoice/self/:id",
            get(invoice::get_self_by_id).delete(invoice::archive_self),
        )
        .route("/invoice/history/self", get(invoice::history_self))
        .route("/invoice/cancel/self", post(invoice::cancel_self))
        .route("/invoice/:id", delete(invoice::archive_any))
        .route("/stats/earnings", get(stats::earnings))
        .route("/stats/user_total", get(stats::user_total))
        .route("/stats/commande_total", get(stats::order_count))
        .route("/stats/average_spending", get(stats::average_spending))
        .route("/stats/total_product_sold", get(stats::products_sold))
        .route("/push-notification/register-token", post(push::register_token))
        .route("/push-notification/notify", post(push::notify_all))
        .route_layer(from_fn(permission_middleware))
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    public
        .merge(protected)
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
