//! Application startup and lifecycle management.

use secrecy::ExposeSecret;
use service_core::error::AppError;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;

use crate::config::OrderServiceConfig;
use crate::services::{
    DatabaseHandle, FcmDispatcher, InvoiceLedger, JwtService, MongoInvoiceStore,
    MongoProductCatalog, MongoRoleStore, MongoUserStore, Notifier, PayPalClient, init_metrics,
    provision_default_roles,
};
use crate::{AppState, build_router};

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Opens the store (with retry), provisions default roles, wires the
    /// collaborators and binds the listener.
    pub async fn build(config: OrderServiceConfig) -> Result<Self, AppError> {
        init_metrics().map_err(AppError::InternalError)?;

        let database = Arc::new(DatabaseHandle::new(
            &config.mongodb,
            config.connection.retry(),
        ));
        let db = database.open().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to open MongoDB");
            AppError::from(e)
        })?;
        tracing::info!(database = %config.mongodb.database, "Database initialized");

        let users = Arc::new(MongoUserStore::new(db));
        let roles = Arc::new(MongoRoleStore::new(db));
        let invoices = Arc::new(MongoInvoiceStore::new(db));
        let products = Arc::new(MongoProductCatalog::new(db));

        provision_default_roles(roles.as_ref()).await?;

        let paypal = PayPalClient::new(config.paypal.clone());
        if paypal.is_configured() {
            tracing::info!("PayPal client initialized");
        } else {
            tracing::warn!("PayPal credentials not configured - captures will be rejected");
        }

        if config.fcm.enabled && config.fcm.access_token.expose_secret().is_empty() {
            tracing::warn!("FCM enabled without an access token - notifications will fail");
        }
        let notifier = Notifier::new(Arc::new(FcmDispatcher::new(config.fcm.clone())));

        let ledger = InvoiceLedger::new(invoices, products.clone(), Arc::new(paypal))
            .with_policy(config.ledger.pending_policy())
            .with_payment_method(config.ledger.payment_method.clone());

        let state = AppState {
            users,
            roles,
            products,
            ledger,
            jwt: JwtService::new(&config.jwt),
            notifier,
            database: Some(database),
        };

        // Port 0 binds a random port for testing
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(
            port,
            policy = ?state.ledger.policy(),
            "Order service listening"
        );

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Serves until SIGINT/SIGTERM, then closes the store connection.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let database = self.state.database.clone();
        let router = build_router(self.state);

        axum::serve(
            self.listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        if let Some(database) = database {
            database.close().await;
        }
        tracing::info!("Service shutdown complete");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
