use mongodb::{
    Client as MongoClient, Collection, Database, IndexModel,
    bson::doc,
    error::{ErrorKind, WriteFailure},
    options::{ClientOptions, IndexOptions},
};
use secrecy::{ExposeSecret, Secret};
use service_core::retry::{RetryConfig, retry_with_backoff};
use std::time::Duration;
use tokio::sync::OnceCell;

use super::error::StoreError;
use crate::config::MongoConfig;

pub const USERS_COLLECTION: &str = "users";
pub const PRODUCTS_COLLECTION: &str = "products";
pub const ROLES_COLLECTION: &str = "roles";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DUPLICATE_KEY: i32 = 11000;

#[derive(Clone)]
pub struct MongoDb {
    client: MongoClient,
    db: Database,
}

impl MongoDb {
    /// Connects and pings, so an unreachable server fails here rather than
    /// on the first request.
    pub async fn connect(uri: &str, database: &str) -> Result<Self, StoreError> {
        let mut options = ClientOptions::parse(uri).await?;
        options.app_name = Some("order-service".to_string());
        options.connect_timeout = Some(CONNECT_TIMEOUT);
        options.server_selection_timeout = Some(CONNECT_TIMEOUT);

        let client = MongoClient::with_options(options)?;
        let db = client.database(database);
        db.run_command(doc! { "ping": 1 }, None).await?;

        tracing::info!(database = %database, "Connected to MongoDB");
        Ok(Self { client, db })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn collection<T>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    pub async fn initialize_indexes(&self) -> Result<(), StoreError> {
        tracing::info!("Creating MongoDB indexes for order-service");

        let users = self.collection::<mongodb::bson::Document>(USERS_COLLECTION);
        users
            .create_indexes(
                [
                    IndexModel::builder()
                        .keys(doc! { "email": 1 })
                        .options(
                            IndexOptions::builder()
                                .name("email_unique_idx".to_string())
                                .unique(true)
                                .build(),
                        )
                        .build(),
                    IndexModel::builder()
                        .keys(doc! { "invoices._id": 1 })
                        .options(
                            IndexOptions::builder()
                                .name("invoice_id_idx".to_string())
                                .build(),
                        )
                        .build(),
                ],
                None,
            )
            .await?;

        self.collection::<mongodb::bson::Document>(ROLES_COLLECTION)
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "name": 1 })
                    .options(
                        IndexOptions::builder()
                            .name("role_name_unique_idx".to_string())
                            .unique(true)
                            .build(),
                    )
                    .build(),
                None,
            )
            .await?;

        self.collection::<mongodb::bson::Document>(PRODUCTS_COLLECTION)
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "reference": 1 })
                    .options(
                        IndexOptions::builder()
                            .name("product_reference_idx".to_string())
                            .build(),
                    )
                    .build(),
                None,
            )
            .await?;

        tracing::info!("MongoDB indexes initialized");
        Ok(())
    }

    pub async fn shutdown(&self) {
        self.client.clone().shutdown().await;
    }
}

/// Store handle with an explicit lifecycle. `open` connects at most once
/// per handle; concurrent callers wait on the same attempt.
pub struct DatabaseHandle {
    uri: Secret<String>,
    database: String,
    retry: RetryConfig,
    cell: OnceCell<MongoDb>,
}

impl DatabaseHandle {
    pub fn new(config: &MongoConfig, retry: RetryConfig) -> Self {
        Self {
            uri: config.uri.clone(),
            database: config.database.clone(),
            retry,
            cell: OnceCell::new(),
        }
    }

    pub async fn open(&self) -> Result<&MongoDb, StoreError> {
        self.cell
            .get_or_try_init(|| async {
                let db = retry_with_backoff(&self.retry, "mongodb_connect", || {
                    MongoDb::connect(self.uri.expose_secret(), &self.database)
                })
                .await
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;

                db.initialize_indexes().await?;
                Ok(db)
            })
            .await
    }

    pub fn is_open(&self) -> bool {
        self.cell.initialized()
    }

    pub async fn close(&self) {
        if let Some(db) = self.cell.get() {
            db.shutdown().await;
            tracing::info!("MongoDB connection closed");
        }
    }
}

pub(crate) fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY,
        ErrorKind::BulkWrite(failure) => failure
            .write_errors
            .as_ref()
            .is_some_and(|errors| errors.iter().any(|e| e.code == DUPLICATE_KEY)),
        _ => false,
    }
}
