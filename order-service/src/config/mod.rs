use secrecy::Secret;
use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use service_core::retry::RetryConfig;
use std::env;
use std::time::Duration;

use crate::services::ledger::PendingPolicy;

#[derive(Debug, Clone, Deserialize)]
pub struct OrderServiceConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub service_name: String,
    pub mongodb: MongoConfig,
    pub connection: ConnectionConfig,
    pub jwt: JwtConfig,
    pub paypal: PayPalConfig,
    pub fcm: FcmConfig,
    pub ledger: LedgerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    pub uri: Secret<String>,
    pub database: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl ConnectionConfig {
    pub fn retry(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            ..RetryConfig::default()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: Secret<String>,
    pub expiry_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PayPalConfig {
    pub client_id: String,
    pub secret: Secret<String>,
    pub api_base: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FcmConfig {
    pub project_id: String,
    pub access_token: Secret<String>,
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    pub strict_single_pending: bool,
    pub payment_method: String,
}

impl LedgerConfig {
    pub fn pending_policy(&self) -> PendingPolicy {
        if self.strict_single_pending {
            PendingPolicy::Strict
        } else {
            PendingPolicy::BestEffort
        }
    }
}

impl OrderServiceConfig {
    pub fn load() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        Ok(OrderServiceConfig {
            common,
            service_name: get_env("SERVICE_NAME", Some("order-service"), false)?,
            mongodb: MongoConfig {
                uri: Secret::new(get_env(
                    "MONGODB_URI",
                    Some("mongodb://localhost:27017"),
                    is_prod,
                )?),
                database: get_env("MONGODB_DATABASE", Some("order_db"), is_prod)?,
            },
            connection: ConnectionConfig {
                max_attempts: parse_env("DB_CONNECT_MAX_ATTEMPTS", 5)?,
                initial_backoff_ms: parse_env("DB_CONNECT_INITIAL_BACKOFF_MS", 1000)?,
                max_backoff_ms: parse_env("DB_CONNECT_MAX_BACKOFF_MS", 30_000)?,
            },
            jwt: JwtConfig {
                secret: Secret::new(get_env("JWT_SECRET", Some("dev-secret-change-me"), is_prod)?),
                expiry_hours: parse_env("JWT_EXPIRY_HOURS", 72)?,
            },
            paypal: PayPalConfig {
                client_id: get_env("PAYPAL_CLIENT_ID", Some(""), is_prod)?,
                secret: Secret::new(get_env("PAYPAL_SECRET", Some(""), is_prod)?),
                api_base: get_env(
                    "PAYPAL_API_BASE",
                    Some("https://api-m.sandbox.paypal.com"),
                    false,
                )?,
            },
            fcm: FcmConfig {
                project_id: get_env("FCM_PROJECT_ID", Some(""), false)?,
                access_token: Secret::new(get_env("FCM_ACCESS_TOKEN", Some(""), false)?),
                enabled: parse_env("FCM_ENABLED", false)?,
            },
            ledger: LedgerConfig {
                strict_single_pending: parse_env("LEDGER_STRICT_SINGLE_PENDING", false)?,
                payment_method: get_env("LEDGER_PAYMENT_METHOD", Some("PAYPAL"), false)?,
            },
        })
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val.trim().parse().map_err(|e: T::Err| {
            AppError::ConfigError(anyhow::anyhow!("{} has invalid value '{}': {}", key, val, e))
        }),
        Err(_) => Ok(default),
    }
}
