use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::PushError;
use super::store::UserStore;
use crate::config::FcmConfig;

const FCM_API_URL: &str = "https://fcm.googleapis.com/v1/projects";

#[derive(Debug, Clone, PartialEq)]
pub struct PushMessage {
    pub device_token: String,
    pub title: String,
    pub body: String,
}

#[async_trait]
pub trait PushDispatcher: Send + Sync {
    async fn send(&self, push: &PushMessage) -> Result<(), PushError>;
    fn is_enabled(&self) -> bool;
}

/// FCM HTTP v1 dispatcher using a pre-issued OAuth2 access token.
pub struct FcmDispatcher {
    config: FcmConfig,
    client: Client,
    api_url: String,
}

#[derive(Debug, Serialize)]
struct FcmRequest<'a> {
    message: FcmMessage<'a>,
}

#[derive(Debug, Serialize)]
struct FcmMessage<'a> {
    token: &'a str,
    notification: FcmNotification<'a>,
}

#[derive(Debug, Serialize)]
struct FcmNotification<'a> {
    title: &'a str,
    body: &'a str,
}

#[derive(Debug, Deserialize)]
struct FcmErrorBody {
    error: Option<FcmError>,
}

#[derive(Debug, Deserialize)]
struct FcmError {
    message: String,
    status: String,
}

impl FcmDispatcher {
    pub fn new(config: FcmConfig) -> Self {
        Self::with_api_url(config, FCM_API_URL)
    }

    pub fn with_api_url(config: FcmConfig, api_url: &str) -> Self {
        Self {
            config,
            client: Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl PushDispatcher for FcmDispatcher {
    async fn send(&self, push: &PushMessage) -> Result<(), PushError> {
        if !self.config.enabled {
            return Err(PushError::NotEnabled);
        }
        if self.config.project_id.is_empty() {
            return Err(PushError::Configuration(
                "FCM project_id is not configured".to_string(),
            ));
        }
        let access_token = self.config.access_token.expose_secret();
        if access_token.is_empty() {
            return Err(PushError::Configuration(
                "FCM access token is not configured".to_string(),
            ));
        }

        let request = FcmRequest {
            message: FcmMessage {
                token: &push.device_token,
                notification: FcmNotification {
                    title: &push.title,
                    body: &push.body,
                },
            },
        };

        let url = format!("{}/{}/messages:send", self.api_url, self.config.project_id);

        let response = self
            .client
            .post(&url)
            .bearer_auth(access_token)
            .json(&request)
            .send()
            .await
            .map_err(|e| PushError::Connection(format!("Failed to connect to FCM: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<FcmErrorBody>(&body)
                .ok()
                .and_then(|b| b.error)
                .map(|e| format!("{} ({})", e.message, e.status))
                .unwrap_or(body);
            return Err(PushError::SendFailed(format!(
                "FCM API returned {}: {}",
                status, detail
            )));
        }

        tracing::debug!("Push notification delivered via FCM");
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }
}

/// Fire-and-forget broadcaster. Delivery runs on a background task and
/// failures are only logged.
#[derive(Clone)]
pub struct Notifier {
    dispatcher: Arc<dyn PushDispatcher>,
}

impl Notifier {
    pub fn new(dispatcher: Arc<dyn PushDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Spawns delivery to each token and returns immediately.
    pub fn notify(
        &self,
        device_tokens: Vec<String>,
        title: String,
        body: String,
    ) -> tokio::task::JoinHandle<usize> {
        let dispatcher = self.dispatcher.clone();
        tokio::spawn(async move {
            if !dispatcher.is_enabled() {
                tracing::debug!("Push dispatcher disabled, skipping notification");
                return 0;
            }

            let mut delivered = 0;
            for device_token in device_tokens {
                let message = PushMessage {
                    device_token,
                    title: title.clone(),
                    body: body.clone(),
                };
                match dispatcher.send(&message).await {
                    Ok(()) => delivered += 1,
                    Err(e) => tracing::warn!(error = %e, "Push notification delivery failed"),
                }
            }
            metrics::counter!("push_notifications_sent_total").increment(delivered as u64);
            delivered
        })
    }

    /// Looks up every registered device token and notifies them all.
    pub async fn broadcast(
        &self,
        users: &dyn UserStore,
        title: String,
        body: String,
    ) -> Result<usize, super::error::StoreError> {
        let tokens = users.device_tokens().await?;
        let count = tokens.len();
        self.notify(tokens, title, body);
        Ok(count)
    }
}
