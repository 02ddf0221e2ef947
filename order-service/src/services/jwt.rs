use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::JwtConfig;

/// HS256 token issuer/validator for user sessions.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_hours: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessTokenClaims {
    /// Subject (user ID)
    pub sub: String,
    pub email: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Self {
        let secret = config.secret.expose_secret().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            expiry_hours: config.expiry_hours,
        }
    }

    pub fn generate_access_token(&self, user_id: &str, email: &str) -> Result<String, anyhow::Error> {
        let now = Utc::now();
        let exp = now + Duration::hours(self.expiry_hours);

        let claims = AccessTokenClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode access token: {}", e))
    }

    pub fn validate_access_token(
        &self,
        token: &str,
    ) -> Result<AccessTokenClaims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        decode::<AccessTokenClaims>(token, &self.decoding_key, &validation).map(|data| data.claims)
    }

    pub fn expiry_seconds(&self) -> i64 {
        self.expiry_hours * 3600
    }
}
