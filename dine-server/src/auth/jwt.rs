//! JWT token service
//!
//! Validates provider-issued tokens and extracts the user id (`sub`).

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum accepted secret length
pub const MIN_SECRET_LEN: usize = 32;

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Shared HS256 secret (at least 32 bytes)
    pub secret: String,
    /// Lifetime of tokens issued by [`JwtService::generate_token`]
    pub expiration_minutes: i64,
    pub issuer: String,
    pub audience: String,
}

impl JwtConfig {
    /// Build from a configured secret
    ///
    /// Without a secret, development gets a random per-process key (every
    /// restart invalidates sessions); production refuses to start.
    pub fn from_secret(secret: Option<String>, production: bool) -> Result<Self, JwtError> {
        let secret = match secret {
            Some(secret) if secret.len() >= MIN_SECRET_LEN => secret,
            Some(_) => {
                return Err(JwtError::ConfigError(format!(
                    "JWT_SECRET must be at least {} characters long",
                    MIN_SECRET_LEN
                )));
            }
            None if production => {
                return Err(JwtError::ConfigError(
                    "JWT_SECRET environment variable must be set in production".to_string(),
                ));
            }
            None => {
                tracing::warn!("JWT_SECRET not set, generating a temporary development key");
                generate_printable_secret()
            }
        };

        Ok(Self {
            secret,
            expiration_minutes: std::env::var("JWT_EXPIRATION_MINUTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "dine-auth".to_string()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "authenticated".to_string()),
        })
    }
}

/// Claims carried by provider tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
    pub aud: String,
}

#[derive(Error, Debug)]
pub enum JwtError {
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    ExpiredToken,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Token generation failed: {0}")]
    GenerationFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Random printable secret for development
pub fn generate_printable_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}

/// JWT token service
#[derive(Clone)]
pub struct JwtService {
    pub config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("issuer", &self.config.issuer)
            .field("audience", &self.config.audience)
            .finish()
    }
}

impl JwtService {
    pub fn with_config(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Issue a token for a user
    pub fn generate_token(&self, user_id: &str, email: Option<&str>) -> Result<String, JwtError> {
        let now = Utc::now();
        let expiration = now + Duration::minutes(self.config.expiration_minutes);

        let claims = Claims {
            sub: user_id.to_string(),
            email: email.map(str::to_string),
            exp: expiration.timestamp(),
            iat: now.timestamp(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| JwtError::GenerationFailed(e.to_string()))
    }

    /// Validate and decode a token
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[&self.config.audience]);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_required_spec_claims(&["sub", "exp", "iat", "iss", "aud"]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::ExpiredToken,
                ErrorKind::InvalidSignature => JwtError::InvalidSignature,
                ErrorKind::InvalidToken => JwtError::InvalidToken(e.to_string()),
                _ => JwtError::InvalidToken(format!("Token validation failed: {}", e)),
            }
        })?;

        Ok(token_data.claims)
    }

    /// Extract the token from an Authorization header
    pub fn extract_from_header(header: &str) -> Option<&str> {
        header.strip_prefix("Bearer ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_service() -> JwtService {
        let config = JwtConfig::from_secret(Some("x".repeat(40)), false).unwrap();
        JwtService::with_config(config)
    }

    #[test]
    fn test_generation_and_validation() {
        let service = create_test_service();
        let token = service.generate_token("user-1", Some("a@b.c")).unwrap();

        let claims = service.validate_token(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.email.as_deref(), Some("a@b.c"));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let service = create_test_service();
        let other = JwtService::with_config(
            JwtConfig::from_secret(Some("y".repeat(40)), false).unwrap(),
        );
        let token = other.generate_token("user-1", None).unwrap();
        assert!(matches!(
            service.validate_token(&token),
            Err(JwtError::InvalidSignature)
        ));
    }

    #[test]
    fn test_expired_token() {
        let mut config = JwtConfig::from_secret(Some("x".repeat(40)), false).unwrap();
        config.expiration_minutes = -10;
        let service = JwtService::with_config(config);
        let token = service.generate_token("user-1", None).unwrap();
        assert!(matches!(
            service.validate_token(&token),
            Err(JwtError::ExpiredToken)
        ));
    }

    #[test]
    fn test_secret_requirements() {
        assert!(matches!(
            JwtConfig::from_secret(Some("short".into()), false),
            Err(JwtError::ConfigError(_))
        ));
        assert!(matches!(
            JwtConfig::from_secret(None, true),
            Err(JwtError::ConfigError(_))
        ));
        let dev = JwtConfig::from_secret(None, false).unwrap();
        assert_eq!(dev.secret.len(), 64);
    }

    #[test]
    fn test_extract_from_header() {
        assert_eq!(JwtService::extract_from_header("Bearer abc"), Some("abc"));
        assert_eq!(JwtService::extract_from_header("Basic abc"), None);
    }
}
