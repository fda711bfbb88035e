//! JWT Token Generation and Verification
//!
//! - Configuration is loaded once at startup and injected, never read from
//!   globals at request time
//! - Issuer and audience validation
//! - Support for key rotation (primary + secondary secret)
//! - Fail-fast startup outside development mode

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::errors::AuthError;

const DEV_SECRET: &str = "INSECURE_DEV_SECRET_DO_NOT_USE_IN_PRODUCTION_12345";
const DEFAULT_EXPIRES_IN: &str = "90d";
/// Longest accepted token lifetime (10 years)
pub const MAX_EXPIRES_IN: Duration = Duration::from_secs(3650 * 24 * 60 * 60);

#[derive(Debug, thiserror::Error)]
pub enum JwtConfigError {
    #[error(
        "JWT_SECRET environment variable is required in production. \
        Set JWT_SECRET to a secure random string (at least 32 characters). \
        For development, set ENVIRONMENT=development"
    )]
    MissingSecret,
    #[error("Invalid JWT_EXPIRES_IN value: {0:?} (expected seconds or <n>s, <n>m, <n>h, <n>d)")]
    InvalidExpiresIn(String),
}

/// JWT configuration
#[derive(Clone)]
pub struct JwtConfig {
    /// Primary JWT secret
    pub secret: String,
    /// Secondary JWT secret for key rotation
    pub secret_secondary: Option<String>,
    pub issuer: String,
    pub audience: String,
    /// Token lifetime
    pub expires_in: Duration,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("secret_secondary", &self.secret_secondary.as_ref().map(|_| "<redacted>"))
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

impl JwtConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self, JwtConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, JwtConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT").unwrap_or_else(|| "production".to_string());
        let is_dev = environment == "development" || environment == "dev";

        let secret = match lookup("JWT_SECRET") {
            Some(s) if !s.is_empty() => {
                if s.len() < 32 {
                    tracing::warn!("JWT_SECRET is less than 32 characters - consider using a longer secret");
                }
                s
            }
            _ if is_dev => {
                tracing::warn!(
                    "JWT_SECRET not set - using insecure development secret. \
                    DO NOT use this in production!"
                );
                DEV_SECRET.to_string()
            }
            _ => return Err(JwtConfigError::MissingSecret),
        };

        let secret_secondary = lookup("JWT_SECRET_SECONDARY").filter(|s| !s.is_empty());
        if secret_secondary.is_some() {
            tracing::info!("JWT key rotation enabled: secondary secret configured");
        }

        let issuer = lookup("JWT_ISSUER").unwrap_or_else(|| "quillpost".to_string());
        let audience = lookup("JWT_AUDIENCE").unwrap_or_else(|| "quillpost-api".to_string());

        let raw_expiry = lookup("JWT_EXPIRES_IN").unwrap_or_else(|| DEFAULT_EXPIRES_IN.to_string());
        let expires_in = parse_expires_in(&raw_expiry)
            .ok_or(JwtConfigError::InvalidExpiresIn(raw_expiry))?;

        tracing::info!(
            "JWT configured: issuer={}, audience={}, expiry={}s",
            issuer,
            audience,
            expires_in.as_secs()
        );

        Ok(Self {
            secret,
            secret_secondary,
            issuer,
            audience,
            expires_in,
        })
    }
}

/// Parse a token lifetime: bare seconds (`3600`) or a number with one of the
/// suffixes `s`, `m`, `h`, `d` (`90d`). Zero and anything above
/// `MAX_EXPIRES_IN` are rejected.
pub fn parse_expires_in(value: &str) -> Option<Duration> {
    let value = value.trim();
    let (digits, unit) = match value.char_indices().last()? {
        (idx, c) if c.is_ascii_alphabetic() => (&value[..idx], c.to_ascii_lowercase()),
        _ => (value, 's'),
    };
    let amount: u64 = digits.trim().parse().ok()?;
    let multiplier = match unit {
        's' => 1,
        'm' => 60,
        'h' => 60 * 60,
        'd' => 24 * 60 * 60,
        _ => return None,
    };
    match amount.checked_mul(multiplier)? {
        0 => None,
        secs if secs > MAX_EXPIRES_IN.as_secs() => None,
        secs => Some(Duration::from_secs(secs)),
    }
}

/// JWT Claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user_id as string)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    pub iss: String,
    pub aud: String,
}

/// The result of a successful verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies bearer tokens
pub struct TokenService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    secondary_decoding_key: Option<DecodingKey>,
    validation: Validation,
}

impl TokenService {
    pub fn new(config: JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        // Expiry is exact
        validation.leeway = 0;
        validation.set_issuer(&[&config.issuer]);
        validation.set_audience(&[&config.audience]);
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);

        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            secondary_decoding_key: config
                .secret_secondary
                .as_ref()
                .map(|s| DecodingKey::from_secret(s.as_bytes())),
            validation,
            config,
        }
    }

    /// Generate a token for a user, expiring after the configured lifetime
    pub fn issue(&self, user_id: Uuid) -> Result<String, jsonwebtoken::errors::Error> {
        self.sign(user_id, Utc::now().timestamp())
    }

    fn sign(&self, user_id: Uuid, issued_at: i64) -> Result<String, jsonwebtoken::errors::Error> {
        let lifetime = i64::try_from(self.config.expires_in.as_secs()).unwrap_or(i64::MAX);
        let claims = Claims {
            sub: user_id.to_string(),
            exp: issued_at.saturating_add(lifetime),
            iat: issued_at,
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
    }

    /// Verify and decode a token
    ///
    /// Validates:
    /// - Signature (tries primary secret, then secondary for rotation)
    /// - Expiration time
    /// - Issuer and audience
    /// - Subject is a user id
    pub fn verify(&self, token: &str) -> Result<VerifiedToken, AuthError> {
        let claims = match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => data.claims,
            Err(primary_err) => match &self.secondary_decoding_key {
                Some(secondary) => match decode::<Claims>(token, secondary, &self.validation) {
                    Ok(data) => {
                        tracing::debug!("Token validated with secondary secret (key rotation)");
                        data.claims
                    }
                    Err(_) => return Err(invalid_token(primary_err)),
                },
                None => return Err(invalid_token(primary_err)),
            },
        };

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| {
            tracing::warn!("JWT subject is not a user id: {}", claims.sub);
            AuthError::InvalidToken
        })?;
        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or(AuthError::InvalidToken)?;

        Ok(VerifiedToken { user_id, expires_at })
    }
}

fn invalid_token(err: jsonwebtoken::errors::Error) -> AuthError {
    tracing::warn!("JWT decode error: {:?}", err);
    AuthError::InvalidToken
}
