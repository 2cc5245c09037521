//! Bearer token format shared by the authentication and API services
//!
//! The authentication service signs tokens with [`TokenKeys::encode`]; the
//! API verifies them with [`TokenKeys::decode`]. Tokens are signed with RS256
//! when a PEM key pair is configured and with HS256 when only a shared
//! secret is available.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

/// Errors raised while configuring keys or handling tokens
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token configuration error: {0}")]
    Configuration(String),

    #[error("no signing key configured")]
    MissingSigningKey,

    #[error("invalid token: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

/// JWT configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JwtConfig {
    /// Shared secret for HS256 signing
    #[serde(default)]
    pub jwt_secret: Option<String>,
    /// Private key for RS256 signing (PEM text or path to a PEM file)
    #[serde(default)]
    pub jwt_private_key: Option<String>,
    /// Public key for RS256 verification (PEM text or path to a PEM file)
    #[serde(default)]
    pub jwt_public_key: Option<String>,
    /// Access token expiration time in seconds (default: 15 minutes)
    #[serde(default = "default_access_token_expiry")]
    pub jwt_access_token_expiry: u64,
    /// Refresh token expiration time in seconds (default: 7 days)
    #[serde(default = "default_refresh_token_expiry")]
    pub jwt_refresh_token_expiry: u64,
}

fn default_access_token_expiry() -> u64 {
    900
}

fn default_refresh_token_expiry() -> u64 {
    604800
}

impl JwtConfig {
    /// Load the JWT configuration
    ///
    /// # Environment Variables
    /// - `JWT_SECRET`: shared HS256 secret
    /// - `JWT_PRIVATE_KEY` / `JWT_PUBLIC_KEY`: RS256 key pair, PEM text or file path
    /// - `JWT_ACCESS_TOKEN_EXPIRY`: Access token expiry in seconds (default: 900)
    /// - `JWT_REFRESH_TOKEN_EXPIRY`: Refresh token expiry in seconds (default: 604800)
    pub fn from_env() -> Result<Self, TokenError> {
        crate::settings::load("jwt").map_err(|e| TokenError::Configuration(e.to_string()))
    }

    /// Configuration for an HS256 shared secret with default expiries
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: Some(secret.into()),
            jwt_access_token_expiry: default_access_token_expiry(),
            jwt_refresh_token_expiry: default_refresh_token_expiry(),
            ..Default::default()
        }
    }
}

/// Role embedded in an access token together with its permission names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleClaim {
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// JWT claims structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    /// Login name
    pub username: String,
    /// Assigned role, if any
    #[serde(default)]
    pub role: Option<RoleClaim>,
    /// Permissions attached directly to the token
    #[serde(default)]
    pub permissions: Option<Vec<String>>,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
    /// Token type (access or refresh)
    pub token_type: TokenType,
}

/// Token type enum
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    /// Access token
    Access,
    /// Refresh token
    Refresh,
}

/// Signing and verification keys
#[derive(Clone)]
pub struct TokenKeys {
    algorithm: Algorithm,
    encoding_key: Option<EncodingKey>,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenKeys {
    /// Build keys from configuration.
    ///
    /// A public key selects RS256 (the private key is optional so verifying
    /// services never need it); otherwise a shared secret selects HS256.
    pub fn from_config(config: &JwtConfig) -> Result<Self, TokenError> {
        if let Some(public_key) = &config.jwt_public_key {
            let public_key = read_key_material(public_key)?;
            let decoding_key = DecodingKey::from_rsa_pem(public_key.as_bytes())?;
            let encoding_key = match &config.jwt_private_key {
                Some(private_key) => {
                    let private_key = read_key_material(private_key)?;
                    Some(EncodingKey::from_rsa_pem(private_key.as_bytes())?)
                }
                None => None,
            };
            return Ok(Self::with_keys(Algorithm::RS256, encoding_key, decoding_key));
        }

        match &config.jwt_secret {
            Some(secret) if !secret.is_empty() => Ok(Self::hs256(secret.as_bytes())),
            _ => Err(TokenError::Configuration(
                "set JWT_PUBLIC_KEY (RS256) or JWT_SECRET (HS256)".to_string(),
            )),
        }
    }

    /// HS256 keys from a shared secret
    pub fn hs256(secret: &[u8]) -> Self {
        Self::with_keys(
            Algorithm::HS256,
            Some(EncodingKey::from_secret(secret)),
            DecodingKey::from_secret(secret),
        )
    }

    fn with_keys(
        algorithm: Algorithm,
        encoding_key: Option<EncodingKey>,
        decoding_key: DecodingKey,
    ) -> Self {
        let mut validation = Validation::new(algorithm);
        validation.validate_exp = true;

        Self {
            algorithm,
            encoding_key,
            decoding_key,
            validation,
        }
    }

    /// Sign claims into a compact token
    pub fn encode(&self, claims: &Claims) -> Result<String, TokenError> {
        let key = self
            .encoding_key
            .as_ref()
            .ok_or(TokenError::MissingSigningKey)?;
        Ok(encode(&Header::new(self.algorithm), claims, key)?)
    }

    /// Verify a token's signature and expiry and return its claims
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }
}

/// Seconds since the Unix epoch
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Accept PEM text as-is, otherwise treat the value as a file path.
fn read_key_material(value: &str) -> Result<String, TokenError> {
    if value.starts_with("-----BEGIN") {
        return Ok(value.to_string());
    }

    std::fs::read_to_string(value)
        .map(|pem| pem.trim().to_string())
        .map_err(|e| TokenError::Configuration(format!("Failed to read key file {}: {}", value, e)))
}
