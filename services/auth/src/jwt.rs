//! JWT service for issuing access and refresh tokens
//!
//! Access tokens embed the user's role and its permission names so the API
//! can authorize requests without a database round trip. Refresh tokens carry
//! only the subject; redeeming one reloads the user.

use common::token::{Claims, JwtConfig, RoleClaim, TokenError, TokenKeys, TokenType, unix_now};
use serde::Serialize;

use crate::credentials::UserCredentials;

/// Access and refresh token pair returned by login and refresh
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    keys: TokenKeys,
    access_token_expiry: u64,
    refresh_token_expiry: u64,
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Result<Self, TokenError> {
        Ok(Self::with_keys(
            TokenKeys::from_config(config)?,
            config.jwt_access_token_expiry,
            config.jwt_refresh_token_expiry,
        ))
    }

    pub fn with_keys(keys: TokenKeys, access_token_expiry: u64, refresh_token_expiry: u64) -> Self {
        Self {
            keys,
            access_token_expiry,
            refresh_token_expiry,
        }
    }

    /// Issue a fresh token pair for an authenticated user.
    ///
    /// An inactive role contributes nothing: the token carries no role and an
    /// empty permission list.
    pub fn issue(&self, user: &UserCredentials) -> Result<TokenPair, TokenError> {
        let now = unix_now();

        let (role, permissions) = match &user.role {
            Some(role) if role.active => (
                Some(RoleClaim {
                    name: role.name.clone(),
                    permissions: role.permissions.clone(),
                }),
                None,
            ),
            Some(_) => (None, Some(Vec::new())),
            None => (None, None),
        };

        let access = Claims {
            sub: user.user_id,
            username: user.username.clone(),
            role,
            permissions,
            iat: now,
            exp: now + self.access_token_expiry,
            token_type: TokenType::Access,
        };

        let refresh = Claims {
            sub: user.user_id,
            username: user.username.clone(),
            role: None,
            permissions: None,
            iat: now,
            exp: now + self.refresh_token_expiry,
            token_type: TokenType::Refresh,
        };

        Ok(TokenPair {
            access_token: self.keys.encode(&access)?,
            refresh_token: self.keys.encode(&refresh)?,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiry,
        })
    }

    /// Validate a refresh token and return its claims.
    ///
    /// Returns `None` for access tokens presented in place of a refresh token.
    pub fn validate_refresh(&self, token: &str) -> Result<Option<Claims>, TokenError> {
        let claims = self.keys.decode(token)?;
        Ok((claims.token_type == TokenType::Refresh).then_some(claims))
    }
}
