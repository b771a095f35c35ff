//! Signed user tokens (HS256 JWT) with an embedded expiry.

use std::collections::HashMap;

use anyhow::Context;
use jsonwebtoken::{
    decode, encode, get_current_timestamp, Algorithm, DecodingKey, EncodingKey, Header,
    Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::AppResult;

/// User identity carried inside a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User id.
    pub id: Uuid,
    /// Login name.
    pub username: String,
    /// Name shown to other users.
    pub display_name: String,
    /// Avatar URL or key.
    pub avatar: String,
    /// Free-form attributes.
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

/// Claims of a user token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserTokenClaims {
    /// Expiration time (Unix timestamp, seconds).
    pub exp: u64,
    /// The user the token was issued for.
    pub user: User,
}

/// Issue a token for `user` that expires `ttl_secs` seconds from now.
///
/// # Errors
///
/// Returns an error if the claims cannot be encoded.
pub fn issue_token(user: &User, ttl_secs: u64, secret: &str) -> AppResult<String> {
    let claims = UserTokenClaims {
        exp: get_current_timestamp().saturating_add(ttl_secs),
        user: user.clone(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .context("can not create token string")
}

/// Verify a token and return its claims.
///
/// `None` if the signature, the algorithm or the encoding is wrong, or if
/// the expiry is at or before the current time.
#[must_use]
pub fn verify_token(token: &str, secret: &str) -> Option<UserTokenClaims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    let data = decode::<UserTokenClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .ok()?;

    // The library accepts `exp == now`; an expiry at the current second is expired.
    (data.claims.exp > get_current_timestamp()).then_some(data.claims)
}
