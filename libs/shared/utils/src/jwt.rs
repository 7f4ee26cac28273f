use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{TimeZone, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use tracing::debug;

use shared_models::auth::{JwtClaims, User};

type HmacSha256 = Hmac<Sha256>;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum JwtError {
    #[error("JWT secret is not set")]
    MissingSecret,

    #[error("Invalid token format")]
    Malformed,

    #[error("Invalid signature encoding")]
    SignatureEncoding,

    #[error("Invalid token signature")]
    BadSignature,

    #[error("Invalid claims encoding")]
    ClaimsEncoding,

    #[error("Invalid claims format")]
    ClaimsFormat,

    #[error("Token expired")]
    Expired,
}

/// Validate an HS256 bearer token and turn its claims into a [`User`].
pub fn validate_token(token: &str, jwt_secret: &str) -> Result<User, JwtError> {
    if jwt_secret.is_empty() {
        return Err(JwtError::MissingSecret);
    }

    let mut parts = token.split('.');
    let (header_b64, claims_b64, signature_b64) =
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(h), Some(c), Some(s), None) => (h, c, s),
            _ => return Err(JwtError::Malformed),
        };

    let signature = URL_SAFE_NO_PAD.decode(signature_b64).map_err(|e| {
        debug!("Failed to decode signature: {}", e);
        JwtError::SignatureEncoding
    })?;

    let mut mac = HmacSha256::new_from_slice(jwt_secret.as_bytes())
        .map_err(|_| JwtError::MissingSecret)?;
    mac.update(format!("{}.{}", header_b64, claims_b64).as_bytes());

    if mac.verify_slice(&signature).is_err() {
        debug!("Token signature verification failed");
        return Err(JwtError::BadSignature);
    }

    let claims_bytes = URL_SAFE_NO_PAD
        .decode(claims_b64)
        .map_err(|_| JwtError::ClaimsEncoding)?;

    let claims: JwtClaims = serde_json::from_slice(&claims_bytes).map_err(|e| {
        debug!("Failed to parse claims: {}", e);
        JwtError::ClaimsFormat
    })?;

    if let Some(exp) = claims.exp {
        let now = Utc::now().timestamp().max(0) as u64;
        if exp < now {
            debug!("Token expired at {} (now: {})", exp, now);
            return Err(JwtError::Expired);
        }
    }

    let created_at = claims
        .iat
        .and_then(|timestamp| Utc.timestamp_opt(timestamp as i64, 0).single());

    let user = User {
        id: claims.sub,
        email: claims.email,
        role: claims.role,
        metadata: claims.user_metadata,
        created_at,
    };

    debug!("Token validated for user: {}", user.id);
    Ok(user)
}
