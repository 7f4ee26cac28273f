use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, Request},
    middleware::Next,
    response::Response,
};

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::jwt::validate_token;

/// Pull the raw bearer token out of the `Authorization` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let auth_value = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    auth_value
        .strip_prefix("Bearer ")
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Auth("Invalid authorization header format".to_string()))
}

// Validates the bearer token and stores the resulting `User` in request extensions.
pub async fn auth_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())?;

    let user = validate_token(token, &config.jwt_secret)
        .map_err(|e| AppError::Auth(e.to_string()))?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn test_missing_and_malformed_headers() {
        let headers = HeaderMap::new();
        assert_matches!(bearer_token(&headers), Err(AppError::Auth(msg)) if msg == "Missing authorization header");

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert_matches!(bearer_token(&headers), Err(AppError::Auth(_)));

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_matches!(bearer_token(&headers), Err(AppError::Auth(_)));
    }
}
