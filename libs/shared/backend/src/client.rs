use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    Method, StatusCode,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use shared_config::AppConfig;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Backend responded {status}: {message}")]
    Status {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Backend transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid header value: {0}")]
    Header(String),
}

impl BackendError {
    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Error body shape the backend uses for non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
    code: Option<String>,
}

/// Thin JSON-over-HTTP client for the REST backend that owns persistence.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl BackendClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.backend_api_url.trim_end_matches('/').to_string(),
            api_key: config.backend_api_key.clone(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> Result<HeaderMap, BackendError> {
        let mut headers = HeaderMap::new();

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if !self.api_key.is_empty() {
            headers.insert(
                "apikey",
                HeaderValue::from_str(&self.api_key)
                    .map_err(|e| BackendError::Header(e.to_string()))?,
            );
        }

        if let Some(token) = auth_token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|e| BackendError::Header(e.to_string()))?,
            );
        }

        Ok(headers)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<reqwest::Response, BackendError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut req = self
            .client
            .request(method, &url)
            .headers(self.get_headers(auth_token)?);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Backend error ({}): {}", status, error_text);
            return Err(Self::status_error(status, &error_text));
        }

        Ok(response)
    }

    fn status_error(status: StatusCode, error_text: &str) -> BackendError {
        let parsed = serde_json::from_str::<ErrorBody>(error_text).ok();
        let code = parsed.as_ref().and_then(|b| b.code.clone());
        let message = parsed
            .and_then(|b| b.message.or(b.error))
            .unwrap_or_else(|| error_text.to_string());

        BackendError::Status {
            status: status.as_u16(),
            code,
            message,
        }
    }

    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<T, BackendError>
    where
        T: DeserializeOwned,
    {
        let response = self.send(method, path, auth_token, body).await?;
        let data = response.json::<T>().await?;
        Ok(data)
    }

    /// Like [`request`](Self::request) for endpoints that answer with no body.
    pub async fn request_empty(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(), BackendError> {
        self.send(method, path, auth_token, body).await?;
        Ok(())
    }
}
