//! HTTP transport seam.
//!
//! [`HttpTransport`] sends one [`ApiRequest`] and returns the raw
//! [`ApiResponse`]; it never interprets status codes. Bearer handling and
//! refresh-on-401 live one level up in [`ApiClient`](crate::ApiClient).

use crate::endpoints;
use crate::{AuthError, AuthResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;
use url::Url;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// A request against the API, relative to the configured base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// Correlates trace events for one logical call, retries included.
    pub id: Uuid,
    pub method: HttpMethod,
    pub path: String,
    pub body: Option<serde_json::Value>,
    /// Bearer credential sent with this request, if any.
    pub bearer: Option<String>,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            method,
            path: path.into(),
            body: None,
            bearer: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    /// POST with no body.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    /// POST with a JSON body.
    pub fn post_json<T: Serialize>(path: impl Into<String>, body: &T) -> AuthResult<Self> {
        Ok(Self::post(path).with_body(serde_json::to_value(body)?))
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }
}

/// Status and body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }

    /// The `detail` message of an error body, if the body has one.
    pub fn detail(&self) -> Option<String> {
        let value: serde_json::Value = serde_json::from_str(&self.body).ok()?;
        value
            .get("detail")
            .and_then(|detail| detail.as_str())
            .map(str::to_string)
    }

    /// Convert an unexpected status into an [`AuthError::Api`].
    pub fn into_error(self) -> AuthError {
        let message = self
            .detail()
            .unwrap_or_else(|| format!("unexpected status {}", self.status));
        AuthError::Api {
            status: self.status,
            message,
        }
    }
}

/// Sends requests to the API.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send a request. Only transport-level failures are errors; any HTTP
    /// status comes back as a response.
    async fn send(&self, request: &ApiRequest) -> AuthResult<ApiResponse>;
}

/// [`HttpTransport`] backed by reqwest.
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl ReqwestTransport {
    pub fn new(base_url: Url, timeout: Duration) -> AuthResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    fn method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest) -> AuthResult<ApiResponse> {
        let url = endpoints::resolve(&self.base_url, &request.path)?;

        debug!(
            request_id = %request.id,
            method = request.method.as_str(),
            url = %url,
            "Sending API request"
        );

        let mut builder = self
            .client
            .request(Self::method(request.method), url)
            .header("X-Request-Id", request.id.to_string());
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        debug!(request_id = %request.id, status, "API response received");

        Ok(ApiResponse::new(status, body))
    }
}
