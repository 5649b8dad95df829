//! Request/response transport for the Switchcloud API.
//!
//! A [`Transport`] performs exactly one exchange per call. It never retries
//! and never interprets status codes; that is left to the adapters.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, header};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::{ReconcileError, Result, SwitchcloudError};

/// `200 OK`.
pub const STATUS_OK: u16 = 200;
/// `201 Created`.
pub const STATUS_CREATED: u16 = 201;
/// `204 No Content`.
pub const STATUS_NO_CONTENT: u16 = 204;
/// `404 Not Found`.
pub const STATUS_NOT_FOUND: u16 = 404;

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET.
    Get,
    /// POST.
    Post,
    /// PUT.
    Put,
    /// DELETE.
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        };
        write!(f, "{name}")
    }
}

/// An outbound request, relative to the transport's base endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    /// HTTP method.
    pub method: Method,
    /// Path starting with `/`.
    pub path: String,
    /// Extra headers.
    pub headers: Vec<(String, String)>,
    /// JSON body.
    pub body: Option<Vec<u8>>,
}

impl TransportRequest {
    /// Creates a request without body or headers.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Creates a GET request.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    /// Creates a POST request.
    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    /// Creates a DELETE request.
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Attaches a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be serialized.
    pub fn with_json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        let bytes = serde_json::to_vec(body).map_err(|e| {
            SwitchcloudError::internal(format!("Failed to encode request body: {e}"))
        })?;
        self.body = Some(bytes);
        Ok(self)
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Gets a header value, ignoring case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A response as seen by the adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw body.
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// Creates a response.
    #[must_use]
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns the body as text, replacing invalid UTF-8.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Sends requests to the remote API.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs one request/response exchange.
    ///
    /// # Errors
    ///
    /// Returns a transport error if no response was received.
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
        (**self).send(request).await
    }
}

/// Sends a request, aborting with a transport error if the token fires first.
pub(crate) async fn dispatch(
    transport: &dyn Transport,
    cancellation: Option<&CancellationToken>,
    request: TransportRequest,
) -> Result<TransportResponse> {
    debug!(method = %request.method, path = %request.path, "sending request");
    let response = match cancellation {
        Some(token) => {
            tokio::select! {
                biased;
                () = token.cancelled() => return Err(ReconcileError::cancelled().into()),
                response = transport.send(request) => response?,
            }
        }
        None => transport.send(request).await?,
    };
    trace!(status = response.status, bytes = response.body.len(), "received response");
    Ok(response)
}

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// HTTP transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    /// HTTP client.
    client: Client,
    /// Base endpoint without trailing slash.
    endpoint: String,
}

impl HttpTransport {
    /// Creates a transport for an endpoint with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(endpoint: &str) -> Result<Self> {
        Self::with_timeout(endpoint, DEFAULT_TIMEOUT_SECS)
    }

    /// Creates a transport with a custom timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_timeout(endpoint: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ReconcileError::transport(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    /// Returns the base endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
        let url = format!("{}{}", self.endpoint, request.path);
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self
            .client
            .request(method, &url)
            .header(header::ACCEPT, "application/json");
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ReconcileError::transport(format!("Request to {url} failed: {e}")))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| ReconcileError::transport(format!("Failed to read response body: {e}")))?;

        Ok(TransportResponse::new(status, body.to_vec()))
    }
}
