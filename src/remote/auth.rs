//! Bearer-token decoration of outbound requests.

use async_trait::async_trait;

use super::transport::{Transport, TransportRequest, TransportResponse};
use crate::error::Result;

/// Adds `Authorization: Bearer <key>` to every request when a key is configured.
///
/// Responses pass through untouched; a 401 is not retried.
pub struct AuthenticatedTransport<T> {
    inner: T,
    api_key: Option<String>,
}

impl<T: Transport> AuthenticatedTransport<T> {
    /// Wraps a transport.
    #[must_use]
    pub fn new(inner: T, api_key: Option<String>) -> Self {
        Self {
            inner,
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }

    /// Returns true if requests will carry credentials.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl<T: Transport> Transport for AuthenticatedTransport<T> {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
        let request = match &self.api_key {
            Some(key) => request.with_header("Authorization", format!("Bearer {key}")),
            None => request,
        };
        self.inner.send(request).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::remote::InMemoryRemote;

    #[tokio::test]
    async fn test_bearer_header_added() {
        let remote = Arc::new(InMemoryRemote::new());
        let transport = AuthenticatedTransport::new(Arc::clone(&remote), Some("secret".into()));
        assert!(transport.is_authenticated());

        transport
            .send(TransportRequest::get("/api/v1/projects"))
            .await
            .unwrap();

        let requests = remote.requests().await;
        assert_eq!(requests[0].header("Authorization"), Some("Bearer secret"));
    }

    #[tokio::test]
    async fn test_no_key_sends_unmodified() {
        let remote = Arc::new(InMemoryRemote::new());
        let transport = AuthenticatedTransport::new(Arc::clone(&remote), None);

        let request = TransportRequest::get("/api/v1/projects");
        transport.send(request.clone()).await.unwrap();

        assert_eq!(remote.requests().await, vec![request]);
    }
}
