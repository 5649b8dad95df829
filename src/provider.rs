//! Provider context.
//!
//! Builds the transport stack from provider settings and hands out the
//! per-kind reconcilers that share it.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::ProviderSettings;
use crate::error::Result;
use crate::model::ResourceKind;
use crate::reconciler::{ObjectReconciler, Reconciler};
use crate::remote::{
    AuthenticatedTransport, HttpTransport, ProjectAdapter, ProjectLookup, ProjectMemberAdapter,
    Transport,
};

/// Shared transport and cancellation for every reconciler of a run.
#[derive(Clone)]
pub struct ProviderContext {
    transport: Arc<dyn Transport>,
    endpoint: String,
    cancellation: CancellationToken,
}

impl ProviderContext {
    /// Connects to the API described by the settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn connect(settings: &ProviderSettings) -> Result<Self> {
        let http = HttpTransport::with_timeout(&settings.endpoint, settings.timeout_secs)?;
        let endpoint = http.endpoint().to_string();
        let transport = AuthenticatedTransport::new(http, settings.api_key.clone());
        debug!(
            endpoint = %endpoint,
            authenticated = transport.is_authenticated(),
            "provider configured"
        );

        Ok(Self::with_transport(endpoint, Arc::new(transport)))
    }

    /// Uses an existing transport.
    #[must_use]
    pub fn with_transport(endpoint: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
            cancellation: CancellationToken::new(),
        }
    }

    /// Returns the endpoint objects live on.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the token that aborts every in-flight call of this context.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Returns the project reconciler.
    #[must_use]
    pub fn projects(&self) -> Reconciler<ProjectAdapter> {
        Reconciler::new(ProjectAdapter, Arc::clone(&self.transport))
            .with_cancellation(self.cancellation.clone())
    }

    /// Returns the project member reconciler.
    #[must_use]
    pub fn members(&self) -> Reconciler<ProjectMemberAdapter> {
        Reconciler::new(ProjectMemberAdapter, Arc::clone(&self.transport))
            .with_cancellation(self.cancellation.clone())
    }

    /// Returns the reconciler of a kind.
    #[must_use]
    pub fn reconciler(&self, kind: ResourceKind) -> Box<dyn ObjectReconciler> {
        match kind {
            ResourceKind::Project => Box::new(self.projects()),
            ResourceKind::ProjectMember => Box::new(self.members()),
        }
    }

    /// Returns the project lookup.
    #[must_use]
    pub fn project_lookup(&self) -> ProjectLookup {
        ProjectLookup::new(Arc::clone(&self.transport)).with_cancellation(self.cancellation.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_ENDPOINT;
    use crate::model::{MEMBER, Object, PROJECT};
    use crate::remote::InMemoryRemote;

    #[test]
    fn test_connect_trims_endpoint() {
        let settings = ProviderSettings {
            endpoint: String::from("https://api.switchcloud.com/"),
            ..ProviderSettings::default()
        };
        let provider = ProviderContext::connect(&settings).unwrap();
        assert_eq!(provider.endpoint(), DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_reconciler_per_kind() {
        let provider =
            ProviderContext::with_transport(DEFAULT_ENDPOINT, Arc::new(InMemoryRemote::new()));
        assert!(std::ptr::eq(
            provider.reconciler(ResourceKind::Project).descriptor(),
            &PROJECT
        ));
        assert!(std::ptr::eq(
            provider.reconciler(ResourceKind::ProjectMember).descriptor(),
            &MEMBER
        ));
    }

    #[tokio::test]
    async fn test_cancellation_reaches_reconcilers() {
        let remote = Arc::new(InMemoryRemote::new());
        let provider = ProviderContext::with_transport(DEFAULT_ENDPOINT, remote.clone());
        provider.cancellation_token().cancel();

        let result = provider
            .projects()
            .create(&Object::new().with("name", "web"))
            .await;
        assert!(result.is_err());
        assert_eq!(remote.request_count().await, 0);
    }
}
