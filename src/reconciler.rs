//! Generic reconciliation engine.
//!
//! A [`Reconciler`] implements create, read, update, delete and import once
//! for every kind, delegating request shapes to a [`RemoteAdapter`] and value
//! merging to the kind's descriptor. It performs exactly one request per
//! operation and never persists anything; recording the returned objects is
//! the caller's job.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{ReconcileError, Result};
use crate::model::{ID_ATTRIBUTE, Object, ObjectDescriptor};
use crate::remote::{
    RemoteAdapter, Route, STATUS_NOT_FOUND, Transport, TransportRequest, TransportResponse,
    dispatch,
};

/// Outcome of a read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ReadOutcome {
    /// The object exists; every attribute reflects the remote.
    Present(Object),
    /// The remote no longer has the object.
    Absent,
}

impl ReadOutcome {
    /// Returns the object if present.
    #[must_use]
    pub fn into_object(self) -> Option<Object> {
        match self {
            Self::Present(object) => Some(object),
            Self::Absent => None,
        }
    }
}

/// Outcome of a delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeleteOutcome {
    /// The object was removed.
    Deleted,
    /// The object was already gone.
    AlreadyAbsent,
}

/// Lifecycle operations over one kind of remote object.
#[async_trait]
pub trait ObjectReconciler: Send + Sync {
    /// Returns the kind's descriptor.
    fn descriptor(&self) -> &'static ObjectDescriptor;

    /// Creates the remote object and returns it with every attribute known.
    ///
    /// # Errors
    ///
    /// Returns a configuration error before any request if validation fails,
    /// otherwise transport, rejection or decode errors.
    async fn create(&self, desired: &Object) -> Result<Object>;

    /// Refreshes an object from its identity attributes.
    ///
    /// # Errors
    ///
    /// Returns transport, rejection or decode errors. A missing object is
    /// [`ReadOutcome::Absent`], not an error.
    async fn read(&self, identity: &Object) -> Result<ReadOutcome>;

    /// Applies a change in place.
    ///
    /// A desired object equal to the prior returns the prior without a
    /// request. Any other call on a kind without an update capability fails.
    ///
    /// # Errors
    ///
    /// Returns `Unsupported` for kinds without an update capability and
    /// `ReplacementRequired` when a changed attribute forces replacement.
    async fn update(&self, prior: &Object, desired: &Object) -> Result<Object>;

    /// Deletes the remote object.
    ///
    /// # Errors
    ///
    /// Returns `Unsupported` for kinds without a delete capability, or
    /// transport and rejection errors.
    async fn delete(&self, identity: &Object) -> Result<DeleteOutcome>;

    /// Adopts an existing remote object by its external identifier.
    ///
    /// # Errors
    ///
    /// Returns `MalformedImportId` before any request if the identifier does
    /// not match the kind's format, otherwise the same errors as a read.
    async fn import(&self, external_id: &str) -> Result<ReadOutcome>;
}

/// Reconciler for one kind, parameterized by its adapter.
pub struct Reconciler<A> {
    adapter: A,
    transport: Arc<dyn Transport>,
    cancellation: Option<CancellationToken>,
}

impl<A: RemoteAdapter> Reconciler<A> {
    /// Creates a reconciler.
    #[must_use]
    pub fn new(adapter: A, transport: Arc<dyn Transport>) -> Self {
        Self {
            adapter,
            transport,
            cancellation: None,
        }
    }

    /// Aborts in-flight calls when the token is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Returns the adapter.
    #[must_use]
    pub const fn adapter(&self) -> &A {
        &self.adapter
    }

    async fn exchange(&self, request: TransportRequest) -> Result<TransportResponse> {
        dispatch(self.transport.as_ref(), self.cancellation.as_ref(), request).await
    }

    /// Sends a route and requires its expected status.
    async fn expect(&self, route: Route) -> Result<TransportResponse> {
        let response = self.exchange(route.request).await?;
        if response.status != route.expect {
            return Err(ReconcileError::rejected(response.status, response.text()).into());
        }
        Ok(response)
    }
}

#[async_trait]
impl<A: RemoteAdapter> ObjectReconciler for Reconciler<A> {
    fn descriptor(&self) -> &'static ObjectDescriptor {
        self.adapter.descriptor()
    }

    async fn create(&self, desired: &Object) -> Result<Object> {
        let descriptor = self.adapter.descriptor();
        self.adapter.validate(desired)?;

        let route = self.adapter.create_route(desired)?;
        let response = self.expect(route).await?;
        let remote = self.adapter.parse_response(&response.body)?;

        let created = descriptor.merge_created(desired, &remote);
        info!(
            kind = descriptor.type_name,
            id = created.get_str(ID_ATTRIBUTE).unwrap_or_default(),
            "created remote object"
        );
        Ok(created)
    }

    async fn read(&self, identity: &Object) -> Result<ReadOutcome> {
        let descriptor = self.adapter.descriptor();
        let route = self.adapter.read_route(identity)?;
        let expected = route.expect;

        let response = self.exchange(route.request).await?;
        if response.status == STATUS_NOT_FOUND {
            warn!(
                kind = descriptor.type_name,
                id = identity.get_str(ID_ATTRIBUTE).unwrap_or_default(),
                "remote object no longer exists"
            );
            return Ok(ReadOutcome::Absent);
        }
        if response.status != expected {
            return Err(ReconcileError::rejected(response.status, response.text()).into());
        }

        debug!(kind = descriptor.type_name, "refreshed remote object");
        Ok(ReadOutcome::Present(
            self.adapter.parse_response(&response.body)?,
        ))
    }

    async fn update(&self, prior: &Object, desired: &Object) -> Result<Object> {
        let descriptor = self.adapter.descriptor();
        if desired == prior {
            debug!(kind = descriptor.type_name, "desired object equals prior");
            return Ok(prior.clone());
        }

        let Some(route) = self.adapter.update_route(prior, desired)? else {
            return Err(ReconcileError::unsupported("Update", descriptor.type_name).into());
        };

        let changed = descriptor.changed_attributes(prior, desired);
        if changed.is_empty() {
            debug!(kind = descriptor.type_name, "only computed attributes differ");
            return Ok(prior.clone());
        }

        let forcing: Vec<String> = changed
            .iter()
            .filter(|a| a.forces_replacement())
            .map(|a| a.name.to_string())
            .collect();
        if !forcing.is_empty() {
            return Err(ReconcileError::ReplacementRequired {
                type_name: descriptor.type_name.to_string(),
                attributes: forcing,
            }
            .into());
        }

        let response = self.expect(route).await?;
        let remote = self.adapter.parse_response(&response.body)?;
        info!(kind = descriptor.type_name, "updated remote object");
        Ok(descriptor.merge_created(desired, &remote))
    }

    async fn delete(&self, identity: &Object) -> Result<DeleteOutcome> {
        let descriptor = self.adapter.descriptor();
        let Some(route) = self.adapter.delete_route(identity)? else {
            return Err(ReconcileError::unsupported("Delete", descriptor.type_name).into());
        };
        let expected = route.expect;

        let response = self.exchange(route.request).await?;
        if response.status == STATUS_NOT_FOUND {
            info!(kind = descriptor.type_name, "remote object already deleted");
            return Ok(DeleteOutcome::AlreadyAbsent);
        }
        if response.status != expected {
            return Err(ReconcileError::rejected(response.status, response.text()).into());
        }

        info!(kind = descriptor.type_name, "deleted remote object");
        Ok(DeleteOutcome::Deleted)
    }

    async fn import(&self, external_id: &str) -> Result<ReadOutcome> {
        let identity = self.adapter.parse_import_id(external_id)?;
        debug!(
            kind = self.adapter.descriptor().type_name,
            external_id, "importing remote object"
        );
        self.read(&identity).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DiagnosticKind, SwitchcloudError};
    use crate::model::{PROJECT, Value};
    use crate::remote::{
        InMemoryRemote, ProjectAdapter, ProjectMemberAdapter, ProjectRecord, STATUS_OK,
    };

    /// A project adapter that claims an update endpoint, to exercise the
    /// replacement check.
    struct UpdatableProjects;

    impl RemoteAdapter for UpdatableProjects {
        fn descriptor(&self) -> &'static ObjectDescriptor {
            &PROJECT
        }

        fn create_route(&self, desired: &Object) -> Result<Route> {
            ProjectAdapter.create_route(desired)
        }

        fn read_route(&self, identity: &Object) -> Result<Route> {
            ProjectAdapter.read_route(identity)
        }

        fn update_route(&self, _prior: &Object, _desired: &Object) -> Result<Option<Route>> {
            Ok(Some(Route::new(
                TransportRequest::new(crate::remote::Method::Put, "/api/v1/projects/p1"),
                STATUS_OK,
            )))
        }

        fn parse_response(&self, body: &[u8]) -> Result<Object> {
            ProjectAdapter.parse_response(body)
        }
    }

    fn setup() -> (
        Arc<InMemoryRemote>,
        Reconciler<ProjectAdapter>,
        Reconciler<ProjectMemberAdapter>,
    ) {
        let remote = Arc::new(InMemoryRemote::new());
        let projects = Reconciler::new(ProjectAdapter, remote.clone());
        let members = Reconciler::new(ProjectMemberAdapter, remote.clone());
        (remote, projects, members)
    }

    async fn create_project(projects: &Reconciler<ProjectAdapter>) -> Object {
        projects
            .create(&Object::new().with("name", "web"))
            .await
            .unwrap()
    }

    fn kind_of(err: &SwitchcloudError) -> DiagnosticKind {
        err.kind()
    }

    #[tokio::test]
    async fn test_create_project_scenario() {
        let (remote, projects, _) = setup();
        let desired = Object::new()
            .with("name", "Test Project")
            .with("description", Value::Unknown);

        let created = projects.create(&desired).await.unwrap();

        assert!(!created.has_unknown());
        assert_eq!(created.get_str("name"), Some("Test Project"));
        assert!(created.get("description").is_null());
        assert_eq!(created.get_bool("archived"), Some(false));
        assert_eq!(
            created.get_str("organisation_id"),
            Some(remote.organisation_id())
        );
        assert_eq!(created.get("created_at"), created.get("updated_at"));

        let id = created.get_str("id").unwrap();
        assert!(remote.project(id).await.is_some());
    }

    #[tokio::test]
    async fn test_read_after_create_matches_computed() {
        let (_, projects, _) = setup();
        let created = create_project(&projects).await;

        let identity = PROJECT.identity_of(&created);
        let read = projects.read(&identity).await.unwrap();

        assert_eq!(read, ReadOutcome::Present(created));
    }

    #[tokio::test]
    async fn test_desired_computed_values_are_ignored() {
        let (_, projects, _) = setup();
        let desired = Object::new()
            .with("name", "web")
            .with("id", "chosen-by-user")
            .with("archived", true);

        let created = projects.create(&desired).await.unwrap();

        assert_ne!(created.get_str("id"), Some("chosen-by-user"));
        assert_eq!(created.get_bool("archived"), Some(false));
    }

    #[tokio::test]
    async fn test_read_missing_project_is_absent() {
        let (_, projects, _) = setup();
        let identity = Object::new().with("id", "gone");
        assert_eq!(projects.read(&identity).await.unwrap(), ReadOutcome::Absent);
    }

    #[tokio::test]
    async fn test_member_lifecycle() {
        let (remote, projects, members) = setup();
        let project = create_project(&projects).await;
        let project_id = project.get_str("id").unwrap();

        let desired = Object::new()
            .with("project_id", project_id)
            .with("email", "alice@example.com")
            .with("user_id", Value::Unknown);
        let member = members.create(&desired).await.unwrap();

        assert_eq!(member.get_str("email"), Some("alice@example.com"));
        assert!(member.get_str("user_id").is_some());
        assert_eq!(member.get_str("display_name"), Some("alice"));

        let identity = crate::model::MEMBER.identity_of(&member);
        assert_eq!(
            members.read(&identity).await.unwrap(),
            ReadOutcome::Present(member.clone())
        );

        assert_eq!(
            members.delete(&identity).await.unwrap(),
            DeleteOutcome::Deleted
        );
        assert_eq!(members.read(&identity).await.unwrap(), ReadOutcome::Absent);
        assert_eq!(
            members.delete(&identity).await.unwrap(),
            DeleteOutcome::AlreadyAbsent
        );

        let id = member.get_str("id").unwrap();
        assert!(remote.member(id).await.is_none());
    }

    #[tokio::test]
    async fn test_member_identity_violation_sends_nothing() {
        let (remote, _, members) = setup();
        let both = Object::new()
            .with("project_id", "p1")
            .with("email", "alice@example.com")
            .with("user_id", "u1");
        let neither = Object::new().with("project_id", "p1");

        for desired in [both, neither] {
            let err = members.create(&desired).await.unwrap_err();
            assert_eq!(kind_of(&err), DiagnosticKind::ConfigurationError);
        }
        assert_eq!(remote.request_count().await, 0);
    }

    #[tokio::test]
    async fn test_create_rejected_carries_status_and_body() {
        let (_, _, members) = setup();
        let desired = Object::new()
            .with("project_id", "missing")
            .with("user_id", "u1");

        let err = members.create(&desired).await.unwrap_err();
        match err {
            SwitchcloudError::Reconcile(ReconcileError::RemoteRejected { status, body }) => {
                assert_eq!(status, 404);
                assert_eq!(body, "Project not found\n");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_project_update_and_delete_unsupported() {
        let (remote, projects, _) = setup();
        let prior = create_project(&projects).await;
        let before = remote.request_count().await;

        let desired = prior.clone().with("name", "renamed");
        let err = projects.update(&prior, &desired).await.unwrap_err();
        assert_eq!(kind_of(&err), DiagnosticKind::Unsupported);

        let err = projects
            .delete(&PROJECT.identity_of(&prior))
            .await
            .unwrap_err();
        assert_eq!(kind_of(&err), DiagnosticKind::Unsupported);

        assert_eq!(remote.request_count().await, before);
    }

    #[tokio::test]
    async fn test_update_without_changes_returns_prior() {
        let (remote, projects, _) = setup();
        let prior = create_project(&projects).await;
        let before = remote.request_count().await;

        assert_eq!(projects.update(&prior, &prior).await.unwrap(), prior);
        assert_eq!(remote.request_count().await, before);
    }

    #[tokio::test]
    async fn test_project_update_of_computed_values_is_unsupported() {
        let (remote, projects, _) = setup();
        let prior = create_project(&projects).await;
        let before = remote.request_count().await;

        let desired = prior
            .clone()
            .with("archived", true)
            .with("organisation_id", "other");
        let err = projects.update(&prior, &desired).await.unwrap_err();
        assert_eq!(kind_of(&err), DiagnosticKind::Unsupported);

        let planned = prior.clone().with("id", Value::Unknown);
        let err = projects.update(&prior, &planned).await.unwrap_err();
        assert_eq!(kind_of(&err), DiagnosticKind::Unsupported);
        assert_eq!(remote.request_count().await, before);
    }

    #[tokio::test]
    async fn test_update_reports_replacement_attributes() {
        let remote = Arc::new(InMemoryRemote::new());
        let reconciler = Reconciler::new(UpdatableProjects, remote.clone());
        let prior = Object::new().with("id", "p1").with("name", "web");
        let desired = prior
            .clone()
            .with("name", "api")
            .with("description", "new");

        let err = reconciler.update(&prior, &desired).await.unwrap_err();
        match err {
            SwitchcloudError::Reconcile(ReconcileError::ReplacementRequired {
                attributes, ..
            }) => assert_eq!(attributes, vec!["name", "description"]),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(remote.request_count().await, 0);
    }

    #[tokio::test]
    async fn test_import_member() {
        let (remote, projects, members) = setup();
        let project = create_project(&projects).await;
        let project_id = project.get_str("id").unwrap();
        let member = members
            .create(
                &Object::new()
                    .with("project_id", project_id)
                    .with("user_id", "user-12345"),
            )
            .await
            .unwrap();
        let member_id = member.get_str("id").unwrap();

        let imported = members
            .import(&format!("{project_id}/{member_id}"))
            .await
            .unwrap();
        assert_eq!(imported, ReadOutcome::Present(member.clone()));

        let before = remote.request_count().await;
        let err = members.import(project_id).await.unwrap_err();
        assert_eq!(kind_of(&err), DiagnosticKind::MalformedImportId);
        assert_eq!(remote.request_count().await, before);
    }

    #[tokio::test]
    async fn test_import_seeded_project() {
        let remote = Arc::new(InMemoryRemote::new().with_project(ProjectRecord {
            id: "0faaecfb-d154-4f8f-bdc8-fccd630ddb39".to_string(),
            name: "test1".to_string(),
            description: None,
            organisation_id: "org1".to_string(),
            archived: false,
            archived_at: Some(String::new()),
            created_at: "2024-01-01T00:00:00Z".to_string(),
            updated_at: "2024-01-01T00:00:00Z".to_string(),
        }));
        let projects = Reconciler::new(ProjectAdapter, remote);

        let imported = projects
            .import("0faaecfb-d154-4f8f-bdc8-fccd630ddb39")
            .await
            .unwrap()
            .into_object()
            .unwrap();

        assert_eq!(imported.get_str("name"), Some("test1"));
        assert!(imported.get("archived_at").is_null());
    }

    #[tokio::test]
    async fn test_cancelled_call_is_transport_error() {
        let (remote, projects, _) = setup();
        let token = CancellationToken::new();
        let projects = projects.with_cancellation(token.clone());
        token.cancel();

        let err = projects
            .create(&Object::new().with("name", "web"))
            .await
            .unwrap_err();
        assert_eq!(kind_of(&err), DiagnosticKind::TransportError);
        assert_eq!(remote.request_count().await, 0);
    }
}
