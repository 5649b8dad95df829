//! Project adapter and lookup.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::adapter::{RemoteAdapter, Route, decode, known_str, path_segment, supplied};
use super::transport::{STATUS_CREATED, STATUS_OK, Transport, TransportRequest, dispatch};
use super::types::{CreateProjectRequest, ProjectRecord};
use crate::error::{ReconcileError, Result};
use crate::model::{Object, ObjectDescriptor, PROJECT};

/// Collection path of projects.
pub const PROJECTS_PATH: &str = "/api/v1/projects";

/// Adapter for projects.
///
/// Projects can be created and read. The API offers no update or delete.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectAdapter;

impl RemoteAdapter for ProjectAdapter {
    fn descriptor(&self) -> &'static ObjectDescriptor {
        &PROJECT
    }

    fn create_route(&self, desired: &Object) -> Result<Route> {
        let name = known_str(desired, "name")?;
        let body = CreateProjectRequest {
            name: name.to_string(),
            description: supplied(desired, "description"),
        };
        Ok(Route::new(
            TransportRequest::post(PROJECTS_PATH).with_json(&body)?,
            STATUS_CREATED,
        ))
    }

    fn read_route(&self, identity: &Object) -> Result<Route> {
        let id = path_segment(identity, "id")?;
        Ok(Route::new(
            TransportRequest::get(format!("{PROJECTS_PATH}/{id}")),
            STATUS_OK,
        ))
    }

    fn parse_response(&self, body: &[u8]) -> Result<Object> {
        Ok(decode::<ProjectRecord>(body, "project")?.into_object())
    }
}

/// Read-only lookup of an existing project by name.
pub struct ProjectLookup {
    transport: Arc<dyn Transport>,
    cancellation: Option<CancellationToken>,
}

impl ProjectLookup {
    /// Creates a lookup over a transport.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            cancellation: None,
        }
    }

    /// Aborts the lookup when the token is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Finds the project with the given name.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no project has that name, or the usual
    /// transport, rejection and decode errors.
    pub async fn find_by_name(&self, name: &str) -> Result<Object> {
        let response = dispatch(
            self.transport.as_ref(),
            self.cancellation.as_ref(),
            TransportRequest::get(PROJECTS_PATH),
        )
        .await?;
        if response.status != STATUS_OK {
            return Err(ReconcileError::rejected(response.status, response.text()).into());
        }

        let projects: Vec<ProjectRecord> = decode(&response.body, "project list")?;
        debug!(count = projects.len(), name, "searching projects");

        projects
            .into_iter()
            .find(|p| p.name == name)
            .map(ProjectRecord::into_object)
            .ok_or_else(|| {
                ReconcileError::NotFound {
                    type_name: PROJECT.type_name.to_string(),
                    attribute: "name".to_string(),
                    value: name.to_string(),
                }
                .into()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SwitchcloudError;
    use crate::remote::InMemoryRemote;

    fn seeded() -> Arc<InMemoryRemote> {
        Arc::new(InMemoryRemote::new().with_project(ProjectRecord {
            id: "0faaecfb-d154-4f8f-bdc8-fccd630ddb39".to_string(),
            name: "test1".to_string(),
            description: None,
            organisation_id: "org1".to_string(),
            archived: false,
            archived_at: None,
            created_at: "2024-01-01T00:00:00Z".to_string(),
            updated_at: "2024-01-01T00:00:00Z".to_string(),
        }))
    }

    #[test]
    fn test_create_body_omits_unsupplied_description() {
        let desired = Object::new()
            .with("name", "Test Project")
            .with("description", crate::model::Value::Unknown);
        let route = ProjectAdapter.create_route(&desired).unwrap();

        assert_eq!(route.expect, STATUS_CREATED);
        assert_eq!(
            route.request.body.as_deref(),
            Some(br#"{"name":"Test Project"}"#.as_slice())
        );
    }

    #[test]
    fn test_import_takes_whole_string() {
        let identity = ProjectAdapter
            .parse_import_id("0faaecfb-d154-4f8f-bdc8-fccd630ddb39")
            .unwrap();
        assert_eq!(
            identity.get_str("id"),
            Some("0faaecfb-d154-4f8f-bdc8-fccd630ddb39")
        );
        assert_eq!(identity.len(), 1);
    }

    #[test]
    fn test_import_rejects_ids_spanning_other_routes() {
        for id in ["", "abc/def", "abc/", "abc?x=1", "abc#frag"] {
            let err = ProjectAdapter.parse_import_id(id).unwrap_err();
            assert!(
                matches!(
                    err,
                    SwitchcloudError::Reconcile(ReconcileError::MalformedImportId { .. })
                ),
                "{id} should be rejected"
            );
        }
    }

    #[test]
    fn test_read_route_rejects_unsafe_id() {
        let identity = Object::new().with("id", "abc/def");
        let err = ProjectAdapter.read_route(&identity).unwrap_err();
        assert!(matches!(
            err,
            SwitchcloudError::Reconcile(ReconcileError::Configuration { .. })
        ));
    }

    #[tokio::test]
    async fn test_lookup_by_name() {
        let lookup = ProjectLookup::new(seeded());

        let project = lookup.find_by_name("test1").await.unwrap();
        assert_eq!(
            project.get_str("id"),
            Some("0faaecfb-d154-4f8f-bdc8-fccd630ddb39")
        );

        let err = lookup.find_by_name("missing").await.unwrap_err();
        assert!(matches!(
            err,
            SwitchcloudError::Reconcile(ReconcileError::NotFound { .. })
        ));
    }
}
