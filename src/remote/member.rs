//! Project member adapter.

use super::adapter::{RemoteAdapter, Route, decode, path_segment, supplied};
use super::project::PROJECTS_PATH;
use super::transport::{STATUS_CREATED, STATUS_NO_CONTENT, STATUS_OK, TransportRequest};
use super::types::{CreateMemberRequest, ProjectMemberRecord};
use crate::error::Result;
use crate::model::{MEMBER, Object, ObjectDescriptor};
use crate::validation::{ExclusivePair, RequiredInputs, ValidationRule};

/// A member is identified by exactly one of these.
pub const MEMBER_IDENTITY: ExclusivePair = ExclusivePair::new("user_id", "email");

/// Adapter for project memberships, nested under their project.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectMemberAdapter;

impl ProjectMemberAdapter {
    fn member_path(identity: &Object) -> Result<String> {
        let project_id = path_segment(identity, "project_id")?;
        let id = path_segment(identity, "id")?;
        Ok(format!("{PROJECTS_PATH}/{project_id}/members/{id}"))
    }
}

impl RemoteAdapter for ProjectMemberAdapter {
    fn descriptor(&self) -> &'static ObjectDescriptor {
        &MEMBER
    }

    fn validate(&self, desired: &Object) -> Result<()> {
        RequiredInputs(&MEMBER).check(desired)?;
        MEMBER_IDENTITY.check(desired)
    }

    fn create_route(&self, desired: &Object) -> Result<Route> {
        let project_id = path_segment(desired, "project_id")?;
        let body = CreateMemberRequest {
            user_id: supplied(desired, "user_id"),
            email: supplied(desired, "email"),
        };
        Ok(Route::new(
            TransportRequest::post(format!("{PROJECTS_PATH}/{project_id}/members"))
                .with_json(&body)?,
            STATUS_CREATED,
        ))
    }

    fn read_route(&self, identity: &Object) -> Result<Route> {
        Ok(Route::new(
            TransportRequest::get(Self::member_path(identity)?),
            STATUS_OK,
        ))
    }

    fn delete_route(&self, identity: &Object) -> Result<Option<Route>> {
        Ok(Some(Route::new(
            TransportRequest::delete(Self::member_path(identity)?),
            STATUS_NO_CONTENT,
        )))
    }

    fn parse_response(&self, body: &[u8]) -> Result<Object> {
        Ok(decode::<ProjectMemberRecord>(body, "project member")?.into_object())
    }
}
