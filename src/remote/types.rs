//! Wire types for the Switchcloud REST API.

use serde::{Deserialize, Serialize};

use crate::model::{Object, Value};

/// A project as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    /// Project ID.
    pub id: String,
    /// Project name.
    pub name: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Owning organisation.
    pub organisation_id: String,
    /// Whether the project is archived.
    #[serde(default)]
    pub archived: bool,
    /// Archive timestamp; empty or absent while not archived.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<String>,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
}

impl ProjectRecord {
    /// Converts the record into an object snapshot.
    #[must_use]
    pub fn into_object(self) -> Object {
        Object::new()
            .with("id", self.id)
            .with("name", self.name)
            .with("description", Value::optional(self.description))
            .with("organisation_id", self.organisation_id)
            .with("archived", self.archived)
            .with(
                "archived_at",
                Value::optional(self.archived_at.filter(|s| !s.is_empty())),
            )
            .with("created_at", self.created_at)
            .with("updated_at", self.updated_at)
    }
}

/// Body of a project create request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProjectRequest {
    /// Project name.
    pub name: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The user behind a membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberUser {
    /// User ID.
    pub id: String,
    /// User email.
    pub email: String,
    /// Display name.
    pub display_name: String,
}

/// Related resource links of a membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberLinks {
    /// Link to the project.
    pub project: String,
}

/// A project membership as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMemberRecord {
    /// Membership ID.
    pub id: String,
    /// Project ID.
    pub project_id: String,
    /// User ID.
    pub user_id: String,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Last update timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// Resource links.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<MemberLinks>,
    /// The member's user.
    pub user: MemberUser,
}

impl ProjectMemberRecord {
    /// Converts the record into an object snapshot.
    #[must_use]
    pub fn into_object(self) -> Object {
        Object::new()
            .with("id", self.id)
            .with("project_id", self.project_id)
            .with("user_id", self.user_id)
            .with("email", self.user.email)
            .with("display_name", self.user.display_name)
    }
}

/// Body of a member create request.
///
/// Fields that were not supplied are omitted from the JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateMemberRequest {
    /// User ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// User email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}
