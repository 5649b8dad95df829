//! Manifest types.
//!
//! This module defines the structs that map to `switchcloud.yaml`: provider
//! settings, the local state location, and the declared projects and members.

use serde::{Deserialize, Serialize};

use crate::model::{Object, ResourceAddress, Value};

/// Default Switchcloud API endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.switchcloud.com";

/// The root manifest structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Manifest {
    /// Provider settings.
    #[serde(default)]
    pub provider: ProviderSettings,
    /// State location.
    #[serde(default)]
    pub state: StateSettings,
    /// Declared projects.
    #[serde(default)]
    pub projects: Vec<ProjectSpec>,
    /// Declared project members.
    #[serde(default)]
    pub members: Vec<MemberSpec>,
}

/// Connection settings for the remote API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderSettings {
    /// Base endpoint of the API.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// API key sent as a bearer token.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// HTTP client timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_endpoint() -> String {
    String::from(DEFAULT_ENDPOINT)
}

const fn default_timeout_secs() -> u64 {
    crate::remote::DEFAULT_TIMEOUT_SECS
}

/// Local state location.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StateSettings {
    /// Directory holding the state file, relative to the manifest.
    #[serde(default)]
    pub path: Option<String>,
}

/// A declared project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectSpec {
    /// Manifest key, unique among projects.
    pub key: String,
    /// Project name.
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
}

impl ProjectSpec {
    /// Returns the state address of this project.
    #[must_use]
    pub fn address(&self) -> ResourceAddress {
        ResourceAddress::project(&self.key)
    }

    /// Returns the configured attributes.
    #[must_use]
    pub fn to_object(&self) -> Object {
        Object::new()
            .with("name", self.name.as_str())
            .with("description", Value::optional(self.description.clone()))
    }
}

/// A declared project member.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemberSpec {
    /// Manifest key, unique among members.
    pub key: String,
    /// Key of a managed project.
    #[serde(default)]
    pub project: Option<String>,
    /// Literal ID of an unmanaged project.
    #[serde(default)]
    pub project_id: Option<String>,
    /// User ID of the member.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Email of the member.
    #[serde(default)]
    pub email: Option<String>,
}

impl MemberSpec {
    /// Returns the state address of this member.
    #[must_use]
    pub fn address(&self) -> ResourceAddress {
        ResourceAddress::member(&self.key)
    }

    /// Returns the address of the managed project this member references.
    #[must_use]
    pub fn project_address(&self) -> Option<ResourceAddress> {
        self.project.as_deref().map(ResourceAddress::project)
    }

    /// Returns the configured attributes with the given project ID.
    #[must_use]
    pub fn to_object(&self, project_id: Value) -> Object {
        Object::new()
            .with("project_id", project_id)
            .with("user_id", Value::optional(self.user_id.clone()))
            .with("email", Value::optional(self.email.clone()))
    }
}
