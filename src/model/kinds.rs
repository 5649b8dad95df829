//! The managed kinds and their descriptors.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::descriptor::{AttributeDescriptor, ObjectDescriptor};
use crate::error::{ConfigError, SwitchcloudError};

static PROJECT_ATTRIBUTES: [AttributeDescriptor; 8] = [
    AttributeDescriptor::computed("id", "Identifier of the project").preserve_on_unknown(),
    AttributeDescriptor::input("name", "Name of the project")
        .required()
        .requires_replace(),
    AttributeDescriptor::input("description", "Description of the project").requires_replace(),
    AttributeDescriptor::computed("organisation_id", "Organisation owning the project"),
    AttributeDescriptor::computed("archived", "Whether the project is archived").boolean(),
    AttributeDescriptor::computed("archived_at", "When the project was archived"),
    AttributeDescriptor::computed("created_at", "When the project was created"),
    AttributeDescriptor::computed("updated_at", "When the project was last updated"),
];

static MEMBER_ATTRIBUTES: [AttributeDescriptor; 5] = [
    AttributeDescriptor::computed("id", "Identifier of the membership").preserve_on_unknown(),
    AttributeDescriptor::input("project_id", "Project the member belongs to")
        .required()
        .requires_replace(),
    AttributeDescriptor::input_computed("user_id", "Identifier of the member's user")
        .requires_replace(),
    AttributeDescriptor::input_computed("email", "Email of the member's user").requires_replace(),
    AttributeDescriptor::computed("display_name", "Display name of the member's user"),
];

/// Descriptor of a project.
pub static PROJECT: ObjectDescriptor = ObjectDescriptor {
    type_name: "switchcloud_project",
    attributes: &PROJECT_ATTRIBUTES,
    identity: &["id"],
};

/// Descriptor of a project membership, nested under its project.
pub static MEMBER: ObjectDescriptor = ObjectDescriptor {
    type_name: "switchcloud_project_member",
    attributes: &MEMBER_ATTRIBUTES,
    identity: &["project_id", "id"],
};

/// A managed kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// A project.
    Project,
    /// A project membership.
    ProjectMember,
}

impl ResourceKind {
    /// Returns the descriptor of this kind.
    #[must_use]
    pub fn descriptor(self) -> &'static ObjectDescriptor {
        match self {
            Self::Project => &PROJECT,
            Self::ProjectMember => &MEMBER,
        }
    }

    /// Returns the address prefix of this kind.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::ProjectMember => "project_member",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.prefix())
    }
}

/// Address of a managed object in state, e.g. `project_member.alice`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceAddress {
    /// The object's kind.
    pub kind: ResourceKind,
    /// The manifest key.
    pub key: String,
}

impl ResourceAddress {
    /// Creates a project address.
    #[must_use]
    pub fn project(key: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::Project,
            key: key.into(),
        }
    }

    /// Creates a project member address.
    #[must_use]
    pub fn member(key: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::ProjectMember,
            key: key.into(),
        }
    }
}

impl fmt::Display for ResourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.kind.prefix(), self.key)
    }
}

impl FromStr for ResourceAddress {
    type Err = SwitchcloudError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidAddress {
            address: s.to_string(),
        };
        let (prefix, key) = s.split_once('.').ok_or_else(invalid)?;
        if key.is_empty() {
            return Err(invalid().into());
        }
        let kind = match prefix {
            "project" => ResourceKind::Project,
            "project_member" => ResourceKind::ProjectMember,
            _ => return Err(invalid().into()),
        };
        Ok(Self {
            kind,
            key: key.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_parsing() {
        let address: ResourceAddress = "project_member.alice".parse().unwrap();
        assert_eq!(address, ResourceAddress::member("alice"));
        assert_eq!(address.to_string(), "project_member.alice");

        assert!("alice".parse::<ResourceAddress>().is_err());
        assert!("project.".parse::<ResourceAddress>().is_err());
        assert!("volume.data".parse::<ResourceAddress>().is_err());
    }

    #[test]
    fn test_addresses_order_by_kind_then_key() {
        let mut addresses = vec![
            ResourceAddress::member("alice"),
            ResourceAddress::project("web"),
            ResourceAddress::project("api"),
        ];
        addresses.sort();

        assert!(ResourceKind::Project < ResourceKind::ProjectMember);
        assert_eq!(
            addresses,
            vec![
                ResourceAddress::project("api"),
                ResourceAddress::project("web"),
                ResourceAddress::member("alice"),
            ]
        );
    }
}
