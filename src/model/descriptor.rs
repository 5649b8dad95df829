//! Static per-kind attribute metadata.
//!
//! A descriptor decides, per attribute, how desired, prior and remote
//! values combine. It holds no state and performs no I/O.

use serde::Serialize;

use super::value::{Object, Value};
use crate::error::{Result, SwitchcloudError};

/// Name of the server-assigned identifier every kind carries.
pub const ID_ATTRIBUTE: &str = "id";

/// Who owns an attribute's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Role {
    /// Supplied by the user, never filled from prior state.
    Input,
    /// Assigned by the server; desired values are ignored.
    Computed,
    /// Optionally supplied; assigned by the server when absent.
    InputComputed,
}

/// What a change to an attribute requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReplacePolicy {
    /// The change can be applied in place.
    None,
    /// The object must be destroyed and recreated.
    RequiresReplace,
}

/// Scalar type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ValueType {
    /// String attribute.
    String,
    /// Boolean attribute.
    Bool,
}

/// Metadata for a single attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeDescriptor {
    /// Attribute name.
    pub name: &'static str,
    /// Ownership role.
    pub role: Role,
    /// Replacement policy.
    pub replace: ReplacePolicy,
    /// Keep the prior value at plan time instead of marking it unknown.
    pub preserve_on_unknown: bool,
    /// Must be known when the object is created.
    pub required: bool,
    /// Scalar type.
    pub value_type: ValueType,
    /// Human-readable description.
    pub description: &'static str,
}

impl AttributeDescriptor {
    const fn new(name: &'static str, role: Role, description: &'static str) -> Self {
        Self {
            name,
            role,
            replace: ReplacePolicy::None,
            preserve_on_unknown: false,
            required: false,
            value_type: ValueType::String,
            description,
        }
    }

    /// Declares a user-supplied attribute.
    #[must_use]
    pub const fn input(name: &'static str, description: &'static str) -> Self {
        Self::new(name, Role::Input, description)
    }

    /// Declares a server-assigned attribute.
    #[must_use]
    pub const fn computed(name: &'static str, description: &'static str) -> Self {
        Self::new(name, Role::Computed, description)
    }

    /// Declares an optionally supplied, server-defaulted attribute.
    #[must_use]
    pub const fn input_computed(name: &'static str, description: &'static str) -> Self {
        Self::new(name, Role::InputComputed, description)
    }

    /// Marks the attribute as forcing replacement when changed.
    #[must_use]
    pub const fn requires_replace(mut self) -> Self {
        self.replace = ReplacePolicy::RequiresReplace;
        self
    }

    /// Marks the attribute as keeping its prior value at plan time.
    #[must_use]
    pub const fn preserve_on_unknown(mut self) -> Self {
        self.preserve_on_unknown = true;
        self
    }

    /// Marks the attribute as required at create.
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Marks the attribute as boolean.
    #[must_use]
    pub const fn boolean(mut self) -> Self {
        self.value_type = ValueType::Bool;
        self
    }

    /// Returns true if a change to this attribute forces replacement.
    #[must_use]
    pub const fn forces_replacement(&self) -> bool {
        matches!(self.replace, ReplacePolicy::RequiresReplace)
    }
}

/// Metadata for one kind of remote object.
#[derive(Debug)]
pub struct ObjectDescriptor {
    /// Type name used in diagnostics and logs.
    pub type_name: &'static str,
    /// All attributes of the kind.
    pub attributes: &'static [AttributeDescriptor],
    /// Identity attributes, outermost first. Their order defines the import id format.
    pub identity: &'static [&'static str],
}

impl ObjectDescriptor {
    /// Looks up an attribute by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&'static AttributeDescriptor> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Verifies the descriptor's structural invariants.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first violated invariant.
    pub fn check(&self) -> Result<()> {
        let ids: Vec<_> = self
            .attributes
            .iter()
            .filter(|a| a.name == ID_ATTRIBUTE)
            .collect();
        match ids.as_slice() {
            [id] if id.role == Role::Computed => {}
            [_] => {
                return Err(SwitchcloudError::internal(format!(
                    "{}: '{ID_ATTRIBUTE}' must be computed",
                    self.type_name
                )));
            }
            _ => {
                return Err(SwitchcloudError::internal(format!(
                    "{}: expected exactly one '{ID_ATTRIBUTE}' attribute",
                    self.type_name
                )));
            }
        }

        if let Some(missing) = self.identity.iter().find(|n| self.attribute(n).is_none()) {
            return Err(SwitchcloudError::internal(format!(
                "{}: identity attribute '{missing}' is not declared",
                self.type_name
            )));
        }

        if let Some(attr) = self
            .attributes
            .iter()
            .find(|a| a.role == Role::Computed && a.forces_replacement())
        {
            return Err(SwitchcloudError::internal(format!(
                "{}: computed attribute '{}' cannot require replacement",
                self.type_name, attr.name
            )));
        }

        Ok(())
    }

    /// Describes the import identifier format, e.g. `project_id/id`.
    #[must_use]
    pub fn import_format(&self) -> String {
        self.identity.join("/")
    }

    /// Extracts the identity attributes of an object.
    #[must_use]
    pub fn identity_of(&self, object: &Object) -> Object {
        self.identity
            .iter()
            .map(|name| (*name, object.get(name).clone()))
            .collect()
    }

    /// Combines a desired object with the remote representation returned by a create.
    ///
    /// Computed attributes take the remote value. Inputs keep the desired
    /// value unless it was unknown. Input-computed attributes keep a known
    /// desired value and otherwise take the remote one.
    #[must_use]
    pub fn merge_created(&self, desired: &Object, remote: &Object) -> Object {
        self.attributes
            .iter()
            .map(|attr| {
                let wanted = desired.get(attr.name);
                let value = match attr.role {
                    Role::Input if !wanted.is_unknown() => wanted.clone(),
                    Role::InputComputed if wanted.is_known() => wanted.clone(),
                    Role::Input | Role::InputComputed | Role::Computed => {
                        remote.get(attr.name).clone()
                    }
                };
                (attr.name, value)
            })
            .collect()
    }

    /// Resolves the planned object for a configuration against prior state.
    ///
    /// Values that cannot be known before apply are `Unknown`, except for
    /// attributes that preserve a known prior value.
    #[must_use]
    pub fn plan(&self, config: &Object, prior: Option<&Object>) -> Object {
        self.attributes
            .iter()
            .map(|attr| {
                let configured = config.get(attr.name);
                let carried = prior
                    .map(|p| p.get(attr.name))
                    .filter(|v| attr.preserve_on_unknown && v.is_known())
                    .cloned()
                    .unwrap_or(Value::Unknown);
                let value = match attr.role {
                    Role::Input => configured.clone(),
                    Role::InputComputed if configured.is_known() => configured.clone(),
                    Role::InputComputed | Role::Computed => carried,
                };
                (attr.name, value)
            })
            .collect()
    }

    /// Lists the user-controlled attributes whose desired value differs from prior.
    ///
    /// Computed attributes are never compared. An input-computed attribute
    /// only counts when the desired value is known.
    #[must_use]
    pub fn changed_attributes(
        &self,
        prior: &Object,
        desired: &Object,
    ) -> Vec<&'static AttributeDescriptor> {
        self.attributes
            .iter()
            .filter(|attr| {
                let next = desired.get(attr.name);
                match attr.role {
                    Role::Computed => false,
                    Role::Input => next != prior.get(attr.name),
                    Role::InputComputed => next.is_known() && next != prior.get(attr.name),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MEMBER, PROJECT};

    static BROKEN_ATTRIBUTES: [AttributeDescriptor; 2] = [
        AttributeDescriptor::computed("id", "Identifier"),
        AttributeDescriptor::computed("owner", "Owner").requires_replace(),
    ];

    static BROKEN: ObjectDescriptor = ObjectDescriptor {
        type_name: "broken",
        attributes: &BROKEN_ATTRIBUTES,
        identity: &["id"],
    };

    #[test]
    fn test_builtin_descriptors_are_valid() {
        PROJECT.check().unwrap();
        MEMBER.check().unwrap();
        assert_eq!(MEMBER.import_format(), "project_id/id");
    }

    #[test]
    fn test_computed_replace_is_rejected() {
        assert!(BROKEN.check().is_err());
    }

    #[test]
    fn test_merge_created_follows_roles() {
        let desired = Object::new()
            .with("project_id", "p1")
            .with("email", "alice@example.com")
            .with("user_id", Value::Unknown)
            .with("display_name", "ignored");
        let remote = Object::new()
            .with("id", "m1")
            .with("project_id", "p1")
            .with("user_id", "u1")
            .with("email", "ALICE@example.com")
            .with("display_name", "alice");

        let merged = MEMBER.merge_created(&desired, &remote);

        assert_eq!(merged.get_str("id"), Some("m1"));
        assert_eq!(merged.get_str("user_id"), Some("u1"));
        assert_eq!(merged.get_str("email"), Some("alice@example.com"));
        assert_eq!(merged.get_str("display_name"), Some("alice"));
        assert!(!merged.has_unknown());
    }

    #[test]
    fn test_plan_preserves_id_only() {
        let prior = Object::new()
            .with("id", "p1")
            .with("name", "web")
            .with("created_at", "2024-01-01T00:00:00Z");
        let config = Object::new().with("name", "web");

        let planned = PROJECT.plan(&config, Some(&prior));
        assert_eq!(planned.get_str("id"), Some("p1"));
        assert!(planned.get("created_at").is_unknown());

        let fresh = PROJECT.plan(&config, None);
        assert!(fresh.get("id").is_unknown());
    }

    #[test]
    fn test_changed_attributes_ignores_computed_and_unset_input_computed() {
        let prior = Object::new()
            .with("id", "m1")
            .with("project_id", "p1")
            .with("user_id", "u1")
            .with("email", "alice@example.com");
        let desired = Object::new()
            .with("id", "other")
            .with("project_id", "p1")
            .with("user_id", "u1")
            .with("email", Value::Unknown);

        assert!(MEMBER.changed_attributes(&prior, &desired).is_empty());

        let moved = desired.with("project_id", "p2");
        let changed = MEMBER.changed_attributes(&prior, &moved);
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].name, "project_id");
        assert!(changed[0].forces_replacement());
    }
}
