//! Diff engine for comparing the manifest against recorded state.
//!
//! Each declared object is planned through its kind's descriptor and
//! compared with the recorded object. Recorded objects the manifest no
//! longer declares are marked for deletion.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::config::Manifest;
use crate::model::{
    ID_ATTRIBUTE, Object, ObjectDescriptor, ResourceAddress, ResourceKind, Role, Value,
};
use crate::state::ProviderState;

/// Engine for computing diffs between the manifest and recorded state.
#[derive(Debug, Default)]
pub struct DiffEngine;

/// Difference for a single object.
#[derive(Debug, Clone)]
pub struct ResourceDiff {
    /// State address of the object.
    pub address: ResourceAddress,
    /// Type of difference.
    pub diff_type: DiffType,
    /// Per-attribute details.
    pub details: Vec<DiffDetail>,
    /// The planned object. Empty for deletions.
    pub planned: Object,
    /// The recorded object, if any.
    pub prior: Option<Object>,
    /// Address of the managed project a member refers to.
    pub depends_on: Option<ResourceAddress>,
}

/// Type of difference detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffType {
    /// Object needs to be created.
    Create,
    /// Object can be changed in place.
    Update,
    /// Object must be destroyed and recreated.
    Replace,
    /// Object needs to be deleted.
    Delete,
    /// Object is unchanged.
    NoChange,
}

/// Detail about a single attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffDetail {
    /// Attribute that differs.
    pub field: String,
    /// Recorded value.
    pub old_value: Option<String>,
    /// Planned value.
    pub new_value: Option<String>,
    /// Whether this change forces replacement.
    pub forces_replacement: bool,
}

/// Complete diff result.
#[derive(Debug, Default)]
pub struct DiffResult {
    /// All object diffs, projects before members, deletions last.
    pub diffs: Vec<ResourceDiff>,
    /// Number of objects to create.
    pub creates: usize,
    /// Number of objects to update.
    pub updates: usize,
    /// Number of objects to replace.
    pub replaces: usize,
    /// Number of objects to delete.
    pub deletes: usize,
    /// Number of unchanged objects.
    pub unchanged: usize,
}

impl DiffEngine {
    /// Creates a new diff engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes the diff between the manifest and recorded state.
    #[must_use]
    pub fn compute_diff(&self, manifest: &Manifest, state: &ProviderState) -> DiffResult {
        let mut diffs = Vec::new();
        let mut declared = HashSet::new();
        let mut project_ids: HashMap<&str, Value> = HashMap::new();

        for project in &manifest.projects {
            let address = project.address();
            let diff = Self::diff_object(
                address.clone(),
                &project.to_object(),
                state.get(&address).map(|r| &r.attributes),
                None,
            );

            let id = match diff.diff_type {
                DiffType::Create | DiffType::Replace => Value::Unknown,
                DiffType::Update | DiffType::NoChange | DiffType::Delete => {
                    diff.planned.get(ID_ATTRIBUTE).clone()
                }
            };
            project_ids.insert(project.key.as_str(), id);
            declared.insert(address);
            diffs.push(diff);
        }

        for member in &manifest.members {
            let address = member.address();
            let project_id = match (&member.project_id, &member.project) {
                (Some(literal), _) => Value::string(literal.as_str()),
                (None, Some(key)) => project_ids
                    .get(key.as_str())
                    .cloned()
                    .unwrap_or(Value::Unknown),
                (None, None) => Value::Null,
            };
            let diff = Self::diff_object(
                address.clone(),
                &member.to_object(project_id),
                state.get(&address).map(|r| &r.attributes),
                member.project_address(),
            );
            declared.insert(address);
            diffs.push(diff);
        }

        for address in state.addresses_for_teardown() {
            if declared.contains(&address) {
                continue;
            }
            debug!("{address} is no longer declared");
            let prior = state.get(&address).map(|r| r.attributes.clone());
            diffs.push(ResourceDiff {
                details: prior
                    .as_ref()
                    .map(|p| {
                        vec![DiffDetail {
                            field: String::from(ID_ATTRIBUTE),
                            old_value: Some(p.get(ID_ATTRIBUTE).to_string()),
                            new_value: None,
                            forces_replacement: false,
                        }]
                    })
                    .unwrap_or_default(),
                address,
                diff_type: DiffType::Delete,
                planned: Object::new(),
                prior,
                depends_on: None,
            });
        }

        let count = |t: DiffType| diffs.iter().filter(|d| d.diff_type == t).count();
        DiffResult {
            creates: count(DiffType::Create),
            updates: count(DiffType::Update),
            replaces: count(DiffType::Replace),
            deletes: count(DiffType::Delete),
            unchanged: count(DiffType::NoChange),
            diffs,
        }
    }

    fn diff_object(
        address: ResourceAddress,
        config: &Object,
        prior: Option<&Object>,
        depends_on: Option<ResourceAddress>,
    ) -> ResourceDiff {
        let descriptor = address.kind.descriptor();
        let planned = descriptor.plan(config, prior);

        let Some(prior) = prior else {
            debug!("{address} needs to be created");
            return ResourceDiff {
                details: creation_details(descriptor, &planned),
                address,
                diff_type: DiffType::Create,
                planned,
                prior: None,
                depends_on,
            };
        };

        let changed = descriptor.changed_attributes(prior, &planned);
        let details: Vec<DiffDetail> = changed
            .iter()
            .map(|attr| DiffDetail {
                field: attr.name.to_string(),
                old_value: present(prior.get(attr.name)),
                new_value: present(planned.get(attr.name)),
                forces_replacement: attr.forces_replacement(),
            })
            .collect();

        let (diff_type, planned) = if details.is_empty() {
            (DiffType::NoChange, planned)
        } else if details.iter().any(|d| d.forces_replacement) {
            (DiffType::Replace, descriptor.plan(config, None))
        } else {
            (DiffType::Update, planned)
        };
        debug!("{address}: {diff_type}");

        ResourceDiff {
            address,
            diff_type,
            details,
            planned,
            prior: Some(prior.clone()),
            depends_on,
        }
    }
}

fn creation_details(descriptor: &ObjectDescriptor, planned: &Object) -> Vec<DiffDetail> {
    descriptor
        .attributes
        .iter()
        .filter(|attr| attr.role != Role::Computed)
        .filter_map(|attr| {
            present(planned.get(attr.name)).map(|value| DiffDetail {
                field: attr.name.to_string(),
                old_value: None,
                new_value: Some(value),
                forces_replacement: false,
            })
        })
        .collect()
}

fn present(value: &Value) -> Option<String> {
    (!value.is_null()).then(|| value.to_string())
}

impl DiffResult {
    /// Returns true if there are any changes.
    #[must_use]
    pub const fn has_changes(&self) -> bool {
        self.total_changes() > 0
    }

    /// Returns the total number of changes.
    #[must_use]
    pub const fn total_changes(&self) -> usize {
        self.creates + self.updates + self.replaces + self.deletes
    }

    /// Filters to only diffs that require action.
    #[must_use]
    pub fn actionable_diffs(&self) -> Vec<&ResourceDiff> {
        self.diffs
            .iter()
            .filter(|d| d.diff_type != DiffType::NoChange)
            .collect()
    }
}

impl ResourceDiff {
    /// Returns the kind of the object.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        self.address.kind
    }
}

impl std::fmt::Display for DiffType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Replace => "replace",
            Self::Delete => "delete",
            Self::NoChange => "no change",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for ResourceDiff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.address, self.diff_type)?;
        if !self.details.is_empty() {
            write!(f, " (")?;
            for (i, detail) in self.details.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", detail.field)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}
