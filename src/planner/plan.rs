//! Apply plan types and construction.
//!
//! This module turns a diff into an ordered list of actions: deletions
//! (members before projects), then projects, then members.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{Object, ResourceAddress, ResourceKind};
use crate::state::ProviderState;

use super::diff::{DiffResult, DiffType, ResourceDiff};

/// How a replacement is carried out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReplaceOrder {
    /// Delete the old object, then create the new one.
    #[default]
    DestroyFirst,
    /// Create the new object, then delete the old one.
    CreateFirst,
}

/// A complete apply plan.
#[derive(Debug)]
pub struct ApplyPlan {
    /// When the plan was created.
    pub created_at: DateTime<Utc>,
    /// Planned actions in execution order.
    pub actions: Vec<PlannedAction>,
    /// Replacement strategy.
    pub replace_order: ReplaceOrder,
}

/// A single planned action.
#[derive(Debug, Clone)]
pub struct PlannedAction {
    /// Action type.
    pub action_type: ActionType,
    /// State address of the object.
    pub address: ResourceAddress,
    /// The planned object. Empty for deletions.
    pub planned: Object,
    /// The recorded object, if any.
    pub prior: Option<Object>,
    /// Reason for this action.
    pub reason: String,
    /// Address of the managed project a member refers to.
    pub depends_on: Option<ResourceAddress>,
    /// Dependencies (action indices that must complete first).
    pub dependencies: Vec<usize>,
}

/// Types of actions in a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Create a new object.
    Create,
    /// Change an object in place.
    Update,
    /// Destroy and recreate an object.
    Replace,
    /// Delete an object.
    Delete,
}

impl ApplyPlan {
    /// Creates a new plan from a diff result.
    #[must_use]
    pub fn from_diff(diff: &DiffResult, replace_order: ReplaceOrder) -> Self {
        let mut actions: Vec<PlannedAction> = Vec::new();

        let deletes = diff
            .diffs
            .iter()
            .filter(|d| d.diff_type == DiffType::Delete);
        for resource_diff in deletes {
            actions.push(PlannedAction::from_resource_diff(
                resource_diff,
                ActionType::Delete,
                "Removed from manifest",
            ));
        }

        let mut indices: HashMap<ResourceAddress, usize> = HashMap::new();
        for kind in [ResourceKind::Project, ResourceKind::ProjectMember] {
            for resource_diff in diff.diffs.iter().filter(|d| d.kind() == kind) {
                let (action_type, reason) = match resource_diff.diff_type {
                    DiffType::Create => (ActionType::Create, String::from("Declared in manifest")),
                    DiffType::Update => (ActionType::Update, changed_fields(resource_diff)),
                    DiffType::Replace => (ActionType::Replace, changed_fields(resource_diff)),
                    DiffType::Delete | DiffType::NoChange => continue,
                };

                let mut action =
                    PlannedAction::from_resource_diff(resource_diff, action_type, reason);
                if let Some(dep) = action.depends_on.as_ref().and_then(|a| indices.get(a)) {
                    action.dependencies.push(*dep);
                }
                indices.insert(action.address.clone(), actions.len());
                actions.push(action);
            }
        }

        Self {
            created_at: Utc::now(),
            actions,
            replace_order,
        }
    }

    /// Creates a plan deleting every recorded object, members first.
    #[must_use]
    pub fn destroy(state: &ProviderState) -> Self {
        let actions = state
            .addresses_for_teardown()
            .into_iter()
            .map(|address| PlannedAction {
                action_type: ActionType::Delete,
                prior: state.get(&address).map(|r| r.attributes.clone()),
                address,
                planned: Object::new(),
                reason: String::from("Destroy requested"),
                depends_on: None,
                dependencies: vec![],
            })
            .collect();

        Self {
            created_at: Utc::now(),
            actions,
            replace_order: ReplaceOrder::default(),
        }
    }

    /// Returns true if the plan is empty (no changes).
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Returns the number of actions.
    #[must_use]
    pub const fn action_count(&self) -> usize {
        self.actions.len()
    }

    /// Returns the number of actions of a type.
    #[must_use]
    pub fn count(&self, action_type: ActionType) -> usize {
        self.actions
            .iter()
            .filter(|a| a.action_type == action_type)
            .count()
    }
}

fn changed_fields(diff: &ResourceDiff) -> String {
    let fields: Vec<&str> = diff.details.iter().map(|d| d.field.as_str()).collect();
    format!("Changed: {}", fields.join(", "))
}

impl PlannedAction {
    fn from_resource_diff(
        diff: &ResourceDiff,
        action_type: ActionType,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            action_type,
            address: diff.address.clone(),
            planned: diff.planned.clone(),
            prior: diff.prior.clone(),
            reason: reason.into(),
            depends_on: diff.depends_on.clone(),
            dependencies: vec![],
        }
    }

    /// Returns a human-readable description of the action.
    #[must_use]
    pub fn description(&self) -> String {
        match self.action_type {
            ActionType::Create => format!("Create {}", self.address),
            ActionType::Update => format!("Update {} in place", self.address),
            ActionType::Replace => format!("Replace {}", self.address),
            ActionType::Delete => format!("Delete {}", self.address),
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Replace => "replace",
            Self::Delete => "delete",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for PlannedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.action_type, self.address)?;
        if !self.reason.is_empty() {
            write!(f, " ({})", self.reason)?;
        }
        Ok(())
    }
}

impl std::fmt::Display for ApplyPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.actions.is_empty() {
            return write!(f, "No changes required");
        }

        writeln!(f, "Apply Plan ({} actions):", self.actions.len())?;
        for (i, action) in self.actions.iter().enumerate() {
            writeln!(f, "  {i}. {action}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Manifest, MemberSpec, ProjectSpec};
    use crate::planner::DiffEngine;

    fn manifest() -> Manifest {
        Manifest {
            projects: vec![ProjectSpec {
                key: String::from("platform"),
                name: String::from("Platform"),
                description: Some(String::from("Core services")),
            }],
            members: vec![MemberSpec {
                key: String::from("alice"),
                project: Some(String::from("platform")),
                project_id: None,
                user_id: Some(String::from("u1")),
                email: None,
            }],
            ..Manifest::default()
        }
    }

    #[test]
    fn test_plan_orders_deletes_then_projects_then_members() {
        let mut state = ProviderState::new("https://api.switchcloud.com");
        state.record(&ResourceAddress::member("old"), Object::new().with("id", "m0"));

        let diff = DiffEngine::new().compute_diff(&manifest(), &state);
        let plan = ApplyPlan::from_diff(&diff, ReplaceOrder::default());

        let order: Vec<String> = plan
            .actions
            .iter()
            .map(|a| format!("{} {}", a.action_type, a.address))
            .collect();
        assert_eq!(
            order,
            vec![
                "delete project_member.old",
                "create project.platform",
                "create project_member.alice",
            ]
        );
        assert_eq!(plan.actions[2].dependencies, vec![1]);
        assert_eq!(plan.count(ActionType::Create), 2);
    }

    #[test]
    fn test_empty_plan() {
        let diff = DiffEngine::new().compute_diff(
            &Manifest::default(),
            &ProviderState::new("https://api.switchcloud.com"),
        );
        let plan = ApplyPlan::from_diff(&diff, ReplaceOrder::CreateFirst);
        assert!(plan.is_empty());
        assert_eq!(plan.to_string(), "No changes required");
    }

    #[test]
    fn test_destroy_plan_tears_down_members_first() {
        let mut state = ProviderState::new("https://api.switchcloud.com");
        state.record(&ResourceAddress::project("platform"), Object::new());
        state.record(&ResourceAddress::member("alice"), Object::new());

        let plan = ApplyPlan::destroy(&state);
        assert_eq!(plan.count(ActionType::Delete), 2);
        assert_eq!(plan.actions[0].address, ResourceAddress::member("alice"));
        assert!(plan.actions.iter().all(|a| a.prior.is_some()));
    }
}
