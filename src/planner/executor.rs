//! Plan executor for applying apply plans.
//!
//! This module runs planned actions through the reconcilers, records the
//! returned objects in state, and also drives refresh, import and destroy.

use std::collections::HashSet;

use tracing::{debug, error, info, warn};

use crate::error::{ConfigError, Diagnostic, ReconcileError, Result, SwitchcloudError};
use crate::model::{ID_ATTRIBUTE, Object, ResourceAddress, ResourceKind};
use crate::provider::ProviderContext;
use crate::reconciler::{DeleteOutcome, ReadOutcome};
use crate::state::{HistoryEntry, Operation, ProviderState};

use super::plan::{ActionType, ApplyPlan, PlannedAction, ReplaceOrder};

/// Attribute of a member holding its project's identifier.
const PROJECT_REFERENCE: &str = "project_id";

/// Executor for apply plans.
#[derive(Clone)]
pub struct PlanExecutor<'a> {
    /// Provider the reconcilers come from.
    provider: &'a ProviderContext,
    /// Whether to continue on errors.
    continue_on_error: bool,
}

/// How a single action ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionStatus {
    /// The action completed.
    Succeeded,
    /// The action failed.
    Failed(Diagnostic),
    /// The action was not attempted.
    Skipped,
}

/// Result of executing a single action.
#[derive(Debug)]
pub struct ActionResult {
    /// Action index.
    pub index: usize,
    /// Action that was executed.
    pub action: PlannedAction,
    /// How the action ended.
    pub status: ActionStatus,
    /// Identifier of the object the action produced or removed.
    pub object_id: Option<String>,
}

/// Result of executing the entire plan.
#[derive(Debug)]
pub struct ExecutionResult {
    /// Individual action results.
    pub results: Vec<ActionResult>,
    /// Total actions executed.
    pub total_executed: usize,
    /// Number of successful actions.
    pub successful: usize,
    /// Number of failed actions.
    pub failed: usize,
    /// Number of skipped actions (due to dependency failures).
    pub skipped: usize,
    /// Whether the entire plan succeeded.
    pub success: bool,
}

/// Result of refreshing recorded state.
#[derive(Debug, Default)]
pub struct RefreshReport {
    /// Addresses whose record was replaced by the remote representation.
    pub refreshed: Vec<String>,
    /// Addresses dropped because the remote object is gone.
    pub dropped: Vec<String>,
    /// Addresses that could not be read; their record is kept.
    pub failed: Vec<(String, Diagnostic)>,
}

impl<'a> PlanExecutor<'a> {
    /// Creates a new plan executor.
    #[must_use]
    pub const fn new(provider: &'a ProviderContext) -> Self {
        Self {
            provider,
            continue_on_error: false,
        }
    }

    /// Sets whether to continue on errors.
    #[must_use]
    pub const fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    /// Executes an apply plan against recorded state.
    pub async fn execute(&self, plan: &ApplyPlan, state: &mut ProviderState) -> ExecutionResult {
        self.run(plan, state, Operation::Apply, self.continue_on_error)
            .await
    }

    /// Deletes every recorded object, members first.
    ///
    /// Objects whose kind cannot be deleted are reported as failed and keep
    /// their record.
    pub async fn destroy(&self, state: &mut ProviderState) -> ExecutionResult {
        let plan = ApplyPlan::destroy(state);
        self.run(&plan, state, Operation::Destroy, true).await
    }

    async fn run(
        &self,
        plan: &ApplyPlan,
        state: &mut ProviderState,
        operation: Operation,
        continue_on_error: bool,
    ) -> ExecutionResult {
        info!("Executing plan with {} actions", plan.actions.len());

        let cancellation = self.provider.cancellation_token();
        let mut results = Vec::new();
        let mut failed_indices: HashSet<usize> = HashSet::new();
        let mut halted = false;

        for (idx, action) in plan.actions.iter().enumerate() {
            let deps_failed = action
                .dependencies
                .iter()
                .any(|dep| failed_indices.contains(dep));

            if halted || deps_failed || cancellation.is_cancelled() {
                warn!("Skipping action {idx}: {}", action.description());
                failed_indices.insert(idx);
                results.push(ActionResult {
                    index: idx,
                    action: action.clone(),
                    status: ActionStatus::Skipped,
                    object_id: None,
                });
                continue;
            }

            info!("Executing action {idx}: {}", action.description());
            let result = match self.execute_action(action, plan.replace_order, state).await {
                Ok(object_id) => ActionResult {
                    index: idx,
                    action: action.clone(),
                    status: ActionStatus::Succeeded,
                    object_id,
                },
                Err(e) => {
                    error!("Failed to {} {}: {e}", action.action_type, action.address);
                    failed_indices.insert(idx);
                    halted = !continue_on_error;
                    ActionResult {
                        index: idx,
                        action: action.clone(),
                        status: ActionStatus::Failed(e.diagnostic()),
                        object_id: None,
                    }
                }
            };
            results.push(result);
        }

        let successful = results
            .iter()
            .filter(|r| r.status == ActionStatus::Succeeded)
            .count();
        let skipped = results
            .iter()
            .filter(|r| r.status == ActionStatus::Skipped)
            .count();
        let failed = results.len() - successful - skipped;

        let execution_result = ExecutionResult {
            total_executed: results.len(),
            successful,
            failed,
            skipped,
            success: failed == 0 && skipped == 0,
            results,
        };

        if !plan.is_empty() {
            let error = (!execution_result.success).then(|| {
                format!(
                    "{} actions failed, {} skipped",
                    execution_result.failed, execution_result.skipped
                )
            });
            state.add_history(HistoryEntry::new(
                operation,
                plan.actions.iter().map(|a| a.address.to_string()).collect(),
                error,
            ));
        }

        execution_result
    }

    /// Executes a single action and returns the affected object's identifier.
    async fn execute_action(
        &self,
        action: &PlannedAction,
        replace_order: ReplaceOrder,
        state: &mut ProviderState,
    ) -> Result<Option<String>> {
        let reconciler = self.provider.reconciler(action.address.kind);
        let descriptor = reconciler.descriptor();

        match action.action_type {
            ActionType::Create => {
                let desired = resolve_references(action, state)?;
                let created = reconciler.create(&desired).await?;
                let id = object_id(&created);
                info!("Created {} (ID: {})", action.address, id.as_deref().unwrap_or("-"));
                state.record(&action.address, created);
                Ok(id)
            }
            ActionType::Update => {
                let prior = recorded(action)?;
                let desired = resolve_references(action, state)?;
                let updated = reconciler.update(prior, &desired).await?;
                let id = object_id(&updated);
                state.record(&action.address, updated);
                Ok(id)
            }
            ActionType::Replace => {
                let prior = recorded(action)?;
                let identity = descriptor.identity_of(prior);
                let created = match replace_order {
                    ReplaceOrder::DestroyFirst => {
                        reconciler.delete(&identity).await?;
                        state.remove(&action.address);
                        let desired = resolve_references(action, state)?;
                        let created = reconciler.create(&desired).await?;
                        state.record(&action.address, created.clone());
                        created
                    }
                    ReplaceOrder::CreateFirst => {
                        let desired = resolve_references(action, state)?;
                        let created = reconciler.create(&desired).await?;
                        state.record(&action.address, created.clone());
                        reconciler.delete(&identity).await?;
                        created
                    }
                };
                info!("Replaced {}", action.address);
                Ok(object_id(&created))
            }
            ActionType::Delete => {
                let Some(prior) = &action.prior else {
                    debug!("No record for {}, considering delete successful", action.address);
                    state.remove(&action.address);
                    return Ok(None);
                };

                let outcome = reconciler.delete(&descriptor.identity_of(prior)).await?;
                if outcome == DeleteOutcome::AlreadyAbsent {
                    info!("{} was already deleted", action.address);
                }
                state.remove(&action.address);
                Ok(object_id(prior))
            }
        }
    }

    /// Reads every recorded object and updates state with the result.
    pub async fn refresh(&self, state: &mut ProviderState) -> RefreshReport {
        let mut report = RefreshReport::default();

        for address in state.addresses_for_teardown() {
            let Some(record) = state.get(&address) else {
                continue;
            };
            let reconciler = self.provider.reconciler(address.kind);
            let identity = reconciler.descriptor().identity_of(&record.attributes);

            match reconciler.read(&identity).await {
                Ok(ReadOutcome::Present(object)) => {
                    state.record(&address, object);
                    report.refreshed.push(address.to_string());
                }
                Ok(ReadOutcome::Absent) => {
                    info!("Dropping {address}: no longer exists remotely");
                    state.remove(&address);
                    report.dropped.push(address.to_string());
                }
                Err(e) => {
                    error!("Failed to refresh {address}: {e}");
                    report.failed.push((address.to_string(), e.diagnostic()));
                }
            }
        }

        let error = (!report.failed.is_empty())
            .then(|| format!("{} objects could not be read", report.failed.len()));
        let touched = report
            .refreshed
            .iter()
            .chain(&report.dropped)
            .cloned()
            .collect();
        state.add_history(HistoryEntry::new(Operation::Refresh, touched, error));

        report
    }

    /// Adopts an existing remote object under an address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is already recorded, the identifier
    /// is malformed, or the remote object does not exist.
    pub async fn import(
        &self,
        address: &ResourceAddress,
        external_id: &str,
        state: &mut ProviderState,
    ) -> Result<Object> {
        if state.get(address).is_some() {
            return Err(ConfigError::validation(
                format!("{address} is already managed; remove it from state first"),
                address.to_string(),
            )
            .into());
        }

        let reconciler = self.provider.reconciler(address.kind);
        let object = match reconciler.import(external_id).await? {
            ReadOutcome::Present(object) => object,
            ReadOutcome::Absent => {
                return Err(ReconcileError::NotFound {
                    type_name: reconciler.descriptor().type_name.to_string(),
                    attribute: reconciler.descriptor().import_format(),
                    value: external_id.to_string(),
                }
                .into());
            }
        };

        info!("Imported {address} from {external_id}");
        state.record(address, object.clone());
        state.add_history(HistoryEntry::new(
            Operation::Import,
            vec![address.to_string()],
            None,
        ));
        Ok(object)
    }
}

/// Fills a member's unknown project reference from the recorded project.
fn resolve_references(action: &PlannedAction, state: &ProviderState) -> Result<Object> {
    let desired = action.planned.clone();
    if action.address.kind != ResourceKind::ProjectMember
        || !desired.get(PROJECT_REFERENCE).is_unknown()
    {
        return Ok(desired);
    }

    let project_id = action
        .depends_on
        .as_ref()
        .and_then(|project| state.get(project))
        .and_then(|record| record.attributes.get_str(ID_ATTRIBUTE))
        .ok_or_else(|| {
            SwitchcloudError::from(ReconcileError::configuration(
                format!("the project of {} has no known identifier", action.address),
                PROJECT_REFERENCE,
            ))
        })?;
    debug!("Resolved {} {PROJECT_REFERENCE} to {project_id}", action.address);

    Ok(desired.with(PROJECT_REFERENCE, project_id))
}

fn recorded(action: &PlannedAction) -> Result<&Object> {
    action.prior.as_ref().ok_or_else(|| {
        SwitchcloudError::internal(format!("{} has no recorded object", action.address))
    })
}

fn object_id(object: &Object) -> Option<String> {
    object.get_str(ID_ATTRIBUTE).map(String::from)
}

impl ExecutionResult {
    /// Returns true if all actions succeeded.
    #[must_use]
    pub const fn all_successful(&self) -> bool {
        self.success && self.failed == 0 && self.skipped == 0
    }

    /// Returns the diagnostics of failed actions.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<(&PlannedAction, &Diagnostic)> {
        self.results
            .iter()
            .filter_map(|r| match &r.status {
                ActionStatus::Failed(diagnostic) => Some((&r.action, diagnostic)),
                ActionStatus::Succeeded | ActionStatus::Skipped => None,
            })
            .collect()
    }
}

impl std::fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Executed {} actions: {} successful, {} failed, {} skipped",
            self.total_executed, self.successful, self.failed, self.skipped
        )
    }
}
