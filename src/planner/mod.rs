//! Planning module for apply operations.
//!
//! This module compares the manifest with recorded state, orders the
//! resulting actions, and executes them through the reconcilers.

mod diff;
mod executor;
mod plan;

pub use diff::{DiffDetail, DiffEngine, DiffResult, DiffType, ResourceDiff};
pub use executor::{ActionResult, ActionStatus, ExecutionResult, PlanExecutor, RefreshReport};
pub use plan::{ActionType, ApplyPlan, PlannedAction, ReplaceOrder};
