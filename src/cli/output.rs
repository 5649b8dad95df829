//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use serde::Serialize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::error::Diagnostic;
use crate::model::{ID_ATTRIBUTE, Object};
use crate::planner::{
    ActionStatus, ActionType, ApplyPlan, DiffResult, DiffType, ExecutionResult, RefreshReport,
};
use crate::state::ProviderState;

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Plan action row for table display.
#[derive(Tabled)]
struct PlanActionRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

/// Recorded object row for table display.
#[derive(Tabled)]
struct ResourceRow {
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Recorded")]
    recorded: String,
}

/// Attribute row for table display.
#[derive(Tabled)]
struct AttributeRow {
    #[tabled(rename = "Attribute")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats an apply plan for display.
    #[must_use]
    pub fn format_plan(&self, plan: &ApplyPlan) -> String {
        match self.format {
            OutputFormat::Json => to_json(&PlanJson::from(plan)),
            OutputFormat::Text => Self::format_plan_text(plan),
        }
    }

    fn format_plan_text(plan: &ApplyPlan) -> String {
        if plan.is_empty() {
            return format!(
                "{} No changes. Recorded state matches the manifest.\n",
                "✓".green()
            );
        }

        let mut output = String::from("\nApply Plan\n\n");

        let rows: Vec<PlanActionRow> = plan
            .actions
            .iter()
            .enumerate()
            .map(|(i, a)| PlanActionRow {
                index: i + 1,
                action: Self::format_action_type(a.action_type),
                address: a.address.to_string(),
                reason: Self::truncate(&a.reason, 50),
            })
            .collect();
        output.push_str(&Table::new(rows).to_string());
        output.push('\n');

        let _ = write!(
            output,
            "\nPlan: {} to create, {} to update, {} to replace, {} to destroy\n",
            plan.count(ActionType::Create).to_string().green(),
            plan.count(ActionType::Update).to_string().yellow(),
            plan.count(ActionType::Replace).to_string().yellow(),
            plan.count(ActionType::Delete).to_string().red()
        );

        output
    }

    /// Formats per-attribute changes of a diff.
    #[must_use]
    pub fn format_diff(&self, diff: &DiffResult) -> String {
        if self.format == OutputFormat::Json {
            return to_json(&DiffJson::from(diff));
        }

        let mut output = String::new();
        for resource in diff.actionable_diffs() {
            let marker = match resource.diff_type {
                DiffType::Create => "+".green(),
                DiffType::Update => "~".yellow(),
                DiffType::Replace => "-/+".yellow(),
                DiffType::Delete => "-".red(),
                DiffType::NoChange => " ".normal(),
            };
            let _ = writeln!(output, "  {marker} {}", resource.address);
            for detail in &resource.details {
                let old = detail.old_value.as_deref().unwrap_or("null");
                let new = detail.new_value.as_deref().unwrap_or("null");
                let note = if detail.forces_replacement {
                    " # forces replacement".red().to_string()
                } else {
                    String::new()
                };
                let _ = writeln!(output, "      {}: {old} -> {new}{note}", detail.field);
            }
        }
        output
    }

    /// Formats the result of executing a plan.
    #[must_use]
    pub fn format_execution(&self, result: &ExecutionResult) -> String {
        match self.format {
            OutputFormat::Json => to_json(&ExecutionJson::from(result)),
            OutputFormat::Text => {
                let status = if result.all_successful() {
                    format!("{} Apply complete", "✓".green())
                } else {
                    format!("{} Apply finished with errors", "✗".red())
                };

                let mut output = format!("{status}\n\n   {result}\n");
                let failures = result.diagnostics();
                if !failures.is_empty() {
                    let _ = write!(output, "\n{} Errors:\n", "⚠".yellow());
                    for (action, diagnostic) in failures {
                        let _ = writeln!(output, "   - {}: {diagnostic}", action.address);
                    }
                }
                output
            }
        }
    }

    /// Formats a refresh report.
    #[must_use]
    pub fn format_refresh(&self, report: &RefreshReport) -> String {
        match self.format {
            OutputFormat::Json => to_json(&RefreshJson::from(report)),
            OutputFormat::Text => {
                let mut output = format!(
                    "Refreshed {} objects, dropped {}, failed {}\n",
                    report.refreshed.len(),
                    report.dropped.len(),
                    report.failed.len()
                );
                for address in &report.dropped {
                    let _ = writeln!(output, "   {} {address} (gone)", "-".red());
                }
                for (address, diagnostic) in &report.failed {
                    let _ = writeln!(output, "   {} {address}: {diagnostic}", "✗".red());
                }
                output
            }
        }
    }

    /// Formats recorded state.
    #[must_use]
    pub fn format_state(&self, state: &ProviderState) -> String {
        match self.format {
            OutputFormat::Json => to_json(state),
            OutputFormat::Text => {
                let mut output = format!("\nState: {}\n\n", state.endpoint);

                let _ = writeln!(output, "   Version: {}", state.version);
                let _ = writeln!(output, "   Last updated: {}", state.last_updated);
                let _ = writeln!(output, "   Objects: {}\n", state.resource_count());

                if state.resource_count() > 0 {
                    let rows: Vec<ResourceRow> = state
                        .resources
                        .iter()
                        .map(|(address, record)| ResourceRow {
                            address: address.clone(),
                            id: record
                                .attributes
                                .get_str(ID_ATTRIBUTE)
                                .unwrap_or("-")
                                .to_string(),
                            recorded: record.recorded_at.format("%Y-%m-%d %H:%M").to_string(),
                        })
                        .collect();
                    output.push_str(&Table::new(rows).to_string());
                    output.push('\n');
                }

                if !state.history.is_empty() {
                    let _ = writeln!(output, "\n   Recent history ({}):", state.history.len());
                    for entry in state.history.iter().rev().take(5) {
                        let status = if entry.success { "✓" } else { "✗" };
                        let _ = writeln!(
                            output,
                            "     {status} {} - {:?} ({})",
                            entry.timestamp.format("%Y-%m-%d %H:%M"),
                            entry.operation,
                            entry.resources.join(", ")
                        );
                    }
                }

                output
            }
        }
    }

    /// Formats a single object.
    #[must_use]
    pub fn format_object(&self, title: &str, object: &Object) -> String {
        match self.format {
            OutputFormat::Json => to_json(object),
            OutputFormat::Text => {
                let rows: Vec<AttributeRow> = object
                    .iter()
                    .map(|(name, value)| AttributeRow {
                        name: name.to_string(),
                        value: value.to_string(),
                    })
                    .collect();
                format!("\n{}\n\n{}\n", title.bold(), Table::new(rows))
            }
        }
    }

    /// Formats a diagnostic.
    #[must_use]
    pub fn format_diagnostic(&self, diagnostic: &Diagnostic) -> String {
        match self.format {
            OutputFormat::Json => to_json(diagnostic),
            OutputFormat::Text => format!(
                "{} {}: {}",
                "✗".red(),
                diagnostic.summary.red().bold(),
                diagnostic.detail
            ),
        }
    }

    /// Formats an action type with color.
    fn format_action_type(action_type: ActionType) -> String {
        match action_type {
            ActionType::Create => "+create".green().to_string(),
            ActionType::Update => "~update".yellow().to_string(),
            ActionType::Replace => "-/+replace".yellow().to_string(),
            ActionType::Delete => "-delete".red().to_string(),
        }
    }

    /// Truncates a string to a maximum number of characters.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{kept}...")
        }
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

// JSON serialization helpers

#[derive(Serialize)]
struct PlanJson {
    action_count: usize,
    creates: usize,
    updates: usize,
    replaces: usize,
    deletes: usize,
    actions: Vec<ActionJson>,
}

#[derive(Serialize)]
struct ActionJson {
    action_type: ActionType,
    address: String,
    reason: String,
}

impl From<&ApplyPlan> for PlanJson {
    fn from(plan: &ApplyPlan) -> Self {
        Self {
            action_count: plan.action_count(),
            creates: plan.count(ActionType::Create),
            updates: plan.count(ActionType::Update),
            replaces: plan.count(ActionType::Replace),
            deletes: plan.count(ActionType::Delete),
            actions: plan
                .actions
                .iter()
                .map(|a| ActionJson {
                    action_type: a.action_type,
                    address: a.address.to_string(),
                    reason: a.reason.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct DiffJson {
    resources: Vec<ResourceDiffJson>,
}

#[derive(Serialize)]
struct ResourceDiffJson {
    address: String,
    diff_type: String,
    changes: Vec<ChangeJson>,
}

#[derive(Serialize)]
struct ChangeJson {
    field: String,
    old_value: Option<String>,
    new_value: Option<String>,
    forces_replacement: bool,
}

impl From<&DiffResult> for DiffJson {
    fn from(diff: &DiffResult) -> Self {
        Self {
            resources: diff
                .actionable_diffs()
                .into_iter()
                .map(|d| ResourceDiffJson {
                    address: d.address.to_string(),
                    diff_type: d.diff_type.to_string(),
                    changes: d
                        .details
                        .iter()
                        .map(|c| ChangeJson {
                            field: c.field.clone(),
                            old_value: c.old_value.clone(),
                            new_value: c.new_value.clone(),
                            forces_replacement: c.forces_replacement,
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct ExecutionJson<'a> {
    success: bool,
    successful: usize,
    failed: usize,
    skipped: usize,
    results: Vec<ActionResultJson<'a>>,
}

#[derive(Serialize)]
struct ActionResultJson<'a> {
    action_type: ActionType,
    address: String,
    status: &'static str,
    object_id: Option<&'a str>,
    diagnostic: Option<&'a Diagnostic>,
}

impl<'a> From<&'a ExecutionResult> for ExecutionJson<'a> {
    fn from(result: &'a ExecutionResult) -> Self {
        Self {
            success: result.all_successful(),
            successful: result.successful,
            failed: result.failed,
            skipped: result.skipped,
            results: result
                .results
                .iter()
                .map(|r| {
                    let (status, diagnostic) = match &r.status {
                        ActionStatus::Succeeded => ("succeeded", None),
                        ActionStatus::Failed(diagnostic) => ("failed", Some(diagnostic)),
                        ActionStatus::Skipped => ("skipped", None),
                    };
                    ActionResultJson {
                        action_type: r.action.action_type,
                        address: r.action.address.to_string(),
                        status,
                        object_id: r.object_id.as_deref(),
                        diagnostic,
                    }
                })
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct RefreshJson<'a> {
    refreshed: &'a [String],
    dropped: &'a [String],
    failed: Vec<FailedJson<'a>>,
}

#[derive(Serialize)]
struct FailedJson<'a> {
    address: &'a str,
    diagnostic: &'a Diagnostic,
}

impl<'a> From<&'a RefreshReport> for RefreshJson<'a> {
    fn from(report: &'a RefreshReport) -> Self {
        Self {
            refreshed: &report.refreshed,
            dropped: &report.dropped,
            failed: report
                .failed
                .iter()
                .map(|(address, diagnostic)| FailedJson {
                    address,
                    diagnostic,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Manifest, ProjectSpec};
    use crate::planner::{DiffEngine, ReplaceOrder};

    fn plan() -> ApplyPlan {
        let manifest = Manifest {
            projects: vec![ProjectSpec {
                key: String::from("platform"),
                name: String::from("Platform"),
                description: None,
            }],
            ..Manifest::default()
        };
        let diff = DiffEngine::new()
            .compute_diff(&manifest, &ProviderState::new("https://api.switchcloud.com"));
        ApplyPlan::from_diff(&diff, ReplaceOrder::default())
    }

    #[test]
    fn test_plan_json() {
        let output = OutputFormatter::new(OutputFormat::Json).format_plan(&plan());
        let json: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(json["creates"], 1);
        assert_eq!(json["actions"][0]["action_type"], "create");
        assert_eq!(json["actions"][0]["address"], "project.platform");
    }

    #[test]
    fn test_plan_text_lists_addresses() {
        colored::control::set_override(false);
        let output = OutputFormatter::new(OutputFormat::Text).format_plan(&plan());

        assert!(output.contains("project.platform"));
        assert!(output.contains("Plan: 1 to create, 0 to update, 0 to replace, 0 to destroy"));
    }

    #[test]
    fn test_object_json_keeps_nulls() {
        let object = Object::new()
            .with("id", "p1")
            .with("description", crate::model::Value::Null);
        let output = OutputFormatter::new(OutputFormat::Json).format_object("project", &object);
        let json: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(json["id"], "p1");
        assert!(json["description"].is_null());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(OutputFormatter::truncate("short", 10), "short");
        assert_eq!(OutputFormatter::truncate("a longer reason", 10), "a longe...");
    }
}
