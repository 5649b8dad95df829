//! Manifest validation.
//!
//! This module checks a manifest before any remote call: provider settings,
//! key format and uniqueness, project references, and the member identity
//! rule.

use std::collections::HashSet;

use reqwest::Url;
use tracing::debug;

use super::spec::{Manifest, MemberSpec, ProjectSpec, ProviderSettings};
use crate::error::{ConfigError, ReconcileError, Result, SwitchcloudError};
use crate::model::{Object, Value};
use crate::remote::MEMBER_IDENTITY;
use crate::validation::{ExclusivePair, ValidationRule};

const PROJECT_REFERENCE: ExclusivePair = ExclusivePair::new("project", "project_id");

/// Validator for manifests.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a manifest.
    ///
    /// # Errors
    ///
    /// Returns the first validation error if any check fails.
    pub fn validate(&self, manifest: &Manifest) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        Self::validate_provider(&manifest.provider, &mut result);
        let project_keys = Self::validate_projects(&manifest.projects, &mut result);
        Self::validate_members(&manifest.members, &project_keys, &mut result);

        if result.errors.is_empty() {
            debug!("Configuration validation passed");
            Ok(result)
        } else {
            let first_error = &result.errors[0];
            Err(SwitchcloudError::Config(ConfigError::ValidationError {
                message: first_error.message.clone(),
                field: Some(first_error.field.clone()),
            }))
        }
    }

    fn validate_provider(provider: &ProviderSettings, result: &mut ValidationResult) {
        match Url::parse(&provider.endpoint) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => result.errors.push(ValidationError {
                field: String::from("provider.endpoint"),
                message: format!("Unsupported endpoint scheme '{}'", url.scheme()),
            }),
            Err(e) => result.errors.push(ValidationError {
                field: String::from("provider.endpoint"),
                message: format!("Invalid endpoint '{}': {e}", provider.endpoint),
            }),
        }

        if provider.timeout_secs == 0 {
            result.errors.push(ValidationError {
                field: String::from("provider.timeout_secs"),
                message: String::from("Timeout must be at least one second"),
            });
        }

        if provider.api_key.is_none() {
            result
                .warnings
                .push(String::from("No API key configured; requests will be unauthenticated"));
        }
    }

    fn validate_projects(projects: &[ProjectSpec], result: &mut ValidationResult) -> HashSet<String> {
        let mut keys = HashSet::new();

        for (i, project) in projects.iter().enumerate() {
            let field = format!("projects[{i}]");
            check_key(&project.key, &field, &mut keys, "project", result);

            if project.name.trim().is_empty() {
                result.errors.push(ValidationError {
                    field: format!("{field}.name"),
                    message: String::from("Project name cannot be empty"),
                });
            }
        }

        keys
    }

    fn validate_members(
        members: &[MemberSpec],
        project_keys: &HashSet<String>,
        result: &mut ValidationResult,
    ) {
        let mut keys = HashSet::new();

        for (i, member) in members.iter().enumerate() {
            let field = format!("members[{i}]");
            check_key(&member.key, &field, &mut keys, "member", result);

            let reference = Object::new()
                .with("project", Value::optional(member.project.clone()))
                .with("project_id", Value::optional(member.project_id.clone()));
            if let Err(e) = PROJECT_REFERENCE.check(&reference) {
                result.errors.push(ValidationError {
                    field: field.clone(),
                    message: reason(&e),
                });
            } else if let Some(project) = &member.project
                && !project_keys.contains(project)
            {
                result.errors.push(ValidationError {
                    field: format!("{field}.project"),
                    message: format!("Member '{}' references unknown project '{project}'", member.key),
                });
            }

            if let Err(e) = MEMBER_IDENTITY.check(&member.to_object(Value::Unknown)) {
                result.errors.push(ValidationError {
                    field: field.clone(),
                    message: reason(&e),
                });
            }
        }
    }
}

fn check_key(
    key: &str,
    field: &str,
    seen: &mut HashSet<String>,
    resource_type: &str,
    result: &mut ValidationResult,
) {
    if !is_valid_key(key) {
        result.errors.push(ValidationError {
            field: format!("{field}.key"),
            message: format!(
                "Key '{key}' is invalid. Must be lowercase alphanumeric with hyphens."
            ),
        });
    } else if !seen.insert(key.to_string()) {
        result.errors.push(ValidationError {
            field: format!("{field}.key"),
            message: ConfigError::DuplicateKey {
                resource_type: resource_type.to_string(),
                key: key.to_string(),
            }
            .to_string(),
        });
    }
}

fn reason(err: &SwitchcloudError) -> String {
    match err {
        SwitchcloudError::Reconcile(ReconcileError::Configuration { message, .. }) => {
            message.clone()
        }
        other => other.to_string(),
    }
}

/// Checks if a key is valid (lowercase alphanumeric with hyphens).
fn is_valid_key(key: &str) -> bool {
    let mut chars = key.chars();

    match chars.next() {
        Some(first) if first.is_ascii_lowercase() => {}
        _ => return false,
    }

    if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-') {
        return false;
    }

    !key.ends_with('-') && !key.contains("--")
}

impl ValidationResult {
    /// Returns true if validation passed.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}
