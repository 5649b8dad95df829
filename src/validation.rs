//! Pre-reconciliation checks over desired objects.
//!
//! Rules run before any request is built. A violation is reported as a
//! configuration error and no request is sent. `Unknown`, `Null` and the
//! empty string are all treated as "not supplied".

use crate::error::{ReconcileError, Result};
use crate::model::{Object, ObjectDescriptor};

/// A check over a desired object.
pub trait ValidationRule: Send + Sync {
    /// Checks the desired object.
    ///
    /// # Errors
    ///
    /// Returns a configuration error describing the violation.
    fn check(&self, desired: &Object) -> Result<()>;
}

/// Exactly one of two attributes must be supplied.
#[derive(Debug, Clone, Copy)]
pub struct ExclusivePair {
    first: &'static str,
    second: &'static str,
}

impl ExclusivePair {
    /// Creates the rule for two attribute names.
    #[must_use]
    pub const fn new(first: &'static str, second: &'static str) -> Self {
        Self { first, second }
    }
}

impl ValidationRule for ExclusivePair {
    fn check(&self, desired: &Object) -> Result<()> {
        let first = desired.get(self.first).is_supplied();
        let second = desired.get(self.second).is_supplied();
        if first == second {
            return Err(ReconcileError::configuration(
                format!(
                    "exactly one of '{}' or '{}' must be configured",
                    self.first, self.second
                ),
                self.first,
            )
            .into());
        }
        Ok(())
    }
}

/// Every required attribute of a descriptor must be known.
#[derive(Debug, Clone, Copy)]
pub struct RequiredInputs(pub &'static ObjectDescriptor);

impl ValidationRule for RequiredInputs {
    fn check(&self, desired: &Object) -> Result<()> {
        match self
            .0
            .attributes
            .iter()
            .find(|a| a.required && !desired.get(a.name).is_supplied())
        {
            Some(attr) => Err(ReconcileError::configuration(
                format!("attribute '{}' is required", attr.name),
                attr.name,
            )
            .into()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PROJECT, Value};

    const IDENTITY: ExclusivePair = ExclusivePair::new("user_id", "email");

    #[test]
    fn test_exactly_one_passes() {
        let desired = Object::new().with("email", "alice@example.com");
        assert!(IDENTITY.check(&desired).is_ok());

        let desired = Object::new()
            .with("user_id", "u1")
            .with("email", Value::Unknown);
        assert!(IDENTITY.check(&desired).is_ok());
    }

    #[test]
    fn test_neither_or_both_fail() {
        let neither = Object::new()
            .with("user_id", Value::Unknown)
            .with("email", Value::Null);
        let both = Object::new()
            .with("user_id", "u1")
            .with("email", "alice@example.com");

        for desired in [neither, both] {
            let err = IDENTITY.check(&desired).unwrap_err();
            assert!(err.to_string().contains("exactly one of 'user_id' or 'email'"));
        }
    }

    #[test]
    fn test_empty_identity_is_not_supplied() {
        let desired = Object::new().with("user_id", "").with("email", Value::Null);
        assert!(IDENTITY.check(&desired).is_err());

        let desired = Object::new()
            .with("user_id", "")
            .with("email", "alice@example.com");
        assert!(IDENTITY.check(&desired).is_ok());
    }

    #[test]
    fn test_required_inputs() {
        let rule = RequiredInputs(&PROJECT);
        assert!(rule.check(&Object::new().with("name", "web")).is_ok());
        assert!(rule.check(&Object::new().with("name", Value::Unknown)).is_err());
        assert!(rule.check(&Object::new().with("name", "")).is_err());
    }
}
