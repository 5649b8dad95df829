// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Switchcloud
//!
//! Declarative reconciliation of Switchcloud projects and project members.
//!
//! ## Overview
//!
//! Each kind of remote object is described once by an [`ObjectDescriptor`]:
//! which attributes the user owns, which the server assigns, and which force
//! replacement when they change. A single generic [`Reconciler`] implements
//! create, read, update, delete and import for every kind on top of that
//! metadata and a per-kind [`RemoteAdapter`].
//!
//! ## Architecture
//!
//! 1. **Manifest**: projects and members declared in `switchcloud.yaml`
//! 2. **State**: the objects returned by the last successful calls
//! 3. **Planner**: compares both and drives the reconcilers
//!
//! ## Modules
//!
//! - [`model`]: Values, objects and per-kind descriptors
//! - [`validation`]: Configuration rules checked before any request
//! - [`remote`]: Transport, bearer-token decorator and per-kind adapters
//! - [`reconciler`]: The generic lifecycle engine
//! - [`provider`]: Transport stack and reconcilers for one run
//! - [`config`]: Manifest parsing and validation
//! - [`state`]: Local state file and locking
//! - [`planner`]: Diff computation, plans and execution
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! projects:
//!   - key: platform
//!     name: Platform
//!
//! members:
//!   - key: alice
//!     project: platform
//!     email: alice@example.com
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod planner;
pub mod provider;
pub mod reconciler;
pub mod remote;
pub mod state;
pub mod validation;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ConfigParser, ConfigValidator, Manifest};
pub use error::{Diagnostic, DiagnosticKind, Result, SwitchcloudError};
pub use model::{AttributeDescriptor, Object, ObjectDescriptor, ResourceAddress, Value};
pub use planner::{ApplyPlan, DiffEngine, PlanExecutor};
pub use provider::ProviderContext;
pub use reconciler::{DeleteOutcome, ObjectReconciler, ReadOutcome, Reconciler};
pub use remote::{AuthenticatedTransport, HttpTransport, InMemoryRemote, RemoteAdapter, Transport};
pub use state::{LocalStateStore, ProviderState, StateStore};
pub use validation::{ExclusivePair, RequiredInputs, ValidationRule};
