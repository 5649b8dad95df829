//! Configuration module for the Switchcloud reconciler.
//!
//! This module handles all manifest-related functionality:
//! - Parsing and deserializing `switchcloud.yaml`
//! - Environment overrides for the provider settings
//! - Validation of declared projects and members

mod parser;
mod spec;
mod validator;

pub use parser::{
    API_KEY_ENV, ConfigParser, DEFAULT_CONFIG_FILES, ENDPOINT_ENV, apply_env_overrides,
    find_config_file,
};
pub use spec::{
    DEFAULT_ENDPOINT, Manifest, MemberSpec, ProjectSpec, ProviderSettings, StateSettings,
};
pub use validator::{ConfigValidator, ValidationError, ValidationResult};
