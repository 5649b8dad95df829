//! State management module.
//!
//! This module provides:
//! - The recorded state of managed objects
//! - A local file backend with atomic writes
//! - Lock files to prevent concurrent modifications

mod local;
mod lock;
mod store;
mod types;

pub use local::{LocalStateStore, STATE_DIR};
pub use lock::{LOCK_EXPIRY_SECS, LockInfo, generate_holder_id};
pub use store::StateStore;
pub use types::{HistoryEntry, Operation, ProviderState, ResourceState, STATE_VERSION};
