//! State store trait definition.
//!
//! This module defines the common interface for state storage backends.

use async_trait::async_trait;

use super::lock::LockInfo;
use super::types::ProviderState;
use crate::error::Result;

/// Trait for state storage backends.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Loads the recorded state.
    ///
    /// Returns `None` if no state exists yet.
    async fn load(&self) -> Result<Option<ProviderState>>;

    /// Saves the recorded state.
    async fn save(&self, state: &ProviderState) -> Result<()>;

    /// Acquires a lock on the state for an operation.
    ///
    /// Returns lock information if successful.
    async fn acquire_lock(&self, holder: &str, operation: &str) -> Result<LockInfo>;

    /// Releases a lock on the state.
    async fn release_lock(&self, lock_id: &str) -> Result<()>;

    /// Removes the lock regardless of who holds it.
    async fn force_unlock(&self) -> Result<()>;

    /// Gets current lock information if locked.
    async fn get_lock_info(&self) -> Result<Option<LockInfo>>;

    /// Gets a human-readable location of the state.
    fn location(&self) -> String;
}
