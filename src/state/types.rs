//! State types for tracking managed objects.
//!
//! The state maps resource addresses to the last objects returned by the
//! reconciler. It is the only thing persisted between runs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Object, ResourceAddress, ResourceKind};

/// Current version of the state format.
pub const STATE_VERSION: &str = "1";

/// Maximum number of history entries kept.
const MAX_HISTORY: usize = 100;

/// The complete recorded state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderState {
    /// State format version.
    pub version: String,
    /// Endpoint the objects live on.
    pub endpoint: String,
    /// Recorded objects keyed by address.
    pub resources: BTreeMap<String, ResourceState>,
    /// When the state was last updated.
    pub last_updated: DateTime<Utc>,
    /// Operation history (recent entries).
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

/// A single recorded object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceState {
    /// The object's kind.
    pub kind: ResourceKind,
    /// The object as last returned by the remote.
    pub attributes: Object,
    /// When the object was recorded.
    pub recorded_at: DateTime<Utc>,
}

/// A single entry in the operation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// When the operation ran.
    pub timestamp: DateTime<Utc>,
    /// Type of operation.
    pub operation: Operation,
    /// Addresses affected.
    pub resources: Vec<String>,
    /// Whether every action succeeded.
    pub success: bool,
    /// Optional error message.
    #[serde(default)]
    pub error: Option<String>,
}

/// Types of state-changing operations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Plan execution.
    Apply,
    /// Refresh from the remote.
    Refresh,
    /// Adoption of an existing object.
    Import,
    /// Removal of every managed object.
    Destroy,
    /// Removal of a record without touching the remote.
    Forget,
}

impl ProviderState {
    /// Creates a new empty state.
    #[must_use]
    pub fn new(endpoint: &str) -> Self {
        Self {
            version: STATE_VERSION.to_string(),
            endpoint: endpoint.to_string(),
            resources: BTreeMap::new(),
            last_updated: Utc::now(),
            history: Vec::new(),
        }
    }

    /// Gets a recorded object.
    #[must_use]
    pub fn get(&self, address: &ResourceAddress) -> Option<&ResourceState> {
        self.resources.get(&address.to_string())
    }

    /// Records an object, replacing any previous record.
    pub fn record(&mut self, address: &ResourceAddress, attributes: Object) {
        self.resources.insert(
            address.to_string(),
            ResourceState {
                kind: address.kind,
                attributes,
                recorded_at: Utc::now(),
            },
        );
        self.last_updated = Utc::now();
    }

    /// Removes a record.
    pub fn remove(&mut self, address: &ResourceAddress) -> Option<ResourceState> {
        let removed = self.resources.remove(&address.to_string());
        if removed.is_some() {
            self.last_updated = Utc::now();
        }
        removed
    }

    /// Returns every recorded address, members first.
    ///
    /// Members must be removed before the projects they belong to.
    #[must_use]
    pub fn addresses_for_teardown(&self) -> Vec<ResourceAddress> {
        let mut addresses: Vec<ResourceAddress> =
            self.resources.keys().filter_map(|k| k.parse().ok()).collect();
        addresses.sort_by_key(|a| (a.kind == ResourceKind::Project, a.key.clone()));
        addresses
    }

    /// Returns the number of recorded objects.
    #[must_use]
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    /// Adds a history entry, dropping the oldest beyond the limit.
    pub fn add_history(&mut self, entry: HistoryEntry) {
        self.history.push(entry);
        if self.history.len() > MAX_HISTORY {
            let excess = self.history.len() - MAX_HISTORY;
            self.history.drain(..excess);
        }
    }
}

impl HistoryEntry {
    /// Creates an entry timestamped now.
    #[must_use]
    pub fn new(operation: Operation, resources: Vec<String>, error: Option<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            operation,
            resources,
            success: error.is_none(),
            error,
        }
    }
}
