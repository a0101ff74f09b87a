//! Per-call options.

use crate::client::PropagationPolicy;
use std::collections::BTreeMap;
use std::time::Duration;

/// Options for apply requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOptions {
    /// Recreate objects whose dry-run fails on an immutable field change.
    pub force: bool,

    /// Live objects with any of these label or annotation pairs are left
    /// alone and reported unchanged.
    pub exclusions: BTreeMap<String, String>,

    /// How long staged apply waits for definitions to become ready.
    pub wait_timeout: Duration,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        ApplyOptions {
            force: false,
            exclusions: BTreeMap::new(),
            wait_timeout: Duration::from_secs(60),
        }
    }
}

impl ApplyOptions {
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn exclude(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.exclusions.insert(key.into(), value.into());
        self
    }

    pub fn wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }
}

/// Options for delete requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOptions {
    pub propagation_policy: PropagationPolicy,

    /// When non-empty, only live objects carrying one of these label or
    /// annotation pairs are deleted.
    pub inclusions: BTreeMap<String, String>,

    /// Live objects carrying any of these pairs are never deleted.
    pub exclusions: BTreeMap<String, String>,
}

/// Options for readiness waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Time between readiness polls.
    pub interval: Duration,
    /// Time after which waiting fails.
    pub timeout: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        WaitOptions {
            interval: Duration::from_secs(2),
            timeout: Duration::from_secs(60),
        }
    }
}
