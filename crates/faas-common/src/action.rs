use serde::{Deserialize, Serialize};

/// The scheduling key for an action: namespace + name + exec runtime kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionRef {
    pub namespace: String,
    pub name: String,
    /// Exec runtime kind, e.g. "python:3", "nodejs:20". Used to match prewarms.
    pub kind: String,
}

impl ActionRef {
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

/// Concurrency/memory/timeout caps for an action, sourced from its deploy
/// record (out of scope) and carried on the activation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionLimits {
    pub max_concurrent: u32,
    pub memory_mb: u32,
    pub timeout_ms: u64,
}

impl Default for ActionLimits {
    fn default() -> Self {
        Self {
            max_concurrent: 1,
            memory_mb: 256,
            timeout_ms: 60_000,
        }
    }
}
