//! Thin façade in front of the invoker core's Container Pool: wraps a
//! `faas_core::PoolHandle` and keeps an `ActionRegistry` mapping deployed
//! action names to their scheduling limits.

use std::collections::HashMap;
use std::sync::Mutex;

use faas_common::{ActionLimits, ActionRef, ActivationMessage};
use faas_core::{PoolHandle, PoolMessage};
use thiserror::Error;
use tracing::{info, instrument};

#[derive(Error, Debug)]
pub enum Error {
    #[error("action not registered: {0}")]
    ActionNotFound(String),
    #[error("registry lock poisoned")]
    RegistryPoisoned,
}

pub type Result<T> = std::result::Result<T, Error>;

/// Static action/limits entry for deploy-time registration; the shape of
/// each element of the `FAAS_ACTIONS_CONFIG` JSON array `faas-bin` parses
/// at startup.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ActionConfig {
    pub action: ActionRef,
    pub limits: ActionLimits,
}

#[derive(Debug, Clone)]
struct ActionEntry {
    action: ActionRef,
    limits: ActionLimits,
}

/// Deploy-time catalog of known actions and their concurrency/memory/timeout
/// limits, consulted on every `submit_activation` before scheduling it.
#[derive(Debug, Default)]
pub struct ActionRegistry {
    actions: Mutex<HashMap<String, ActionEntry>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, action: ActionRef, limits: ActionLimits) -> Result<()> {
        let mut actions = self.actions.lock().map_err(|_| Error::RegistryPoisoned)?;
        info!(action = %action.qualified_name(), "registering action");
        actions.insert(action.qualified_name(), ActionEntry { action, limits });
        Ok(())
    }

    pub fn limits_for(&self, action: &ActionRef) -> Result<ActionLimits> {
        let actions = self.actions.lock().map_err(|_| Error::RegistryPoisoned)?;
        actions
            .get(&action.qualified_name())
            .map(|entry| entry.limits)
            .ok_or_else(|| Error::ActionNotFound(action.qualified_name()))
    }
}

/// Submits activations to the Pool on behalf of the ingress layer
/// (the invoker's Axum handler), sitting between the job router and the
/// Container Pool.
#[derive(Clone)]
pub struct Orchestrator {
    pool: PoolHandle,
    registry: std::sync::Arc<ActionRegistry>,
}

impl Orchestrator {
    pub fn new(pool: PoolHandle) -> Self {
        Self {
            pool,
            registry: std::sync::Arc::new(ActionRegistry::new()),
        }
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    #[instrument(skip(self, activation), fields(action = %activation.action.qualified_name()))]
    pub fn submit_activation(&self, activation: ActivationMessage) -> Result<()> {
        let limits = self.registry.limits_for(&activation.action)?;
        self.pool.send(PoolMessage::Run { activation, limits });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action() -> ActionRef {
        ActionRef {
            namespace: "guest".into(),
            name: "ptest04".into(),
            kind: "python:3".into(),
        }
    }

    #[test]
    fn unregistered_action_is_rejected() {
        let registry = ActionRegistry::new();
        let err = registry.limits_for(&action()).unwrap_err();
        assert!(matches!(err, Error::ActionNotFound(_)));
    }

    #[test]
    fn registered_action_returns_its_limits() {
        let registry = ActionRegistry::new();
        let limits = ActionLimits {
            max_concurrent: 4,
            memory_mb: 512,
            timeout_ms: 30_000,
        };
        registry.register(action(), limits).unwrap();
        let found = registry.limits_for(&action()).unwrap();
        assert_eq!(found.max_concurrent, 4);
    }
}
