use std::collections::HashMap;
use std::sync::RwLock;

use faas_common::{ActionRef, ActivationWindows};

/// Process-wide `action -> windows` map, populated from every activation
/// message's four scheduling-hint integers. A `RwLock<HashMap<..>>`
/// is appropriate here (unlike Pool/Proxy state): this is read far more
/// often than written and has no actor of its own.
#[derive(Debug, Default)]
pub struct WindowRegistry {
    windows: RwLock<HashMap<String, ActivationWindows>>,
}

impl WindowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, action: &ActionRef, windows: ActivationWindows) {
        self.windows
            .write()
            .expect("window registry lock poisoned")
            .insert(action.qualified_name(), windows);
    }

    pub fn get(&self, action: &ActionRef) -> Option<ActivationWindows> {
        self.windows
            .read()
            .expect("window registry lock poisoned")
            .get(&action.qualified_name())
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(name: &str) -> ActionRef {
        ActionRef {
            namespace: "guest".into(),
            name: name.into(),
            kind: "python:3".into(),
        }
    }

    #[test]
    fn records_and_retrieves_per_action_windows() {
        let registry = WindowRegistry::new();
        assert!(registry.get(&action("ptest04")).is_none());

        registry.record(
            &action("ptest04"),
            ActivationWindows {
                pre_warm_minutes: 1,
                keep_alive_minutes: 5,
                pre_load_minutes: 2,
                off_load_minutes: 20,
            },
        );

        let windows = registry.get(&action("ptest04")).unwrap();
        assert_eq!(windows.keep_alive_minutes, 5);
        assert!(registry.get(&action("ptest05")).is_none());
    }
}
