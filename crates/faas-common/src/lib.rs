//! Wire types and boundary traits shared between the invoker core and its
//! external collaborators (activation ingress, the container runtime, the
//! fleet-state store).

mod action;
mod activation;
mod error;
mod model;
mod runtime;

pub use action::{ActionLimits, ActionRef};
pub use activation::{
    ActivationAckMessage, ActivationMessage, ActivationRecord, ActivationWindows,
};
pub use error::{FaasError, Result};
pub use model::ModelRef;
pub use runtime::{ContainerHandle, ContainerRuntime, InitBody, RunOutcomeWire, RunParams};

pub use async_trait::async_trait;
pub use tracing;
pub use uuid;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activation_message_round_trips_through_json() {
        let msg = ActivationMessage {
            namespace: "guest".into(),
            action: ActionRef {
                namespace: "guest".into(),
                name: "ptest04".into(),
                kind: "python:3".into(),
            },
            transaction_id: "tid-1".into(),
            activation_id: uuid::Uuid::new_v4(),
            blocking: true,
            init_args: Default::default(),
            locked_args: None,
            windows: ActivationWindows {
                pre_warm_minutes: 1,
                keep_alive_minutes: 2,
                pre_load_minutes: 3,
                off_load_minutes: 10,
            },
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("ptest04"));
        let back: ActivationMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back.action.name, msg.action.name);
    }
}
