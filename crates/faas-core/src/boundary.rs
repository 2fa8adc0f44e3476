use async_trait::async_trait;
use faas_common::{ActivationAckMessage, ActivationRecord};
use tracing::info;

/// Outbound activation-acknowledgement path. Real wire format (the
/// message bus the invoker acks back to) is out of scope; the ordering
/// rule — result ack precedes completion ack for blocking activations — is
/// enforced by the call sites in `proxy.rs`, not by this trait.
#[async_trait]
pub trait ActiveAckClient: Send + Sync {
    async fn send_ack(&self, transaction_id: &str, message: ActivationAckMessage);
}

/// Outbound persistence of the activation record.
#[async_trait]
pub trait ActivationStore: Send + Sync {
    async fn store_activation(&self, transaction_id: &str, record: &ActivationRecord, blocking: bool);
}

/// Outbound log collection; `logs_to_be_collected` gates whether
/// `collect_logs` is even invoked.
#[async_trait]
pub trait LogCollector: Send + Sync {
    fn logs_to_be_collected(&self, action_kind: &str) -> bool;
    async fn collect_logs(&self, transaction_id: &str, container_id: &str) -> Option<String>;
}

pub struct NoopAckClient;

#[async_trait]
impl ActiveAckClient for NoopAckClient {
    async fn send_ack(&self, transaction_id: &str, message: ActivationAckMessage) {
        info!(transaction_id, ?message, "activation ack (noop sink)");
    }
}

pub struct NoopActivationStore;

#[async_trait]
impl ActivationStore for NoopActivationStore {
    async fn store_activation(&self, transaction_id: &str, record: &ActivationRecord, blocking: bool) {
        info!(
            transaction_id,
            activation_id = %record.activation_id,
            blocking,
            "activation persisted (noop sink)"
        );
    }
}

pub struct NoopLogCollector;

#[async_trait]
impl LogCollector for NoopLogCollector {
    fn logs_to_be_collected(&self, _action_kind: &str) -> bool {
        false
    }

    async fn collect_logs(&self, _transaction_id: &str, _container_id: &str) -> Option<String> {
        None
    }
}
