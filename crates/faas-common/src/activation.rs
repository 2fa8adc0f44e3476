use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::action::ActionRef;

/// Per-function scheduling hints carried on every activation message: how
/// long to stay prewarmed, how long to idle before going cold, how long to
/// wait before opportunistically pre-loading a model, and how long to wait
/// before off-loading one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationWindows {
    pub pre_warm_minutes: u32,
    pub keep_alive_minutes: u32,
    pub pre_load_minutes: u32,
    pub off_load_minutes: u32,
}

impl Default for ActivationWindows {
    fn default() -> Self {
        Self {
            pre_warm_minutes: 0,
            keep_alive_minutes: 10,
            pre_load_minutes: 0,
            off_load_minutes: 0,
        }
    }
}

/// One queued invocation, as consumed from the activation message broker
/// (broker mechanics are out of scope; this is the boundary shape).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationMessage {
    pub namespace: String,
    pub action: ActionRef,
    pub transaction_id: String,
    pub activation_id: Uuid,
    pub blocking: bool,
    pub init_args: HashMap<String, String>,
    /// Possibly-encrypted locked arguments; decryption is out of scope.
    pub locked_args: Option<Vec<u8>>,
    pub windows: ActivationWindows,
}

/// The materialized result of running an activation, always produced so the
/// user receives a reply even on infrastructural failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationRecord {
    pub activation_id: Uuid,
    pub transaction_id: String,
    pub init_duration_ms: Option<u64>,
    pub run_duration_ms: u64,
    pub response: Option<Vec<u8>>,
    pub error: Option<String>,
    pub is_timeout: bool,
    pub logs: Option<String>,
}

/// The three acknowledgement shapes sent back over the activation
/// acknowledgement path; for blocking activations the result ack must
/// precede the completion ack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ActivationAckMessage {
    /// Data only, completion/slot-release still pending.
    Result(ActivationRecord),
    /// Data plus slot release, for non-blocking activations.
    CombinedCompletionAndResult(ActivationRecord),
    /// Slot release only, result already sent.
    Completion { activation_id: Uuid },
}
