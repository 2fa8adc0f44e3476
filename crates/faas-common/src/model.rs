use serde::{Deserialize, Serialize};

/// Identifies one ML model for the `load`/`offload` boundary calls; the
/// catalog entry this is derived from (size, latency, arrival stats) lives
/// in the Model Table, not here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelRef {
    pub model_name: String,
    /// The action this model is native to (the one whose runs update its λ).
    pub owning_action: String,
}
