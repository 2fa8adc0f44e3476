use std::collections::HashMap;
use std::sync::RwLock;

use faas_common::ModelRef;

/// Catalog entry for one ML model. `lambda` is the observed
/// per-minute arrival rate of its owning action; `arrival_probability` and
/// `expected_saved_latency` are derived and only valid as of the last
/// `update_all_derived` call.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelData {
    pub action_name: String,
    pub model_name: String,
    pub model_loading_latency_ms: u64,
    pub lambda: f64,
    pub arrival_probability: f64,
    pub model_size_mb: u32,
    pub expected_saved_latency_ms: f64,
}

impl ModelData {
    pub fn new(action_name: impl Into<String>, model_name: impl Into<String>, model_size_mb: u32, model_loading_latency_ms: u64) -> Self {
        Self {
            action_name: action_name.into(),
            model_name: model_name.into(),
            model_loading_latency_ms,
            lambda: 0.0,
            arrival_probability: 0.0,
            model_size_mb,
            expected_saved_latency_ms: 0.0,
        }
    }

    pub fn to_model_ref(&self) -> ModelRef {
        ModelRef {
            model_name: self.model_name.clone(),
            owning_action: self.action_name.clone(),
        }
    }
}

/// Static model-catalog entry for deploy-time registration; the shape of
/// each element of the `FAAS_MODELS_CONFIG` JSON array `faas-bin` parses at
/// startup. `lambda`/`arrival_probability`/`expected_saved_latency_ms` are
/// runtime-observed and deliberately absent here.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ModelConfig {
    pub action_name: String,
    pub model_name: String,
    pub model_size_mb: u32,
    pub model_loading_latency_ms: u64,
}

impl From<ModelConfig> for ModelData {
    fn from(cfg: ModelConfig) -> Self {
        ModelData::new(cfg.action_name, cfg.model_name, cfg.model_size_mb, cfg.model_loading_latency_ms)
    }
}

/// In-memory catalog of known inference models, keyed by action name (one
/// model per action). Static at boot; `lambda` is updated per invocation and
/// the derived fields are recomputed on a window.
#[derive(Debug, Default)]
pub struct ModelTable {
    models: RwLock<HashMap<String, ModelData>>,
}

impl ModelTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, model: ModelData) {
        self.models
            .write()
            .expect("model table lock poisoned")
            .insert(model.action_name.clone(), model);
    }

    pub fn find_by_action_name(&self, action_name: &str) -> Option<ModelData> {
        self.models
            .read()
            .expect("model table lock poisoned")
            .get(action_name)
            .cloned()
    }

    pub fn is_inference_eligible(&self, action_name: &str) -> bool {
        self.models
            .read()
            .expect("model table lock poisoned")
            .contains_key(action_name)
    }

    pub fn update_lambda(&self, action_name: &str, lambda: f64) {
        if let Some(model) = self
            .models
            .write()
            .expect("model table lock poisoned")
            .get_mut(action_name)
        {
            model.lambda = lambda;
        }
    }

    /// Recomputes `arrivalProbability = 1 - exp(-lambda * window)` and
    /// `expectedSavedLatency = arrivalProbability * modelLoadingLatency`
    /// for every model.
    pub fn update_all_derived(&self, window: f64) {
        let mut models = self.models.write().expect("model table lock poisoned");
        for model in models.values_mut() {
            model.arrival_probability = 1.0 - (-model.lambda * window).exp();
            model.expected_saved_latency_ms =
                model.arrival_probability * model.model_loading_latency_ms as f64;
        }
    }

    pub fn all(&self) -> Vec<ModelData> {
        self.models
            .read()
            .expect("model table lock poisoned")
            .values()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_all_derived_matches_closed_form() {
        let table = ModelTable::new();
        table.register(ModelData::new("ptest04", "ResNet50", 600, 2_000));
        table.update_lambda("ptest04", 0.1);
        table.update_all_derived(1.0);

        let model = table.find_by_action_name("ptest04").unwrap();
        let expected_prob = 1.0 - (-0.1_f64).exp();
        assert!((model.arrival_probability - expected_prob).abs() < 1e-9);
        assert!((model.expected_saved_latency_ms - expected_prob * 2_000.0).abs() < 1e-6);
    }

    #[test]
    fn unregistered_action_is_not_inference_eligible() {
        let table = ModelTable::new();
        table.register(ModelData::new("ptest04", "ResNet50", 600, 2_000));
        assert!(table.is_inference_eligible("ptest04"));
        assert!(!table.is_inference_eligible("ptest99"));
        assert!(table.find_by_action_name("ptest99").is_none());
    }
}
