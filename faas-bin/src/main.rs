use color_eyre::eyre;
use faas_core::{ModelConfig, PrewarmingConfig};
use faas_invoker_lib::{bootstrap, serve, ApiServerConfig, ApiState};
use faas_orchestrator::ActionConfig;
use tracing::info;

/// Reads the static prewarm list from `FAAS_PREWARM_CONFIGS`, a JSON array of
/// `PrewarmingConfig` objects. Absent or unparsable, the invoker starts with
/// no prewarms configured.
fn load_prewarm_configs() -> Vec<PrewarmingConfig> {
    let Ok(raw) = std::env::var("FAAS_PREWARM_CONFIGS") else {
        return Vec::new();
    };
    match serde_json::from_str(&raw) {
        Ok(configs) => configs,
        Err(err) => {
            tracing::warn!(%err, "FAAS_PREWARM_CONFIGS is not valid JSON, ignoring");
            Vec::new()
        }
    }
}

/// Reads the deploy-time action catalog from `FAAS_ACTIONS_CONFIG`, a JSON
/// array of `{action: {namespace, name, kind}, limits: {max_concurrent,
/// memory_mb, timeout_ms}}` objects. Absent or unparsable, no action is
/// registered and every `POST /activations` is rejected as unknown.
fn load_action_configs() -> Vec<ActionConfig> {
    let Ok(raw) = std::env::var("FAAS_ACTIONS_CONFIG") else {
        return Vec::new();
    };
    match serde_json::from_str(&raw) {
        Ok(configs) => configs,
        Err(err) => {
            tracing::warn!(%err, "FAAS_ACTIONS_CONFIG is not valid JSON, ignoring");
            Vec::new()
        }
    }
}

/// Reads the deploy-time model catalog from `FAAS_MODELS_CONFIG`, a JSON
/// array of `ModelConfig` objects. Absent or unparsable, no action is
/// inference-eligible and the opportunistic pre-loader never fires.
fn load_model_configs() -> Vec<ModelConfig> {
    let Ok(raw) = std::env::var("FAAS_MODELS_CONFIG") else {
        return Vec::new();
    };
    match serde_json::from_str(&raw) {
        Ok(configs) => configs,
        Err(err) => {
            tracing::warn!(%err, "FAAS_MODELS_CONFIG is not valid JSON, ignoring");
            Vec::new()
        }
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    dotenvy::dotenv().ok();
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    info!("starting invoker");

    let prewarm_configs = load_prewarm_configs();
    let action_configs = load_action_configs();
    let model_configs = load_model_configs();
    let (pool, orchestrator) = bootstrap(prewarm_configs, action_configs, model_configs).await?;

    let api_config = ApiServerConfig::default();
    let state = ApiState { orchestrator, pool };

    serve(api_config, state).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn missing_env_var_yields_no_prewarms() {
        std::env::remove_var("FAAS_PREWARM_CONFIGS");
        assert!(load_prewarm_configs().is_empty());
    }

    #[test]
    #[serial]
    fn malformed_json_falls_back_to_empty() {
        std::env::set_var("FAAS_PREWARM_CONFIGS", "not json");
        assert!(load_prewarm_configs().is_empty());
        std::env::remove_var("FAAS_PREWARM_CONFIGS");
    }

    #[test]
    #[serial]
    fn well_formed_json_is_parsed() {
        std::env::set_var(
            "FAAS_PREWARM_CONFIGS",
            r#"[{"initial_count":2,"kind":"python:3","memory_mb":256,"reactive":null}]"#,
        );
        let configs = load_prewarm_configs();
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].kind, "python:3");
        std::env::remove_var("FAAS_PREWARM_CONFIGS");
    }

    #[test]
    #[serial]
    fn well_formed_actions_config_is_parsed() {
        std::env::set_var(
            "FAAS_ACTIONS_CONFIG",
            r#"[{"action":{"namespace":"guest","name":"ptest04","kind":"python:3"},"limits":{"max_concurrent":4,"memory_mb":512,"timeout_ms":30000}}]"#,
        );
        let configs = load_action_configs();
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].action.name, "ptest04");
        assert_eq!(configs[0].limits.max_concurrent, 4);
        std::env::remove_var("FAAS_ACTIONS_CONFIG");
    }

    #[test]
    #[serial]
    fn missing_models_config_yields_no_models() {
        std::env::remove_var("FAAS_MODELS_CONFIG");
        assert!(load_model_configs().is_empty());
    }

    #[test]
    #[serial]
    fn well_formed_models_config_is_parsed() {
        std::env::set_var(
            "FAAS_MODELS_CONFIG",
            r#"[{"action_name":"ptest05","model_name":"ResNet50","model_size_mb":600,"model_loading_latency_ms":2000}]"#,
        );
        let configs = load_model_configs();
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].model_name, "ResNet50");
        std::env::remove_var("FAAS_MODELS_CONFIG");
    }
}
