use thiserror::Error;

/// Error taxonomy for the invoker core. Activation-producing errors are
/// always materialized into an `ActivationRecord` by the caller; infra
/// errors (store, logs) are swallowed after being logged.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("container startup failed: {0}")]
    Startup(String),

    #[error("container initialization failed: {0}")]
    Init(String),

    #[error("container health check failed: {0}")]
    Health(String),

    #[error("container run failed: {0}")]
    Run(String),

    #[error("log collection failed: {0}")]
    LogCollection(String),

    #[error("external store error: {0}")]
    Store(String),

    #[error("docker api error: {0}")]
    Docker(#[from] docktopus::bollard::errors::Error),

    #[error("runtime proxy transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<CoreError> for faas_common::FaasError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Store(msg) => faas_common::FaasError::Internal(msg),
            other => faas_common::FaasError::ContainerRuntime(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
