use thiserror::Error;

#[derive(Error, Debug)]
pub enum FaasError {
    #[error("Container runtime error: {0}")]
    ContainerRuntime(String),

    #[error("Orchestration error: {0}")]
    Orchestration(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Action definition invalid: {0}")]
    DefinitionInvalid(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, FaasError>;
