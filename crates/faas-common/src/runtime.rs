use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::ModelRef;

/// Handle to a running container process, as returned by the factory.
/// Cheap to clone; the Proxy that owns it is the only one that mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerHandle {
    pub container_id: String,
    /// Address of the in-container runtime proxy (`host:port`); the wire
    /// protocol spoken to it is out of scope.
    pub addr: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InitBody {
    pub code_base64: Option<String>,
    pub env: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunParams {
    pub payload: Vec<u8>,
    pub env: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunOutcomeWire {
    pub response: Option<Vec<u8>>,
    pub error: Option<String>,
    pub is_timeout: bool,
    pub logs: Option<String>,
}

/// Boundary contract for the container runtime factory: creation,
/// init/run/load/offload/destroy on a single container. Out of scope in
/// depth — models loading, user code compilation, and the in-container wire
/// format are the in-container runtime proxy's job, not this crate's.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn create(
        &self,
        transaction_id: &str,
        name: &str,
        image: &str,
        memory_mb: u32,
        cpu_share: Option<u32>,
    ) -> Result<ContainerHandle>;

    async fn initialize(
        &self,
        container: &ContainerHandle,
        init: &InitBody,
        timeout_ms: u64,
        max_concurrent: u32,
    ) -> Result<()>;

    async fn run(
        &self,
        container: &ContainerHandle,
        params: &RunParams,
        timeout_ms: u64,
    ) -> Result<RunOutcomeWire>;

    async fn load(&self, container: &ContainerHandle, model: &ModelRef, timeout_ms: u64)
        -> Result<()>;

    async fn offload(
        &self,
        container: &ContainerHandle,
        model: &ModelRef,
        timeout_ms: u64,
    ) -> Result<()>;

    async fn destroy(&self, container: &ContainerHandle) -> Result<()>;
}
