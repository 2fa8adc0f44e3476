use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use faas_common::{
    ContainerHandle, ContainerRuntime, InitBody, ModelRef, Result as CommonResult,
    RunOutcomeWire, RunParams,
};
use uuid::Uuid;

/// In-memory test double for `ContainerRuntime`, used by the Pool and
/// Proxy unit tests and by `faas-tester`'s end-to-end scenarios so the state
/// machine is fully exercised without a Docker daemon.
#[derive(Default)]
pub struct FakeContainerRuntime {
    containers: Mutex<HashMap<String, FakeContainer>>,
    /// Failure script: container names matching a key fail `create` with the value.
    pub fail_create: Mutex<HashMap<String, String>>,
    /// Failure script: container ids matching a key fail `run` with the value.
    pub fail_run: Mutex<HashMap<String, String>>,
    pub timeout_run: Mutex<std::collections::HashSet<String>>,
}

#[derive(Debug, Clone, Default)]
struct FakeContainer {
    initialized: bool,
    loaded_models: Vec<String>,
}

impl FakeContainerRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn loaded_models(&self, container_id: &str) -> Vec<String> {
        self.containers
            .lock()
            .expect("fake runtime lock poisoned")
            .get(container_id)
            .map(|c| c.loaded_models.clone())
            .unwrap_or_default()
    }

    /// All container ids this runtime has ever created and not yet destroyed;
    /// lets end-to-end scenario tests find the container a `Run` landed on
    /// without threading ids back through the ack/store boundary.
    pub fn container_ids(&self) -> Vec<String> {
        self.containers
            .lock()
            .expect("fake runtime lock poisoned")
            .keys()
            .cloned()
            .collect()
    }

    pub fn container_count(&self) -> usize {
        self.containers.lock().expect("fake runtime lock poisoned").len()
    }
}

#[async_trait]
impl ContainerRuntime for FakeContainerRuntime {
    async fn create(
        &self,
        _transaction_id: &str,
        name: &str,
        _image: &str,
        _memory_mb: u32,
        _cpu_share: Option<u32>,
    ) -> CommonResult<ContainerHandle> {
        if let Some(reason) = self.fail_create.lock().unwrap().get(name).cloned() {
            return Err(faas_common::FaasError::ContainerRuntime(reason));
        }
        let container_id = format!("fake-{}", Uuid::new_v4());
        self.containers
            .lock()
            .unwrap()
            .insert(container_id.clone(), FakeContainer::default());
        Ok(ContainerHandle {
            addr: format!("127.0.0.1:0/{container_id}"),
            container_id,
        })
    }

    async fn initialize(
        &self,
        container: &ContainerHandle,
        _init: &InitBody,
        _timeout_ms: u64,
        _max_concurrent: u32,
    ) -> CommonResult<()> {
        let mut containers = self.containers.lock().unwrap();
        let entry = containers
            .get_mut(&container.container_id)
            .ok_or_else(|| faas_common::FaasError::NotFound(container.container_id.clone()))?;
        entry.initialized = true;
        Ok(())
    }

    async fn run(
        &self,
        container: &ContainerHandle,
        params: &RunParams,
        _timeout_ms: u64,
    ) -> CommonResult<RunOutcomeWire> {
        if self.timeout_run.lock().unwrap().contains(&container.container_id) {
            return Ok(RunOutcomeWire {
                response: None,
                error: Some("simulated timeout".into()),
                is_timeout: true,
                logs: None,
            });
        }
        if let Some(reason) = self.fail_run.lock().unwrap().get(&container.container_id).cloned() {
            return Err(faas_common::FaasError::ContainerRuntime(reason));
        }
        let containers = self.containers.lock().unwrap();
        let entry = containers
            .get(&container.container_id)
            .ok_or_else(|| faas_common::FaasError::NotFound(container.container_id.clone()))?;
        if !entry.initialized {
            return Err(faas_common::FaasError::ContainerRuntime(
                "run before initialize".into(),
            ));
        }
        Ok(RunOutcomeWire {
            response: Some(params.payload.clone()),
            error: None,
            is_timeout: false,
            logs: Some("ok".into()),
        })
    }

    async fn load(
        &self,
        container: &ContainerHandle,
        model: &ModelRef,
        _timeout_ms: u64,
    ) -> CommonResult<()> {
        let mut containers = self.containers.lock().unwrap();
        let entry = containers
            .get_mut(&container.container_id)
            .ok_or_else(|| faas_common::FaasError::NotFound(container.container_id.clone()))?;
        entry.loaded_models.push(model.model_name.clone());
        Ok(())
    }

    async fn offload(
        &self,
        container: &ContainerHandle,
        model: &ModelRef,
        _timeout_ms: u64,
    ) -> CommonResult<()> {
        let mut containers = self.containers.lock().unwrap();
        let entry = containers
            .get_mut(&container.container_id)
            .ok_or_else(|| faas_common::FaasError::NotFound(container.container_id.clone()))?;
        entry.loaded_models.retain(|m| m != &model.model_name);
        Ok(())
    }

    async fn destroy(&self, container: &ContainerHandle) -> CommonResult<()> {
        self.containers.lock().unwrap().remove(&container.container_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_before_initialize_is_rejected() {
        let runtime = FakeContainerRuntime::new();
        let handle = runtime
            .create("tid", "c1", "python:3", 256, None)
            .await
            .unwrap();
        let err = runtime
            .run(&handle, &RunParams::default(), 1_000)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("run before initialize"));
    }

    #[tokio::test]
    async fn load_then_offload_clears_the_model() {
        let runtime = FakeContainerRuntime::new();
        let handle = runtime
            .create("tid", "c1", "python:3", 256, None)
            .await
            .unwrap();
        let model = ModelRef {
            model_name: "ResNet50".into(),
            owning_action: "ptest04".into(),
        };
        runtime.load(&handle, &model, 1_000).await.unwrap();
        assert_eq!(runtime.loaded_models(&handle.container_id), vec!["ResNet50"]);
        runtime.offload(&handle, &model, 1_000).await.unwrap();
        assert!(runtime.loaded_models(&handle.container_id).is_empty());
    }
}
