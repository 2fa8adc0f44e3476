use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use docktopus::bollard::container::{Config as BollardConfig, RemoveContainerOptions};
use docktopus::bollard::Docker;
use faas_common::{
    ContainerHandle, ContainerRuntime, FaasError, InitBody, ModelRef, Result as CommonResult,
    RunOutcomeWire, RunParams,
};
use tracing::{info, instrument, warn};

use crate::error::CoreError;

/// `docktopus`-backed `ContainerRuntime`: creates the container via the
/// Docker API and speaks to the in-container runtime proxy over HTTP for
/// everything past `create`, treating the container's own process as an
/// opaque collaborator reachable only through its HTTP surface.
#[derive(Clone)]
pub struct DockerContainerRuntime {
    docker: Arc<Docker>,
    http: reqwest::Client,
    proxy_port: u16,
}

impl DockerContainerRuntime {
    pub fn new(docker: Arc<Docker>, proxy_port: u16) -> Self {
        Self {
            docker,
            http: reqwest::Client::new(),
            proxy_port,
        }
    }

    fn base_url(&self, container: &ContainerHandle) -> String {
        format!("http://{}", container.addr)
    }
}

#[async_trait]
impl ContainerRuntime for DockerContainerRuntime {
    #[instrument(skip(self), fields(name, image))]
    async fn create(
        &self,
        transaction_id: &str,
        name: &str,
        image: &str,
        memory_mb: u32,
        cpu_share: Option<u32>,
    ) -> CommonResult<ContainerHandle> {
        let config = BollardConfig {
            image: Some(image.to_string()),
            host_config: Some(docktopus::bollard::service::HostConfig {
                memory: Some(memory_mb as i64 * 1024 * 1024),
                cpu_shares: cpu_share.map(|s| s as i64),
                publish_all_ports: Some(true),
                ..Default::default()
            }),
            exposed_ports: Some(HashMap::from([(
                format!("{}/tcp", self.proxy_port),
                HashMap::new(),
            )])),
            ..Default::default()
        };
        let options = docktopus::bollard::container::CreateContainerOptions {
            name: name.to_string(),
            platform: None,
        };
        let created = self
            .docker
            .create_container(Some(options), config)
            .await
            .map_err(|e| FaasError::from(CoreError::Docker(e)))?;
        self.docker
            .start_container::<String>(&created.id, None)
            .await
            .map_err(|e| FaasError::from(CoreError::Docker(e)))?;
        let inspected = self
            .docker
            .inspect_container(&created.id, None)
            .await
            .map_err(|e| FaasError::from(CoreError::Docker(e)))?;
        let addr = container_addr(&inspected, self.proxy_port).ok_or_else(|| {
            FaasError::from(CoreError::Startup("container has no IP address".to_string()))
        })?;
        info!(%transaction_id, container_id = %created.id, %addr, "container created");
        Ok(ContainerHandle {
            container_id: created.id,
            addr,
        })
    }

    async fn initialize(
        &self,
        container: &ContainerHandle,
        init: &InitBody,
        timeout_ms: u64,
        max_concurrent: u32,
    ) -> CommonResult<()> {
        #[derive(serde::Serialize)]
        struct Body<'a> {
            init: &'a InitBody,
            max_concurrent: u32,
        }
        self.http
            .post(format!("{}/init", self.base_url(container)))
            .timeout(Duration::from_millis(timeout_ms))
            .json(&Body { init, max_concurrent })
            .send()
            .await
            .map_err(|e| FaasError::from(CoreError::Transport(e)))?
            .error_for_status()
            .map_err(|e| FaasError::from(CoreError::Transport(e)))?;
        Ok(())
    }

    async fn run(
        &self,
        container: &ContainerHandle,
        params: &RunParams,
        timeout_ms: u64,
    ) -> CommonResult<RunOutcomeWire> {
        let response = self
            .http
            .post(format!("{}/run", self.base_url(container)))
            .timeout(Duration::from_millis(timeout_ms))
            .json(params)
            .send()
            .await;
        match response {
            Ok(resp) => resp
                .json::<RunOutcomeWire>()
                .await
                .map_err(|e| FaasError::from(CoreError::Transport(e))),
            Err(e) if e.is_timeout() => Ok(RunOutcomeWire {
                response: None,
                error: Some(e.to_string()),
                is_timeout: true,
                logs: None,
            }),
            Err(e) => Err(FaasError::from(CoreError::Transport(e))),
        }
    }

    async fn load(
        &self,
        container: &ContainerHandle,
        model: &ModelRef,
        timeout_ms: u64,
    ) -> CommonResult<()> {
        self.http
            .post(format!("{}/models/load", self.base_url(container)))
            .timeout(Duration::from_millis(timeout_ms))
            .json(model)
            .send()
            .await
            .map_err(|e| FaasError::from(CoreError::Transport(e)))?
            .error_for_status()
            .map_err(|e| FaasError::from(CoreError::Transport(e)))?;
        Ok(())
    }

    async fn offload(
        &self,
        container: &ContainerHandle,
        model: &ModelRef,
        timeout_ms: u64,
    ) -> CommonResult<()> {
        self.http
            .post(format!("{}/models/offload", self.base_url(container)))
            .timeout(Duration::from_millis(timeout_ms))
            .json(model)
            .send()
            .await
            .map_err(|e| FaasError::from(CoreError::Transport(e)))?
            .error_for_status()
            .map_err(|e| FaasError::from(CoreError::Transport(e)))?;
        Ok(())
    }

    async fn destroy(&self, container: &ContainerHandle) -> CommonResult<()> {
        self.docker
            .remove_container(
                &container.container_id,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await
            .map_err(|e| {
                warn!(error = %e, container_id = %container.container_id, "remove_container failed");
                FaasError::from(CoreError::Docker(e))
            })?;
        Ok(())
    }
}

fn container_addr(
    inspected: &docktopus::bollard::models::ContainerInspectResponse,
    proxy_port: u16,
) -> Option<String> {
    let network = inspected.network_settings.as_ref()?;
    let ip = network
        .networks
        .as_ref()
        .and_then(|nets| nets.values().next())
        .and_then(|n| n.ip_address.clone())
        .filter(|ip| !ip.is_empty())?;
    Some(format!("{ip}:{proxy_port}"))
}
