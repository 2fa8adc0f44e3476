use std::time::Duration;

use faas_common::ContainerHandle;
use tokio::net::TcpStream;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::proxy::{InternalEvent, ProxyMessage};

/// TCP-ping health probe: connects to `container.addr` every
/// `check_period`; after `max_fails` consecutive failures it notifies the
/// owning Proxy and exits. Spawned at `Starting -> Running` and aborted via
/// its `JoinHandle` whenever the Proxy leaves `Running`/`RunningToUser`/`Zygote`.
pub fn spawn_probe(
    container: Option<ContainerHandle>,
    check_period: Duration,
    max_fails: u32,
    proxy_tx: UnboundedSender<ProxyMessage>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let Some(container) = container else { return };
        let mut consecutive_fails = 0u32;
        loop {
            tokio::time::sleep(check_period).await;
            match TcpStream::connect(&container.addr).await {
                Ok(_) => {
                    consecutive_fails = 0;
                }
                Err(e) => {
                    consecutive_fails += 1;
                    warn!(
                        container_id = %container.container_id,
                        addr = %container.addr,
                        error = %e,
                        consecutive_fails,
                        "health probe failed"
                    );
                    if consecutive_fails >= max_fails {
                        debug!(container_id = %container.container_id, "health probe giving up, notifying proxy");
                        let _ = proxy_tx.send(ProxyMessage::Internal(InternalEvent::HealthFailed));
                        return;
                    }
                }
            }
        }
    })
}
