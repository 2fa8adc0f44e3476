use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use faas_common::{
    ActionLimits, ActionRef, ActivationAckMessage, ActivationMessage, ActivationRecord,
    ContainerHandle, ContainerRuntime, InitBody, ModelRef, RunOutcomeWire, RunParams,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::boundary::{ActiveAckClient, ActivationStore, LogCollector};
use crate::health;
use crate::model_table::ModelTable;
use crate::pool::{PoolHandle, PoolMessage};

/// Phase tag for the Container Proxy state machine. Container/action
/// bookkeeping lives as plain fields on `ContainerProxyActor` rather than as
/// per-variant payloads, which keeps the message-handling match arms small;
/// the phase tag alone still fully encodes the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyPhase {
    Uninitialized,
    Starting,
    Running,
    RunningToUser,
    Zygote,
    Removing,
}

#[derive(Debug)]
pub enum ProxyMessage {
    /// `Start(exec, mem, ttl)` — become an unspecialized prewarm.
    Start {
        kind: String,
        memory_mb: u32,
        ttl: Option<Duration>,
    },
    /// `CreateWarmedContainer(action, msg)` — create + initialize ahead of traffic.
    CreateWarmedContainer {
        action: ActionRef,
        limits: ActionLimits,
        init: InitBody,
    },
    Run {
        activation: ActivationMessage,
        limits: ActionLimits,
    },
    LoadModelSignal { model: ModelRef, timeout_ms: u64 },
    OffLoadModelSignal { model: ModelRef, timeout_ms: u64 },
    Remove,
    Internal(InternalEvent),
}

#[derive(Debug)]
pub enum InternalEvent {
    ContainerCreated {
        result: Result<ContainerHandle, String>,
    },
    Initialized {
        result: Result<(), String>,
    },
    RunFinished {
        activation: ActivationMessage,
        init_duration_ms: Option<u64>,
        run_started: Instant,
        result: Result<RunOutcomeWire, ProxyRunFailure>,
    },
    IdleTimeout,
    HealthFailed,
}

#[derive(Debug)]
pub enum ProxyRunFailure {
    Health(String),
    Other(String),
}

#[derive(Clone)]
pub struct ProxyHandle {
    container_id: String,
    tx: mpsc::UnboundedSender<ProxyMessage>,
}

impl ProxyHandle {
    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    pub fn send(&self, msg: ProxyMessage) {
        if self.tx.send(msg).is_err() {
            warn!(container_id = %self.container_id, "proxy mailbox closed, message dropped");
        }
    }
}

pub struct ProxySpawnArgs {
    pub container_id: String,
    pub action_kind_image: String,
    pub runtime: Arc<dyn ContainerRuntime>,
    pub pool: PoolHandle,
    pub ack_client: Arc<dyn ActiveAckClient>,
    pub store: Arc<dyn ActivationStore>,
    pub logs: Arc<dyn LogCollector>,
    pub model_table: Arc<ModelTable>,
    pub unused_timeout: Duration,
    pub health_check_period: Duration,
    pub health_check_max_fails: u32,
}

/// Spawns the per-container actor and returns a handle to its mailbox.
pub fn spawn(args: ProxySpawnArgs) -> ProxyHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = ProxyHandle {
        container_id: args.container_id.clone(),
        tx: tx.clone(),
    };
    let actor = ContainerProxyActor {
        container_id: args.container_id,
        image: args.action_kind_image,
        runtime: args.runtime,
        pool: args.pool,
        self_tx: tx,
        ack_client: args.ack_client,
        store: args.store,
        logs: args.logs,
        model_table: args.model_table,
        unused_timeout: args.unused_timeout,
        health_check_period: args.health_check_period,
        health_check_max_fails: args.health_check_max_fails,
        phase: ProxyPhase::Uninitialized,
        container: None,
        action: None,
        limits: ActionLimits::default(),
        memory_mb: 0,
        in_flight: Vec::new(),
        run_buffer: VecDeque::new(),
        any_success: false,
        is_prewarm_only: false,
        pending_reinit: None,
        idle_timer: None,
        health_task: None,
    };
    tokio::spawn(actor.run(rx));
    handle
}

struct ContainerProxyActor {
    container_id: String,
    image: String,
    runtime: Arc<dyn ContainerRuntime>,
    pool: PoolHandle,
    self_tx: mpsc::UnboundedSender<ProxyMessage>,
    ack_client: Arc<dyn ActiveAckClient>,
    store: Arc<dyn ActivationStore>,
    logs: Arc<dyn LogCollector>,
    model_table: Arc<ModelTable>,
    unused_timeout: Duration,
    health_check_period: Duration,
    health_check_max_fails: u32,

    phase: ProxyPhase,
    container: Option<ContainerHandle>,
    action: Option<ActionRef>,
    limits: ActionLimits,
    memory_mb: u32,
    /// Activations dispatched to the container and not yet completed.
    in_flight: Vec<ActivationMessage>,
    run_buffer: VecDeque<ActivationMessage>,
    /// Whether any run on this container has ever completed successfully;
    /// gates abort-vs-resend on subsequent failure.
    any_success: bool,
    is_prewarm_only: bool,
    /// An activation parked while the container is re-initialized for an
    /// action it isn't currently specialized for (prewarm take, pre-load hit).
    pending_reinit: Option<ActivationMessage>,

    idle_timer: Option<JoinHandle<()>>,
    health_task: Option<JoinHandle<()>>,
}

impl ContainerProxyActor {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<ProxyMessage>) {
        while let Some(msg) = rx.recv().await {
            self.handle(msg).await;
            if matches!(self.phase, ProxyPhase::Removing) {
                break;
            }
        }
        self.cancel_timers();
        debug!(container_id = %self.container_id, "proxy actor terminated");
    }

    #[instrument(skip(self, msg), fields(container_id = %self.container_id, phase = ?self.phase))]
    async fn handle(&mut self, msg: ProxyMessage) {
        match msg {
            ProxyMessage::Start { kind, memory_mb, ttl: _ } => self.start_prewarm(kind, memory_mb),
            ProxyMessage::CreateWarmedContainer { action, limits, init } => {
                self.start_warmed(action, limits, init)
            }
            ProxyMessage::Run { activation, limits } => self.on_run(activation, limits),
            ProxyMessage::LoadModelSignal { model, timeout_ms } => self.forward_load(model, timeout_ms),
            ProxyMessage::OffLoadModelSignal { model, timeout_ms } => self.forward_offload(model, timeout_ms),
            ProxyMessage::Remove => self.on_remove(),
            ProxyMessage::Internal(event) => self.on_internal(event).await,
        }
    }

    fn start_prewarm(&mut self, kind: String, memory_mb: u32) {
        self.phase = ProxyPhase::Starting;
        self.is_prewarm_only = true;
        self.memory_mb = memory_mb;
        let runtime = self.runtime.clone();
        let self_tx = self.self_tx.clone();
        let image = kind;
        let container_id = self.container_id.clone();
        tokio::spawn(async move {
            let result = runtime
                .create("prewarm", &container_id, &image, memory_mb, None)
                .await
                .map_err(|e| e.to_string());
            let _ = self_tx.send(ProxyMessage::Internal(InternalEvent::ContainerCreated { result }));
        });
    }

    fn start_warmed(&mut self, action: ActionRef, limits: ActionLimits, init: InitBody) {
        self.phase = ProxyPhase::Starting;
        self.action = Some(action.clone());
        self.limits = limits;
        self.memory_mb = limits.memory_mb;
        let runtime = self.runtime.clone();
        let self_tx = self.self_tx.clone();
        let image = self.image.clone();
        let container_id = self.container_id.clone();
        let timeout_ms = limits.timeout_ms;
        let max_concurrent = limits.max_concurrent;
        tokio::spawn(async move {
            let created = runtime
                .create("warm-start", &container_id, &image, limits.memory_mb, None)
                .await
                .map_err(|e| e.to_string());
            match created {
                Ok(handle) => {
                    let init_result = runtime
                        .initialize(&handle, &init, timeout_ms, max_concurrent)
                        .await
                        .map_err(|e| e.to_string());
                    let _ = self_tx.send(ProxyMessage::Internal(InternalEvent::ContainerCreated {
                        result: Ok(handle),
                    }));
                    let _ = self_tx.send(ProxyMessage::Internal(InternalEvent::Initialized {
                        result: init_result,
                    }));
                }
                Err(e) => {
                    let _ = self_tx.send(ProxyMessage::Internal(InternalEvent::ContainerCreated {
                        result: Err(e),
                    }));
                }
            }
        });
    }

    fn on_run(&mut self, activation: ActivationMessage, limits: ActionLimits) {
        self.limits = limits;
        match self.phase {
            ProxyPhase::Uninitialized => {
                self.phase = ProxyPhase::Starting;
                self.action = Some(activation.action.clone());
                self.memory_mb = self.memory_mb.max(limits.memory_mb);
                self.run_buffer.push_back(activation);
                self.cold_start();
            }
            ProxyPhase::Starting => {
                self.run_buffer.push_back(activation);
            }
            ProxyPhase::RunningToUser => {
                self.phase = ProxyPhase::Running;
                self.dispatch_or_buffer(activation);
            }
            ProxyPhase::Zygote => {
                self.phase = ProxyPhase::Running;
                if let Some(action) = &self.action {
                    self.pool.send(PoolMessage::StartRunMessage {
                        container_id: self.container_id.clone(),
                        action: action.clone(),
                    });
                }
                self.dispatch_or_buffer(activation);
            }
            ProxyPhase::Running => {
                self.dispatch_or_buffer(activation);
            }
            ProxyPhase::Removing => {
                self.pool.send(PoolMessage::RescheduleJob {
                    container_id: self.container_id.clone(),
                    activation,
                });
            }
        }
    }

    fn cold_start(&mut self) {
        let activation = match self.run_buffer.pop_front() {
            Some(a) => a,
            None => return,
        };
        let runtime = self.runtime.clone();
        let self_tx = self.self_tx.clone();
        let image = self.image.clone();
        let container_id = self.container_id.clone();
        let memory_mb = self.memory_mb.max(256);
        self.run_buffer.push_front(activation);
        tokio::spawn(async move {
            let result = runtime
                .create("cold-start", &container_id, &image, memory_mb, None)
                .await
                .map_err(|e| e.to_string());
            let _ = self_tx.send(ProxyMessage::Internal(InternalEvent::ContainerCreated { result }));
        });
    }

    fn dispatch_or_buffer(&mut self, activation: ActivationMessage) {
        if (self.in_flight.len() as u32) >= self.limits.max_concurrent.max(1) {
            self.run_buffer.push_back(activation);
            return;
        }
        let needs_init = self.action.as_ref() != Some(&activation.action) && self.in_flight.is_empty();
        if needs_init {
            self.reinitialize_then_run(activation);
        } else {
            self.spawn_run(activation);
        }
    }

    /// Re-initializes an already-live container for a different action: the
    /// prewarm-take path (never specialized) and the pre-load-hit path
    /// (specialized for someone else, but the requested model is resident).
    fn reinitialize_then_run(&mut self, activation: ActivationMessage) {
        let Some(container) = self.container.clone() else {
            self.run_buffer.push_back(activation);
            return;
        };
        self.action = Some(activation.action.clone());
        self.pending_reinit = Some(activation.clone());
        let runtime = self.runtime.clone();
        let self_tx = self.self_tx.clone();
        let init = InitBody {
            code_base64: None,
            env: activation.init_args.clone(),
        };
        let timeout_ms = self.limits.timeout_ms;
        let max_concurrent = self.limits.max_concurrent.max(1);
        tokio::spawn(async move {
            let result = runtime
                .initialize(&container, &init, timeout_ms, max_concurrent)
                .await
                .map_err(|e| e.to_string());
            let _ = self_tx.send(ProxyMessage::Internal(InternalEvent::Initialized { result }));
        });
    }

    fn spawn_run(&mut self, activation: ActivationMessage) {
        let container = match self.container.clone() {
            Some(c) => c,
            None => {
                self.run_buffer.push_back(activation);
                return;
            }
        };
        self.in_flight.push(activation.clone());
        let runtime = self.runtime.clone();
        let self_tx = self.self_tx.clone();
        let timeout_ms = self.limits.timeout_ms;
        let params = RunParams {
            payload: activation.locked_args.clone().unwrap_or_default(),
            env: activation.init_args.clone(),
        };
        let started = Instant::now();
        tokio::spawn(async move {
            let outcome = runtime.run(&container, &params, timeout_ms).await;
            let result = match outcome {
                Ok(wire) if wire.error.is_some() && wire.is_timeout => {
                    Err(ProxyRunFailure::Health(wire.error.clone().unwrap_or_default()))
                }
                Ok(wire) => Ok(wire),
                Err(e) => Err(ProxyRunFailure::Other(e.to_string())),
            };
            let _ = self_tx.send(ProxyMessage::Internal(InternalEvent::RunFinished {
                activation,
                init_duration_ms: None,
                run_started: started,
                result,
            }));
        });
    }

    fn forward_load(&mut self, model: ModelRef, timeout_ms: u64) {
        let Some(container) = self.container.clone() else {
            warn!(container_id = %self.container_id, "load signal with no container");
            return;
        };
        let runtime = self.runtime.clone();
        tokio::spawn(async move {
            if let Err(e) = runtime.load(&container, &model, timeout_ms).await {
                error!(error = %e, model = %model.model_name, "model load failed");
            }
        });
    }

    fn forward_offload(&mut self, model: ModelRef, timeout_ms: u64) {
        let Some(container) = self.container.clone() else {
            warn!(container_id = %self.container_id, "offload signal with no container");
            return;
        };
        let runtime = self.runtime.clone();
        tokio::spawn(async move {
            if let Err(e) = runtime.offload(&container, &model, timeout_ms).await {
                error!(error = %e, model = %model.model_name, "model offload failed");
            }
        });
    }

    fn on_remove(&mut self) {
        match self.phase {
            ProxyPhase::Zygote => {
                if let Some(action) = &self.action {
                    self.pool.send(PoolMessage::OffLoadSignal {
                        container_id: self.container_id.clone(),
                        action: action.clone(),
                    });
                }
                self.destroy_and_finish(false);
            }
            ProxyPhase::RunningToUser | ProxyPhase::Starting | ProxyPhase::Uninitialized => {
                self.destroy_and_finish(false);
            }
            ProxyPhase::Running => {
                self.destroy_and_finish(false);
            }
            ProxyPhase::Removing => {}
        }
    }

    async fn on_internal(&mut self, event: InternalEvent) {
        match event {
            InternalEvent::ContainerCreated { result } => self.on_container_created(result),
            InternalEvent::Initialized { result } => self.on_initialized(result),
            InternalEvent::RunFinished {
                activation,
                init_duration_ms,
                run_started,
                result,
            } => {
                self.on_run_finished(activation, init_duration_ms, run_started, result)
                    .await
            }
            InternalEvent::IdleTimeout => self.on_idle_timeout(),
            InternalEvent::HealthFailed => self.on_health_failed(),
        }
    }

    fn on_container_created(&mut self, result: Result<ContainerHandle, String>) {
        match result {
            Ok(handle) => {
                self.container = Some(handle);
                if self.is_prewarm_only {
                    self.phase = ProxyPhase::RunningToUser;
                    self.pool.send(PoolMessage::PreWarmReady {
                        container_id: self.container_id.clone(),
                        kind: self.image.clone(),
                        memory_mb: self.memory_mb,
                    });
                    self.start_idle_timer(self.unused_timeout);
                } else if self.action.is_some() {
                    // warm-start path: Initialized event follows separately.
                } else {
                    // cold path: initialize directly using the buffered activation's init args.
                    self.initialize_cold();
                }
            }
            Err(e) => {
                error!(error = %e, container_id = %self.container_id, "container factory failed");
                self.abort_all_buffered(&e);
                self.pool.send(PoolMessage::ContainerRemoved {
                    container_id: self.container_id.clone(),
                    replace_prewarm: true,
                });
                self.phase = ProxyPhase::Removing;
            }
        }
    }

    fn initialize_cold(&mut self) {
        let Some(container) = self.container.clone() else { return };
        let Some(activation) = self.run_buffer.front().cloned() else { return };
        self.action = Some(activation.action.clone());
        let runtime = self.runtime.clone();
        let self_tx = self.self_tx.clone();
        let init = InitBody {
            code_base64: None,
            env: activation.init_args.clone(),
        };
        let timeout_ms = self.limits.timeout_ms;
        let max_concurrent = self.limits.max_concurrent.max(1);
        tokio::spawn(async move {
            let result = runtime
                .initialize(&container, &init, timeout_ms, max_concurrent)
                .await
                .map_err(|e| e.to_string());
            let _ = self_tx.send(ProxyMessage::Internal(InternalEvent::Initialized { result }));
        });
    }

    fn on_initialized(&mut self, result: Result<(), String>) {
        match result {
            Ok(()) => {
                self.phase = ProxyPhase::Running;
                if self.health_task.is_none() {
                    self.health_task = Some(health::spawn_probe(
                        self.container.clone(),
                        self.health_check_period,
                        self.health_check_max_fails,
                        self.self_tx.clone(),
                    ));
                }
                if let Some(activation) = self.pending_reinit.take() {
                    self.spawn_run(activation);
                    return;
                }
                // Flush everything already buffered (cold-path activation plus
                // anything queued while Starting) up to the concurrency cap.
                while (self.in_flight.len() as u32) < self.limits.max_concurrent.max(1) {
                    let Some(activation) = self.run_buffer.pop_front() else { break };
                    self.spawn_run(activation);
                }
            }
            Err(e) => {
                error!(error = %e, container_id = %self.container_id, "container init failed");
                if let Some(activation) = self.pending_reinit.take() {
                    self.run_buffer.push_front(activation);
                }
                self.abort_all_buffered(&e);
                self.pool.send(PoolMessage::ContainerRemoved {
                    container_id: self.container_id.clone(),
                    replace_prewarm: true,
                });
                self.phase = ProxyPhase::Removing;
            }
        }
    }

    async fn on_run_finished(
        &mut self,
        activation: ActivationMessage,
        init_duration_ms: Option<u64>,
        run_started: Instant,
        result: Result<RunOutcomeWire, ProxyRunFailure>,
    ) {
        self.in_flight.retain(|a| a.activation_id != activation.activation_id);
        let run_duration_ms = run_started.elapsed().as_millis() as u64;

        match result {
            Ok(wire) => {
                self.any_success = true;
                self.materialize_and_ack(&activation, init_duration_ms, run_duration_ms, wire)
                    .await;
                self.after_run_completed(&activation.action);
            }
            Err(ProxyRunFailure::Health(reason)) => {
                warn!(error = %reason, "run failed with a health error, rescheduling");
                self.pool.send(PoolMessage::RescheduleJob {
                    container_id: self.container_id.clone(),
                    activation,
                });
                self.destroy_and_finish(false);
            }
            Err(ProxyRunFailure::Other(reason)) => {
                if self.any_success {
                    warn!(error = %reason, "run failed after prior success, rescheduling and draining");
                    self.pool.send(PoolMessage::RescheduleJob {
                        container_id: self.container_id.clone(),
                        activation,
                    });
                    if self.in_flight.is_empty() && self.run_buffer.is_empty() {
                        self.destroy_and_finish(false);
                    }
                } else {
                    error!(error = %reason, "run failed with no prior success, aborting buffer");
                    self.abort_all_buffered(&reason);
                    self.destroy_and_finish(true);
                }
            }
        }
    }

    async fn materialize_and_ack(
        &mut self,
        activation: &ActivationMessage,
        init_duration_ms: Option<u64>,
        run_duration_ms: u64,
        wire: RunOutcomeWire,
    ) {
        let logs = if self.logs.logs_to_be_collected(&activation.action.kind) {
            self.logs
                .collect_logs(&activation.transaction_id, &self.container_id)
                .await
        } else {
            wire.logs.clone()
        };
        let record = ActivationRecord {
            activation_id: activation.activation_id,
            transaction_id: activation.transaction_id.clone(),
            init_duration_ms,
            run_duration_ms,
            response: wire.response,
            error: wire.error,
            is_timeout: wire.is_timeout,
            logs,
        };
        self.store
            .store_activation(&activation.transaction_id, &record, activation.blocking)
            .await;
        if activation.blocking {
            self.ack_client
                .send_ack(&activation.transaction_id, ActivationAckMessage::Result(record.clone()))
                .await;
            self.ack_client
                .send_ack(
                    &activation.transaction_id,
                    ActivationAckMessage::Completion {
                        activation_id: activation.activation_id,
                    },
                )
                .await;
        } else {
            self.ack_client
                .send_ack(
                    &activation.transaction_id,
                    ActivationAckMessage::CombinedCompletionAndResult(record),
                )
                .await;
        }
    }

    fn after_run_completed(&mut self, action: &ActionRef) {
        if let Some(next) = self.run_buffer.pop_front() {
            self.spawn_run(next);
        }
        if self.in_flight.is_empty() {
            let eligible = self.model_table.is_inference_eligible(&action.name);
            if eligible {
                self.pool.send(PoolMessage::PreLoadMessage {
                    container_id: self.container_id.clone(),
                    action: action.clone(),
                });
            }
            self.pool.send(PoolMessage::NeedWork {
                container_id: self.container_id.clone(),
                action: self.action.clone(),
            });
            self.phase = ProxyPhase::RunningToUser;
            self.start_idle_timer(self.unused_timeout);
        }
    }

    fn on_idle_timeout(&mut self) {
        match self.phase {
            ProxyPhase::RunningToUser => {
                if let Some(action) = self.action.clone() {
                    self.pool.send(PoolMessage::ContainerIdle {
                        container_id: self.container_id.clone(),
                        action,
                    });
                }
                self.phase = ProxyPhase::Zygote;
                self.start_idle_timer(self.unused_timeout * 2);
            }
            ProxyPhase::Zygote => {
                if let Some(action) = self.action.clone() {
                    self.pool.send(PoolMessage::OffLoadSignal {
                        container_id: self.container_id.clone(),
                        action,
                    });
                }
                self.destroy_and_finish(false);
            }
            _ => {}
        }
    }

    fn on_health_failed(&mut self) {
        for activation in self.in_flight.drain(..) {
            self.pool.send(PoolMessage::RescheduleJob {
                container_id: self.container_id.clone(),
                activation,
            });
        }
        for activation in self.run_buffer.drain(..) {
            self.pool.send(PoolMessage::RescheduleJob {
                container_id: self.container_id.clone(),
                activation,
            });
        }
        self.destroy_and_finish(false);
    }

    fn abort_all_buffered(&mut self, reason: &str) {
        for activation in self.in_flight.drain(..).chain(self.run_buffer.drain(..)) {
            let record = ActivationRecord {
                activation_id: activation.activation_id,
                transaction_id: activation.transaction_id.clone(),
                init_duration_ms: None,
                run_duration_ms: 0,
                response: None,
                error: Some(reason.to_string()),
                is_timeout: false,
                logs: None,
            };
            let ack_client = self.ack_client.clone();
            let store = self.store.clone();
            let transaction_id = activation.transaction_id.clone();
            let blocking = activation.blocking;
            tokio::spawn(async move {
                store.store_activation(&transaction_id, &record, blocking).await;
                ack_client
                    .send_ack(&transaction_id, ActivationAckMessage::CombinedCompletionAndResult(record))
                    .await;
            });
        }
    }

    fn destroy_and_finish(&mut self, replace_prewarm: bool) {
        self.cancel_timers();
        self.phase = ProxyPhase::Removing;
        if let Some(container) = self.container.take() {
            let runtime = self.runtime.clone();
            tokio::spawn(async move {
                if let Err(e) = runtime.destroy(&container).await {
                    error!(error = %e, container_id = %container.container_id, "destroy failed");
                }
            });
        }
        self.pool.send(PoolMessage::ContainerRemoved {
            container_id: self.container_id.clone(),
            replace_prewarm,
        });
    }

    fn start_idle_timer(&mut self, after: Duration) {
        self.cancel_idle_timer();
        let self_tx = self.self_tx.clone();
        self.idle_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = self_tx.send(ProxyMessage::Internal(InternalEvent::IdleTimeout));
        }));
    }

    fn cancel_idle_timer(&mut self) {
        if let Some(handle) = self.idle_timer.take() {
            handle.abort();
        }
    }

    fn cancel_timers(&mut self) {
        self.cancel_idle_timer();
        if let Some(handle) = self.health_task.take() {
            handle.abort();
        }
    }
}

impl Drop for ContainerProxyActor {
    fn drop(&mut self) {
        self.cancel_timers();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action() -> ActionRef {
        ActionRef {
            namespace: "guest".into(),
            name: "ptest04".into(),
            kind: "python:3".into(),
        }
    }

    #[test]
    fn phase_enum_has_five_live_states_plus_removing() {
        // Documents the state set from the transition table; Removing is terminal.
        let phases = [
            ProxyPhase::Uninitialized,
            ProxyPhase::Starting,
            ProxyPhase::Running,
            ProxyPhase::RunningToUser,
            ProxyPhase::Zygote,
            ProxyPhase::Removing,
        ];
        assert_eq!(phases.len(), 6);
        let _ = action();
    }
}
