use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use faas_common::{ActionLimits, ActionRef, ActivationMessage, ContainerHandle, ContainerRuntime};
use rand::Rng;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::boundary::{ActiveAckClient, ActivationStore, LogCollector};
use crate::config::CoreConfig;
use crate::container_data::ContainerData;
use crate::fleet_publisher::FleetStatePublisher;
use crate::model_table::{ModelData, ModelTable};
use crate::prewarm::{self, PrewarmingConfig};
use crate::proxy::{self, ProxyHandle, ProxyMessage, ProxySpawnArgs};
use crate::window_registry::WindowRegistry;

pub use crate::prewarm::ReactiveConfig;

#[derive(Debug)]
pub enum PoolMessage {
    Run {
        activation: ActivationMessage,
        limits: ActionLimits,
    },
    PreWarmReady {
        container_id: String,
        kind: String,
        memory_mb: u32,
    },
    NeedWork {
        container_id: String,
        action: Option<ActionRef>,
    },
    ContainerIdle {
        container_id: String,
        action: ActionRef,
    },
    StartRunMessage {
        container_id: String,
        action: ActionRef,
    },
    PreLoadMessage {
        container_id: String,
        action: ActionRef,
    },
    OffLoadSignal {
        container_id: String,
        action: ActionRef,
    },
    ContainerRemoved {
        container_id: String,
        replace_prewarm: bool,
    },
    RescheduleJob {
        container_id: String,
        activation: ActivationMessage,
    },
    EmitMetrics,
    AdjustPrewarmedContainer {
        initial: bool,
    },
    /// Internal re-entry: a delayed pre-load/opportunistic-load decision
    /// firing after its scheduled wait.
    FirePreload {
        model: ModelData,
    },
    /// Internal re-entry: a delayed off-load expiring an opportunistic
    /// placement, wherever it ended up living after the initial re-home.
    FireOffload {
        model_name: String,
    },
    /// Synchronous gauge read for the `GET /metrics/pool` endpoint; mirrors
    /// what `EmitMetrics` logs but returned to the asker instead of traced.
    Snapshot {
        reply: tokio::sync::oneshot::Sender<PoolSnapshot>,
    },
}

/// Pool gauges as served by `GET /metrics/pool`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PoolSnapshot {
    pub buffered: usize,
    pub free: usize,
    pub busy: usize,
    pub prewarmed: usize,
    pub zygote: usize,
    pub cold_start_count: u32,
}

#[derive(Clone)]
pub struct PoolHandle {
    tx: mpsc::UnboundedSender<PoolMessage>,
}

impl PoolHandle {
    pub fn send(&self, msg: PoolMessage) {
        if self.tx.send(msg).is_err() {
            warn!("pool mailbox closed, message dropped");
        }
    }

    /// Asks the Pool actor for its current gauges; used by the `GET
    /// /metrics/pool` handler. Returns `None` if the actor has shut down.
    pub async fn snapshot(&self) -> Option<PoolSnapshot> {
        let (reply, rx) = tokio::sync::oneshot::channel();
        self.send(PoolMessage::Snapshot { reply });
        rx.await.ok()
    }
}

#[derive(Debug, Clone)]
struct PooledContainer {
    action: ActionRef,
    limits: ActionLimits,
    active_count: u32,
    memory_mb: u32,
    last_used: Instant,
}

#[derive(Debug, Clone)]
struct PrewarmEntry {
    kind: String,
    memory_mb: u32,
    expires: Option<Instant>,
}

pub struct PoolSpawnArgs {
    pub config: CoreConfig,
    pub runtime: Arc<dyn ContainerRuntime>,
    pub ack_client: Arc<dyn ActiveAckClient>,
    pub store: Arc<dyn ActivationStore>,
    pub logs: Arc<dyn LogCollector>,
    pub model_table: Arc<ModelTable>,
    pub window_registry: Arc<WindowRegistry>,
    pub publisher: Option<Arc<FleetStatePublisher>>,
    pub prewarm_configs: Vec<PrewarmingConfig>,
}

/// Spawns the singleton Container Pool actor. `Pool::new` always runs
/// one synchronous prewarm-adjustment pass even with no configured prewarms;
/// the periodic tick is only started when at least one config has a
/// reactive sizing rule.
pub fn spawn(args: PoolSpawnArgs) -> PoolHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = PoolHandle { tx: tx.clone() };
    let has_reactive = args.prewarm_configs.iter().any(|c| c.reactive.is_some());
    let actor = ContainerPoolActor {
        self_tx: tx.clone(),
        config: args.config,
        runtime: args.runtime,
        ack_client: args.ack_client,
        store: args.store,
        logs: args.logs,
        model_table: args.model_table,
        window_registry: args.window_registry,
        publisher: args.publisher,
        prewarm_configs: args.prewarm_configs,
        proxies: HashMap::new(),
        free_pool: HashMap::new(),
        busy_pool: HashMap::new(),
        prewarmed_pool: HashMap::new(),
        prewarm_starting: HashSet::new(),
        zygote_pool: HashMap::new(),
        preload_table: HashMap::new(),
        warming_pool: HashMap::new(),
        run_buffer: VecDeque::new(),
        resent: false,
        cold_start_count: 0,
    };
    tokio::spawn(actor.run(rx, has_reactive));
    handle
}

struct ContainerPoolActor {
    self_tx: mpsc::UnboundedSender<PoolMessage>,
    config: CoreConfig,
    runtime: Arc<dyn ContainerRuntime>,
    ack_client: Arc<dyn ActiveAckClient>,
    store: Arc<dyn ActivationStore>,
    logs: Arc<dyn LogCollector>,
    model_table: Arc<ModelTable>,
    window_registry: Arc<WindowRegistry>,
    publisher: Option<Arc<FleetStatePublisher>>,
    prewarm_configs: Vec<PrewarmingConfig>,

    proxies: HashMap<String, ProxyHandle>,
    free_pool: HashMap<String, PooledContainer>,
    busy_pool: HashMap<String, PooledContainer>,
    prewarmed_pool: HashMap<String, PrewarmEntry>,
    prewarm_starting: HashSet<String>,
    /// Subset of `free_pool` eligible to host foreign pre-loaded models
    /// (containers for inference-eligible actions, idle long enough to be Zygote).
    zygote_pool: HashMap<String, ActionRef>,
    preload_table: HashMap<String, Vec<ModelData>>,
    /// Containers dispatched to but not yet past their first readiness
    /// report (`NeedWork`/`ContainerIdle`): `Warming` for a prewarm being
    /// specialized, `WarmingCold` for a fresh cold start. Lets a second
    /// activation for the same action join the in-flight container instead
    /// of cold-starting or buffering.
    warming_pool: HashMap<String, ContainerData>,
    run_buffer: VecDeque<(ActivationMessage, ActionLimits)>,
    resent: bool,
    cold_start_count: u32,
}

impl ContainerPoolActor {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<PoolMessage>, has_reactive: bool) {
        self.adjust_prewarmed_container(true);
        if has_reactive {
            let self_tx = self.self_tx.clone();
            let interval = self.config.prewarm_expiration_check_interval;
            let variance = self.config.prewarm_expiration_check_variance;
            tokio::spawn(async move {
                loop {
                    let jitter_ms = rand::thread_rng().gen_range(0..=variance.as_millis().max(1) as u64);
                    tokio::time::sleep(interval + Duration::from_millis(jitter_ms)).await;
                    if self_tx
                        .send(PoolMessage::AdjustPrewarmedContainer { initial: false })
                        .is_err()
                    {
                        break;
                    }
                }
            });
        }
        while let Some(msg) = rx.recv().await {
            self.handle(msg).await;
        }
    }

    #[instrument(skip(self, msg))]
    async fn handle(&mut self, msg: PoolMessage) {
        match msg {
            PoolMessage::Run { activation, limits } => self.on_run(activation, limits),
            PoolMessage::PreWarmReady {
                container_id,
                kind,
                memory_mb,
            } => self.on_prewarm_ready(container_id, kind, memory_mb),
            PoolMessage::NeedWork { container_id, action } => self.on_need_work(container_id, action),
            PoolMessage::ContainerIdle { container_id, action } => {
                self.on_container_idle(container_id, action)
            }
            PoolMessage::StartRunMessage { container_id, action } => {
                self.on_start_run(container_id, action)
            }
            PoolMessage::PreLoadMessage { container_id, action } => {
                self.on_pre_load(container_id, action)
            }
            PoolMessage::OffLoadSignal { container_id, action } => {
                self.on_off_load_signal(container_id, action)
            }
            PoolMessage::ContainerRemoved {
                container_id,
                replace_prewarm,
            } => self.on_container_removed(container_id, replace_prewarm),
            PoolMessage::RescheduleJob { container_id, activation } => {
                self.on_reschedule(container_id, activation)
            }
            PoolMessage::EmitMetrics => self.emit_metrics(),
            PoolMessage::AdjustPrewarmedContainer { initial } => self.adjust_prewarmed_container(initial),
            PoolMessage::FirePreload { model } => self.bin_pack_and_load(model),
            PoolMessage::FireOffload { model_name } => self.fire_offload(model_name),
            PoolMessage::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
        }
        self.publish_fleet_state();
    }

    fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            buffered: self.run_buffer.len(),
            free: self.free_pool.len(),
            busy: self.busy_pool.len(),
            prewarmed: self.prewarmed_pool.len(),
            zygote: self.zygote_pool.len(),
            cold_start_count: self.cold_start_count,
        }
    }

    fn on_run(&mut self, activation: ActivationMessage, limits: ActionLimits) {
        self.window_registry.record(&activation.action, activation.windows);
        if let Some(container_id) = self.try_schedule(&activation.action, &limits) {
            self.dispatch_to(&container_id, activation, limits);
            return;
        }
        if let Some(container_id) = self.take_prewarm(&activation.action.kind, limits.memory_mb) {
            self.cold_start_count += 1;
            self.warming_pool.insert(
                container_id.clone(),
                ContainerData::Warming {
                    container: ContainerHandle {
                        container_id: container_id.clone(),
                        addr: String::new(),
                    },
                    action: activation.action.clone(),
                },
            );
            self.dispatch_to(&container_id, activation, limits);
            return;
        }
        if self.used_memory_mb() + limits.memory_mb <= self.config.user_memory_mb {
            self.cold_start_count += 1;
            let container_id =
                self.create_container(activation.action.kind.clone(), activation.action.clone(), limits.memory_mb);
            self.dispatch_to(&container_id, activation, limits);
            return;
        }
        let to_evict = self.pick_eviction_candidates(limits.memory_mb);
        if !to_evict.is_empty() {
            for container_id in &to_evict {
                self.free_pool.remove(container_id);
                self.zygote_pool.remove(container_id);
                self.preload_table.remove(container_id);
                self.warming_pool.remove(container_id);
                if let Some(proxy) = self.proxies.get(container_id) {
                    proxy.send(ProxyMessage::Remove);
                }
            }
            self.cold_start_count += 1;
            let container_id =
                self.create_container(activation.action.kind.clone(), activation.action.clone(), limits.memory_mb);
            self.dispatch_to(&container_id, activation, limits);
            return;
        }
        warn!(action = %activation.action.qualified_name(), "no capacity, buffering activation");
        self.run_buffer.push_back((activation, limits));
    }

    /// Four-step match, cheapest first: (1) an exact warm match with spare
    /// capacity, (2) a same-action container still specializing from a
    /// prewarm, (3) a pre-load hit on a foreign zygote container, (4) a
    /// same-action container still on its first cold start. Steps 2 and 4
    /// let a concurrent activation for the same action join an in-flight
    /// container instead of cold-starting a redundant one or buffering.
    fn try_schedule(&mut self, action: &ActionRef, limits: &ActionLimits) -> Option<String> {
        if let Some((id, _)) = self.free_pool.iter().find(|(_, c)| {
            &c.action == action && c.active_count < limits.max_concurrent.max(1)
        }) {
            return Some(id.clone());
        }
        if let Some(id) = self.find_warming_match(action, limits, true) {
            return Some(id);
        }
        if let Some(model) = self.model_table.find_by_action_name(&action.name) {
            let mut candidates: Vec<(&String, u32)> = self
                .preload_table
                .iter()
                .filter(|(id, models)| {
                    self.zygote_pool.contains_key(*id)
                        && models.iter().any(|m| m.model_name == model.model_name)
                })
                .map(|(id, models)| (id, models.iter().map(|m| m.model_size_mb).sum()))
                .collect();
            candidates.sort_by_key(|(_, size)| *size);
            if let Some((id, _)) = candidates.into_iter().next() {
                return Some(id.clone());
            }
        }
        self.find_warming_match(action, limits, false)
    }

    /// Exact-action lookup into `warming_pool`. `warm` selects `Warming`
    /// (prewarm-origin) entries when true, `WarmingCold` entries when false.
    /// Capacity is still checked against the live `active_count` in
    /// `free_pool`/`busy_pool` so this never oversubscribes `max_concurrent`.
    fn find_warming_match(&self, action: &ActionRef, limits: &ActionLimits, warm: bool) -> Option<String> {
        self.warming_pool.iter().find_map(|(id, data)| {
            let hit = match data {
                ContainerData::Warming { action: a, .. } => warm && a == action,
                ContainerData::WarmingCold { action: a, .. } => !warm && a == action,
                _ => false,
            };
            if !hit {
                return None;
            }
            let active_count = self
                .busy_pool
                .get(id)
                .or_else(|| self.free_pool.get(id))
                .map(|c| c.active_count)
                .unwrap_or(0);
            (active_count < limits.max_concurrent.max(1)).then(|| id.clone())
        })
    }

    fn take_prewarm(&mut self, kind: &str, memory_mb: u32) -> Option<String> {
        let id = self
            .prewarmed_pool
            .iter()
            .filter(|(_, p)| p.kind == kind && p.memory_mb >= memory_mb)
            .min_by_key(|(_, p)| p.expires.map(|e| e.elapsed()).unwrap_or_default())
            .map(|(id, _)| id.clone())?;
        let entry = self.prewarmed_pool.remove(&id)?;
        self.schedule_prewarm_backfill(&entry.kind, entry.memory_mb);
        Some(id)
    }

    fn dispatch_to(&mut self, container_id: &str, activation: ActivationMessage, limits: ActionLimits) {
        let entry = self.free_pool.entry(container_id.to_string()).or_insert(PooledContainer {
            action: activation.action.clone(),
            limits,
            active_count: 0,
            memory_mb: limits.memory_mb,
            last_used: Instant::now(),
        });
        entry.action = activation.action.clone();
        entry.active_count += 1;
        entry.last_used = Instant::now();
        if entry.active_count >= limits.max_concurrent.max(1) {
            if let Some(moved) = self.free_pool.remove(container_id) {
                self.busy_pool.insert(container_id.to_string(), moved);
            }
        }
        self.zygote_pool.remove(container_id);
        if let Some(proxy) = self.proxies.get(container_id) {
            proxy.send(ProxyMessage::Run { activation, limits });
        }
    }

    fn create_container(&mut self, kind: String, action: ActionRef, memory_mb: u32) -> String {
        let container_id = Uuid::new_v4().to_string();
        let handle = proxy::spawn(ProxySpawnArgs {
            container_id: container_id.clone(),
            action_kind_image: kind,
            runtime: self.runtime.clone(),
            pool: PoolHandle { tx: self.self_tx.clone() },
            ack_client: self.ack_client.clone(),
            store: self.store.clone(),
            logs: self.logs.clone(),
            model_table: self.model_table.clone(),
            unused_timeout: self.config.default_unused_timeout,
            health_check_period: self.config.health_check_period,
            health_check_max_fails: self.config.health_check_max_fails,
        });
        self.proxies.insert(container_id.clone(), handle);
        self.warming_pool
            .insert(container_id.clone(), ContainerData::WarmingCold { action, memory_mb });
        container_id
    }

    fn used_memory_mb(&self) -> u32 {
        let pooled: u32 = self
            .free_pool
            .values()
            .chain(self.busy_pool.values())
            .map(|c| c.memory_mb)
            .sum();
        let prewarmed: u32 = self.prewarmed_pool.values().map(|p| p.memory_mb).sum();
        pooled + prewarmed
    }

    /// Evicts oldest-unused warm containers until the freed memory would
    /// cover `needed_mb`, or returns empty if impossible.
    fn pick_eviction_candidates(&self, needed_mb: u32) -> Vec<String> {
        let mut idle: Vec<(&String, &PooledContainer)> =
            self.free_pool.iter().filter(|(_, c)| c.active_count == 0).collect();
        idle.sort_by_key(|(_, c)| c.last_used);
        let mut freed = 0u32;
        let mut out = Vec::new();
        for (id, c) in idle {
            if freed >= needed_mb {
                break;
            }
            freed += c.memory_mb;
            out.push(id.clone());
        }
        if freed >= needed_mb {
            out
        } else {
            Vec::new()
        }
    }

    fn on_prewarm_ready(&mut self, container_id: String, kind: String, memory_mb: u32) {
        self.prewarm_starting.remove(&container_id);
        self.warming_pool.remove(&container_id);
        self.prewarmed_pool.insert(
            container_id,
            PrewarmEntry {
                kind,
                memory_mb,
                expires: None,
            },
        );
    }

    fn on_need_work(&mut self, container_id: String, action: Option<ActionRef>) {
        self.warming_pool.remove(&container_id);
        let active_count = self
            .busy_pool
            .get(&container_id)
            .or_else(|| self.free_pool.get(&container_id))
            .map(|c| c.active_count.saturating_sub(1))
            .unwrap_or(0);
        if let Some(mut entry) = self.busy_pool.remove(&container_id).or_else(|| self.free_pool.remove(&container_id)) {
            entry.active_count = active_count;
            entry.last_used = Instant::now();
            self.free_pool.insert(container_id.clone(), entry);
        }
        self.zygote_pool.remove(&container_id);
        self.preload_table.remove(&container_id);
        if let Some(action) = action {
            if self.model_table.is_inference_eligible(&action.name) {
                self.self_tx
                    .send(PoolMessage::PreLoadMessage {
                        container_id: container_id.clone(),
                        action,
                    })
                    .ok();
            }
        }
        self.publish_preload_table();
    }

    fn on_container_idle(&mut self, container_id: String, action: ActionRef) {
        self.warming_pool.remove(&container_id);
        if !self.model_table.is_inference_eligible(&action.name) {
            return;
        }
        self.zygote_pool.insert(container_id.clone(), action);
        self.preload_table.entry(container_id.clone()).or_default();
        self.model_table.update_all_derived(1.0);
        for model in self.model_table.all() {
            let already_hosted = self
                .preload_table
                .values()
                .any(|list| list.iter().any(|m| m.model_name == model.model_name));
            if already_hosted {
                continue;
            }
            self.schedule_opportunistic_load(model);
        }
    }

    /// Stagger for opportunistic loads: a delayed `FirePreload` re-entry,
    /// so the bin-packing decision re-reads live pool state rather than
    /// being computed once and going stale while the task sleeps.
    fn schedule_opportunistic_load(&self, model: ModelData) {
        let self_tx = self.self_tx.clone();
        tokio::spawn(async move {
            let delay_ms = rand::thread_rng().gen_range(100..=2100);
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            let _ = self_tx.send(PoolMessage::FirePreload { model });
        });
    }

    fn on_start_run(&mut self, container_id: String, action: ActionRef) {
        let lambda = self.estimate_lambda(&action.name);
        self.model_table.update_lambda(&action.name, lambda);
        self.model_table.update_all_derived(1.0);
        self.zygote_pool.remove(&container_id);
        if let Some(models) = self.preload_table.remove(&container_id) {
            for model in models {
                self.bin_pack_and_load(model);
            }
        }
    }

    fn estimate_lambda(&self, action_name: &str) -> f64 {
        self.model_table
            .find_by_action_name(action_name)
            .map(|m| m.lambda + 0.01)
            .unwrap_or(0.01)
    }

    /// After `pre_load_minutes` elapse on an idle container, pick a zygote
    /// container via bin-packing and issue a load signal for the model.
    fn on_pre_load(&mut self, _container_id: String, action: ActionRef) {
        let Some(model) = self.model_table.find_by_action_name(&action.name) else {
            return;
        };
        let delay = self
            .window_registry
            .get(&action)
            .map(|w| Duration::from_secs(w.pre_load_minutes as u64 * 60))
            .unwrap_or_default();
        let self_tx = self.self_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = self_tx.send(PoolMessage::FirePreload { model });
        });
    }

    /// First fit by largest remaining capacity among zygote containers not
    /// already hosting this model; else evict ascending by
    /// `expected_saved_latency_ms` until a fit appears; else no-op.
    fn bin_pack_and_load(&mut self, model: ModelData) {
        let budget = self.config.model_memory_budget_mb;
        let mut candidates: Vec<(String, u32)> = self
            .zygote_pool
            .keys()
            .filter(|id| {
                !self
                    .preload_table
                    .get(*id)
                    .is_some_and(|list| list.iter().any(|m| m.model_name == model.model_name))
            })
            .map(|id| {
                let used: u32 = self.preload_table.get(id).map(|l| l.iter().map(|m| m.model_size_mb).sum()).unwrap_or(0);
                (id.clone(), budget.saturating_sub(used))
            })
            .filter(|(_, cap)| *cap >= model.model_size_mb)
            .collect();
        candidates.sort_by_key(|(_, cap)| std::cmp::Reverse(*cap));

        if let Some((container_id, _)) = candidates.into_iter().next() {
            self.place_model(container_id, model);
            return;
        }

        for container_id in self.zygote_pool.keys().cloned().collect::<Vec<_>>() {
            let Some(resident) = self.preload_table.get(&container_id).cloned() else { continue };
            let mut resident_sorted = resident.clone();
            resident_sorted.sort_by(|a, b| a.expected_saved_latency_ms.total_cmp(&b.expected_saved_latency_ms));
            let mut freed = 0u32;
            let used: u32 = resident.iter().map(|m| m.model_size_mb).sum();
            let mut remaining = resident_sorted.clone();
            for victim in &resident_sorted {
                if victim.expected_saved_latency_ms >= model.expected_saved_latency_ms {
                    break;
                }
                freed += victim.model_size_mb;
                remaining.retain(|m| m.model_name != victim.model_name);
                if let Some(proxy) = self.proxies.get(&container_id) {
                    proxy.send(ProxyMessage::OffLoadModelSignal {
                        model: victim.to_model_ref(),
                        timeout_ms: 30_000,
                    });
                }
                if budget.saturating_sub(used - freed) >= model.model_size_mb {
                    self.preload_table.insert(container_id.clone(), remaining.clone());
                    self.place_model(container_id.clone(), model);
                    return;
                }
            }
        }
        debug!(model = %model.model_name, "no container fits this model after eviction");
    }

    fn place_model(&mut self, container_id: String, model: ModelData) {
        if let Some(proxy) = self.proxies.get(&container_id) {
            proxy.send(ProxyMessage::LoadModelSignal {
                model: model.to_model_ref(),
                timeout_ms: 30_000,
            });
        }
        self.preload_table.entry(container_id).or_default().push(model);
        self.publish_preload_table();
    }

    /// The host container is being destroyed. Re-home its resident models
    /// onto other zygote containers immediately, and schedule each for
    /// actual off-load after `off_load_minutes - keep_alive_minutes`
    /// minutes (skipped when that's not positive).
    fn on_off_load_signal(&mut self, container_id: String, action: ActionRef) {
        let Some(models) = self.preload_table.remove(&container_id) else { return };
        let windows = self.window_registry.get(&action);
        for model in models {
            self.bin_pack_and_load(model.clone());
            let delay_minutes = windows
                .map(|w| w.off_load_minutes as i64 - w.keep_alive_minutes as i64)
                .unwrap_or(0);
            if delay_minutes <= 0 {
                debug!(action = %action.qualified_name(), "off-load window <= keep-alive, skipping delayed off-load");
                continue;
            }
            let self_tx = self.self_tx.clone();
            let model_name = model.model_name.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(delay_minutes as u64 * 60)).await;
                let _ = self_tx.send(PoolMessage::FireOffload { model_name });
            });
        }
    }

    fn fire_offload(&mut self, model_name: String) {
        let Some(container_id) = self
            .preload_table
            .iter()
            .find(|(_, list)| list.iter().any(|m| m.model_name == model_name))
            .map(|(id, _)| id.clone())
        else {
            return;
        };
        if let Some(list) = self.preload_table.get_mut(&container_id) {
            list.retain(|m| m.model_name != model_name);
        }
        if let Some(proxy) = self.proxies.get(&container_id) {
            proxy.send(ProxyMessage::OffLoadModelSignal {
                model: faas_common::ModelRef {
                    model_name,
                    owning_action: String::new(),
                },
                timeout_ms: 30_000,
            });
        }
        self.publish_preload_table();
    }

    fn on_container_removed(&mut self, container_id: String, replace_prewarm: bool) {
        self.free_pool.remove(&container_id);
        self.busy_pool.remove(&container_id);
        self.prewarmed_pool.remove(&container_id);
        self.prewarm_starting.remove(&container_id);
        self.zygote_pool.remove(&container_id);
        self.preload_table.remove(&container_id);
        self.warming_pool.remove(&container_id);
        self.proxies.remove(&container_id);
        if replace_prewarm {
            self.adjust_prewarmed_container(false);
        }
        self.try_flush_buffer();
    }

    fn on_reschedule(&mut self, container_id: String, activation: ActivationMessage) {
        let limits = self
            .free_pool
            .remove(&container_id)
            .or_else(|| self.busy_pool.remove(&container_id))
            .map(|c| c.limits)
            .unwrap_or_default();
        self.run_buffer.push_front((activation, limits));
        self.try_flush_buffer();
    }

    fn try_flush_buffer(&mut self) {
        if self.resent || self.run_buffer.is_empty() {
            return;
        }
        let Some((activation, limits)) = self.run_buffer.pop_front() else { return };
        self.resent = true;
        self.on_run(activation, limits);
        self.resent = false;
    }

    fn schedule_prewarm_backfill(&mut self, kind: &str, memory_mb: u32) {
        self.start_prewarm(kind.to_string(), memory_mb);
    }

    fn start_prewarm(&mut self, kind: String, memory_mb: u32) {
        let container_id = Uuid::new_v4().to_string();
        let handle = proxy::spawn(ProxySpawnArgs {
            container_id: container_id.clone(),
            action_kind_image: kind.clone(),
            runtime: self.runtime.clone(),
            pool: PoolHandle { tx: self.self_tx.clone() },
            ack_client: self.ack_client.clone(),
            store: self.store.clone(),
            logs: self.logs.clone(),
            model_table: self.model_table.clone(),
            unused_timeout: self.config.default_unused_timeout,
            health_check_period: self.config.health_check_period,
            health_check_max_fails: self.config.health_check_max_fails,
        });
        self.proxies.insert(container_id.clone(), handle.clone());
        self.prewarm_starting.insert(container_id.clone());
        handle.send(ProxyMessage::Start {
            kind,
            memory_mb,
            ttl: None,
        });
    }

    /// Computes `desired - current` per `(kind, memory)` shape and starts
    /// that many prewarms, budget permitting.
    fn adjust_prewarmed_container(&mut self, initial: bool) {
        let configs = self.prewarm_configs.clone();
        for cfg in configs {
            let current = self
                .prewarmed_pool
                .values()
                .filter(|p| p.kind == cfg.kind && p.memory_mb == cfg.memory_mb)
                .count() as u32
                + self.prewarm_starting.len() as u32;
            let desired = prewarm::desired_count(&cfg, current, self.cold_start_count, initial);
            let to_start = desired.saturating_sub(current);
            for _ in 0..to_start {
                if self.used_memory_mb() + cfg.memory_mb > self.config.user_memory_mb {
                    break;
                }
                self.start_prewarm(cfg.kind.clone(), cfg.memory_mb);
            }
        }
        self.cold_start_count = 0;
    }

    fn emit_metrics(&self) {
        info!(
            buffered = self.run_buffer.len(),
            free = self.free_pool.len(),
            busy = self.busy_pool.len(),
            prewarmed = self.prewarmed_pool.len(),
            zygote = self.zygote_pool.len(),
            "pool gauges"
        );
    }

    fn publish_preload_table(&self) {
        let Some(publisher) = self.publisher.clone() else { return };
        let invoker_id = self.config.invoker_id.clone();
        let names: Vec<String> = self
            .preload_table
            .values()
            .flat_map(|list| list.iter().map(|m| m.action_name.clone()))
            .collect();
        tokio::spawn(async move {
            publisher.publish_pre_loaded_actions(&invoker_id, &names).await;
        });
    }

    fn publish_fleet_state(&self) {
        let Some(publisher) = self.publisher.clone() else { return };
        let invoker_id = self.config.invoker_id.clone();
        let busy = self.busy_pool.len();
        tokio::spawn(async move {
            publisher.publish_busy_pool_size(&invoker_id, busy).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prewarm_entry_matches_on_kind_and_minimum_memory() {
        let entry = PrewarmEntry {
            kind: "python:3".into(),
            memory_mb: 512,
            expires: None,
        };
        assert_eq!(entry.kind, "python:3");
        assert!(entry.memory_mb >= 256);
    }
}
