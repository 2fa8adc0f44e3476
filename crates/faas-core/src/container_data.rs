use std::time::Instant;

use faas_common::{ActionRef, ContainerHandle};

/// Tagged variant for a pool slot's lifecycle stage. Each variant carries
/// its own fields explicitly; `has_capacity`/`memory_mb` are pure functions
/// over the tag instead of virtual dispatch.
#[derive(Debug, Clone)]
pub enum ContainerData {
    /// Unstarted, no container allocated yet.
    NoData,
    /// Memory reserved for a future container but nothing created.
    MemoryData { memory_mb: u32 },
    /// Started but not specialized to an action; may carry a TTL.
    PreWarmed {
        container: ContainerHandle,
        kind: String,
        memory_mb: u32,
        expires: Option<Instant>,
    },
    /// In initialization, container already exists (warm start).
    Warming {
        container: ContainerHandle,
        action: ActionRef,
    },
    /// In initialization, no container was pre-allocated (cold start).
    WarmingCold { action: ActionRef, memory_mb: u32 },
    /// Specialized and reusable for `action`.
    Warmed {
        container: ContainerHandle,
        action: ActionRef,
        last_used: Instant,
        active_activation_count: u32,
        memory_mb: u32,
    },
}

impl ContainerData {
    pub fn memory_mb(&self) -> u32 {
        match self {
            ContainerData::NoData => 0,
            ContainerData::MemoryData { memory_mb }
            | ContainerData::PreWarmed { memory_mb, .. }
            | ContainerData::WarmingCold { memory_mb, .. }
            | ContainerData::Warmed { memory_mb, .. } => *memory_mb,
            ContainerData::Warming { .. } => 0,
        }
    }

    /// True when this slot could accept a brand-new activation without
    /// creating a container (cold slots always "have capacity" in the
    /// sense that nothing is blocking a fresh cold start).
    pub fn has_capacity(&self, max_concurrent: u32) -> bool {
        match self {
            ContainerData::NoData | ContainerData::MemoryData { .. } => true,
            ContainerData::Warmed {
                active_activation_count,
                ..
            } => *active_activation_count < max_concurrent,
            ContainerData::Warming { .. } | ContainerData::WarmingCold { .. } => true,
            ContainerData::PreWarmed { .. } => false,
        }
    }

    pub fn container(&self) -> Option<&ContainerHandle> {
        match self {
            ContainerData::PreWarmed { container, .. }
            | ContainerData::Warming { container, .. }
            | ContainerData::Warmed { container, .. } => Some(container),
            _ => None,
        }
    }

    pub fn action(&self) -> Option<&ActionRef> {
        match self {
            ContainerData::Warming { action, .. }
            | ContainerData::WarmingCold { action, .. }
            | ContainerData::Warmed { action, .. } => Some(action),
            _ => None,
        }
    }

    pub fn matches(&self, action: &ActionRef) -> bool {
        self.action().is_some_and(|a| a == action)
    }
}

/// Proxy-phase labels kept for ack/log bookkeeping parity. `Paused`/`Pausing`
/// are never produced by any transition in `proxy.rs`; kept as dead states
/// rather than removed, since nothing downstream distinguishes "never
/// reached" from "reachable but rare" and collapsing the enum would be a
/// behavior change, not a cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyLegacyState {
    Started,
    Ready,
    Paused,
    Pausing,
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

    fn handle() -> ContainerHandle {
        ContainerHandle {
            container_id: "c1".into(),
            addr: "127.0.0.1:8080".into(),
        }
    }

    #[test]
    fn warmed_capacity_respects_max_concurrent() {
        let data = ContainerData::Warmed {
            container: handle(),
            action: action(),
            last_used: Instant::now(),
            active_activation_count: 1,
            memory_mb: 256,
        };
        assert!(data.has_capacity(2));
        assert!(!data.has_capacity(1));
    }

    #[test]
    fn prewarmed_never_has_capacity_for_a_run() {
        let data = ContainerData::PreWarmed {
            container: handle(),
            kind: "python:3".into(),
            memory_mb: 256,
            expires: None,
        };
        assert!(!data.has_capacity(10));
    }
}
