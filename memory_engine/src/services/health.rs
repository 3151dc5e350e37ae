//! Startup health verification and graceful-degradation controller.
//!
//! All registered stores are probed concurrently, results are aggregated
//! into a single [`SystemHealth`] snapshot, and the snapshot is published
//! atomically to a process-wide register. Everything else in the process is
//! a read-only consumer of that register.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::models::{ComponentState, ComponentStatus, OverallState, SystemHealth};
use crate::services::StoreProbe;

/// One configured backing store: the probe handle plus the tag that drives
/// aggregation. Essential/optional is decided here at registration time,
/// never by component identity.
pub struct StoreRegistration {
    pub name: String,
    pub essential: bool,
    pub timeout: Duration,
    pub store: Arc<dyn StoreProbe>,
}

impl StoreRegistration {
    pub fn essential(name: &str, timeout: Duration, store: Arc<dyn StoreProbe>) -> Self {
        Self { name: name.to_string(), essential: true, timeout, store }
    }

    pub fn optional(name: &str, timeout: Duration, store: Arc<dyn StoreProbe>) -> Self {
        Self { name: name.to_string(), essential: false, timeout, store }
    }
}

/// Process-wide register holding the last computed health aggregate.
///
/// The snapshot is an immutable `Arc` swapped under a single write path
/// (the controller's publish step), so readers never observe a torn mix of
/// old and new component states.
pub struct HealthRegister {
    current: RwLock<Arc<SystemHealth>>,
}

impl HealthRegister {
    /// Starts with an empty aggregate: no component has been probed, so the
    /// overall state is conservatively degraded until the first check runs.
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(SystemHealth {
                overall: OverallState::Degraded,
                components: HashMap::new(),
                computed_at: Utc::now(),
            })),
        }
    }

    /// Cheap read of the last published aggregate. Never probes.
    pub async fn current(&self) -> Arc<SystemHealth> {
        self.current.read().await.clone()
    }

    /// State of one component in the last aggregate; `Unknown` if the
    /// component has never been probed.
    pub async fn component_state(&self, name: &str) -> ComponentState {
        self.current.read().await.component_state(name)
    }

    /// Replace the aggregate, last-write-wins by completion time: a slow
    /// probe cycle that finishes after a newer one must not clobber it.
    /// In production the controller is the only caller.
    pub(crate) async fn publish(&self, next: SystemHealth) -> Arc<SystemHealth> {
        let mut guard = self.current.write().await;
        if next.computed_at >= guard.computed_at {
            *guard = Arc::new(next);
        }
        guard.clone()
    }
}

impl Default for HealthRegister {
    fn default() -> Self {
        Self::new()
    }
}

/// Orchestrates store probes and owns the single write path into the
/// [`HealthRegister`].
pub struct HealthController {
    registry: Vec<StoreRegistration>,
    register: Arc<HealthRegister>,
}

impl HealthController {
    pub fn new(registry: Vec<StoreRegistration>, register: Arc<HealthRegister>) -> Self {
        Self { registry, register }
    }

    pub fn register(&self) -> Arc<HealthRegister> {
        self.register.clone()
    }

    /// Probe every registered store once before the process accepts
    /// traffic. Whether a `failed` overall aborts startup is deployment
    /// policy and decided by the host, not here.
    pub async fn run_startup_check(&self) -> Arc<SystemHealth> {
        info!(
            "🏥 Startup health verification across {} stores",
            self.registry.len()
        );
        self.check_all().await
    }

    /// Re-probe every store on demand and atomically replace the aggregate.
    pub async fn refresh_health(&self) -> Arc<SystemHealth> {
        self.check_all().await
    }

    /// Last computed aggregate without re-probing.
    pub async fn current_health(&self) -> Arc<SystemHealth> {
        self.register.current().await
    }

    async fn check_all(&self) -> Arc<SystemHealth> {
        // All probes run concurrently: total latency is bounded by the
        // slowest store's timeout, not the sum across stores.
        let probes = self
            .registry
            .iter()
            .map(|reg| reg.store.probe(reg.timeout));
        let statuses = join_all(probes).await;

        for status in &statuses {
            match status.state {
                ComponentState::Healthy => info!(
                    "✅ {} healthy ({}ms)",
                    status.name,
                    status.latency_ms.unwrap_or(0)
                ),
                ComponentState::Degraded => warn!(
                    "⚠️  {} degraded: {}",
                    status.name,
                    status.detail.as_deref().unwrap_or("no detail")
                ),
                ComponentState::Failed => warn!(
                    "❌ {} failed: {}",
                    status.name,
                    status.detail.as_deref().unwrap_or("no detail")
                ),
                ComponentState::Unknown => warn!("❓ {} unknown", status.name),
            }
        }

        let aggregate = self.aggregate(statuses);
        info!(overall = ?aggregate.overall, "Health aggregate computed");
        self.register.publish(aggregate).await
    }

    /// Aggregation rule: `failed` iff any essential component failed;
    /// `degraded` iff no essential component failed but some component is
    /// impaired (failed, degraded, or never probed); else `healthy`.
    fn aggregate(&self, statuses: Vec<ComponentStatus>) -> SystemHealth {
        let mut components = HashMap::new();
        let mut essential_failed = false;
        let mut any_impaired = false;

        for (reg, status) in self.registry.iter().zip(statuses) {
            match status.state {
                ComponentState::Failed => {
                    any_impaired = true;
                    if reg.essential {
                        essential_failed = true;
                    }
                }
                ComponentState::Degraded | ComponentState::Unknown => {
                    any_impaired = true;
                }
                ComponentState::Healthy => {}
            }
            components.insert(reg.name.clone(), status);
        }

        let overall = if essential_failed {
            OverallState::Failed
        } else if any_impaired {
            OverallState::Degraded
        } else {
            OverallState::Healthy
        };

        SystemHealth {
            overall,
            components,
            computed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Instant;

    /// Probe stub with a fixed outcome and an optional artificial delay.
    struct StaticProbe {
        name: &'static str,
        state: ComponentState,
        delay: Duration,
    }

    impl StaticProbe {
        fn new(name: &'static str, state: ComponentState) -> Self {
            Self { name, state, delay: Duration::ZERO }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    #[async_trait]
    impl StoreProbe for StaticProbe {
        fn component_name(&self) -> &str {
            self.name
        }

        async fn probe(&self, _timeout: Duration) -> ComponentStatus {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match self.state {
                ComponentState::Healthy => ComponentStatus::healthy(self.name, 1),
                ComponentState::Degraded => {
                    ComponentStatus::degraded(self.name, 1, "stub degraded")
                }
                ComponentState::Failed => ComponentStatus::failed(self.name, "stub failure"),
                ComponentState::Unknown => ComponentStatus::unknown(self.name),
            }
        }
    }

    fn controller(regs: Vec<StoreRegistration>) -> HealthController {
        HealthController::new(regs, Arc::new(HealthRegister::new()))
    }

    fn reg(
        name: &'static str,
        essential: bool,
        state: ComponentState,
    ) -> StoreRegistration {
        let store = Arc::new(StaticProbe::new(name, state));
        if essential {
            StoreRegistration::essential(name, Duration::from_secs(1), store)
        } else {
            StoreRegistration::optional(name, Duration::from_secs(1), store)
        }
    }

    #[tokio::test]
    async fn optional_failure_only_degrades() {
        let ctl = controller(vec![
            reg("cache", true, ComponentState::Healthy),
            reg("vector_memory", false, ComponentState::Failed),
        ]);

        let health = ctl.run_startup_check().await;
        assert_eq!(health.overall, OverallState::Degraded);
        assert_eq!(health.component_state("cache"), ComponentState::Healthy);
        assert_eq!(health.component_state("vector_memory"), ComponentState::Failed);
    }

    #[tokio::test]
    async fn essential_failure_fails_overall() {
        let ctl = controller(vec![
            reg("cache", true, ComponentState::Failed),
            reg("vector_memory", false, ComponentState::Healthy),
        ]);

        let health = ctl.run_startup_check().await;
        assert_eq!(health.overall, OverallState::Failed);
    }

    #[tokio::test]
    async fn essential_failure_wins_regardless_of_optional_state() {
        for optional_state in [
            ComponentState::Healthy,
            ComponentState::Degraded,
            ComponentState::Failed,
        ] {
            let ctl = controller(vec![
                reg("cache", true, ComponentState::Failed),
                reg("vector_memory", false, optional_state),
            ]);
            let health = ctl.refresh_health().await;
            assert_eq!(health.overall, OverallState::Failed);
        }
    }

    #[tokio::test]
    async fn all_healthy_is_healthy() {
        let ctl = controller(vec![
            reg("cache", true, ComponentState::Healthy),
            reg("vector_memory", false, ComponentState::Healthy),
        ]);

        let health = ctl.run_startup_check().await;
        assert_eq!(health.overall, OverallState::Healthy);
    }

    #[tokio::test]
    async fn no_essential_stores_never_fails_overall() {
        let ctl = controller(vec![
            reg("a", false, ComponentState::Failed),
            reg("b", false, ComponentState::Failed),
        ]);

        let health = ctl.run_startup_check().await;
        assert_eq!(health.overall, OverallState::Degraded);
    }

    #[tokio::test]
    async fn unknown_component_counts_as_impaired() {
        let ctl = controller(vec![
            reg("cache", true, ComponentState::Healthy),
            reg("vector_memory", false, ComponentState::Unknown),
        ]);

        let health = ctl.run_startup_check().await;
        assert_eq!(health.overall, OverallState::Degraded);
    }

    #[tokio::test]
    async fn probes_run_concurrently_not_sequentially() {
        let slow = Duration::from_millis(300);
        let mk = |name: &'static str, essential: bool| {
            let store = Arc::new(
                StaticProbe::new(name, ComponentState::Healthy).with_delay(slow),
            );
            if essential {
                StoreRegistration::essential(name, Duration::from_secs(2), store)
            } else {
                StoreRegistration::optional(name, Duration::from_secs(2), store)
            }
        };
        let ctl = controller(vec![mk("cache", true), mk("vector_memory", false)]);

        let start = Instant::now();
        let health = ctl.run_startup_check().await;
        let elapsed = start.elapsed();

        assert_eq!(health.overall, OverallState::Healthy);
        // Bounded by the slowest probe, not the sum of both.
        assert!(
            elapsed < slow * 2,
            "probes appear to run sequentially: {:?}",
            elapsed
        );
    }

    #[tokio::test]
    async fn probe_is_idempotent_against_unchanged_store() {
        let ctl = controller(vec![reg("cache", true, ComponentState::Healthy)]);

        let first = ctl.refresh_health().await;
        let second = ctl.refresh_health().await;

        assert_eq!(first.component_state("cache"), ComponentState::Healthy);
        assert_eq!(second.component_state("cache"), ComponentState::Healthy);
    }

    #[tokio::test]
    async fn stale_aggregate_never_overwrites_newer_one() {
        let register = HealthRegister::new();

        let older = SystemHealth {
            overall: OverallState::Failed,
            components: HashMap::new(),
            computed_at: Utc::now() - chrono::Duration::seconds(10),
        };
        let newer = SystemHealth {
            overall: OverallState::Healthy,
            components: HashMap::new(),
            computed_at: Utc::now(),
        };
        let newer_at = newer.computed_at;

        register.publish(newer).await;
        // A probe cycle that started earlier but completed later must lose.
        let current = register.publish(older).await;

        assert_eq!(current.overall, OverallState::Healthy);
        assert_eq!(current.computed_at, newer_at);
    }

    #[tokio::test]
    async fn computed_at_is_monotonic_for_a_single_reader() {
        let ctl = Arc::new(controller(vec![
            reg("cache", true, ComponentState::Healthy),
            reg("vector_memory", false, ComponentState::Healthy),
        ]));

        // Concurrent refreshes racing each other.
        let (a, b, c) = tokio::join!(
            ctl.refresh_health(),
            ctl.refresh_health(),
            ctl.refresh_health()
        );

        let settled = ctl.current_health().await;
        for snapshot in [a, b, c] {
            assert!(settled.computed_at >= snapshot.computed_at);
        }

        // Sequential observations never go backwards.
        let mut last = ctl.current_health().await.computed_at;
        for _ in 0..5 {
            let next = ctl.refresh_health().await.computed_at;
            assert!(next >= last);
            last = next;
        }
    }
}
