//! 池扩缩容器
//!
//! 在冷却时间与互斥锁保护下应用策略产生的调整命令。
//! 扩张时先调最大值再调核心值，收缩时反之，保证
//! core <= max 的不变量在调整过程中不被破坏。

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use chrono::Utc;
use tracing::{debug, info, warn};

use flexpool_config::ScalingConfig;
use flexpool_domain::events::{metadata_keys, AlertKind, AlertLevel, AlertMetadata};
use flexpool_domain::ports::ScalingDriver;
use flexpool_domain::value_objects::{PoolSnapshot, ScalingCommand};
use flexpool_errors::PoolResult;
use flexpool_observability::AlertBus;

/// 可被扩缩容器调整的执行器参数面
pub trait ScalableExecutor: Send + Sync {
    fn core_size(&self) -> usize;
    fn max_size(&self) -> usize;
    fn keep_alive_ms(&self) -> u64;
    fn queue_capacity(&self) -> usize;
    fn is_shutdown(&self) -> bool;

    /// 核心线程数大于当前最大线程数时拒绝
    fn set_core_size(&self, size: usize) -> PoolResult<()>;
    /// 最大线程数小于当前核心线程数或为 0 时拒绝
    fn set_max_size(&self, size: usize) -> PoolResult<()>;
    fn set_keep_alive_ms(&self, keep_alive_ms: u64);
    fn set_queue_capacity(&self, capacity: usize);
}

pub struct PoolScaler {
    executor: Weak<dyn ScalableExecutor>,
    config: ScalingConfig,
    pool_name: String,
    bus: Arc<AlertBus>,
    /// 保证扩缩容操作互斥执行
    scaling_lock: Mutex<()>,
    /// 上次成功扩缩容的时间戳（毫秒），用于冷却控制
    last_scaling_ms: AtomicI64,
}

impl PoolScaler {
    pub fn new(
        executor: Weak<dyn ScalableExecutor>,
        config: ScalingConfig,
        pool_name: String,
        bus: Arc<AlertBus>,
    ) -> Self {
        Self {
            executor,
            config,
            pool_name,
            bus,
            scaling_lock: Mutex::new(()),
            last_scaling_ms: AtomicI64::new(0),
        }
    }

    pub fn attempt_scaling(&self, snapshot: &PoolSnapshot) {
        let Some(executor) = self.executor.upgrade() else {
            return;
        };
        if !self.should_attempt(executor.as_ref(), snapshot) {
            return;
        }

        // 拿不到锁说明另一次扩缩容在进行中，直接返回
        let Ok(_guard) = self.scaling_lock.try_lock() else {
            return;
        };

        let Some(strategy) = self.config.strategy() else {
            return;
        };
        let Some(command) = strategy.calculate_scaling(snapshot) else {
            return;
        };
        if !command.has_adjustments() {
            return;
        }

        debug!(
            pool = %self.pool_name,
            strategy = strategy.name(),
            reason = command.reason(),
            "Applying scaling command"
        );
        self.execute_command(executor.as_ref(), &command, snapshot);
    }

    fn should_attempt(&self, executor: &dyn ScalableExecutor, snapshot: &PoolSnapshot) -> bool {
        let now = Utc::now().timestamp_millis();
        if now - self.last_scaling_ms.load(Ordering::Relaxed)
            < self.config.scaling_check_period_ms() as i64
        {
            return false;
        }
        if executor.is_shutdown() {
            return false;
        }
        snapshot.pool_size > 0
    }

    fn execute_command(
        &self,
        executor: &dyn ScalableExecutor,
        command: &ScalingCommand,
        snapshot: &PoolSnapshot,
    ) {
        let old_core_size = executor.core_size();
        let old_max_size = executor.max_size();
        let old_keep_alive = executor.keep_alive_ms();

        match self.apply_command(executor, command) {
            Ok(()) => {
                self.send_scaling_alert(
                    executor,
                    command,
                    old_core_size,
                    old_max_size,
                    old_keep_alive,
                    snapshot,
                    None,
                );
                self.last_scaling_ms
                    .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
            }
            Err(e) => {
                warn!(pool = %self.pool_name, "Scaling command failed: {e}");
                self.send_scaling_alert(
                    executor,
                    command,
                    old_core_size,
                    old_max_size,
                    old_keep_alive,
                    snapshot,
                    Some(e.to_string()),
                );
            }
        }
    }

    fn apply_command(
        &self,
        executor: &dyn ScalableExecutor,
        command: &ScalingCommand,
    ) -> PoolResult<()> {
        // 扩张时先调最大值再调核心值，收缩时反之
        if command.max_size_delta() > 0 {
            self.adjust_max_size(executor, command.max_size_delta())?;
            self.adjust_core_size(executor, command.core_size_delta())?;
        } else {
            self.adjust_core_size(executor, command.core_size_delta())?;
            self.adjust_max_size(executor, command.max_size_delta())?;
        }

        if command.keep_alive_delta_ms() != 0 {
            let new_keep_alive =
                (executor.keep_alive_ms() as i64 + command.keep_alive_delta_ms()).max(0);
            executor.set_keep_alive_ms(new_keep_alive as u64);
        }

        if command.queue_capacity_delta() != 0 {
            let new_capacity =
                (executor.queue_capacity() as i64 + command.queue_capacity_delta()).max(1);
            executor.set_queue_capacity(new_capacity as usize);
        }

        Ok(())
    }

    fn adjust_core_size(&self, executor: &dyn ScalableExecutor, delta: i32) -> PoolResult<()> {
        if delta == 0 {
            return Ok(());
        }
        let new_size = (executor.core_size() as i64 + delta as i64).clamp(
            self.config.min_threads() as i64,
            self.config.max_threads() as i64,
        ) as usize;
        executor.set_core_size(new_size)
    }

    fn adjust_max_size(&self, executor: &dyn ScalableExecutor, delta: i32) -> PoolResult<()> {
        if delta == 0 {
            return Ok(());
        }
        let new_size = (executor.max_size() as i64 + delta as i64).clamp(
            executor.core_size() as i64,
            self.config.max_threads() as i64,
        ) as usize;
        executor.set_max_size(new_size)
    }

    #[allow(clippy::too_many_arguments)]
    fn send_scaling_alert(
        &self,
        executor: &dyn ScalableExecutor,
        command: &ScalingCommand,
        old_core_size: usize,
        old_max_size: usize,
        old_keep_alive: u64,
        snapshot: &PoolSnapshot,
        error: Option<String>,
    ) {
        let mut metadata = AlertMetadata::new()
            .with(metadata_keys::POOL_NAME, self.pool_name.as_str())
            .with(metadata_keys::OLD_CORE_SIZE, old_core_size)
            .with(metadata_keys::NEW_CORE_SIZE, executor.core_size())
            .with(metadata_keys::OLD_MAX_SIZE, old_max_size)
            .with(metadata_keys::NEW_MAX_SIZE, executor.max_size())
            .with(metadata_keys::OLD_KEEP_ALIVE, old_keep_alive)
            .with(metadata_keys::NEW_KEEP_ALIVE, executor.keep_alive_ms())
            .with(metadata_keys::ACTIVE_THREADS, snapshot.active_threads)
            .with(metadata_keys::QUEUE_SIZE, snapshot.queue_size)
            .with(metadata_keys::REASON, command.reason());

        match error {
            Some(error) => {
                metadata.insert(metadata_keys::ERROR, error);
                self.bus.publish_alert(
                    format!("Thread pool scaling failed: {}", command.reason()),
                    AlertLevel::Error,
                    AlertKind::Monitoring,
                    metadata,
                );
            }
            None => {
                info!(
                    pool = %self.pool_name,
                    old_core = old_core_size,
                    new_core = executor.core_size(),
                    old_max = old_max_size,
                    new_max = executor.max_size(),
                    "Thread pool scaled: {}",
                    command.reason()
                );
                self.bus.publish_alert(
                    format!("Thread pool scaled: {}", command.reason()),
                    AlertLevel::Info,
                    AlertKind::Monitoring,
                    metadata,
                );
            }
        }
    }
}

impl ScalingDriver for PoolScaler {
    fn attempt_scaling(&self, snapshot: &PoolSnapshot) {
        PoolScaler::attempt_scaling(self, snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::LoadBasedScalingStrategy;
    use flexpool_domain::events::AlertEvent;
    use flexpool_domain::ports::{AlertListener, ScalingStrategy};
    use flexpool_domain::value_objects::TaskStatsSnapshot;
    use flexpool_errors::PoolError;
    use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize};
    use std::sync::Mutex as StdMutex;

    struct FakeExecutor {
        core: AtomicUsize,
        max: AtomicUsize,
        keep_alive: AtomicU64,
        queue_capacity: AtomicUsize,
        shutdown: AtomicBool,
        reject_core_changes: bool,
    }

    impl FakeExecutor {
        fn new(core: usize, max: usize) -> Arc<Self> {
            Arc::new(Self {
                core: AtomicUsize::new(core),
                max: AtomicUsize::new(max),
                keep_alive: AtomicU64::new(60_000),
                queue_capacity: AtomicUsize::new(100),
                shutdown: AtomicBool::new(false),
                reject_core_changes: false,
            })
        }

        fn rejecting(core: usize, max: usize) -> Arc<Self> {
            Arc::new(Self {
                core: AtomicUsize::new(core),
                max: AtomicUsize::new(max),
                keep_alive: AtomicU64::new(60_000),
                queue_capacity: AtomicUsize::new(100),
                shutdown: AtomicBool::new(false),
                reject_core_changes: true,
            })
        }
    }

    impl ScalableExecutor for FakeExecutor {
        fn core_size(&self) -> usize {
            self.core.load(Ordering::Relaxed)
        }
        fn max_size(&self) -> usize {
            self.max.load(Ordering::Relaxed)
        }
        fn keep_alive_ms(&self) -> u64 {
            self.keep_alive.load(Ordering::Relaxed)
        }
        fn queue_capacity(&self) -> usize {
            self.queue_capacity.load(Ordering::Relaxed)
        }
        fn is_shutdown(&self) -> bool {
            self.shutdown.load(Ordering::Relaxed)
        }
        fn set_core_size(&self, size: usize) -> PoolResult<()> {
            if self.reject_core_changes {
                return Err(PoolError::scaling("executor refused core size change"));
            }
            if size > self.max_size() {
                return Err(PoolError::scaling("core > max"));
            }
            self.core.store(size, Ordering::Relaxed);
            Ok(())
        }
        fn set_max_size(&self, size: usize) -> PoolResult<()> {
            if size == 0 || size < self.core_size() {
                return Err(PoolError::scaling("invalid max size"));
            }
            self.max.store(size, Ordering::Relaxed);
            Ok(())
        }
        fn set_keep_alive_ms(&self, keep_alive_ms: u64) {
            self.keep_alive.store(keep_alive_ms, Ordering::Relaxed);
        }
        fn set_queue_capacity(&self, capacity: usize) {
            self.queue_capacity.store(capacity, Ordering::Relaxed);
        }
    }

    struct Recording {
        events: StdMutex<Vec<(AlertLevel, String)>>,
    }

    impl Recording {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                events: StdMutex::new(Vec::new()),
            })
        }
        fn events(&self) -> Vec<(AlertLevel, String)> {
            self.events.lock().unwrap().clone()
        }
    }

    impl AlertListener for Recording {
        fn on_alert(&self, event: &AlertEvent) -> anyhow::Result<()> {
            self.events
                .lock()
                .unwrap()
                .push((event.level(), event.message().to_string()));
            Ok(())
        }
    }

    fn saturated_snapshot(pool_size: usize, max_pool_size: usize) -> PoolSnapshot {
        PoolSnapshot::builder()
            .task_stats(TaskStatsSnapshot::default())
            .active_threads(pool_size)
            .pool_size(pool_size)
            .max_pool_size(max_pool_size)
            .queue_size(0)
            .queue_capacity(100)
            .build()
    }

    fn load_based_config(cooldown_ms: u64, min: usize, max: usize) -> ScalingConfig {
        ScalingConfig::builder()
            .strategy(Arc::new(LoadBasedScalingStrategy::new(0.8, 0.2, 2, 1, 1000)))
            .scaling_check_period_ms(cooldown_ms)
            .min_threads(min)
            .max_threads(max)
            .build()
            .unwrap()
    }

    fn scaler_for(
        executor: &Arc<FakeExecutor>,
        config: ScalingConfig,
        bus: Arc<AlertBus>,
    ) -> PoolScaler {
        let weak: Weak<dyn ScalableExecutor> =
            Arc::downgrade(&(Arc::clone(executor) as Arc<dyn ScalableExecutor>));
        PoolScaler::new(weak, config, "orders".to_string(), bus)
    }

    #[tokio::test]
    async fn test_scale_up_adjusts_max_before_core() {
        let executor = FakeExecutor::new(2, 4);
        let bus = Arc::new(AlertBus::new());
        let listener = Recording::new();
        bus.subscribe(AlertLevel::Info, AlertKind::Monitoring, listener.clone());

        let scaler = scaler_for(&executor, load_based_config(100, 2, 8), bus);
        scaler.attempt_scaling(&saturated_snapshot(2, 8));

        // core +2, max +4（受 max_threads=8 约束）
        assert_eq!(executor.core_size(), 4);
        assert_eq!(executor.max_size(), 8);
        assert_eq!(executor.keep_alive_ms(), 59_000);

        let events = listener.events();
        assert!(events.iter().any(|(level, msg)| *level == AlertLevel::Info
            && msg.contains("Thread pool scaled: High load detected")));
    }

    #[tokio::test]
    async fn test_cooldown_blocks_second_attempt() {
        let executor = FakeExecutor::new(2, 8);
        let bus = Arc::new(AlertBus::new());
        let scaler = scaler_for(&executor, load_based_config(60_000, 2, 8), bus);

        scaler.attempt_scaling(&saturated_snapshot(2, 8));
        let core_after_first = executor.core_size();
        assert_eq!(core_after_first, 4);

        // 冷却期内第二次触发不生效
        scaler.attempt_scaling(&saturated_snapshot(4, 8));
        assert_eq!(executor.core_size(), core_after_first);
    }

    #[tokio::test]
    async fn test_failure_publishes_error_and_keeps_cooldown_open() {
        let executor = FakeExecutor::rejecting(2, 8);
        let bus = Arc::new(AlertBus::new());
        let listener = Recording::new();
        bus.subscribe(AlertLevel::Error, AlertKind::Monitoring, listener.clone());

        let scaler = scaler_for(&executor, load_based_config(60_000, 2, 8), bus);
        scaler.attempt_scaling(&saturated_snapshot(2, 8));

        let events = listener.events();
        assert!(events.iter().any(|(level, msg)| *level == AlertLevel::Error
            && msg.contains("Thread pool scaling failed")));

        // 失败不推进冷却时间，下一次尝试仍然进入执行路径并再次告警
        scaler.attempt_scaling(&saturated_snapshot(2, 8));
        assert_eq!(listener.events().len(), 2);
    }

    #[tokio::test]
    async fn test_shutdown_executor_is_ignored() {
        let executor = FakeExecutor::new(2, 8);
        executor.shutdown.store(true, Ordering::Relaxed);
        let bus = Arc::new(AlertBus::new());
        let scaler = scaler_for(&executor, load_based_config(100, 2, 8), bus);

        scaler.attempt_scaling(&saturated_snapshot(2, 8));
        assert_eq!(executor.core_size(), 2);
    }

    #[tokio::test]
    async fn test_zero_pool_size_is_ignored() {
        let executor = FakeExecutor::new(2, 8);
        let bus = Arc::new(AlertBus::new());
        let scaler = scaler_for(&executor, load_based_config(100, 2, 8), bus);

        scaler.attempt_scaling(&saturated_snapshot(0, 8));
        assert_eq!(executor.core_size(), 2);
    }

    #[tokio::test]
    async fn test_scale_down_clamps_to_min_threads() {
        let executor = FakeExecutor::new(2, 8);
        let bus = Arc::new(AlertBus::new());
        let scaler = scaler_for(&executor, load_based_config(100, 2, 8), bus);

        // 负载 0，缩容 1，但 min_threads=2，钳制后保持 2
        let idle = PoolSnapshot::builder()
            .task_stats(TaskStatsSnapshot::default())
            .active_threads(0)
            .pool_size(2)
            .max_pool_size(8)
            .queue_size(0)
            .queue_capacity(100)
            .build();
        scaler.attempt_scaling(&idle);
        assert_eq!(executor.core_size(), 2);
        // keep-alive 延长仍然生效
        assert_eq!(executor.keep_alive_ms(), 61_000);
    }

    #[tokio::test]
    async fn test_queue_capacity_delta_applied() {
        struct QueueStrategy;
        impl ScalingStrategy for QueueStrategy {
            fn name(&self) -> &str {
                "QueueOnly"
            }
            fn calculate_scaling(&self, _snapshot: &PoolSnapshot) -> Option<ScalingCommand> {
                Some(
                    ScalingCommand::builder()
                        .queue_capacity_delta(50)
                        .reason("grow queue")
                        .build(),
                )
            }
        }

        let executor = FakeExecutor::new(2, 8);
        let bus = Arc::new(AlertBus::new());
        let config = ScalingConfig::builder()
            .strategy(Arc::new(QueueStrategy))
            .scaling_check_period_ms(100)
            .min_threads(1)
            .max_threads(8)
            .build()
            .unwrap();
        let scaler = scaler_for(&executor, config, bus);

        scaler.attempt_scaling(&saturated_snapshot(2, 8));
        assert_eq!(executor.queue_capacity(), 150);
    }
}
