//! 工作池引擎
//!
//! 拥有优先级持久化队列、统计收集器、扩缩容器与监控器。
//! worker 为 tokio 任务，以 `<poolName>-thread-<N>` 的名称记录日志；
//! 超出核心数的空闲 worker 在 keep-alive 到期后退出。

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use flexpool_config::PoolConfig;
use flexpool_domain::entities::{TaskPayload, TrackedTask};
use flexpool_domain::ports::{
    PersistenceStrategy, ScalingDriver, SnapshotSource, TaskExecutor,
};
use flexpool_domain::value_objects::{PoolSnapshot, DEFAULT_MAX_LATENCY_MS};
use flexpool_errors::{PoolError, PoolResult};
use flexpool_infrastructure::NoOpPersistenceStrategy;
use flexpool_observability::{AlertBus, PoolMonitor, TaskStats};

use crate::executors::ExecutorRegistry;
use crate::queue::PriorityTaskQueue;
use crate::scaler::{PoolScaler, ScalableExecutor};

/// execute 路径的默认优先级
pub const DEFAULT_PRIORITY: i32 = 5;

const GRACEFUL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);
/// keep-alive 轮询下限，防止被调成 0 后空转
const MIN_KEEP_ALIVE_POLL_MS: u64 = 50;

pub struct WorkerPool {
    inner: Arc<PoolInner>,
    monitor: PoolMonitor,
    #[allow(dead_code)]
    scaler: Arc<PoolScaler>,
}

pub(crate) struct PoolInner {
    self_weak: Weak<PoolInner>,
    pool_name: String,
    config: PoolConfig,
    queue: Arc<PriorityTaskQueue>,
    stats: Arc<TaskStats>,
    executors: Arc<ExecutorRegistry>,
    core_size: AtomicUsize,
    max_size: AtomicUsize,
    keep_alive_ms: AtomicU64,
    /// 当前 worker 数
    pool_size: AtomicUsize,
    /// 正在执行任务的 worker 数
    active: AtomicUsize,
    /// 已完成执行的任务数（含失败）
    completed: AtomicU64,
    worker_seq: AtomicU64,
    shutdown: AtomicBool,
    worker_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    pub fn builder() -> WorkerPoolBuilder {
        WorkerPoolBuilder::default()
    }

    /// 提交带优先级的任务，返回任务 id
    pub fn submit(&self, payload: TaskPayload, priority: i32) -> PoolResult<String> {
        self.inner.submit(payload, priority)
    }

    /// 以默认优先级提交任务
    pub fn execute(&self, payload: TaskPayload) -> PoolResult<String> {
        self.inner.submit(payload, DEFAULT_PRIORITY)
    }

    pub fn pool_name(&self) -> &str {
        &self.inner.pool_name
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        self.inner.pool_snapshot()
    }

    pub fn stats(&self) -> Arc<TaskStats> {
        Arc::clone(&self.inner.stats)
    }

    pub fn core_pool_size(&self) -> usize {
        self.inner.core_size.load(Ordering::Relaxed)
    }

    pub fn max_pool_size(&self) -> usize {
        self.inner.max_size.load(Ordering::Relaxed)
    }

    pub fn pool_size(&self) -> usize {
        self.inner.pool_size.load(Ordering::Relaxed)
    }

    pub fn active_count(&self) -> usize {
        self.inner.active.load(Ordering::Relaxed)
    }

    pub fn completed_count(&self) -> u64 {
        self.inner.completed.load(Ordering::Relaxed)
    }

    pub fn queue_size(&self) -> usize {
        self.inner.queue.size()
    }

    pub fn queue_capacity(&self) -> usize {
        self.inner.queue.capacity()
    }

    pub fn keep_alive_ms(&self) -> u64 {
        self.inner.keep_alive_ms.load(Ordering::Relaxed)
    }

    pub fn is_shutdown(&self) -> bool {
        self.inner.shutdown.load(Ordering::Acquire)
    }

    /// 停止接收新任务，让已入队的任务继续排空。
    /// 监控器停止，队列执行最终快照。
    pub async fn shutdown(&self) {
        if self.inner.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(pool = %self.inner.pool_name, "Initiating shutdown");
        self.monitor.shutdown().await;
        self.inner.queue.shutdown().await;
    }

    /// 优雅关闭：停止接收新任务，最多等待 30 秒让 worker 结束，
    /// 超时后强制中止。
    pub async fn graceful_shutdown(&self) {
        self.shutdown().await;

        let handles: Vec<JoinHandle<()>> = {
            let mut guard = self
                .inner
                .worker_handles
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            guard.drain(..).collect()
        };

        let deadline = tokio::time::Instant::now() + GRACEFUL_SHUTDOWN_TIMEOUT;
        for mut handle in handles {
            let remaining = deadline
                .checked_duration_since(tokio::time::Instant::now())
                .unwrap_or(Duration::ZERO);
            if timeout(remaining, &mut handle).await.is_err() {
                warn!(pool = %self.inner.pool_name, "Worker did not finish in time, aborting");
                handle.abort();
            }
        }
        info!(pool = %self.inner.pool_name, "Shutdown complete");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if !self.inner.shutdown.swap(true, Ordering::SeqCst) {
            warn!(
                pool = %self.inner.pool_name,
                "Pool dropped without graceful shutdown, closing queue"
            );
            self.inner.queue.close();
        }
    }
}

impl PoolInner {
    fn submit(self: &Arc<Self>, payload: TaskPayload, priority: i32) -> PoolResult<String> {
        let monitoring = self.config.monitoring();
        if monitoring.task_metrics_enabled() {
            self.stats.record_submission();
        }

        if self.shutdown.load(Ordering::Acquire) {
            self.stats.record_rejection();
            warn!(pool = %self.pool_name, "Task rejected: pool is shut down");
            return Err(PoolError::PoolShutdown);
        }

        let task = TrackedTask::new(payload, priority);
        let task_id = task.task_id().to_string();

        if !self.queue.offer(task) {
            self.stats.record_rejection();
            warn!(pool = %self.pool_name, task_id = %task_id, "Task rejected: queue full");
            return Err(PoolError::TaskRejected { task_id });
        }

        self.maybe_spawn_transient_worker();
        Ok(task_id)
    }

    /// 所有 worker 都在忙且未达最大线程数时补充一个临时 worker
    fn maybe_spawn_transient_worker(self: &Arc<Self>) {
        loop {
            let size = self.pool_size.load(Ordering::Relaxed);
            if size >= self.max_size.load(Ordering::Relaxed) {
                return;
            }
            if self.active.load(Ordering::Relaxed) < size {
                return;
            }
            if self
                .pool_size
                .compare_exchange(size, size + 1, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                self.add_worker();
                return;
            }
        }
    }

    /// 将 worker 数补足到核心线程数
    fn ensure_core_workers(self: &Arc<Self>) {
        loop {
            if self.shutdown.load(Ordering::Acquire) {
                return;
            }
            let current = self.pool_size.load(Ordering::Relaxed);
            if current >= self.core_size.load(Ordering::Relaxed) {
                return;
            }
            if self
                .pool_size
                .compare_exchange(current, current + 1, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                self.add_worker();
            }
        }
    }

    /// 启动一个 worker 任务，调用方已先行递增 pool_size
    fn add_worker(self: &Arc<Self>) {
        let worker_number = self.worker_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let worker_name = format!("{}-thread-{}", self.pool_name, worker_number);
        let inner = Arc::clone(self);

        let handle = tokio::spawn(async move {
            debug!(worker = %worker_name, "Worker started");
            let queue_closed = loop {
                let keep_alive = Duration::from_millis(
                    inner
                        .keep_alive_ms
                        .load(Ordering::Relaxed)
                        .max(MIN_KEEP_ALIVE_POLL_MS),
                );
                match timeout(keep_alive, inner.queue.take()).await {
                    Ok(Some(task)) => inner.run_task(&worker_name, task).await,
                    Ok(None) => break true,
                    Err(_) => {
                        // keep-alive 到期，超出核心数的空闲 worker 退出
                        if inner.try_retire() {
                            break false;
                        }
                    }
                }
            };
            if queue_closed {
                inner.pool_size.fetch_sub(1, Ordering::Relaxed);
            }
            debug!(worker = %worker_name, "Worker exited");
        });

        self.worker_handles
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(handle);
    }

    /// 仅当 worker 数超出核心数时占用一个退出名额
    fn try_retire(&self) -> bool {
        let mut current = self.pool_size.load(Ordering::Relaxed);
        loop {
            if current <= self.core_size.load(Ordering::Relaxed) {
                return false;
            }
            match self.pool_size.compare_exchange(
                current,
                current - 1,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    async fn run_task(self: &Arc<Self>, worker_name: &str, task: TrackedTask) {
        let monitoring = self.config.monitoring();
        self.active.fetch_add(1, Ordering::Relaxed);

        // 执行前：记录队列等待与队列水位
        let now_ms = Utc::now().timestamp_millis();
        let wait_ms = task.wait_time_since(now_ms);
        self.stats.record_wait_time(wait_ms);
        if monitoring.queue_metrics_enabled() {
            self.stats.record_queue_time(wait_ms);
            self.stats.record_queue_size(self.queue.size());
        }

        let task_id = task.task_id().to_string();
        let task_type = task.payload().task_type.clone();
        let started = Instant::now();

        let result = match self.executors.get(&task_type) {
            Some(executor) => {
                // 独立任务中执行，载荷 panic 不会击穿 worker 循环
                let execution = tokio::spawn(async move { executor.execute(&task).await });
                match execution.await {
                    Ok(result) => result,
                    Err(e) => Err(PoolError::TaskExecution(format!(
                        "任务执行过程异常中止: {e}"
                    ))),
                }
            }
            None => Err(PoolError::ExecutorNotFound {
                task_type: task_type.clone(),
            }),
        };
        let elapsed_ms = started.elapsed().as_millis() as i64;

        // 执行后：记录耗时与结果
        if monitoring.task_metrics_enabled() {
            self.stats.record_execution_time(elapsed_ms);
            match &result {
                Ok(()) => self.stats.record_completion(),
                Err(_) => self.stats.record_failure(),
            }
        }
        match &result {
            Ok(()) => {
                debug!(worker = %worker_name, task_id = %task_id, elapsed_ms, "Task completed")
            }
            Err(e) => {
                warn!(
                    worker = %worker_name,
                    task_id = %task_id,
                    task_type = %task_type,
                    "Task failed: {e}"
                )
            }
        }

        self.completed.fetch_add(1, Ordering::Relaxed);
        self.active.fetch_sub(1, Ordering::Relaxed);
    }
}

impl SnapshotSource for PoolInner {
    fn pool_snapshot(&self) -> PoolSnapshot {
        let queue_size = self.queue.size();
        PoolSnapshot::builder()
            .task_stats(self.stats.snapshot())
            .active_threads(self.active.load(Ordering::Relaxed))
            .pool_size(self.pool_size.load(Ordering::Relaxed))
            .max_pool_size(self.max_size.load(Ordering::Relaxed))
            .queue_size(queue_size)
            .queue_capacity(self.queue.remaining_capacity() + queue_size)
            .completed_tasks(self.completed.load(Ordering::Relaxed))
            .build()
    }

    fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }
}

impl ScalableExecutor for PoolInner {
    fn core_size(&self) -> usize {
        self.core_size.load(Ordering::Relaxed)
    }

    fn max_size(&self) -> usize {
        self.max_size.load(Ordering::Relaxed)
    }

    fn keep_alive_ms(&self) -> u64 {
        self.keep_alive_ms.load(Ordering::Relaxed)
    }

    fn queue_capacity(&self) -> usize {
        self.queue.capacity()
    }

    fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    fn set_core_size(&self, size: usize) -> PoolResult<()> {
        if size > self.max_size.load(Ordering::Relaxed) {
            return Err(PoolError::Scaling(format!(
                "核心线程数不能大于最大线程数: core={size}, max={}",
                self.max_size.load(Ordering::Relaxed)
            )));
        }
        self.core_size.store(size, Ordering::Relaxed);
        if let Some(inner) = self.self_weak.upgrade() {
            inner.ensure_core_workers();
        }
        Ok(())
    }

    fn set_max_size(&self, size: usize) -> PoolResult<()> {
        if size == 0 || size < self.core_size.load(Ordering::Relaxed) {
            return Err(PoolError::Scaling(format!(
                "最大线程数无效: max={size}, core={}",
                self.core_size.load(Ordering::Relaxed)
            )));
        }
        self.max_size.store(size, Ordering::Relaxed);
        Ok(())
    }

    fn set_keep_alive_ms(&self, keep_alive_ms: u64) {
        self.keep_alive_ms.store(keep_alive_ms, Ordering::Relaxed);
    }

    fn set_queue_capacity(&self, capacity: usize) {
        self.queue.set_capacity(capacity);
    }
}

pub struct WorkerPoolBuilder {
    core_pool_size: usize,
    max_pool_size: usize,
    keep_alive: Duration,
    queue_capacity: usize,
    pool_name: String,
    config: PoolConfig,
    executors: Vec<Arc<dyn TaskExecutor>>,
    bus: Option<Arc<AlertBus>>,
}

impl Default for WorkerPoolBuilder {
    fn default() -> Self {
        let core = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self {
            core_pool_size: core,
            max_pool_size: core * 2,
            keep_alive: Duration::from_secs(60),
            queue_capacity: 1000,
            pool_name: "flexpool".to_string(),
            config: PoolConfig::default(),
            executors: Vec::new(),
            bus: None,
        }
    }
}

impl WorkerPoolBuilder {
    pub fn core_pool_size(mut self, size: usize) -> Self {
        self.core_pool_size = size;
        self
    }

    pub fn max_pool_size(mut self, size: usize) -> Self {
        self.max_pool_size = size;
        self
    }

    pub fn keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn pool_name<S: Into<String>>(mut self, name: S) -> Self {
        self.pool_name = name.into();
        self
    }

    pub fn configuration(mut self, config: PoolConfig) -> Self {
        self.config = config;
        self
    }

    pub fn register_executor(mut self, executor: Arc<dyn TaskExecutor>) -> Self {
        self.executors.push(executor);
        self
    }

    /// 覆盖默认的全局告警总线，测试隔离用
    pub fn alert_bus(mut self, bus: Arc<AlertBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    fn validate(&self) -> PoolResult<()> {
        if self.max_pool_size == 0 || self.max_pool_size < self.core_pool_size {
            return Err(PoolError::Configuration(format!(
                "线程数配置无效: core={}, max={}",
                self.core_pool_size, self.max_pool_size
            )));
        }
        if self.queue_capacity == 0 {
            return Err(PoolError::configuration("队列容量必须大于 0"));
        }
        if self.pool_name.trim().is_empty() {
            return Err(PoolError::configuration("池名称不能为空"));
        }
        Ok(())
    }

    /// 构建并启动工作池
    ///
    /// 持久化启用时先回放上一份队列镜像；镜像读取失败
    /// 作为错误返回，调用方可以选择忽略后以空队列重建。
    pub async fn build(self) -> PoolResult<WorkerPool> {
        self.validate()?;

        let monitoring = self.config.monitoring().clone();
        let alert = self.config.alert().clone();
        let scaling = self.config.scaling().clone();
        let persistence_enabled = self.config.persistence().enabled();

        let percentiles = if monitoring.latency_metrics_enabled() {
            monitoring.latency_percentiles().to_vec()
        } else {
            Vec::new()
        };
        let stats = Arc::new(TaskStats::new(percentiles, DEFAULT_MAX_LATENCY_MS));

        let persistence: Arc<dyn PersistenceStrategy> = match self.config.persistence().strategy()
        {
            Some(strategy) if persistence_enabled => Arc::clone(strategy),
            _ => Arc::new(NoOpPersistenceStrategy::new()),
        };
        let queue = PriorityTaskQueue::new(self.queue_capacity, Arc::clone(&persistence));

        let mut registry = ExecutorRegistry::new();
        for executor in self.executors {
            registry.register(executor);
        }

        let bus = self.bus.unwrap_or_else(AlertBus::global);

        let inner = Arc::new_cyclic(|self_weak| PoolInner {
            self_weak: self_weak.clone(),
            pool_name: self.pool_name.clone(),
            config: self.config,
            queue: Arc::clone(&queue),
            stats: Arc::clone(&stats),
            executors: Arc::new(registry),
            core_size: AtomicUsize::new(self.core_pool_size),
            max_size: AtomicUsize::new(self.max_pool_size),
            keep_alive_ms: AtomicU64::new(self.keep_alive.as_millis() as u64),
            pool_size: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            completed: AtomicU64::new(0),
            worker_seq: AtomicU64::new(0),
            shutdown: AtomicBool::new(false),
            worker_handles: Mutex::new(Vec::new()),
        });

        if persistence_enabled {
            let persisted = persistence.load().await?;
            if !persisted.is_empty() {
                queue.restore(persisted);
            }
            queue.start_snapshotter();
        }

        inner.ensure_core_workers();

        let scaler = Arc::new(PoolScaler::new(
            Arc::downgrade(&(Arc::clone(&inner) as Arc<dyn ScalableExecutor>)),
            scaling.clone(),
            self.pool_name.clone(),
            Arc::clone(&bus),
        ));
        let driver: Option<Arc<dyn ScalingDriver>> = scaling
            .strategy()
            .is_some()
            .then(|| Arc::clone(&scaler) as Arc<dyn ScalingDriver>);

        let monitor = PoolMonitor::start(
            self.pool_name,
            monitoring,
            alert,
            Arc::downgrade(&(Arc::clone(&inner) as Arc<dyn SnapshotSource>)),
            driver,
            bus,
        );

        Ok(WorkerPool {
            inner,
            monitor,
            scaler,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executors::FnExecutor;
    use std::sync::atomic::AtomicUsize as StdAtomicUsize;

    fn counting_executor(name: &str) -> (Arc<FnExecutor>, Arc<StdAtomicUsize>) {
        let counter = Arc::new(StdAtomicUsize::new(0));
        let executor = {
            let counter = Arc::clone(&counter);
            Arc::new(FnExecutor::new(name, move |_| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::Relaxed);
                    Ok(())
                }
            }))
        };
        (executor, counter)
    }

    async fn wait_until<F: Fn() -> bool>(predicate: F, timeout_ms: u64) -> bool {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        while Instant::now() < deadline {
            if predicate() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        predicate()
    }

    #[tokio::test]
    async fn test_submit_runs_task() {
        let (executor, counter) = counting_executor("count");
        let pool = WorkerPool::builder()
            .pool_name("unit")
            .core_pool_size(1)
            .max_pool_size(1)
            .queue_capacity(10)
            .register_executor(executor)
            .alert_bus(Arc::new(AlertBus::new()))
            .build()
            .await
            .unwrap();

        pool.submit(TaskPayload::bare("count"), 1).unwrap();
        assert!(wait_until(|| counter.load(Ordering::Relaxed) == 1, 1000).await);

        let snapshot = pool.snapshot();
        assert_eq!(snapshot.task_stats.submitted, 1);
        assert_eq!(snapshot.task_stats.completed, 1);
        pool.graceful_shutdown().await;
    }

    #[tokio::test]
    async fn test_execute_uses_default_priority() {
        let (executor, counter) = counting_executor("count");
        let pool = WorkerPool::builder()
            .pool_name("unit")
            .core_pool_size(1)
            .max_pool_size(1)
            .queue_capacity(10)
            .register_executor(executor)
            .alert_bus(Arc::new(AlertBus::new()))
            .build()
            .await
            .unwrap();

        pool.execute(TaskPayload::bare("count")).unwrap();
        assert!(wait_until(|| counter.load(Ordering::Relaxed) == 1, 1000).await);
        pool.graceful_shutdown().await;
    }

    #[tokio::test]
    async fn test_missing_executor_records_failure() {
        let pool = WorkerPool::builder()
            .pool_name("unit")
            .core_pool_size(1)
            .max_pool_size(1)
            .queue_capacity(10)
            .alert_bus(Arc::new(AlertBus::new()))
            .build()
            .await
            .unwrap();

        pool.submit(TaskPayload::bare("unregistered"), 1).unwrap();
        let stats = pool.stats();
        assert!(wait_until(|| stats.failed() == 1, 1000).await);
        pool.graceful_shutdown().await;
    }

    #[tokio::test]
    async fn test_rejection_when_queue_full() {
        // 单 worker 被长任务占住，容量 1 的队列第二个任务被拒绝
        let blocker = Arc::new(FnExecutor::new("block", |_| async {
            tokio::time::sleep(Duration::from_millis(300)).await;
            Ok(())
        }));
        let pool = WorkerPool::builder()
            .pool_name("unit")
            .core_pool_size(1)
            .max_pool_size(1)
            .queue_capacity(1)
            .register_executor(blocker)
            .alert_bus(Arc::new(AlertBus::new()))
            .build()
            .await
            .unwrap();

        pool.submit(TaskPayload::bare("block"), 1).unwrap();
        // 等 worker 取走第一个任务
        assert!(wait_until(|| pool.active_count() == 1, 1000).await);

        pool.submit(TaskPayload::bare("block"), 1).unwrap();
        let rejected = pool.submit(TaskPayload::bare("block"), 1);
        assert!(matches!(rejected, Err(PoolError::TaskRejected { .. })));
        assert_eq!(pool.stats().rejected(), 1);
        pool.graceful_shutdown().await;
    }

    #[tokio::test]
    async fn test_submit_after_shutdown_is_rejected() {
        let (executor, _) = counting_executor("count");
        let pool = WorkerPool::builder()
            .pool_name("unit")
            .core_pool_size(1)
            .max_pool_size(1)
            .queue_capacity(10)
            .register_executor(executor)
            .alert_bus(Arc::new(AlertBus::new()))
            .build()
            .await
            .unwrap();

        pool.graceful_shutdown().await;
        let result = pool.submit(TaskPayload::bare("count"), 1);
        assert!(matches!(result, Err(PoolError::PoolShutdown)));
        assert_eq!(pool.stats().rejected(), 1);
    }

    #[tokio::test]
    async fn test_transient_worker_spawned_up_to_max() {
        let blocker = Arc::new(FnExecutor::new("block", |_| async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(())
        }));
        let pool = WorkerPool::builder()
            .pool_name("unit")
            .core_pool_size(1)
            .max_pool_size(2)
            .queue_capacity(10)
            .register_executor(blocker)
            .alert_bus(Arc::new(AlertBus::new()))
            .build()
            .await
            .unwrap();

        assert_eq!(pool.pool_size(), 1);
        pool.submit(TaskPayload::bare("block"), 1).unwrap();
        assert!(wait_until(|| pool.active_count() == 1, 1000).await);

        // 全员忙碌且未达最大线程数，第二个提交触发临时 worker
        pool.submit(TaskPayload::bare("block"), 1).unwrap();
        assert!(wait_until(|| pool.pool_size() == 2, 1000).await);
        pool.graceful_shutdown().await;
    }

    #[tokio::test]
    async fn test_builder_validation() {
        assert!(WorkerPool::builder()
            .core_pool_size(4)
            .max_pool_size(2)
            .build()
            .await
            .is_err());
        assert!(WorkerPool::builder()
            .max_pool_size(0)
            .core_pool_size(0)
            .build()
            .await
            .is_err());
        assert!(WorkerPool::builder()
            .queue_capacity(0)
            .build()
            .await
            .is_err());
        assert!(WorkerPool::builder().pool_name("  ").build().await.is_err());
    }

    #[tokio::test]
    async fn test_snapshot_reflects_queue_capacity() {
        let pool = WorkerPool::builder()
            .pool_name("unit")
            .core_pool_size(1)
            .max_pool_size(2)
            .queue_capacity(42)
            .alert_bus(Arc::new(AlertBus::new()))
            .build()
            .await
            .unwrap();

        let snapshot = pool.snapshot();
        assert_eq!(snapshot.queue_capacity, 42);
        assert_eq!(snapshot.max_pool_size, 2);
        assert_eq!(snapshot.pool_size, 1);
        pool.graceful_shutdown().await;
    }
}
