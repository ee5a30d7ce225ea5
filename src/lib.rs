//! FlexPool - 自适应可观测工作池
//!
//! 一个面向 tokio 的增强型工作池：优先级有界队列、任务生命周期
//! 跟踪、实时统计、队列持久化、可插拔的自动扩缩容策略与结构化
//! 告警总线。
//!
//! # 快速上手
//!
//! ```no_run
//! use std::sync::Arc;
//! use flexpool::{FnExecutor, TaskPayload, WorkerPool};
//!
//! # async fn demo() -> flexpool::PoolResult<()> {
//! let pool = WorkerPool::builder()
//!     .pool_name("orders")
//!     .core_pool_size(2)
//!     .max_pool_size(8)
//!     .queue_capacity(1000)
//!     .register_executor(Arc::new(FnExecutor::new("echo", |payload| async move {
//!         println!("processing {:?}", payload.parameters);
//!         Ok(())
//!     })))
//!     .build()
//!     .await?;
//!
//! pool.submit(TaskPayload::bare("echo"), 1)?;
//! pool.graceful_shutdown().await;
//! # Ok(())
//! # }
//! ```

pub use flexpool_config::{
    AlertConfig, MonitoringConfig, PersistenceConfig, PoolConfig, ScalingConfig,
};
pub use flexpool_domain::{
    metadata_keys, AlertEvent, AlertKind, AlertLevel, AlertListener, AlertMetadata, MetadataValue,
    PersistenceStrategy, PoolSnapshot, ScalingCommand, ScalingStrategy, SerializableTask,
    TaskExecutor, TaskPayload, TaskStatsSnapshot, TrackedTask,
};
pub use flexpool_errors::{PoolError, PoolResult};
pub use flexpool_infrastructure::{
    DatabasePersistenceStrategy, FilePersistenceStrategy, NoOpPersistenceStrategy,
};
pub use flexpool_observability::{init_tracing, AlertBus, PoolMonitor, TaskStats};
pub use flexpool_worker::{
    CompositeScalingStrategy, ExecutorRegistry, FnExecutor, LoadBasedScalingStrategy,
    PoolScaler, PriorityTaskQueue, QueueBasedScalingStrategy, WorkerPool, WorkerPoolBuilder,
    DEFAULT_PRIORITY,
};
