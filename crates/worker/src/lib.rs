//! FlexPool 工作池引擎
//!
//! 组合优先级持久化队列、统计收集、监控器与扩缩容器，
//! 对外暴露 `WorkerPool` 与其构建器。

pub mod executors;
pub mod pool;
pub mod queue;
pub mod scaler;
pub mod strategies;

pub use executors::{ExecutorRegistry, FnExecutor};
pub use pool::{WorkerPool, WorkerPoolBuilder, DEFAULT_PRIORITY};
pub use queue::PriorityTaskQueue;
pub use scaler::{PoolScaler, ScalableExecutor};
pub use strategies::{
    CompositeScalingStrategy, LoadBasedScalingStrategy, QueueBasedScalingStrategy,
};
