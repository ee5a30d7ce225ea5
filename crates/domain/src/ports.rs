//! 端口定义
//!
//! 领域层对外依赖的抽象接口，由基础设施层与工作池引擎实现。

use async_trait::async_trait;

use flexpool_errors::PoolResult;

use crate::entities::{SerializableTask, TrackedTask};
use crate::events::AlertEvent;
use crate::value_objects::{PoolSnapshot, ScalingCommand};

/// 任务执行器
///
/// 按 `task_type` 注册到工作池，负责实际执行任务载荷。
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// 执行器名称，同时作为可处理的任务类型
    fn name(&self) -> &str;

    /// 执行任务，失败时返回错误交由池的统计与日志处理
    async fn execute(&self, task: &TrackedTask) -> PoolResult<()>;
}

/// 队列持久化策略
///
/// save 为整体替换语义而非追加；load 返回持久化顺序的任务序列，
/// 无镜像时返回空；cleanup 幂等删除镜像。
#[async_trait]
pub trait PersistenceStrategy: Send + Sync {
    async fn save(&self, tasks: &[SerializableTask]) -> PoolResult<()>;

    async fn load(&self) -> PoolResult<Vec<SerializableTask>>;

    async fn cleanup(&self) -> PoolResult<()>;
}

/// 扩缩容策略
///
/// 从快照计算期望的调整命令，不得产生副作用。
pub trait ScalingStrategy: Send + Sync {
    /// 策略名称，用于日志标识
    fn name(&self) -> &str;

    /// 无需调整时返回 None
    fn calculate_scaling(&self, snapshot: &PoolSnapshot) -> Option<ScalingCommand>;
}

/// 告警事件监听器
///
/// 返回错误时由总线记录日志并继续分发，不会中断其他监听器。
pub trait AlertListener: Send + Sync {
    fn on_alert(&self, event: &AlertEvent) -> anyhow::Result<()>;
}

/// 池状态采样源
///
/// 监控器通过弱引用持有，打破池与监控器之间的所有权环。
pub trait SnapshotSource: Send + Sync {
    fn pool_snapshot(&self) -> PoolSnapshot;

    fn is_shutdown(&self) -> bool;
}

/// 扩缩容执行入口，由监控器在采样后驱动
pub trait ScalingDriver: Send + Sync {
    fn attempt_scaling(&self, snapshot: &PoolSnapshot);
}
