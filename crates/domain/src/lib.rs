//! FlexPool 领域层
//!
//! 定义工作池的核心实体、值对象与端口接口：
//! - 任务实体（带跟踪信息的任务、可序列化任务投影）
//! - 告警事件模型
//! - 统计快照与扩缩容命令
//! - 供基础设施层实现的端口 trait

pub mod entities;
pub mod events;
pub mod ports;
pub mod value_objects;

pub use entities::{SerializableTask, TaskPayload, TrackedTask};
pub use events::{metadata_keys, AlertEvent, AlertKind, AlertLevel, AlertMetadata, MetadataValue};
pub use ports::{
    AlertListener, PersistenceStrategy, ScalingDriver, ScalingStrategy, SnapshotSource,
    TaskExecutor,
};
pub use value_objects::{
    PoolSnapshot, PoolSnapshotBuilder, ScalingCommand, ScalingCommandBuilder, TaskStatsSnapshot,
    DEFAULT_LATENCY_PERCENTILES, DEFAULT_MAX_LATENCY_MS, LATENCY_BUCKET_COUNT,
};
