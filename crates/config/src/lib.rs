//! FlexPool 配置层
//!
//! 所有配置对象均通过 Builder 构造，`build()` 时完成校验，
//! 非法输入以 `PoolError::Configuration` 拒绝。

pub mod models;

pub use models::alert::{AlertConfig, AlertConfigBuilder};
pub use models::monitoring::{MonitoringConfig, MonitoringConfigBuilder};
pub use models::persistence::{PersistenceConfig, PersistenceConfigBuilder};
pub use models::pool::{PoolConfig, PoolConfigBuilder};
pub use models::scaling::{ScalingConfig, ScalingConfigBuilder};
