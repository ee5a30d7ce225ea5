use flexpool_errors::PoolResult;

use crate::models::alert::AlertConfig;
use crate::models::monitoring::MonitoringConfig;
use crate::models::persistence::PersistenceConfig;
use crate::models::scaling::ScalingConfig;

/// 工作池聚合配置
///
/// 将监控、告警、扩缩容与持久化四类配置组合为一个对象，
/// 供工作池构建器一次性注入。
#[derive(Debug, Clone, Default)]
pub struct PoolConfig {
    monitoring: MonitoringConfig,
    alert: AlertConfig,
    scaling: ScalingConfig,
    persistence: PersistenceConfig,
}

impl PoolConfig {
    pub fn builder() -> PoolConfigBuilder {
        PoolConfigBuilder::default()
    }

    pub fn monitoring(&self) -> &MonitoringConfig {
        &self.monitoring
    }

    pub fn alert(&self) -> &AlertConfig {
        &self.alert
    }

    pub fn scaling(&self) -> &ScalingConfig {
        &self.scaling
    }

    pub fn persistence(&self) -> &PersistenceConfig {
        &self.persistence
    }
}

#[derive(Default)]
pub struct PoolConfigBuilder {
    monitoring: MonitoringConfig,
    alert: AlertConfig,
    scaling: ScalingConfig,
    persistence: PersistenceConfig,
}

impl PoolConfigBuilder {
    pub fn monitoring(mut self, config: MonitoringConfig) -> Self {
        self.monitoring = config;
        self
    }

    pub fn alert(mut self, config: AlertConfig) -> Self {
        self.alert = config;
        self
    }

    pub fn scaling(mut self, config: ScalingConfig) -> Self {
        self.scaling = config;
        self
    }

    pub fn persistence(mut self, config: PersistenceConfig) -> Self {
        self.persistence = config;
        self
    }

    pub fn build(self) -> PoolResult<PoolConfig> {
        // 各子配置在自身 build() 时已完成校验
        Ok(PoolConfig {
            monitoring: self.monitoring,
            alert: self.alert,
            scaling: self.scaling,
            persistence: self.persistence,
        })
    }
}
