use std::fmt;
use std::sync::Arc;

use flexpool_domain::ports::PersistenceStrategy;
use flexpool_errors::{PoolError, PoolResult};

/// 持久化配置
#[derive(Clone, Default)]
pub struct PersistenceConfig {
    enabled: bool,
    strategy: Option<Arc<dyn PersistenceStrategy>>,
}

impl PersistenceConfig {
    pub fn builder() -> PersistenceConfigBuilder {
        PersistenceConfigBuilder::default()
    }

    /// 禁用持久化的配置
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn strategy(&self) -> Option<&Arc<dyn PersistenceStrategy>> {
        self.strategy.as_ref()
    }
}

impl fmt::Debug for PersistenceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistenceConfig")
            .field("enabled", &self.enabled)
            .field("has_strategy", &self.strategy.is_some())
            .finish()
    }
}

#[derive(Default)]
pub struct PersistenceConfigBuilder {
    enabled: bool,
    strategy: Option<Arc<dyn PersistenceStrategy>>,
}

impl PersistenceConfigBuilder {
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn strategy(mut self, strategy: Arc<dyn PersistenceStrategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn build(self) -> PoolResult<PersistenceConfig> {
        if self.enabled && self.strategy.is_none() {
            return Err(PoolError::configuration(
                "启用持久化时必须提供持久化策略",
            ));
        }
        Ok(PersistenceConfig {
            enabled: self.enabled,
            strategy: self.strategy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use flexpool_domain::entities::SerializableTask;

    struct DummyStrategy;

    #[async_trait]
    impl PersistenceStrategy for DummyStrategy {
        async fn save(&self, _tasks: &[SerializableTask]) -> PoolResult<()> {
            Ok(())
        }
        async fn load(&self) -> PoolResult<Vec<SerializableTask>> {
            Ok(Vec::new())
        }
        async fn cleanup(&self) -> PoolResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_enabled_requires_strategy() {
        assert!(PersistenceConfig::builder().enabled(true).build().is_err());
        assert!(PersistenceConfig::builder()
            .enabled(true)
            .strategy(Arc::new(DummyStrategy))
            .build()
            .is_ok());
    }

    #[test]
    fn test_disabled_without_strategy_is_fine() {
        let config = PersistenceConfig::builder().build().unwrap();
        assert!(!config.enabled());
        assert!(config.strategy().is_none());
    }
}
