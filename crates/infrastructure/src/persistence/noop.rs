use async_trait::async_trait;
use tracing::debug;

use flexpool_domain::entities::SerializableTask;
use flexpool_domain::ports::PersistenceStrategy;
use flexpool_errors::PoolResult;

/// 空持久化策略
///
/// 不执行任何持久化操作，适用于无需恢复队列的场景。
#[derive(Debug, Default, Clone)]
pub struct NoOpPersistenceStrategy;

impl NoOpPersistenceStrategy {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PersistenceStrategy for NoOpPersistenceStrategy {
    async fn save(&self, tasks: &[SerializableTask]) -> PoolResult<()> {
        debug!("NoOp persistence: skipping save of {} tasks", tasks.len());
        Ok(())
    }

    async fn load(&self) -> PoolResult<Vec<SerializableTask>> {
        debug!("NoOp persistence: returning empty task list");
        Ok(Vec::new())
    }

    async fn cleanup(&self) -> PoolResult<()> {
        debug!("NoOp persistence: skipping cleanup");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_is_empty_and_infallible() {
        let strategy = NoOpPersistenceStrategy::new();
        strategy.save(&[]).await.unwrap();
        assert!(strategy.load().await.unwrap().is_empty());
        strategy.cleanup().await.unwrap();
    }
}
