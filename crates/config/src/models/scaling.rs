use std::fmt;
use std::sync::Arc;

use flexpool_domain::ports::ScalingStrategy;
use flexpool_errors::{PoolError, PoolResult};

fn default_max_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get() * 2)
        .unwrap_or(8)
}

/// 扩缩容配置
///
/// `scaling_check_period_ms` 同时充当两次扩缩容之间的冷却时间。
#[derive(Clone)]
pub struct ScalingConfig {
    strategy: Option<Arc<dyn ScalingStrategy>>,
    scaling_check_period_ms: u64,
    min_threads: usize,
    max_threads: usize,
}

impl ScalingConfig {
    pub fn builder() -> ScalingConfigBuilder {
        ScalingConfigBuilder::default()
    }

    pub fn strategy(&self) -> Option<&Arc<dyn ScalingStrategy>> {
        self.strategy.as_ref()
    }

    pub fn scaling_check_period_ms(&self) -> u64 {
        self.scaling_check_period_ms
    }

    pub fn min_threads(&self) -> usize {
        self.min_threads
    }

    pub fn max_threads(&self) -> usize {
        self.max_threads
    }
}

impl Default for ScalingConfig {
    fn default() -> Self {
        ScalingConfigBuilder::default()
            .build()
            .expect("默认扩缩容配置必定合法")
    }
}

impl fmt::Debug for ScalingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalingConfig")
            .field(
                "strategy",
                &self.strategy.as_ref().map(|s| s.name().to_string()),
            )
            .field("scaling_check_period_ms", &self.scaling_check_period_ms)
            .field("min_threads", &self.min_threads)
            .field("max_threads", &self.max_threads)
            .finish()
    }
}

pub struct ScalingConfigBuilder {
    strategy: Option<Arc<dyn ScalingStrategy>>,
    scaling_check_period_ms: u64,
    min_threads: usize,
    max_threads: usize,
}

impl Default for ScalingConfigBuilder {
    fn default() -> Self {
        Self {
            strategy: None,
            scaling_check_period_ms: 30_000,
            min_threads: 1,
            max_threads: default_max_threads(),
        }
    }
}

impl ScalingConfigBuilder {
    pub fn strategy(mut self, strategy: Arc<dyn ScalingStrategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn scaling_check_period_ms(mut self, period_ms: u64) -> Self {
        self.scaling_check_period_ms = period_ms;
        self
    }

    pub fn min_threads(mut self, min: usize) -> Self {
        self.min_threads = min;
        self
    }

    pub fn max_threads(mut self, max: usize) -> Self {
        self.max_threads = max;
        self
    }

    pub fn build(self) -> PoolResult<ScalingConfig> {
        if self.min_threads == 0 {
            return Err(PoolError::configuration("最小线程数必须大于 0"));
        }
        if self.max_threads < self.min_threads {
            return Err(PoolError::Configuration(format!(
                "最大线程数不能小于最小线程数: min={}, max={}",
                self.min_threads, self.max_threads
            )));
        }

        Ok(ScalingConfig {
            strategy: self.strategy,
            scaling_check_period_ms: self.scaling_check_period_ms,
            min_threads: self.min_threads,
            max_threads: self.max_threads,
        })
    }
}
