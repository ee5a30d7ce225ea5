use flexpool_domain::events::AlertLevel;
use flexpool_errors::{PoolError, PoolResult};

/// 告警配置
#[derive(Debug, Clone)]
pub struct AlertConfig {
    /// 队列大小告警阈值
    queue_size_warning_threshold: usize,
    /// 任务超时上报阈值（毫秒），仅用于监控报告，不会中断任务
    task_timeout_ms: u64,
    /// 线程池使用率告警阈值（百分比）
    thread_pool_usage_threshold: u8,
    /// 最小告警级别，低于该级别的告警在监控器侧被抑制
    minimum_alert_level: AlertLevel,
}

impl AlertConfig {
    pub fn builder() -> AlertConfigBuilder {
        AlertConfigBuilder::default()
    }

    pub fn queue_size_warning_threshold(&self) -> usize {
        self.queue_size_warning_threshold
    }

    pub fn task_timeout_ms(&self) -> u64 {
        self.task_timeout_ms
    }

    pub fn thread_pool_usage_threshold(&self) -> u8 {
        self.thread_pool_usage_threshold
    }

    pub fn minimum_alert_level(&self) -> AlertLevel {
        self.minimum_alert_level
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        AlertConfigBuilder::default()
            .build()
            .expect("默认告警配置必定合法")
    }
}

pub struct AlertConfigBuilder {
    queue_size_warning_threshold: usize,
    task_timeout_ms: u64,
    thread_pool_usage_threshold: u8,
    minimum_alert_level: AlertLevel,
}

impl Default for AlertConfigBuilder {
    fn default() -> Self {
        Self {
            queue_size_warning_threshold: 1000,
            task_timeout_ms: 60_000,
            thread_pool_usage_threshold: 80,
            minimum_alert_level: AlertLevel::Warning,
        }
    }
}

impl AlertConfigBuilder {
    pub fn queue_size_warning_threshold(mut self, threshold: usize) -> Self {
        self.queue_size_warning_threshold = threshold;
        self
    }

    pub fn task_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.task_timeout_ms = timeout_ms;
        self
    }

    pub fn thread_pool_usage_threshold(mut self, threshold: u8) -> Self {
        self.thread_pool_usage_threshold = threshold;
        self
    }

    pub fn minimum_alert_level(mut self, level: AlertLevel) -> Self {
        self.minimum_alert_level = level;
        self
    }

    pub fn build(self) -> PoolResult<AlertConfig> {
        if self.queue_size_warning_threshold == 0 {
            return Err(PoolError::configuration("队列告警阈值必须大于 0"));
        }
        if self.task_timeout_ms == 0 {
            return Err(PoolError::configuration("任务超时阈值必须大于 0"));
        }
        if self.thread_pool_usage_threshold == 0 || self.thread_pool_usage_threshold > 100 {
            return Err(PoolError::configuration(
                "线程池使用率阈值必须在 1 到 100 之间",
            ));
        }

        Ok(AlertConfig {
            queue_size_warning_threshold: self.queue_size_warning_threshold,
            task_timeout_ms: self.task_timeout_ms,
            thread_pool_usage_threshold: self.thread_pool_usage_threshold,
            minimum_alert_level: self.minimum_alert_level,
        })
    }
}
