use flexpool_domain::value_objects::DEFAULT_LATENCY_PERCENTILES;
use flexpool_errors::{PoolError, PoolResult};

/// 监控配置
#[derive(Debug, Clone)]
pub struct MonitoringConfig {
    /// 监控周期（毫秒）
    monitoring_period_ms: u64,
    /// 采样间隔（毫秒）
    sampling_interval_ms: u64,
    /// 是否启用详细指标收集
    enable_detailed_metrics: bool,
    /// 队列相关指标
    enable_queue_metrics: bool,
    /// 任务执行相关指标
    enable_task_metrics: bool,
    /// 线程相关指标
    enable_thread_metrics: bool,
    /// 延迟相关指标
    enable_latency_metrics: bool,
    /// 拒绝相关指标
    enable_rejection_metrics: bool,
    /// 延迟百分位配置
    latency_percentiles: Vec<u8>,
}

impl MonitoringConfig {
    pub fn builder() -> MonitoringConfigBuilder {
        MonitoringConfigBuilder::default()
    }

    pub fn monitoring_period_ms(&self) -> u64 {
        self.monitoring_period_ms
    }

    pub fn sampling_interval_ms(&self) -> u64 {
        self.sampling_interval_ms
    }

    pub fn detailed_metrics_enabled(&self) -> bool {
        self.enable_detailed_metrics
    }

    pub fn queue_metrics_enabled(&self) -> bool {
        self.enable_queue_metrics
    }

    pub fn task_metrics_enabled(&self) -> bool {
        self.enable_task_metrics
    }

    pub fn thread_metrics_enabled(&self) -> bool {
        self.enable_thread_metrics
    }

    pub fn latency_metrics_enabled(&self) -> bool {
        self.enable_latency_metrics
    }

    pub fn rejection_metrics_enabled(&self) -> bool {
        self.enable_rejection_metrics
    }

    pub fn latency_percentiles(&self) -> &[u8] {
        &self.latency_percentiles
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        MonitoringConfigBuilder::default()
            .build()
            .expect("默认监控配置必定合法")
    }
}

pub struct MonitoringConfigBuilder {
    monitoring_period_ms: u64,
    sampling_interval_ms: u64,
    enable_detailed_metrics: bool,
    enable_queue_metrics: bool,
    enable_task_metrics: bool,
    enable_thread_metrics: bool,
    enable_latency_metrics: bool,
    enable_rejection_metrics: bool,
    latency_percentiles: Vec<u8>,
}

impl Default for MonitoringConfigBuilder {
    fn default() -> Self {
        Self {
            monitoring_period_ms: 5000,
            sampling_interval_ms: 1000,
            enable_detailed_metrics: false,
            enable_queue_metrics: true,
            enable_task_metrics: true,
            enable_thread_metrics: true,
            enable_latency_metrics: true,
            enable_rejection_metrics: true,
            latency_percentiles: DEFAULT_LATENCY_PERCENTILES.to_vec(),
        }
    }
}

impl MonitoringConfigBuilder {
    pub fn monitoring_period_ms(mut self, period_ms: u64) -> Self {
        self.monitoring_period_ms = period_ms;
        self
    }

    pub fn sampling_interval_ms(mut self, interval_ms: u64) -> Self {
        self.sampling_interval_ms = interval_ms;
        self
    }

    pub fn enable_detailed_metrics(mut self, enable: bool) -> Self {
        self.enable_detailed_metrics = enable;
        self
    }

    pub fn enable_queue_metrics(mut self, enable: bool) -> Self {
        self.enable_queue_metrics = enable;
        self
    }

    pub fn enable_task_metrics(mut self, enable: bool) -> Self {
        self.enable_task_metrics = enable;
        self
    }

    pub fn enable_thread_metrics(mut self, enable: bool) -> Self {
        self.enable_thread_metrics = enable;
        self
    }

    pub fn enable_latency_metrics(mut self, enable: bool) -> Self {
        self.enable_latency_metrics = enable;
        self
    }

    pub fn enable_rejection_metrics(mut self, enable: bool) -> Self {
        self.enable_rejection_metrics = enable;
        self
    }

    pub fn latency_percentiles(mut self, percentiles: Vec<u8>) -> Self {
        self.latency_percentiles = percentiles;
        self
    }

    pub fn build(self) -> PoolResult<MonitoringConfig> {
        if self.monitoring_period_ms == 0 {
            return Err(PoolError::configuration("监控周期必须大于 0"));
        }
        if self.sampling_interval_ms == 0 {
            return Err(PoolError::configuration("采样间隔必须大于 0"));
        }
        if self.sampling_interval_ms > self.monitoring_period_ms {
            return Err(PoolError::configuration("采样间隔不能大于监控周期"));
        }
        if self.enable_latency_metrics && self.latency_percentiles.is_empty() {
            return Err(PoolError::configuration(
                "启用延迟指标时必须配置延迟百分位",
            ));
        }
        if let Some(p) = self.latency_percentiles.iter().find(|&&p| p > 100) {
            return Err(PoolError::Configuration(format!(
                "延迟百分位必须在 0 到 100 之间: {p}"
            )));
        }

        Ok(MonitoringConfig {
            monitoring_period_ms: self.monitoring_period_ms,
            sampling_interval_ms: self.sampling_interval_ms,
            enable_detailed_metrics: self.enable_detailed_metrics,
            enable_queue_metrics: self.enable_queue_metrics,
            enable_task_metrics: self.enable_task_metrics,
            enable_thread_metrics: self.enable_thread_metrics,
            enable_latency_metrics: self.enable_latency_metrics,
            enable_rejection_metrics: self.enable_rejection_metrics,
            latency_percentiles: self.latency_percentiles,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MonitoringConfig::default();
        assert_eq!(config.monitoring_period_ms(), 5000);
        assert_eq!(config.sampling_interval_ms(), 1000);
        assert!(!config.detailed_metrics_enabled());
        assert!(config.queue_metrics_enabled());
        assert_eq!(config.latency_percentiles(), &[50, 75, 90, 95, 99]);
    }

    #[test]
    fn test_rejects_zero_period() {
        let result = MonitoringConfig::builder().monitoring_period_ms(0).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_interval_above_period() {
        let result = MonitoringConfig::builder()
            .monitoring_period_ms(1000)
            .sampling_interval_ms(2000)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_empty_percentiles_when_latency_enabled() {
        let result = MonitoringConfig::builder()
            .latency_percentiles(vec![])
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_percentile_above_100() {
        let result = MonitoringConfig::builder()
            .latency_percentiles(vec![50, 101])
            .build();
        assert!(result.is_err());
    }
}
