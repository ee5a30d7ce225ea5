use chrono::Utc;

/// 延迟直方图桶数，将 [0, max_latency) 均分为 100 个线性区间
pub const LATENCY_BUCKET_COUNT: usize = 100;

/// 默认最大统计延迟（毫秒），超出的样本被丢弃
pub const DEFAULT_MAX_LATENCY_MS: u64 = 10_000;

/// 默认统计的延迟百分位
pub const DEFAULT_LATENCY_PERCENTILES: [u8; 5] = [50, 75, 90, 95, 99];

/// 任务统计快照
///
/// 各字段为采集时刻的独立原子读取，字段之间不保证全局原子性。
/// 快照携带直方图与百分位配置，所有派生指标都是快照的纯函数。
#[derive(Debug, Clone)]
pub struct TaskStatsSnapshot {
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
    pub rejected: u64,
    pub total_wait_ms: u64,
    pub total_execution_ms: u64,
    pub total_queue_ms: u64,
    pub max_queue_size: u64,
    pub latency_buckets: Vec<u64>,
    pub percentiles: Vec<u8>,
    pub max_latency_ms: u64,
    pub start_time_ms: i64,
}

impl Default for TaskStatsSnapshot {
    fn default() -> Self {
        Self {
            submitted: 0,
            completed: 0,
            failed: 0,
            rejected: 0,
            total_wait_ms: 0,
            total_execution_ms: 0,
            total_queue_ms: 0,
            max_queue_size: 0,
            latency_buckets: vec![0; LATENCY_BUCKET_COUNT],
            percentiles: DEFAULT_LATENCY_PERCENTILES.to_vec(),
            max_latency_ms: DEFAULT_MAX_LATENCY_MS,
            start_time_ms: Utc::now().timestamp_millis(),
        }
    }
}

impl TaskStatsSnapshot {
    /// 指定百分位的延迟（毫秒）
    ///
    /// 空直方图返回 0；p >= 100 返回最大统计延迟；
    /// 否则沿桶累加计数直至覆盖 total * p / 100。
    pub fn latency_percentile(&self, percentile: u8) -> u64 {
        let total: u64 = self.latency_buckets.iter().sum();
        if total == 0 {
            return 0;
        }
        if percentile >= 100 {
            return self.max_latency_ms;
        }

        let target = total * percentile as u64 / 100;
        let mut count = 0u64;
        for (i, bucket) in self.latency_buckets.iter().enumerate() {
            count += bucket;
            if count >= target {
                return i as u64 * self.max_latency_ms / LATENCY_BUCKET_COUNT as u64;
            }
        }
        self.max_latency_ms
    }

    /// 全部已配置百分位对应的延迟
    pub fn all_latency_percentiles(&self) -> Vec<(u8, u64)> {
        self.percentiles
            .iter()
            .map(|&p| (p, self.latency_percentile(p)))
            .collect()
    }

    pub fn task_success_rate(&self) -> f64 {
        if self.submitted > 0 {
            (self.submitted - self.failed.min(self.submitted)) as f64 / self.submitted as f64
        } else {
            0.0
        }
    }

    pub fn task_rejection_rate(&self) -> f64 {
        if self.submitted > 0 {
            self.rejected as f64 / self.submitted as f64
        } else {
            0.0
        }
    }

    pub fn average_wait_ms(&self) -> u64 {
        if self.submitted > 0 {
            self.total_wait_ms / self.submitted
        } else {
            0
        }
    }

    pub fn average_execution_ms(&self) -> u64 {
        if self.completed > 0 {
            self.total_execution_ms / self.completed
        } else {
            0
        }
    }

    pub fn average_queue_ms(&self) -> u64 {
        if self.submitted > 0 {
            self.total_queue_ms / self.submitted
        } else {
            0
        }
    }
}

/// 工作池快照
///
/// 统计快照与池级计数器在采样时刻的不可变组合。
#[derive(Debug, Clone)]
pub struct PoolSnapshot {
    pub task_stats: TaskStatsSnapshot,
    pub active_threads: usize,
    pub pool_size: usize,
    pub max_pool_size: usize,
    pub queue_size: usize,
    pub queue_capacity: usize,
    pub completed_tasks: u64,
    pub timestamp_ms: i64,
}

impl PoolSnapshot {
    pub fn builder() -> PoolSnapshotBuilder {
        PoolSnapshotBuilder::default()
    }

    pub fn thread_utilization(&self) -> f64 {
        if self.pool_size > 0 {
            self.active_threads as f64 / self.pool_size as f64
        } else {
            0.0
        }
    }

    pub fn max_thread_utilization(&self) -> f64 {
        if self.max_pool_size > 0 {
            self.active_threads as f64 / self.max_pool_size as f64
        } else {
            0.0
        }
    }

    pub fn idle_threads(&self) -> usize {
        self.pool_size.saturating_sub(self.active_threads)
    }

    pub fn queue_utilization(&self) -> f64 {
        if self.queue_capacity > 0 {
            self.queue_size as f64 / self.queue_capacity as f64
        } else {
            0.0
        }
    }

    pub fn remaining_queue_capacity(&self) -> usize {
        self.queue_capacity.saturating_sub(self.queue_size)
    }

    pub fn task_success_rate(&self) -> f64 {
        self.task_stats.task_success_rate()
    }

    pub fn task_rejection_rate(&self) -> f64 {
        self.task_stats.task_rejection_rate()
    }

    /// 吞吐量：完成数除以运行秒数
    pub fn task_throughput(&self) -> f64 {
        let uptime_ms = self.timestamp_ms - self.task_stats.start_time_ms;
        if uptime_ms > 0 {
            self.completed_tasks as f64 / (uptime_ms as f64 / 1000.0)
        } else {
            0.0
        }
    }

    pub fn average_wait_ms(&self) -> u64 {
        self.task_stats.average_wait_ms()
    }

    pub fn average_execution_ms(&self) -> u64 {
        self.task_stats.average_execution_ms()
    }

    pub fn latency_percentile(&self, percentile: u8) -> u64 {
        self.task_stats.latency_percentile(percentile)
    }

    /// 固定键名的 JSON 形式，监控输出与外部落地共用
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "timestamp": self.timestamp_ms,
            "activeThreads": self.active_threads,
            "poolSize": self.pool_size,
            "maxPoolSize": self.max_pool_size,
            "queueSize": self.queue_size,
            "queueCapacity": self.queue_capacity,
            "queueUtilization": self.queue_utilization(),
            "threadUtilization": self.thread_utilization(),
            "maxThreadUtilization": self.max_thread_utilization(),
            "completedTasks": self.completed_tasks,
            "taskSuccessRate": self.task_success_rate(),
            "taskRejectionRate": self.task_rejection_rate(),
            "taskThroughput": self.task_throughput(),
            "averageWaitTime": self.average_wait_ms(),
            "averageExecutionTime": self.average_execution_ms(),
            "p50Latency": self.latency_percentile(50),
            "p95Latency": self.latency_percentile(95),
            "p99Latency": self.latency_percentile(99),
        })
    }
}

/// 快照构建器，构建时盖上采样时间戳
#[derive(Debug, Default)]
pub struct PoolSnapshotBuilder {
    task_stats: Option<TaskStatsSnapshot>,
    active_threads: usize,
    pool_size: usize,
    max_pool_size: usize,
    queue_size: usize,
    queue_capacity: usize,
    completed_tasks: u64,
}

impl PoolSnapshotBuilder {
    pub fn task_stats(mut self, stats: TaskStatsSnapshot) -> Self {
        self.task_stats = Some(stats);
        self
    }

    pub fn active_threads(mut self, n: usize) -> Self {
        self.active_threads = n;
        self
    }

    pub fn pool_size(mut self, n: usize) -> Self {
        self.pool_size = n;
        self
    }

    pub fn max_pool_size(mut self, n: usize) -> Self {
        self.max_pool_size = n;
        self
    }

    pub fn queue_size(mut self, n: usize) -> Self {
        self.queue_size = n;
        self
    }

    pub fn queue_capacity(mut self, n: usize) -> Self {
        self.queue_capacity = n;
        self
    }

    pub fn completed_tasks(mut self, n: u64) -> Self {
        self.completed_tasks = n;
        self
    }

    pub fn build(self) -> PoolSnapshot {
        PoolSnapshot {
            task_stats: self.task_stats.unwrap_or_default(),
            active_threads: self.active_threads,
            pool_size: self.pool_size,
            max_pool_size: self.max_pool_size,
            queue_size: self.queue_size,
            queue_capacity: self.queue_capacity,
            completed_tasks: self.completed_tasks,
            timestamp_ms: Utc::now().timestamp_millis(),
        }
    }
}

/// 扩缩容命令
///
/// 描述对池参数的期望调整量，本身不产生任何副作用。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalingCommand {
    thread_delta: i32,
    core_size_delta: i32,
    max_size_delta: i32,
    queue_capacity_delta: i64,
    keep_alive_delta_ms: i64,
    reason: String,
}

impl ScalingCommand {
    pub fn builder() -> ScalingCommandBuilder {
        ScalingCommandBuilder::default()
    }

    pub fn thread_delta(&self) -> i32 {
        self.thread_delta
    }

    pub fn core_size_delta(&self) -> i32 {
        self.core_size_delta
    }

    pub fn max_size_delta(&self) -> i32 {
        self.max_size_delta
    }

    pub fn queue_capacity_delta(&self) -> i64 {
        self.queue_capacity_delta
    }

    pub fn keep_alive_delta_ms(&self) -> i64 {
        self.keep_alive_delta_ms
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// 是否存在任一非零调整量
    pub fn has_adjustments(&self) -> bool {
        self.thread_delta != 0
            || self.core_size_delta != 0
            || self.max_size_delta != 0
            || self.queue_capacity_delta != 0
            || self.keep_alive_delta_ms != 0
    }
}

#[derive(Debug, Default)]
pub struct ScalingCommandBuilder {
    thread_delta: i32,
    core_size_delta: i32,
    max_size_delta: i32,
    queue_capacity_delta: i64,
    keep_alive_delta_ms: i64,
    reason: String,
}

impl ScalingCommandBuilder {
    pub fn thread_delta(mut self, delta: i32) -> Self {
        self.thread_delta = delta;
        self
    }

    pub fn core_size_delta(mut self, delta: i32) -> Self {
        self.core_size_delta = delta;
        self
    }

    pub fn max_size_delta(mut self, delta: i32) -> Self {
        self.max_size_delta = delta;
        self
    }

    pub fn queue_capacity_delta(mut self, delta: i64) -> Self {
        self.queue_capacity_delta = delta;
        self
    }

    pub fn keep_alive_delta_ms(mut self, delta: i64) -> Self {
        self.keep_alive_delta_ms = delta;
        self
    }

    pub fn reason<S: Into<String>>(mut self, reason: S) -> Self {
        self.reason = reason.into();
        self
    }

    pub fn build(self) -> ScalingCommand {
        ScalingCommand {
            thread_delta: self.thread_delta,
            core_size_delta: self.core_size_delta,
            max_size_delta: self.max_size_delta,
            queue_capacity_delta: self.queue_capacity_delta,
            keep_alive_delta_ms: self.keep_alive_delta_ms,
            reason: self.reason,
        }
    }
}
