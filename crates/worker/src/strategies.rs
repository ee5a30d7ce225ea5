//! 扩缩容策略实现
//!
//! 策略只根据快照计算调整命令，不直接改动池参数。

use std::sync::Arc;

use flexpool_domain::ports::ScalingStrategy;
use flexpool_domain::value_objects::{PoolSnapshot, ScalingCommand};

/// 基于负载的扩缩容策略
///
/// 负载定义为 active / pool_size。高负载时扩容并缩短空闲存活时间，
/// 低负载时缩容并延长空闲存活时间。
pub struct LoadBasedScalingStrategy {
    /// 高负载阈值，如 0.8 表示 80%
    high_load_threshold: f64,
    /// 低负载阈值，如 0.2 表示 20%
    low_load_threshold: f64,
    /// 每次扩容的线程数
    scale_up_size: i32,
    /// 每次缩容的线程数
    scale_down_size: i32,
    /// 空闲存活时间调整量（毫秒）
    keep_alive_adjustment_ms: i64,
}

impl LoadBasedScalingStrategy {
    pub fn new(
        high_load_threshold: f64,
        low_load_threshold: f64,
        scale_up_size: i32,
        scale_down_size: i32,
        keep_alive_adjustment_ms: i64,
    ) -> Self {
        Self {
            high_load_threshold,
            low_load_threshold,
            scale_up_size,
            scale_down_size,
            keep_alive_adjustment_ms,
        }
    }
}

impl ScalingStrategy for LoadBasedScalingStrategy {
    fn name(&self) -> &str {
        "LoadBased"
    }

    fn calculate_scaling(&self, snapshot: &PoolSnapshot) -> Option<ScalingCommand> {
        if snapshot.pool_size == 0 {
            return None;
        }
        let current_load = snapshot.active_threads as f64 / snapshot.pool_size as f64;

        if current_load > self.high_load_threshold && snapshot.pool_size < snapshot.max_pool_size {
            // 高负载：扩容并减少空闲线程存活时间
            Some(
                ScalingCommand::builder()
                    .thread_delta(self.scale_up_size)
                    .core_size_delta(self.scale_up_size)
                    .max_size_delta(self.scale_up_size * 2)
                    .keep_alive_delta_ms(-self.keep_alive_adjustment_ms)
                    .reason(format!(
                        "High load detected: {:.2}% (threshold: {:.2}%)",
                        current_load * 100.0,
                        self.high_load_threshold * 100.0
                    ))
                    .build(),
            )
        } else if current_load < self.low_load_threshold
            && snapshot.max_pool_size > snapshot.pool_size
        {
            // 低负载：缩容并增加空闲线程存活时间
            Some(
                ScalingCommand::builder()
                    .thread_delta(-self.scale_down_size)
                    .core_size_delta(-self.scale_down_size)
                    .keep_alive_delta_ms(self.keep_alive_adjustment_ms)
                    .reason(format!(
                        "Low load detected: {:.2}% (threshold: {:.2}%)",
                        current_load * 100.0,
                        self.low_load_threshold * 100.0
                    ))
                    .build(),
            )
        } else {
            None
        }
    }
}

/// 基于队列深度的扩容策略
pub struct QueueBasedScalingStrategy {
    /// 队列大小阈值
    queue_size_threshold: usize,
    /// 每次扩容的线程数
    scale_up_size: i32,
    /// 队列容量增加比例
    queue_capacity_increase_ratio: f64,
}

impl QueueBasedScalingStrategy {
    pub fn new(
        queue_size_threshold: usize,
        scale_up_size: i32,
        queue_capacity_increase_ratio: f64,
    ) -> Self {
        Self {
            queue_size_threshold,
            scale_up_size,
            queue_capacity_increase_ratio,
        }
    }
}

impl ScalingStrategy for QueueBasedScalingStrategy {
    fn name(&self) -> &str {
        "QueueBased"
    }

    fn calculate_scaling(&self, snapshot: &PoolSnapshot) -> Option<ScalingCommand> {
        if snapshot.queue_size > self.queue_size_threshold
            && snapshot.pool_size < snapshot.max_pool_size
        {
            let queue_capacity_delta =
                (snapshot.queue_size as f64 * self.queue_capacity_increase_ratio) as i64;

            Some(
                ScalingCommand::builder()
                    .thread_delta(self.scale_up_size)
                    .core_size_delta(self.scale_up_size)
                    .max_size_delta(self.scale_up_size * 2)
                    .queue_capacity_delta(queue_capacity_delta)
                    .reason(format!(
                        "Queue size ({}) exceeded threshold ({})",
                        snapshot.queue_size, self.queue_size_threshold
                    ))
                    .build(),
            )
        } else {
            None
        }
    }
}

/// 组合策略
///
/// 依次运行子策略，将非空命令的各调整量求和，
/// 原因以 " + " 连接并加 "Combined: " 前缀。
pub struct CompositeScalingStrategy {
    strategies: Vec<Arc<dyn ScalingStrategy>>,
}

impl CompositeScalingStrategy {
    pub fn new(strategies: Vec<Arc<dyn ScalingStrategy>>) -> Self {
        Self { strategies }
    }
}

impl ScalingStrategy for CompositeScalingStrategy {
    fn name(&self) -> &str {
        "Composite"
    }

    fn calculate_scaling(&self, snapshot: &PoolSnapshot) -> Option<ScalingCommand> {
        let commands: Vec<ScalingCommand> = self
            .strategies
            .iter()
            .filter_map(|strategy| strategy.calculate_scaling(snapshot))
            .collect();

        if commands.is_empty() {
            return None;
        }

        let reasons = commands
            .iter()
            .map(|command| command.reason())
            .collect::<Vec<_>>()
            .join(" + ");

        let mut thread_delta = 0;
        let mut core_size_delta = 0;
        let mut max_size_delta = 0;
        let mut queue_capacity_delta = 0;
        let mut keep_alive_delta_ms = 0;
        for command in &commands {
            thread_delta += command.thread_delta();
            core_size_delta += command.core_size_delta();
            max_size_delta += command.max_size_delta();
            queue_capacity_delta += command.queue_capacity_delta();
            keep_alive_delta_ms += command.keep_alive_delta_ms();
        }

        Some(
            ScalingCommand::builder()
                .thread_delta(thread_delta)
                .core_size_delta(core_size_delta)
                .max_size_delta(max_size_delta)
                .queue_capacity_delta(queue_capacity_delta)
                .keep_alive_delta_ms(keep_alive_delta_ms)
                .reason(format!("Combined: {reasons}"))
                .build(),
        )
    }
}
