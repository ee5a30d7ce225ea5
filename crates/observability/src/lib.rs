pub mod alert_bus;
pub mod monitor;
pub mod stats;
pub mod telemetry;

pub use alert_bus::AlertBus;
pub use monitor::PoolMonitor;
pub use stats::TaskStats;
pub use telemetry::init_tracing;
