pub mod alert;
pub mod monitoring;
pub mod persistence;
pub mod pool;
pub mod scaling;
