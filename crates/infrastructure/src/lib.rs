//! FlexPool 基础设施层
//!
//! 提供队列镜像的三种持久化策略：空实现、文件镜像与嵌入式数据库。

pub mod persistence;

pub use persistence::database::DatabasePersistenceStrategy;
pub use persistence::file::FilePersistenceStrategy;
pub use persistence::noop::NoOpPersistenceStrategy;
