use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),
    #[error("持久化错误: {0}")]
    Persistence(String),
    #[error("序列化错误: {0}")]
    Serialization(String),
    #[error("配置错误: {0}")]
    Configuration(String),
    #[error("任务被拒绝: {task_id}")]
    TaskRejected { task_id: String },
    #[error("未找到任务类型对应的执行器: {task_type}")]
    ExecutorNotFound { task_type: String },
    #[error("任务执行错误: {0}")]
    TaskExecution(String),
    #[error("扩缩容错误: {0}")]
    Scaling(String),
    #[error("工作池已关闭")]
    PoolShutdown,
    #[error("内部错误: {0}")]
    Internal(String),
}

pub type PoolResult<T> = Result<T, PoolError>;

impl PoolError {
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }
    pub fn persistence<S: Into<String>>(msg: S) -> Self {
        Self::Persistence(msg.into())
    }
    pub fn scaling<S: Into<String>>(msg: S) -> Self {
        Self::Scaling(msg.into())
    }
    pub fn task_rejected<S: Into<String>>(task_id: S) -> Self {
        Self::TaskRejected {
            task_id: task_id.into(),
        }
    }
    /// 判断错误是否可以通过重试恢复
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PoolError::Database(_) | PoolError::Persistence(_) | PoolError::Scaling(_)
        )
    }
    /// 判断错误是否为提交方可见的拒绝
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            PoolError::TaskRejected { .. } | PoolError::PoolShutdown
        )
    }
}

impl From<serde_json::Error> for PoolError {
    fn from(err: serde_json::Error) -> Self {
        PoolError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for PoolError {
    fn from(err: anyhow::Error) -> Self {
        PoolError::Internal(err.to_string())
    }
}
