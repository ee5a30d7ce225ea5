//! 执行器注册表
//!
//! 工作池按任务载荷的 `task_type` 查找注册的执行器。
//! `FnExecutor` 将异步闭包适配为执行器，便于宿主快速接入。

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use flexpool_domain::entities::{TaskPayload, TrackedTask};
use flexpool_domain::ports::TaskExecutor;
use flexpool_errors::PoolResult;

/// 执行器注册表，构建完成后不可变
#[derive(Default)]
pub struct ExecutorRegistry {
    executors: HashMap<String, Arc<dyn TaskExecutor>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册执行器，键为执行器名称；同名注册后者覆盖前者
    pub fn register(&mut self, executor: Arc<dyn TaskExecutor>) {
        let name = executor.name().to_string();
        info!("注册任务执行器: {name}");
        self.executors.insert(name, executor);
    }

    pub fn get(&self, task_type: &str) -> Option<Arc<dyn TaskExecutor>> {
        self.executors.get(task_type).cloned()
    }

    pub fn contains(&self, task_type: &str) -> bool {
        self.executors.contains_key(task_type)
    }

    pub fn names(&self) -> Vec<String> {
        self.executors.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.executors.is_empty()
    }
}

type BoxedTaskFn = Box<
    dyn Fn(TaskPayload) -> Pin<Box<dyn Future<Output = PoolResult<()>> + Send>> + Send + Sync,
>;

/// 闭包执行器
pub struct FnExecutor {
    name: String,
    handler: BoxedTaskFn,
}

impl FnExecutor {
    pub fn new<S, F, Fut>(name: S, handler: F) -> Self
    where
        S: Into<String>,
        F: Fn(TaskPayload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = PoolResult<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            handler: Box::new(move |payload| Box::pin(handler(payload))),
        }
    }
}

#[async_trait]
impl TaskExecutor for FnExecutor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, task: &TrackedTask) -> PoolResult<()> {
        (self.handler)(task.payload().clone()).await
    }
}
