use std::cmp::Ordering;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use flexpool_errors::PoolResult;

/// 任务载荷
///
/// 工作单元以数据形式描述：`task_type` 指向注册的执行器，
/// `parameters` 携带执行参数。载荷整体可序列化，因此队列镜像
/// 在重启后可以完整重建。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskPayload {
    pub task_type: String,
    pub parameters: serde_json::Value,
}

impl TaskPayload {
    pub fn new<S: Into<String>>(task_type: S, parameters: serde_json::Value) -> Self {
        Self {
            task_type: task_type.into(),
            parameters,
        }
    }

    /// 不带参数的载荷
    pub fn bare<S: Into<String>>(task_type: S) -> Self {
        Self::new(task_type, serde_json::Value::Null)
    }
}

/// 带跟踪信息的任务
///
/// 构造后不可变。排序键为 (priority, submit_time_ms, task_id)，
/// priority 数值越小越优先，同优先级按提交时间先进先出。
#[derive(Debug, Clone)]
pub struct TrackedTask {
    task_id: String,
    submit_time_ms: i64,
    priority: i32,
    payload: TaskPayload,
}

impl TrackedTask {
    pub fn new(payload: TaskPayload, priority: i32) -> Self {
        Self::with_identity(
            payload,
            priority,
            Uuid::new_v4().to_string(),
            Utc::now().timestamp_millis(),
        )
    }

    /// 以既有身份重建任务，持久化恢复路径使用
    pub fn with_identity(
        payload: TaskPayload,
        priority: i32,
        task_id: String,
        submit_time_ms: i64,
    ) -> Self {
        Self {
            task_id,
            submit_time_ms,
            priority,
            payload,
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn submit_time_ms(&self) -> i64 {
        self.submit_time_ms
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn payload(&self) -> &TaskPayload {
        &self.payload
    }

    /// 自提交起经过的等待时间（毫秒）
    pub fn wait_time_since(&self, now_ms: i64) -> i64 {
        now_ms - self.submit_time_ms
    }
}

impl PartialEq for TrackedTask {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority
            && self.submit_time_ms == other.submit_time_ms
            && self.task_id == other.task_id
    }
}

impl Eq for TrackedTask {}

impl PartialOrd for TrackedTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TrackedTask {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| self.submit_time_ms.cmp(&other.submit_time_ms))
            .then_with(|| self.task_id.cmp(&other.task_id))
    }
}

/// 可序列化任务投影
///
/// 仅由持久化路径产生，`serialized_task` 为载荷的 JSON 字节。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializableTask {
    pub task_id: String,
    pub submit_time: i64,
    pub priority: i32,
    pub serialized_task: Vec<u8>,
}

impl SerializableTask {
    pub fn from_tracked(task: &TrackedTask) -> PoolResult<Self> {
        Ok(Self {
            task_id: task.task_id().to_string(),
            submit_time: task.submit_time_ms(),
            priority: task.priority(),
            serialized_task: serde_json::to_vec(task.payload())?,
        })
    }

    pub fn into_tracked(self) -> PoolResult<TrackedTask> {
        let payload: TaskPayload = serde_json::from_slice(&self.serialized_task)?;
        Ok(TrackedTask::with_identity(
            payload,
            self.priority,
            self.task_id,
            self.submit_time,
        ))
    }
}
