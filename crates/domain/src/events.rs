use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// 告警级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertLevel {
    Info,
    Warning,
    Error,
    Critical,
}

impl AlertLevel {
    pub const ALL: [AlertLevel; 4] = [
        AlertLevel::Info,
        AlertLevel::Warning,
        AlertLevel::Error,
        AlertLevel::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Info => "INFO",
            AlertLevel::Warning => "WARNING",
            AlertLevel::Error => "ERROR",
            AlertLevel::Critical => "CRITICAL",
        }
    }
}

/// 告警消息类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertKind {
    Scaling,
    Monitoring,
}

impl AlertKind {
    pub const ALL: [AlertKind; 2] = [AlertKind::Scaling, AlertKind::Monitoring];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Scaling => "SCALING",
            AlertKind::Monitoring => "MONITORING",
        }
    }
}

/// 告警元数据值
///
/// 元数据是小型键值结构，值限定为字符串、数字或布尔，
/// 不引入开放的 any 类型。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl From<&str> for MetadataValue {
    fn from(v: &str) -> Self {
        MetadataValue::Str(v.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(v: String) -> Self {
        MetadataValue::Str(v)
    }
}

impl From<i64> for MetadataValue {
    fn from(v: i64) -> Self {
        MetadataValue::Int(v)
    }
}

impl From<i32> for MetadataValue {
    fn from(v: i32) -> Self {
        MetadataValue::Int(v as i64)
    }
}

impl From<u64> for MetadataValue {
    fn from(v: u64) -> Self {
        MetadataValue::Int(v as i64)
    }
}

impl From<usize> for MetadataValue {
    fn from(v: usize) -> Self {
        MetadataValue::Int(v as i64)
    }
}

impl From<f64> for MetadataValue {
    fn from(v: f64) -> Self {
        MetadataValue::Float(v)
    }
}

impl From<bool> for MetadataValue {
    fn from(v: bool) -> Self {
        MetadataValue::Bool(v)
    }
}

impl MetadataValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// 告警事件可识别的元数据键
pub mod metadata_keys {
    pub const POOL_NAME: &str = "poolName";
    pub const ACTIVE_THREADS: &str = "activeThreads";
    pub const POOL_SIZE: &str = "poolSize";
    pub const QUEUE_SIZE: &str = "queueSize";
    pub const OLD_CORE_SIZE: &str = "oldCoreSize";
    pub const NEW_CORE_SIZE: &str = "newCoreSize";
    pub const OLD_MAX_SIZE: &str = "oldMaxSize";
    pub const NEW_MAX_SIZE: &str = "newMaxSize";
    pub const OLD_KEEP_ALIVE: &str = "oldKeepAlive";
    pub const NEW_KEEP_ALIVE: &str = "newKeepAlive";
    pub const REASON: &str = "reason";
    pub const ERROR: &str = "error";
}

/// 告警元数据
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertMetadata(BTreeMap<String, MetadataValue>);

impl AlertMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<K: Into<String>, V: Into<MetadataValue>>(&mut self, key: K, value: V) {
        self.0.insert(key.into(), value.into());
    }

    /// 链式写入，便于构造告警负载
    pub fn with<K: Into<String>, V: Into<MetadataValue>>(mut self, key: K, value: V) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(MetadataValue::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// 告警事件
///
/// 发布后不可变，元数据在构造时复制。
#[derive(Debug, Clone, Serialize)]
pub struct AlertEvent {
    message: String,
    level: AlertLevel,
    kind: AlertKind,
    timestamp_ms: i64,
    metadata: AlertMetadata,
}

impl AlertEvent {
    pub fn new<S: Into<String>>(
        message: S,
        level: AlertLevel,
        kind: AlertKind,
        metadata: AlertMetadata,
    ) -> Self {
        Self {
            message: message.into(),
            level,
            kind,
            timestamp_ms: Utc::now().timestamp_millis(),
            metadata,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn level(&self) -> AlertLevel {
        self.level
    }

    pub fn kind(&self) -> AlertKind {
        self.kind
    }

    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }

    pub fn metadata(&self) -> &AlertMetadata {
        &self.metadata
    }

    /// 事件标记的池名（若有）
    pub fn pool_name(&self) -> Option<&str> {
        self.metadata.get_str(metadata_keys::POOL_NAME)
    }

    /// 事件的 JSON 形式，供外部落地的监听器使用
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "timestamp": self.timestamp_ms,
            "level": self.level.as_str(),
            "kind": self.kind.as_str(),
            "message": self.message,
            "metadata": self.metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(AlertLevel::Info < AlertLevel::Warning);
        assert!(AlertLevel::Warning < AlertLevel::Error);
        assert!(AlertLevel::Error < AlertLevel::Critical);
    }

    #[test]
    fn test_metadata_typed_values() {
        let meta = AlertMetadata::new()
            .with(metadata_keys::POOL_NAME, "orders")
            .with(metadata_keys::ACTIVE_THREADS, 4usize)
            .with(metadata_keys::REASON, "High load detected")
            .with("loaded", true);

        assert_eq!(meta.get_str(metadata_keys::POOL_NAME), Some("orders"));
        assert_eq!(
            meta.get(metadata_keys::ACTIVE_THREADS),
            Some(&MetadataValue::Int(4))
        );
        assert_eq!(meta.get("loaded"), Some(&MetadataValue::Bool(true)));
        assert_eq!(meta.len(), 4);
    }

    #[test]
    fn test_event_json_shape() {
        let meta = AlertMetadata::new().with(metadata_keys::POOL_NAME, "orders");
        let event = AlertEvent::new(
            "Queue size (12) exceeded threshold (10)",
            AlertLevel::Warning,
            AlertKind::Monitoring,
            meta,
        );

        let json = event.to_json();
        assert_eq!(json["level"], "WARNING");
        assert_eq!(json["kind"], "MONITORING");
        assert_eq!(json["metadata"]["poolName"], "orders");
        assert!(json["timestamp"].as_i64().unwrap() > 0);
    }

    #[test]
    fn test_pool_name_helper() {
        let event = AlertEvent::new(
            "msg",
            AlertLevel::Info,
            AlertKind::Scaling,
            AlertMetadata::new(),
        );
        assert_eq!(event.pool_name(), None);
    }
}
