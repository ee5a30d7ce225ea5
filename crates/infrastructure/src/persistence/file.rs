use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::info;

use flexpool_domain::entities::SerializableTask;
use flexpool_domain::ports::PersistenceStrategy;
use flexpool_errors::{PoolError, PoolResult};

/// 文件系统持久化策略
///
/// 队列镜像写入单个 JSON 文件。保存时先写临时文件再原子改名，
/// 崩溃后要么读到旧镜像要么读到新镜像。
#[derive(Debug, Clone)]
pub struct FilePersistenceStrategy {
    file_path: PathBuf,
}

impl FilePersistenceStrategy {
    pub fn new<P: Into<PathBuf>>(file_path: P) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    fn temp_path(&self) -> PathBuf {
        let mut path = self.file_path.clone().into_os_string();
        path.push(".tmp");
        PathBuf::from(path)
    }
}

#[async_trait]
impl PersistenceStrategy for FilePersistenceStrategy {
    async fn save(&self, tasks: &[SerializableTask]) -> PoolResult<()> {
        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    PoolError::Persistence(format!(
                        "无法创建持久化目录 {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }

        let bytes = serde_json::to_vec(tasks)?;
        let temp_path = self.temp_path();
        fs::write(&temp_path, &bytes).await.map_err(|e| {
            PoolError::Persistence(format!("写入临时镜像失败 {}: {e}", temp_path.display()))
        })?;
        fs::rename(&temp_path, &self.file_path).await.map_err(|e| {
            PoolError::Persistence(format!(
                "替换镜像失败 {}: {e}",
                self.file_path.display()
            ))
        })?;

        info!(
            "Persisted {} tasks to {}",
            tasks.len(),
            self.file_path.display()
        );
        Ok(())
    }

    async fn load(&self) -> PoolResult<Vec<SerializableTask>> {
        let bytes = match fs::read(&self.file_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(PoolError::Persistence(format!(
                    "读取镜像失败 {}: {e}",
                    self.file_path.display()
                )))
            }
        };

        let tasks: Vec<SerializableTask> = serde_json::from_slice(&bytes)?;
        info!(
            "Loaded {} tasks from {}",
            tasks.len(),
            self.file_path.display()
        );
        Ok(tasks)
    }

    async fn cleanup(&self) -> PoolResult<()> {
        match fs::remove_file(&self.file_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PoolError::Persistence(format!(
                "删除镜像失败 {}: {e}",
                self.file_path.display()
            ))),
        }
    }
}
