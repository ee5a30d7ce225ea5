use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use tracing::info;

use flexpool_domain::entities::SerializableTask;
use flexpool_domain::ports::PersistenceStrategy;
use flexpool_errors::PoolResult;

/// 数据库持久化策略
///
/// 镜像保存在单表 `persistent_tasks` 中。save 在一个事务内
/// 全量替换（DELETE 后批量 INSERT），任一语句失败时整体回滚；
/// load 按 (priority, submit_time) 排序返回。
pub struct DatabasePersistenceStrategy {
    pool: SqlitePool,
}

impl DatabasePersistenceStrategy {
    /// 复用已有的数据库连接池
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 连接嵌入式数据库并完成建表
    pub async fn connect(url: &str) -> PoolResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await?;
        let strategy = Self::new(pool);
        strategy.initialize().await?;
        Ok(strategy)
    }

    /// 建表，幂等
    pub async fn initialize(&self) -> PoolResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS persistent_tasks (
                task_id TEXT NOT NULL,
                submit_time BIGINT NOT NULL,
                priority INTEGER NOT NULL,
                serialized_task BLOB NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn row_to_task(row: &sqlx::sqlite::SqliteRow) -> PoolResult<SerializableTask> {
        Ok(SerializableTask {
            task_id: row.try_get("task_id")?,
            submit_time: row.try_get("submit_time")?,
            priority: row.try_get("priority")?,
            serialized_task: row.try_get("serialized_task")?,
        })
    }
}

#[async_trait]
impl PersistenceStrategy for DatabasePersistenceStrategy {
    async fn save(&self, tasks: &[SerializableTask]) -> PoolResult<()> {
        let mut tx = self.pool.begin().await?;

        // 清除现有镜像，事务提交前对读取方不可见
        sqlx::query("DELETE FROM persistent_tasks")
            .execute(&mut *tx)
            .await?;

        for task in tasks {
            sqlx::query(
                "INSERT INTO persistent_tasks (task_id, submit_time, priority, serialized_task) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(&task.task_id)
            .bind(task.submit_time)
            .bind(task.priority)
            .bind(&task.serialized_task)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!("Persisted {} tasks to database", tasks.len());
        Ok(())
    }

    async fn load(&self) -> PoolResult<Vec<SerializableTask>> {
        let rows = sqlx::query(
            "SELECT task_id, submit_time, priority, serialized_task \
             FROM persistent_tasks ORDER BY priority, submit_time",
        )
        .fetch_all(&self.pool)
        .await?;

        let tasks = rows
            .iter()
            .map(Self::row_to_task)
            .collect::<PoolResult<Vec<_>>>()?;
        info!("Loaded {} tasks from database", tasks.len());
        Ok(tasks)
    }

    async fn cleanup(&self) -> PoolResult<()> {
        sqlx::query("DELETE FROM persistent_tasks")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
