//! 优先级持久化队列
//!
//! 有界最小堆，按 (priority, submit_time) 出队。容量为原子字段，
//! 读取无锁，调整与入队通过堆锁互斥。后台快照任务每分钟将队列
//! 内容投影为可序列化任务并交给持久化策略，另在每 100 次成功
//! 入队后触发一次机会快照。快照失败只记录日志，不影响调用方。

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tokio::sync::{mpsc, watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use flexpool_domain::entities::{SerializableTask, TrackedTask};
use flexpool_domain::ports::PersistenceStrategy;

const SNAPSHOT_INTERVAL: Duration = Duration::from_secs(60);
const SNAPSHOT_EVERY_INSERTS: u64 = 100;
const SNAPSHOT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

pub struct PriorityTaskQueue {
    heap: Mutex<BinaryHeap<Reverse<TrackedTask>>>,
    /// 队列容量，读无锁；写入经由堆锁串行化
    capacity: AtomicUsize,
    /// 当前大小的无锁镜像，供监控热路径读取
    size: AtomicUsize,
    notify: Notify,
    shutdown: AtomicBool,
    insert_count: AtomicU64,
    persistence: Arc<dyn PersistenceStrategy>,
    snapshot_trigger: mpsc::Sender<()>,
    snapshot_trigger_rx: Mutex<Option<mpsc::Receiver<()>>>,
    snapshot_shutdown: watch::Sender<bool>,
    snapshot_handle: Mutex<Option<JoinHandle<()>>>,
}

impl PriorityTaskQueue {
    pub fn new(capacity: usize, persistence: Arc<dyn PersistenceStrategy>) -> Arc<Self> {
        let (trigger_tx, trigger_rx) = mpsc::channel(1);
        let (snapshot_shutdown, _) = watch::channel(false);
        Arc::new(Self {
            heap: Mutex::new(BinaryHeap::with_capacity(capacity.max(16))),
            capacity: AtomicUsize::new(capacity),
            size: AtomicUsize::new(0),
            notify: Notify::new(),
            shutdown: AtomicBool::new(false),
            insert_count: AtomicU64::new(0),
            persistence,
            snapshot_trigger: trigger_tx,
            snapshot_trigger_rx: Mutex::new(Some(trigger_rx)),
            snapshot_shutdown,
            snapshot_handle: Mutex::new(None),
        })
    }

    /// 启动后台快照任务（持久化启用时由池调用一次）
    pub fn start_snapshotter(self: &Arc<Self>) {
        let trigger_rx = self
            .snapshot_trigger_rx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        let Some(trigger_rx) = trigger_rx else {
            return;
        };
        let shutdown_rx = self.snapshot_shutdown.subscribe();
        let handle = tokio::spawn(snapshot_loop(
            Arc::downgrade(self),
            trigger_rx,
            shutdown_rx,
        ));
        *self
            .snapshot_handle
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(handle);
    }

    /// 非阻塞入队，队列满或已关闭时返回 false
    pub fn offer(&self, task: TrackedTask) -> bool {
        if self.shutdown.load(Ordering::Acquire) {
            return false;
        }
        {
            let mut heap = self.heap.lock().unwrap_or_else(|e| e.into_inner());
            if heap.len() >= self.capacity.load(Ordering::Relaxed) {
                return false;
            }
            heap.push(Reverse(task));
            self.size.store(heap.len(), Ordering::Relaxed);
        }
        self.notify.notify_one();

        let inserted = self.insert_count.fetch_add(1, Ordering::Relaxed) + 1;
        if inserted % SNAPSHOT_EVERY_INSERTS == 0 {
            // 通道已满说明快照在途，跳过即可
            let _ = self.snapshot_trigger.try_send(());
        }
        true
    }

    /// 阻塞出队
    ///
    /// 队列为空时挂起。关闭后剩余任务仍会依次弹出，
    /// 排空之后返回 None。
    pub async fn take(&self) -> Option<TrackedTask> {
        loop {
            let notified = self.notify.notified();
            if let Some(task) = self.try_take() {
                return Some(task);
            }
            if self.shutdown.load(Ordering::Acquire) {
                return None;
            }
            notified.await;
        }
    }

    /// 非阻塞出队
    pub fn try_take(&self) -> Option<TrackedTask> {
        let mut heap = self.heap.lock().unwrap_or_else(|e| e.into_inner());
        let task = heap.pop().map(|Reverse(task)| task);
        self.size.store(heap.len(), Ordering::Relaxed);
        task
    }

    pub fn size(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }

    pub fn capacity(&self) -> usize {
        self.capacity.load(Ordering::Relaxed)
    }

    pub fn remaining_capacity(&self) -> usize {
        self.capacity().saturating_sub(self.size())
    }

    /// 运行期调整容量，收缩时已入队任务不受影响
    pub fn set_capacity(&self, capacity: usize) {
        let _guard = self.heap.lock().unwrap_or_else(|e| e.into_inner());
        self.capacity.store(capacity.max(1), Ordering::Relaxed);
        debug!("Queue capacity set to {}", capacity.max(1));
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// 同步关闭入口：拒绝新任务并唤醒所有等待者。
    /// 不执行最终快照，供 Drop 等无法 await 的路径使用。
    pub fn close(&self) {
        self.shutdown.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    /// 关闭队列：执行最终快照，再在有界等待内停掉快照任务
    pub async fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }
        self.notify.notify_waiters();

        self.persist_now().await;

        let _ = self.snapshot_shutdown.send(true);
        let handle = self
            .snapshot_handle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(mut handle) = handle {
            if timeout(SNAPSHOT_STOP_TIMEOUT, &mut handle).await.is_err() {
                warn!("Queue snapshotter did not stop in time, aborting");
                handle.abort();
            }
        }
    }

    /// 将持久化镜像中的任务重新入队，返回恢复数量
    pub fn restore(&self, tasks: Vec<SerializableTask>) -> usize {
        let mut restored = 0;
        for serialized in tasks {
            let task_id = serialized.task_id.clone();
            match serialized.into_tracked() {
                Ok(task) => {
                    if self.offer(task) {
                        restored += 1;
                    } else {
                        warn!("恢复任务时队列已满，丢弃 {task_id}");
                    }
                }
                Err(e) => warn!("恢复任务 {task_id} 失败: {e}"),
            }
        }
        if restored > 0 {
            info!("Restored {restored} persisted tasks into queue");
        }
        restored
    }

    /// 立即持久化当前队列内容，失败仅记录日志
    pub async fn persist_now(&self) {
        let tasks = self.snapshot_tasks();
        if let Err(e) = self.persistence.save(&tasks).await {
            error!("Failed to persist task queue: {e}");
        }
    }

    /// 按出队顺序投影当前队列内容
    fn snapshot_tasks(&self) -> Vec<SerializableTask> {
        let mut entries: Vec<TrackedTask> = {
            let heap = self.heap.lock().unwrap_or_else(|e| e.into_inner());
            heap.iter().map(|Reverse(task)| task.clone()).collect()
        };
        entries.sort();

        entries
            .iter()
            .filter_map(|task| match SerializableTask::from_tracked(task) {
                Ok(serialized) => Some(serialized),
                Err(e) => {
                    warn!("跳过无法序列化的任务 {}: {e}", task.task_id());
                    None
                }
            })
            .collect()
    }
}

async fn snapshot_loop(
    queue: Weak<PriorityTaskQueue>,
    mut trigger_rx: mpsc::Receiver<()>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = interval(SNAPSHOT_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // interval 的首个 tick 立即完成，消费掉以保持整分钟节奏
    ticker.tick().await;

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                let Some(queue) = queue.upgrade() else { break };
                queue.persist_now().await;
            }
            triggered = trigger_rx.recv() => {
                match triggered {
                    Some(()) => {
                        let Some(queue) = queue.upgrade() else { break };
                        queue.persist_now().await;
                    }
                    None => break,
                }
            }
        }
    }
    debug!(task = "PersistentQueue-Scheduler", "Snapshot loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use flexpool_domain::entities::TaskPayload;
    use flexpool_errors::PoolResult;
    use flexpool_infrastructure::NoOpPersistenceStrategy;
    use std::sync::Mutex as StdMutex;

    fn task(priority: i32, submit_time_ms: i64, id: &str) -> TrackedTask {
        TrackedTask::with_identity(
            TaskPayload::bare("noop"),
            priority,
            id.to_string(),
            submit_time_ms,
        )
    }

    fn queue(capacity: usize) -> Arc<PriorityTaskQueue> {
        PriorityTaskQueue::new(capacity, Arc::new(NoOpPersistenceStrategy::new()))
    }

    #[tokio::test]
    async fn test_offer_rejects_when_full() {
        let queue = queue(2);
        assert!(queue.offer(task(5, 1, "a")));
        assert!(queue.offer(task(5, 2, "b")));
        assert!(!queue.offer(task(5, 3, "c")));
        assert_eq!(queue.size(), 2);
        assert_eq!(queue.remaining_capacity(), 0);
    }

    #[tokio::test]
    async fn test_take_returns_priority_order() {
        let queue = queue(10);
        queue.offer(task(9, 1, "slow"));
        queue.offer(task(1, 2, "urgent"));
        queue.offer(task(5, 3, "normal"));

        assert_eq!(queue.take().await.unwrap().task_id(), "urgent");
        assert_eq!(queue.take().await.unwrap().task_id(), "normal");
        assert_eq!(queue.take().await.unwrap().task_id(), "slow");
    }

    #[tokio::test]
    async fn test_fifo_within_priority() {
        let queue = queue(10);
        queue.offer(task(5, 100, "first"));
        queue.offer(task(5, 200, "second"));
        queue.offer(task(5, 300, "third"));

        assert_eq!(queue.take().await.unwrap().task_id(), "first");
        assert_eq!(queue.take().await.unwrap().task_id(), "second");
        assert_eq!(queue.take().await.unwrap().task_id(), "third");
    }

    #[tokio::test]
    async fn test_take_blocks_until_offer() {
        let queue = queue(10);
        let waiter = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.take().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        queue.offer(task(5, 1, "wake"));
        let taken = timeout(Duration::from_millis(200), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(taken.unwrap().task_id(), "wake");
    }

    #[tokio::test]
    async fn test_shutdown_drains_then_returns_none() {
        let queue = queue(10);
        queue.offer(task(5, 1, "leftover"));
        queue.shutdown().await;

        assert!(!queue.offer(task(5, 2, "late")));
        assert_eq!(queue.take().await.unwrap().task_id(), "leftover");
        assert!(queue.take().await.is_none());
    }

    #[tokio::test]
    async fn test_set_capacity_allows_more_offers() {
        let queue = queue(1);
        assert!(queue.offer(task(5, 1, "a")));
        assert!(!queue.offer(task(5, 2, "b")));

        queue.set_capacity(3);
        assert_eq!(queue.capacity(), 3);
        assert!(queue.offer(task(5, 2, "b")));
        assert!(queue.offer(task(5, 3, "c")));
    }

    struct RecordingStrategy {
        saved: StdMutex<Vec<Vec<SerializableTask>>>,
    }

    #[async_trait::async_trait]
    impl PersistenceStrategy for RecordingStrategy {
        async fn save(&self, tasks: &[SerializableTask]) -> PoolResult<()> {
            self.saved.lock().unwrap().push(tasks.to_vec());
            Ok(())
        }
        async fn load(&self) -> PoolResult<Vec<SerializableTask>> {
            Ok(Vec::new())
        }
        async fn cleanup(&self) -> PoolResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_shutdown_takes_final_snapshot_in_order() {
        let strategy = Arc::new(RecordingStrategy {
            saved: StdMutex::new(Vec::new()),
        });
        let queue = PriorityTaskQueue::new(10, strategy.clone());
        queue.start_snapshotter();

        queue.offer(task(5, 200, "later"));
        queue.offer(task(1, 100, "urgent"));
        queue.shutdown().await;

        let saved = strategy.saved.lock().unwrap();
        let last = saved.last().unwrap();
        let ids: Vec<&str> = last.iter().map(|t| t.task_id.as_str()).collect();
        assert_eq!(ids, vec!["urgent", "later"]);
    }

    #[tokio::test]
    async fn test_opportunistic_snapshot_after_100_inserts() {
        let strategy = Arc::new(RecordingStrategy {
            saved: StdMutex::new(Vec::new()),
        });
        let queue = PriorityTaskQueue::new(200, strategy.clone());
        queue.start_snapshotter();

        for i in 0..100 {
            queue.offer(task(5, i, &format!("t{i}")));
        }
        // 给快照任务一点处理时间
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(
            !strategy.saved.lock().unwrap().is_empty(),
            "第 100 次入队应触发机会快照"
        );
        queue.shutdown().await;
    }

    #[tokio::test]
    async fn test_restore_requeues_persisted_tasks() {
        let queue = queue(10);
        let tasks = vec![
            SerializableTask::from_tracked(&task(5, 2, "b")).unwrap(),
            SerializableTask::from_tracked(&task(1, 1, "a")).unwrap(),
        ];
        assert_eq!(queue.restore(tasks), 2);
        assert_eq!(queue.take().await.unwrap().task_id(), "a");
        assert_eq!(queue.take().await.unwrap().task_id(), "b");
    }
}
