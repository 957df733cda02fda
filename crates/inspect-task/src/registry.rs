use chrono::{DateTime, Duration, Utc};
use inspect_metrics::CancellationToken;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::model::{InspectionTask, LogKind, TaskStatus, CANCELLED_MESSAGE};

/// 任务保留时长
pub const TASK_RETENTION_HOURS: i64 = 24;

/// 巡检任务注册表
///
/// 所有写操作在同一把写锁下串行执行，读操作可以并发。
/// 锁内不做任何 I/O；对未知任务 ID 的操作静默忽略。
pub struct TaskRegistry {
    tasks: RwLock<HashMap<String, InspectionTask>>,
    next_id: AtomicU64,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// 创建巡检任务
    ///
    /// 新任务状态为 pending，进度 0，包含 4 个待执行步骤和 1 条创建日志。
    pub async fn create_task(&self, name: &str, datasource: &str) -> InspectionTask {
        let seq = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("task_{}_{}", Utc::now().format("%Y%m%d_%H%M%S"), seq);
        let task = InspectionTask::new(id.clone(), name.to_string(), datasource.to_string());

        let mut tasks = self.tasks.write().await;
        tasks.insert(id.clone(), task.clone());

        info!(task_id = %id, name = %name, datasource = %datasource, "Inspection task created");
        task
    }

    pub async fn get_task(&self, id: &str) -> Option<InspectionTask> {
        let tasks = self.tasks.read().await;
        tasks.get(id).cloned()
    }

    /// 所有任务快照，按开始时间排序
    pub async fn get_all_tasks(&self) -> Vec<InspectionTask> {
        let tasks = self.tasks.read().await;
        sorted(tasks.values().cloned().collect())
    }

    /// 运行中的任务快照
    pub async fn get_running_tasks(&self) -> Vec<InspectionTask> {
        let tasks = self.tasks.read().await;
        sorted(
            tasks
                .values()
                .filter(|t| t.status == TaskStatus::Running)
                .cloned()
                .collect(),
        )
    }

    pub async fn task_count(&self) -> usize {
        self.tasks.read().await.len()
    }

    /// 任务的取消令牌，供执行流程在安全点检查
    pub async fn cancellation_token(&self, id: &str) -> Option<CancellationToken> {
        let tasks = self.tasks.read().await;
        tasks.get(id).map(InspectionTask::cancellation_token)
    }

    /// 更新任务进度
    ///
    /// 进度只增不减，超过 100 按 100 处理。pending 任务进入 running；
    /// 第一个仍处于 pending 的同名步骤进入 running。
    pub async fn update_task_progress(&self, id: &str, progress: u8, step_name: &str) {
        let mut tasks = self.tasks.write().await;
        let Some(task) = tasks.get_mut(id) else {
            debug!(task_id = %id, "Progress update for unknown task ignored");
            return;
        };

        task.progress = task.progress.max(progress.min(100));

        if task.status == TaskStatus::Pending {
            task.status = TaskStatus::Running;
        }

        if let Some(step) = task
            .steps
            .iter_mut()
            .find(|s| s.name == step_name && s.status == TaskStatus::Pending)
        {
            step.status = TaskStatus::Running;
            step.start_time = Some(Utc::now());
        }

        task.push_log(LogKind::Info, step_name);
        debug!(task_id = %id, progress = task.progress, step = %step_name, "Task progress updated");
    }

    /// 完成步骤
    pub async fn complete_step(&self, id: &str, step_name: &str) {
        let mut tasks = self.tasks.write().await;
        let Some(task) = tasks.get_mut(id) else {
            debug!(task_id = %id, "Step completion for unknown task ignored");
            return;
        };

        if let Some(step) = task.step_mut(step_name) {
            step.status = TaskStatus::Completed;
            step.end_time = Some(Utc::now());
        }

        task.push_log(LogKind::Success, format!("{} completed", step_name));
    }

    /// 步骤失败
    pub async fn fail_step(&self, id: &str, step_name: &str, error: &str) {
        let mut tasks = self.tasks.write().await;
        let Some(task) = tasks.get_mut(id) else {
            debug!(task_id = %id, "Step failure for unknown task ignored");
            return;
        };

        if let Some(step) = task.step_mut(step_name) {
            step.status = TaskStatus::Failed;
            step.end_time = Some(Utc::now());
            step.error = Some(error.to_string());
        }

        task.push_log(LogKind::Error, format!("{} failed: {}", step_name, error));
    }

    /// 完成任务
    ///
    /// 已失败（包括已取消）的任务不会再变为 completed。
    pub async fn complete_task(&self, id: &str, report_path: &str) {
        let mut tasks = self.tasks.write().await;
        let Some(task) = tasks.get_mut(id) else {
            debug!(task_id = %id, "Completion of unknown task ignored");
            return;
        };

        if task.status == TaskStatus::Failed {
            debug!(task_id = %id, "Completion of failed task ignored");
            return;
        }

        let now = Utc::now();
        task.status = TaskStatus::Completed;
        task.progress = 100;
        task.end_time = Some(now);
        task.report_path = Some(report_path.to_string());
        task.push_log(LogKind::Success, "inspection task completed");

        debug!(
            task_id = %id,
            elapsed_ms = (now - task.start_time).num_milliseconds(),
            report = %report_path,
            "Task completed"
        );
    }

    /// 任务失败
    ///
    /// 已结束的任务保持原状态，取消原因不会被覆盖。
    pub async fn fail_task(&self, id: &str, error: &str) {
        let mut tasks = self.tasks.write().await;
        let Some(task) = tasks.get_mut(id) else {
            debug!(task_id = %id, "Failure of unknown task ignored");
            return;
        };

        if task.status.is_finished() {
            debug!(task_id = %id, status = ?task.status, error = %error, "Failure of finished task ignored");
            return;
        }

        task.status = TaskStatus::Failed;
        task.error = Some(error.to_string());
        task.end_time = Some(Utc::now());
        task.push_log(LogKind::Error, format!("inspection task failed: {}", error));

        info!(task_id = %id, error = %error, "Task failed");
    }

    /// 取消任务
    ///
    /// 无论当前状态如何，任务都被标记为 failed。正在执行的查询不会被打断。
    pub async fn cancel_task(&self, id: &str) {
        let mut tasks = self.tasks.write().await;
        let Some(task) = tasks.get_mut(id) else {
            debug!(task_id = %id, "Cancellation of unknown task ignored");
            return;
        };

        task.cancel.cancel();
        task.status = TaskStatus::Failed;
        task.error = Some(CANCELLED_MESSAGE.to_string());
        task.end_time = Some(Utc::now());
        task.push_log(LogKind::Error, "inspection task cancelled");

        info!(task_id = %id, "Task cancelled");
    }

    /// 清理开始时间超过 24 小时的任务
    pub async fn cleanup_old_tasks(&self) -> usize {
        self.cleanup_old_tasks_at(Utc::now()).await
    }

    /// 以给定时间为基准清理过期任务，返回清理数量
    pub async fn cleanup_old_tasks_at(&self, now: DateTime<Utc>) -> usize {
        let retention = Duration::hours(TASK_RETENTION_HOURS);
        let mut tasks = self.tasks.write().await;
        let before = tasks.len();

        tasks.retain(|_, task| now - task.start_time <= retention);

        let removed = before - tasks.len();
        if removed > 0 {
            info!(removed, remaining = tasks.len(), "Cleaned up old tasks");
        }
        removed
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn sorted(mut tasks: Vec<InspectionTask>) -> Vec<InspectionTask> {
    tasks.sort_by(|a, b| a.start_time.cmp(&b.start_time).then_with(|| a.id.cmp(&b.id)));
    tasks
}

/// 定期清理过期任务
///
/// 注册表本身不做调度，由调用方决定是否启动。
pub fn spawn_periodic_cleanup(
    registry: Arc<TaskRegistry>,
    every: std::time::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            registry.cleanup_old_tasks().await;
        }
    })
}
