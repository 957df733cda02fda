use inspect_metrics::{
    calculate_alert_summary, calculate_type_alert_summary, AlertSummary, CancellationToken,
    CollectorFactory, Notification, NotificationManager, ReportData, ReportWriter,
    TypeAlertSummary,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{InspectError, Result};
use crate::model::{
    STEP_ANALYZE_ALERTS, STEP_COLLECT_RESOURCES, STEP_COLLECT_SERVICES, STEP_GENERATE_REPORT,
};
use crate::registry::TaskRegistry;

/// 一次巡检的结果
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub task_id: String,
    pub report_path: PathBuf,
    pub data: ReportData,
    pub summary: AlertSummary,
    pub type_summaries: Vec<TypeAlertSummary>,
    /// 发送成功的通知渠道数
    pub notified: usize,
}

/// 巡检执行器
///
/// 负责 收集 -> 分析 -> 生成报告 -> 通知 的完整流程，并在每个阶段更新任务状态。
pub struct InspectionRunner {
    registry: Arc<TaskRegistry>,
    factory: Arc<dyn CollectorFactory>,
    writer: Arc<dyn ReportWriter>,
    notifications: NotificationManager,
}

impl InspectionRunner {
    pub fn new(
        registry: Arc<TaskRegistry>,
        factory: Arc<dyn CollectorFactory>,
        writer: Arc<dyn ReportWriter>,
    ) -> Self {
        Self {
            registry,
            factory,
            writer,
            notifications: NotificationManager::new(),
        }
    }

    pub fn with_notifications(mut self, notifications: NotificationManager) -> Self {
        self.notifications = notifications;
        self
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    /// 创建任务并立即执行
    pub async fn start(&self, name: &str, datasource: &str) -> Result<RunOutcome> {
        let task = self.registry.create_task(name, datasource).await;
        self.run(&task.id, datasource).await
    }

    /// 执行已创建的任务
    pub async fn run(&self, task_id: &str, datasource: &str) -> Result<RunOutcome> {
        let registry = &self.registry;
        let cancel = registry
            .cancellation_token(task_id)
            .await
            .unwrap_or_default();

        info!(task_id = %task_id, datasource = %datasource, "Starting inspection");
        check_cancelled(&cancel, task_id)?;

        // 1. 收集指标
        registry
            .update_task_progress(task_id, 25, STEP_COLLECT_RESOURCES)
            .await;
        let collector = match self.factory.create(datasource) {
            Ok(collector) => collector,
            Err(e) => {
                let message = e.to_string();
                registry
                    .fail_step(task_id, STEP_COLLECT_RESOURCES, &message)
                    .await;
                registry.fail_task(task_id, &message).await;
                return Err(InspectError::Client {
                    datasource: datasource.to_string(),
                    source: e,
                });
            }
        };

        let data = collector.collect_metrics(Some(&cancel)).await;
        check_cancelled(&cancel, task_id)?;
        registry.complete_step(task_id, STEP_COLLECT_RESOURCES).await;

        // 2. 服务状态与指标一起收集，这里只推进步骤
        registry
            .update_task_progress(task_id, 50, STEP_COLLECT_SERVICES)
            .await;
        registry.complete_step(task_id, STEP_COLLECT_SERVICES).await;

        // 3. 分析告警
        registry
            .update_task_progress(task_id, 75, STEP_ANALYZE_ALERTS)
            .await;
        let summary = calculate_alert_summary(&data);
        let type_summaries = calculate_type_alert_summary(&data);
        info!(
            task_id = %task_id,
            total = summary.total_metrics,
            alerts = summary.total_alerts,
            critical = summary.critical_alerts,
            warning = summary.warning_alerts,
            normal = summary.normal_metrics,
            "Alert summary"
        );
        registry.complete_step(task_id, STEP_ANALYZE_ALERTS).await;
        check_cancelled(&cancel, task_id)?;

        // 4. 生成报告
        registry
            .update_task_progress(task_id, 90, STEP_GENERATE_REPORT)
            .await;
        let report_path = match self.writer.write(&data).await {
            Ok(path) => path,
            Err(e) => {
                let message = e.to_string();
                registry
                    .fail_step(task_id, STEP_GENERATE_REPORT, &message)
                    .await;
                registry.fail_task(task_id, &message).await;
                return Err(InspectError::Report(e));
            }
        };
        registry.complete_step(task_id, STEP_GENERATE_REPORT).await;
        check_cancelled(&cancel, task_id)?;
        registry
            .complete_task(task_id, &report_path.to_string_lossy())
            .await;

        // 5. 通知失败不影响任务结果
        let notification = Notification {
            report_path: report_path.clone(),
            project_name: data.project.clone(),
            datasource: data.datasource.clone(),
            summary,
            type_summaries: type_summaries.clone(),
        };
        let notified = self.notifications.broadcast(&notification).await;

        info!(task_id = %task_id, report = %report_path.display(), notified, "Inspection finished");
        Ok(RunOutcome {
            task_id: task_id.to_string(),
            report_path,
            data,
            summary,
            type_summaries,
            notified,
        })
    }
}

fn check_cancelled(cancel: &CancellationToken, task_id: &str) -> Result<()> {
    if cancel.is_cancelled() {
        warn!(task_id = %task_id, "Inspection cancelled");
        return Err(InspectError::Cancelled(task_id.to_string()));
    }
    Ok(())
}
