use chrono::{DateTime, Duration, Utc};
use inspect_metrics::CancellationToken;
use serde::{Deserialize, Serialize};

/// 收集系统资源数据
pub const STEP_COLLECT_RESOURCES: &str = "collect resources";
/// 收集服务状态
pub const STEP_COLLECT_SERVICES: &str = "collect service status";
/// 分析告警信息
pub const STEP_ANALYZE_ALERTS: &str = "analyze alerts";
/// 生成巡检报告
pub const STEP_GENERATE_REPORT: &str = "generate report";

/// 取消任务时记录的错误信息
pub const CANCELLED_MESSAGE: &str = "task cancelled";

/// 任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    /// 是否已经结束
    pub fn is_finished(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// 任务步骤
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStep {
    pub name: String,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub description: String,
}

impl TaskStep {
    fn pending(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            status: TaskStatus::Pending,
            start_time: None,
            end_time: None,
            error: None,
            description: description.to_string(),
        }
    }
}

/// 日志类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Info,
    Success,
    Error,
}

/// 任务日志
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskLog {
    pub time: DateTime<Utc>,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: LogKind,
}

/// 巡检任务
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionTask {
    pub id: String,
    pub name: String,
    pub datasource: String,
    pub status: TaskStatus,

    /// 进度百分比 0-100
    pub progress: u8,

    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub steps: Vec<TaskStep>,
    pub logs: Vec<TaskLog>,

    /// 生成的报告路径
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_path: Option<String>,

    #[serde(skip)]
    pub(crate) cancel: CancellationToken,
}

impl InspectionTask {
    pub(crate) fn new(id: String, name: String, datasource: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            name,
            datasource,
            status: TaskStatus::Pending,
            progress: 0,
            start_time: now,
            end_time: None,
            error: None,
            steps: vec![
                TaskStep::pending(STEP_COLLECT_RESOURCES, "Collect CPU, memory, disk and other base metrics"),
                TaskStep::pending(STEP_COLLECT_SERVICES, "Check the running state of services"),
                TaskStep::pending(STEP_ANALYZE_ALERTS, "Analyze current alerts and anomalies"),
                TaskStep::pending(STEP_GENERATE_REPORT, "Generate the inspection report"),
            ],
            logs: vec![TaskLog {
                time: now,
                message: "inspection task created".to_string(),
                kind: LogKind::Info,
            }],
            report_path: None,
            cancel: CancellationToken::new(),
        }
    }

    pub(crate) fn push_log(&mut self, kind: LogKind, message: impl Into<String>) {
        self.logs.push(TaskLog {
            time: Utc::now(),
            message: message.into(),
            kind,
        });
    }

    /// 按名称查找步骤，只返回第一个匹配项
    pub(crate) fn step_mut(&mut self, name: &str) -> Option<&mut TaskStep> {
        self.steps.iter_mut().find(|s| s.name == name)
    }

    pub fn step(&self, name: &str) -> Option<&TaskStep> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// 任务的取消令牌
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 已结束任务的耗时
    pub fn duration(&self) -> Option<Duration> {
        self.end_time.map(|end| end - self.start_time)
    }
}
