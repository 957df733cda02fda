use inspect_metrics::{QueryError, ReportError};
use thiserror::Error;

/// 巡检执行错误类型
#[derive(Error, Debug)]
pub enum InspectError {
    /// 无法为数据源创建查询客户端
    #[error("Failed to create client for datasource '{datasource}': {source}")]
    Client {
        datasource: String,
        #[source]
        source: QueryError,
    },

    /// 报告生成失败
    #[error("Failed to generate report: {0}")]
    Report(#[from] ReportError),

    /// 任务已被取消
    #[error("Task cancelled: {0}")]
    Cancelled(String),
}

/// 巡检执行结果类型
pub type Result<T> = std::result::Result<T, InspectError>;
