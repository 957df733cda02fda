use async_trait::async_trait;
use std::path::PathBuf;

use crate::model::ReportData;

/// 报告生成错误
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Render error: {0}")]
    Render(String),
}

/// 报告生成器，输出格式由实现决定
#[async_trait]
pub trait ReportWriter: Send + Sync {
    /// 写出报告，返回报告文件路径
    async fn write(&self, data: &ReportData) -> Result<PathBuf, ReportError>;
}
