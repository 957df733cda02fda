use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, error, info};

use crate::summary::{AlertSummary, TypeAlertSummary};

/// 一次巡检完成后的通知内容
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub report_path: PathBuf,
    pub project_name: String,
    pub datasource: String,
    pub summary: AlertSummary,
    pub type_summaries: Vec<TypeAlertSummary>,
}

/// 通知发送失败
#[derive(Debug, thiserror::Error)]
#[error("Delivery via {channel} failed: {message}")]
pub struct NotifierError {
    pub channel: String,
    pub message: String,
}

impl NotifierError {
    pub fn new(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            message: message.into(),
        }
    }
}

/// 通知渠道接口
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifierError>;

    fn name(&self) -> &str;

    fn is_enabled(&self) -> bool {
        true
    }
}

/// 通知管理器
#[derive(Default)]
pub struct NotificationManager {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl NotificationManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_notifier(&mut self, notifier: Box<dyn Notifier>) {
        info!("Registered notifier: {}", notifier.name());
        self.notifiers.push(notifier);
    }

    pub fn notifier_count(&self) -> usize {
        self.notifiers.len()
    }

    /// 发送到所有启用的渠道，单个渠道失败只记录日志
    ///
    /// 返回发送成功的渠道数。
    pub async fn broadcast(&self, notification: &Notification) -> usize {
        let mut delivered = 0;

        for notifier in &self.notifiers {
            if !notifier.is_enabled() {
                debug!("Notifier {} disabled, skipping", notifier.name());
                continue;
            }

            match notifier.notify(notification).await {
                Ok(()) => {
                    info!(
                        notifier = notifier.name(),
                        report = %notification.report_path.display(),
                        "Notification sent"
                    );
                    delivered += 1;
                }
                Err(e) => {
                    error!(notifier = notifier.name(), error = %e, "Failed to send notification");
                }
            }
        }

        delivered
    }
}
