use serde::{Deserialize, Serialize};

use crate::model::{MetricData, MetricStatus, ReportData};

/// 告警汇总
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertSummary {
    pub total_alerts: usize,
    pub critical_alerts: usize,
    pub warning_alerts: usize,
    pub normal_metrics: usize,
    pub total_metrics: usize,
}

/// 按指标类型的告警汇总
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeAlertSummary {
    #[serde(rename = "type")]
    pub type_name: String,
    pub total_metrics: usize,
    pub critical_count: usize,
    pub warning_count: usize,
    pub normal_count: usize,
}

impl AlertSummary {
    fn record(&mut self, metric: &MetricData) {
        self.total_metrics += 1;
        match metric.status {
            MetricStatus::Critical => {
                self.critical_alerts += 1;
                self.total_alerts += 1;
            }
            MetricStatus::Warning => {
                self.warning_alerts += 1;
                self.total_alerts += 1;
            }
            _ => self.normal_metrics += 1,
        }
    }

    pub fn has_alerts(&self) -> bool {
        self.total_alerts > 0
    }
}

impl TypeAlertSummary {
    fn record(&mut self, metric: &MetricData) {
        self.total_metrics += 1;
        match metric.status {
            MetricStatus::Critical => self.critical_count += 1,
            MetricStatus::Warning => self.warning_count += 1,
            _ => self.normal_count += 1,
        }
    }
}

/// 计算整份报告的告警汇总
pub fn calculate_alert_summary(data: &ReportData) -> AlertSummary {
    let mut summary = AlertSummary::default();
    for metric in data.samples() {
        summary.record(metric);
    }
    summary
}

/// 按类型计算告警汇总，结果按类型名升序
pub fn calculate_type_alert_summary(data: &ReportData) -> Vec<TypeAlertSummary> {
    let mut result = data
        .metric_groups
        .iter()
        .map(|(type_name, group)| {
            let mut summary = TypeAlertSummary {
                type_name: type_name.clone(),
                ..Default::default()
            };
            group
                .metrics_by_name
                .values()
                .flatten()
                .for_each(|metric| summary.record(metric));
            summary
        })
        .collect::<Vec<_>>();

    result.sort_by(|a, b| a.type_name.cmp(&b.type_name));
    result
}
