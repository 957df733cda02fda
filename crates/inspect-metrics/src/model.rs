use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// 指标状态
///
/// 除了 normal / warning / critical 之外，`threshold_status` 允许配置任意触发状态
/// （例如 "ok" 表示触发即正常），这类状态原样保留。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MetricStatus {
    Normal,
    Warning,
    Critical,
    Other(String),
}

impl MetricStatus {
    pub fn as_str(&self) -> &str {
        match self {
            MetricStatus::Normal => "normal",
            MetricStatus::Warning => "warning",
            MetricStatus::Critical => "critical",
            MetricStatus::Other(s) => s,
        }
    }

    /// 报告中展示的状态文本
    pub fn display_text(&self) -> String {
        match self {
            MetricStatus::Normal => "正常".to_string(),
            MetricStatus::Warning => "警告".to_string(),
            MetricStatus::Critical => "严重".to_string(),
            MetricStatus::Other(s) => s.clone(),
        }
    }
}

impl Default for MetricStatus {
    fn default() -> Self {
        MetricStatus::Critical
    }
}

impl From<String> for MetricStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "normal" => MetricStatus::Normal,
            "warning" => MetricStatus::Warning,
            "critical" | "" => MetricStatus::Critical,
            _ => MetricStatus::Other(s),
        }
    }
}

impl From<&str> for MetricStatus {
    fn from(s: &str) -> Self {
        MetricStatus::from(s.to_string())
    }
}

impl From<MetricStatus> for String {
    fn from(status: MetricStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for MetricStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 阈值比较方式
///
/// 未配置或为空时按 greater 处理。无法识别的比较方式原样保留，
/// 这类指标既不触发也不进入警告区间。
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Comparison {
    #[default]
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    Equal,
    Other(String),
}

impl Comparison {
    pub fn as_str(&self) -> &str {
        match self {
            Comparison::Greater => "greater",
            Comparison::GreaterEqual => "greater_equal",
            Comparison::Less => "less",
            Comparison::LessEqual => "less_equal",
            Comparison::Equal => "equal",
            Comparison::Other(s) => s,
        }
    }
}

impl From<String> for Comparison {
    fn from(s: String) -> Self {
        match s.as_str() {
            "greater" | "" => Comparison::Greater,
            "greater_equal" => Comparison::GreaterEqual,
            "less" => Comparison::Less,
            "less_equal" => Comparison::LessEqual,
            "equal" => Comparison::Equal,
            _ => Comparison::Other(s),
        }
    }
}

impl From<&str> for Comparison {
    fn from(s: &str) -> Self {
        Comparison::from(s.to_string())
    }
}

impl From<Comparison> for String {
    fn from(comparison: Comparison) -> Self {
        comparison.as_str().to_string()
    }
}

/// 指标定义（来自配置）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricDefinition {
    pub name: String,

    /// PromQL 查询语句
    pub query: String,

    pub threshold: f64,

    #[serde(default, rename = "threshold_type")]
    pub comparison: Comparison,

    /// 阈值触发时的状态
    #[serde(default, rename = "threshold_status")]
    pub triggered_status: MetricStatus,

    #[serde(default)]
    pub unit: String,

    #[serde(default)]
    pub description: String,

    /// 源标签名 -> 展示别名
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// 指标类型分组（来自配置）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricType {
    #[serde(rename = "type")]
    pub type_name: String,

    #[serde(default)]
    pub metrics: Vec<MetricDefinition>,
}

/// 解析后的标签
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelData {
    pub name: String,
    pub alias: String,
    pub value: String,
}

/// 单条指标数据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricData {
    pub name: String,
    pub description: String,
    pub value: f64,
    pub threshold: f64,
    pub unit: String,
    pub status: MetricStatus,
    pub status_text: String,
    pub timestamp: DateTime<Utc>,
    pub labels: Vec<LabelData>,
}

/// 同一类型下的指标分组
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricGroup {
    #[serde(rename = "type")]
    pub type_name: String,
    pub metrics_by_name: HashMap<String, Vec<MetricData>>,
}

impl MetricGroup {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            metrics_by_name: HashMap::new(),
        }
    }

    /// 分组内的指标数据总条数
    pub fn sample_count(&self) -> usize {
        self.metrics_by_name.values().map(Vec::len).sum()
    }
}

/// 一次巡检的完整报告数据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportData {
    pub timestamp: DateTime<Utc>,
    pub project: String,
    pub datasource: String,
    pub metric_groups: HashMap<String, MetricGroup>,
}

impl ReportData {
    pub fn new(project: impl Into<String>, datasource: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            project: project.into(),
            datasource: datasource.into(),
            metric_groups: HashMap::new(),
        }
    }

    /// 遍历所有指标数据
    pub fn samples(&self) -> impl Iterator<Item = &MetricData> {
        self.metric_groups
            .values()
            .flat_map(|group| group.metrics_by_name.values())
            .flatten()
    }
}
