use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::model::{LabelData, MetricData, MetricDefinition, MetricGroup, MetricType, ReportData};
use crate::prometheus::PrometheusClient;
use crate::query::{InstantQuery, QueryError, QueryValue, Sample};
use crate::threshold::ThresholdRule;

/// 缺失标签的占位值
pub const MISSING_LABEL: &str = "-";

/// 指标收集器
///
/// 每次巡检创建一个实例，绑定一个数据源；不在并发巡检之间共享。
pub struct MetricsCollector {
    client: Arc<dyn InstantQuery>,
    metric_types: Arc<Vec<MetricType>>,
    project: String,
    datasource: String,
}

impl MetricsCollector {
    pub fn new(
        client: Arc<dyn InstantQuery>,
        metric_types: Arc<Vec<MetricType>>,
        project: impl Into<String>,
    ) -> Self {
        let datasource = client.endpoint().to_string();
        Self {
            client,
            metric_types,
            project: project.into(),
            datasource,
        }
    }

    pub fn datasource(&self) -> &str {
        &self.datasource
    }

    /// 收集所有配置的指标
    ///
    /// 单个指标查询失败或数据无效只跳过该指标/样本。取消后停止后续查询，
    /// 返回已经收集到的部分数据。
    pub async fn collect_metrics(&self, cancel: Option<&CancellationToken>) -> ReportData {
        info!(datasource = %self.datasource, "Collecting metrics");
        let mut data = ReportData::new(self.project.clone(), self.datasource.clone());

        'types: for metric_type in self.metric_types.iter() {
            let mut group = MetricGroup::new(metric_type.type_name.clone());

            for def in &metric_type.metrics {
                if cancel.map_or(false, CancellationToken::is_cancelled) {
                    warn!(
                        datasource = %self.datasource,
                        metric = %def.name,
                        "Collection cancelled, returning partial data"
                    );
                    data.metric_groups.insert(metric_type.type_name.clone(), group);
                    break 'types;
                }

                debug!(metric = %def.name, query = %def.query, "Querying metric");
                let result = match self.client.query(&def.query, Utc::now()).await {
                    Ok(result) => result,
                    Err(e) => {
                        warn!(metric = %def.name, error = %e, "Metric query failed, skipping");
                        continue;
                    }
                };

                match result {
                    QueryValue::Vector(samples) => {
                        let metrics = samples
                            .iter()
                            .filter_map(|sample| build_metric_data(def, sample))
                            .collect::<Vec<_>>();
                        debug!(metric = %def.name, accepted = metrics.len(), total = samples.len(), "Metric collected");
                        group.metrics_by_name.insert(def.name.clone(), metrics);
                    }
                    QueryValue::Scalar(value) => {
                        debug!(metric = %def.name, value, "Scalar result ignored");
                    }
                }
            }

            data.metric_groups.insert(metric_type.type_name.clone(), group);
        }

        info!(
            datasource = %self.datasource,
            groups = data.metric_groups.len(),
            samples = data.samples().count(),
            "Metrics collection finished"
        );
        data
    }
}

/// 把一条样本转换为报告数据，无效样本返回 None
fn build_metric_data(def: &MetricDefinition, sample: &Sample) -> Option<MetricData> {
    let labels = resolve_labels(def, &sample.labels);
    let value = sample.value;

    if !value.is_finite() {
        warn!(metric = %def.name, value, "Invalid sample value (NaN/Inf), skipping");
        return None;
    }

    let status = ThresholdRule::from_definition(def).classify(value);
    let metric = MetricData {
        name: def.name.clone(),
        description: def.description.clone(),
        value,
        threshold: def.threshold,
        unit: def.unit.clone(),
        status_text: status.display_text(),
        status,
        timestamp: Utc::now(),
        labels,
    };

    if let Err(reason) = validate_metric_data(&metric, &def.labels) {
        warn!(metric = %def.name, reason = %reason, "Metric validation failed, skipping");
        return None;
    }

    Some(metric)
}

/// 按配置解析标签，缺失或为空时填充占位值
fn resolve_labels(def: &MetricDefinition, available: &HashMap<String, String>) -> Vec<LabelData> {
    def.labels
        .iter()
        .map(|(name, alias)| {
            let value = match available.get(name) {
                Some(v) if !v.is_empty() => v.clone(),
                _ => {
                    warn!(metric = %def.name, label = %name, "Label missing or empty");
                    MISSING_LABEL.to_string()
                }
            };
            LabelData {
                name: name.clone(),
                alias: alias.clone(),
                value,
            }
        })
        .collect()
}

/// 标签校验错误
#[derive(Debug, PartialEq, thiserror::Error)]
enum LabelError {
    #[error("label count mismatch: expected {expected}, got {actual}")]
    CountMismatch { expected: usize, actual: usize },

    #[error("unconfigured label: {0}")]
    Unconfigured(String),
}

/// 校验标签完整性
fn validate_metric_data(
    data: &MetricData,
    configured: &BTreeMap<String, String>,
) -> Result<(), LabelError> {
    if data.labels.len() != configured.len() {
        return Err(LabelError::CountMismatch {
            expected: configured.len(),
            actual: data.labels.len(),
        });
    }

    if let Some(label) = data.labels.iter().find(|l| !configured.contains_key(&l.name)) {
        return Err(LabelError::Unconfigured(label.name.clone()));
    }

    Ok(())
}

/// 收集器工厂：为一次巡检创建绑定到指定数据源的收集器
pub trait CollectorFactory: Send + Sync {
    fn create(&self, datasource: &str) -> Result<MetricsCollector, QueryError>;
}

/// 基于 Prometheus HTTP API 的收集器工厂
pub struct PrometheusCollectorFactory {
    metric_types: Arc<Vec<MetricType>>,
    project: String,
}

impl PrometheusCollectorFactory {
    pub fn new(metric_types: Vec<MetricType>, project: impl Into<String>) -> Self {
        Self {
            metric_types: Arc::new(metric_types),
            project: project.into(),
        }
    }
}

impl CollectorFactory for PrometheusCollectorFactory {
    fn create(&self, datasource: &str) -> Result<MetricsCollector, QueryError> {
        let client = PrometheusClient::new(datasource)?;
        Ok(MetricsCollector::new(
            Arc::new(client),
            self.metric_types.clone(),
            self.project.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Comparison, MetricStatus};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 按查询语句返回预设结果
    struct StubQuery {
        responses: HashMap<String, QueryValue>,
        calls: AtomicUsize,
    }

    impl StubQuery {
        fn new(responses: Vec<(&str, QueryValue)>) -> Self {
            Self {
                responses: responses
                    .into_iter()
                    .map(|(q, v)| (q.to_string(), v))
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl InstantQuery for StubQuery {
        async fn query(&self, expr: &str, _ts: DateTime<Utc>) -> Result<QueryValue, QueryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses.get(expr).cloned().ok_or_else(|| QueryError::Api {
                error_type: "execution".to_string(),
                message: format!("no data for {}", expr),
            })
        }

        fn endpoint(&self) -> &str {
            "http://stub:9090"
        }
    }

    fn definition(name: &str, query: &str, threshold: f64, labels: &[(&str, &str)]) -> MetricDefinition {
        MetricDefinition {
            name: name.to_string(),
            query: query.to_string(),
            threshold,
            comparison: Comparison::Greater,
            triggered_status: MetricStatus::Critical,
            unit: "%".to_string(),
            description: format!("{} description", name),
            labels: labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn sample(labels: &[(&str, &str)], value: f64) -> Sample {
        Sample::new(
            labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            value,
        )
    }

    fn collector(stub: Arc<StubQuery>, types: Vec<MetricType>) -> MetricsCollector {
        MetricsCollector::new(stub, Arc::new(types), "test-project")
    }

    #[tokio::test]
    async fn test_nan_sample_dropped() {
        let stub = Arc::new(StubQuery::new(vec![(
            "cpu_query",
            QueryValue::Vector(vec![
                sample(&[("instance", "a")], f64::NAN),
                sample(&[("instance", "b")], 12.0),
            ]),
        )]));
        let types = vec![MetricType {
            type_name: "resources".to_string(),
            metrics: vec![definition("cpu", "cpu_query", 80.0, &[("instance", "实例")])],
        }];

        let data = collector(stub, types).collect_metrics(None).await;

        let cpu = &data.metric_groups["resources"].metrics_by_name["cpu"];
        assert_eq!(cpu.len(), 1);
        assert_eq!(cpu[0].value, 12.0);
        assert_eq!(cpu[0].labels[0].value, "b");
        assert_eq!(cpu[0].status, MetricStatus::Normal);
        assert_eq!(cpu[0].status_text, "正常");
    }

    #[tokio::test]
    async fn test_infinite_sample_dropped() {
        let stub = Arc::new(StubQuery::new(vec![(
            "q",
            QueryValue::Vector(vec![sample(&[], f64::INFINITY), sample(&[], f64::NEG_INFINITY)]),
        )]));
        let types = vec![MetricType {
            type_name: "t".to_string(),
            metrics: vec![definition("m", "q", 1.0, &[])],
        }];

        let data = collector(stub, types).collect_metrics(None).await;
        assert!(data.metric_groups["t"].metrics_by_name["m"].is_empty());
    }

    #[tokio::test]
    async fn test_missing_label_uses_placeholder() {
        let stub = Arc::new(StubQuery::new(vec![(
            "disk_query",
            QueryValue::Vector(vec![sample(&[("instance", "a"), ("mountpoint", "")], 95.0)]),
        )]));
        let types = vec![MetricType {
            type_name: "resources".to_string(),
            metrics: vec![definition(
                "disk",
                "disk_query",
                90.0,
                &[("instance", "实例"), ("mountpoint", "挂载点"), ("device", "设备")],
            )],
        }];

        let data = collector(stub, types).collect_metrics(None).await;
        let disk = &data.metric_groups["resources"].metrics_by_name["disk"];
        assert_eq!(disk.len(), 1);
        assert_eq!(disk[0].status, MetricStatus::Critical);

        let values: HashMap<_, _> = disk[0]
            .labels
            .iter()
            .map(|l| (l.name.as_str(), l.value.as_str()))
            .collect();
        assert_eq!(values["instance"], "a");
        assert_eq!(values["mountpoint"], MISSING_LABEL);
        assert_eq!(values["device"], MISSING_LABEL);
    }

    #[tokio::test]
    async fn test_query_error_skips_only_that_metric() {
        let stub = Arc::new(StubQuery::new(vec![(
            "ok_query",
            QueryValue::Vector(vec![sample(&[], 1.0)]),
        )]));
        let types = vec![MetricType {
            type_name: "services".to_string(),
            metrics: vec![
                definition("broken", "missing_query", 1.0, &[]),
                definition("healthy", "ok_query", 10.0, &[]),
            ],
        }];

        let data = collector(stub.clone(), types).collect_metrics(None).await;
        let group = &data.metric_groups["services"];
        assert!(!group.metrics_by_name.contains_key("broken"));
        assert_eq!(group.metrics_by_name["healthy"].len(), 1);
        assert_eq!(stub.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_scalar_result_ignored() {
        let stub = Arc::new(StubQuery::new(vec![("scalar_q", QueryValue::Scalar(5.0))]));
        let types = vec![MetricType {
            type_name: "t".to_string(),
            metrics: vec![definition("s", "scalar_q", 1.0, &[])],
        }];

        let data = collector(stub, types).collect_metrics(None).await;
        assert!(data.metric_groups["t"].metrics_by_name.is_empty());
    }

    #[tokio::test]
    async fn test_report_carries_datasource_and_project() {
        let stub = Arc::new(StubQuery::new(vec![]));
        let data = collector(stub, vec![]).collect_metrics(None).await;
        assert_eq!(data.datasource, "http://stub:9090");
        assert_eq!(data.project, "test-project");
        assert!(data.metric_groups.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_before_start_issues_no_queries() {
        let stub = Arc::new(StubQuery::new(vec![("q", QueryValue::Vector(vec![sample(&[], 1.0)]))]));
        let types = vec![MetricType {
            type_name: "t".to_string(),
            metrics: vec![definition("a", "q", 1.0, &[]), definition("b", "q", 1.0, &[])],
        }];
        let token = CancellationToken::new();
        token.cancel();

        let data = collector(stub.clone(), types).collect_metrics(Some(&token)).await;
        assert_eq!(stub.calls.load(Ordering::SeqCst), 0);
        assert_eq!(data.samples().count(), 0);
    }

    #[test]
    fn test_validate_label_count_mismatch() {
        let def = definition("m", "q", 1.0, &[("instance", "实例")]);
        let mut metric = build_metric_data(&def, &sample(&[("instance", "a")], 0.5)).unwrap();
        assert!(validate_metric_data(&metric, &def.labels).is_ok());

        metric.labels[0].name = "pod".to_string();
        assert_eq!(
            validate_metric_data(&metric, &def.labels),
            Err(LabelError::Unconfigured("pod".to_string()))
        );

        metric.labels.clear();
        assert_eq!(
            validate_metric_data(&metric, &def.labels),
            Err(LabelError::CountMismatch { expected: 1, actual: 0 })
        );
    }

    #[test]
    fn test_factory_rejects_invalid_datasource() {
        let factory = PrometheusCollectorFactory::new(vec![], "p");
        assert!(factory.create("not-a-url").is_err());

        let collector = factory.create("http://prom.internal:9090").unwrap();
        assert_eq!(collector.datasource(), "http://prom.internal:9090");
    }
}
