pub mod collector;
pub mod model;
pub mod notifier;
pub mod prometheus;
pub mod query;
pub mod report;
pub mod summary;
pub mod threshold;

pub use tokio_util::sync::CancellationToken;
pub use collector::{CollectorFactory, MetricsCollector, PrometheusCollectorFactory, MISSING_LABEL};
pub use model::{
    Comparison, LabelData, MetricData, MetricDefinition, MetricGroup, MetricStatus, MetricType,
    ReportData,
};
pub use notifier::{Notification, NotificationManager, Notifier, NotifierError};
pub use prometheus::PrometheusClient;
pub use query::{InstantQuery, QueryError, QueryValue, Sample};
pub use report::{ReportError, ReportWriter};
pub use summary::{calculate_alert_summary, calculate_type_alert_summary, AlertSummary, TypeAlertSummary};
pub use threshold::{classify, ThresholdRule};
