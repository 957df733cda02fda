use inspect_metrics::MetricType;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;

use crate::error::{ConfigError, Result};

/// 巡检配置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InspectionConfig {
    #[serde(default = "default_project_name")]
    pub project_name: String,

    /// 默认数据源地址
    #[serde(default = "default_prometheus_url")]
    pub prometheus_url: String,

    /// 命名数据源
    #[serde(default)]
    pub datasources: Vec<DataSourceConfig>,

    #[serde(default)]
    pub metric_types: Vec<MetricType>,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// 清理过期任务的间隔（秒）
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
}

/// 命名数据源
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DataSourceConfig {
    pub name: String,
    pub url: String,
}

/// 日志配置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 输出 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_project_name() -> String {
    "Inspection".to_string()
}

fn default_prometheus_url() -> String {
    "http://localhost:9090".to_string()
}

fn default_cleanup_interval() -> u64 {
    3600
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for InspectionConfig {
    fn default() -> Self {
        Self {
            project_name: default_project_name(),
            prometheus_url: default_prometheus_url(),
            datasources: Vec::new(),
            metric_types: Vec::new(),
            logging: LoggingConfig::default(),
            cleanup_interval_secs: default_cleanup_interval(),
        }
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

impl InspectionConfig {
    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        if !is_http_url(&self.prometheus_url) {
            return Err(ConfigError::validation(format!(
                "prometheus_url must be an http(s) URL, got '{}'",
                self.prometheus_url
            )));
        }

        for ds in &self.datasources {
            if ds.name.is_empty() {
                return Err(ConfigError::validation("datasource name cannot be empty"));
            }
            if !is_http_url(&ds.url) {
                return Err(ConfigError::validation(format!(
                    "datasource '{}' has invalid url '{}'",
                    ds.name, ds.url
                )));
            }
        }

        let mut seen = HashSet::new();
        for metric_type in &self.metric_types {
            if !seen.insert(metric_type.type_name.as_str()) {
                return Err(ConfigError::validation(format!(
                    "duplicate metric type '{}'",
                    metric_type.type_name
                )));
            }
        }

        if self.cleanup_interval_secs == 0 {
            return Err(ConfigError::validation("cleanup_interval_secs must be greater than 0"));
        }

        Ok(())
    }

    /// 解析请求的数据源
    ///
    /// 空值使用默认地址；http(s) 地址原样使用；其余按名称查找。
    pub fn resolve_datasource(&self, requested: &str) -> Result<String> {
        let requested = requested.trim();

        if requested.is_empty() {
            debug!(url = %self.prometheus_url, "Using default datasource");
            return Ok(self.prometheus_url.clone());
        }

        if is_http_url(requested) {
            return Ok(requested.to_string());
        }

        self.datasources
            .iter()
            .find(|ds| ds.name == requested)
            .map(|ds| {
                debug!(name = %ds.name, url = %ds.url, "Resolved named datasource");
                ds.url.clone()
            })
            .ok_or_else(|| ConfigError::DatasourceNotFound(requested.to_string()))
    }

    /// 配置的指标定义总数
    pub fn metric_count(&self) -> usize {
        self.metric_types.iter().map(|t| t.metrics.len()).sum()
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_datasources() -> InspectionConfig {
        InspectionConfig {
            datasources: vec![
                DataSourceConfig {
                    name: "prod".to_string(),
                    url: "http://prom-prod:9090".to_string(),
                },
                DataSourceConfig {
                    name: "staging".to_string(),
                    url: "https://prom-staging".to_string(),
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = InspectionConfig::default();
        assert_eq!(config.project_name, "Inspection");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.cleanup_interval(), Duration::from_secs(3600));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_resolve_datasource() {
        let config = config_with_datasources();

        assert_eq!(config.resolve_datasource("").unwrap(), "http://localhost:9090");
        assert_eq!(config.resolve_datasource("prod").unwrap(), "http://prom-prod:9090");
        assert_eq!(
            config.resolve_datasource("https://adhoc:9090").unwrap(),
            "https://adhoc:9090"
        );
        assert!(matches!(
            config.resolve_datasource("unknown"),
            Err(ConfigError::DatasourceNotFound(name)) if name == "unknown"
        ));
    }

    #[test]
    fn test_validate_rejects_bad_urls() {
        let mut config = config_with_datasources();
        config.prometheus_url = "prom:9090".to_string();
        assert!(config.validate().is_err());

        let mut config = config_with_datasources();
        config.datasources[0].url = "tcp://x".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_types() {
        let config = InspectionConfig {
            metric_types: vec![
                MetricType { type_name: "resources".to_string(), metrics: vec![] },
                MetricType { type_name: "resources".to_string(), metrics: vec![] },
            ],
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }
}
