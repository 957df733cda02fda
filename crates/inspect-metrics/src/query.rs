use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// 查询错误
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend error ({error_type}): {message}")]
    Api { error_type: String, message: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Unsupported result type: {0}")]
    UnsupportedResult(String),
}

/// 向量中的一条样本
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub labels: HashMap<String, String>,
    pub value: f64,
}

impl Sample {
    pub fn new(labels: HashMap<String, String>, value: f64) -> Self {
        Self { labels, value }
    }
}

/// 即时查询结果
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Scalar(f64),
    Vector(Vec<Sample>),
}

/// 即时查询能力，绑定到一个后端地址
#[async_trait]
pub trait InstantQuery: Send + Sync {
    async fn query(&self, expr: &str, ts: DateTime<Utc>) -> Result<QueryValue, QueryError>;

    /// 后端地址，用于日志和报告
    fn endpoint(&self) -> &str;
}
