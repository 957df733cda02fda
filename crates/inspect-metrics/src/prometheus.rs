use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use crate::query::{InstantQuery, QueryError, QueryValue, Sample};

/// Prometheus HTTP API 客户端
#[derive(Debug, Clone)]
pub struct PrometheusClient {
    base_url: String,
    query_url: Url,
    client: reqwest::Client,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    status: String,
    #[serde(default)]
    data: Option<QueryData>,
    #[serde(default)]
    error_type: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryData {
    result_type: String,
    result: Value,
}

#[derive(Deserialize)]
struct VectorEntry {
    #[serde(default)]
    metric: HashMap<String, String>,
    value: (f64, String),
}

impl PrometheusClient {
    /// 创建客户端；地址必须是 http/https
    pub fn new(base_url: &str) -> Result<Self, QueryError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        let parsed = Url::parse(trimmed)
            .map_err(|e| QueryError::InvalidEndpoint(format!("{}: {}", base_url, e)))?;

        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(QueryError::InvalidEndpoint(format!(
                "{}: unsupported scheme {}",
                base_url,
                parsed.scheme()
            )));
        }

        let query_url = Url::parse(&format!("{}/api/v1/query", trimmed))
            .map_err(|e| QueryError::InvalidEndpoint(format!("{}: {}", base_url, e)))?;

        let client = reqwest::Client::builder().build()?;

        Ok(Self {
            base_url: trimmed.to_string(),
            query_url,
            client,
        })
    }
}

#[async_trait]
impl InstantQuery for PrometheusClient {
    async fn query(&self, expr: &str, ts: DateTime<Utc>) -> Result<QueryValue, QueryError> {
        let time = format!("{:.3}", ts.timestamp_millis() as f64 / 1000.0);
        debug!(endpoint = %self.base_url, query = %expr, "Issuing instant query");

        let response = self
            .client
            .get(self.query_url.clone())
            .query(&[("query", expr), ("time", time.as_str())])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        match decode_response(&body) {
            Err(QueryError::Decode(_)) if !status.is_success() => Err(QueryError::Api {
                error_type: status.to_string(),
                message: body,
            }),
            other => other,
        }
    }

    fn endpoint(&self) -> &str {
        &self.base_url
    }
}

/// 解析 /api/v1/query 的响应体
pub(crate) fn decode_response(body: &str) -> Result<QueryValue, QueryError> {
    let resp: ApiResponse =
        serde_json::from_str(body).map_err(|e| QueryError::Decode(e.to_string()))?;

    if resp.status != "success" {
        return Err(QueryError::Api {
            error_type: resp.error_type.unwrap_or_else(|| "unknown".to_string()),
            message: resp.error.unwrap_or_default(),
        });
    }

    let data = resp
        .data
        .ok_or_else(|| QueryError::Decode("missing data field".to_string()))?;

    match data.result_type.as_str() {
        "vector" => {
            let entries: Vec<VectorEntry> = serde_json::from_value(data.result)
                .map_err(|e| QueryError::Decode(e.to_string()))?;
            let samples = entries
                .into_iter()
                .map(|entry| Ok(Sample::new(entry.metric, parse_value(&entry.value.1)?)))
                .collect::<Result<Vec<_>, QueryError>>()?;
            Ok(QueryValue::Vector(samples))
        }
        "scalar" => {
            let (_, raw): (f64, String) = serde_json::from_value(data.result)
                .map_err(|e| QueryError::Decode(e.to_string()))?;
            Ok(QueryValue::Scalar(parse_value(&raw)?))
        }
        other => Err(QueryError::UnsupportedResult(other.to_string())),
    }
}

/// 样本值以字符串传输，可能是 "NaN" / "+Inf" / "-Inf"
fn parse_value(raw: &str) -> Result<f64, QueryError> {
    raw.parse::<f64>()
        .map_err(|_| QueryError::Decode(format!("invalid sample value: {}", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_rejects_bad_endpoint() {
        assert!(matches!(
            PrometheusClient::new("not a url"),
            Err(QueryError::InvalidEndpoint(_))
        ));
        assert!(matches!(
            PrometheusClient::new("ftp://prom.local:9090"),
            Err(QueryError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = PrometheusClient::new("http://prom.local:9090/").unwrap();
        assert_eq!(client.endpoint(), "http://prom.local:9090");
        assert_eq!(client.query_url.path(), "/api/v1/query");
    }

    #[test]
    fn test_decode_vector() {
        let body = r#"{
            "status": "success",
            "data": {
                "resultType": "vector",
                "result": [
                    {"metric": {"instance": "10.0.0.1:9100", "job": "node"}, "value": [1700000000.123, "42.5"]},
                    {"metric": {"instance": "10.0.0.2:9100"}, "value": [1700000000.123, "NaN"]},
                    {"metric": {}, "value": [1700000000.123, "+Inf"]}
                ]
            }
        }"#;

        let QueryValue::Vector(samples) = decode_response(body).unwrap() else {
            panic!("expected vector");
        };
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].value, 42.5);
        assert_eq!(samples[0].labels.get("job").map(String::as_str), Some("node"));
        assert!(samples[1].value.is_nan());
        assert!(samples[2].value.is_infinite());
    }

    #[test]
    fn test_decode_scalar() {
        let body = r#"{"status":"success","data":{"resultType":"scalar","result":[1700000000,"3"]}}"#;
        assert_eq!(decode_response(body).unwrap(), QueryValue::Scalar(3.0));
    }

    #[test]
    fn test_decode_api_error() {
        let body = r#"{"status":"error","errorType":"bad_data","error":"parse error at char 4"}"#;
        match decode_response(body) {
            Err(QueryError::Api { error_type, message }) => {
                assert_eq!(error_type, "bad_data");
                assert!(message.contains("parse error"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_decode_unsupported_matrix() {
        let body = r#"{"status":"success","data":{"resultType":"matrix","result":[]}}"#;
        assert!(matches!(
            decode_response(body),
            Err(QueryError::UnsupportedResult(t)) if t == "matrix"
        ));
    }

    #[test]
    fn test_decode_garbage() {
        assert!(matches!(decode_response("<html>"), Err(QueryError::Decode(_))));
    }
}
