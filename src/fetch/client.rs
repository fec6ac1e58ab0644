use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{IngestError, Result};

/// HTTP client for the upstream weather and avalanche APIs.
///
/// Fetches are timed and classified: transport failures, timeouts and non-2xx
/// statuses become `Network` errors; bodies that are not JSON, lack the
/// expected container or have the wrong shape become `ApiFormat` errors.
/// Retries are the caller's responsibility.
#[derive(Debug, Clone)]
pub struct FetchClient {
    http: reqwest::Client,
}

impl FetchClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(IngestError::network)?;
        Ok(Self { http })
    }

    /// Issue a GET request and parse the body as JSON.
    pub async fn fetch_json(&self, url: &str, params: &[(&str, String)]) -> Result<Value> {
        let started = Instant::now();

        let response = self
            .http
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(IngestError::network)?;

        let status = response.status();
        if !status.is_success() {
            warn!(%url, %status, "upstream request rejected");
            return Err(IngestError::Network(format!(
                "HTTP {} from {}",
                status, url
            )));
        }

        let body = response.text().await.map_err(IngestError::network)?;
        let payload: Value = serde_json::from_str(&body)
            .map_err(|e| IngestError::ApiFormat(format!("invalid JSON from {}: {}", url, e)))?;

        debug!(
            %url,
            elapsed_ms = started.elapsed().as_millis() as u64,
            bytes = body.len(),
            "fetched"
        );

        Ok(payload)
    }

    /// Fetch a keyed-array time series response, verifying the `hourly`
    /// container is present and object-shaped.
    pub async fn fetch_hourly(&self, url: &str, params: &[(&str, String)]) -> Result<Value> {
        let payload = self.fetch_json(url, params).await?;

        match payload.get("hourly") {
            Some(Value::Object(_)) => Ok(payload),
            Some(_) => Err(IngestError::ApiFormat(format!(
                "'hourly' field from {} is not an object",
                url
            ))),
            None => Err(IngestError::ApiFormat(format!(
                "response from {} lacks the 'hourly' field",
                url
            ))),
        }
    }

    /// Fetch a list-typed endpoint, verifying the payload is a JSON array.
    pub async fn fetch_list(&self, url: &str) -> Result<Vec<Value>> {
        let payload = self.fetch_json(url, &[]).await?;

        match payload {
            Value::Array(items) => Ok(items),
            other => Err(IngestError::ApiFormat(format!(
                "expected an array from {}, got {}",
                url,
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_construction() {
        assert!(FetchClient::new(Duration::from_secs(30)).is_ok());
    }

    #[test]
    fn test_json_kind_labels() {
        assert_eq!(json_kind(&Value::Null), "null");
        assert_eq!(json_kind(&serde_json::json!({"hourly": {}})), "an object");
        assert_eq!(json_kind(&serde_json::json!([1, 2])), "an array");
    }
}
