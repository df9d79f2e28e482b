//! Elasticsearch REST implementation of [`SearchClient`]
//!
//! Index lifecycle maps onto `HEAD`/`DELETE`/`PUT /{index}` and bulk writes
//! onto `POST /_bulk` with a newline-delimited JSON body.

use futures::future::BoxFuture;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

use crate::config::SyncConfig;
use crate::log_engine_call;

use super::client::{
    BulkEntry, BulkItemOutcome, BulkOperation, BulkResponse, SearchClient, encode_ndjson,
};
use super::errors::{SyncError, SyncResult};

const NDJSON: &str = "application/x-ndjson";

/// HTTP client for one Elasticsearch host
#[derive(Debug, Clone)]
pub struct ElasticsearchClient {
    http: reqwest::Client,
    base: Url,
}

#[derive(Deserialize)]
struct RawBulkResponse {
    took: Option<u64>,
    #[serde(default)]
    items: Vec<HashMap<String, RawBulkItem>>,
}

#[derive(Deserialize)]
struct RawBulkItem {
    #[serde(rename = "_id", default)]
    id: Option<String>,
    status: u16,
    error: Option<Value>,
}

impl ElasticsearchClient {
    /// Create a client for `host`
    ///
    /// A host without a scheme (`localhost:9200`) is treated as `http://`.
    pub fn new(host: &str, request_timeout: Duration) -> SyncResult<Self> {
        let base = parse_host(host)?;
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| SyncError::ConfigurationInvalid(format!("HTTP client setup failed: {e}")))?;
        Ok(Self { http, base })
    }

    pub fn from_config(config: &SyncConfig) -> SyncResult<Self> {
        Self::new(config.es_host(), config.request_timeout())
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url_for(&self, segment: &str) -> SyncResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| {
                SyncError::ConfigurationInvalid(format!("'{}' cannot be used as a base URL", self.base))
            })?
            .pop_if_empty()
            .push(segment);
        Ok(url)
    }

    async fn send(&self, method: Method, segment: &str) -> SyncResult<(StatusCode, String)> {
        let response = self.http.request(method, self.url_for(segment)?).send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok((status, body))
    }

    async fn exists(&self, index: &str) -> SyncResult<bool> {
        let (status, body) = self.send(Method::HEAD, index).await?;
        match status {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            other => Err(rejection(other, body)),
        }
    }

    async fn delete(&self, index: &str) -> SyncResult<()> {
        let (status, body) = self.send(Method::DELETE, index).await?;
        match status {
            s if s.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(SyncError::IndexNotFound(index.to_string())),
            other => Err(rejection(other, body)),
        }
    }

    async fn create(&self, index: &str) -> SyncResult<()> {
        let (status, body) = self.send(Method::PUT, index).await?;
        match status {
            s if s.is_success() => Ok(()),
            StatusCode::BAD_REQUEST if body.contains("resource_already_exists_exception") => {
                Err(SyncError::IndexAlreadyExists(index.to_string()))
            }
            other => Err(rejection(other, body)),
        }
    }

    async fn bulk(&self, entries: &[BulkEntry]) -> SyncResult<BulkResponse> {
        if entries.is_empty() {
            return Ok(BulkResponse::default());
        }

        let payload = encode_ndjson(entries)?;
        let response = self
            .http
            .post(self.url_for("_bulk")?)
            .header(reqwest::header::CONTENT_TYPE, NDJSON)
            .body(payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(rejection(status, body));
        }

        parse_bulk_response(&body)
    }
}

impl SearchClient for ElasticsearchClient {
    fn bulk_write<'a>(&'a self, entries: &'a [BulkEntry]) -> BoxFuture<'a, SyncResult<BulkResponse>> {
        Box::pin(async move { log_engine_call!(self.bulk(entries).await, "bulk", self.base) })
    }

    fn index_exists<'a>(&'a self, index: &'a str) -> BoxFuture<'a, SyncResult<bool>> {
        Box::pin(async move { log_engine_call!(self.exists(index).await, "index_exists", index) })
    }

    fn delete_index<'a>(&'a self, index: &'a str) -> BoxFuture<'a, SyncResult<()>> {
        Box::pin(async move { log_engine_call!(self.delete(index).await, "delete_index", index) })
    }

    fn create_index<'a>(&'a self, index: &'a str) -> BoxFuture<'a, SyncResult<()>> {
        Box::pin(async move { log_engine_call!(self.create(index).await, "create_index", index) })
    }
}

/// Normalize and validate an Elasticsearch host address
pub fn parse_host(host: &str) -> SyncResult<Url> {
    let trimmed = host.trim();
    if trimmed.is_empty() {
        return Err(SyncError::ConfigurationInvalid(
            "Elasticsearch host is empty".to_string(),
        ));
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };

    let url = Url::parse(&with_scheme)
        .map_err(|e| SyncError::ConfigurationInvalid(format!("Invalid Elasticsearch host '{host}': {e}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(SyncError::ConfigurationInvalid(format!(
            "Unsupported scheme '{}' in Elasticsearch host '{host}'",
            url.scheme()
        )));
    }
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(SyncError::ConfigurationInvalid(format!(
            "Elasticsearch host '{host}' has no host name"
        )));
    }

    Ok(url)
}

fn rejection(status: StatusCode, body: String) -> SyncError {
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|value| value.get("error").map(error_reason))
        .unwrap_or(body);
    SyncError::RequestRejected {
        status: status.as_u16(),
        message,
    }
}

fn error_reason(error: &Value) -> String {
    match error {
        Value::String(reason) => reason.clone(),
        Value::Object(fields) => fields
            .get("reason")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string()),
        other => other.to_string(),
    }
}

fn parse_bulk_response(body: &str) -> SyncResult<BulkResponse> {
    let raw: RawBulkResponse = serde_json::from_str(body)
        .map_err(|e| SyncError::MalformedResponse(format!("bulk response: {e}")))?;

    let mut items = Vec::with_capacity(raw.items.len());
    for entry in raw.items {
        let Some((operation, item)) = entry.into_iter().next() else {
            return Err(SyncError::MalformedResponse(
                "bulk response item without operation".to_string(),
            ));
        };
        items.push(BulkItemOutcome {
            operation: if operation == "delete" {
                BulkOperation::Delete
            } else {
                BulkOperation::Index
            },
            document_id: item.id.unwrap_or_default(),
            status: item.status,
            error: item.error.as_ref().map(error_reason),
        });
    }

    Ok(BulkResponse {
        took_ms: raw.took,
        items,
    })
}
