//! Remote executor for the SDA tabular web service.
//!
//! Posts approved SQL as JSON to the service endpoint and normalizes the
//! response rows. One HTTP round trip per statement, bounded by a timeout;
//! failures are fatal and never retried here — callers wrap the whole ask
//! if they need retries.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value as Json;
use tracing::debug;

use crate::error::{Result, SoilqError};
use crate::guard::{split_series, BackendKind, GuardedQuery};

use super::{ensure_backend, ComponentRow, QueryExecutor, QueryResult};

/// Soil Data Access tabular endpoint.
pub const DEFAULT_SDA_URL: &str = "https://sdmdataaccess.sc.egov.usda.gov/Tabular/post";

/// Default request timeout in seconds.
pub const DEFAULT_SDA_TIMEOUT_SECS: u64 = 120;

#[derive(Serialize)]
struct SdaRequest<'a> {
    query: &'a str,
    format: &'a str,
}

/// Executor for the SDA remote backend.
#[derive(Debug, Clone)]
pub struct RemoteExecutor {
    url: String,
    client: Client,
}

impl RemoteExecutor {
    /// Creates a remote executor with the given endpoint and timeout.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SoilqError::execution(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    /// Creates a remote executor against the public SDA endpoint with the
    /// default timeout.
    pub fn sda() -> Result<Self> {
        Self::new(
            DEFAULT_SDA_URL,
            Duration::from_secs(DEFAULT_SDA_TIMEOUT_SECS),
        )
    }

    /// Posts one statement and returns the decoded row list.
    async fn post(&self, sql: &str) -> Result<Vec<Json>> {
        let payload = SdaRequest {
            query: sql,
            format: "JSON",
        };

        let response = self
            .client
            .post(self.url.as_str())
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SoilqError::execution("SDA request timed out")
                } else if e.is_connect() {
                    SoilqError::execution(format!("Failed to connect to SDA at {}", self.url))
                } else {
                    SoilqError::execution(format!("SDA request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SoilqError::execution(format!("Failed to read SDA response: {e}")))?;

        if !status.is_success() {
            return Err(SoilqError::execution(format!(
                "SDA returned {status}: {}",
                body.chars().take(300).collect::<String>()
            )));
        }

        let parsed: Json = serde_json::from_str(&body)
            .map_err(|e| SoilqError::execution(format!("SDA response is not JSON: {e}")))?;

        // SDA wraps rows in {"Table": [...]}; fall back to the whole body.
        let rows = match parsed {
            Json::Object(ref map) if map.contains_key("Table") => map["Table"].clone(),
            other => other,
        };

        match rows {
            Json::Array(rows) => {
                debug!("SDA returned {} rows", rows.len());
                Ok(rows)
            }
            _ => Err(SoilqError::execution(
                "SDA response body is not a row list",
            )),
        }
    }
}

#[async_trait]
impl QueryExecutor for RemoteExecutor {
    fn backend(&self) -> BackendKind {
        BackendKind::Remote
    }

    async fn run(&self, query: &GuardedQuery) -> Result<QueryResult> {
        ensure_backend(query, BackendKind::Remote)?;

        let parts = split_series(query.sql());
        let mut result = QueryResult::default();

        if !parts.primary.is_empty() {
            for row in self.post(parts.primary).await? {
                let (key, value) = decode_pair(&row)?;
                let Some(key) = key else {
                    debug!("Dropping primary row with NULL key");
                    continue;
                };
                result.mu_values.insert(key, value);
            }
        }

        if let Some(series_sql) = parts.series {
            if !series_sql.is_empty() {
                let rows = self.post(series_sql).await?;
                let mut components = Vec::with_capacity(rows.len());
                for row in &rows {
                    components.push(decode_component(row)?);
                }
                result.components = Some(components);
            }
        }

        Ok(result)
    }
}

/// Decodes a primary row into (key, value).
///
/// Rows arrive either as positional arrays or as objects keyed by the
/// projected column names.
fn decode_pair(row: &Json) -> Result<(Option<String>, Option<f64>)> {
    match row {
        Json::Array(cells) => {
            if cells.len() != 2 {
                return Err(SoilqError::execution(format!(
                    "primary SELECT must project exactly 2 columns (mukey, value); got {}",
                    cells.len()
                )));
            }
            Ok((json_text(&cells[0]), json_number(&cells[1])))
        }
        Json::Object(map) => {
            let key = map
                .get("mukey")
                .ok_or_else(|| SoilqError::execution("row object is missing 'mukey'"))?;
            let value = map
                .get("value")
                .ok_or_else(|| SoilqError::execution("row object is missing 'value'"))?;
            Ok((json_text(key), json_number(value)))
        }
        _ => Err(SoilqError::execution("row is neither an array nor an object")),
    }
}

/// Decodes a series row into a [`ComponentRow`].
fn decode_component(row: &Json) -> Result<ComponentRow> {
    match row {
        Json::Array(cells) => {
            if cells.len() != 5 {
                return Err(SoilqError::execution(format!(
                    "series SELECT must project exactly 5 columns \
                     (mukey, cokey, compname, comppct_r, value); got {}",
                    cells.len()
                )));
            }
            Ok(ComponentRow {
                mukey: json_text(&cells[0]).unwrap_or_default(),
                cokey: json_text(&cells[1]).unwrap_or_default(),
                compname: json_text(&cells[2]),
                comppct_r: json_number(&cells[3]),
                value: json_number(&cells[4]),
            })
        }
        Json::Object(map) => {
            let field = |name: &str| -> Result<&Json> {
                map.get(name).ok_or_else(|| {
                    SoilqError::execution(format!("row object is missing '{name}'"))
                })
            };
            Ok(ComponentRow {
                mukey: json_text(field("mukey")?).unwrap_or_default(),
                cokey: json_text(field("cokey")?).unwrap_or_default(),
                compname: json_text(field("compname")?),
                comppct_r: json_number(field("comppct_r")?),
                value: json_number(field("value")?),
            })
        }
        _ => Err(SoilqError::execution("row is neither an array nor an object")),
    }
}

fn json_text(value: &Json) -> Option<String> {
    match value {
        Json::Null => None,
        Json::String(s) => Some(s.clone()),
        Json::Number(n) => Some(n.to_string()),
        Json::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn json_number(value: &Json) -> Option<f64> {
    match value {
        Json::Number(n) => n.as_f64(),
        Json::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
