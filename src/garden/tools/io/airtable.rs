//! Access to the remote table service.
//!
//! The service reports failures as JSON payloads carrying an `error` member
//! instead of failing the request, so every call hands the payload back as a
//! value and callers inspect it with `error_message`.

use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::garden::tools::error::{Result, ToolError};
use crate::garden::tools::model::{Fields, RemoteRecord};

/// Default endpoint of the hosted service.
pub const DEFAULT_API_URL: &str = "https://api.airtable.com/v0";

/// Blocking list/create/update/delete access to one base.
pub trait TableClient {
    /// Fetches one page of records, continuing from `offset`.
    fn list(&self, table: &str, offset: Option<&str>) -> Result<ListPage>;

    fn create(&self, table: &str, fields: &Fields) -> Result<WriteResponse>;

    fn update(&self, table: &str, record_id: &str, fields: &Fields) -> Result<WriteResponse>;

    fn delete(&self, table: &str, record_id: &str) -> Result<WriteResponse>;
}

/// A page of records plus the continuation token, if more pages exist.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListPage {
    #[serde(default)]
    pub records: Vec<RemoteRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl ListPage {
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(describe_error)
    }
}

/// Raw payload returned by a write call.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteResponse(pub Value);

impl WriteResponse {
    /// Message of the error payload, if the call failed.
    pub fn error_message(&self) -> Option<String> {
        self.0.get("error").map(describe_error)
    }
}

/// Error payloads come either as `{"type", "message"}` objects or as a bare
/// code string.
fn describe_error(error: &Value) -> String {
    match error {
        Value::String(code) => code.clone(),
        Value::Object(body) => body
            .get("message")
            .and_then(Value::as_str)
            .or_else(|| body.get("type").and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string()),
        other => other.to_string(),
    }
}

/// HTTP implementation of [`TableClient`].
#[derive(Debug, Clone)]
pub struct AirtableClient {
    http: Client,
    base_url: Url,
    api_key: String,
}

impl AirtableClient {
    pub fn new(api_url: &str, base_id: &str, api_key: &str) -> Result<Self> {
        let mut base_url = Url::parse(api_url)
            .map_err(|error| ToolError::Config(format!("invalid API URL '{api_url}': {error}")))?;
        base_url
            .path_segments_mut()
            .map_err(|_| ToolError::Config(format!("API URL '{api_url}' cannot be a base")))?
            .pop_if_empty()
            .push(base_id);

        let http = Client::builder().timeout(Duration::from_secs(60)).build()?;
        Ok(Self {
            http,
            base_url,
            api_key: api_key.to_string(),
        })
    }

    fn table_url(&self, table: &str, record_id: Option<&str>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(table);
            if let Some(id) = record_id {
                segments.push(id);
            }
        }
        url
    }

    fn send(&self, request: RequestBuilder) -> Result<Value> {
        let response = request.bearer_auth(&self.api_key).send()?;
        let status = response.status();
        let body = response.text()?;
        debug!(%status, bytes = body.len(), "table service responded");
        if body.trim().is_empty() {
            return Ok(if status.is_success() {
                json!({})
            } else {
                json!({ "error": { "type": status.as_str(), "message": status.to_string() } })
            });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

impl TableClient for AirtableClient {
    fn list(&self, table: &str, offset: Option<&str>) -> Result<ListPage> {
        let mut request = self.http.get(self.table_url(table, None));
        if let Some(offset) = offset {
            request = request.query(&[("offset", offset)]);
        }
        let body = self.send(request)?;
        Ok(serde_json::from_value(body)?)
    }

    fn create(&self, table: &str, fields: &Fields) -> Result<WriteResponse> {
        let request = self
            .http
            .post(self.table_url(table, None))
            .json(&json!({ "fields": fields }));
        self.send(request).map(WriteResponse)
    }

    fn update(&self, table: &str, record_id: &str, fields: &Fields) -> Result<WriteResponse> {
        let request = self
            .http
            .patch(self.table_url(table, Some(record_id)))
            .json(&json!({ "fields": fields }));
        self.send(request).map(WriteResponse)
    }

    fn delete(&self, table: &str, record_id: &str) -> Result<WriteResponse> {
        let request = self.http.delete(self.table_url(table, Some(record_id)));
        self.send(request).map(WriteResponse)
    }
}
