use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::{Method, Url};
use tracing::{debug, warn};

use super::{RecordStore, StoreError};
use crate::model::{Record, RecordFields, RecordId};

const PREFER_REPRESENTATION: &str = "return=representation";

#[derive(Clone, Debug)]
pub struct SupabaseSettings {
    pub endpoint: String,
    pub access_key: String,
    pub table: String,
    pub timeout: Option<Duration>,
    pub proxy: Option<String>,
}

/// REST client for a PostgREST table exposed under `<endpoint>/rest/v1/`.
#[derive(Clone, Debug)]
pub struct SupabaseStore {
    client: reqwest::Client,
    table_url: Url,
}

impl SupabaseStore {
    pub fn new(settings: &SupabaseSettings) -> Result<Self, StoreError> {
        let table_url = table_url(&settings.endpoint, &settings.table)?;
        let client = build_client(settings)?;
        Ok(Self { client, table_url })
    }

    pub fn table_url(&self) -> &Url {
        &self.table_url
    }

    fn request(&self, method: Method) -> reqwest::RequestBuilder {
        self.client.request(method, self.table_url.clone())
    }
}

fn table_url(endpoint: &str, table: &str) -> Result<Url, StoreError> {
    let raw = format!(
        "{}/rest/v1/{}",
        endpoint.trim().trim_end_matches('/'),
        table.trim()
    );
    Url::parse(&raw).map_err(|e| StoreError::InvalidEndpoint {
        url: endpoint.to_string(),
        message: e.to_string(),
    })
}

fn build_client(settings: &SupabaseSettings) -> Result<reqwest::Client, StoreError> {
    let key = HeaderValue::from_str(settings.access_key.trim())
        .map_err(|_| StoreError::InvalidAccessKey)?;
    let bearer = HeaderValue::from_str(&format!("Bearer {}", settings.access_key.trim()))
        .map_err(|_| StoreError::InvalidAccessKey)?;

    let mut headers = HeaderMap::new();
    headers.insert("apikey", key);
    headers.insert(AUTHORIZATION, bearer);
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static(concat!("prodcontrol/", env!("CARGO_PKG_VERSION"))),
    );

    let mut builder = reqwest::Client::builder().default_headers(headers);
    if let Some(timeout) = settings.timeout {
        builder = builder.timeout(timeout);
    }
    if let Some(proxy) = settings.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
        let proxy = reqwest::Proxy::all(proxy).map_err(|e| StoreError::ProxySetup {
            proxy: proxy.to_string(),
            source: e,
        })?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| StoreError::HttpClientBuild { source: e })
}

fn id_filter(id: &RecordId) -> [(&'static str, String); 1] {
    [("id", format!("eq.{id}"))]
}

/// Pulls `message` out of a PostgREST error object, falling back to the raw body.
fn remote_message(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(message) = value.get("message").and_then(|m| m.as_str()) {
            return message.to_string();
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    } else {
        trimmed.to_string()
    }
}

async fn read_body(
    operation: &'static str,
    response: reqwest::Response,
) -> Result<String, StoreError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| StoreError::Transport {
            operation,
            source: e,
        })?;
    if !status.is_success() {
        let message = remote_message(status, &body);
        warn!(operation, status = status.as_u16(), %message, "store rejected request");
        return Err(StoreError::Remote {
            operation,
            status: status.as_u16(),
            message,
        });
    }
    Ok(body)
}

fn decode_rows(operation: &'static str, body: &str) -> Result<Vec<Record>, StoreError> {
    serde_json::from_str::<Vec<Record>>(body).map_err(|e| StoreError::Decode {
        operation,
        source: e,
    })
}

async fn send(
    operation: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<reqwest::Response, StoreError> {
    request.send().await.map_err(|e| StoreError::Transport {
        operation,
        source: e,
    })
}

#[async_trait]
impl RecordStore for SupabaseStore {
    async fn fetch_all(&self) -> Result<Vec<Record>, StoreError> {
        const OP: &str = "fetch";
        debug!(url = %self.table_url, "fetching all records");
        let response = send(OP, self.request(Method::GET).query(&[("select", "*")])).await?;
        let body = read_body(OP, response).await?;
        let rows = decode_rows(OP, &body)?;
        debug!(count = rows.len(), "fetched records");
        Ok(rows)
    }

    async fn insert(&self, fields: &RecordFields) -> Result<Record, StoreError> {
        const OP: &str = "insert";
        debug!(producto = %fields.product, "inserting record");
        let request = self
            .request(Method::POST)
            .header("Prefer", PREFER_REPRESENTATION)
            .json(&[fields]);
        let response = send(OP, request).await?;
        let body = read_body(OP, response).await?;
        decode_rows(OP, &body)?
            .into_iter()
            .next()
            .ok_or(StoreError::EmptyResponse { operation: OP })
    }

    async fn update(&self, id: &RecordId, fields: &RecordFields) -> Result<Record, StoreError> {
        const OP: &str = "update";
        debug!(%id, "updating record");
        let request = self
            .request(Method::PATCH)
            .query(&id_filter(id))
            .header("Prefer", PREFER_REPRESENTATION)
            .json(fields);
        let response = send(OP, request).await?;
        let body = read_body(OP, response).await?;
        decode_rows(OP, &body)?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound { id: id.clone() })
    }

    async fn delete(&self, id: &RecordId) -> Result<(), StoreError> {
        const OP: &str = "delete";
        debug!(%id, "deleting record");
        let response = send(OP, self.request(Method::DELETE).query(&id_filter(id))).await?;
        read_body(OP, response).await?;
        Ok(())
    }
}
