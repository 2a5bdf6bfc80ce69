//! Boundary to the hosted `control` table.

pub mod memory;
pub mod supabase;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{Record, RecordFields, RecordId};

pub use memory::MemoryStore;
pub use supabase::SupabaseStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid store endpoint: {url}: {message}")]
    InvalidEndpoint { url: String, message: String },

    #[error("access key is not a valid header value")]
    InvalidAccessKey,

    #[error("failed to build HTTP client: {source}")]
    HttpClientBuild {
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to setup proxy: {proxy}: {source}")]
    ProxySetup {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {operation} failed: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{operation} rejected by store ({status}): {message}")]
    Remote {
        operation: &'static str,
        status: u16,
        message: String,
    },

    #[error("failed to decode {operation} response: {source}")]
    Decode {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{operation} returned no rows")]
    EmptyResponse { operation: &'static str },

    #[error("no record with id {id}")]
    NotFound { id: RecordId },
}

/// CRUD surface the tracker consumes. Calls are single attempts: no retry,
/// no transaction, no concurrency token.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<Record>, StoreError>;

    async fn insert(&self, fields: &RecordFields) -> Result<Record, StoreError>;

    async fn update(&self, id: &RecordId, fields: &RecordFields) -> Result<Record, StoreError>;

    async fn delete(&self, id: &RecordId) -> Result<(), StoreError>;
}
