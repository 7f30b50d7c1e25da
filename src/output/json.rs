//! JSON output formatting
//!
//! Every JSON document is `{ "data": ..., "meta": ... }`. Commands that ran the
//! worker also report which cache generation answered and the state it ended in.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::worker::WorkerState;

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonOutput<T> {
    pub data: T,
    pub meta: Metadata,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Metadata {
    /// RFC 3339 time the document was produced
    pub generated_at: String,

    pub cli_version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker: Option<WorkerMeta>,
}

/// Worker context of a command that delivered an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerMeta {
    pub cache_version: String,
    pub static_cache: String,
    pub api_cache: String,
    /// State after the event was handled
    pub state: WorkerState,
}

impl<T> JsonOutput<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            meta: Metadata {
                generated_at: Utc::now().to_rfc3339(),
                cli_version: env!("CARGO_PKG_VERSION").to_string(),
                worker: None,
            },
        }
    }

    pub fn with_worker(mut self, worker: WorkerMeta) -> Self {
        self.meta.worker = Some(worker);
        self
    }
}

/// Format data as pretty-printed JSON
pub fn format_json<T: Serialize + ?Sized>(data: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&JsonOutput::new(data))
}

/// Format data as pretty-printed JSON, tagged with the worker that produced it
pub fn format_worker_json<T: Serialize + ?Sized>(
    data: &T,
    worker: &WorkerMeta,
) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&JsonOutput::new(data).with_worker(worker.clone()))
}
