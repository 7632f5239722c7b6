use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::warn;
use url::Url;
use uuid::Uuid;

use crate::types::VideoParams;

/// The pipeline that turns params into rendered videos.
///
/// A successful run returns an object with a `videos` array. `Ok(None)` or a
/// value without `videos` means the run failed.
#[async_trait]
pub trait TaskOrchestrator: Send + Sync {
    async fn start(&self, task_id: Uuid, params: VideoParams) -> Result<Option<Value>>;
}

#[derive(Serialize)]
struct StartTask {
    task_id: Uuid,
    params: VideoParams,
}

/// Orchestrator reached over HTTP; blocks until the task finishes.
pub struct HttpOrchestrator {
    http: reqwest::Client,
    endpoint: Url,
}

impl HttpOrchestrator {
    pub fn new(endpoint: Url) -> Result<Self> {
        // Rendering takes minutes; only guard against a dead connection.
        let http = reqwest::Client::builder().connect_timeout(Duration::from_secs(10)).build()?;
        Ok(Self { http, endpoint })
    }
}

#[async_trait]
impl TaskOrchestrator for HttpOrchestrator {
    async fn start(&self, task_id: Uuid, params: VideoParams) -> Result<Option<Value>> {
        let resp = self
            .http
            .post(self.endpoint.clone())
            .json(&StartTask { task_id, params })
            .send()
            .await
            .context("task orchestrator unreachable")?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            warn!(%task_id, %status, body = %text, "task orchestrator rejected task");
            return Ok(None);
        }
        let value: Value = resp.json().await.context("task result is not JSON")?;
        Ok(match value {
            Value::Null | Value::Bool(false) => None,
            other => Some(other),
        })
    }
}
