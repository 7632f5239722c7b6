use crate::types::{ParagraphImages, StatusResponse};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc, time::{Duration, Instant}};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus { Pending, Running, Completed, Failed }

/// Finished jobs older than this are dropped when a new job is queued.
pub const FINISHED_JOB_TTL: Duration = Duration::from_secs(60 * 60);

/// Background image generation for one script.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub status: JobStatus,
    pub progress: u32,
    pub total: u32,
    pub results: Vec<ParagraphImages>,
    pub error: Option<String>,
    pub created_at: Instant,
}

impl Job {
    pub fn new(total: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            status: JobStatus::Pending,
            progress: 0,
            total: total as u32,
            results: Vec::new(),
            error: None,
            created_at: Instant::now(),
        }
    }

    /// Failed when no paragraph produced an image, carrying the first error.
    pub fn finish(&mut self) {
        if self.results.iter().all(|r| r.urls.is_empty()) {
            self.status = JobStatus::Failed;
            self.error = self
                .results
                .iter()
                .find_map(|r| r.error.clone())
                .or_else(|| Some("No images generated".into()));
        } else {
            self.status = JobStatus::Completed;
        }
    }

    fn is_finished(&self) -> bool {
        matches!(self.status, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn to_status_response(&self) -> StatusResponse {
        StatusResponse {
            status: match self.status {
                JobStatus::Pending => "PENDING".into(),
                JobStatus::Running => "RUNNING".into(),
                JobStatus::Completed => "COMPLETED".into(),
                JobStatus::Failed => "FAILED".into(),
            },
            progress: self.progress,
            total: self.total,
            results: self.results.clone(),
            error: self.error.clone(),
        }
    }
}

#[derive(Clone, Default)]
pub struct JobStore(pub Arc<RwLock<HashMap<Uuid, Job>>>);

impl JobStore {
    pub async fn insert(&self, job: Job) -> Uuid {
        let id = job.id;
        self.0.write().await.insert(id, job);
        id
    }
    pub async fn get(&self, id: &Uuid) -> Option<Job> { self.0.read().await.get(id).cloned() }
    pub async fn update<F: FnOnce(&mut Job)>(&self, id: &Uuid, f: F) {
        if let Some(job) = self.0.write().await.get_mut(id) { f(job); }
    }
    pub async fn evict_finished(&self, ttl: Duration) -> usize {
        let mut jobs = self.0.write().await;
        let before = jobs.len();
        jobs.retain(|_, j| !(j.is_finished() && j.created_at.elapsed() >= ttl));
        before - jobs.len()
    }
}
