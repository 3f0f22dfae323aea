// SYNOID Chaos Render Queue
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Runs renders off the caller's thread. Each job is its own task with its own
// workspace and RNG; only the status table is shared.

use crate::config::EngineSettings;
use crate::engine::MediaEngine;
use crate::pipeline::{PipelineExecutor, ProgressCallback, RenderRequest};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum JobStatus {
    Queued,
    Processing,
    Completed { duration_secs: f64, applied: usize },
    Failed(String),
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed(_))
    }
}

#[derive(Debug, Clone)]
struct RenderJob {
    id: Uuid,
    request: RenderRequest,
    status: JobStatus,
}

pub struct RenderQueue {
    engine: Arc<dyn MediaEngine>,
    settings: EngineSettings,
    jobs: Arc<Mutex<Vec<RenderJob>>>,
    progress_callback: Option<ProgressCallback>,
}

impl RenderQueue {
    pub fn new(engine: Arc<dyn MediaEngine>, settings: EngineSettings) -> Self {
        Self {
            engine,
            settings,
            jobs: Arc::new(Mutex::new(Vec::new())),
            progress_callback: None,
        }
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Queue a render and start it immediately in the background.
    ///
    /// `seed` makes every random decision of the render reproducible.
    pub async fn submit(&self, request: RenderRequest, seed: Option<u64>) -> (Uuid, JoinHandle<()>) {
        let id = Uuid::new_v4();
        {
            let mut jobs = self.jobs.lock().await;
            jobs.push(RenderJob {
                id,
                request: request.clone(),
                status: JobStatus::Queued,
            });
        }
        info!("[QUEUE] Added job {}: {:?} -> {:?}", id, request.input, request.output);

        let jobs = self.jobs.clone();
        let mut executor = PipelineExecutor::new(self.engine.clone(), &self.settings);
        if let Some(ref callback) = self.progress_callback {
            executor = executor.with_progress(callback.clone());
        }

        let handle = tokio::spawn(async move {
            set_status(&jobs, id, JobStatus::Processing).await;
            let started = Instant::now();
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };

            let status = match executor.render(&request, &mut rng).await {
                Ok(summary) => {
                    info!("[QUEUE] Job {} completed: {:?}", id, summary.output);
                    JobStatus::Completed {
                        duration_secs: started.elapsed().as_secs_f64(),
                        applied: summary.applied.len(),
                    }
                }
                Err(e) => {
                    error!("[QUEUE] Job {} failed: {}", id, e);
                    JobStatus::Failed(e.to_string())
                }
            };
            set_status(&jobs, id, status).await;
        });

        (id, handle)
    }

    pub async fn status(&self, id: Uuid) -> Option<JobStatus> {
        let jobs = self.jobs.lock().await;
        jobs.iter().find(|j| j.id == id).map(|j| j.status.clone())
    }

    /// Every job with its output path and current status, in submission order.
    pub async fn list(&self) -> Vec<(Uuid, PathBuf, JobStatus)> {
        let jobs = self.jobs.lock().await;
        jobs.iter()
            .map(|j| (j.id, j.request.output.clone(), j.status.clone()))
            .collect()
    }

    /// Drop completed and failed jobs from the table, returning how many were removed.
    pub async fn prune_finished(&self) -> usize {
        let mut jobs = self.jobs.lock().await;
        let before = jobs.len();
        jobs.retain(|j| !j.status.is_finished());
        let removed = before - jobs.len();
        if removed > 0 {
            info!("[QUEUE] Pruned {} finished jobs", removed);
        }
        removed
    }
}

async fn set_status(jobs: &Mutex<Vec<RenderJob>>, id: Uuid, status: JobStatus) {
    let mut jobs = jobs.lock().await;
    if let Some(job) = jobs.iter_mut().find(|j| j.id == id) {
        job.status = status;
    }
}
