//! Podcast job state and the keyed job registry.
//!
//! One `PodcastJob` row exists per generation request. While a job runs, its
//! row is mutated only by the pipeline task driving it; any number of status
//! pollers read committed snapshots. Once a job reaches a terminal status it
//! becomes immutable.

use crate::error::{PodkastError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Overall status of a generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Processing,
    Complete,
    Failed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Complete => write!(f, "complete"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "processing" => Ok(JobStatus::Processing),
            "complete" => Ok(JobStatus::Complete),
            "failed" => Ok(JobStatus::Failed),
            _ => Err(format!("Unknown job status: {}", s)),
        }
    }
}

/// Pipeline stage of a generation job.
///
/// Stages only ever advance in declaration order; pollers may miss stages but
/// never observe them out of order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    Retrieving,
    GeneratingScript,
    GeneratingAudio,
    ConcatenatingAudio,
    Done,
}

impl JobStage {
    /// Position in the stage order, used to enforce forward-only advancement.
    pub fn order(&self) -> u8 {
        match self {
            JobStage::Retrieving => 0,
            JobStage::GeneratingScript => 1,
            JobStage::GeneratingAudio => 2,
            JobStage::ConcatenatingAudio => 3,
            JobStage::Done => 4,
        }
    }
}

impl std::fmt::Display for JobStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStage::Retrieving => write!(f, "retrieving"),
            JobStage::GeneratingScript => write!(f, "generating_script"),
            JobStage::GeneratingAudio => write!(f, "generating_audio"),
            JobStage::ConcatenatingAudio => write!(f, "concatenating_audio"),
            JobStage::Done => write!(f, "done"),
        }
    }
}

impl std::str::FromStr for JobStage {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "retrieving" => Ok(JobStage::Retrieving),
            "generating_script" => Ok(JobStage::GeneratingScript),
            "generating_audio" => Ok(JobStage::GeneratingAudio),
            "concatenating_audio" => Ok(JobStage::ConcatenatingAudio),
            "done" => Ok(JobStage::Done),
            _ => Err(format!("Unknown job stage: {}", s)),
        }
    }
}

/// One asynchronous podcast-generation request and its progress/result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodcastJob {
    pub id: String,
    pub document_ids: Vec<String>,
    pub topic: String,
    pub target_duration_minutes: u32,
    pub status: JobStatus,
    pub stage: JobStage,
    pub progress_percent: u8,
    /// Path of the persisted script artifact, set when the script stage completes.
    pub script_path: Option<String>,
    /// Path of the persisted audio artifact, set on completion.
    pub audio_path: Option<String>,
    /// Estimated audio duration in seconds, set on completion.
    pub duration_seconds: Option<f64>,
    /// Error description if the job failed.
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
}

impl PodcastJob {
    /// Create a fresh job in the initial stage.
    pub fn new(id: String, document_ids: Vec<String>, topic: String, duration_minutes: u32) -> Self {
        Self {
            id,
            document_ids,
            topic,
            target_duration_minutes: duration_minutes,
            status: JobStatus::Processing,
            stage: JobStage::Retrieving,
            progress_percent: 0,
            script_path: None,
            audio_path: None,
            duration_seconds: None,
            error: None,
            created_at: Utc::now(),
            completed_at: None,
            failed_at: None,
        }
    }

    /// Whether this job has reached a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, JobStatus::Complete | JobStatus::Failed)
    }
}

/// Keyed in-memory job registry.
///
/// Each job sits behind its own lock, so status polls and stage transitions
/// for unrelated jobs never contend. The outer map lock is held only to look
/// up or insert entries.
pub struct JobRegistry {
    jobs: RwLock<HashMap<String, Arc<RwLock<PodcastJob>>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new job. Fails if the id is already present, which
    /// guarantees at most one pipeline run per job id.
    pub fn create(&self, job: PodcastJob) -> Result<()> {
        let mut jobs = self.jobs.write().unwrap();
        if jobs.contains_key(&job.id) {
            return Err(PodkastError::JobState(format!(
                "Job {} already exists",
                job.id
            )));
        }
        jobs.insert(job.id.clone(), Arc::new(RwLock::new(job)));
        Ok(())
    }

    /// Read the latest committed snapshot of a job.
    pub fn get(&self, job_id: &str) -> Option<PodcastJob> {
        let entry = {
            let jobs = self.jobs.read().unwrap();
            jobs.get(job_id).cloned()
        };
        entry.map(|slot| slot.read().unwrap().clone())
    }

    /// Apply a mutation as a single atomic update and return the new snapshot.
    ///
    /// Terminal jobs are immutable; updating one is an error. Stage changes
    /// must advance forward in stage order.
    pub fn update<F>(&self, job_id: &str, mutate: F) -> Result<PodcastJob>
    where
        F: FnOnce(&mut PodcastJob),
    {
        let entry = {
            let jobs = self.jobs.read().unwrap();
            jobs.get(job_id)
                .cloned()
                .ok_or_else(|| PodkastError::NotFound(format!("Job {}", job_id)))?
        };

        let mut job = entry.write().unwrap();
        if job.is_terminal() {
            return Err(PodkastError::JobState(format!(
                "Job {} is terminal and cannot be updated",
                job_id
            )));
        }

        // Mutate a private copy so a rejected update leaves nothing behind
        // for pollers to observe.
        let mut candidate = job.clone();
        mutate(&mut candidate);

        if candidate.stage.order() < job.stage.order() {
            return Err(PodkastError::JobState(format!(
                "Job {} stage may not regress ({} -> {})",
                job_id, job.stage, candidate.stage
            )));
        }

        *job = candidate.clone();
        Ok(candidate)
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(id: &str) -> PodcastJob {
        PodcastJob::new(
            id.to_string(),
            vec!["doc_1".to_string()],
            "topic".to_string(),
            3,
        )
    }

    #[test]
    fn test_duplicate_create_rejected() {
        let registry = JobRegistry::new();
        registry.create(job("pod_1")).unwrap();
        assert!(registry.create(job("pod_1")).is_err());
    }

    #[test]
    fn test_update_advances_stage() {
        let registry = JobRegistry::new();
        registry.create(job("pod_1")).unwrap();

        let updated = registry
            .update("pod_1", |j| {
                j.stage = JobStage::GeneratingScript;
                j.progress_percent = 40;
            })
            .unwrap();

        assert_eq!(updated.stage, JobStage::GeneratingScript);
        assert_eq!(registry.get("pod_1").unwrap().progress_percent, 40);
    }

    #[test]
    fn test_stage_regression_rejected() {
        let registry = JobRegistry::new();
        registry.create(job("pod_1")).unwrap();
        registry
            .update("pod_1", |j| j.stage = JobStage::GeneratingAudio)
            .unwrap();

        let err = registry
            .update("pod_1", |j| {
                j.stage = JobStage::Retrieving;
                j.progress_percent = 7;
            })
            .unwrap_err();
        assert!(matches!(err, PodkastError::JobState(_)));

        // The rejected update left no trace: pollers still see the prior
        // stage and none of the closure's other writes.
        let snapshot = registry.get("pod_1").unwrap();
        assert_eq!(snapshot.stage, JobStage::GeneratingAudio);
        assert_eq!(snapshot.progress_percent, 0);
    }

    #[test]
    fn test_terminal_job_is_immutable() {
        let registry = JobRegistry::new();
        registry.create(job("pod_1")).unwrap();
        registry
            .update("pod_1", |j| {
                j.status = JobStatus::Failed;
                j.error = Some("boom".to_string());
            })
            .unwrap();

        let err = registry
            .update("pod_1", |j| j.progress_percent = 99)
            .unwrap_err();
        assert!(matches!(err, PodkastError::JobState(_)));

        // Snapshot still reflects the terminal state.
        let snapshot = registry.get("pod_1").unwrap();
        assert_eq!(snapshot.status, JobStatus::Failed);
        assert_eq!(snapshot.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_unknown_job() {
        let registry = JobRegistry::new();
        assert!(registry.get("nope").is_none());
        assert!(registry.update("nope", |_| {}).is_err());
    }
}
