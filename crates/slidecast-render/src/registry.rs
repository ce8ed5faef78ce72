//! In-memory job registry.
//!
//! # Design
//! - A single mutex guards the map; every transition is applied under it so
//!   concurrent readers never observe a partially updated record.
//! - Records only move from `processing` to a terminal state, exactly once.
//! - Nothing is persisted or evicted; the registry lives as long as the process.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::model::{JobId, JobStatus};

/// Registry failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A record with this identifier already exists.
    #[error("job {id} already exists")]
    DuplicateId {
        /// Conflicting identifier.
        id: JobId,
    },
    /// No record exists for the identifier.
    #[error("job {id} not found")]
    NotFound {
        /// Missing identifier.
        id: JobId,
    },
    /// The job already reached a terminal state.
    #[error("job {id} already finished as {status}")]
    AlreadyTerminal {
        /// Job identifier.
        id: JobId,
        /// Terminal status recorded for the job.
        status: JobStatus,
    },
}

/// State of a job; terminal variants carry their payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    /// Render in progress.
    Processing,
    /// Render finished; output available at the path.
    Done {
        /// Output file location.
        output: PathBuf,
    },
    /// Render failed.
    Error {
        /// Human-readable failure description.
        detail: String,
    },
}

impl JobState {
    /// Client-facing status for this state.
    #[must_use]
    pub const fn status(&self) -> JobStatus {
        match self {
            Self::Processing => JobStatus::Processing,
            Self::Done { .. } => JobStatus::Done,
            Self::Error { .. } => JobStatus::Error,
        }
    }
}

/// Snapshot of a single job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    /// Job identifier.
    pub id: JobId,
    /// Current state.
    pub state: JobState,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last transition.
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    /// Client-facing status.
    #[must_use]
    pub const fn status(&self) -> JobStatus {
        self.state.status()
    }

    /// Output location, present only once the job is done.
    #[must_use]
    pub fn output_location(&self) -> Option<&Path> {
        match &self.state {
            JobState::Done { output } => Some(output),
            _ => None,
        }
    }

    /// Failure detail, present only once the job has failed.
    #[must_use]
    pub fn error_detail(&self) -> Option<&str> {
        match &self.state {
            JobState::Error { detail } => Some(detail),
            _ => None,
        }
    }
}

/// Number of jobs per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobCounts {
    /// Jobs still rendering.
    pub processing: usize,
    /// Jobs with output available.
    pub done: usize,
    /// Failed jobs.
    pub error: usize,
}

/// Process-wide map from job identifier to job record.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: Mutex<HashMap<JobId, JobRecord>>,
}

impl JobRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new job in the `processing` state.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateId`] if the identifier is already known.
    pub fn create(&self, id: JobId) -> Result<(), RegistryError> {
        let mut jobs = self.lock_guard();
        if jobs.contains_key(&id) {
            return Err(RegistryError::DuplicateId { id });
        }
        let now = Utc::now();
        jobs.insert(
            id,
            JobRecord {
                id,
                state: JobState::Processing,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(())
    }

    /// Mark a job as done with the given output location.
    ///
    /// # Errors
    ///
    /// Returns an error if the job is unknown or already terminal.
    pub fn complete(&self, id: JobId, output: PathBuf) -> Result<(), RegistryError> {
        self.transition(id, JobState::Done { output })
    }

    /// Mark a job as failed with a human-readable detail.
    ///
    /// # Errors
    ///
    /// Returns an error if the job is unknown or already terminal.
    pub fn fail(&self, id: JobId, detail: impl Into<String>) -> Result<(), RegistryError> {
        self.transition(
            id,
            JobState::Error {
                detail: detail.into(),
            },
        )
    }

    /// Fetch a snapshot of a job record.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] if the identifier is unknown.
    pub fn get(&self, id: JobId) -> Result<JobRecord, RegistryError> {
        self.lock_guard()
            .get(&id)
            .cloned()
            .ok_or(RegistryError::NotFound { id })
    }

    /// Count jobs per status.
    #[must_use]
    pub fn counts(&self) -> JobCounts {
        self.lock_guard()
            .values()
            .fold(JobCounts::default(), |mut counts, record| {
                match record.status() {
                    JobStatus::Processing => counts.processing += 1,
                    JobStatus::Done => counts.done += 1,
                    JobStatus::Error => counts.error += 1,
                }
                counts
            })
    }

    fn transition(&self, id: JobId, next: JobState) -> Result<(), RegistryError> {
        let mut jobs = self.lock_guard();
        let record = jobs.get_mut(&id).ok_or(RegistryError::NotFound { id })?;
        if record.state != JobState::Processing {
            return Err(RegistryError::AlreadyTerminal {
                id,
                status: record.status(),
            });
        }
        record.state = next;
        record.updated_at = Utc::now();
        Ok(())
    }

    fn lock_guard(&self) -> MutexGuard<'_, HashMap<JobId, JobRecord>> {
        // Every mutation is a single assignment, so a poisoned map is still consistent.
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
