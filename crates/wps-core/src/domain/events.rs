use crate::domain::description::ProcessId;
use crate::domain::job::{ExecutionFailure, JobId};
use chrono::{DateTime, Utc};
use std::fmt::Debug;

/// Lifecycle event of a job
pub trait JobEvent: Debug + Send + Sync {
    /// Returns the type of the event as a string
    fn event_type(&self) -> &'static str;

    /// Returns the job this event is associated with
    fn job_id(&self) -> &JobId;

    /// Returns the timestamp when the event occurred
    fn timestamp(&self) -> DateTime<Utc>;
}

/// Event: Job accepted
#[derive(Debug)]
pub struct JobAccepted {
    /// The job
    pub job_id: JobId,

    /// The process the job runs
    pub process_id: ProcessId,

    /// The timestamp when the job was created
    pub timestamp: DateTime<Utc>,
}

impl JobEvent for JobAccepted {
    fn event_type(&self) -> &'static str {
        "job.accepted"
    }

    fn job_id(&self) -> &JobId {
        &self.job_id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Event: Job started running
#[derive(Debug)]
pub struct JobStarted {
    /// The job
    pub job_id: JobId,
    /// The timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
}

impl JobEvent for JobStarted {
    fn event_type(&self) -> &'static str {
        "job.started"
    }

    fn job_id(&self) -> &JobId {
        &self.job_id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Event: Job succeeded
#[derive(Debug)]
pub struct JobSucceeded {
    /// The job
    pub job_id: JobId,

    /// Number of rendered outputs
    pub output_count: usize,

    /// The timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
}

impl JobEvent for JobSucceeded {
    fn event_type(&self) -> &'static str {
        "job.succeeded"
    }

    fn job_id(&self) -> &JobId {
        &self.job_id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Event: Job failed
#[derive(Debug)]
pub struct JobFailed {
    /// The job
    pub job_id: JobId,

    /// What went wrong
    pub failure: ExecutionFailure,

    /// The timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
}

impl JobEvent for JobFailed {
    fn event_type(&self) -> &'static str {
        "job.failed"
    }

    fn job_id(&self) -> &JobId {
        &self.job_id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Event: Job cancelled
#[derive(Debug)]
pub struct JobCancelled {
    /// The job
    pub job_id: JobId,
    /// The timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
}

impl JobEvent for JobCancelled {
    fn event_type(&self) -> &'static str {
        "job.cancelled"
    }

    fn job_id(&self) -> &JobId {
        &self.job_id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}
