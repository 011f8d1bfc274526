use crate::domain::data::{ProcessOutputs, TypedData};
use crate::domain::description::ProcessId;
use crate::domain::events::{
    JobAccepted, JobCancelled, JobEvent, JobFailed, JobStarted, JobSucceeded,
};
use crate::domain::request::ExecuteRequest;
use crate::domain::response::{EncodedData, ExecuteResponse};
use crate::error::InvalidTransition;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Value object: Job ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Fresh random identifier
    pub fn generate() -> Self {
        JobId(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Job state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Job is queued
    Accepted,

    /// Algorithm is running
    Running,

    /// Outputs were rendered
    Succeeded,

    /// Algorithm or rendering failed
    Failed,

    /// Job was cancelled before completing
    Cancelled,
}

impl JobState {
    /// Whether no further transition is possible
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Succeeded | JobState::Failed | JobState::Cancelled
        )
    }
}

/// Progress reported by a running algorithm
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Completion percentage, `0..=100`
    pub percent: u8,

    /// Optional status message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Where a job failure originated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The algorithm returned an error
    Algorithm,
    /// Output rendering failed after the algorithm succeeded
    Render,
    /// The algorithm panicked
    Panic,
    /// The job state could not be stored
    Storage,
}

/// Failure detail of a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionFailure {
    /// Origin of the failure
    pub kind: FailureKind,
    /// Human readable message
    pub message: String,
}

impl ExecutionFailure {
    /// Create a failure
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ExecutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// Aggregate: one execution of a process
#[derive(Debug)]
pub struct Job {
    /// Unique identifier
    pub id: JobId,

    /// The request that created the job
    pub request: Arc<ExecuteRequest>,

    /// Process being executed
    pub process_id: ProcessId,

    /// Current state
    pub state: JobState,

    /// Last reported progress
    pub progress: Progress,

    /// Outputs published before completion
    pub partial_outputs: ProcessOutputs,

    /// Rendered response once succeeded
    pub response: Option<ExecuteResponse>,

    /// Bodies of by-reference outputs, keyed by output identifier
    pub references: HashMap<String, EncodedData>,

    /// Failure detail once failed
    pub failure: Option<ExecutionFailure>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last updated timestamp
    pub updated_at: DateTime<Utc>,

    /// When a terminal state was reached
    pub finished_at: Option<DateTime<Utc>>,

    /// Lifecycle events not yet dispatched
    pub events: Vec<Box<dyn JobEvent>>,
}

impl Clone for Job {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            request: self.request.clone(),
            process_id: self.process_id.clone(),
            state: self.state,
            progress: self.progress.clone(),
            partial_outputs: self.partial_outputs.clone(),
            response: self.response.clone(),
            references: self.references.clone(),
            failure: self.failure.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            finished_at: self.finished_at,
            events: Vec::new(), // events are dispatched once, by the owner
        }
    }
}

impl Job {
    /// Create an accepted job for a request
    pub fn new(request: Arc<ExecuteRequest>) -> Self {
        let id = JobId::generate();
        let process_id = request.process_id().clone();
        let now = Utc::now();

        let mut job = Self {
            id: id.clone(),
            request,
            process_id: process_id.clone(),
            state: JobState::Accepted,
            progress: Progress::default(),
            partial_outputs: ProcessOutputs::new(),
            response: None,
            references: HashMap::new(),
            failure: None,
            created_at: now,
            updated_at: now,
            finished_at: None,
            events: Vec::with_capacity(4),
        };

        job.record_event(Box::new(JobAccepted {
            job_id: id,
            process_id,
            timestamp: now,
        }));

        job
    }

    fn transition(&mut self, to: JobState) -> Result<(), InvalidTransition> {
        let allowed = match (self.state, to) {
            (JobState::Accepted, JobState::Running) => true,
            (JobState::Running, JobState::Succeeded) => true,
            (JobState::Accepted | JobState::Running, JobState::Failed) => true,
            (JobState::Accepted | JobState::Running, JobState::Cancelled) => true,
            _ => false,
        };
        if !allowed {
            return Err(InvalidTransition {
                job_id: self.id.clone(),
                from: self.state,
                to,
            });
        }

        self.state = to;
        self.update_timestamp();
        if to.is_terminal() {
            self.finished_at = Some(self.updated_at);
        }
        Ok(())
    }

    /// Update the timestamp
    #[inline]
    pub fn update_timestamp(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Move to `Running`
    pub fn start(&mut self) -> Result<(), InvalidTransition> {
        self.transition(JobState::Running)?;
        self.record_event(Box::new(JobStarted {
            job_id: self.id.clone(),
            timestamp: self.updated_at,
        }));
        Ok(())
    }

    /// Store progress reported by the algorithm
    pub fn record_progress(&mut self, mut progress: Progress) -> Result<(), InvalidTransition> {
        self.ensure_running()?;
        progress.percent = progress.percent.min(100);
        self.progress = progress;
        self.update_timestamp();
        Ok(())
    }

    /// Store an output published before completion
    pub fn record_partial_output(
        &mut self,
        id: impl Into<String>,
        value: TypedData,
    ) -> Result<(), InvalidTransition> {
        self.ensure_running()?;
        self.partial_outputs.insert(id.into(), value);
        self.update_timestamp();
        Ok(())
    }

    fn ensure_running(&self) -> Result<(), InvalidTransition> {
        if self.state == JobState::Running {
            Ok(())
        } else {
            Err(InvalidTransition {
                job_id: self.id.clone(),
                from: self.state,
                to: JobState::Running,
            })
        }
    }

    /// Move to `Succeeded` with the rendered response
    pub fn succeed(
        &mut self,
        response: ExecuteResponse,
        references: HashMap<String, EncodedData>,
    ) -> Result<(), InvalidTransition> {
        self.transition(JobState::Succeeded)?;
        self.progress.percent = 100;
        self.record_event(Box::new(JobSucceeded {
            job_id: self.id.clone(),
            output_count: response.outputs().len(),
            timestamp: self.updated_at,
        }));
        self.response = Some(response);
        self.references = references;
        Ok(())
    }

    /// Move to `Failed`
    pub fn fail(&mut self, failure: ExecutionFailure) -> Result<(), InvalidTransition> {
        self.transition(JobState::Failed)?;
        self.record_event(Box::new(JobFailed {
            job_id: self.id.clone(),
            failure: failure.clone(),
            timestamp: self.updated_at,
        }));
        self.failure = Some(failure);
        Ok(())
    }

    /// Move to `Cancelled`
    pub fn cancel(&mut self) -> Result<(), InvalidTransition> {
        self.transition(JobState::Cancelled)?;
        self.record_event(Box::new(JobCancelled {
            job_id: self.id.clone(),
            timestamp: self.updated_at,
        }));
        Ok(())
    }

    /// Whether the retention window after the terminal state has elapsed
    pub fn is_expired(&self, now: DateTime<Utc>, retention: Duration) -> bool {
        match self.finished_at {
            Some(finished) => (now - finished)
                .to_std()
                .map_or(false, |elapsed| elapsed >= retention),
            None => false,
        }
    }

    /// Record a lifecycle event
    pub fn record_event(&mut self, event: Box<dyn JobEvent>) {
        self.events.push(event);
    }

    /// Get and clear all lifecycle events
    pub fn take_events(&mut self) -> Vec<Box<dyn JobEvent>> {
        std::mem::take(&mut self.events)
    }

    /// Read-only view handed to callers
    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            job_id: self.id.clone(),
            process_id: self.process_id.clone(),
            state: self.state,
            progress: self.progress.clone(),
            partial_outputs: self.partial_outputs.clone(),
            response: self.response.clone(),
            failure: self.failure.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            finished_at: self.finished_at,
        }
    }
}

/// Point-in-time view of a job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    /// The job
    pub job_id: JobId,
    /// Process being executed
    pub process_id: ProcessId,
    /// State at the time of the snapshot
    pub state: JobState,
    /// Last reported progress
    pub progress: Progress,
    /// Outputs published before completion
    pub partial_outputs: ProcessOutputs,
    /// Rendered response once succeeded
    pub response: Option<ExecuteResponse>,
    /// Failure detail once failed
    pub failure: Option<ExecutionFailure>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last updated timestamp
    pub updated_at: DateTime<Utc>,
    /// When a terminal state was reached
    pub finished_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::response::{OutputPayload, RenderedOutput};

    fn job() -> Job {
        Job::new(Arc::new(ExecuteRequest::builder("echo").build()))
    }

    fn response() -> ExecuteResponse {
        ExecuteResponse::Document {
            outputs: vec![RenderedOutput {
                id: "msg".to_string(),
                payload: OutputPayload::Literal(crate::domain::data::TypedLiteral {
                    value: crate::types::LiteralValue::String("hi".to_string()),
                    uom: None,
                }),
            }],
        }
    }

    #[test]
    fn test_happy_path_records_events() {
        let mut job = job();
        assert_eq!(job.state, JobState::Accepted);

        job.start().unwrap();
        job.record_progress(Progress {
            percent: 150,
            message: Some("almost".to_string()),
        })
        .unwrap();
        assert_eq!(job.progress.percent, 100);

        job.succeed(response(), HashMap::new()).unwrap();
        assert_eq!(job.state, JobState::Succeeded);
        assert!(job.finished_at.is_some());

        let events: Vec<_> = job.take_events().iter().map(|e| e.event_type()).collect();
        assert_eq!(events, vec!["job.accepted", "job.started", "job.succeeded"]);
        assert!(job.take_events().is_empty());
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut job = job();
        job.start().unwrap();
        job.succeed(response(), HashMap::new()).unwrap();

        let err = job.cancel().unwrap_err();
        assert_eq!(err.from, JobState::Succeeded);
        assert_eq!(err.to, JobState::Cancelled);
        assert!(job
            .fail(ExecutionFailure::new(FailureKind::Algorithm, "late"))
            .is_err());
        assert!(job.response.is_some());
    }

    #[test]
    fn test_cannot_succeed_before_running() {
        let mut job = job();
        assert!(job.succeed(response(), HashMap::new()).is_err());
        assert!(job
            .record_partial_output("msg", TypedData::string("early"))
            .is_err());
        job.cancel().unwrap();
        assert_eq!(job.state, JobState::Cancelled);
    }

    #[test]
    fn test_clone_drops_events() {
        let job = job();
        assert_eq!(job.events.len(), 1);
        assert!(job.clone().events.is_empty());
    }

    #[test]
    fn test_expiry_counts_from_terminal_state() {
        let mut job = job();
        let retention = Duration::from_secs(60);
        assert!(!job.is_expired(Utc::now() + chrono::Duration::hours(1), retention));

        job.fail(ExecutionFailure::new(FailureKind::Panic, "boom"))
            .unwrap();
        let finished = job.finished_at.unwrap();
        assert!(!job.is_expired(finished + chrono::Duration::seconds(59), retention));
        assert!(job.is_expired(finished + chrono::Duration::seconds(60), retention));
    }
}
