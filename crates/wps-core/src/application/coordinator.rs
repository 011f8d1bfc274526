use crate::application::binding::DataBinder;
use crate::application::execution_context::{ExecutionContext, JobUpdate};
use crate::application::registry::AlgorithmRegistry;
use crate::domain::data::BoundInputs;
use crate::domain::description::{ProcessDescription, ProcessId};
use crate::domain::events::JobEvent;
use crate::domain::job::{ExecutionFailure, FailureKind, Job, JobId, JobSnapshot};
use crate::domain::repository::JobRepository;
use crate::domain::request::{ExecuteRequest, ExecutionMode, ResponseMode};
use crate::domain::response::{EncodedData, ExecuteResponse};
use crate::error::{
    AlgorithmError, CancelError, DispatchError, InvalidTransition, JobError, RepositoryError,
};
use crate::{Algorithm, ExecutionCapability};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Handler for job lifecycle events
#[async_trait]
pub trait JobEventHandler: Send + Sync {
    /// Handle a job event
    async fn handle_event(&self, event: Box<dyn JobEvent>);
}

/// Event handler that logs every event
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventHandler;

#[async_trait]
impl JobEventHandler for TracingEventHandler {
    async fn handle_event(&self, event: Box<dyn JobEvent>) {
        info!(
            event = event.event_type(),
            job_id = %event.job_id(),
            timestamp = %event.timestamp(),
            "Job event"
        );
    }
}

/// Coordinator settings
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorConfig {
    /// How long terminal jobs stay queryable
    pub retention: Duration,
    /// Prefix of by-reference output locations
    pub reference_base: String,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            retention: Duration::from_secs(3600),
            reference_base: "/jobs".to_string(),
        }
    }
}

/// What `submit` hands back
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionHandle {
    /// The job ran on the caller's task and reached a terminal state
    Completed(JobSnapshot),
    /// The job was queued; poll its status
    Accepted(JobId),
}

impl ExecutionHandle {
    /// Identifier of the job behind the handle
    pub fn job_id(&self) -> &JobId {
        match self {
            ExecutionHandle::Completed(snapshot) => &snapshot.job_id,
            ExecutionHandle::Accepted(job_id) => job_id,
        }
    }
}

/// What a job needs to run, resolved once at submission
struct RunPlan {
    description: Arc<ProcessDescription>,
    algorithm: Arc<dyn Algorithm>,
    inputs: Arc<BoundInputs>,
}

/// Drives execute requests from submission to a terminal job state
#[derive(Clone)]
pub struct ExecutionCoordinator {
    registry: Arc<AlgorithmRegistry>,
    binder: DataBinder,
    jobs: Arc<dyn JobRepository>,
    cancellations: Arc<DashMap<JobId, CancellationToken>>,
    event_handler: Arc<dyn JobEventHandler>,
    config: CoordinatorConfig,
}

impl ExecutionCoordinator {
    /// Create a new execution coordinator
    pub fn new(
        registry: Arc<AlgorithmRegistry>,
        binder: DataBinder,
        jobs: Arc<dyn JobRepository>,
        event_handler: Arc<dyn JobEventHandler>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            registry,
            binder,
            jobs,
            cancellations: Arc::new(DashMap::new()),
            event_handler,
            config,
        }
    }

    /// The registry processes are resolved from
    pub fn registry(&self) -> &Arc<AlgorithmRegistry> {
        &self.registry
    }

    /// Coordinator settings
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Validate and dispatch an execute request.
    ///
    /// Every check happens before a job exists, so a rejected request never
    /// reaches the algorithm.
    pub async fn submit(&self, request: ExecuteRequest) -> Result<ExecutionHandle, DispatchError> {
        let process_id = request.process_id().clone();
        let (description, algorithm, capability) = self
            .registry
            .resolve_with_description(process_id.as_str())
            .ok_or_else(|| DispatchError::UnknownProcess {
                id: process_id.to_string(),
            })?;

        let inputs = self.binder.bind_inputs(&description, request.inputs())?;

        for definition in request.outputs() {
            if description.output(&definition.id).is_none() {
                return Err(DispatchError::UnknownOutput {
                    id: definition.id.clone(),
                });
            }
        }
        if request.response_mode() == ResponseMode::Raw && request.outputs().len() != 1 {
            return Err(DispatchError::InvalidResponseMode {
                requested: request.outputs().len(),
            });
        }

        let mode = negotiate(&process_id, request.execution_mode(), capability)?;

        let mut job = Job::new(Arc::new(request));
        let token = CancellationToken::new();
        self.cancellations.insert(job.id.clone(), token.clone());
        if let Err(e) = self.persist(&mut job).await {
            self.cancellations.remove(&job.id);
            return Err(e.into());
        }

        let plan = RunPlan {
            description,
            algorithm,
            inputs: Arc::new(inputs),
        };

        info!(job_id = %job.id, process_id = %process_id, ?mode, "Job accepted");

        match mode {
            ExecutionMode::Async => {
                let job_id = job.id.clone();
                let coordinator = self.clone();
                tokio::spawn(async move {
                    if let Err(e) = coordinator.run_job(job, plan, token).await {
                        error!(error = %e, "Could not store job outcome");
                    }
                });
                Ok(ExecutionHandle::Accepted(job_id))
            }
            _ => {
                let snapshot = self.run_job(job, plan, token).await?;
                Ok(ExecutionHandle::Completed(snapshot))
            }
        }
    }

    async fn run_job(
        &self,
        mut job: Job,
        plan: RunPlan,
        token: CancellationToken,
    ) -> Result<JobSnapshot, RepositoryError> {
        if token.is_cancelled() {
            log_transition(job.cancel());
            return self.finish(job).await;
        }

        log_transition(job.start());
        if let Err(e) = self.persist(&mut job).await {
            return Err(self.abandon(job, e).await);
        }
        debug!(job_id = %job.id, process_id = %job.process_id, "Job running");

        let (updates_tx, mut updates_rx) = mpsc::unbounded_channel();
        let ctx = ExecutionContext::new(job.id.clone(), plan.inputs.clone(), token.clone(), updates_tx);
        let algorithm = plan.algorithm.clone();
        let execution = AssertUnwindSafe(async move { algorithm.execute(ctx).await }).catch_unwind();
        tokio::pin!(execution);

        let outcome = loop {
            tokio::select! {
                outcome = &mut execution => break outcome,
                Some(update) = updates_rx.recv() => {
                    apply_update(&mut job, update);
                    if let Err(e) = self.persist(&mut job).await {
                        token.cancel();
                        return Err(self.abandon(job, e).await);
                    }
                }
            }
        };
        while let Ok(update) = updates_rx.try_recv() {
            apply_update(&mut job, update);
        }

        match outcome {
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(job_id = %job.id, panic = %message, "Algorithm panicked");
                log_transition(job.fail(ExecutionFailure::new(FailureKind::Panic, message)));
            }
            Ok(Err(AlgorithmError::Cancelled)) => {
                info!(job_id = %job.id, "Job cancelled by request");
                log_transition(job.cancel());
            }
            Ok(Err(e)) => {
                warn!(job_id = %job.id, error = %e, "Algorithm failed");
                log_transition(job.fail(ExecutionFailure::new(FailureKind::Algorithm, e.to_string())));
            }
            Ok(Ok(outputs)) => {
                let base = self.config.reference_base.trim_end_matches('/');
                let job_id = job.id.clone();
                let rendered = self.binder.render_outputs(
                    &plan.description,
                    job.request.outputs(),
                    &outputs,
                    |output_id| format!("{}/{}/outputs/{}", base, job_id, output_id),
                );

                let response = rendered.map_err(|e| e.to_string()).and_then(|rendered| {
                    let response = match job.request.response_mode() {
                        ResponseMode::Document => ExecuteResponse::Document {
                            outputs: rendered.outputs,
                        },
                        ResponseMode::Raw => match rendered.outputs.into_iter().next() {
                            Some(output) => ExecuteResponse::Raw { output },
                            None => return Err("no output was rendered".to_string()),
                        },
                    };
                    Ok((response, rendered.references))
                });

                match response {
                    Ok((response, references)) => log_transition(job.succeed(response, references)),
                    Err(message) => {
                        warn!(job_id = %job.id, error = %message, "Output rendering failed");
                        log_transition(job.fail(ExecutionFailure::new(FailureKind::Render, message)));
                    }
                }
            }
        }

        self.finish(job).await
    }

    /// Store the terminal state, then release the cancellation token
    async fn finish(&self, mut job: Job) -> Result<JobSnapshot, RepositoryError> {
        let result = self.persist(&mut job).await;
        self.cancellations.remove(&job.id);
        result?;
        info!(job_id = %job.id, state = ?job.state, "Job finished");
        Ok(job.snapshot())
    }

    /// Fail a job whose progress could not be stored and release its token.
    ///
    /// Storing the failure is best effort; the original error is returned.
    async fn abandon(&self, mut job: Job, error: RepositoryError) -> RepositoryError {
        error!(job_id = %job.id, error = %error, "Could not store job state");
        log_transition(job.fail(ExecutionFailure::new(FailureKind::Storage, error.to_string())));
        if let Err(e) = self.finish(job).await {
            warn!(error = %e, "Could not store job failure");
        }
        error
    }

    async fn persist(&self, job: &mut Job) -> Result<(), RepositoryError> {
        self.jobs.save(job).await?;
        for event in job.take_events() {
            self.event_handler.handle_event(event).await;
        }
        Ok(())
    }

    /// Current state of a job
    pub async fn poll_status(&self, job_id: &JobId) -> Result<Option<JobSnapshot>, JobError> {
        Ok(self
            .jobs
            .find_by_id(job_id)
            .await?
            .map(|job| job.snapshot()))
    }

    /// Request cooperative cancellation of a job.
    ///
    /// The job reaches `Cancelled` once its algorithm observes the request;
    /// an algorithm that completes first still succeeds.
    pub async fn cancel(&self, job_id: &JobId) -> Result<(), CancelError> {
        let job = self
            .jobs
            .find_by_id(job_id)
            .await?
            .ok_or_else(|| CancelError::UnknownJob {
                job_id: job_id.clone(),
            })?;
        if job.state.is_terminal() {
            return Err(CancelError::AlreadyTerminal {
                job_id: job_id.clone(),
                state: job.state,
            });
        }

        let token = self.cancellations.get(job_id).map(|entry| entry.value().clone());
        match token {
            Some(token) => {
                token.cancel();
                info!(job_id = %job_id, "Cancellation requested");
                Ok(())
            }
            // the token is released only after the terminal state is stored
            None => match self.jobs.find_by_id(job_id).await? {
                Some(job) if job.state.is_terminal() => Err(CancelError::AlreadyTerminal {
                    job_id: job_id.clone(),
                    state: job.state,
                }),
                _ => Err(CancelError::UnknownJob {
                    job_id: job_id.clone(),
                }),
            },
        }
    }

    /// Body of an output transmitted by reference
    pub async fn fetch_reference(
        &self,
        job_id: &JobId,
        output_id: &str,
    ) -> Result<EncodedData, JobError> {
        let job = self
            .jobs
            .find_by_id(job_id)
            .await?
            .ok_or_else(|| JobError::UnknownJob {
                job_id: job_id.clone(),
            })?;
        job.references
            .get(output_id)
            .cloned()
            .ok_or_else(|| JobError::UnknownReference {
                job_id: job_id.clone(),
                output_id: output_id.to_string(),
            })
    }

    /// Drop terminal jobs older than the retention window
    pub async fn evict_expired(&self) -> Result<Vec<JobId>, RepositoryError> {
        let evicted = self
            .jobs
            .evict_expired(Utc::now(), self.config.retention)
            .await?;
        if !evicted.is_empty() {
            debug!(count = evicted.len(), "Evicted expired jobs");
        }
        Ok(evicted)
    }

    /// Periodically evict expired jobs until `shutdown` is cancelled
    pub fn spawn_retention_sweeper(
        &self,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let coordinator = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        debug!("Retention sweeper stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = coordinator.evict_expired().await {
                            warn!(error = %e, "Retention sweep failed");
                        }
                    }
                }
            }
        })
    }
}

/// Resolve the requested mode against what the process offers
fn negotiate(
    process_id: &ProcessId,
    requested: ExecutionMode,
    capability: ExecutionCapability,
) -> Result<ExecutionMode, DispatchError> {
    let supported = match requested {
        ExecutionMode::Auto => {
            return Ok(if capability.allows_async() {
                ExecutionMode::Async
            } else {
                ExecutionMode::Sync
            })
        }
        ExecutionMode::Sync => capability.allows_sync(),
        ExecutionMode::Async => capability.allows_async(),
    };

    if supported {
        Ok(requested)
    } else {
        Err(DispatchError::ModeNotSupported {
            process_id: process_id.to_string(),
            requested,
            capability,
        })
    }
}

fn apply_update(job: &mut Job, update: JobUpdate) {
    let result = match update {
        JobUpdate::Progress(progress) => job.record_progress(progress),
        JobUpdate::PartialOutput { id, value } => job.record_partial_output(id, value),
    };
    log_transition(result);
}

fn log_transition(result: Result<(), InvalidTransition>) {
    if let Err(e) = result {
        error!(job_id = %e.job_id, from = ?e.from, to = ?e.to, "Rejected job transition");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "algorithm panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> ProcessId {
        ProcessId::from("p")
    }

    #[test]
    fn test_auto_prefers_async_when_offered() {
        assert_eq!(
            negotiate(&id(), ExecutionMode::Auto, ExecutionCapability::SyncOrAsync),
            Ok(ExecutionMode::Async)
        );
        assert_eq!(
            negotiate(&id(), ExecutionMode::Auto, ExecutionCapability::AsyncOnly),
            Ok(ExecutionMode::Async)
        );
        assert_eq!(
            negotiate(&id(), ExecutionMode::Auto, ExecutionCapability::SyncOnly),
            Ok(ExecutionMode::Sync)
        );
    }

    #[test]
    fn test_explicit_mode_must_be_offered() {
        assert_eq!(
            negotiate(&id(), ExecutionMode::Sync, ExecutionCapability::SyncOrAsync),
            Ok(ExecutionMode::Sync)
        );
        assert_eq!(
            negotiate(&id(), ExecutionMode::Async, ExecutionCapability::SyncOnly),
            Err(DispatchError::ModeNotSupported {
                process_id: "p".to_string(),
                requested: ExecutionMode::Async,
                capability: ExecutionCapability::SyncOnly,
            })
        );
        assert!(negotiate(&id(), ExecutionMode::Sync, ExecutionCapability::AsyncOnly).is_err());
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("formatted boom"));
        assert_eq!(panic_message(payload.as_ref()), "formatted boom");
        let payload: Box<dyn Any + Send> = Box::new(42);
        assert_eq!(panic_message(payload.as_ref()), "algorithm panicked");
    }

    #[test]
    fn test_handle_exposes_job_id() {
        let job_id = JobId::generate();
        assert_eq!(ExecutionHandle::Accepted(job_id.clone()).job_id(), &job_id);
    }
}
