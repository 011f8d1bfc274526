use crate::domain::data::{BoundInputs, TypedData};
use crate::domain::job::{JobId, Progress};
use crate::error::AlgorithmError;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Update posted by a running algorithm to the task that owns its job
#[derive(Debug, Clone, PartialEq)]
pub enum JobUpdate {
    /// New progress
    Progress(Progress),
    /// An output published before completion
    PartialOutput {
        /// Output identifier
        id: String,
        /// The value
        value: TypedData,
    },
}

/// Everything an algorithm sees while executing
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    job_id: JobId,
    inputs: Arc<BoundInputs>,
    cancellation: CancellationToken,
    updates: mpsc::UnboundedSender<JobUpdate>,
}

impl ExecutionContext {
    pub(crate) fn new(
        job_id: JobId,
        inputs: Arc<BoundInputs>,
        cancellation: CancellationToken,
        updates: mpsc::UnboundedSender<JobUpdate>,
    ) -> Self {
        Self {
            job_id,
            inputs,
            cancellation,
            updates,
        }
    }

    /// Context outside any job, for driving an algorithm directly.
    ///
    /// Progress and partial outputs are discarded.
    pub fn detached(inputs: BoundInputs) -> Self {
        let (updates, _) = mpsc::unbounded_channel();
        Self::new(
            JobId::generate(),
            Arc::new(inputs),
            CancellationToken::new(),
            updates,
        )
    }

    /// Replace the cancellation token
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// The job being executed
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Validated inputs
    pub fn inputs(&self) -> &BoundInputs {
        &self.inputs
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Return `Err(Cancelled)` once cancellation was requested
    pub fn checkpoint(&self) -> Result<(), AlgorithmError> {
        if self.cancellation.is_cancelled() {
            Err(AlgorithmError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Resolves when cancellation is requested
    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await
    }

    /// Report progress, clamped to 100 percent
    pub fn report_progress(&self, percent: u8, message: Option<String>) {
        self.post(JobUpdate::Progress(Progress {
            percent: percent.min(100),
            message,
        }));
    }

    /// Publish an output before completion
    pub fn record_partial_output(&self, id: impl Into<String>, value: TypedData) {
        self.post(JobUpdate::PartialOutput {
            id: id.into(),
            value,
        });
    }

    fn post(&self, update: JobUpdate) {
        if self.updates.send(update).is_err() {
            trace!(job_id = %self.job_id, "Job no longer accepts updates");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LiteralValue;

    #[tokio::test]
    async fn test_updates_reach_the_job_owner() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let ctx = ExecutionContext::new(
            JobId::generate(),
            Arc::new(BoundInputs::new()),
            CancellationToken::new(),
            tx,
        );

        ctx.report_progress(250, Some("done".to_string()));
        ctx.record_partial_output("count", TypedData::literal(LiteralValue::Integer(1)));

        assert_eq!(
            rx.recv().await,
            Some(JobUpdate::Progress(Progress {
                percent: 100,
                message: Some("done".to_string()),
            }))
        );
        assert!(matches!(
            rx.recv().await,
            Some(JobUpdate::PartialOutput { id, .. }) if id == "count"
        ));
    }

    #[tokio::test]
    async fn test_checkpoint_observes_cancellation() {
        let token = CancellationToken::new();
        let ctx = ExecutionContext::detached(BoundInputs::new()).with_cancellation(token.clone());

        assert!(ctx.checkpoint().is_ok());
        token.cancel();
        assert_eq!(ctx.checkpoint(), Err(AlgorithmError::Cancelled));
        ctx.cancelled().await;

        // detached contexts swallow updates
        ctx.report_progress(10, None);
    }
}
