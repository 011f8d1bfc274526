//!
//! WPS Core - Process registry and execution lifecycle
//!
//! This crate defines the typed process description model, the algorithm
//! registry, the data binding layer and the execution coordinator that
//! drives jobs from acceptance to a terminal state. Wire encodings and
//! transport bindings live outside this crate.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::future::Future;

/// Domain layer - description model, values, jobs
pub mod domain;

/// Application services - registry, binding, coordinator
pub mod application;

/// Scalar types and formats
pub mod types;

/// Error types
pub mod error;

// Re-export main API types for easy use
pub use application::binding::DataBinder;
pub use application::coordinator::{
    CoordinatorConfig, ExecutionCoordinator, ExecutionHandle, JobEventHandler, TracingEventHandler,
};
pub use application::execution_context::ExecutionContext;
pub use application::formats::{FormatGenerator, FormatParser, FormatRegistry};
pub use application::registry::{
    AlgorithmFactory, AlgorithmRegistry, AlgorithmSource, AlgorithmTable, ProcessOffering,
    RegistrationReport,
};
pub use domain::data::{
    BoundInputs, BoundingBoxData, ComplexData, ComplexPayload, LiteralData, ProcessData,
    ProcessOutputs, ProcessValue, TypedData, TypedLiteral,
};
pub use domain::description::{
    BoundingBoxDescription, ComplexDescription, DataDescription, DescriptionViolation,
    InputDescription, LiteralDataDomain, LiteralDescription, Occurrence, OutputDescription,
    Parameter, PossibleValues, ProcessDescription, ProcessId, ProtocolVersion, RangeClosure,
    UnitOfMeasure, ValueRange,
};
pub use domain::job::{
    ExecutionFailure, FailureKind, Job, JobId, JobSnapshot, JobState, Progress,
};
pub use domain::repository::{memory::MemoryJobRepository, JobRepository};
pub use domain::request::{
    ExecuteRequest, ExecutionMode, OutputDefinition, ResponseMode, TransmissionMode,
};
pub use domain::response::{EncodedData, ExecuteResponse, OutputPayload, RenderedOutput};
pub use error::{
    AlgorithmError, CancelError, DispatchError, FormatError, JobError, LoadError,
    RegistrationError, RenderError, ValidationError,
};
pub use types::{DataKind, Format, LiteralType, LiteralValue};

/// Execution modes a process supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionCapability {
    /// Only runs on the caller's task
    #[default]
    SyncOnly,
    /// Only runs as a background job
    AsyncOnly,
    /// Either way
    SyncOrAsync,
}

impl ExecutionCapability {
    /// Whether synchronous execution is offered
    #[inline]
    pub fn allows_sync(&self) -> bool {
        matches!(self, ExecutionCapability::SyncOnly | ExecutionCapability::SyncOrAsync)
    }

    /// Whether asynchronous execution is offered
    #[inline]
    pub fn allows_async(&self) -> bool {
        matches!(self, ExecutionCapability::AsyncOnly | ExecutionCapability::SyncOrAsync)
    }
}

/// A pluggable computational process
#[async_trait]
pub trait Algorithm: Send + Sync {
    /// The formal description clients validate requests against
    fn description(&self) -> ProcessDescription;

    /// Execution modes the process supports
    fn execution_capability(&self) -> ExecutionCapability {
        ExecutionCapability::SyncOnly
    }

    /// Run the process on validated inputs.
    ///
    /// Long-running implementations should call [`ExecutionContext::checkpoint`]
    /// regularly so cancellation takes effect.
    async fn execute(&self, ctx: ExecutionContext) -> Result<ProcessOutputs, AlgorithmError>;
}

/// Adapter turning a description and an async closure into an [`Algorithm`]
pub struct FnAlgorithm<F> {
    description: ProcessDescription,
    capability: ExecutionCapability,
    handler: F,
}

impl<F, Fut> FnAlgorithm<F>
where
    F: Fn(ExecutionContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ProcessOutputs, AlgorithmError>> + Send,
{
    /// Wrap a closure as a synchronous-only algorithm
    pub fn new(description: ProcessDescription, handler: F) -> Self {
        Self {
            description,
            capability: ExecutionCapability::SyncOnly,
            handler,
        }
    }

    /// Set the execution capability
    pub fn with_capability(mut self, capability: ExecutionCapability) -> Self {
        self.capability = capability;
        self
    }
}

impl<F> Debug for FnAlgorithm<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnAlgorithm")
            .field("process_id", &self.description.id)
            .field("capability", &self.capability)
            .finish()
    }
}

#[async_trait]
impl<F, Fut> Algorithm for FnAlgorithm<F>
where
    F: Fn(ExecutionContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ProcessOutputs, AlgorithmError>> + Send,
{
    fn description(&self) -> ProcessDescription {
        self.description.clone()
    }

    fn execution_capability(&self) -> ExecutionCapability {
        self.capability
    }

    async fn execute(&self, ctx: ExecutionContext) -> Result<ProcessOutputs, AlgorithmError> {
        (self.handler)(ctx).await
    }
}
