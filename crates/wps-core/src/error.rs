use crate::domain::description::{DescriptionViolation, ProtocolVersion};
use crate::domain::job::{JobId, JobState};
use crate::domain::request::ExecutionMode;
use crate::types::{DataKind, Format};
use crate::ExecutionCapability;
use thiserror::Error;

/// Failure to locate or instantiate an algorithm implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// No factory is bound to the identifier
    #[error("No implementation bound to process {id}")]
    NotFound {
        /// Requested process identifier
        id: String,
    },

    /// The factory failed to build the algorithm
    #[error("Could not instantiate process {id}: {message}")]
    Instantiation {
        /// Requested process identifier
        id: String,
        /// Failure reported by the factory
        message: String,
    },
}

/// Violations found for one protocol version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionViolations {
    /// The protocol version checked
    pub version: ProtocolVersion,
    /// Everything wrong with the description under that version
    pub violations: Vec<DescriptionViolation>,
}

/// Errors returned by the algorithm registry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// The implementation could not be loaded
    #[error(transparent)]
    Load(#[from] LoadError),

    /// The description is not valid for any supported protocol version
    #[error("Process description of {id} is not valid for any supported version")]
    DescriptionInvalid {
        /// Process identifier
        id: String,
        /// Per-version findings
        violations: Vec<VersionViolations>,
    },
}

/// Input validation failures, always detected before an algorithm runs
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// The request supplies an input the process does not declare
    #[error("Unknown input: {id}")]
    UnknownInput {
        /// Offending input identifier
        id: String,
    },

    /// A required input was not supplied
    #[error("Missing required input: {id}")]
    MissingInput {
        /// Offending input identifier
        id: String,
    },

    /// The value lies outside every allowed-value domain
    #[error("Value {value} of input {id} is outside every allowed domain")]
    OutOfDomain {
        /// Offending input identifier
        id: String,
        /// The coerced value
        value: String,
    },

    /// The value cannot be losslessly coerced to the declared type
    #[error("Input {id} expects {expected} but got {actual}")]
    TypeMismatch {
        /// Offending input identifier
        id: String,
        /// Declared type
        expected: String,
        /// Supplied value
        actual: String,
    },

    /// Number of occurrences outside `[min, max]`
    #[error("Input {id} occurs {actual} times, allowed range is [{min}, {}]", max.map(|m| m.to_string()).unwrap_or_else(|| "unbounded".to_string()))]
    OccurrenceOutOfBounds {
        /// Offending input identifier
        id: String,
        /// Minimum occurrences
        min: u32,
        /// Maximum occurrences, `None` when unbounded
        max: Option<u32>,
        /// Supplied occurrences
        actual: usize,
    },

    /// Value kind (literal, bounding box, complex) does not match the description
    #[error("Input {id} expects {expected} data but got {actual} data")]
    KindMismatch {
        /// Offending input identifier
        id: String,
        /// Declared kind
        expected: DataKind,
        /// Supplied kind
        actual: DataKind,
    },

    /// Unit of measure not supported by any domain
    #[error("Unit {uom} is not supported by input {id} (supported: {supported:?})")]
    UnsupportedUnit {
        /// Offending input identifier
        id: String,
        /// Supplied unit
        uom: String,
        /// Units declared by the description
        supported: Vec<String>,
    },

    /// Complex data format not declared by the description
    #[error("Format {format} is not supported by input {id}")]
    UnsupportedFormat {
        /// Offending input identifier
        id: String,
        /// Supplied format
        format: Format,
    },

    /// Bounding box CRS not declared by the description
    #[error("CRS {crs} is not supported by input {id}")]
    UnsupportedCrs {
        /// Offending input identifier
        id: String,
        /// Supplied CRS
        crs: String,
    },

    /// The format parser rejected the content
    #[error("Content of input {id} could not be decoded: {message}")]
    MalformedContent {
        /// Offending input identifier
        id: String,
        /// Parser diagnostic
        message: String,
    },
}

/// Output rendering failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// The process cannot produce the requested encoding
    #[error("Output {id} cannot be rendered as {format}")]
    UnsupportedFormat {
        /// Output identifier
        id: String,
        /// Requested format
        format: Format,
    },

    /// The process produced no value for a required output
    #[error("Process produced no value for output {id}")]
    MissingOutput {
        /// Output identifier
        id: String,
    },

    /// The produced value has the wrong kind
    #[error("Output {id} is declared as {expected} data but {actual} data was produced")]
    KindMismatch {
        /// Output identifier
        id: String,
        /// Declared kind
        expected: DataKind,
        /// Produced kind
        actual: DataKind,
    },

    /// The generator failed to encode the value
    #[error("Output {id} could not be encoded: {message}")]
    Encoding {
        /// Output identifier
        id: String,
        /// Generator diagnostic
        message: String,
    },
}

/// Errors raised by `ExecutionCoordinator::submit` before any algorithm runs
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    /// No process is registered under the identifier
    #[error("Unknown process: {id}")]
    UnknownProcess {
        /// Requested process identifier
        id: String,
    },

    /// Input binding failed
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A requested output is not declared by the process
    #[error("Unknown output: {id}")]
    UnknownOutput {
        /// Requested output identifier
        id: String,
    },

    /// Raw response mode requires exactly one requested output
    #[error("Raw response mode requires exactly one requested output, got {requested}")]
    InvalidResponseMode {
        /// Number of requested outputs
        requested: usize,
    },

    /// The requested execution mode is not offered by the process
    #[error("Process {process_id} does not support {requested:?} execution ({capability:?})")]
    ModeNotSupported {
        /// Process identifier
        process_id: String,
        /// Requested mode
        requested: ExecutionMode,
        /// Declared capability
        capability: ExecutionCapability,
    },

    /// The job store failed
    #[error(transparent)]
    Storage(#[from] RepositoryError),
}

/// Errors returned by status and result queries
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    /// No job with this identifier is retained
    #[error("Unknown job: {job_id}")]
    UnknownJob {
        /// Requested job
        job_id: JobId,
    },

    /// The job exists but holds no by-reference output with this identifier
    #[error("Job {job_id} holds no referenced output {output_id}")]
    UnknownReference {
        /// Requested job
        job_id: JobId,
        /// Requested output
        output_id: String,
    },

    /// The job store failed
    #[error(transparent)]
    Storage(#[from] RepositoryError),
}

/// Errors returned by `ExecutionCoordinator::cancel`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CancelError {
    /// No job with this identifier is retained
    #[error("Unknown job: {job_id}")]
    UnknownJob {
        /// Requested job
        job_id: JobId,
    },

    /// Cancellation is not retroactive
    #[error("Job {job_id} already reached terminal state {state:?}")]
    AlreadyTerminal {
        /// Requested job
        job_id: JobId,
        /// The terminal state
        state: JobState,
    },

    /// The job store failed
    #[error(transparent)]
    Storage(#[from] RepositoryError),
}

/// Errors reported by algorithm implementations and their factories
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AlgorithmError {
    /// The algorithm observed its cancellation signal and stopped
    #[error("Execution cancelled")]
    Cancelled,

    /// The inputs passed validation but the algorithm cannot work with them
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Generic algorithm failure
    #[error("{0}")]
    Failed(String),
}

impl From<String> for AlgorithmError {
    fn from(err: String) -> Self {
        AlgorithmError::Failed(err)
    }
}

impl From<&str> for AlgorithmError {
    fn from(err: &str) -> Self {
        AlgorithmError::Failed(err.to_string())
    }
}

/// Errors raised by format parsers and generators
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// The collaborator does not handle this format or data kind
    #[error("Unsupported format: {0}")]
    Unsupported(Format),

    /// The content does not conform to the format
    #[error("Malformed content: {0}")]
    Malformed(String),
}

/// Job store failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// Backend failure
    #[error("Job store error: {0}")]
    Storage(String),
}

/// An illegal job state transition
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Job {job_id} cannot move from {from:?} to {to:?}")]
pub struct InvalidTransition {
    /// The job
    pub job_id: JobId,
    /// Current state
    pub from: JobState,
    /// Attempted state
    pub to: JobState,
}

/// A protocol version string that is not supported
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unsupported protocol version: {0}")]
pub struct UnknownProtocolVersion(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let errors: Vec<(Box<dyn std::error::Error>, &str)> = vec![
            (
                Box::new(ValidationError::MissingInput { id: "msg".to_string() }),
                "Missing required input: msg",
            ),
            (
                Box::new(ValidationError::OccurrenceOutOfBounds {
                    id: "layer".to_string(),
                    min: 1,
                    max: None,
                    actual: 0,
                }),
                "Input layer occurs 0 times, allowed range is [1, unbounded]",
            ),
            (
                Box::new(DispatchError::UnknownProcess { id: "nope".to_string() }),
                "Unknown process: nope",
            ),
            (
                Box::new(DispatchError::InvalidResponseMode { requested: 2 }),
                "Raw response mode requires exactly one requested output, got 2",
            ),
            (
                Box::new(RenderError::MissingOutput { id: "result".to_string() }),
                "Process produced no value for output result",
            ),
            (
                Box::new(LoadError::NotFound { id: "buffer".to_string() }),
                "No implementation bound to process buffer",
            ),
            (Box::new(AlgorithmError::Cancelled), "Execution cancelled"),
        ];

        for (error, expected_msg) in errors {
            assert_eq!(error.to_string(), expected_msg);
        }
    }

    #[test]
    fn test_validation_error_converts_into_dispatch_error() {
        let error: DispatchError = ValidationError::UnknownInput { id: "x".to_string() }.into();
        assert_eq!(
            error,
            DispatchError::Validation(ValidationError::UnknownInput { id: "x".to_string() })
        );
        assert_eq!(error.to_string(), "Unknown input: x");
    }

    #[test]
    fn test_load_error_converts_into_registration_error() {
        let error: RegistrationError = LoadError::Instantiation {
            id: "buffer".to_string(),
            message: "missing native library".to_string(),
        }
        .into();
        assert_eq!(
            error.to_string(),
            "Could not instantiate process buffer: missing native library"
        );
    }

    #[test]
    fn test_algorithm_error_from_str() {
        let error: AlgorithmError = "division by zero".into();
        assert_eq!(error, AlgorithmError::Failed("division by zero".to_string()));
    }
}
