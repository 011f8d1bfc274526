use crate::domain::data::ProcessData;
use crate::domain::description::ProcessId;
use crate::types::Format;
use serde::{Deserialize, Serialize};

/// How the client wants the process to be run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Let the server choose from the process capability
    #[default]
    Auto,
    /// Block until the outputs are available
    Sync,
    /// Return a job identifier immediately
    Async,
}

/// Shape of the response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    /// Status document wrapping every requested output
    #[default]
    Document,
    /// The single requested output, unwrapped
    Raw,
}

/// Whether an output is embedded in the response or stored for retrieval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransmissionMode {
    /// Embedded in the response
    #[default]
    Value,
    /// Stored with the job and linked from the response
    Reference,
}

/// A requested output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputDefinition {
    /// Output identifier
    pub id: String,

    /// Requested encoding; the declared default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<Format>,

    /// Transmission mode
    #[serde(default)]
    pub transmission: TransmissionMode,
}

impl OutputDefinition {
    /// Request an output by value in its default format
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            format: None,
            transmission: TransmissionMode::Value,
        }
    }

    /// Request a specific format
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    /// Request the output by reference
    pub fn by_reference(mut self) -> Self {
        self.transmission = TransmissionMode::Reference;
        self
    }
}

/// An execute request as decoded from the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteRequest {
    process_id: ProcessId,
    #[serde(default)]
    execution_mode: ExecutionMode,
    #[serde(default)]
    response_mode: ResponseMode,
    #[serde(default)]
    inputs: Vec<ProcessData>,
    #[serde(default)]
    outputs: Vec<OutputDefinition>,
}

impl ExecuteRequest {
    /// Start a request for the given process
    pub fn builder(process_id: impl Into<ProcessId>) -> ExecuteRequestBuilder {
        ExecuteRequestBuilder {
            request: ExecuteRequest {
                process_id: process_id.into(),
                execution_mode: ExecutionMode::default(),
                response_mode: ResponseMode::default(),
                inputs: Vec::new(),
                outputs: Vec::new(),
            },
        }
    }

    /// Target process
    pub fn process_id(&self) -> &ProcessId {
        &self.process_id
    }

    /// Requested execution mode
    pub fn execution_mode(&self) -> ExecutionMode {
        self.execution_mode
    }

    /// Requested response mode
    pub fn response_mode(&self) -> ResponseMode {
        self.response_mode
    }

    /// Inputs in request order
    pub fn inputs(&self) -> &[ProcessData] {
        &self.inputs
    }

    /// Requested outputs; empty means every output in document mode
    pub fn outputs(&self) -> &[OutputDefinition] {
        &self.outputs
    }
}

/// Consuming builder for [`ExecuteRequest`]
#[derive(Debug)]
pub struct ExecuteRequestBuilder {
    request: ExecuteRequest,
}

impl ExecuteRequestBuilder {
    /// Set the execution mode
    pub fn execution_mode(mut self, mode: ExecutionMode) -> Self {
        self.request.execution_mode = mode;
        self
    }

    /// Set the response mode
    pub fn response_mode(mut self, mode: ResponseMode) -> Self {
        self.request.response_mode = mode;
        self
    }

    /// Append an input occurrence
    pub fn input(mut self, input: ProcessData) -> Self {
        self.request.inputs.push(input);
        self
    }

    /// Append a requested output
    pub fn output(mut self, output: OutputDefinition) -> Self {
        self.request.outputs.push(output);
        self
    }

    /// Finish the request
    pub fn build(self) -> ExecuteRequest {
        self.request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_are_auto_and_document() {
        let request = ExecuteRequest::builder("echo").build();
        assert_eq!(request.execution_mode(), ExecutionMode::Auto);
        assert_eq!(request.response_mode(), ResponseMode::Document);
        assert!(request.outputs().is_empty());
    }

    #[test]
    fn test_request_deserializes_with_defaults() {
        let request: ExecuteRequest = serde_json::from_value(json!({
            "process_id": "echo",
            "inputs": [{"id": "msg", "value": {"kind": "literal", "value": "hi"}}],
            "outputs": [{"id": "msg", "transmission": "reference"}]
        }))
        .unwrap();

        assert_eq!(request.process_id().as_str(), "echo");
        assert_eq!(request.execution_mode(), ExecutionMode::Auto);
        assert_eq!(request.inputs(), &[ProcessData::literal("msg", "hi")]);
        assert_eq!(request.outputs(), &[OutputDefinition::new("msg").by_reference()]);
    }
}
