use crate::domain::data::{BoundingBoxData, TypedLiteral};
use crate::types::Format;
use serde::{Deserialize, Serialize};

/// Bytes produced by a format generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedData {
    /// Format of the bytes
    pub format: Format,
    /// Encoded content
    pub bytes: Vec<u8>,
}

/// Rendered form of one output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutputPayload {
    /// Literal value, embedded as is
    Literal(TypedLiteral),
    /// Bounding box, embedded as is
    BoundingBox(BoundingBoxData),
    /// Complex value encoded in the requested format
    Encoded(EncodedData),
    /// Complex value stored with the job
    Reference {
        /// Location of the stored body
        href: String,
        /// Format of the stored body
        format: Format,
    },
}

/// An output ready to be put on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedOutput {
    /// Output identifier
    pub id: String,
    /// Rendered payload
    pub payload: OutputPayload,
}

/// Response assembled for a succeeded job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ExecuteResponse {
    /// Every requested output, in request order
    Document {
        /// Rendered outputs
        outputs: Vec<RenderedOutput>,
    },
    /// The single requested output
    Raw {
        /// Rendered output
        output: RenderedOutput,
    },
}

impl ExecuteResponse {
    /// Rendered outputs regardless of response mode
    pub fn outputs(&self) -> &[RenderedOutput] {
        match self {
            ExecuteResponse::Document { outputs } => outputs,
            ExecuteResponse::Raw { output } => std::slice::from_ref(output),
        }
    }

    /// Rendered output by identifier
    pub fn output(&self, id: &str) -> Option<&RenderedOutput> {
        self.outputs().iter().find(|output| output.id == id)
    }
}
