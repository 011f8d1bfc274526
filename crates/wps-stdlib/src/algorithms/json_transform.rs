use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tracing::debug;
use wps_core::{
    Algorithm, AlgorithmError, ComplexData, ComplexDescription, ComplexPayload, ExecutionCapability,
    ExecutionContext, Format, InputDescription, LiteralDescription, LiteralType, LiteralValue,
    OutputDescription, ProcessDescription, ProcessOutputs, TypedData,
};

/// Applies a JMESPath expression to a JSON document
#[derive(Debug, Default)]
pub struct JsonTransform;

impl JsonTransform {
    /// Process identifier
    pub const ID: &'static str = "json_transform";

    /// Create a new JSON transform process
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Algorithm for JsonTransform {
    fn description(&self) -> ProcessDescription {
        ProcessDescription::builder(Self::ID)
            .title("JSON transform")
            .abstract_text("Evaluates a JMESPath expression against a JSON document")
            .keywords(["json", "jmespath"])
            .metadata("documentation", "https://jmespath.org/specification.html")
            .input(
                InputDescription::builder(
                    "document",
                    ComplexDescription::new([Format::json()]).with_maximum_megabytes(16),
                )
                .title("Source document")
                .build(),
            )
            .input(
                InputDescription::builder("expression", LiteralDescription::new(LiteralType::String))
                    .title("JMESPath expression")
                    .build(),
            )
            .output(
                OutputDescription::builder("result", ComplexDescription::new([Format::json()]))
                    .title("Selected data")
                    .build(),
            )
            .build()
    }

    fn execution_capability(&self) -> ExecutionCapability {
        ExecutionCapability::SyncOrAsync
    }

    async fn execute(&self, ctx: ExecutionContext) -> Result<ProcessOutputs, AlgorithmError> {
        let document = ctx
            .inputs()
            .first("document")
            .and_then(TypedData::as_complex)
            .ok_or_else(|| AlgorithmError::InvalidInput("document is required".to_string()))?;
        let expression = ctx
            .inputs()
            .literal("expression")
            .and_then(LiteralValue::as_str)
            .ok_or_else(|| AlgorithmError::InvalidInput("expression must be text".to_string()))?;

        let document = match &document.payload {
            ComplexPayload::Structured(value) => value.clone(),
            ComplexPayload::Bytes(bytes) => serde_json::from_slice(bytes)
                .map_err(|e| AlgorithmError::InvalidInput(format!("document is not JSON: {}", e)))?,
        };

        let result = apply_expression(&document, expression)?;
        debug!(job_id = %ctx.job_id(), expression, "Applied JMESPath expression");

        let mut outputs = ProcessOutputs::new();
        outputs.insert(
            "result".to_string(),
            TypedData::Complex(ComplexData::structured(Format::json(), result)),
        );
        Ok(outputs)
    }
}

/// Evaluate a JMESPath expression
fn apply_expression(input: &JsonValue, expression: &str) -> Result<JsonValue, AlgorithmError> {
    let compiled = jmespath::compile(expression).map_err(|e| {
        AlgorithmError::InvalidInput(format!("Failed to compile JMESPath expression: {}", e))
    })?;
    let found = compiled.search(input).map_err(|e| {
        AlgorithmError::Failed(format!("Failed to evaluate JMESPath expression: {}", e))
    })?;
    serde_json::to_value(&*found).map_err(|e| AlgorithmError::Failed(e.to_string()))
}
