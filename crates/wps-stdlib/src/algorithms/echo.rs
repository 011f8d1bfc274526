use async_trait::async_trait;
use tracing::debug;
use wps_core::{
    Algorithm, AlgorithmError, ExecutionCapability, ExecutionContext, InputDescription,
    LiteralDataDomain, LiteralDescription, LiteralType, LiteralValue, OutputDescription,
    ProcessDescription, ProcessOutputs, TypedData, ValueRange,
};

/// Echo process
///
/// Returns its `message` input, optionally repeated.
#[derive(Debug, Default)]
pub struct Echo;

impl Echo {
    /// Process identifier
    pub const ID: &'static str = "echo";

    /// Create a new echo process
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Algorithm for Echo {
    fn description(&self) -> ProcessDescription {
        ProcessDescription::builder(Self::ID)
            .title("Echo")
            .abstract_text("Returns the message it was given")
            .keyword("test")
            .version("1.0.0")
            .input(
                InputDescription::builder("message", LiteralDescription::new(LiteralType::String))
                    .title("Message")
                    .build(),
            )
            .input(
                InputDescription::builder(
                    "repeat",
                    LiteralDescription::new(LiteralType::Integer).with_default_domain(
                        LiteralDataDomain::range(ValueRange::new(1.0, 10.0))
                            .with_default(LiteralValue::Integer(1)),
                    ),
                )
                .title("Repetitions")
                .optional()
                .build(),
            )
            .output(
                OutputDescription::builder("result", LiteralDescription::new(LiteralType::String))
                    .title("Echoed message")
                    .build(),
            )
            .build()
    }

    fn execution_capability(&self) -> ExecutionCapability {
        ExecutionCapability::SyncOrAsync
    }

    async fn execute(&self, ctx: ExecutionContext) -> Result<ProcessOutputs, AlgorithmError> {
        let message = ctx
            .inputs()
            .literal("message")
            .and_then(LiteralValue::as_str)
            .ok_or_else(|| AlgorithmError::InvalidInput("message must be text".to_string()))?;
        let repeat = ctx
            .inputs()
            .literal("repeat")
            .and_then(LiteralValue::as_i64)
            .unwrap_or(1);

        debug!(job_id = %ctx.job_id(), repeat, "Echoing message");
        let result = vec![message; repeat.max(1) as usize].join(" ");

        let mut outputs = ProcessOutputs::new();
        outputs.insert("result".to_string(), TypedData::string(result));
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wps_core::{BoundInputs, DataBinder, ProcessData, ProtocolVersion};

    fn bind(inputs: &[ProcessData]) -> BoundInputs {
        DataBinder::default()
            .bind_inputs(&Echo.description(), inputs)
            .unwrap()
    }

    #[test]
    fn test_description_is_valid_for_every_version() {
        let description = Echo.description();
        for version in ProtocolVersion::ALL {
            assert!(description.violations(version).is_empty());
        }
    }

    #[tokio::test]
    async fn test_echo_uses_default_repeat() {
        let inputs = bind(&[ProcessData::literal("message", "hello")]);
        let outputs = Echo.execute(ExecutionContext::detached(inputs)).await.unwrap();
        assert_eq!(outputs.get("result"), Some(&TypedData::string("hello")));
    }

    #[tokio::test]
    async fn test_echo_repeats_message() {
        let inputs = bind(&[
            ProcessData::literal("message", "ho"),
            ProcessData::literal("repeat", 3),
        ]);
        let outputs = Echo.execute(ExecutionContext::detached(inputs)).await.unwrap();
        assert_eq!(outputs.get("result"), Some(&TypedData::string("ho ho ho")));
    }
}
