use async_trait::async_trait;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};
use wps_core::{
    Algorithm, AlgorithmError, ExecutionCapability, ExecutionContext, InputDescription,
    LiteralDataDomain, LiteralDescription, LiteralType, LiteralValue, OutputDescription,
    ProcessDescription, ProcessOutputs, TypedData, UnitOfMeasure, ValueRange,
};

/// Long-running process that waits in steps.
///
/// Reports progress after every step, publishes the completed step count as
/// a partial output and stops as soon as cancellation is requested.
#[derive(Debug, Default)]
pub struct Delay;

impl Delay {
    /// Process identifier
    pub const ID: &'static str = "delay";

    /// Create a new delay process
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Algorithm for Delay {
    fn description(&self) -> ProcessDescription {
        ProcessDescription::builder(Self::ID)
            .title("Delay")
            .abstract_text("Waits for the given duration, reporting progress")
            .keyword("test")
            .input(
                InputDescription::builder(
                    "seconds",
                    LiteralDescription::new(LiteralType::Double).with_default_domain(
                        LiteralDataDomain::range(ValueRange::new(0.0, 3600.0))
                            .with_uom(UnitOfMeasure::new("s")),
                    ),
                )
                .title("Duration")
                .build(),
            )
            .input(
                InputDescription::builder(
                    "steps",
                    LiteralDescription::new(LiteralType::Integer).with_default_domain(
                        LiteralDataDomain::range(ValueRange::new(1.0, 100.0))
                            .with_default(LiteralValue::Integer(10)),
                    ),
                )
                .title("Progress steps")
                .optional()
                .build(),
            )
            .output(
                OutputDescription::builder("elapsed", LiteralDescription::new(LiteralType::Double))
                    .title("Elapsed seconds")
                    .build(),
            )
            .output(
                OutputDescription::builder("steps", LiteralDescription::new(LiteralType::Integer))
                    .title("Completed steps")
                    .build(),
            )
            .build()
    }

    fn execution_capability(&self) -> ExecutionCapability {
        ExecutionCapability::SyncOrAsync
    }

    async fn execute(&self, ctx: ExecutionContext) -> Result<ProcessOutputs, AlgorithmError> {
        let seconds = ctx
            .inputs()
            .f64("seconds")
            .ok_or_else(|| AlgorithmError::InvalidInput("seconds must be a number".to_string()))?;
        let steps = ctx
            .inputs()
            .literal("steps")
            .and_then(LiteralValue::as_i64)
            .unwrap_or(10)
            .max(1);

        let step = Duration::from_secs_f64(seconds / steps as f64);
        let started = Instant::now();
        info!(job_id = %ctx.job_id(), seconds, steps, "Delay started");

        for completed in 1..=steps {
            ctx.checkpoint()?;
            tokio::select! {
                _ = ctx.cancelled() => {
                    debug!(job_id = %ctx.job_id(), completed = completed - 1, "Delay cancelled");
                    return Err(AlgorithmError::Cancelled);
                }
                _ = sleep(step) => {}
            }

            let percent = (completed * 100 / steps) as u8;
            ctx.report_progress(percent, Some(format!("step {} of {}", completed, steps)));
            ctx.record_partial_output("steps", TypedData::literal(LiteralValue::Integer(completed)));
        }

        let mut outputs = ProcessOutputs::new();
        outputs.insert(
            "elapsed".to_string(),
            TypedData::literal_with_uom(
                LiteralValue::Double(started.elapsed().as_secs_f64()),
                "s",
            ),
        );
        outputs.insert(
            "steps".to_string(),
            TypedData::literal(LiteralValue::Integer(steps)),
        );
        Ok(outputs)
    }
}
