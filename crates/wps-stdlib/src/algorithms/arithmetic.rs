use async_trait::async_trait;
use tracing::debug;
use wps_core::{
    Algorithm, AlgorithmError, ExecutionContext, InputDescription, LiteralDataDomain,
    LiteralDescription, LiteralType, LiteralValue, OutputDescription, ProcessDescription,
    ProcessOutputs, TypedData, UnitOfMeasure, ValueRange,
};

const OPERATORS: [&str; 4] = ["add", "subtract", "multiply", "divide"];

/// Arithmetic on two lengths
///
/// Operands may be given in metres, kilometres or centimetres; they are
/// converted to metres before the operation. The result carries the unit
/// implied by the operator (`m`, `m2`, or none for a ratio).
#[derive(Debug, Default)]
pub struct Arithmetic;

impl Arithmetic {
    /// Process identifier
    pub const ID: &'static str = "arithmetic";

    /// Create a new arithmetic process
    pub fn new() -> Self {
        Self
    }
}

fn length(id: &str, title: &str) -> InputDescription {
    InputDescription::builder(
        id,
        LiteralDescription::new(LiteralType::Double)
            .with_default_domain(LiteralDataDomain::any().with_uom(UnitOfMeasure::new("m")))
            .with_supported_domain(
                LiteralDataDomain::any().with_uom(UnitOfMeasure::new("km").with_factor(1000.0)),
            )
            .with_supported_domain(
                LiteralDataDomain::any().with_uom(UnitOfMeasure::new("cm").with_factor(0.01)),
            ),
    )
    .title(title)
    .build()
}

#[async_trait]
impl Algorithm for Arithmetic {
    fn description(&self) -> ProcessDescription {
        ProcessDescription::builder(Self::ID)
            .title("Length arithmetic")
            .abstract_text("Adds, subtracts, multiplies or divides two lengths")
            .keywords(["math", "units"])
            .version("1.0.0")
            .input(length("a", "First operand"))
            .input(length("b", "Second operand"))
            .input(
                InputDescription::builder(
                    "operator",
                    LiteralDescription::new(LiteralType::String).with_default_domain(
                        LiteralDataDomain::enumeration(
                            OPERATORS.iter().map(|op| LiteralValue::String(op.to_string())),
                        )
                        .with_default(LiteralValue::String("add".to_string())),
                    ),
                )
                .title("Operator")
                .optional()
                .build(),
            )
            .input(
                InputDescription::builder(
                    "precision",
                    LiteralDescription::new(LiteralType::Integer).with_default_domain(
                        LiteralDataDomain::range(ValueRange::new(0.0, 12.0))
                            .with_default(LiteralValue::Integer(6)),
                    ),
                )
                .title("Decimal places")
                .optional()
                .build(),
            )
            .output(
                OutputDescription::builder("result", LiteralDescription::new(LiteralType::Double))
                    .title("Result")
                    .build(),
            )
            .build()
    }

    async fn execute(&self, ctx: ExecutionContext) -> Result<ProcessOutputs, AlgorithmError> {
        let inputs = ctx.inputs();
        let operand = |id: &str| {
            inputs
                .f64(id)
                .ok_or_else(|| AlgorithmError::InvalidInput(format!("{} must be a number", id)))
        };
        let a = operand("a")?;
        let b = operand("b")?;
        let operator = inputs
            .literal("operator")
            .and_then(LiteralValue::as_str)
            .unwrap_or("add");
        let precision = inputs
            .literal("precision")
            .and_then(LiteralValue::as_i64)
            .unwrap_or(6);

        let (value, uom) = match operator {
            "add" => (a + b, Some("m")),
            "subtract" => (a - b, Some("m")),
            "multiply" => (a * b, Some("m2")),
            "divide" if b == 0.0 => {
                return Err(AlgorithmError::InvalidInput("division by zero".to_string()))
            }
            "divide" => (a / b, None),
            other => {
                return Err(AlgorithmError::InvalidInput(format!(
                    "unknown operator {}",
                    other
                )))
            }
        };

        let value = round(value, precision);
        debug!(job_id = %ctx.job_id(), operator, value, "Computed result");

        let value = LiteralValue::Double(value);
        let result = match uom {
            Some(uom) => TypedData::literal_with_uom(value, uom),
            None => TypedData::literal(value),
        };

        let mut outputs = ProcessOutputs::new();
        outputs.insert("result".to_string(), result);
        Ok(outputs)
    }
}

fn round(value: f64, decimals: i64) -> f64 {
    let scale = 10f64.powi(decimals.clamp(0, 12) as i32);
    (value * scale).round() / scale
}
