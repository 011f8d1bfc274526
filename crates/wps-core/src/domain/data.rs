use crate::types::{DataKind, Format, LiteralValue};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Literal value as decoded by the wire parser, not yet typed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiteralData {
    /// Decoded JSON scalar
    pub value: Value,

    /// Unit of measure the value is expressed in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uom: Option<String>,
}

/// Bounding box value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBoxData {
    /// Lower corner coordinates
    pub lower_corner: Vec<f64>,

    /// Upper corner coordinates
    pub upper_corner: Vec<f64>,

    /// Coordinate reference system; the described default applies when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<String>,
}

impl BoundingBoxData {
    /// Create a bounding box without an explicit CRS
    pub fn new(lower_corner: Vec<f64>, upper_corner: Vec<f64>) -> Self {
        Self {
            lower_corner,
            upper_corner,
            crs: None,
        }
    }

    /// Set the CRS
    pub fn with_crs(mut self, crs: impl Into<String>) -> Self {
        self.crs = Some(crs.into());
        self
    }

    /// Number of coordinates per corner, if both corners agree
    pub fn dimensions(&self) -> Option<usize> {
        (self.lower_corner.len() == self.upper_corner.len()).then_some(self.lower_corner.len())
    }
}

/// Body of a complex value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexPayload {
    /// Opaque encoded content
    Bytes(Vec<u8>),
    /// Content already decoded into a structured document
    Structured(Value),
}

/// Complex value with its media format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexData {
    /// Format of the payload
    pub format: Format,
    /// The payload
    pub payload: ComplexPayload,
}

impl ComplexData {
    /// Raw bytes in the given format
    pub fn bytes(format: Format, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            format,
            payload: ComplexPayload::Bytes(bytes.into()),
        }
    }

    /// A structured document in the given format
    pub fn structured(format: Format, document: Value) -> Self {
        Self {
            format,
            payload: ComplexPayload::Structured(document),
        }
    }
}

/// Untyped runtime value of an input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProcessValue {
    /// Literal value
    Literal(LiteralData),
    /// Bounding box
    BoundingBox(BoundingBoxData),
    /// Complex value
    Complex(ComplexData),
}

impl ProcessValue {
    /// Payload kind of the value
    pub fn kind(&self) -> DataKind {
        match self {
            ProcessValue::Literal(_) => DataKind::Literal,
            ProcessValue::BoundingBox(_) => DataKind::BoundingBox,
            ProcessValue::Complex(_) => DataKind::Complex,
        }
    }
}

/// A runtime value bound to an input identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessData {
    /// Input identifier
    pub id: String,
    /// The value
    pub value: ProcessValue,
}

impl ProcessData {
    /// Literal input without a unit
    pub fn literal(id: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            id: id.into(),
            value: ProcessValue::Literal(LiteralData {
                value: value.into(),
                uom: None,
            }),
        }
    }

    /// Literal input expressed in a unit of measure
    pub fn literal_with_uom(
        id: impl Into<String>,
        value: impl Into<Value>,
        uom: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            value: ProcessValue::Literal(LiteralData {
                value: value.into(),
                uom: Some(uom.into()),
            }),
        }
    }

    /// Bounding box input
    pub fn bounding_box(id: impl Into<String>, bbox: BoundingBoxData) -> Self {
        Self {
            id: id.into(),
            value: ProcessValue::BoundingBox(bbox),
        }
    }

    /// Complex input
    pub fn complex(id: impl Into<String>, data: ComplexData) -> Self {
        Self {
            id: id.into(),
            value: ProcessValue::Complex(data),
        }
    }
}

/// Literal value after coercion to its declared type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedLiteral {
    /// Typed value, expressed in the default unit of its domain
    pub value: LiteralValue,

    /// Unit of measure of `value`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uom: Option<String>,
}

/// Validated value handed to algorithms and produced by them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypedData {
    /// Typed literal
    Literal(TypedLiteral),
    /// Bounding box with its resolved CRS
    BoundingBox(BoundingBoxData),
    /// Complex value, decoded when a parser was available
    Complex(ComplexData),
}

impl TypedData {
    /// Literal without a unit
    pub fn literal(value: LiteralValue) -> Self {
        TypedData::Literal(TypedLiteral { value, uom: None })
    }

    /// Literal with a unit
    pub fn literal_with_uom(value: LiteralValue, uom: impl Into<String>) -> Self {
        TypedData::Literal(TypedLiteral {
            value,
            uom: Some(uom.into()),
        })
    }

    /// Shorthand for a text literal
    pub fn string(value: impl Into<String>) -> Self {
        Self::literal(LiteralValue::String(value.into()))
    }

    /// Payload kind
    pub fn kind(&self) -> DataKind {
        match self {
            TypedData::Literal(_) => DataKind::Literal,
            TypedData::BoundingBox(_) => DataKind::BoundingBox,
            TypedData::Complex(_) => DataKind::Complex,
        }
    }

    /// Literal view
    pub fn as_literal(&self) -> Option<&LiteralValue> {
        match self {
            TypedData::Literal(literal) => Some(&literal.value),
            _ => None,
        }
    }

    /// Complex view
    pub fn as_complex(&self) -> Option<&ComplexData> {
        match self {
            TypedData::Complex(complex) => Some(complex),
            _ => None,
        }
    }

    /// Bounding box view
    pub fn as_bounding_box(&self) -> Option<&BoundingBoxData> {
        match self {
            TypedData::BoundingBox(bbox) => Some(bbox),
            _ => None,
        }
    }
}

/// Validated inputs keyed by identifier, in description order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundInputs(IndexMap<String, Vec<TypedData>>);

impl BoundInputs {
    /// Empty input set
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an occurrence of an input
    pub fn push(&mut self, id: impl Into<String>, value: TypedData) {
        self.0.entry(id.into()).or_default().push(value);
    }

    /// All occurrences of an input
    pub fn get(&self, id: &str) -> &[TypedData] {
        self.0.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First occurrence of an input
    pub fn first(&self, id: &str) -> Option<&TypedData> {
        self.get(id).first()
    }

    /// First occurrence of a literal input
    pub fn literal(&self, id: &str) -> Option<&LiteralValue> {
        self.first(id).and_then(TypedData::as_literal)
    }

    /// First occurrence of a literal input, coerced to a number
    pub fn f64(&self, id: &str) -> Option<f64> {
        self.literal(id).and_then(LiteralValue::as_f64)
    }

    /// Whether the input has at least one occurrence
    pub fn contains(&self, id: &str) -> bool {
        !self.get(id).is_empty()
    }

    /// Identifiers with at least one occurrence
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of distinct inputs
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no input was bound
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Outputs produced by an algorithm, keyed by output identifier
pub type ProcessOutputs = IndexMap<String, TypedData>;

/// Renders a raw wire value for diagnostics
pub(crate) fn describe_raw(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        other => other.to_string(),
    }
}
