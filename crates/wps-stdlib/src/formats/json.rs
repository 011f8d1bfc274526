use serde_json::Value as JsonValue;
use wps_core::{
    ComplexData, ComplexPayload, DataKind, Format, FormatError, FormatGenerator, FormatParser,
    TypedData,
};

/// Parser and generator for `application/json` complex data
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl JsonCodec {
    /// Create a new JSON codec
    pub fn new() -> Self {
        Self
    }

    fn handles(format: &Format) -> bool {
        format.is_compatible_with(&Format::json())
            && format
                .encoding
                .as_deref()
                .map_or(true, |encoding| encoding.eq_ignore_ascii_case("utf-8"))
    }
}

impl FormatParser for JsonCodec {
    fn supports(&self, format: &Format, kind: DataKind) -> bool {
        kind == DataKind::Complex && Self::handles(format)
    }

    fn decode(&self, format: &Format, bytes: &[u8], kind: DataKind) -> Result<TypedData, FormatError> {
        if !FormatParser::supports(self, format, kind) {
            return Err(FormatError::Unsupported(format.clone()));
        }
        let document: JsonValue =
            serde_json::from_slice(bytes).map_err(|e| FormatError::Malformed(e.to_string()))?;
        Ok(TypedData::Complex(ComplexData::structured(format.clone(), document)))
    }
}

impl FormatGenerator for JsonCodec {
    fn supports(&self, format: &Format, _kind: DataKind) -> bool {
        Self::handles(format)
    }

    fn encode(&self, format: &Format, data: &TypedData) -> Result<Vec<u8>, FormatError> {
        if !Self::handles(format) {
            return Err(FormatError::Unsupported(format.clone()));
        }
        let document = match data {
            TypedData::Literal(literal) => literal.value.to_json(),
            TypedData::BoundingBox(bbox) => {
                serde_json::to_value(bbox).map_err(|e| FormatError::Malformed(e.to_string()))?
            }
            TypedData::Complex(complex) => match &complex.payload {
                ComplexPayload::Structured(document) => document.clone(),
                ComplexPayload::Bytes(bytes) => {
                    serde_json::from_slice(bytes).map_err(|e| FormatError::Malformed(e.to_string()))?
                }
            },
        };
        serde_json::to_vec(&document).map_err(|e| FormatError::Malformed(e.to_string()))
    }
}
