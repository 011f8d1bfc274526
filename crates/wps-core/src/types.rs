use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Scalar type declared by a literal input or output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiteralType {
    /// 64-bit signed integer
    Integer,
    /// Double precision floating point
    Double,
    /// Boolean flag
    Boolean,
    /// Free text
    String,
    /// RFC 3339 timestamp
    DateTime,
}

impl LiteralType {
    /// XML schema name of the type, as advertised in process descriptions
    pub fn xsd_name(&self) -> &'static str {
        match self {
            LiteralType::Integer => "xs:integer",
            LiteralType::Double => "xs:double",
            LiteralType::Boolean => "xs:boolean",
            LiteralType::String => "xs:string",
            LiteralType::DateTime => "xs:dateTime",
        }
    }

    /// Coerce a decoded wire value into this type.
    ///
    /// Only lossless conversions are accepted: `3.0` becomes the integer `3`,
    /// `3.5` is rejected for an integer, `"42"` parses as an integer.
    pub fn coerce(&self, raw: &Value) -> Option<LiteralValue> {
        match self {
            LiteralType::Integer => match raw {
                Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral)),
                Value::String(s) => {
                    let s = s.trim();
                    s.parse::<i64>()
                        .ok()
                        .or_else(|| s.parse::<f64>().ok().and_then(integral))
                }
                _ => None,
            }
            .map(LiteralValue::Integer),
            LiteralType::Double => match raw {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
                _ => None,
            }
            .map(LiteralValue::Double),
            LiteralType::Boolean => match raw {
                Value::Bool(b) => Some(*b),
                Value::String(s) => match s.trim() {
                    "true" | "1" => Some(true),
                    "false" | "0" => Some(false),
                    _ => None,
                },
                _ => None,
            }
            .map(LiteralValue::Boolean),
            LiteralType::String => match raw {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                Value::Bool(b) => Some(b.to_string()),
                _ => None,
            }
            .map(LiteralValue::String),
            LiteralType::DateTime => match raw {
                Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
                    .ok()
                    .map(|dt| dt.with_timezone(&Utc)),
                _ => None,
            }
            .map(LiteralValue::DateTime),
        }
    }

    /// Whether values of `other` may appear in a domain declared for this type
    pub fn admits(&self, other: LiteralType) -> bool {
        *self == other || (*self == LiteralType::Double && other == LiteralType::Integer)
    }
}

impl fmt::Display for LiteralType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.xsd_name())
    }
}

fn integral(v: f64) -> Option<i64> {
    if v.is_finite() && v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}

/// A typed scalar value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum LiteralValue {
    /// Integer value
    Integer(i64),
    /// Floating point value
    Double(f64),
    /// Boolean value
    Boolean(bool),
    /// Text value
    String(String),
    /// Timestamp value
    DateTime(DateTime<Utc>),
}

impl LiteralValue {
    /// The scalar type of this value
    pub fn literal_type(&self) -> LiteralType {
        match self {
            LiteralValue::Integer(_) => LiteralType::Integer,
            LiteralValue::Double(_) => LiteralType::Double,
            LiteralValue::Boolean(_) => LiteralType::Boolean,
            LiteralValue::String(_) => LiteralType::String,
            LiteralValue::DateTime(_) => LiteralType::DateTime,
        }
    }

    /// Numeric view of the value, if it is numeric
    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            LiteralValue::Integer(i) => Some(*i as f64),
            LiteralValue::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Integer view of the value
    #[inline]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            LiteralValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Boolean view of the value
    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            LiteralValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Text view of the value
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            LiteralValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Value equality that treats `3` and `3.0` as the same number
    pub fn same_value(&self, other: &LiteralValue) -> bool {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => self == other,
        }
    }

    /// JSON representation used when handing the value back to a wire encoder
    pub fn to_json(&self) -> Value {
        match self {
            LiteralValue::Integer(i) => Value::from(*i),
            LiteralValue::Double(d) => Value::from(*d),
            LiteralValue::Boolean(b) => Value::Bool(*b),
            LiteralValue::String(s) => Value::String(s.clone()),
            LiteralValue::DateTime(dt) => Value::String(dt.to_rfc3339()),
        }
    }
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::Integer(i) => write!(f, "{}", i),
            LiteralValue::Double(d) => write!(f, "{}", d),
            LiteralValue::Boolean(b) => write!(f, "{}", b),
            LiteralValue::String(s) => f.write_str(s),
            LiteralValue::DateTime(dt) => f.write_str(&dt.to_rfc3339()),
        }
    }
}

/// Media format of complex data (mime type, optional encoding and schema)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Format {
    /// Mime type, e.g. `application/json`
    pub mime_type: String,

    /// Character or transfer encoding, e.g. `base64`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,

    /// Schema the content conforms to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

impl Format {
    /// Create a format from a mime type
    pub fn new(mime_type: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            encoding: None,
            schema: None,
        }
    }

    /// `text/plain`
    pub fn text_plain() -> Self {
        Self::new("text/plain")
    }

    /// `application/json`
    pub fn json() -> Self {
        Self::new("application/json")
    }

    /// Set the encoding
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    /// Set the schema
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Whether data in this format satisfies a request for `other`.
    ///
    /// Mime types must match; encoding and schema only constrain when both
    /// sides declare them.
    pub fn is_compatible_with(&self, other: &Format) -> bool {
        fn loosely_equal(a: &Option<String>, b: &Option<String>) -> bool {
            match (a, b) {
                (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
                _ => true,
            }
        }

        self.mime_type.eq_ignore_ascii_case(&other.mime_type)
            && loosely_equal(&self.encoding, &other.encoding)
            && loosely_equal(&self.schema, &other.schema)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.mime_type)?;
        if let Some(encoding) = &self.encoding {
            write!(f, "; encoding={}", encoding)?;
        }
        if let Some(schema) = &self.schema {
            write!(f, "; schema={}", schema)?;
        }
        Ok(())
    }
}

/// Payload kind of an input, output or runtime value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    /// Scalar literal
    Literal,
    /// Bounding box
    BoundingBox,
    /// Opaque structured or binary data
    Complex,
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataKind::Literal => f.write_str("literal"),
            DataKind::BoundingBox => f.write_str("bounding box"),
            DataKind::Complex => f.write_str("complex"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integer_coercion_is_lossless() {
        assert_eq!(LiteralType::Integer.coerce(&json!(42)), Some(LiteralValue::Integer(42)));
        assert_eq!(LiteralType::Integer.coerce(&json!(3.0)), Some(LiteralValue::Integer(3)));
        assert_eq!(LiteralType::Integer.coerce(&json!(" 17 ")), Some(LiteralValue::Integer(17)));
        assert_eq!(LiteralType::Integer.coerce(&json!("4.0")), Some(LiteralValue::Integer(4)));
        assert_eq!(LiteralType::Integer.coerce(&json!(3.5)), None);
        assert_eq!(LiteralType::Integer.coerce(&json!("abc")), None);
        assert_eq!(LiteralType::Integer.coerce(&json!(true)), None);
    }

    #[test]
    fn test_double_coercion() {
        assert_eq!(LiteralType::Double.coerce(&json!(2)), Some(LiteralValue::Double(2.0)));
        assert_eq!(LiteralType::Double.coerce(&json!("2.5")), Some(LiteralValue::Double(2.5)));
        assert_eq!(LiteralType::Double.coerce(&json!("NaN")), None);
        assert_eq!(LiteralType::Double.coerce(&json!(null)), None);
    }

    #[test]
    fn test_boolean_coercion_follows_xsd_lexical_space() {
        assert_eq!(LiteralType::Boolean.coerce(&json!("1")), Some(LiteralValue::Boolean(true)));
        assert_eq!(LiteralType::Boolean.coerce(&json!("false")), Some(LiteralValue::Boolean(false)));
        assert_eq!(LiteralType::Boolean.coerce(&json!("yes")), None);
    }

    #[test]
    fn test_string_and_datetime_coercion() {
        assert_eq!(
            LiteralType::String.coerce(&json!(12)),
            Some(LiteralValue::String("12".to_string()))
        );
        assert!(LiteralType::String.coerce(&json!({"a": 1})).is_none());

        let parsed = LiteralType::DateTime.coerce(&json!("2024-05-01T12:00:00+02:00"));
        match parsed {
            Some(LiteralValue::DateTime(dt)) => assert_eq!(dt.to_rfc3339(), "2024-05-01T10:00:00+00:00"),
            other => panic!("Expected a timestamp, got {:?}", other),
        }
    }

    #[test]
    fn test_same_value_compares_numbers_across_types() {
        assert!(LiteralValue::Integer(3).same_value(&LiteralValue::Double(3.0)));
        assert!(!LiteralValue::Integer(3).same_value(&LiteralValue::String("3".into())));
    }

    #[test]
    fn test_format_compatibility() {
        let gml = Format::new("text/xml").with_schema("http://schemas.opengis.net/gml/3.1.1/base/feature.xsd");
        assert!(gml.is_compatible_with(&Format::new("TEXT/XML")));
        assert!(!gml.is_compatible_with(&Format::new("text/xml").with_schema("other.xsd")));
        assert!(!gml.is_compatible_with(&Format::json()));
        assert_eq!(
            Format::json().with_encoding("UTF-8").to_string(),
            "application/json; encoding=UTF-8"
        );
    }
}
