use crate::error::UnknownProtocolVersion;
use crate::types::{DataKind, Format, LiteralType, LiteralValue};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use thiserror::Error;

/// Protocol versions a process description can be published under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProtocolVersion {
    /// WPS 1.0.0
    #[serde(rename = "1.0.0")]
    V1_0_0,
    /// WPS 2.0.0
    #[serde(rename = "2.0.0")]
    V2_0_0,
}

impl ProtocolVersion {
    /// Every version this engine understands
    pub const ALL: [ProtocolVersion; 2] = [ProtocolVersion::V1_0_0, ProtocolVersion::V2_0_0];

    /// Version string as used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolVersion::V1_0_0 => "1.0.0",
            ProtocolVersion::V2_0_0 => "2.0.0",
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProtocolVersion {
    type Err = UnknownProtocolVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1.0.0" => Ok(ProtocolVersion::V1_0_0),
            "2.0.0" => Ok(ProtocolVersion::V2_0_0),
            other => Err(UnknownProtocolVersion(other.to_string())),
        }
    }
}

/// Value object: Process identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessId(pub String);

impl ProcessId {
    /// The identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ProcessId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ProcessId {
    fn from(id: &str) -> Self {
        ProcessId(id.to_string())
    }
}

impl From<String> for ProcessId {
    fn from(id: String) -> Self {
        ProcessId(id)
    }
}

/// Occurrence bounds of an input or output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    /// Minimum number of occurrences
    pub min: u32,
    /// Maximum number of occurrences, `None` when unbounded
    pub max: Option<u32>,
}

impl Default for Occurrence {
    fn default() -> Self {
        Self { min: 1, max: Some(1) }
    }
}

impl Occurrence {
    /// Bounds `[min, max]`
    pub fn new(min: u32, max: Option<u32>) -> Self {
        Self { min, max }
    }

    /// `[0, 1]`
    pub fn optional() -> Self {
        Self::new(0, Some(1))
    }

    /// `[min, unbounded]`
    pub fn unbounded(min: u32) -> Self {
        Self::new(min, None)
    }

    /// Whether at least one occurrence must be supplied
    pub fn is_required(&self) -> bool {
        self.min > 0
    }

    /// Whether `count` occurrences are allowed
    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min as usize && self.max.map_or(true, |max| count <= max as usize)
    }

    fn is_well_formed(&self) -> bool {
        self.max.map_or(true, |max| max >= self.min && max > 0)
    }
}

/// Metadata link attached to a process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Role of the linked resource
    pub role: String,
    /// Link target
    pub href: String,
}

/// Which ends of a value range are included
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RangeClosure {
    /// Both ends included
    #[default]
    Closed,
    /// Both ends excluded
    Open,
    /// Minimum excluded, maximum included
    OpenClosed,
    /// Minimum included, maximum excluded
    ClosedOpen,
}

impl RangeClosure {
    fn includes_min(&self) -> bool {
        matches!(self, RangeClosure::Closed | RangeClosure::ClosedOpen)
    }

    fn includes_max(&self) -> bool {
        matches!(self, RangeClosure::Closed | RangeClosure::OpenClosed)
    }
}

/// Numeric range of allowed values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    /// Lower bound, `None` when unbounded
    pub min: Option<f64>,
    /// Upper bound, `None` when unbounded
    pub max: Option<f64>,
    /// Step between allowed values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spacing: Option<f64>,
    /// Inclusion of the bounds
    #[serde(default)]
    pub closure: RangeClosure,
}

/// Relative tolerance used when matching a value against a spacing grid
const SPACING_EPSILON: f64 = 1e-9;

impl ValueRange {
    /// Closed range `[min, max]`
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
            spacing: None,
            closure: RangeClosure::Closed,
        }
    }

    /// Range with a lower bound only
    pub fn at_least(min: f64) -> Self {
        Self {
            min: Some(min),
            max: None,
            spacing: None,
            closure: RangeClosure::Closed,
        }
    }

    /// Range with an upper bound only
    pub fn at_most(max: f64) -> Self {
        Self {
            min: None,
            max: Some(max),
            spacing: None,
            closure: RangeClosure::Closed,
        }
    }

    /// Only accept values on a grid of `spacing`
    pub fn with_spacing(mut self, spacing: f64) -> Self {
        self.spacing = Some(spacing);
        self
    }

    /// Set the bound inclusion
    pub fn with_closure(mut self, closure: RangeClosure) -> Self {
        self.closure = closure;
        self
    }

    /// Whether the value lies in the range and on its spacing grid.
    ///
    /// The grid is anchored at the lower bound, at the upper bound when the
    /// range has no lower bound, and at zero otherwise.
    pub fn contains(&self, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }

        let above_min = match self.min {
            Some(min) if self.closure.includes_min() => value >= min,
            Some(min) => value > min,
            None => true,
        };
        let below_max = match self.max {
            Some(max) if self.closure.includes_max() => value <= max,
            Some(max) => value < max,
            None => true,
        };
        if !(above_min && below_max) {
            return false;
        }

        match self.spacing {
            Some(spacing) if spacing > 0.0 => {
                let anchor = self.min.or(self.max).unwrap_or(0.0);
                let steps = (value - anchor) / spacing;
                (steps - steps.round()).abs() <= SPACING_EPSILON * steps.abs().max(1.0)
            }
            _ => true,
        }
    }

    fn is_well_formed(&self) -> bool {
        let finite = self.min.map_or(true, f64::is_finite) && self.max.map_or(true, f64::is_finite);
        let ordered = match (self.min, self.max) {
            (Some(min), Some(max)) => min <= max,
            _ => true,
        };
        finite && ordered
    }
}

/// Allowed values of a literal domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PossibleValues {
    /// Every syntactically valid value of the type
    Any,
    /// A closed list of values
    Enumeration(Vec<LiteralValue>),
    /// A numeric range
    Range(ValueRange),
}

/// Unit of measure of a literal domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitOfMeasure {
    /// Unit code, e.g. `m` or `km`
    pub code: String,

    /// Multiplier converting a value in this unit to the default domain's unit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factor: Option<f64>,
}

impl UnitOfMeasure {
    /// Unit without a conversion factor
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            factor: None,
        }
    }

    /// Set the factor converting to the default unit
    pub fn with_factor(mut self, factor: f64) -> Self {
        self.factor = Some(factor);
        self
    }
}

/// One allowed-value domain of a literal input or output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiteralDataDomain {
    /// Allowed values
    pub possible_values: PossibleValues,

    /// Unit the values are expressed in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uom: Option<UnitOfMeasure>,

    /// Value used when the input is omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<LiteralValue>,
}

impl LiteralDataDomain {
    /// Domain accepting any value
    pub fn any() -> Self {
        Self::with_values(PossibleValues::Any)
    }

    /// Domain restricted to a list of values
    pub fn enumeration(values: impl IntoIterator<Item = LiteralValue>) -> Self {
        Self::with_values(PossibleValues::Enumeration(values.into_iter().collect()))
    }

    /// Domain restricted to a numeric range
    pub fn range(range: ValueRange) -> Self {
        Self::with_values(PossibleValues::Range(range))
    }

    fn with_values(possible_values: PossibleValues) -> Self {
        Self {
            possible_values,
            uom: None,
            default_value: None,
        }
    }

    /// Set the unit of measure
    pub fn with_uom(mut self, uom: UnitOfMeasure) -> Self {
        self.uom = Some(uom);
        self
    }

    /// Set the default value
    pub fn with_default(mut self, value: LiteralValue) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Unit code of the domain, if any
    pub fn uom_code(&self) -> Option<&str> {
        self.uom.as_ref().map(|uom| uom.code.as_str())
    }

    /// Whether the value is allowed by this domain
    pub fn contains(&self, value: &LiteralValue) -> bool {
        match &self.possible_values {
            PossibleValues::Any => true,
            PossibleValues::Enumeration(values) => values.iter().any(|v| v.same_value(value)),
            PossibleValues::Range(range) => value.as_f64().map_or(false, |v| range.contains(v)),
        }
    }
}

/// Literal payload description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiteralDescription {
    /// Declared scalar type
    pub data_type: LiteralType,
    /// Default domain, the reference for unit conversion
    pub default_domain: LiteralDataDomain,
    /// Additional domains
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supported_domains: Vec<LiteralDataDomain>,
}

impl LiteralDescription {
    /// Literal of the given type accepting any value
    pub fn new(data_type: LiteralType) -> Self {
        Self {
            data_type,
            default_domain: LiteralDataDomain::any(),
            supported_domains: Vec::new(),
        }
    }

    /// Replace the default domain
    pub fn with_default_domain(mut self, domain: LiteralDataDomain) -> Self {
        self.default_domain = domain;
        self
    }

    /// Add a supported domain
    pub fn with_supported_domain(mut self, domain: LiteralDataDomain) -> Self {
        self.supported_domains.push(domain);
        self
    }

    /// All domains, default first
    pub fn domains(&self) -> impl Iterator<Item = &LiteralDataDomain> {
        std::iter::once(&self.default_domain).chain(self.supported_domains.iter())
    }

    /// Default value of the default domain
    pub fn default_value(&self) -> Option<&LiteralValue> {
        self.default_domain.default_value.as_ref()
    }

    /// Unit codes declared by any domain
    pub fn units(&self) -> Vec<String> {
        let mut units: Vec<String> = Vec::new();
        for code in self.domains().filter_map(LiteralDataDomain::uom_code) {
            if !units.iter().any(|u| u == code) {
                units.push(code.to_string());
            }
        }
        units
    }
}

/// Bounding box payload description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBoxDescription {
    /// Supported coordinate reference systems, the first is the default
    pub supported_crs: Vec<String>,
    /// Number of coordinates per corner
    pub dimensions: u32,
}

impl BoundingBoxDescription {
    /// Two-dimensional bounding box in the given reference systems
    pub fn new(supported_crs: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            supported_crs: supported_crs.into_iter().map(Into::into).collect(),
            dimensions: 2,
        }
    }

    /// Set the dimension count
    pub fn with_dimensions(mut self, dimensions: u32) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// The default reference system
    pub fn default_crs(&self) -> Option<&str> {
        self.supported_crs.first().map(String::as_str)
    }
}

/// Complex payload description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexDescription {
    /// Supported formats, the first is the default
    pub supported_formats: Vec<Format>,
    /// Size limit advertised to clients
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum_megabytes: Option<u64>,
}

impl ComplexDescription {
    /// Complex payload in the given formats
    pub fn new(supported_formats: impl IntoIterator<Item = Format>) -> Self {
        Self {
            supported_formats: supported_formats.into_iter().collect(),
            maximum_megabytes: None,
        }
    }

    /// Set the advertised size limit
    pub fn with_maximum_megabytes(mut self, megabytes: u64) -> Self {
        self.maximum_megabytes = Some(megabytes);
        self
    }

    /// The default format
    pub fn default_format(&self) -> Option<&Format> {
        self.supported_formats.first()
    }

    /// The declared format a value in `format` satisfies
    pub fn find_format(&self, format: &Format) -> Option<&Format> {
        self.supported_formats
            .iter()
            .find(|supported| format.is_compatible_with(supported))
    }
}

/// Payload description of an input or output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataDescription {
    /// Literal payload
    Literal(LiteralDescription),
    /// Bounding box payload
    BoundingBox(BoundingBoxDescription),
    /// Complex payload
    Complex(ComplexDescription),
}

impl DataDescription {
    /// Payload kind
    pub fn kind(&self) -> DataKind {
        match self {
            DataDescription::Literal(_) => DataKind::Literal,
            DataDescription::BoundingBox(_) => DataKind::BoundingBox,
            DataDescription::Complex(_) => DataKind::Complex,
        }
    }
}

impl From<LiteralDescription> for DataDescription {
    fn from(description: LiteralDescription) -> Self {
        DataDescription::Literal(description)
    }
}

impl From<BoundingBoxDescription> for DataDescription {
    fn from(description: BoundingBoxDescription) -> Self {
        DataDescription::BoundingBox(description)
    }
}

impl From<ComplexDescription> for DataDescription {
    fn from(description: ComplexDescription) -> Self {
        DataDescription::Complex(description)
    }
}

/// Common view of input and output descriptions
pub trait Parameter {
    /// Identifier, unique among the process' inputs (or outputs)
    fn id(&self) -> &str;

    /// Occurrence bounds
    fn occurrence(&self) -> Occurrence;

    /// Payload description
    fn data(&self) -> &DataDescription;
}

/// Description of a process input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputDescription {
    /// Identifier
    pub id: String,
    /// Human readable title
    pub title: String,
    /// Longer description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    /// Occurrence bounds
    pub occurrence: Occurrence,
    /// Payload description
    pub data: DataDescription,
}

/// Description of a process output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputDescription {
    /// Identifier
    pub id: String,
    /// Human readable title
    pub title: String,
    /// Longer description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    /// Occurrence bounds
    pub occurrence: Occurrence,
    /// Payload description
    pub data: DataDescription,
}

impl Parameter for InputDescription {
    fn id(&self) -> &str {
        &self.id
    }

    fn occurrence(&self) -> Occurrence {
        self.occurrence
    }

    fn data(&self) -> &DataDescription {
        &self.data
    }
}

impl Parameter for OutputDescription {
    fn id(&self) -> &str {
        &self.id
    }

    fn occurrence(&self) -> Occurrence {
        self.occurrence
    }

    fn data(&self) -> &DataDescription {
        &self.data
    }
}

/// Consuming builder for input and output descriptions
#[derive(Debug)]
pub struct ParameterBuilder<T> {
    id: String,
    title: Option<String>,
    abstract_text: Option<String>,
    occurrence: Occurrence,
    data: DataDescription,
    _marker: PhantomData<T>,
}

impl<T> ParameterBuilder<T> {
    fn new(id: impl Into<String>, data: impl Into<DataDescription>) -> Self {
        Self {
            id: id.into(),
            title: None,
            abstract_text: None,
            occurrence: Occurrence::default(),
            data: data.into(),
            _marker: PhantomData,
        }
    }

    /// Set the title (defaults to the identifier)
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the abstract
    pub fn abstract_text(mut self, text: impl Into<String>) -> Self {
        self.abstract_text = Some(text.into());
        self
    }

    /// Set the occurrence bounds
    pub fn occurs(mut self, min: u32, max: Option<u32>) -> Self {
        self.occurrence = Occurrence::new(min, max);
        self
    }

    /// Shorthand for `[0, 1]`
    pub fn optional(self) -> Self {
        self.occurs(0, Some(1))
    }
}

impl ParameterBuilder<InputDescription> {
    /// Finish the input description
    pub fn build(self) -> InputDescription {
        InputDescription {
            title: self.title.unwrap_or_else(|| self.id.clone()),
            id: self.id,
            abstract_text: self.abstract_text,
            occurrence: self.occurrence,
            data: self.data,
        }
    }
}

impl ParameterBuilder<OutputDescription> {
    /// Finish the output description
    pub fn build(self) -> OutputDescription {
        OutputDescription {
            title: self.title.unwrap_or_else(|| self.id.clone()),
            id: self.id,
            abstract_text: self.abstract_text,
            occurrence: self.occurrence,
            data: self.data,
        }
    }
}

impl InputDescription {
    /// Start describing an input
    pub fn builder(
        id: impl Into<String>,
        data: impl Into<DataDescription>,
    ) -> ParameterBuilder<InputDescription> {
        ParameterBuilder::new(id, data)
    }

    /// Literal description, if this is a literal input
    pub fn literal(&self) -> Option<&LiteralDescription> {
        match &self.data {
            DataDescription::Literal(literal) => Some(literal),
            _ => None,
        }
    }
}

impl OutputDescription {
    /// Start describing an output
    pub fn builder(
        id: impl Into<String>,
        data: impl Into<DataDescription>,
    ) -> ParameterBuilder<OutputDescription> {
        ParameterBuilder::new(id, data)
    }
}

/// A well-formedness problem of a process description
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DescriptionViolation {
    /// The process or one of its parameters has an empty identifier
    #[error("Empty identifier ({context})")]
    EmptyIdentifier {
        /// Where the identifier is missing
        context: String,
    },

    /// Two inputs share an identifier
    #[error("Duplicate input identifier {id}")]
    DuplicateInput {
        /// Input identifier
        id: String,
    },

    /// Two outputs share an identifier
    #[error("Duplicate output identifier {id}")]
    DuplicateOutput {
        /// Output identifier
        id: String,
    },

    /// The process declares no output
    #[error("Process declares no outputs")]
    NoOutputs,

    /// Occurrence bounds with `max < min` or `max == 0`
    #[error("Invalid occurrence bounds on {id}")]
    InvalidOccurrence {
        /// Parameter identifier
        id: String,
    },

    /// A range whose bounds are unordered or not finite
    #[error("Invalid range on {id}")]
    InvalidRange {
        /// Parameter identifier
        id: String,
    },

    /// A range spacing that is not strictly positive
    #[error("Invalid range spacing on {id}")]
    InvalidSpacing {
        /// Parameter identifier
        id: String,
    },

    /// An enumeration without values
    #[error("Empty enumeration on {id}")]
    EmptyEnumeration {
        /// Parameter identifier
        id: String,
    },

    /// An enumeration value of a type the literal does not declare
    #[error("Enumeration value {value} on {id} is not of the declared type")]
    EnumerationTypeMismatch {
        /// Parameter identifier
        id: String,
        /// Offending value
        value: String,
    },

    /// A domain default value the domain itself rejects
    #[error("Default value {value} on {id} lies outside its domain")]
    DefaultOutOfDomain {
        /// Parameter identifier
        id: String,
        /// Offending value
        value: String,
    },

    /// A complex parameter without formats
    #[error("No supported format on {id}")]
    NoSupportedFormat {
        /// Parameter identifier
        id: String,
    },

    /// A bounding box parameter without reference systems
    #[error("No supported CRS on {id}")]
    NoSupportedCrs {
        /// Parameter identifier
        id: String,
    },

    /// The description names a different process than the one registered
    #[error("Description identifier {actual} differs from registered identifier {expected}")]
    IdentifierMismatch {
        /// Identifier the process is registered under
        expected: String,
        /// Identifier found in the description
        actual: String,
    },

    /// 1.0.0 outputs occur exactly once
    #[error("Output {id} must occur exactly once")]
    OutputMultiplicity {
        /// Output identifier
        id: String,
    },

    /// 2.0.0 identifiers are whitespace-free
    #[error("Identifier {id} contains whitespace")]
    WhitespaceInIdentifier {
        /// Offending identifier
        id: String,
    },
}

/// Immutable description of a process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessDescription {
    /// Identifier, unique within a registry
    pub id: ProcessId,
    /// Human readable title
    pub title: String,
    /// Longer description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    /// Ordered, de-duplicated keywords
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Metadata links
    #[serde(default)]
    pub metadata: Vec<Metadata>,
    /// Version of the process itself
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Inputs in declaration order
    pub inputs: Vec<InputDescription>,
    /// Outputs in declaration order
    pub outputs: Vec<OutputDescription>,
}

impl ProcessDescription {
    /// Start describing a process
    pub fn builder(id: impl Into<ProcessId>) -> ProcessDescriptionBuilder {
        ProcessDescriptionBuilder::new(id.into())
    }

    /// Input by identifier
    pub fn input(&self, id: &str) -> Option<&InputDescription> {
        self.inputs.iter().find(|input| input.id == id)
    }

    /// Output by identifier
    pub fn output(&self, id: &str) -> Option<&OutputDescription> {
        self.outputs.iter().find(|output| output.id == id)
    }

    /// Everything that keeps this description from being published under `version`
    pub fn violations(&self, version: ProtocolVersion) -> Vec<DescriptionViolation> {
        let mut violations = Vec::new();

        if self.id.as_str().trim().is_empty() {
            violations.push(DescriptionViolation::EmptyIdentifier {
                context: "process".to_string(),
            });
        }
        if self.outputs.is_empty() {
            violations.push(DescriptionViolation::NoOutputs);
        }

        let mut seen = HashSet::new();
        for input in &self.inputs {
            if !seen.insert(input.id.as_str()) {
                violations.push(DescriptionViolation::DuplicateInput {
                    id: input.id.clone(),
                });
            }
            check_parameter(input, "input", &mut violations);
        }

        let mut seen = HashSet::new();
        for output in &self.outputs {
            if !seen.insert(output.id.as_str()) {
                violations.push(DescriptionViolation::DuplicateOutput {
                    id: output.id.clone(),
                });
            }
            check_parameter(output, "output", &mut violations);
        }

        match version {
            ProtocolVersion::V1_0_0 => {
                for output in &self.outputs {
                    if output.occurrence != Occurrence::default() {
                        violations.push(DescriptionViolation::OutputMultiplicity {
                            id: output.id.clone(),
                        });
                    }
                }
            }
            ProtocolVersion::V2_0_0 => {
                let identifiers = std::iter::once(self.id.as_str())
                    .chain(self.inputs.iter().map(|i| i.id.as_str()))
                    .chain(self.outputs.iter().map(|o| o.id.as_str()));
                for id in identifiers {
                    if id.chars().any(char::is_whitespace) {
                        violations.push(DescriptionViolation::WhitespaceInIdentifier {
                            id: id.to_string(),
                        });
                    }
                }
            }
        }

        violations
    }

    /// Whether the description can be published under `version`
    pub fn is_valid_for(&self, version: ProtocolVersion) -> bool {
        self.violations(version).is_empty()
    }
}

fn check_parameter<P: Parameter>(
    parameter: &P,
    context: &str,
    violations: &mut Vec<DescriptionViolation>,
) {
    let id = parameter.id();
    if id.trim().is_empty() {
        violations.push(DescriptionViolation::EmptyIdentifier {
            context: context.to_string(),
        });
    }
    if !parameter.occurrence().is_well_formed() {
        violations.push(DescriptionViolation::InvalidOccurrence { id: id.to_string() });
    }

    match parameter.data() {
        DataDescription::Literal(literal) => {
            for domain in literal.domains() {
                check_domain(id, literal.data_type, domain, violations);
            }
        }
        DataDescription::BoundingBox(bbox) => {
            if bbox.supported_crs.is_empty() {
                violations.push(DescriptionViolation::NoSupportedCrs { id: id.to_string() });
            }
        }
        DataDescription::Complex(complex) => {
            if complex.supported_formats.is_empty() {
                violations.push(DescriptionViolation::NoSupportedFormat { id: id.to_string() });
            }
        }
    }
}

fn check_domain(
    id: &str,
    data_type: LiteralType,
    domain: &LiteralDataDomain,
    violations: &mut Vec<DescriptionViolation>,
) {
    match &domain.possible_values {
        PossibleValues::Any => {}
        PossibleValues::Enumeration(values) => {
            if values.is_empty() {
                violations.push(DescriptionViolation::EmptyEnumeration { id: id.to_string() });
            }
            for value in values {
                if !data_type.admits(value.literal_type()) {
                    violations.push(DescriptionViolation::EnumerationTypeMismatch {
                        id: id.to_string(),
                        value: value.to_string(),
                    });
                }
            }
        }
        PossibleValues::Range(range) => {
            if !matches!(data_type, LiteralType::Integer | LiteralType::Double)
                || !range.is_well_formed()
            {
                violations.push(DescriptionViolation::InvalidRange { id: id.to_string() });
            }
            if let Some(spacing) = range.spacing {
                if !(spacing.is_finite() && spacing > 0.0) {
                    violations.push(DescriptionViolation::InvalidSpacing { id: id.to_string() });
                }
            }
        }
    }

    if let Some(default) = &domain.default_value {
        if !data_type.admits(default.literal_type()) || !domain.contains(default) {
            violations.push(DescriptionViolation::DefaultOutOfDomain {
                id: id.to_string(),
                value: default.to_string(),
            });
        }
    }
}

/// Consuming builder for [`ProcessDescription`]
#[derive(Debug)]
pub struct ProcessDescriptionBuilder {
    id: ProcessId,
    title: Option<String>,
    abstract_text: Option<String>,
    keywords: Vec<String>,
    metadata: Vec<Metadata>,
    version: Option<String>,
    inputs: Vec<InputDescription>,
    outputs: Vec<OutputDescription>,
}

impl ProcessDescriptionBuilder {
    fn new(id: ProcessId) -> Self {
        Self {
            id,
            title: None,
            abstract_text: None,
            keywords: Vec::new(),
            metadata: Vec::new(),
            version: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Set the title (defaults to the identifier)
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the abstract
    pub fn abstract_text(mut self, text: impl Into<String>) -> Self {
        self.abstract_text = Some(text.into());
        self
    }

    /// Add a keyword; repeated keywords are ignored
    pub fn keyword(mut self, keyword: impl Into<String>) -> Self {
        let keyword = keyword.into();
        if !self.keywords.contains(&keyword) {
            self.keywords.push(keyword);
        }
        self
    }

    /// Add several keywords
    pub fn keywords(self, keywords: impl IntoIterator<Item = impl Into<String>>) -> Self {
        keywords.into_iter().fold(self, |builder, k| builder.keyword(k))
    }

    /// Add a metadata link
    pub fn metadata(mut self, role: impl Into<String>, href: impl Into<String>) -> Self {
        self.metadata.push(Metadata {
            role: role.into(),
            href: href.into(),
        });
        self
    }

    /// Set the process version
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Append an input
    pub fn input(mut self, input: InputDescription) -> Self {
        self.inputs.push(input);
        self
    }

    /// Append an output
    pub fn output(mut self, output: OutputDescription) -> Self {
        self.outputs.push(output);
        self
    }

    /// Finish the description
    pub fn build(self) -> ProcessDescription {
        ProcessDescription {
            title: self.title.unwrap_or_else(|| self.id.0.clone()),
            id: self.id,
            abstract_text: self.abstract_text,
            keywords: self.keywords,
            metadata: self.metadata,
            version: self.version,
            inputs: self.inputs,
            outputs: self.outputs,
        }
    }
}
