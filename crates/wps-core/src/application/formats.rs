use crate::domain::data::TypedData;
use crate::error::FormatError;
use crate::types::{DataKind, Format};
use std::fmt;
use std::sync::Arc;

/// Decodes complex input bytes into a structured value
#[cfg_attr(test, mockall::automock)]
pub trait FormatParser: Send + Sync {
    /// Whether this parser handles `format` for values of `kind`
    fn supports(&self, format: &Format, kind: DataKind) -> bool;

    /// Decode the bytes
    fn decode(&self, format: &Format, bytes: &[u8], kind: DataKind)
        -> Result<TypedData, FormatError>;
}

/// Encodes an output value into bytes of a requested format
#[cfg_attr(test, mockall::automock)]
pub trait FormatGenerator: Send + Sync {
    /// Whether this generator can produce `format` from values of `kind`
    fn supports(&self, format: &Format, kind: DataKind) -> bool;

    /// Encode the value
    fn encode(&self, format: &Format, data: &TypedData) -> Result<Vec<u8>, FormatError>;
}

/// Parsers and generators available to the binding layer.
///
/// Lookups return the first registered collaborator that supports the
/// format, so registration order decides precedence.
#[derive(Clone, Default)]
pub struct FormatRegistry {
    parsers: Vec<Arc<dyn FormatParser>>,
    generators: Vec<Arc<dyn FormatGenerator>>,
}

impl FormatRegistry {
    /// Registry without any collaborator
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parser
    pub fn with_parser(mut self, parser: Arc<dyn FormatParser>) -> Self {
        self.parsers.push(parser);
        self
    }

    /// Add a generator
    pub fn with_generator(mut self, generator: Arc<dyn FormatGenerator>) -> Self {
        self.generators.push(generator);
        self
    }

    /// Parser for `format`
    pub fn parser_for(&self, format: &Format, kind: DataKind) -> Option<Arc<dyn FormatParser>> {
        self.parsers
            .iter()
            .find(|parser| parser.supports(format, kind))
            .cloned()
    }

    /// Generator for `format`
    pub fn generator_for(
        &self,
        format: &Format,
        kind: DataKind,
    ) -> Option<Arc<dyn FormatGenerator>> {
        self.generators
            .iter()
            .find(|generator| generator.supports(format, kind))
            .cloned()
    }
}

impl fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatRegistry")
            .field("parsers", &self.parsers.len())
            .field("generators", &self.generators.len())
            .finish()
    }
}
