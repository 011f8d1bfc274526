use crate::application::formats::FormatRegistry;
use crate::domain::data::{
    BoundInputs, ComplexPayload, ProcessData, ProcessOutputs, TypedData, TypedLiteral,
};
use crate::domain::description::{
    DataDescription, InputDescription, OutputDescription, ProcessDescription,
};
use crate::domain::request::{OutputDefinition, TransmissionMode};
use crate::domain::response::{EncodedData, OutputPayload, RenderedOutput};
use crate::domain::validation::{validate_occurrence, validate_value};
use crate::error::{RenderError, ValidationError};
use crate::types::{DataKind, Format};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// Outputs ready for the response, plus the bodies of by-reference outputs
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderedOutputs {
    /// Rendered outputs in request (or description) order
    pub outputs: Vec<RenderedOutput>,
    /// Encoded bodies of outputs transmitted by reference
    pub references: HashMap<String, EncodedData>,
}

/// Converts between wire values and the typed values algorithms work on
#[derive(Debug, Clone, Default)]
pub struct DataBinder {
    formats: Arc<FormatRegistry>,
}

impl DataBinder {
    /// Binder using the given format collaborators
    pub fn new(formats: Arc<FormatRegistry>) -> Self {
        Self { formats }
    }

    /// Validate request inputs against the description.
    ///
    /// Unknown identifiers are reported before anything else. Omitted optional
    /// literals receive the default value of their default domain.
    pub fn bind_inputs(
        &self,
        description: &ProcessDescription,
        raw_inputs: &[ProcessData],
    ) -> Result<BoundInputs, ValidationError> {
        if let Some(unknown) = raw_inputs
            .iter()
            .find(|data| description.input(&data.id).is_none())
        {
            return Err(ValidationError::UnknownInput {
                id: unknown.id.clone(),
            });
        }

        let mut bound = BoundInputs::new();
        for input in &description.inputs {
            let occurrences: Vec<&ProcessData> = raw_inputs
                .iter()
                .filter(|data| data.id == input.id)
                .collect();

            if occurrences.is_empty() {
                if input.occurrence.is_required() {
                    return Err(ValidationError::MissingInput {
                        id: input.id.clone(),
                    });
                }
                if let Some(default) = literal_default(input) {
                    trace!(input = %input.id, "Binding default value");
                    bound.push(input.id.clone(), default);
                }
                continue;
            }

            validate_occurrence(input, occurrences.len())?;
            for data in occurrences {
                let typed = validate_value(input, &data.value)?;
                bound.push(input.id.clone(), self.decode(&input.id, typed)?);
            }
        }

        Ok(bound)
    }

    fn decode(&self, id: &str, typed: TypedData) -> Result<TypedData, ValidationError> {
        let TypedData::Complex(complex) = &typed else {
            return Ok(typed);
        };
        let ComplexPayload::Bytes(bytes) = &complex.payload else {
            return Ok(typed);
        };

        match self.formats.parser_for(&complex.format, DataKind::Complex) {
            Some(parser) => parser
                .decode(&complex.format, bytes, DataKind::Complex)
                .map_err(|e| ValidationError::MalformedContent {
                    id: id.to_string(),
                    message: e.to_string(),
                }),
            None => Ok(typed),
        }
    }

    /// Render produced outputs for the response.
    ///
    /// An empty definition list selects every output. Outputs declared with
    /// `min == 0` that were not produced are skipped, whether selected or
    /// requested. `href_for` maps an output identifier to the location of its
    /// stored body.
    pub fn render_outputs<H>(
        &self,
        description: &ProcessDescription,
        definitions: &[OutputDefinition],
        produced: &ProcessOutputs,
        href_for: H,
    ) -> Result<RenderedOutputs, RenderError>
    where
        H: Fn(&str) -> String,
    {
        let selected: Vec<(&OutputDescription, OutputDefinition)> = if definitions.is_empty() {
            description
                .outputs
                .iter()
                .filter(|output| {
                    output.occurrence.is_required() || produced.contains_key(&output.id)
                })
                .map(|output| (output, OutputDefinition::new(output.id.clone())))
                .collect()
        } else {
            definitions
                .iter()
                .map(|definition| {
                    description
                        .output(&definition.id)
                        .map(|output| (output, definition.clone()))
                        .ok_or_else(|| RenderError::MissingOutput {
                            id: definition.id.clone(),
                        })
                })
                .collect::<Result<_, _>>()?
        };

        let mut rendered = RenderedOutputs::default();
        for (output, definition) in selected {
            let value = match produced.get(&output.id) {
                Some(value) => value,
                None if output.occurrence.is_required() => {
                    return Err(RenderError::MissingOutput {
                        id: output.id.clone(),
                    })
                }
                None => continue,
            };
            if value.kind() != output.data.kind() {
                return Err(RenderError::KindMismatch {
                    id: output.id.clone(),
                    expected: output.data.kind(),
                    actual: value.kind(),
                });
            }

            let payload = match definition.transmission {
                TransmissionMode::Value => self.render_value(output, &definition, value)?,
                TransmissionMode::Reference => {
                    let encoded = self.encode(output, &definition, value)?;
                    let payload = OutputPayload::Reference {
                        href: href_for(&output.id),
                        format: encoded.format.clone(),
                    };
                    rendered.references.insert(output.id.clone(), encoded);
                    payload
                }
            };

            rendered.outputs.push(RenderedOutput {
                id: output.id.clone(),
                payload,
            });
        }

        Ok(rendered)
    }

    fn render_value(
        &self,
        output: &OutputDescription,
        definition: &OutputDefinition,
        value: &TypedData,
    ) -> Result<OutputPayload, RenderError> {
        match value {
            TypedData::Literal(literal) => {
                check_inline_format(output, definition, &Format::text_plain())?;
                Ok(OutputPayload::Literal(literal.clone()))
            }
            TypedData::BoundingBox(bbox) => {
                check_inline_format(output, definition, &Format::json())?;
                Ok(OutputPayload::BoundingBox(bbox.clone()))
            }
            TypedData::Complex(_) => self
                .encode(output, definition, value)
                .map(OutputPayload::Encoded),
        }
    }

    fn encode(
        &self,
        output: &OutputDescription,
        definition: &OutputDefinition,
        value: &TypedData,
    ) -> Result<EncodedData, RenderError> {
        let id = output.id.clone();
        match (&output.data, value) {
            (DataDescription::Literal(_), TypedData::Literal(TypedLiteral { value, .. })) => {
                let format = check_inline_format(output, definition, &Format::text_plain())?;
                Ok(EncodedData {
                    format,
                    bytes: value.to_string().into_bytes(),
                })
            }
            (DataDescription::BoundingBox(_), TypedData::BoundingBox(bbox)) => {
                let format = check_inline_format(output, definition, &Format::json())?;
                let bytes = serde_json::to_vec(bbox).map_err(|e| RenderError::Encoding {
                    id,
                    message: e.to_string(),
                })?;
                Ok(EncodedData { format, bytes })
            }
            (DataDescription::Complex(complex), TypedData::Complex(data)) => {
                let requested = match &definition.format {
                    Some(format) => format.clone(),
                    None => complex
                        .default_format()
                        .cloned()
                        .ok_or_else(|| RenderError::UnsupportedFormat {
                            id: id.clone(),
                            format: data.format.clone(),
                        })?,
                };
                if complex.find_format(&requested).is_none() {
                    return Err(RenderError::UnsupportedFormat {
                        id,
                        format: requested,
                    });
                }

                if let ComplexPayload::Bytes(bytes) = &data.payload {
                    if data.format.is_compatible_with(&requested) {
                        return Ok(EncodedData {
                            format: requested,
                            bytes: bytes.clone(),
                        });
                    }
                }

                let generator = self
                    .formats
                    .generator_for(&requested, DataKind::Complex)
                    .ok_or_else(|| RenderError::UnsupportedFormat {
                        id: id.clone(),
                        format: requested.clone(),
                    })?;
                let bytes = generator
                    .encode(&requested, value)
                    .map_err(|e| RenderError::Encoding {
                        id,
                        message: e.to_string(),
                    })?;
                Ok(EncodedData {
                    format: requested,
                    bytes,
                })
            }
            (description, value) => Err(RenderError::KindMismatch {
                id,
                expected: description.kind(),
                actual: value.kind(),
            }),
        }
    }
}

/// Literal and bounding box outputs are only rendered in their native format
fn check_inline_format(
    output: &OutputDescription,
    definition: &OutputDefinition,
    native: &Format,
) -> Result<Format, RenderError> {
    match &definition.format {
        Some(format) if !format.is_compatible_with(native) => Err(RenderError::UnsupportedFormat {
            id: output.id.clone(),
            format: format.clone(),
        }),
        _ => Ok(native.clone()),
    }
}

fn literal_default(input: &InputDescription) -> Option<TypedData> {
    let literal = input.literal()?;
    let value = literal.default_value()?.clone();
    Some(TypedData::Literal(TypedLiteral {
        value,
        uom: literal.default_domain.uom_code().map(str::to_string),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::formats::{MockFormatGenerator, MockFormatParser};
    use crate::domain::data::{BoundingBoxData, ComplexData};
    use crate::domain::description::{
        BoundingBoxDescription, ComplexDescription, LiteralDataDomain, LiteralDescription,
        UnitOfMeasure, ValueRange,
    };
    use crate::error::FormatError;
    use crate::types::{LiteralType, LiteralValue};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn buffer_description() -> ProcessDescription {
        ProcessDescription::builder("buffer")
            .input(
                InputDescription::builder(
                    "geometry",
                    ComplexDescription::new([Format::json(), Format::new("text/xml")]),
                )
                .build(),
            )
            .input(
                InputDescription::builder(
                    "distance",
                    LiteralDescription::new(LiteralType::Double).with_default_domain(
                        LiteralDataDomain::range(ValueRange::new(0.0, 100.0))
                            .with_uom(UnitOfMeasure::new("m"))
                            .with_default(LiteralValue::Double(10.0)),
                    ),
                )
                .optional()
                .build(),
            )
            .input(
                InputDescription::builder("tag", LiteralDescription::new(LiteralType::String))
                    .occurs(0, Some(2))
                    .build(),
            )
            .output(
                OutputDescription::builder(
                    "buffered",
                    ComplexDescription::new([Format::json(), Format::new("text/xml")]),
                )
                .build(),
            )
            .output(
                OutputDescription::builder("area", LiteralDescription::new(LiteralType::Double))
                    .build(),
            )
            .output(
                OutputDescription::builder("extent", BoundingBoxDescription::new(["EPSG:4326"]))
                    .optional()
                    .build(),
            )
            .build()
    }

    fn geometry() -> ProcessData {
        ProcessData::complex(
            "geometry",
            ComplexData::bytes(Format::json(), br#"{"type":"Point"}"#.to_vec()),
        )
    }

    fn produced() -> ProcessOutputs {
        let mut outputs = ProcessOutputs::new();
        outputs.insert(
            "buffered".to_string(),
            TypedData::Complex(ComplexData::structured(Format::json(), json!({"type": "Polygon"}))),
        );
        outputs.insert("area".to_string(), TypedData::literal(LiteralValue::Double(2.5)));
        outputs
    }

    #[test]
    fn test_unknown_input_reported_first() {
        let binder = DataBinder::default();
        let result = binder.bind_inputs(
            &buffer_description(),
            &[ProcessData::literal("colour", "red")],
        );
        assert_eq!(
            result,
            Err(ValidationError::UnknownInput {
                id: "colour".to_string()
            })
        );
    }

    #[test]
    fn test_missing_required_input() {
        let binder = DataBinder::default();
        let result = binder.bind_inputs(&buffer_description(), &[]);
        assert_eq!(
            result,
            Err(ValidationError::MissingInput {
                id: "geometry".to_string()
            })
        );
    }

    #[test]
    fn test_too_many_occurrences() {
        let binder = DataBinder::default();
        let inputs = vec![
            geometry(),
            ProcessData::literal("tag", "a"),
            ProcessData::literal("tag", "b"),
            ProcessData::literal("tag", "c"),
        ];
        assert!(matches!(
            binder.bind_inputs(&buffer_description(), &inputs),
            Err(ValidationError::OccurrenceOutOfBounds { actual: 3, .. })
        ));
    }

    #[test]
    fn test_default_literal_is_bound_for_omitted_optional_input() {
        let binder = DataBinder::default();
        let bound = binder.bind_inputs(&buffer_description(), &[geometry()]).unwrap();

        assert_eq!(
            bound.first("distance"),
            Some(&TypedData::literal_with_uom(LiteralValue::Double(10.0), "m"))
        );
        assert!(bound.get("tag").is_empty());
    }

    #[test]
    fn test_complex_input_decoded_by_parser() {
        let mut parser = MockFormatParser::new();
        parser
            .expect_supports()
            .returning(|format, _| format.mime_type == "application/json");
        parser.expect_decode().times(1).returning(|format, bytes, _| {
            let document: serde_json::Value = serde_json::from_slice(bytes)
                .map_err(|e| FormatError::Malformed(e.to_string()))?;
            Ok(TypedData::Complex(ComplexData::structured(format.clone(), document)))
        });

        let binder = DataBinder::new(Arc::new(FormatRegistry::new().with_parser(Arc::new(parser))));
        let bound = binder.bind_inputs(&buffer_description(), &[geometry()]).unwrap();

        assert_eq!(
            bound.first("geometry").and_then(TypedData::as_complex),
            Some(&ComplexData::structured(Format::json(), json!({"type": "Point"})))
        );
    }

    #[test]
    fn test_parser_failure_is_malformed_content() {
        let mut parser = MockFormatParser::new();
        parser.expect_supports().returning(|_, _| true);
        parser
            .expect_decode()
            .returning(|_, _, _| Err(FormatError::Malformed("unexpected token".to_string())));

        let binder = DataBinder::new(Arc::new(FormatRegistry::new().with_parser(Arc::new(parser))));
        assert_eq!(
            binder.bind_inputs(&buffer_description(), &[geometry()]),
            Err(ValidationError::MalformedContent {
                id: "geometry".to_string(),
                message: "Malformed content: unexpected token".to_string(),
            })
        );
    }

    fn json_generator() -> MockFormatGenerator {
        let mut generator = MockFormatGenerator::new();
        generator
            .expect_supports()
            .returning(|format, _| format.mime_type == "application/json");
        generator.expect_encode().returning(|_, data| match data {
            TypedData::Complex(ComplexData {
                payload: ComplexPayload::Structured(document),
                ..
            }) => serde_json::to_vec(document).map_err(|e| FormatError::Malformed(e.to_string())),
            _ => Err(FormatError::Unsupported(Format::json())),
        });
        generator
    }

    #[test]
    fn test_render_all_outputs_in_description_order() {
        let binder = DataBinder::new(Arc::new(
            FormatRegistry::new().with_generator(Arc::new(json_generator())),
        ));
        let rendered = binder
            .render_outputs(&buffer_description(), &[], &produced(), |id| {
                format!("/jobs/1/outputs/{}", id)
            })
            .unwrap();

        assert_eq!(
            rendered.outputs,
            vec![
                RenderedOutput {
                    id: "buffered".to_string(),
                    payload: OutputPayload::Encoded(EncodedData {
                        format: Format::json(),
                        bytes: br#"{"type":"Polygon"}"#.to_vec(),
                    }),
                },
                RenderedOutput {
                    id: "area".to_string(),
                    payload: OutputPayload::Literal(TypedLiteral {
                        value: LiteralValue::Double(2.5),
                        uom: None,
                    }),
                },
            ]
        );
        assert!(rendered.references.is_empty());
    }

    #[test]
    fn test_render_by_reference_stores_body() {
        let binder = DataBinder::new(Arc::new(
            FormatRegistry::new().with_generator(Arc::new(json_generator())),
        ));
        let definitions = vec![OutputDefinition::new("buffered").by_reference()];
        let rendered = binder
            .render_outputs(&buffer_description(), &definitions, &produced(), |id| {
                format!("/jobs/1/outputs/{}", id)
            })
            .unwrap();

        assert_eq!(
            rendered.outputs[0].payload,
            OutputPayload::Reference {
                href: "/jobs/1/outputs/buffered".to_string(),
                format: Format::json(),
            }
        );
        assert_eq!(
            rendered.references.get("buffered").map(|e| e.bytes.clone()),
            Some(br#"{"type":"Polygon"}"#.to_vec())
        );
    }

    #[test]
    fn test_render_errors() {
        let binder = DataBinder::default();

        let xml = vec![OutputDefinition::new("buffered").with_format(Format::new("text/xml"))];
        assert_eq!(
            binder.render_outputs(&buffer_description(), &xml, &produced(), |id| id.to_string()),
            Err(RenderError::UnsupportedFormat {
                id: "buffered".to_string(),
                format: Format::new("text/xml"),
            })
        );

        let png = vec![OutputDefinition::new("buffered").with_format(Format::new("image/png"))];
        assert!(matches!(
            binder.render_outputs(&buffer_description(), &png, &produced(), |id| id.to_string()),
            Err(RenderError::UnsupportedFormat { .. })
        ));

        let area = vec![OutputDefinition::new("area")];
        let mut without_area = produced();
        without_area.shift_remove("area");
        assert_eq!(
            binder.render_outputs(&buffer_description(), &area, &without_area, |id| id.to_string()),
            Err(RenderError::MissingOutput {
                id: "area".to_string()
            })
        );

        let extent = vec![OutputDefinition::new("extent")];
        let mut wrong_kind = produced();
        wrong_kind.insert("area".to_string(), TypedData::string("large"));
        wrong_kind.insert(
            "extent".to_string(),
            TypedData::literal(LiteralValue::Integer(1)),
        );
        assert!(matches!(
            binder.render_outputs(&buffer_description(), &extent, &wrong_kind, |id| id.to_string()),
            Err(RenderError::KindMismatch {
                expected: DataKind::BoundingBox,
                actual: DataKind::Literal,
                ..
            })
        ));
    }

    #[test]
    fn test_requested_optional_output_not_produced_is_skipped() {
        let binder = DataBinder::default();
        let definitions = vec![OutputDefinition::new("area"), OutputDefinition::new("extent")];

        let rendered = binder
            .render_outputs(&buffer_description(), &definitions, &produced(), |id| id.to_string())
            .unwrap();

        let ids: Vec<&str> = rendered.outputs.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["area"]);
    }

    #[test]
    fn test_bytes_in_requested_format_pass_through() {
        let binder = DataBinder::default();
        let mut outputs = produced();
        outputs.insert(
            "buffered".to_string(),
            TypedData::Complex(ComplexData::bytes(Format::new("text/xml"), b"<gml/>".to_vec())),
        );
        outputs.insert(
            "extent".to_string(),
            TypedData::BoundingBox(BoundingBoxData::new(vec![0.0, 0.0], vec![1.0, 1.0])),
        );
        let definitions = vec![
            OutputDefinition::new("buffered").with_format(Format::new("text/xml")),
            OutputDefinition::new("extent"),
        ];

        let rendered = binder
            .render_outputs(&buffer_description(), &definitions, &outputs, |id| id.to_string())
            .unwrap();
        assert_eq!(
            rendered.outputs[0].payload,
            OutputPayload::Encoded(EncodedData {
                format: Format::new("text/xml"),
                bytes: b"<gml/>".to_vec(),
            })
        );
        assert!(matches!(rendered.outputs[1].payload, OutputPayload::BoundingBox(_)));
    }
}
