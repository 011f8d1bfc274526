//! Checks runtime values against their descriptions

use crate::domain::data::{
    describe_raw, BoundingBoxData, LiteralData, ProcessValue, TypedData, TypedLiteral,
};
use crate::domain::description::{
    BoundingBoxDescription, DataDescription, LiteralDataDomain, LiteralDescription, Parameter,
};
use crate::error::ValidationError;
use serde_json::Value;

/// Reject occurrence counts outside the parameter's `[min, max]`
pub fn validate_occurrence<P: Parameter>(parameter: &P, count: usize) -> Result<(), ValidationError> {
    let occurrence = parameter.occurrence();
    if occurrence.accepts(count) {
        Ok(())
    } else {
        Err(ValidationError::OccurrenceOutOfBounds {
            id: parameter.id().to_string(),
            min: occurrence.min,
            max: occurrence.max,
            actual: count,
        })
    }
}

/// Validate one occurrence of a value and produce its typed form
pub fn validate_value<P: Parameter>(
    parameter: &P,
    value: &ProcessValue,
) -> Result<TypedData, ValidationError> {
    let id = parameter.id();
    match (parameter.data(), value) {
        (DataDescription::Literal(description), ProcessValue::Literal(data)) => {
            validate_literal(id, description, data).map(TypedData::Literal)
        }
        (DataDescription::BoundingBox(description), ProcessValue::BoundingBox(bbox)) => {
            validate_bounding_box(id, description, bbox).map(TypedData::BoundingBox)
        }
        (DataDescription::Complex(description), ProcessValue::Complex(complex)) => {
            if description.find_format(&complex.format).is_none() {
                return Err(ValidationError::UnsupportedFormat {
                    id: id.to_string(),
                    format: complex.format.clone(),
                });
            }
            Ok(TypedData::Complex(complex.clone()))
        }
        (description, value) => Err(ValidationError::KindMismatch {
            id: id.to_string(),
            expected: description.kind(),
            actual: value.kind(),
        }),
    }
}

/// Coerce a literal, pick the domain matching its unit and convert it to the
/// default unit.
///
/// A value without a unit is read in the default unit and only checked
/// against domains declared in that unit.
pub fn validate_literal(
    id: &str,
    description: &LiteralDescription,
    data: &LiteralData,
) -> Result<TypedLiteral, ValidationError> {
    let type_mismatch = || ValidationError::TypeMismatch {
        id: id.to_string(),
        expected: description.data_type.to_string(),
        actual: describe_raw(&data.value),
    };

    let value = description
        .data_type
        .coerce(&data.value)
        .ok_or_else(type_mismatch)?;

    let candidates: Vec<&LiteralDataDomain> = match &data.uom {
        Some(uom) => {
            let matching: Vec<_> = description
                .domains()
                .filter(|domain| domain.uom_code() == Some(uom.as_str()))
                .collect();
            if matching.is_empty() {
                return Err(ValidationError::UnsupportedUnit {
                    id: id.to_string(),
                    uom: uom.clone(),
                    supported: description.units(),
                });
            }
            matching
        }
        None => {
            let default_unit = description.default_domain.uom_code();
            description
                .domains()
                .filter(|domain| domain.uom_code() == default_unit)
                .collect()
        }
    };

    let domain = candidates
        .into_iter()
        .find(|domain| domain.contains(&value))
        .ok_or_else(|| ValidationError::OutOfDomain {
            id: id.to_string(),
            value: value.to_string(),
        })?;

    let factor = domain.uom.as_ref().and_then(|uom| uom.factor);
    match (factor, value.as_f64()) {
        (Some(factor), Some(number)) => {
            let converted = description
                .data_type
                .coerce(&Value::from(number * factor))
                .ok_or_else(type_mismatch)?;
            Ok(TypedLiteral {
                value: converted,
                uom: description.default_domain.uom_code().map(str::to_string),
            })
        }
        _ => Ok(TypedLiteral {
            value,
            uom: data
                .uom
                .clone()
                .or_else(|| domain.uom_code().map(str::to_string)),
        }),
    }
}

fn validate_bounding_box(
    id: &str,
    description: &BoundingBoxDescription,
    bbox: &BoundingBoxData,
) -> Result<BoundingBoxData, ValidationError> {
    let crs = match &bbox.crs {
        Some(crs) => {
            if !description.supported_crs.iter().any(|supported| supported == crs) {
                return Err(ValidationError::UnsupportedCrs {
                    id: id.to_string(),
                    crs: crs.clone(),
                });
            }
            Some(crs.clone())
        }
        None => description.default_crs().map(str::to_string),
    };

    if bbox.dimensions() != Some(description.dimensions as usize) {
        return Err(ValidationError::MalformedContent {
            id: id.to_string(),
            message: format!(
                "expected {} coordinates per corner, got {} and {}",
                description.dimensions,
                bbox.lower_corner.len(),
                bbox.upper_corner.len()
            ),
        });
    }

    Ok(BoundingBoxData {
        lower_corner: bbox.lower_corner.clone(),
        upper_corner: bbox.upper_corner.clone(),
        crs,
    })
}
