//!
//! Standard library of processes for the WPS engine
//!
//! Hosts register these through [`factory::standard_algorithms`], which
//! returns the registration table the algorithm registry loads from, and
//! install the codecs from [`factory::standard_formats`] in the data binder.
//!

#![forbid(unsafe_code)]

pub mod algorithms;
pub mod formats;

pub use algorithms::{Arithmetic, Delay, Echo, JsonTransform};
pub use formats::JsonCodec;

/// Factory module for the standard processes and codecs
pub mod factory {
    use crate::algorithms::{Arithmetic, Delay, Echo, JsonTransform};
    use crate::formats::JsonCodec;
    use std::sync::Arc;
    use wps_core::{Algorithm, AlgorithmError, AlgorithmTable, FormatRegistry};

    /// Identifiers of every standard process, in registration order
    pub const STANDARD_PROCESSES: [&str; 4] =
        [Echo::ID, Arithmetic::ID, Delay::ID, JsonTransform::ID];

    /// Creates a process instance based on its identifier.
    pub fn create_algorithm(id: &str) -> Result<Arc<dyn Algorithm>, AlgorithmError> {
        match id {
            Echo::ID => Ok(Arc::new(Echo::new())),
            Arithmetic::ID => Ok(Arc::new(Arithmetic::new())),
            Delay::ID => Ok(Arc::new(Delay::new())),
            JsonTransform::ID => Ok(Arc::new(JsonTransform::new())),
            _ => Err(AlgorithmError::Failed(format!("Unknown process: {}", id))),
        }
    }

    /// Registration table binding every standard process identifier
    pub fn standard_algorithms() -> AlgorithmTable {
        STANDARD_PROCESSES
            .into_iter()
            .fold(AlgorithmTable::new(), |table, id| {
                table.with(id, move || create_algorithm(id))
            })
    }

    /// Format registry with the standard codecs
    pub fn standard_formats() -> FormatRegistry {
        let json = Arc::new(JsonCodec::new());
        FormatRegistry::new()
            .with_parser(json.clone())
            .with_generator(json)
    }
}
