use crate::domain::description::{
    DescriptionViolation, ProcessDescription, ProcessId, ProtocolVersion,
};
use crate::error::{AlgorithmError, LoadError, RegistrationError, VersionViolations};
use crate::{Algorithm, ExecutionCapability};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Factory function building an algorithm instance
pub type AlgorithmFactory =
    Arc<dyn Fn() -> Result<Arc<dyn Algorithm>, AlgorithmError> + Send + Sync>;

/// Where the registry discovers algorithm implementations
pub trait AlgorithmSource: Send + Sync {
    /// Identifiers the host wants loaded, in load order
    fn identifiers(&self) -> Vec<String>;

    /// Build the implementation bound to `id`
    fn load(&self, id: &str) -> Result<Arc<dyn Algorithm>, LoadError>;
}

/// Explicit registration table mapping identifiers to factories
#[derive(Clone, Default)]
pub struct AlgorithmTable {
    factories: IndexMap<String, AlgorithmFactory>,
}

impl AlgorithmTable {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a factory to an identifier, replacing any previous binding
    pub fn insert(&mut self, id: impl Into<String>, factory: AlgorithmFactory) {
        self.factories.insert(id.into(), factory);
    }

    /// Builder form of [`AlgorithmTable::insert`]
    pub fn with<F>(mut self, id: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn Algorithm>, AlgorithmError> + Send + Sync + 'static,
    {
        self.insert(id, Arc::new(factory));
        self
    }

    /// Bind a shared instance to an identifier
    pub fn with_instance(self, id: impl Into<String>, algorithm: Arc<dyn Algorithm>) -> Self {
        self.with(id, move || Ok(algorithm.clone()))
    }

    /// Restrict the table to the given identifiers, in their order.
    ///
    /// Unknown identifiers are kept so that loading them reports `NotFound`.
    pub fn select<I, S>(&self, ids: I) -> SelectedAlgorithms
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SelectedAlgorithms {
            table: self.clone(),
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    /// Number of bound identifiers
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for AlgorithmTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.factories.keys()).finish()
    }
}

impl AlgorithmSource for AlgorithmTable {
    fn identifiers(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    fn load(&self, id: &str) -> Result<Arc<dyn Algorithm>, LoadError> {
        let factory = self
            .factories
            .get(id)
            .ok_or_else(|| LoadError::NotFound { id: id.to_string() })?;
        factory().map_err(|e| LoadError::Instantiation {
            id: id.to_string(),
            message: e.to_string(),
        })
    }
}

/// A table restricted to a configured list of identifiers
#[derive(Debug, Clone)]
pub struct SelectedAlgorithms {
    table: AlgorithmTable,
    ids: Vec<String>,
}

impl AlgorithmSource for SelectedAlgorithms {
    fn identifiers(&self) -> Vec<String> {
        self.ids.clone()
    }

    fn load(&self, id: &str) -> Result<Arc<dyn Algorithm>, LoadError> {
        self.table.load(id)
    }
}

/// What the registry knows about one process
#[derive(Clone)]
struct RegisteredProcess {
    description: Arc<ProcessDescription>,
    algorithm: Arc<dyn Algorithm>,
    capability: ExecutionCapability,
    versions: Vec<ProtocolVersion>,
}

/// Description of a registered process together with how it can be run
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessOffering {
    /// The process description
    pub description: Arc<ProcessDescription>,
    /// Supported execution modes
    pub capability: ExecutionCapability,
    /// Protocol versions the description is valid for
    pub versions: Vec<ProtocolVersion>,
}

/// Outcome of [`AlgorithmRegistry::register_all`]
#[derive(Debug, Default)]
pub struct RegistrationReport {
    /// Processes now registered
    pub loaded: Vec<ProcessId>,
    /// Processes that could not be registered
    pub failed: Vec<(String, RegistrationError)>,
}

impl RegistrationReport {
    /// Whether every candidate was registered
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Registered processes ordered by the slot their id first received
#[derive(Default)]
struct Entries {
    processes: IndexMap<ProcessId, RegisteredProcess>,
    // survives unregister so a returning id keeps its place
    slots: HashMap<ProcessId, usize>,
}

impl Entries {
    fn insert(&mut self, id: ProcessId, entry: RegisteredProcess) -> bool {
        let next = self.slots.len();
        self.slots.entry(id.clone()).or_insert(next);
        let replaced = self.processes.insert(id, entry).is_some();
        if !replaced {
            let slots = &self.slots;
            self.processes
                .sort_by(|a, _, b, _| slots.get(a).cmp(&slots.get(b)));
        }
        replaced
    }
}

/// Registry of executable processes.
///
/// Registrations replace any previous entry atomically, so readers never see
/// a description without its implementation. Listing order is the order in
/// which identifiers were first registered, including after an unregister.
pub struct AlgorithmRegistry {
    source: Arc<dyn AlgorithmSource>,
    supported_versions: Vec<ProtocolVersion>,
    entries: RwLock<Entries>,
}

impl AlgorithmRegistry {
    /// Registry over `source` accepting every known protocol version
    pub fn new(source: Arc<dyn AlgorithmSource>) -> Self {
        Self::with_versions(source, ProtocolVersion::ALL.to_vec())
    }

    /// Registry over `source` accepting the given protocol versions
    pub fn with_versions(
        source: Arc<dyn AlgorithmSource>,
        supported_versions: Vec<ProtocolVersion>,
    ) -> Self {
        Self {
            source,
            supported_versions,
            entries: RwLock::new(Entries::default()),
        }
    }

    /// Protocol versions descriptions are checked against
    pub fn supported_versions(&self) -> &[ProtocolVersion] {
        &self.supported_versions
    }

    /// Load, validate and index the process bound to `id`.
    ///
    /// A description is accepted when it is valid for at least one supported
    /// version. Registering an identifier twice replaces the first entry.
    pub fn register(&self, id: &str) -> Result<(), RegistrationError> {
        let algorithm = self.source.load(id)?;
        let description = algorithm.description();

        let mut violations = Vec::new();
        let mut versions = Vec::new();
        for version in &self.supported_versions {
            let mut found = description.violations(*version);
            if description.id.as_str() != id {
                found.push(DescriptionViolation::IdentifierMismatch {
                    expected: id.to_string(),
                    actual: description.id.to_string(),
                });
            }
            if found.is_empty() {
                versions.push(*version);
            } else {
                debug!(process_id = %id, version = %version, violations = ?found, "Description not valid for version");
                violations.push(VersionViolations {
                    version: *version,
                    violations: found,
                });
            }
        }

        if versions.is_empty() {
            return Err(RegistrationError::DescriptionInvalid {
                id: id.to_string(),
                violations,
            });
        }

        let capability = algorithm.execution_capability();
        let entry = RegisteredProcess {
            description: Arc::new(description),
            algorithm,
            capability,
            versions,
        };

        let replaced = self
            .entries
            .write()
            .insert(ProcessId(id.to_string()), entry);

        info!(process_id = %id, ?capability, replaced, "Registered process");
        Ok(())
    }

    /// Register every identifier the source offers, collecting failures
    pub fn register_all(&self) -> RegistrationReport {
        let mut report = RegistrationReport::default();
        for id in self.source.identifiers() {
            match self.register(&id) {
                Ok(()) => report.loaded.push(ProcessId(id)),
                Err(e) => {
                    warn!(process_id = %id, error = %e, "Failed to register process");
                    report.failed.push((id, e));
                }
            }
        }
        report
    }

    /// Remove a process, returning whether it was registered
    pub fn unregister(&self, id: &str) -> bool {
        let removed = self.entries.write().processes.shift_remove(id).is_some();
        if removed {
            info!(process_id = %id, "Unregistered process");
        }
        removed
    }

    /// Description of a registered process
    pub fn lookup(&self, id: &str) -> Option<Arc<ProcessDescription>> {
        self.entries
            .read()
            .processes
            .get(id)
            .map(|entry| entry.description.clone())
    }

    /// Description, capability and versions of a registered process
    pub fn offering(&self, id: &str) -> Option<ProcessOffering> {
        self.entries.read().processes.get(id).map(|entry| ProcessOffering {
            description: entry.description.clone(),
            capability: entry.capability,
            versions: entry.versions.clone(),
        })
    }

    /// Identifiers of every registered process, in registration order
    pub fn ids(&self) -> Vec<ProcessId> {
        self.entries.read().processes.keys().cloned().collect()
    }

    /// Descriptions of every registered process, in registration order
    pub fn list(&self) -> Vec<Arc<ProcessDescription>> {
        self.entries
            .read()
            .processes
            .values()
            .map(|entry| entry.description.clone())
            .collect()
    }

    /// Executable of a registered process
    pub fn resolve(&self, id: &str) -> Option<Arc<dyn Algorithm>> {
        self.entries
            .read()
            .processes
            .get(id)
            .map(|entry| entry.algorithm.clone())
    }

    /// Description and executable in one read
    pub(crate) fn resolve_with_description(
        &self,
        id: &str,
    ) -> Option<(Arc<ProcessDescription>, Arc<dyn Algorithm>, ExecutionCapability)> {
        self.entries.read().processes.get(id).map(|entry| {
            (
                entry.description.clone(),
                entry.algorithm.clone(),
                entry.capability,
            )
        })
    }

    /// Whether a process is registered under `id`
    pub fn contains(&self, id: &str) -> bool {
        self.entries.read().processes.contains_key(id)
    }

    /// Number of registered processes
    pub fn len(&self) -> usize {
        self.entries.read().processes.len()
    }

    /// Whether no process is registered
    pub fn is_empty(&self) -> bool {
        self.entries.read().processes.is_empty()
    }
}

impl fmt::Debug for AlgorithmRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlgorithmRegistry")
            .field("supported_versions", &self.supported_versions)
            .field("processes", &self.ids())
            .finish()
    }
}
