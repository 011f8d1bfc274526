/// Algorithm registry
pub mod registry;

/// Input binding and output rendering
pub mod binding;

/// Format parser and generator seams
pub mod formats;

/// What a running algorithm sees
pub mod execution_context;

/// Execution coordinator
pub mod coordinator;
