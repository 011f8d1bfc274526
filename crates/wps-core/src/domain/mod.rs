/// Runtime values bound to inputs and outputs
pub mod data;

/// Process description model
pub mod description;

/// Value validation against descriptions
pub mod validation;

/// Execute requests
pub mod request;

/// Rendered responses
pub mod response;

/// Job aggregate
pub mod job;

/// Job lifecycle events
pub mod events;

/// Repository interfaces
pub mod repository;
