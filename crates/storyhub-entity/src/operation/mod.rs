//! Operation log entries.

pub mod model;

pub use model::{NewOperation, Operation, OperationKind};
