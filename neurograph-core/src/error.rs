use crate::types::DType;
use thiserror::Error;

/// Custom error type for the NeuroGraph framework.
///
/// Every failure is raised while a graph or an operation list is being built,
/// or while a `Session` executes one; none is deferred or retried.
#[derive(Error, Debug, PartialEq, Clone)] // PartialEq for easier testing
pub enum NeuroGraphError {
    #[error("Shape mismatch: expected {expected:?}, got {actual:?} during operation {operation}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
        operation: String,
    },

    #[error("Cannot broadcast shapes: {shape1:?} and {shape2:?}")]
    BroadcastError {
        shape1: Vec<usize>,
        shape2: Vec<usize>,
    },

    #[error("Tensor creation error: data length {data_len} does not match shape {shape:?}")]
    TensorCreationError { data_len: usize, shape: Vec<usize> },

    #[error("Data type mismatch for operation '{operation}': expected {expected:?}, got {actual:?}")]
    DataTypeMismatch {
        expected: DType,
        actual: DType,
        operation: String,
    },

    #[error("Unknown graph node #{0}")]
    UnknownNode(usize),

    #[error("Unknown variable #{0}")]
    UnknownVariable(usize),

    #[error("Unknown operation #{0}")]
    UnknownOperation(usize),

    #[error("Variable '{name}' was read before being initialized")]
    UninitializedVariable { name: String },

    #[error("Gradients require a single-element loss, got shape {shape:?}")]
    NonScalarLoss { shape: Vec<usize> },

    #[error("Invalid argument '{name}' = {value}: {reason}")]
    InvalidArgument {
        name: String,
        value: f64,
        reason: String,
    },

    #[error("No gradient available for parameter '{parameter}'")]
    MissingGradient { parameter: String },

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}
