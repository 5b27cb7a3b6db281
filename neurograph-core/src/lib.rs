//! NeuroGraph core: tensors, a symbolic computation graph with reverse-mode
//! gradients, and a `Session` that executes the graph's assignment operations.

pub mod device;
pub mod error;
pub mod graph;
pub mod session;
pub mod tensor;
pub mod types;

pub use device::StorageDevice;
pub use error::NeuroGraphError;
pub use graph::{Graph, GraphService, NodeId, OperationId, Variable, VariableId};
pub use session::Session;
pub use tensor::Tensor;
pub use types::DType;

// Re-export traits required by public functions
pub use num_traits;
