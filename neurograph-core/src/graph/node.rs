use crate::device::StorageDevice;
use crate::tensor::arithmetic::{BinaryOp, UnaryOp};
use crate::tensor::Tensor;
use crate::types::DType;

/// Handle to an expression node of a `Graph`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

/// Handle to a variable of a `Graph`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableId(pub(crate) usize);

/// Handle to a state-changing operation of a `Graph`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationId(pub(crate) usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl VariableId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl OperationId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A mutable, shaped tensor living in the graph.
///
/// The handle is cheap to copy. `value()` is the expression that reads the
/// variable's current content; `initializer()` is the operation that writes
/// its initial value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Variable {
    pub(crate) id: VariableId,
    pub(crate) read: NodeId,
    pub(crate) initializer: OperationId,
}

impl Variable {
    pub fn id(&self) -> VariableId {
        self.id
    }

    /// The expression reading this variable.
    pub fn value(&self) -> NodeId {
        self.read
    }

    pub fn initializer(&self) -> OperationId {
        self.initializer
    }
}

/// What an expression node computes.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Constant(Tensor),
    Read(VariableId),
    Unary { op: UnaryOp, input: NodeId },
    Binary { op: BinaryOp, lhs: NodeId, rhs: NodeId },
    /// Converts `input` to the node's dtype.
    Cast { input: NodeId },
    /// Sum of all elements.
    Sum { input: NodeId },
    /// Mean of all elements.
    Mean { input: NodeId },
    /// Broadcasts `input` to the node's shape.
    BroadcastTo { input: NodeId },
    /// Sums `input` down to the node's shape.
    SumTo { input: NodeId },
    /// Evaluated at most once per session run, then frozen for the rest of it.
    Snapshot { input: NodeId },
}

impl NodeKind {
    pub fn inputs(&self) -> Vec<NodeId> {
        match self {
            NodeKind::Constant(_) | NodeKind::Read(_) => vec![],
            NodeKind::Binary { lhs, rhs, .. } => vec![*lhs, *rhs],
            NodeKind::Unary { input, .. }
            | NodeKind::Cast { input }
            | NodeKind::Sum { input }
            | NodeKind::Mean { input }
            | NodeKind::BroadcastTo { input }
            | NodeKind::SumTo { input }
            | NodeKind::Snapshot { input } => vec![*input],
        }
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub shape: Vec<usize>,
    pub dtype: DType,
    pub name: String,
    /// Placement hint: run this node next to the given variable.
    pub colocated_with: Option<VariableId>,
}

#[derive(Debug, Clone)]
pub struct VariableDef {
    pub name: String,
    pub shape: Vec<usize>,
    pub dtype: DType,
    pub trainable: bool,
    pub device: StorageDevice,
    pub read: NodeId,
    pub initializer: OperationId,
}

/// How an operation writes its value into the target variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignKind {
    Assign,
    AssignAdd,
    AssignSub,
}

#[derive(Debug, Clone)]
pub struct OperationDef {
    pub kind: AssignKind,
    pub variable: VariableId,
    pub value: NodeId,
    pub name: String,
}
