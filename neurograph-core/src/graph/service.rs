use crate::error::NeuroGraphError;
use crate::graph::{Graph, NodeId, OperationId, Variable};
use crate::tensor::arithmetic::{BinaryOp, UnaryOp};
use crate::tensor::Tensor;
use crate::types::DType;

/// The services a graph engine offers to code that builds on top of it.
///
/// Optimizers only talk to the graph through this trait, so they can target
/// any engine that provides variables, element-wise arithmetic, assignment
/// operations and symbolic gradients. [`Graph`] is the in-crate implementation.
pub trait GraphService {
    /// Trainable variables known to the graph, in creation order.
    fn trainable_variables(&self) -> Vec<Variable>;

    /// Symbolic gradient of `loss` with respect to `parameter`; `None` when
    /// the loss does not depend on the parameter.
    fn gradient_of(&mut self, loss: NodeId, parameter: &Variable) -> Result<Option<NodeId>, NeuroGraphError>;

    fn constant(&mut self, value: Tensor) -> NodeId;

    fn scalar(&mut self, value: f64, dtype: DType) -> NodeId {
        self.constant(Tensor::scalar(value, dtype))
    }

    fn unary(&mut self, op: UnaryOp, input: NodeId) -> Result<NodeId, NeuroGraphError>;

    fn binary(&mut self, op: BinaryOp, lhs: NodeId, rhs: NodeId) -> Result<NodeId, NeuroGraphError>;

    fn add(&mut self, lhs: NodeId, rhs: NodeId) -> Result<NodeId, NeuroGraphError> {
        self.binary(BinaryOp::Add, lhs, rhs)
    }

    fn sub(&mut self, lhs: NodeId, rhs: NodeId) -> Result<NodeId, NeuroGraphError> {
        self.binary(BinaryOp::Sub, lhs, rhs)
    }

    fn mul(&mut self, lhs: NodeId, rhs: NodeId) -> Result<NodeId, NeuroGraphError> {
        self.binary(BinaryOp::Mul, lhs, rhs)
    }

    fn div(&mut self, lhs: NodeId, rhs: NodeId) -> Result<NodeId, NeuroGraphError> {
        self.binary(BinaryOp::Div, lhs, rhs)
    }

    fn square(&mut self, input: NodeId) -> Result<NodeId, NeuroGraphError> {
        self.unary(UnaryOp::Square, input)
    }

    fn sqrt(&mut self, input: NodeId) -> Result<NodeId, NeuroGraphError> {
        self.unary(UnaryOp::Sqrt, input)
    }

    fn cast(&mut self, input: NodeId, dtype: DType) -> Result<NodeId, NeuroGraphError>;

    /// See [`Graph::snapshot`].
    fn snapshot(&mut self, input: NodeId) -> Result<NodeId, NeuroGraphError>;

    /// Creates a variable and its (unregistered) initializer.
    fn new_variable(&mut self, initial: Tensor, trainable: bool, name: &str) -> Result<Variable, NeuroGraphError>;

    fn variable_name(&self, variable: &Variable) -> Result<String, NeuroGraphError>;

    fn assign(&mut self, variable: &Variable, value: NodeId) -> Result<OperationId, NeuroGraphError>;

    fn assign_add(&mut self, variable: &Variable, value: NodeId) -> Result<OperationId, NeuroGraphError>;

    fn assign_sub(&mut self, variable: &Variable, value: NodeId) -> Result<OperationId, NeuroGraphError>;

    fn push_name_scope(&mut self, name: &str);

    fn pop_name_scope(&mut self);

    /// Makes sure `op` runs when the graph's variables are initialized.
    fn register_initializer(&mut self, op: OperationId) -> Result<(), NeuroGraphError>;

    fn shape_of(&self, node: NodeId) -> Result<Vec<usize>, NeuroGraphError>;

    fn dtype_of(&self, node: NodeId) -> Result<DType, NeuroGraphError>;

    /// Placement hint: run `node` on the device holding `variable`.
    fn colocate_with(&mut self, node: NodeId, variable: &Variable) -> Result<(), NeuroGraphError>;
}

/// Runs `f` inside the name scope `name`, leaving the scope afterwards even if `f` fails.
pub fn with_named_scope<G, R>(graph: &mut G, name: &str, f: impl FnOnce(&mut G) -> R) -> R
where
    G: GraphService + ?Sized,
{
    graph.push_name_scope(name);
    let result = f(graph);
    graph.pop_name_scope();
    result
}

impl GraphService for Graph {
    fn trainable_variables(&self) -> Vec<Variable> {
        Graph::trainable_variables(self)
    }

    fn gradient_of(&mut self, loss: NodeId, parameter: &Variable) -> Result<Option<NodeId>, NeuroGraphError> {
        Graph::gradient_of(self, loss, parameter)
    }

    fn constant(&mut self, value: Tensor) -> NodeId {
        Graph::constant(self, value)
    }

    fn unary(&mut self, op: UnaryOp, input: NodeId) -> Result<NodeId, NeuroGraphError> {
        Graph::unary(self, op, input)
    }

    fn binary(&mut self, op: BinaryOp, lhs: NodeId, rhs: NodeId) -> Result<NodeId, NeuroGraphError> {
        Graph::binary(self, op, lhs, rhs)
    }

    fn cast(&mut self, input: NodeId, dtype: DType) -> Result<NodeId, NeuroGraphError> {
        Graph::cast(self, input, dtype)
    }

    fn snapshot(&mut self, input: NodeId) -> Result<NodeId, NeuroGraphError> {
        Graph::snapshot(self, input)
    }

    fn new_variable(&mut self, initial: Tensor, trainable: bool, name: &str) -> Result<Variable, NeuroGraphError> {
        Graph::new_variable(self, initial, trainable, name)
    }

    fn variable_name(&self, variable: &Variable) -> Result<String, NeuroGraphError> {
        Graph::variable_name(self, variable)
    }

    fn assign(&mut self, variable: &Variable, value: NodeId) -> Result<OperationId, NeuroGraphError> {
        Graph::assign(self, variable, value)
    }

    fn assign_add(&mut self, variable: &Variable, value: NodeId) -> Result<OperationId, NeuroGraphError> {
        Graph::assign_add(self, variable, value)
    }

    fn assign_sub(&mut self, variable: &Variable, value: NodeId) -> Result<OperationId, NeuroGraphError> {
        Graph::assign_sub(self, variable, value)
    }

    fn push_name_scope(&mut self, name: &str) {
        Graph::push_name_scope(self, name)
    }

    fn pop_name_scope(&mut self) {
        Graph::pop_name_scope(self)
    }

    fn register_initializer(&mut self, op: OperationId) -> Result<(), NeuroGraphError> {
        Graph::register_initializer(self, op)
    }

    fn shape_of(&self, node: NodeId) -> Result<Vec<usize>, NeuroGraphError> {
        Graph::shape_of(self, node)
    }

    fn dtype_of(&self, node: NodeId) -> Result<DType, NeuroGraphError> {
        Graph::dtype_of(self, node)
    }

    fn colocate_with(&mut self, node: NodeId, variable: &Variable) -> Result<(), NeuroGraphError> {
        Graph::colocate_with(self, node, variable)
    }
}
