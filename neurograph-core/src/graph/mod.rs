//! Symbolic computation graph.
//!
//! A `Graph` records expressions (`NodeId`), variables (`Variable`) and the
//! operations that write into variables (`OperationId`). Nothing is computed
//! while the graph is built: shapes and dtypes are inferred and checked
//! eagerly, values are produced later by a `Session`.

use crate::device::StorageDevice;
use crate::error::NeuroGraphError;
use crate::tensor::arithmetic::{binary_result_dtype, unary_result_dtype, BinaryOp, UnaryOp};
use crate::tensor::broadcast_utils::broadcast_shapes;
use crate::tensor::Tensor;
use crate::types::DType;
use log::debug;
use std::collections::HashMap;

pub mod gradient;
pub mod node;
pub mod service;

pub use node::{AssignKind, Node, NodeId, NodeKind, OperationDef, OperationId, Variable, VariableDef, VariableId};
pub use service::{with_named_scope, GraphService};

#[cfg(test)]
mod graph_test;

#[derive(Debug, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    variables: Vec<VariableDef>,
    operations: Vec<OperationDef>,
    initializers: Vec<OperationId>,
    scopes: Vec<String>,
    name_counts: HashMap<String, usize>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Naming ---

    /// Enters a name scope: names created until the matching `pop_name_scope`
    /// are prefixed with `name/`.
    pub fn push_name_scope(&mut self, name: &str) {
        self.scopes.push(name.to_string());
    }

    pub fn pop_name_scope(&mut self) {
        self.scopes.pop();
    }

    /// The current scope path, e.g. `sgd/momentum`.
    pub fn current_scope(&self) -> String {
        self.scopes.join("/")
    }

    /// Prefixes `base` with the current scope and appends `_N` if the result is taken.
    fn unique_name(&mut self, base: &str) -> String {
        let full = if self.scopes.is_empty() {
            base.to_string()
        } else {
            format!("{}/{}", self.current_scope(), base)
        };
        let count = self.name_counts.entry(full.clone()).or_insert(0);
        let name = if *count == 0 {
            full.clone()
        } else {
            format!("{}_{}", full, count)
        };
        *count += 1;
        name
    }

    // --- Lookup ---

    pub fn node(&self, id: NodeId) -> Result<&Node, NeuroGraphError> {
        self.nodes.get(id.0).ok_or(NeuroGraphError::UnknownNode(id.0))
    }

    pub fn variable_def(&self, id: VariableId) -> Result<&VariableDef, NeuroGraphError> {
        self.variables.get(id.0).ok_or(NeuroGraphError::UnknownVariable(id.0))
    }

    pub fn operation(&self, id: OperationId) -> Result<&OperationDef, NeuroGraphError> {
        self.operations.get(id.0).ok_or(NeuroGraphError::UnknownOperation(id.0))
    }

    pub fn shape_of(&self, id: NodeId) -> Result<Vec<usize>, NeuroGraphError> {
        Ok(self.node(id)?.shape.clone())
    }

    pub fn dtype_of(&self, id: NodeId) -> Result<DType, NeuroGraphError> {
        Ok(self.node(id)?.dtype)
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_operations(&self) -> usize {
        self.operations.len()
    }

    // --- Expressions ---

    fn add_node(&mut self, kind: NodeKind, shape: Vec<usize>, dtype: DType, base_name: &str) -> NodeId {
        let name = self.unique_name(base_name);
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            shape,
            dtype,
            name,
            colocated_with: None,
        });
        id
    }

    pub fn constant(&mut self, value: Tensor) -> NodeId {
        let shape = value.shape();
        let dtype = value.dtype();
        self.add_node(NodeKind::Constant(value), shape, dtype, "const")
    }

    pub fn scalar(&mut self, value: f64, dtype: DType) -> NodeId {
        self.constant(Tensor::scalar(value, dtype))
    }

    pub fn unary(&mut self, op: UnaryOp, input: NodeId) -> Result<NodeId, NeuroGraphError> {
        let node = self.node(input)?;
        let dtype = unary_result_dtype(op, node.dtype)?;
        let shape = node.shape.clone();
        Ok(self.add_node(NodeKind::Unary { op, input }, shape, dtype, op.name()))
    }

    pub fn binary(&mut self, op: BinaryOp, lhs: NodeId, rhs: NodeId) -> Result<NodeId, NeuroGraphError> {
        let (lhs_node, rhs_node) = (self.node(lhs)?, self.node(rhs)?);
        let dtype = binary_result_dtype(op, lhs_node.dtype, rhs_node.dtype)?;
        let shape = broadcast_shapes(&lhs_node.shape, &rhs_node.shape)?;
        Ok(self.add_node(NodeKind::Binary { op, lhs, rhs }, shape, dtype, op.name()))
    }

    pub fn add(&mut self, lhs: NodeId, rhs: NodeId) -> Result<NodeId, NeuroGraphError> {
        self.binary(BinaryOp::Add, lhs, rhs)
    }

    pub fn sub(&mut self, lhs: NodeId, rhs: NodeId) -> Result<NodeId, NeuroGraphError> {
        self.binary(BinaryOp::Sub, lhs, rhs)
    }

    pub fn mul(&mut self, lhs: NodeId, rhs: NodeId) -> Result<NodeId, NeuroGraphError> {
        self.binary(BinaryOp::Mul, lhs, rhs)
    }

    pub fn div(&mut self, lhs: NodeId, rhs: NodeId) -> Result<NodeId, NeuroGraphError> {
        self.binary(BinaryOp::Div, lhs, rhs)
    }

    pub fn neg(&mut self, input: NodeId) -> Result<NodeId, NeuroGraphError> {
        self.unary(UnaryOp::Neg, input)
    }

    pub fn square(&mut self, input: NodeId) -> Result<NodeId, NeuroGraphError> {
        self.unary(UnaryOp::Square, input)
    }

    pub fn sqrt(&mut self, input: NodeId) -> Result<NodeId, NeuroGraphError> {
        self.unary(UnaryOp::Sqrt, input)
    }

    /// Converts `input` to `dtype`. Returns `input` itself when the dtype already matches.
    pub fn cast(&mut self, input: NodeId, dtype: DType) -> Result<NodeId, NeuroGraphError> {
        let node = self.node(input)?;
        if node.dtype == dtype {
            return Ok(input);
        }
        let shape = node.shape.clone();
        Ok(self.add_node(NodeKind::Cast { input }, shape, dtype, "cast"))
    }

    /// Sum of all elements, as a zero-dimensional node.
    pub fn sum(&mut self, input: NodeId) -> Result<NodeId, NeuroGraphError> {
        let dtype = self.node(input)?.dtype;
        Ok(self.add_node(NodeKind::Sum { input }, vec![], dtype, "sum"))
    }

    /// Mean of all elements, as a zero-dimensional node. Float inputs only.
    pub fn mean(&mut self, input: NodeId) -> Result<NodeId, NeuroGraphError> {
        let dtype = self.node(input)?.dtype;
        if !dtype.is_float() {
            return Err(NeuroGraphError::UnsupportedOperation(format!(
                "mean is not defined for {:?}",
                dtype
            )));
        }
        Ok(self.add_node(NodeKind::Mean { input }, vec![], dtype, "mean"))
    }

    pub fn broadcast_to(&mut self, input: NodeId, shape: &[usize]) -> Result<NodeId, NeuroGraphError> {
        let node = self.node(input)?;
        if node.shape == shape {
            return Ok(input);
        }
        if broadcast_shapes(&node.shape, shape)? != shape {
            return Err(NeuroGraphError::BroadcastError {
                shape1: node.shape.clone(),
                shape2: shape.to_vec(),
            });
        }
        let dtype = node.dtype;
        Ok(self.add_node(NodeKind::BroadcastTo { input }, shape.to_vec(), dtype, "broadcast_to"))
    }

    /// Sums `input` down to `shape`, undoing a broadcast.
    pub fn sum_to(&mut self, input: NodeId, shape: &[usize]) -> Result<NodeId, NeuroGraphError> {
        let node = self.node(input)?;
        if node.shape == shape {
            return Ok(input);
        }
        if shape.len() > node.shape.len() || broadcast_shapes(shape, &node.shape)? != node.shape {
            return Err(NeuroGraphError::ShapeMismatch {
                expected: shape.to_vec(),
                actual: node.shape.clone(),
                operation: "sum_to".to_string(),
            });
        }
        let dtype = node.dtype;
        Ok(self.add_node(NodeKind::SumTo { input }, shape.to_vec(), dtype, "sum_to"))
    }

    /// Freezes `input` for the duration of one session run: the first evaluation
    /// in a run is reused by every later read in that run.
    pub fn snapshot(&mut self, input: NodeId) -> Result<NodeId, NeuroGraphError> {
        let node = self.node(input)?;
        if matches!(node.kind, NodeKind::Snapshot { .. }) {
            return Ok(input);
        }
        let (shape, dtype) = (node.shape.clone(), node.dtype);
        Ok(self.add_node(NodeKind::Snapshot { input }, shape, dtype, "snapshot"))
    }

    // --- Variables ---

    /// Creates a variable and its initializer operation.
    ///
    /// The initializer is *not* registered; see [`Graph::variable`] and
    /// [`Graph::register_initializer`].
    pub fn new_variable(
        &mut self,
        initial: Tensor,
        trainable: bool,
        name: &str,
    ) -> Result<Variable, NeuroGraphError> {
        let full_name = self.unique_name(name);
        let shape = initial.shape();
        let dtype = initial.dtype();
        let id = VariableId(self.variables.len());

        let read = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind: NodeKind::Read(id),
            shape: shape.clone(),
            dtype,
            name: format!("{}/read", full_name),
            colocated_with: Some(id),
        });
        let initial_value = self.constant(initial);
        let initializer = OperationId(self.operations.len());
        self.operations.push(OperationDef {
            kind: AssignKind::Assign,
            variable: id,
            value: initial_value,
            name: format!("{}/initializer", full_name),
        });
        self.variables.push(VariableDef {
            name: full_name,
            shape,
            dtype,
            trainable,
            device: StorageDevice::default(),
            read,
            initializer,
        });
        debug!("Graph: created variable '{}'", self.variables[id.0].name);
        Ok(Variable { id, read, initializer })
    }

    /// Creates a variable and registers its initializer.
    pub fn variable(&mut self, initial: Tensor, trainable: bool, name: &str) -> Result<Variable, NeuroGraphError> {
        let variable = self.new_variable(initial, trainable, name)?;
        self.register_initializer(variable.initializer)?;
        Ok(variable)
    }

    fn handle(&self, id: VariableId) -> Result<Variable, NeuroGraphError> {
        let def = self.variable_def(id)?;
        Ok(Variable {
            id,
            read: def.read,
            initializer: def.initializer,
        })
    }

    /// All variables, in creation order.
    pub fn variables(&self) -> Vec<Variable> {
        (0..self.variables.len())
            .filter_map(|i| self.handle(VariableId(i)).ok())
            .collect()
    }

    /// Trainable variables, in creation order.
    pub fn trainable_variables(&self) -> Vec<Variable> {
        self.variables
            .iter()
            .enumerate()
            .filter(|(_, def)| def.trainable)
            .filter_map(|(i, _)| self.handle(VariableId(i)).ok())
            .collect()
    }

    pub fn variable_name(&self, variable: &Variable) -> Result<String, NeuroGraphError> {
        Ok(self.variable_def(variable.id)?.name.clone())
    }

    pub fn set_device(&mut self, variable: &Variable, device: StorageDevice) -> Result<(), NeuroGraphError> {
        let def = self
            .variables
            .get_mut(variable.id.0)
            .ok_or(NeuroGraphError::UnknownVariable(variable.id.0))?;
        def.device = device;
        Ok(())
    }

    pub fn device_of(&self, variable: &Variable) -> Result<StorageDevice, NeuroGraphError> {
        Ok(self.variable_def(variable.id)?.device)
    }

    /// Records that `node` should be placed on the same device as `variable`.
    pub fn colocate_with(&mut self, node: NodeId, variable: &Variable) -> Result<(), NeuroGraphError> {
        self.variable_def(variable.id)?;
        let target = self.nodes.get_mut(node.0).ok_or(NeuroGraphError::UnknownNode(node.0))?;
        target.colocated_with = Some(variable.id);
        Ok(())
    }

    /// The device `node` is hinted to run on, if it carries a colocation hint.
    pub fn device_hint(&self, node: NodeId) -> Result<Option<StorageDevice>, NeuroGraphError> {
        match self.node(node)?.colocated_with {
            Some(var) => Ok(Some(self.variable_def(var)?.device)),
            None => Ok(None),
        }
    }

    // --- Operations ---

    fn add_operation(
        &mut self,
        kind: AssignKind,
        variable: &Variable,
        value: NodeId,
        base_name: &str,
    ) -> Result<OperationId, NeuroGraphError> {
        let def = self.variable_def(variable.id)?;
        let node = self.node(value)?;
        if node.dtype != def.dtype {
            return Err(NeuroGraphError::DataTypeMismatch {
                expected: def.dtype,
                actual: node.dtype,
                operation: format!("{} '{}'", base_name, def.name),
            });
        }
        if broadcast_shapes(&def.shape, &node.shape)? != def.shape {
            return Err(NeuroGraphError::ShapeMismatch {
                expected: def.shape.clone(),
                actual: node.shape.clone(),
                operation: format!("{} '{}'", base_name, def.name),
            });
        }
        let name = self.unique_name(base_name);
        let id = OperationId(self.operations.len());
        self.operations.push(OperationDef {
            kind,
            variable: variable.id,
            value,
            name,
        });
        Ok(id)
    }

    /// `variable = value`
    pub fn assign(&mut self, variable: &Variable, value: NodeId) -> Result<OperationId, NeuroGraphError> {
        self.add_operation(AssignKind::Assign, variable, value, "assign")
    }

    /// `variable += value`
    pub fn assign_add(&mut self, variable: &Variable, value: NodeId) -> Result<OperationId, NeuroGraphError> {
        self.add_operation(AssignKind::AssignAdd, variable, value, "assign_add")
    }

    /// `variable -= value`
    pub fn assign_sub(&mut self, variable: &Variable, value: NodeId) -> Result<OperationId, NeuroGraphError> {
        self.add_operation(AssignKind::AssignSub, variable, value, "assign_sub")
    }

    /// Adds `op` to the operations `Session::initialize` runs. Registering twice is a no-op.
    pub fn register_initializer(&mut self, op: OperationId) -> Result<(), NeuroGraphError> {
        self.operation(op)?;
        if !self.initializers.contains(&op) {
            self.initializers.push(op);
        }
        Ok(())
    }

    /// Registered initializers, in registration order.
    pub fn initializers(&self) -> &[OperationId] {
        &self.initializers
    }
}
