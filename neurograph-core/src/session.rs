use crate::error::NeuroGraphError;
use crate::graph::{AssignKind, Graph, NodeId, NodeKind, OperationId, Variable, VariableId};
use crate::tensor::Tensor;
use log::trace;
use std::collections::{HashMap, HashSet};

/// Executes graph operations against variable storage.
///
/// A session owns the current value of every variable it has written. The
/// graph itself is passed to each call, so a graph can keep growing between
/// runs (new variables then need their initializers run).
#[derive(Debug, Default)]
pub struct Session {
    values: HashMap<VariableId, Tensor>,
}

/// Per-operation evaluation state.
struct EvalContext<'a> {
    memo: HashMap<NodeId, Tensor>,
    frozen: &'a mut HashMap<NodeId, Tensor>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs every initializer registered on `graph`, in registration order.
    pub fn initialize(&mut self, graph: &Graph) -> Result<(), NeuroGraphError> {
        self.run(graph, graph.initializers())
    }

    /// Executes `ops` strictly in order.
    ///
    /// Each operation evaluates its expression against the variable values
    /// current at that point, so a later operation observes the writes of the
    /// earlier ones. `snapshot` nodes are the exception: every snapshot reachable
    /// from `ops` is evaluated before the first operation runs and keeps that
    /// value for the rest of the run.
    pub fn run(&mut self, graph: &Graph, ops: &[OperationId]) -> Result<(), NeuroGraphError> {
        let mut frozen = HashMap::new();
        self.freeze_snapshots(graph, ops, &mut frozen)?;
        for &op_id in ops {
            let op = graph.operation(op_id)?;
            let def = graph.variable_def(op.variable)?;
            let mut ctx = EvalContext {
                memo: HashMap::new(),
                frozen: &mut frozen,
            };
            let value = self.eval(graph, op.value, &mut ctx)?;
            let updated = match op.kind {
                AssignKind::Assign => value.broadcast_to(&def.shape)?,
                AssignKind::AssignAdd => self.current(graph, op.variable)?.add(&value)?,
                AssignKind::AssignSub => self.current(graph, op.variable)?.sub(&value)?,
            };
            trace!("Session: ran '{}' -> '{}'", op.name, def.name);
            self.values.insert(op.variable, updated);
        }
        Ok(())
    }

    /// Evaluates `node` against the current variable values.
    pub fn evaluate(&self, graph: &Graph, node: NodeId) -> Result<Tensor, NeuroGraphError> {
        let mut frozen = HashMap::new();
        let mut ctx = EvalContext {
            memo: HashMap::new(),
            frozen: &mut frozen,
        };
        self.eval(graph, node, &mut ctx)
    }

    /// Current value of `variable`.
    pub fn value(&self, graph: &Graph, variable: &Variable) -> Result<Tensor, NeuroGraphError> {
        self.current(graph, variable.id())
    }

    /// Overwrites `variable` from outside the graph (e.g. to feed data).
    pub fn set_value(&mut self, graph: &Graph, variable: &Variable, value: Tensor) -> Result<(), NeuroGraphError> {
        let def = graph.variable_def(variable.id())?;
        if value.dtype() != def.dtype {
            return Err(NeuroGraphError::DataTypeMismatch {
                expected: def.dtype,
                actual: value.dtype(),
                operation: format!("set_value '{}'", def.name),
            });
        }
        if value.shape() != def.shape {
            return Err(NeuroGraphError::ShapeMismatch {
                expected: def.shape.clone(),
                actual: value.shape(),
                operation: format!("set_value '{}'", def.name),
            });
        }
        self.values.insert(variable.id(), value);
        Ok(())
    }

    pub fn is_initialized(&self, variable: &Variable) -> bool {
        self.values.contains_key(&variable.id())
    }

    fn freeze_snapshots(
        &self,
        graph: &Graph,
        ops: &[OperationId],
        frozen: &mut HashMap<NodeId, Tensor>,
    ) -> Result<(), NeuroGraphError> {
        let mut pending = Vec::with_capacity(ops.len());
        for &op_id in ops {
            pending.push(graph.operation(op_id)?.value);
        }
        let mut visited = HashSet::new();
        let mut snapshots = Vec::new();
        while let Some(id) = pending.pop() {
            if !visited.insert(id) {
                continue;
            }
            let node = graph.node(id)?;
            if matches!(node.kind, NodeKind::Snapshot { .. }) {
                snapshots.push(id);
            }
            pending.extend(node.kind.inputs());
        }
        let mut ctx = EvalContext {
            memo: HashMap::new(),
            frozen,
        };
        for id in snapshots {
            self.eval(graph, id, &mut ctx)?;
        }
        trace!("Session: froze {} snapshot(s)", ctx.frozen.len());
        Ok(())
    }

    fn current(&self, graph: &Graph, id: VariableId) -> Result<Tensor, NeuroGraphError> {
        match self.values.get(&id) {
            Some(value) => Ok(value.clone()),
            None => Err(NeuroGraphError::UninitializedVariable {
                name: graph.variable_def(id)?.name.clone(),
            }),
        }
    }

    fn eval(&self, graph: &Graph, id: NodeId, ctx: &mut EvalContext<'_>) -> Result<Tensor, NeuroGraphError> {
        if let Some(value) = ctx.memo.get(&id) {
            return Ok(value.clone());
        }
        let node = graph.node(id)?;
        let value = match &node.kind {
            NodeKind::Constant(value) => value.clone(),
            NodeKind::Read(var) => self.current(graph, *var)?,
            NodeKind::Unary { op, input } => self.eval(graph, *input, ctx)?.unary(*op)?,
            NodeKind::Binary { op, lhs, rhs } => {
                let lhs = self.eval(graph, *lhs, ctx)?;
                let rhs = self.eval(graph, *rhs, ctx)?;
                lhs.binary(*op, &rhs)?
            }
            NodeKind::Cast { input } => self.eval(graph, *input, ctx)?.cast(node.dtype),
            NodeKind::Sum { input } => self.eval(graph, *input, ctx)?.sum_all(),
            NodeKind::Mean { input } => self.eval(graph, *input, ctx)?.mean_all()?,
            NodeKind::BroadcastTo { input } => self.eval(graph, *input, ctx)?.broadcast_to(&node.shape)?,
            NodeKind::SumTo { input } => self.eval(graph, *input, ctx)?.sum_to_shape(&node.shape)?,
            NodeKind::Snapshot { input } => match ctx.frozen.get(&id) {
                Some(value) => value.clone(),
                None => {
                    let value = self.eval(graph, *input, ctx)?;
                    ctx.frozen.insert(id, value.clone());
                    value
                }
            },
        };
        ctx.memo.insert(id, value.clone());
        Ok(value)
    }
}
