//! Symbolic reverse-mode differentiation.
//!
//! Gradients are new graph nodes, built by walking the graph backwards from
//! the loss. Node ids grow in creation order and every node's inputs were
//! created before it, so descending id order is a valid reverse topological
//! order and no explicit sort is needed.

use crate::error::NeuroGraphError;
use crate::graph::{Graph, NodeId, NodeKind, Variable};
use crate::tensor::arithmetic::{BinaryOp, UnaryOp};
use crate::tensor::ones;
use log::debug;
use std::collections::HashMap;

impl Graph {
    /// Gradient of `loss` with respect to `parameter`, or `None` when the loss
    /// does not depend on it.
    pub fn gradient_of(&mut self, loss: NodeId, parameter: &Variable) -> Result<Option<NodeId>, NeuroGraphError> {
        Ok(self.gradients(loss, std::slice::from_ref(parameter))?.remove(0))
    }

    /// Gradients of `loss` with respect to each of `parameters`, in order.
    ///
    /// # Errors
    /// `NonScalarLoss` if `loss` has more than one element, `UnsupportedOperation`
    /// if it is not a float expression.
    pub fn gradients(
        &mut self,
        loss: NodeId,
        parameters: &[Variable],
    ) -> Result<Vec<Option<NodeId>>, NeuroGraphError> {
        let loss_node = self.node(loss)?;
        if loss_node.shape.iter().product::<usize>() != 1 {
            return Err(NeuroGraphError::NonScalarLoss {
                shape: loss_node.shape.clone(),
            });
        }
        if !loss_node.dtype.is_float() {
            return Err(NeuroGraphError::UnsupportedOperation(format!(
                "cannot differentiate a {:?} loss",
                loss_node.dtype
            )));
        }
        for parameter in parameters {
            self.variable_def(parameter.id)?;
        }

        self.push_name_scope("gradients");
        let result = self.backpropagate(loss);
        self.pop_name_scope();
        let grads = result?;

        let found = parameters.iter().map(|p| grads.get(&p.read).copied()).collect::<Vec<_>>();
        debug!(
            "Graph: built gradients for {} parameter(s), {} reachable",
            parameters.len(),
            found.iter().filter(|g| g.is_some()).count()
        );
        Ok(found)
    }

    fn backpropagate(&mut self, loss: NodeId) -> Result<HashMap<NodeId, NodeId>, NeuroGraphError> {
        let mut grads: HashMap<NodeId, NodeId> = HashMap::new();
        let loss_node = self.node(loss)?;
        let seed = ones(&loss_node.shape.clone(), loss_node.dtype);
        let seed = self.constant(seed);
        grads.insert(loss, seed);

        for index in (0..=loss.0).rev() {
            let id = NodeId(index);
            let Some(&grad) = grads.get(&id) else {
                continue;
            };
            let node = self.node(id)?;
            if !node.dtype.is_float() {
                continue;
            }
            let kind = node.kind.clone();
            match kind {
                NodeKind::Constant(_) | NodeKind::Read(_) => {}
                NodeKind::Snapshot { input } => self.accumulate(&mut grads, input, grad)?,
                NodeKind::Unary { op, input } => {
                    let input_grad = match op {
                        UnaryOp::Neg => self.neg(grad)?,
                        UnaryOp::Square => {
                            // d(x^2) = 2x
                            let two = self.scalar(2.0, self.dtype_of(input)?);
                            let two_x = self.mul(input, two)?;
                            self.mul(grad, two_x)?
                        }
                        UnaryOp::Sqrt => {
                            // d(sqrt x) = 0.5 / sqrt x, and `id` is sqrt x
                            let half = self.scalar(0.5, self.dtype_of(input)?);
                            let scaled = self.mul(grad, half)?;
                            self.div(scaled, id)?
                        }
                    };
                    self.accumulate(&mut grads, input, input_grad)?;
                }
                NodeKind::Binary { op, lhs, rhs } => {
                    let (lhs_grad, rhs_grad) = match op {
                        BinaryOp::Add => (grad, grad),
                        BinaryOp::Sub => (grad, self.neg(grad)?),
                        BinaryOp::Mul => (self.mul(grad, rhs)?, self.mul(grad, lhs)?),
                        BinaryOp::Div => {
                            // d(a/b)/db = -(a/b)/b, and `id` is a/b
                            let lhs_grad = self.div(grad, rhs)?;
                            let scaled = self.mul(grad, id)?;
                            let quotient = self.div(scaled, rhs)?;
                            (lhs_grad, self.neg(quotient)?)
                        }
                    };
                    let lhs_shape = self.shape_of(lhs)?;
                    let lhs_grad = self.sum_to(lhs_grad, &lhs_shape)?;
                    self.accumulate(&mut grads, lhs, lhs_grad)?;
                    let rhs_shape = self.shape_of(rhs)?;
                    let rhs_grad = self.sum_to(rhs_grad, &rhs_shape)?;
                    self.accumulate(&mut grads, rhs, rhs_grad)?;
                }
                NodeKind::Cast { input } => {
                    let input_dtype = self.dtype_of(input)?;
                    if input_dtype.is_float() {
                        let input_grad = self.cast(grad, input_dtype)?;
                        self.accumulate(&mut grads, input, input_grad)?;
                    }
                }
                NodeKind::Sum { input } => {
                    let shape = self.shape_of(input)?;
                    let input_grad = self.broadcast_to(grad, &shape)?;
                    self.accumulate(&mut grads, input, input_grad)?;
                }
                NodeKind::Mean { input } => {
                    let shape = self.shape_of(input)?;
                    let count = self.scalar(shape.iter().product::<usize>() as f64, self.dtype_of(input)?);
                    let scaled = self.div(grad, count)?;
                    let input_grad = self.broadcast_to(scaled, &shape)?;
                    self.accumulate(&mut grads, input, input_grad)?;
                }
                NodeKind::BroadcastTo { input } => {
                    let shape = self.shape_of(input)?;
                    let input_grad = self.sum_to(grad, &shape)?;
                    self.accumulate(&mut grads, input, input_grad)?;
                }
                NodeKind::SumTo { input } => {
                    let shape = self.shape_of(input)?;
                    let input_grad = self.broadcast_to(grad, &shape)?;
                    self.accumulate(&mut grads, input, input_grad)?;
                }
            }
        }
        Ok(grads)
    }

    fn accumulate(
        &mut self,
        grads: &mut HashMap<NodeId, NodeId>,
        target: NodeId,
        grad: NodeId,
    ) -> Result<(), NeuroGraphError> {
        if !self.dtype_of(target)?.is_float() {
            return Ok(());
        }
        let total = match grads.get(&target) {
            Some(&existing) => self.add(existing, grad)?,
            None => grad,
        };
        grads.insert(target, total);
        Ok(())
    }
}
