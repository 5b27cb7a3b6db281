use neurograph_core::{OperationId, VariableId};

/// Phase of a training step an operation belongs to.
///
/// Variants are declared in execution order; the derived `Ord` is that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UpdateKind {
    /// `iterations += 1`.
    IncrementIterations,
    /// `lr = lr0 / (1 + decay * iterations)`.
    DecayLearningRate,
    /// Writes a parameter's auxiliary state (momentum buffer, accumulator).
    UpdateState,
    /// Writes a parameter's value.
    UpdateParameter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOp {
    pub kind: UpdateKind,
    pub operation: OperationId,
    /// The parameter the operation belongs to; `None` for the shared counter and learning rate.
    pub parameter: Option<VariableId>,
}

/// The ordered operations of one training step.
///
/// Running [`UpdatePlan::operations`] once in a session performs one step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdatePlan {
    ops: Vec<UpdateOp>,
}

impl UpdatePlan {
    /// Operation ids in execution order, ready for `Session::run`.
    pub fn operations(&self) -> Vec<OperationId> {
        self.ops.iter().map(|op| op.operation).collect()
    }

    pub fn ops(&self) -> &[UpdateOp] {
        &self.ops
    }

    pub fn iter(&self) -> std::slice::Iter<'_, UpdateOp> {
        self.ops.iter()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn count(&self, kind: UpdateKind) -> usize {
        self.ops.iter().filter(|op| op.kind == kind).count()
    }

    pub fn contains(&self, kind: UpdateKind) -> bool {
        self.count(kind) > 0
    }
}

impl<'a> IntoIterator for &'a UpdatePlan {
    type Item = &'a UpdateOp;
    type IntoIter = std::slice::Iter<'a, UpdateOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.iter()
    }
}

/// Collects the operations of a step and orders them by phase.
///
/// Operations of the same phase keep the order they were pushed in.
#[derive(Debug, Default)]
pub struct UpdatePlanBuilder {
    ops: Vec<UpdateOp>,
}

impl UpdatePlanBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: UpdateKind, operation: OperationId, parameter: Option<VariableId>) {
        self.ops.push(UpdateOp {
            kind,
            operation,
            parameter,
        });
    }

    pub fn build(mut self) -> UpdatePlan {
        // Stable, so per-parameter order within a phase survives.
        self.ops.sort_by_key(|op| op.kind);
        UpdatePlan { ops: self.ops }
    }
}
