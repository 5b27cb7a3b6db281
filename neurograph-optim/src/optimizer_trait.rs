use crate::lr_decay::LearningRateDecay;
use crate::param_set::ParameterSet;
use crate::update_plan::UpdatePlan;
use log::{debug, warn};
use neurograph_core::graph::GraphService;
use neurograph_core::tensor::zeros;
use neurograph_core::{NeuroGraphError, NodeId, Variable};
use std::collections::HashSet;
use std::fmt::Debug;

/// A parameter together with the gradient of the loss with respect to it.
///
/// `gradient` is `None` when the loss does not depend on the parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientPair {
    pub gradient: Option<NodeId>,
    pub parameter: Variable,
}

/// What an update rule does with a parameter whose gradient is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingGradientPolicy {
    /// Fail `apply_gradient` with `MissingGradient`.
    #[default]
    Error,
    /// Emit no operation for the parameter and allocate no state for it.
    Skip,
    /// Treat the gradient as zeros of the parameter's shape and dtype.
    Zero,
}

/// Trait defining the common interface for all optimizers.
///
/// An optimizer does not update anything itself: it builds, inside a graph,
/// the operations that perform one training step. Running the returned
/// `UpdatePlan` in a session advances training by one step.
pub trait Optimizer: Debug {
    /// Short name of the update rule, also used as its name scope.
    fn name(&self) -> &'static str;

    /// The step counter and learning-rate variable owned by this optimizer.
    fn schedule(&self) -> &LearningRateDecay;

    /// Pairs every parameter with the gradient of `loss` with respect to it.
    ///
    /// `params` defaults to all trainable variables of the graph. With
    /// `colocate`, each gradient carries a hint to run on its parameter's
    /// device. An empty parameter set yields an empty list, not an error.
    fn compute_gradient(
        &self,
        graph: &mut dyn GraphService,
        loss: NodeId,
        params: Option<&[Variable]>,
        colocate: bool,
    ) -> Result<Vec<GradientPair>, NeuroGraphError> {
        let params = ParameterSet::resolve(graph, params);
        if params.is_empty() {
            warn!("{}: no trainable parameters to compute gradients for", self.name());
            return Ok(Vec::new());
        }
        let mut pairs = Vec::with_capacity(params.len());
        for parameter in params.iter() {
            let gradient = graph.gradient_of(loss, parameter)?;
            if let (Some(gradient), true) = (gradient, colocate) {
                graph.colocate_with(gradient, parameter)?;
            }
            pairs.push(GradientPair {
                gradient,
                parameter: *parameter,
            });
        }
        Ok(pairs)
    }

    /// Builds the operations of one training step from `pairs`.
    ///
    /// The plan always holds the counter increment first, then the learning
    /// rate refresh (when decay is enabled), then the state update of every
    /// parameter, then the value update of every parameter.
    fn apply_gradient(
        &mut self,
        graph: &mut dyn GraphService,
        pairs: &[GradientPair],
    ) -> Result<UpdatePlan, NeuroGraphError>;

    /// `apply_gradient(compute_gradient(loss, params))`.
    fn minimize(
        &mut self,
        graph: &mut dyn GraphService,
        loss: NodeId,
        params: Option<&[Variable]>,
    ) -> Result<UpdatePlan, NeuroGraphError> {
        let pairs = self.compute_gradient(graph, loss, params, false)?;
        self.apply_gradient(graph, &pairs)
    }

    /// The step counter (I64 scalar), incremented once per executed step.
    fn iterations(&self) -> Variable {
        self.schedule().iterations()
    }

    /// The learning-rate variable (F32 scalar unless configured otherwise).
    fn learning_rate(&self) -> Variable {
        self.schedule().learning_rate()
    }

    fn initial_learning_rate(&self) -> f64 {
        self.schedule().initial_lr()
    }

    fn decay(&self) -> f64 {
        self.schedule().decay()
    }
}

/// Applies `policy` to absent gradients and freezes every present gradient
/// for the duration of a step. Later pairs for an already seen parameter are dropped.
///
/// Runs before any state is allocated, so `MissingGradientPolicy::Error`
/// fails without side effects on the optimizer.
pub(crate) fn resolve_gradients(
    graph: &mut dyn GraphService,
    pairs: &[GradientPair],
    policy: MissingGradientPolicy,
) -> Result<Vec<(Variable, NodeId)>, NeuroGraphError> {
    let mut resolved = Vec::with_capacity(pairs.len());
    let mut seen = HashSet::with_capacity(pairs.len());
    for pair in pairs {
        if !seen.insert(pair.parameter.id()) {
            warn!(
                "Parameter '{}' appears in more than one pair; only the first is applied",
                graph.variable_name(&pair.parameter)?
            );
            continue;
        }
        let gradient = match (pair.gradient, policy) {
            (Some(gradient), _) => gradient,
            (None, MissingGradientPolicy::Error) => {
                return Err(NeuroGraphError::MissingGradient {
                    parameter: graph.variable_name(&pair.parameter)?,
                })
            }
            (None, MissingGradientPolicy::Skip) => {
                debug!(
                    "No gradient for '{}', skipping its update",
                    graph.variable_name(&pair.parameter)?
                );
                continue;
            }
            (None, MissingGradientPolicy::Zero) => {
                let shape = graph.shape_of(pair.parameter.value())?;
                let dtype = graph.dtype_of(pair.parameter.value())?;
                graph.constant(zeros(&shape, dtype))
            }
        };
        resolved.push((pair.parameter, graph.snapshot(gradient)?));
    }
    Ok(resolved)
}
