use crate::lr_decay::LearningRateDecay;
use crate::optimizer_state::OptimizerState;
use crate::optimizer_trait::{resolve_gradients, GradientPair, MissingGradientPolicy, Optimizer};
use crate::update_plan::{UpdateKind, UpdatePlan, UpdatePlanBuilder};
use log::{debug, warn};
use neurograph_core::graph::{with_named_scope, GraphService};
use neurograph_core::{DType, NeuroGraphError, Variable};

/// Hyperparameters of [`SgdOptimizer`].
#[derive(Clone, Debug, PartialEq)]
pub struct SgdConfig {
    pub lr: f64,
    /// Momentum factor, expected in `[0, 1)`.
    pub momentum: f64,
    /// Inverse-time learning rate decay; `0` disables it.
    pub decay: f64,
    pub nesterov: bool,
    pub missing_gradient: MissingGradientPolicy,
    /// Dtype of the learning-rate variable. Must be a float type.
    pub lr_dtype: DType,
}

impl Default for SgdConfig {
    fn default() -> Self {
        SgdConfig {
            lr: 0.01,
            momentum: 0.0,
            decay: 0.0,
            nesterov: false,
            missing_gradient: MissingGradientPolicy::default(),
            lr_dtype: DType::F32,
        }
    }
}

impl SgdConfig {
    pub fn new(lr: f64) -> Self {
        SgdConfig {
            lr,
            ..Default::default()
        }
    }

    pub fn momentum(mut self, momentum: f64) -> Self {
        self.momentum = momentum;
        self
    }

    pub fn decay(mut self, decay: f64) -> Self {
        self.decay = decay;
        self
    }

    pub fn nesterov(mut self, nesterov: bool) -> Self {
        self.nesterov = nesterov;
        self
    }

    pub fn missing_gradient(mut self, policy: MissingGradientPolicy) -> Self {
        self.missing_gradient = policy;
        self
    }

    pub fn lr_dtype(mut self, dtype: DType) -> Self {
        self.lr_dtype = dtype;
        self
    }
}

/// Implements the Stochastic Gradient Descent (SGD) optimizer.
///
/// Supports momentum, Nesterov momentum and learning rate decay. Per step and
/// parameter, with momentum buffer `v`, gradient `g` and momentum `m`:
///
/// ```text
/// v = m * v - lr * g
/// p += v                  (plain)
/// p += m * v - lr * g     (Nesterov)
/// ```
///
/// Momentum buffers are zero-initialized on first use.
#[derive(Debug)]
pub struct SgdOptimizer {
    config: SgdConfig,
    schedule: LearningRateDecay,
    momentum_buffers: OptimizerState,
}

impl SgdOptimizer {
    pub const NAME: &'static str = "SGD";

    /// Creates a new `SgdOptimizer`, adding its step counter and learning
    /// rate variables to `graph`.
    ///
    /// # Arguments
    ///
    /// * `graph`: The graph the optimizer's variables and update ops are built in.
    /// * `config`: The hyperparameters:
    ///   * `lr`: The learning rate.
    ///   * `momentum`: Momentum factor (default: 0.0). Not validated; values
    ///     outside `[0, 1)` are only logged.
    ///   * `decay`: Inverse-time learning rate decay (default: 0.0, disabled).
    ///   * `nesterov`: Enables Nesterov momentum (default: false).
    ///   * `missing_gradient`: What to do with a parameter that has no gradient
    ///     (default: `MissingGradientPolicy::Error`).
    ///   * `lr_dtype`: Float dtype of the learning-rate variable (default: F32).
    ///
    /// # Errors
    /// `UnsupportedOperation` if `lr_dtype` is not a float type.
    pub fn new(graph: &mut dyn GraphService, config: SgdConfig) -> Result<Self, NeuroGraphError> {
        if !(0.0..1.0).contains(&config.momentum) {
            warn!("SGD momentum {} is outside [0, 1)", config.momentum);
        }
        let schedule = with_named_scope(graph, Self::NAME, |g| {
            LearningRateDecay::new(g, config.lr, config.decay, config.lr_dtype)
        })?;
        Ok(SgdOptimizer {
            config,
            schedule,
            momentum_buffers: OptimizerState::new("momentum"),
        })
    }

    pub fn config(&self) -> &SgdConfig {
        &self.config
    }

    /// The momentum buffer of `parameter`, once an update for it has been built.
    pub fn momentum_buffer(&self, parameter: &Variable) -> Option<Variable> {
        self.momentum_buffers.get(parameter).copied()
    }

    pub fn momentum_buffers(&self) -> &OptimizerState {
        &self.momentum_buffers
    }

    fn build_step(
        &mut self,
        graph: &mut dyn GraphService,
        pairs: &[GradientPair],
    ) -> Result<UpdatePlan, NeuroGraphError> {
        let gradients = resolve_gradients(graph, pairs, self.config.missing_gradient)?;
        let mut plan = UpdatePlanBuilder::new();
        self.schedule.emit_step(graph, &mut plan)?;

        for (parameter, gradient) in gradients {
            let buffer = self.momentum_buffers.get_or_create(graph, &parameter, 0.0)?;
            let dtype = graph.dtype_of(parameter.value())?;
            let lr = self.schedule.learning_rate_as(graph, dtype)?;
            let momentum = graph.scalar(self.config.momentum, dtype);

            let lr_grad = graph.mul(lr, gradient)?;
            let carried = graph.mul(momentum, buffer.value())?;
            let velocity = graph.sub(carried, lr_grad)?;
            let state_op = graph.assign(&buffer, velocity)?;
            plan.push(UpdateKind::UpdateState, state_op, Some(parameter.id()));

            // Reads the buffer again, after the state update has written it.
            let delta = if self.config.nesterov {
                let look_ahead = graph.mul(momentum, buffer.value())?;
                graph.sub(look_ahead, lr_grad)?
            } else {
                buffer.value()
            };
            let value_op = graph.assign_add(&parameter, delta)?;
            plan.push(UpdateKind::UpdateParameter, value_op, Some(parameter.id()));
        }

        let plan = plan.build();
        debug!("SGD: built step with {} operation(s)", plan.len());
        Ok(plan)
    }
}

impl Optimizer for SgdOptimizer {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn schedule(&self) -> &LearningRateDecay {
        &self.schedule
    }

    fn apply_gradient(
        &mut self,
        graph: &mut dyn GraphService,
        pairs: &[GradientPair],
    ) -> Result<UpdatePlan, NeuroGraphError> {
        with_named_scope(graph, Self::NAME, |g| self.build_step(g, pairs))
    }
}
