use crate::lr_decay::LearningRateDecay;
use crate::optimizer_state::OptimizerState;
use crate::optimizer_trait::{resolve_gradients, GradientPair, MissingGradientPolicy, Optimizer};
use crate::update_plan::{UpdateKind, UpdatePlan, UpdatePlanBuilder};
use log::debug;
use neurograph_core::graph::{with_named_scope, GraphService};
use neurograph_core::{DType, NeuroGraphError, Variable};

/// Added to the accumulator before taking its square root.
pub const ADAGRAD_EPSILON: f64 = 1e-8;

/// Hyperparameters of [`AdagradOptimizer`].
#[derive(Clone, Debug, PartialEq)]
pub struct AdagradConfig {
    pub lr: f64,
    pub decay: f64,
    /// Starting value of every accumulator. Must be non-negative.
    pub initial_accumulator_value: f64,
    pub missing_gradient: MissingGradientPolicy,
    /// Dtype of the learning-rate variable. Must be a float type.
    pub lr_dtype: DType,
}

impl Default for AdagradConfig {
    fn default() -> Self {
        AdagradConfig {
            lr: 0.01,
            decay: 0.0,
            initial_accumulator_value: 0.1,
            missing_gradient: MissingGradientPolicy::default(),
            lr_dtype: DType::F32,
        }
    }
}

impl AdagradConfig {
    pub fn new(lr: f64) -> Self {
        AdagradConfig {
            lr,
            ..Default::default()
        }
    }

    pub fn decay(mut self, decay: f64) -> Self {
        self.decay = decay;
        self
    }

    pub fn initial_accumulator_value(mut self, value: f64) -> Self {
        self.initial_accumulator_value = value;
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

/// Adagrad: per-parameter step sizes that shrink with the accumulated squared gradients.
///
/// ```text
/// a = a + g^2
/// p -= lr * g / sqrt(a + eps)
/// ```
///
/// The parameter update divides by the accumulator after this step's
/// gradient has been added to it.
#[derive(Debug)]
pub struct AdagradOptimizer {
    config: AdagradConfig,
    schedule: LearningRateDecay,
    accumulators: OptimizerState,
}

impl AdagradOptimizer {
    pub const NAME: &'static str = "Adagrad";

    /// Creates a new `AdagradOptimizer`, adding its step counter and learning
    /// rate variables to `graph`.
    ///
    /// # Arguments
    ///
    /// * `graph`: The graph the optimizer's variables and update ops are built in.
    /// * `config`: The hyperparameters:
    ///   * `lr`: The learning rate.
    ///   * `decay`: Inverse-time learning rate decay (default: 0.0, disabled).
    ///   * `initial_accumulator_value`: Starting value of every accumulator
    ///     (default: 0.1).
    ///   * `missing_gradient`: What to do with a parameter that has no gradient
    ///     (default: `MissingGradientPolicy::Error`).
    ///   * `lr_dtype`: Float dtype of the learning-rate variable (default: F32).
    ///
    /// # Errors
    /// `InvalidArgument` if `initial_accumulator_value` is negative or NaN, and
    /// `UnsupportedOperation` if `lr_dtype` is not a float type. The graph is
    /// left untouched in both cases.
    pub fn new(graph: &mut dyn GraphService, config: AdagradConfig) -> Result<Self, NeuroGraphError> {
        let initial = config.initial_accumulator_value;
        if initial.is_nan() || initial < 0.0 {
            return Err(NeuroGraphError::InvalidArgument {
                name: "initial_accumulator_value".to_string(),
                value: initial,
                reason: "must be non-negative".to_string(),
            });
        }
        let schedule = with_named_scope(graph, Self::NAME, |g| {
            LearningRateDecay::new(g, config.lr, config.decay, config.lr_dtype)
        })?;
        Ok(AdagradOptimizer {
            config,
            schedule,
            accumulators: OptimizerState::new("accumulator"),
        })
    }

    pub fn config(&self) -> &AdagradConfig {
        &self.config
    }

    /// The squared-gradient accumulator of `parameter`, once an update for it has been built.
    pub fn accumulator(&self, parameter: &Variable) -> Option<Variable> {
        self.accumulators.get(parameter).copied()
    }

    pub fn accumulators(&self) -> &OptimizerState {
        &self.accumulators
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
            let accumulator =
                self.accumulators
                    .get_or_create(graph, &parameter, self.config.initial_accumulator_value)?;
            let dtype = graph.dtype_of(parameter.value())?;

            let squared = graph.square(gradient)?;
            let accumulated = graph.add(accumulator.value(), squared)?;
            let state_op = graph.assign(&accumulator, accumulated)?;
            plan.push(UpdateKind::UpdateState, state_op, Some(parameter.id()));

            // `accumulator.value()` is read after the state update, i.e. the new sum.
            let lr = self.schedule.learning_rate_as(graph, dtype)?;
            let epsilon = graph.scalar(ADAGRAD_EPSILON, dtype);
            let stabilized = graph.add(accumulator.value(), epsilon)?;
            let denominator = graph.sqrt(stabilized)?;
            let lr_grad = graph.mul(lr, gradient)?;
            let step = graph.div(lr_grad, denominator)?;
            let value_op = graph.assign_sub(&parameter, step)?;
            plan.push(UpdateKind::UpdateParameter, value_op, Some(parameter.id()));
        }

        let plan = plan.build();
        debug!("Adagrad: built step with {} operation(s)", plan.len());
        Ok(plan)
    }
}

impl Optimizer for AdagradOptimizer {
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
