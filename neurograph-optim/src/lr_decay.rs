use crate::update_plan::{UpdateKind, UpdatePlanBuilder};
use log::{debug, warn};
use neurograph_core::graph::GraphService;
use neurograph_core::tensor::Tensor;
use neurograph_core::{DType, NeuroGraphError, NodeId, Variable};

/// Step counter plus inverse-time learning-rate decay, shared by every update rule.
///
/// Both values live in the graph as non-trainable variables owned by one
/// optimizer: `iterations` (I64 scalar, starts at 0) and `lr` (a float scalar
/// of the configured dtype, starts at the initial learning rate). Each step increments the counter
/// first and then, when `decay > 0`, recomputes
///
/// ```text
/// lr = lr0 / (1 + decay * iterations)
/// ```
///
/// from the already incremented counter, so after `k` steps `lr` is
/// `lr0 / (1 + decay * k)`.
///
/// The rate is stored and decayed in its own dtype and cast to each
/// parameter's dtype when read. With the default F32 rate, an F64 parameter
/// sees the F32 rounding of `lr0` (0.1 becomes 0.10000000149011612); pass
/// `DType::F64` to keep full precision.
#[derive(Debug, Clone)]
pub struct LearningRateDecay {
    iterations: Variable,
    learning_rate: Variable,
    initial_lr: f64,
    decay: f64,
}

impl LearningRateDecay {
    /// Creates the counter and learning-rate variables in the current name
    /// scope and registers their initializers.
    ///
    /// # Errors
    /// `UnsupportedOperation` if `lr_dtype` is not a float type. Nothing is
    /// added to the graph in that case.
    pub fn new(
        graph: &mut dyn GraphService,
        initial_lr: f64,
        decay: f64,
        lr_dtype: DType,
    ) -> Result<Self, NeuroGraphError> {
        if !lr_dtype.is_float() {
            return Err(NeuroGraphError::UnsupportedOperation(format!(
                "learning rate must be a float, got {:?}",
                lr_dtype
            )));
        }
        if decay < 0.0 {
            warn!("Negative learning rate decay {} is ignored", decay);
        }
        let iterations = graph.new_variable(Tensor::scalar(0.0, DType::I64), false, "iterations")?;
        graph.register_initializer(iterations.initializer())?;
        let learning_rate = graph.new_variable(Tensor::scalar(initial_lr, lr_dtype), false, "lr")?;
        graph.register_initializer(learning_rate.initializer())?;
        Ok(LearningRateDecay {
            iterations,
            learning_rate,
            initial_lr,
            decay,
        })
    }

    pub fn iterations(&self) -> Variable {
        self.iterations
    }

    pub fn learning_rate(&self) -> Variable {
        self.learning_rate
    }

    pub fn initial_lr(&self) -> f64 {
        self.initial_lr
    }

    pub fn decay(&self) -> f64 {
        self.decay
    }

    pub fn is_decaying(&self) -> bool {
        self.decay > 0.0
    }

    /// Pushes the counter increment and, if decaying, the learning-rate refresh.
    pub fn emit_step(&self, graph: &mut dyn GraphService, plan: &mut UpdatePlanBuilder) -> Result<(), NeuroGraphError> {
        let one = graph.scalar(1.0, DType::I64);
        let increment = graph.assign_add(&self.iterations, one)?;
        plan.push(UpdateKind::IncrementIterations, increment, None);

        if self.is_decaying() {
            let dtype = graph.dtype_of(self.learning_rate.value())?;
            let steps = graph.cast(self.iterations.value(), dtype)?;
            let decay = graph.scalar(self.decay, dtype);
            let scaled = graph.mul(decay, steps)?;
            let one = graph.scalar(1.0, dtype);
            let denominator = graph.add(one, scaled)?;
            let initial = graph.scalar(self.initial_lr, dtype);
            let decayed = graph.div(initial, denominator)?;
            let refresh = graph.assign(&self.learning_rate, decayed)?;
            plan.push(UpdateKind::DecayLearningRate, refresh, None);
            debug!("LearningRateDecay: emitted decay refresh (decay = {})", self.decay);
        }
        Ok(())
    }

    /// Reads the learning rate cast to `dtype`.
    pub fn learning_rate_as(&self, graph: &mut dyn GraphService, dtype: DType) -> Result<NodeId, NeuroGraphError> {
        graph.cast(self.learning_rate.value(), dtype)
    }
}
