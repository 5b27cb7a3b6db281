use log::debug;
use neurograph_core::graph::GraphService;
use neurograph_core::tensor::full;
use neurograph_core::{NeuroGraphError, Variable, VariableId};
use std::collections::HashMap;

/// Auxiliary per-parameter state of one optimizer instance.
///
/// Holds one hidden, non-trainable variable per parameter (a momentum buffer,
/// a squared-gradient accumulator, ...). Entries are keyed by the parameter's
/// identity and created on first use with the parameter's shape and dtype.
/// Nothing is ever removed: once created, a parameter keeps the same slot for
/// the lifetime of the store.
#[derive(Debug, Clone, Default)]
pub struct OptimizerState {
    slot_name: String,
    slots: HashMap<VariableId, Variable>,
    // Creation order, for deterministic iteration.
    order: Vec<VariableId>,
}

impl OptimizerState {
    /// Creates an empty store whose variables will be named `<slot_name>/<parameter>`.
    pub fn new(slot_name: &str) -> Self {
        OptimizerState {
            slot_name: slot_name.to_string(),
            slots: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn get(&self, parameter: &Variable) -> Option<&Variable> {
        self.slots.get(&parameter.id())
    }

    /// Returns the slot of `parameter`, creating it filled with `initial_value` if needed.
    ///
    /// A new slot's initializer is registered with the graph, so it holds its
    /// initial value once the graph's initializers have run.
    pub fn get_or_create(
        &mut self,
        graph: &mut dyn GraphService,
        parameter: &Variable,
        initial_value: f64,
    ) -> Result<Variable, NeuroGraphError> {
        if let Some(slot) = self.slots.get(&parameter.id()) {
            return Ok(*slot);
        }
        let shape = graph.shape_of(parameter.value())?;
        let dtype = graph.dtype_of(parameter.value())?;
        let name = format!("{}/{}", self.slot_name, graph.variable_name(parameter)?);
        let slot = graph.new_variable(full(&shape, initial_value, dtype), false, &name)?;
        graph.register_initializer(slot.initializer())?;
        debug!(
            "OptimizerState: created slot '{}' with shape {:?} ({:?})",
            name, shape, dtype
        );
        self.slots.insert(parameter.id(), slot);
        self.order.push(parameter.id());
        Ok(slot)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// `(parameter id, slot)` pairs in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (VariableId, &Variable)> + '_ {
        self.order
            .iter()
            .filter_map(move |id| self.slots.get(id).map(|slot| (*id, slot)))
    }
}
