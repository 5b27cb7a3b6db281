use log::warn;
use neurograph_core::graph::GraphService;
use neurograph_core::Variable;
use std::collections::HashSet;

/// The parameters a single optimizer call works on.
///
/// Built either from a caller-supplied list or, when none is given, from all
/// trainable variables of the graph. Order is preserved, so gradient pairs come
/// back in the order the parameters were given. A parameter listed more than
/// once is kept at its first position only, so it is updated once per step.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParameterSet {
    /// The parameters, in the order updates are emitted for them.
    pub params: Vec<Variable>,
}

impl ParameterSet {
    pub fn new(params: Vec<Variable>) -> Self {
        ParameterSet { params }
    }

    /// Uses `explicit` when given, otherwise every trainable variable of `graph`.
    pub fn resolve(graph: &dyn GraphService, explicit: Option<&[Variable]>) -> Self {
        let candidates = match explicit {
            Some(params) => params.to_vec(),
            None => graph.trainable_variables(),
        };
        let mut seen = HashSet::with_capacity(candidates.len());
        let params: Vec<Variable> = candidates
            .into_iter()
            .filter(|param| seen.insert(param.id()))
            .collect();
        if let Some(explicit) = explicit {
            if params.len() < explicit.len() {
                warn!("Ignoring {} repeated parameter(s)", explicit.len() - params.len());
            }
        }
        ParameterSet::new(params)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Variable> {
        self.params.iter()
    }
}
