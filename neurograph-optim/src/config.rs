use crate::adagrad::{AdagradConfig, AdagradOptimizer};
use crate::optimizer_trait::Optimizer;
use crate::sgd::{SgdConfig, SgdOptimizer};
use neurograph_core::graph::GraphService;
use neurograph_core::NeuroGraphError;

/// Selects an update rule and its hyperparameters.
#[derive(Clone, Debug, PartialEq)]
pub enum OptimizerConfig {
    Sgd(SgdConfig),
    Adagrad(AdagradConfig),
}

impl OptimizerConfig {
    pub fn name(&self) -> &'static str {
        match self {
            OptimizerConfig::Sgd(_) => SgdOptimizer::NAME,
            OptimizerConfig::Adagrad(_) => AdagradOptimizer::NAME,
        }
    }

    /// Constructs the selected optimizer inside `graph`.
    pub fn build(self, graph: &mut dyn GraphService) -> Result<Box<dyn Optimizer>, NeuroGraphError> {
        Ok(match self {
            OptimizerConfig::Sgd(config) => Box::new(SgdOptimizer::new(graph, config)?),
            OptimizerConfig::Adagrad(config) => Box::new(AdagradOptimizer::new(graph, config)?),
        })
    }
}

impl From<SgdConfig> for OptimizerConfig {
    fn from(config: SgdConfig) -> Self {
        OptimizerConfig::Sgd(config)
    }
}

impl From<AdagradConfig> for OptimizerConfig {
    fn from(config: AdagradConfig) -> Self {
        OptimizerConfig::Adagrad(config)
    }
}
