//! Graph-building optimizers for NeuroGraph.
//!
//! An optimizer turns a scalar loss into the ordered assignment operations of
//! one training step (see [`UpdatePlan`]); running them repeatedly in a
//! [`neurograph_core::Session`] trains the parameters.

pub mod adagrad;
pub mod config;
pub mod lr_decay;
pub mod optimizer_state;
pub mod optimizer_trait;
pub mod param_set;
pub mod sgd;
pub mod update_plan;

pub use adagrad::{AdagradConfig, AdagradOptimizer, ADAGRAD_EPSILON};
pub use config::OptimizerConfig;
pub use lr_decay::LearningRateDecay;
pub use optimizer_state::OptimizerState;
pub use optimizer_trait::{GradientPair, MissingGradientPolicy, Optimizer};
pub use param_set::ParameterSet;
pub use sgd::{SgdConfig, SgdOptimizer};
pub use update_plan::{UpdateKind, UpdateOp, UpdatePlan, UpdatePlanBuilder};

#[cfg(test)]
mod sgd_test;
#[cfg(test)]
mod update_plan_test;
