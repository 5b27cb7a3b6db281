use crate::update_plan::{UpdateKind, UpdatePlanBuilder};
use neurograph_core::{DType, Graph, NeuroGraphError, Tensor};

#[test]
fn test_builder_orders_by_phase_and_keeps_push_order() -> Result<(), NeuroGraphError> {
    let mut graph = Graph::new();
    let a = graph.variable(Tensor::scalar(0.0, DType::F32), true, "a")?;
    let b = graph.variable(Tensor::scalar(0.0, DType::F32), true, "b")?;
    let one = graph.scalar(1.0, DType::F32);
    let ops: Vec<_> = (0..6)
        .map(|i| graph.assign_add(if i % 2 == 0 { &a } else { &b }, one))
        .collect::<Result<_, _>>()?;

    let mut builder = UpdatePlanBuilder::new();
    builder.push(UpdateKind::UpdateParameter, ops[0], Some(a.id()));
    builder.push(UpdateKind::UpdateState, ops[1], Some(b.id()));
    builder.push(UpdateKind::UpdateParameter, ops[2], Some(b.id()));
    builder.push(UpdateKind::DecayLearningRate, ops[3], None);
    builder.push(UpdateKind::UpdateState, ops[4], Some(a.id()));
    builder.push(UpdateKind::IncrementIterations, ops[5], None);
    let plan = builder.build();

    assert_eq!(plan.operations(), vec![ops[5], ops[3], ops[1], ops[4], ops[0], ops[2]]);
    assert_eq!(plan.len(), 6);
    assert_eq!(plan.count(UpdateKind::UpdateState), 2);
    assert!(plan.contains(UpdateKind::DecayLearningRate));
    Ok(())
}

#[test]
fn test_empty_plan() {
    let plan = UpdatePlanBuilder::new().build();
    assert!(plan.is_empty());
    assert!(plan.operations().is_empty());
    assert!(!plan.contains(UpdateKind::IncrementIterations));
}
