use crate::device::StorageDevice;
use crate::error::NeuroGraphError;
use crate::graph::{with_named_scope, Graph, NodeKind};
use crate::tensor::{zeros, Tensor};
use crate::types::DType;

#[test]
fn test_shapes_and_dtypes_are_inferred() -> Result<(), NeuroGraphError> {
    let mut graph = Graph::new();
    let m = graph.constant(zeros(&[2, 3], DType::F32));
    let row = graph.constant(zeros(&[3], DType::F32));
    let sum = graph.add(m, row)?;
    assert_eq!(graph.shape_of(sum)?, vec![2, 3]);
    assert_eq!(graph.dtype_of(sum)?, DType::F32);

    let total = graph.sum(sum)?;
    assert!(graph.shape_of(total)?.is_empty());
    Ok(())
}

#[test]
fn test_mismatches_fail_at_construction() {
    let mut graph = Graph::new();
    let a = graph.constant(zeros(&[2], DType::F32));
    let b = graph.constant(zeros(&[2], DType::F64));
    let c = graph.constant(zeros(&[3], DType::F32));
    assert!(matches!(graph.mul(a, b), Err(NeuroGraphError::DataTypeMismatch { .. })));
    assert!(matches!(graph.add(a, c), Err(NeuroGraphError::BroadcastError { .. })));

    let counter = graph.scalar(1.0, DType::I64);
    assert!(matches!(graph.sqrt(counter), Err(NeuroGraphError::UnsupportedOperation(_))));
}

#[test]
fn test_cast_is_identity_for_same_dtype() -> Result<(), NeuroGraphError> {
    let mut graph = Graph::new();
    let x = graph.scalar(1.0, DType::F32);
    assert_eq!(graph.cast(x, DType::F32)?, x);
    let y = graph.cast(x, DType::F64)?;
    assert_ne!(y, x);
    assert_eq!(graph.dtype_of(y)?, DType::F64);
    Ok(())
}

#[test]
fn test_variables_and_initializers() -> Result<(), NeuroGraphError> {
    let mut graph = Graph::new();
    let w = graph.variable(Tensor::new(vec![1.0, 2.0], vec![2])?, true, "w")?;
    let hidden = graph.new_variable(Tensor::scalar(0.0, DType::I64), false, "step")?;

    assert_eq!(graph.trainable_variables(), vec![w]);
    assert_eq!(graph.variables(), vec![w, hidden]);
    assert_eq!(graph.initializers(), &[w.initializer()]);

    graph.register_initializer(hidden.initializer())?;
    graph.register_initializer(hidden.initializer())?;
    assert_eq!(graph.initializers(), &[w.initializer(), hidden.initializer()]);

    assert!(matches!(graph.node(w.value())?.kind, NodeKind::Read(id) if id == w.id()));
    assert_eq!(graph.shape_of(w.value())?, vec![2]);
    Ok(())
}

#[test]
fn test_assign_checks_shape_and_dtype() -> Result<(), NeuroGraphError> {
    let mut graph = Graph::new();
    let w = graph.variable(zeros(&[2], DType::F32), true, "w")?;
    let wrong_shape = graph.constant(zeros(&[3], DType::F32));
    let wrong_dtype = graph.constant(zeros(&[2], DType::F64));
    let scalar = graph.scalar(1.0, DType::F32);

    assert!(matches!(graph.assign(&w, wrong_shape), Err(NeuroGraphError::BroadcastError { .. })));
    assert!(matches!(graph.assign_add(&w, wrong_dtype), Err(NeuroGraphError::DataTypeMismatch { .. })));
    assert!(graph.assign_sub(&w, scalar).is_ok());

    let matrix = graph.constant(zeros(&[4, 2], DType::F32));
    assert!(matches!(graph.assign(&w, matrix), Err(NeuroGraphError::ShapeMismatch { .. })));
    Ok(())
}

#[test]
fn test_name_scopes_and_unique_names() -> Result<(), NeuroGraphError> {
    let mut graph = Graph::new();
    let a = with_named_scope(&mut graph, "sgd", |g| g.variable(Tensor::scalar(0.0, DType::F32), false, "lr"))?;
    let b = with_named_scope(&mut graph, "sgd", |g| g.variable(Tensor::scalar(0.0, DType::F32), false, "lr"))?;
    assert_eq!(graph.variable_name(&a)?, "sgd/lr");
    assert_eq!(graph.variable_name(&b)?, "sgd/lr_1");
    assert_eq!(graph.current_scope(), "");
    Ok(())
}

#[test]
fn test_colocation_hint() -> Result<(), NeuroGraphError> {
    let mut graph = Graph::new();
    let w = graph.variable(zeros(&[2], DType::F32), true, "w")?;
    graph.set_device(&w, StorageDevice::GPU(1))?;
    let doubled = graph.add(w.value(), w.value())?;
    assert_eq!(graph.device_hint(doubled)?, None);

    graph.colocate_with(doubled, &w)?;
    assert_eq!(graph.device_hint(doubled)?, Some(StorageDevice::GPU(1)));
    assert_eq!(graph.device_of(&w)?, StorageDevice::GPU(1));
    Ok(())
}

#[test]
fn test_unknown_handles() {
    let graph = Graph::new();
    assert!(matches!(graph.shape_of(crate::graph::NodeId(42)), Err(NeuroGraphError::UnknownNode(42))));
}
