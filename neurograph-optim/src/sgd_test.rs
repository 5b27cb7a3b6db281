use crate::optimizer_trait::Optimizer;
use crate::sgd::{SgdConfig, SgdOptimizer};
use crate::update_plan::{UpdateKind, UpdatePlan};
use approx::assert_relative_eq;
use neurograph_core::tensor::zeros;
use neurograph_core::{DType, Graph, NeuroGraphError, Session, Tensor, Variable};

// Scalar parameter `w` with loss `sum(w)`, so the gradient is always 1.
fn unit_gradient_setup(config: SgdConfig) -> Result<(Graph, Variable, SgdOptimizer, UpdatePlan), NeuroGraphError> {
    let mut graph = Graph::new();
    let w = graph.variable(Tensor::scalar(0.0, DType::F32), true, "w")?;
    let loss = graph.sum(w.value())?;
    let mut optimizer = SgdOptimizer::new(&mut graph, config)?;
    let plan = optimizer.minimize(&mut graph, loss, None)?;
    Ok((graph, w, optimizer, plan))
}

fn read(session: &Session, graph: &Graph, variable: &Variable) -> Result<f64, NeuroGraphError> {
    session.value(graph, variable)?.item()
}

#[test]
fn test_sgd_momentum_buffer_accumulates() -> Result<(), NeuroGraphError> {
    let (graph, w, optimizer, plan) = unit_gradient_setup(SgdConfig::new(0.1).momentum(0.9))?;
    let buffer = optimizer.momentum_buffer(&w).expect("buffer created by minimize");
    let mut session = Session::new();
    session.initialize(&graph)?;

    let expected_velocity = [-0.1, -0.19, -0.271];
    let expected_param = [-0.1, -0.29, -0.561];
    for step in 0..3 {
        session.run(&graph, &plan.operations())?;
        assert_relative_eq!(read(&session, &graph, &buffer)?, expected_velocity[step], epsilon = 1e-6);
        assert_relative_eq!(read(&session, &graph, &w)?, expected_param[step], epsilon = 1e-6);
    }
    Ok(())
}

#[test]
fn test_sgd_nesterov_uses_updated_velocity() -> Result<(), NeuroGraphError> {
    let (graph, w, optimizer, plan) = unit_gradient_setup(SgdConfig::new(0.1).momentum(0.9).nesterov(true))?;
    let buffer = optimizer.momentum_buffer(&w).expect("buffer created by minimize");
    let mut session = Session::new();
    session.initialize(&graph)?;

    // v1 = -0.1, p1 = 0.9 * -0.1 - 0.1
    session.run(&graph, &plan.operations())?;
    assert_relative_eq!(read(&session, &graph, &buffer)?, -0.1, epsilon = 1e-6);
    assert_relative_eq!(read(&session, &graph, &w)?, -0.19, epsilon = 1e-6);

    // v2 = -0.19, p2 = p1 + 0.9 * -0.19 - 0.1
    session.run(&graph, &plan.operations())?;
    assert_relative_eq!(read(&session, &graph, &buffer)?, -0.19, epsilon = 1e-6);
    assert_relative_eq!(read(&session, &graph, &w)?, -0.461, epsilon = 1e-6);
    Ok(())
}

#[test]
fn test_sgd_nesterov_and_plain_trajectories_differ() -> Result<(), NeuroGraphError> {
    let mut finals = Vec::new();
    for nesterov in [false, true] {
        let (graph, w, _optimizer, plan) = unit_gradient_setup(SgdConfig::new(0.1).momentum(0.5).nesterov(nesterov))?;
        let mut session = Session::new();
        session.initialize(&graph)?;
        for _ in 0..3 {
            session.run(&graph, &plan.operations())?;
        }
        finals.push(read(&session, &graph, &w)?);
    }
    assert!((finals[0] - finals[1]).abs() > 1e-3, "trajectories should differ: {:?}", finals);
    Ok(())
}

#[test]
fn test_sgd_zero_momentum_is_plain_gradient_descent() -> Result<(), NeuroGraphError> {
    let mut graph = Graph::new();
    let w = graph.variable(Tensor::new(vec![1.0, -2.0], vec![2])?, true, "w")?;
    let squared = graph.square(w.value())?;
    let loss = graph.sum(squared)?;
    let lr = 0.1;
    let mut optimizer = SgdOptimizer::new(&mut graph, SgdConfig::new(lr))?;
    let plan = optimizer.minimize(&mut graph, loss, None)?;

    let mut session = Session::new();
    session.initialize(&graph)?;
    let mut expected = vec![1.0, -2.0];
    for _ in 0..5 {
        session.run(&graph, &plan.operations())?;
        // d(sum w^2)/dw = 2w
        expected = expected.iter().map(|p| p - lr * 2.0 * p).collect();
        let actual = session.value(&graph, &w)?.to_f64_vec();
        for (a, e) in actual.iter().zip(expected.iter()) {
            assert_relative_eq!(*a, *e, epsilon = 1e-5);
        }
    }
    Ok(())
}

#[test]
fn test_sgd_decay_follows_inverse_time() -> Result<(), NeuroGraphError> {
    let (graph, _w, optimizer, plan) = unit_gradient_setup(SgdConfig::new(0.1).decay(0.5))?;
    assert!(plan.contains(UpdateKind::DecayLearningRate));
    let mut session = Session::new();
    session.initialize(&graph)?;

    for k in 1..=4 {
        session.run(&graph, &plan.operations())?;
        let lr = read(&session, &graph, &optimizer.learning_rate())?;
        assert_relative_eq!(lr, 0.1 / (1.0 + 0.5 * k as f64), epsilon = 1e-6);
    }
    Ok(())
}

#[test]
fn test_sgd_decay_applies_to_the_same_step() -> Result<(), NeuroGraphError> {
    // The first step already uses lr0 / (1 + d).
    let (graph, w, _optimizer, plan) = unit_gradient_setup(SgdConfig::new(0.1).decay(1.0))?;
    let mut session = Session::new();
    session.initialize(&graph)?;
    session.run(&graph, &plan.operations())?;
    assert_relative_eq!(read(&session, &graph, &w)?, -0.05, epsilon = 1e-6);
    Ok(())
}

#[test]
fn test_sgd_zero_decay_keeps_learning_rate() -> Result<(), NeuroGraphError> {
    let (graph, _w, optimizer, plan) = unit_gradient_setup(SgdConfig::new(0.1).momentum(0.9))?;
    assert!(!plan.contains(UpdateKind::DecayLearningRate));
    let mut session = Session::new();
    session.initialize(&graph)?;
    for _ in 0..5 {
        session.run(&graph, &plan.operations())?;
    }
    assert_relative_eq!(read(&session, &graph, &optimizer.learning_rate())?, 0.1, epsilon = 1e-7);
    Ok(())
}

#[test]
fn test_sgd_counter_increments_once_per_step() -> Result<(), NeuroGraphError> {
    let (graph, _w, optimizer, plan) = unit_gradient_setup(SgdConfig::new(0.1).decay(0.1))?;
    assert_eq!(plan.count(UpdateKind::IncrementIterations), 1);
    let mut session = Session::new();
    session.initialize(&graph)?;
    for k in 1..=3 {
        session.run(&graph, &plan.operations())?;
        assert_eq!(session.value(&graph, &optimizer.iterations())?.get_i64_data()?, vec![k]);
    }
    Ok(())
}

#[test]
fn test_sgd_plan_is_ordered_by_phase() -> Result<(), NeuroGraphError> {
    let mut graph = Graph::new();
    let a = graph.variable(Tensor::scalar(1.0, DType::F32), true, "a")?;
    let b = graph.variable(Tensor::scalar(2.0, DType::F32), true, "b")?;
    let ab = graph.mul(a.value(), b.value())?;
    let loss = graph.sum(ab)?;
    let mut optimizer = SgdOptimizer::new(&mut graph, SgdConfig::new(0.1).momentum(0.9).decay(0.01))?;
    let plan = optimizer.minimize(&mut graph, loss, None)?;

    let kinds: Vec<UpdateKind> = plan.iter().map(|op| op.kind).collect();
    assert_eq!(
        kinds,
        vec![
            UpdateKind::IncrementIterations,
            UpdateKind::DecayLearningRate,
            UpdateKind::UpdateState,
            UpdateKind::UpdateState,
            UpdateKind::UpdateParameter,
            UpdateKind::UpdateParameter,
        ]
    );
    let owners: Vec<_> = plan.iter().filter_map(|op| op.parameter).collect();
    assert_eq!(owners, vec![a.id(), b.id(), a.id(), b.id()]);
    Ok(())
}

#[test]
fn test_sgd_gradients_are_read_before_any_update() -> Result<(), NeuroGraphError> {
    // loss = a * b: both gradients must come from the values before the step.
    let mut graph = Graph::new();
    let a = graph.variable(Tensor::scalar(1.0, DType::F32), true, "a")?;
    let b = graph.variable(Tensor::scalar(2.0, DType::F32), true, "b")?;
    let ab = graph.mul(a.value(), b.value())?;
    let loss = graph.sum(ab)?;
    let mut optimizer = SgdOptimizer::new(&mut graph, SgdConfig::new(0.5))?;
    let plan = optimizer.minimize(&mut graph, loss, None)?;

    let mut session = Session::new();
    session.initialize(&graph)?;
    session.run(&graph, &plan.operations())?;
    // a -= 0.5 * b, b -= 0.5 * a
    assert_relative_eq!(read(&session, &graph, &a)?, 0.0, epsilon = 1e-6);
    assert_relative_eq!(read(&session, &graph, &b)?, 1.5, epsilon = 1e-6);
    Ok(())
}

#[test]
fn test_sgd_buffer_matches_parameter_shape_and_dtype() -> Result<(), NeuroGraphError> {
    let mut graph = Graph::new();
    let w = graph.variable(zeros(&[2, 3], DType::F64), true, "w")?;
    let squared = graph.square(w.value())?;
    let loss = graph.mean(squared)?;
    let mut optimizer = SgdOptimizer::new(&mut graph, SgdConfig::new(0.1).momentum(0.9))?;
    assert!(optimizer.momentum_buffer(&w).is_none());
    optimizer.minimize(&mut graph, loss, None)?;

    let buffer = optimizer.momentum_buffer(&w).expect("buffer created by minimize");
    assert_eq!(graph.shape_of(buffer.value())?, vec![2, 3]);
    assert_eq!(graph.dtype_of(buffer.value())?, DType::F64);
    assert_eq!(graph.variable_name(&buffer)?, "SGD/momentum/w");
    assert_eq!(graph.trainable_variables(), vec![w]);

    let mut session = Session::new();
    session.initialize(&graph)?;
    assert_eq!(session.value(&graph, &buffer)?.get_f64_data()?, vec![0.0; 6]);
    Ok(())
}

#[test]
fn test_sgd_variables_live_in_their_scope() -> Result<(), NeuroGraphError> {
    let mut graph = Graph::new();
    let optimizer = SgdOptimizer::new(&mut graph, SgdConfig::default())?;
    assert_eq!(optimizer.name(), "SGD");
    assert_eq!(graph.variable_name(&optimizer.iterations())?, "SGD/iterations");
    assert_eq!(graph.variable_name(&optimizer.learning_rate())?, "SGD/lr");
    assert_eq!(graph.dtype_of(optimizer.iterations().value())?, DType::I64);
    assert_eq!(graph.dtype_of(optimizer.learning_rate().value())?, DType::F32);
    assert_eq!(graph.current_scope(), "");
    assert_relative_eq!(optimizer.initial_learning_rate(), 0.01);
    assert_relative_eq!(optimizer.decay(), 0.0);
    Ok(())
}

#[test]
fn test_sgd_out_of_range_momentum_is_accepted() -> Result<(), NeuroGraphError> {
    let mut graph = Graph::new();
    let optimizer = SgdOptimizer::new(&mut graph, SgdConfig::new(0.1).momentum(1.5))?;
    assert_relative_eq!(optimizer.config().momentum, 1.5);
    Ok(())
}

// Scalar F64 parameter `w` with loss `sum(w)`.
fn unit_gradient_f64(config: SgdConfig) -> Result<(Graph, Variable, SgdOptimizer, UpdatePlan), NeuroGraphError> {
    let mut graph = Graph::new();
    let w = graph.variable(Tensor::scalar(0.0, DType::F64), true, "w")?;
    let loss = graph.sum(w.value())?;
    let mut optimizer = SgdOptimizer::new(&mut graph, config)?;
    let plan = optimizer.minimize(&mut graph, loss, None)?;
    Ok((graph, w, optimizer, plan))
}

#[test]
fn test_sgd_f64_learning_rate_keeps_full_precision() -> Result<(), NeuroGraphError> {
    let (graph, w, optimizer, plan) = unit_gradient_f64(SgdConfig::new(0.1).lr_dtype(DType::F64))?;
    assert_eq!(graph.dtype_of(optimizer.learning_rate().value())?, DType::F64);
    let mut session = Session::new();
    session.initialize(&graph)?;
    session.run(&graph, &plan.operations())?;
    assert_relative_eq!(read(&session, &graph, &w)?, -0.1, epsilon = 1e-15);
    Ok(())
}

#[test]
fn test_sgd_default_learning_rate_is_rounded_to_f32() -> Result<(), NeuroGraphError> {
    let (graph, w, _optimizer, plan) = unit_gradient_f64(SgdConfig::new(0.1))?;
    let mut session = Session::new();
    session.initialize(&graph)?;
    session.run(&graph, &plan.operations())?;
    let value = read(&session, &graph, &w)?;
    assert_relative_eq!(value, -(0.1f32 as f64), epsilon = 1e-15);
    assert!((value + 0.1).abs() > 1e-10);
    Ok(())
}

#[test]
fn test_sgd_f64_decay_is_computed_in_f64() -> Result<(), NeuroGraphError> {
    let config = SgdConfig::new(0.1).decay(0.5).lr_dtype(DType::F64);
    let (graph, _w, optimizer, plan) = unit_gradient_f64(config)?;
    let mut session = Session::new();
    session.initialize(&graph)?;
    session.run(&graph, &plan.operations())?;
    session.run(&graph, &plan.operations())?;
    assert_relative_eq!(read(&session, &graph, &optimizer.learning_rate())?, 0.1 / 2.0, epsilon = 1e-15);
    Ok(())
}

#[test]
fn test_sgd_integer_learning_rate_dtype_is_rejected() {
    let mut graph = Graph::new();
    let result = SgdOptimizer::new(&mut graph, SgdConfig::new(0.1).lr_dtype(DType::I64));
    assert!(matches!(result, Err(NeuroGraphError::UnsupportedOperation(_))));
    assert_eq!(graph.num_variables(), 0);
    assert!(graph.initializers().is_empty());
}
