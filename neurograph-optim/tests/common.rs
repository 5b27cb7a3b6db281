use neurograph_core::{DType, Graph, NeuroGraphError, NodeId, Session, Tensor, Variable};

// Shared by several integration test files; not every file uses every helper.
#[allow(dead_code)]
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// `y = 2x + 1` sampled at `x = 0..4`, fitted by `pred = w * x + b` under mean squared error.
#[allow(dead_code)]
pub struct Regression {
    pub graph: Graph,
    pub w: Variable,
    pub b: Variable,
    pub loss: NodeId,
}

#[allow(dead_code)]
pub fn linear_regression() -> Result<Regression, NeuroGraphError> {
    let mut graph = Graph::new();
    let w = graph.variable(Tensor::scalar(0.0, DType::F32), true, "w")?;
    let b = graph.variable(Tensor::scalar(0.0, DType::F32), true, "b")?;
    let x = graph.constant(Tensor::new(vec![0.0, 1.0, 2.0, 3.0], vec![4])?);
    let y = graph.constant(Tensor::new(vec![1.0, 3.0, 5.0, 7.0], vec![4])?);
    let wx = graph.mul(w.value(), x)?;
    let prediction = graph.add(wx, b.value())?;
    let residual = graph.sub(prediction, y)?;
    let squared = graph.square(residual)?;
    let loss = graph.mean(squared)?;
    Ok(Regression { graph, w, b, loss })
}

#[allow(dead_code)]
pub fn initialized_session(graph: &Graph) -> Result<Session, NeuroGraphError> {
    let mut session = Session::new();
    session.initialize(graph)?;
    Ok(session)
}
