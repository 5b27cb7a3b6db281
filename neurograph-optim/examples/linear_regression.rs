//! # Fitting a line with graph-built optimizers
//!
//! Builds the mean squared error of `pred = w * x + b` against `y = 2x + 1`,
//! asks an optimizer for the update operations of one training step, and runs
//! them repeatedly in a `Session`. Both SGD (with momentum and decay) and
//! Adagrad are trained on the same problem.
//!
//! Run with `RUST_LOG=debug cargo run --example linear_regression` to see the
//! graph construction logs.

use log::info;
use neurograph_core::{DType, Graph, NeuroGraphError, NodeId, Session, Tensor, Variable};
use neurograph_optim::{AdagradConfig, OptimizerConfig, SgdConfig};

const STEPS: usize = 400;

struct Problem {
    graph: Graph,
    w: Variable,
    b: Variable,
    loss: NodeId,
}

fn build_problem() -> Result<Problem, NeuroGraphError> {
    let mut graph = Graph::new();
    let w = graph.variable(Tensor::scalar(0.0, DType::F32), true, "w")?;
    let b = graph.variable(Tensor::scalar(0.0, DType::F32), true, "b")?;

    let xs: Vec<f32> = (0..8).map(|i| i as f32 * 0.5).collect();
    let ys: Vec<f32> = xs.iter().map(|x| 2.0 * x + 1.0).collect();
    let x = graph.constant(Tensor::new(xs, vec![8])?);
    let y = graph.constant(Tensor::new(ys, vec![8])?);

    let wx = graph.mul(w.value(), x)?;
    let prediction = graph.add(wx, b.value())?;
    let residual = graph.sub(prediction, y)?;
    let squared = graph.square(residual)?;
    let loss = graph.mean(squared)?;
    Ok(Problem { graph, w, b, loss })
}

fn train(config: OptimizerConfig) -> Result<(), NeuroGraphError> {
    let name = config.name();
    let mut problem = build_problem()?;
    let mut optimizer = config.build(&mut problem.graph)?;
    let plan = optimizer.minimize(&mut problem.graph, problem.loss, None)?;
    info!("{}: one step is {} operation(s)", name, plan.len());

    let graph = &problem.graph;
    let mut session = Session::new();
    session.initialize(graph)?;
    let operations = plan.operations();
    for step in 0..STEPS {
        session.run(graph, &operations)?;
        if step % 100 == 0 || step == STEPS - 1 {
            let loss = session.evaluate(graph, problem.loss)?.item()?;
            let lr = session.value(graph, &optimizer.learning_rate())?.item()?;
            println!("[{}] step {:>4}  loss {:.6}  lr {:.5}", name, step + 1, loss, lr);
        }
    }

    let w = session.value(graph, &problem.w)?.item()?;
    let b = session.value(graph, &problem.b)?.item()?;
    println!("[{}] fitted y = {:.4} * x + {:.4}", name, w, b);
    Ok(())
}

fn main() -> Result<(), NeuroGraphError> {
    env_logger::init();

    train(SgdConfig::new(0.05).momentum(0.9).decay(1e-3).into())?;
    train(SgdConfig::new(0.05).momentum(0.9).nesterov(true).into())?;
    train(AdagradConfig::new(0.5).initial_accumulator_value(0.1).into())?;
    Ok(())
}
