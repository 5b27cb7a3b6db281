use neurograph_core::{Graph, NeuroGraphError, Session};

// Shared by several integration test files; not every file uses every helper.
#[allow(dead_code)]
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[allow(dead_code)]
pub fn initialized_session(graph: &Graph) -> Result<Session, NeuroGraphError> {
    let mut session = Session::new();
    session.initialize(graph)?;
    Ok(session)
}
