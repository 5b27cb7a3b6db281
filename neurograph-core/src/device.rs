use std::fmt::Debug;

/// Represents the device a graph node or variable should be placed on.
///
/// In NeuroGraph this is a placement hint only: the `Session` evaluates
/// everything on the CPU, but the hint is recorded so an execution engine
/// could honor colocation requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StorageDevice {
    /// Main system memory (RAM). This is the default device.
    #[default]
    CPU,
    /// A CUDA-enabled GPU, identified by its ordinal.
    GPU(usize),
}
