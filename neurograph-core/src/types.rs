/// Defines the possible data types for tensor elements and graph nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DType {
    /// 32-bit floating-point type.
    #[default]
    F32,
    /// 64-bit floating-point type.
    F64,
    /// 64-bit integer type. Used for step counters.
    I64,
}

impl DType {
    /// Returns `true` for the floating-point types, the only ones gradients flow through.
    pub fn is_float(&self) -> bool {
        matches!(self, DType::F32 | DType::F64)
    }
}
