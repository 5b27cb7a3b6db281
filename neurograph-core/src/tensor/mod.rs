// src/tensor/mod.rs

use crate::error::NeuroGraphError;
use crate::types::DType;

pub mod arithmetic;
pub mod broadcast_utils;
pub mod create;
mod traits;

pub use create::{full, ones, uniform, zeros, zeros_like};

#[cfg(test)]
mod arithmetic_test;

/// Typed, contiguous element storage of a `Tensor`.
#[derive(Debug, Clone, PartialEq)]
pub enum Buffer {
    F32(Vec<f32>),
    F64(Vec<f64>),
    I64(Vec<i64>),
}

impl Buffer {
    pub fn dtype(&self) -> DType {
        match self {
            Buffer::F32(_) => DType::F32,
            Buffer::F64(_) => DType::F64,
            Buffer::I64(_) => DType::I64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Buffer::F32(v) => v.len(),
            Buffer::F64(v) => v.len(),
            Buffer::I64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A dense, row-major multi-dimensional array with a runtime element type.
///
/// Tensors are plain values: graph constants, variable contents held by a
/// `Session`, and evaluation results. Cloning copies the data.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    pub(crate) shape: Vec<usize>,
    pub(crate) buffer: Buffer,
}

impl Tensor {
    /// Creates a new F32 tensor from a flattened row-major vector and a shape.
    ///
    /// # Errors
    /// Returns `NeuroGraphError::TensorCreationError` if the length of `data_vec` does not
    /// match the number of elements described by `shape`.
    pub fn new(data_vec: Vec<f32>, shape: Vec<usize>) -> Result<Self, NeuroGraphError> {
        Self::from_buffer(Buffer::F32(data_vec), shape)
    }

    /// Creates a new F64 tensor. See [`Tensor::new`].
    pub fn new_f64(data_vec: Vec<f64>, shape: Vec<usize>) -> Result<Self, NeuroGraphError> {
        Self::from_buffer(Buffer::F64(data_vec), shape)
    }

    /// Creates a new I64 tensor. See [`Tensor::new`].
    pub fn new_i64(data_vec: Vec<i64>, shape: Vec<usize>) -> Result<Self, NeuroGraphError> {
        Self::from_buffer(Buffer::I64(data_vec), shape)
    }

    pub(crate) fn from_buffer(buffer: Buffer, shape: Vec<usize>) -> Result<Self, NeuroGraphError> {
        let numel: usize = shape.iter().product();
        if buffer.len() != numel {
            return Err(NeuroGraphError::TensorCreationError {
                data_len: buffer.len(),
                shape,
            });
        }
        Ok(Tensor { shape, buffer })
    }

    /// Builds a tensor of `dtype` from `f64` values, rounding or truncating as the
    /// target type requires. The caller guarantees `values.len()` matches `shape`.
    pub(crate) fn from_f64_values(values: Vec<f64>, shape: Vec<usize>, dtype: DType) -> Self {
        let buffer = match dtype {
            DType::F32 => Buffer::F32(values.into_iter().map(|v| v as f32).collect()),
            DType::F64 => Buffer::F64(values),
            DType::I64 => Buffer::I64(values.into_iter().map(|v| v as i64).collect()),
        };
        Tensor { shape, buffer }
    }

    /// Creates a zero-dimensional tensor holding `value`.
    pub fn scalar(value: f64, dtype: DType) -> Self {
        Self::from_f64_values(vec![value], vec![], dtype)
    }

    /// The shape (dimensions) of the tensor.
    pub fn shape(&self) -> Vec<usize> {
        self.shape.clone()
    }

    pub fn dtype(&self) -> DType {
        self.buffer.dtype()
    }

    /// Number of dimensions.
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Total number of elements.
    pub fn numel(&self) -> usize {
        self.buffer.len()
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    /// Returns a copy of the elements converted to `f64`.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        match &self.buffer {
            Buffer::F32(v) => v.iter().map(|&x| x as f64).collect(),
            Buffer::F64(v) => v.clone(),
            Buffer::I64(v) => v.iter().map(|&x| x as f64).collect(),
        }
    }

    /// Returns a copy of the F32 data, or `DataTypeMismatch` for other dtypes.
    pub fn get_f32_data(&self) -> Result<Vec<f32>, NeuroGraphError> {
        match &self.buffer {
            Buffer::F32(v) => Ok(v.clone()),
            other => Err(NeuroGraphError::DataTypeMismatch {
                expected: DType::F32,
                actual: other.dtype(),
                operation: "get_f32_data".to_string(),
            }),
        }
    }

    /// Returns a copy of the F64 data, or `DataTypeMismatch` for other dtypes.
    pub fn get_f64_data(&self) -> Result<Vec<f64>, NeuroGraphError> {
        match &self.buffer {
            Buffer::F64(v) => Ok(v.clone()),
            other => Err(NeuroGraphError::DataTypeMismatch {
                expected: DType::F64,
                actual: other.dtype(),
                operation: "get_f64_data".to_string(),
            }),
        }
    }

    /// Returns a copy of the I64 data, or `DataTypeMismatch` for other dtypes.
    pub fn get_i64_data(&self) -> Result<Vec<i64>, NeuroGraphError> {
        match &self.buffer {
            Buffer::I64(v) => Ok(v.clone()),
            other => Err(NeuroGraphError::DataTypeMismatch {
                expected: DType::I64,
                actual: other.dtype(),
                operation: "get_i64_data".to_string(),
            }),
        }
    }

    /// Returns the single element of a one-element tensor as `f64`.
    pub fn item(&self) -> Result<f64, NeuroGraphError> {
        if self.numel() != 1 {
            return Err(NeuroGraphError::ShapeMismatch {
                expected: vec![],
                actual: self.shape(),
                operation: "item".to_string(),
            });
        }
        Ok(self.to_f64_vec()[0])
    }
}
