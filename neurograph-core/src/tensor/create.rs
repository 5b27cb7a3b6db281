// src/tensor/create.rs

use crate::error::NeuroGraphError;
use crate::tensor::Tensor;
use crate::types::DType;
use num_traits::ToPrimitive;
use rand::Rng;

/// Creates a new tensor of `dtype` filled with zeros.
pub fn zeros(shape: &[usize], dtype: DType) -> Tensor {
    full(shape, 0.0, dtype)
}

/// Creates a new tensor of `dtype` filled with ones.
pub fn ones(shape: &[usize], dtype: DType) -> Tensor {
    full(shape, 1.0, dtype)
}

/// Creates a new tensor of `dtype` filled with `value` (rounded or truncated to `dtype`).
pub fn full(shape: &[usize], value: f64, dtype: DType) -> Tensor {
    let numel = shape.iter().product();
    Tensor::from_f64_values(vec![value; numel], shape.to_vec(), dtype)
}

/// Creates a zero tensor with the same shape and dtype as `tensor`.
pub fn zeros_like(tensor: &Tensor) -> Tensor {
    zeros(&tensor.shape, tensor.dtype())
}

/// Creates a tensor with elements drawn uniformly from `[low, high)`.
///
/// Only floating-point dtypes are supported.
pub fn uniform<R: Rng + ?Sized>(
    shape: &[usize],
    low: f64,
    high: f64,
    dtype: DType,
    rng: &mut R,
) -> Result<Tensor, NeuroGraphError> {
    if !dtype.is_float() {
        return Err(NeuroGraphError::UnsupportedOperation(format!(
            "uniform initialization requires a float dtype, got {:?}",
            dtype
        )));
    }
    if low.is_nan() || high.is_nan() || low >= high {
        return Err(NeuroGraphError::InvalidArgument {
            name: "high".to_string(),
            value: high,
            reason: format!("must be greater than low ({})", low),
        });
    }
    let numel: usize = shape.iter().product();
    let values = (0..numel).map(|_| rng.gen_range(low..high)).collect();
    Ok(Tensor::from_f64_values(values, shape.to_vec(), dtype))
}

impl Tensor {
    /// Creates a tensor of `dtype` from any primitive numeric values.
    ///
    /// # Errors
    /// `TensorCreationError` on a length/shape mismatch, `UnsupportedOperation` if a value
    /// cannot be represented in `dtype`.
    pub fn from_vec<T: ToPrimitive>(
        data: Vec<T>,
        shape: Vec<usize>,
        dtype: DType,
    ) -> Result<Tensor, NeuroGraphError> {
        let numel: usize = shape.iter().product();
        if data.len() != numel {
            return Err(NeuroGraphError::TensorCreationError {
                data_len: data.len(),
                shape,
            });
        }
        let not_representable = || {
            NeuroGraphError::UnsupportedOperation(format!(
                "value not representable as {:?}",
                dtype
            ))
        };
        match dtype {
            DType::F32 => {
                let values = data
                    .iter()
                    .map(|v| v.to_f32().ok_or_else(not_representable))
                    .collect::<Result<Vec<_>, _>>()?;
                Tensor::new(values, shape)
            }
            DType::F64 => {
                let values = data
                    .iter()
                    .map(|v| v.to_f64().ok_or_else(not_representable))
                    .collect::<Result<Vec<_>, _>>()?;
                Tensor::new_f64(values, shape)
            }
            DType::I64 => {
                let values = data
                    .iter()
                    .map(|v| v.to_i64().ok_or_else(not_representable))
                    .collect::<Result<Vec<_>, _>>()?;
                Tensor::new_i64(values, shape)
            }
        }
    }
}
