use crate::error::NeuroGraphError;
use crate::tensor::{Buffer, Tensor};
use std::cmp::max;

/// Calculates the contiguous row-major strides for a given shape.
///
/// shape = [2, 3] -> strides = [3, 1]
pub fn calculate_strides(shape: &[usize]) -> Vec<usize> {
    let rank = shape.len();
    let mut strides = vec![1; rank];
    for i in (0..rank.saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * shape[i + 1];
    }
    strides
}

/// Determines the output shape resulting from broadcasting two input shapes.
///
/// Follows NumPy broadcasting rules: shapes are aligned on the right, missing
/// leading dimensions count as 1, and each dimension pair must be equal or contain a 1.
pub fn broadcast_shapes(shape_a: &[usize], shape_b: &[usize]) -> Result<Vec<usize>, NeuroGraphError> {
    let rank_a = shape_a.len();
    let rank_b = shape_b.len();
    let max_rank = max(rank_a, rank_b);
    let mut result_shape = vec![0; max_rank];

    for i in 0..max_rank {
        let dim_a = if i < rank_a { shape_a[rank_a - 1 - i] } else { 1 };
        let dim_b = if i < rank_b { shape_b[rank_b - 1 - i] } else { 1 };

        result_shape[max_rank - 1 - i] = if dim_a == dim_b || dim_b == 1 {
            dim_a
        } else if dim_a == 1 {
            dim_b
        } else {
            return Err(NeuroGraphError::BroadcastError {
                shape1: shape_a.to_vec(),
                shape2: shape_b.to_vec(),
            });
        };
    }
    Ok(result_shape)
}

/// Strides that read a tensor of `shape` as if it had been broadcast to `out_shape`.
/// Broadcast dimensions get a stride of 0.
pub(crate) fn broadcast_strides(shape: &[usize], out_shape: &[usize]) -> Vec<usize> {
    let strides = calculate_strides(shape);
    let offset = out_shape.len() - shape.len();
    (0..out_shape.len())
        .map(|i| {
            if i < offset || shape[i - offset] == 1 {
                0
            } else {
                strides[i - offset]
            }
        })
        .collect()
}

/// Maps every linear index of `out_shape` to the linear index of a source tensor
/// read through `src_strides`.
pub(crate) fn broadcast_indices(out_shape: &[usize], src_strides: &[usize]) -> Vec<usize> {
    let numel: usize = out_shape.iter().product();
    let rank = out_shape.len();
    let mut indices = Vec::with_capacity(numel);
    let mut coord = vec![0usize; rank];
    let mut src = 0usize;
    for _ in 0..numel {
        indices.push(src);
        // Odometer increment, innermost dimension first.
        for d in (0..rank).rev() {
            coord[d] += 1;
            src += src_strides[d];
            if coord[d] < out_shape[d] {
                break;
            }
            src -= src_strides[d] * coord[d];
            coord[d] = 0;
        }
    }
    indices
}

fn gather<T: Copy>(data: &[T], indices: &[usize]) -> Vec<T> {
    indices.iter().map(|&i| data[i]).collect()
}

impl Tensor {
    /// Expands the tensor to `target_shape` following broadcasting rules.
    pub fn broadcast_to(&self, target_shape: &[usize]) -> Result<Tensor, NeuroGraphError> {
        if self.shape == target_shape {
            return Ok(self.clone());
        }
        let out = broadcast_shapes(&self.shape, target_shape)?;
        if out != target_shape {
            return Err(NeuroGraphError::BroadcastError {
                shape1: self.shape(),
                shape2: target_shape.to_vec(),
            });
        }
        let indices = broadcast_indices(target_shape, &broadcast_strides(&self.shape, target_shape));
        let buffer = match &self.buffer {
            Buffer::F32(v) => Buffer::F32(gather(v, &indices)),
            Buffer::F64(v) => Buffer::F64(gather(v, &indices)),
            Buffer::I64(v) => Buffer::I64(gather(v, &indices)),
        };
        Ok(Tensor {
            shape: target_shape.to_vec(),
            buffer,
        })
    }

    /// Reduces the tensor to `target_shape` by summing along broadcast dimensions.
    ///
    /// This is the reverse of [`Tensor::broadcast_to`] and is what the backward pass
    /// of a broadcasting operation needs. `target_shape` must broadcast to `self.shape()`.
    pub fn sum_to_shape(&self, target_shape: &[usize]) -> Result<Tensor, NeuroGraphError> {
        if self.shape == target_shape {
            return Ok(self.clone());
        }
        if target_shape.len() > self.rank() || broadcast_shapes(target_shape, &self.shape)? != self.shape {
            return Err(NeuroGraphError::ShapeMismatch {
                expected: target_shape.to_vec(),
                actual: self.shape(),
                operation: "sum_to_shape".to_string(),
            });
        }
        let indices = broadcast_indices(&self.shape, &broadcast_strides(target_shape, &self.shape));
        let target_numel: usize = target_shape.iter().product();
        let values = self.to_f64_vec();
        let mut sums = vec![0.0f64; target_numel];
        for (value, &target_index) in values.iter().zip(indices.iter()) {
            sums[target_index] += value;
        }
        Ok(Tensor::from_f64_values(sums, target_shape.to_vec(), self.dtype()))
    }
}
