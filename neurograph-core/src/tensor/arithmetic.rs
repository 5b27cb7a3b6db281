use crate::error::NeuroGraphError;
use crate::tensor::broadcast_utils::{broadcast_indices, broadcast_shapes, broadcast_strides};
use crate::tensor::{Buffer, Tensor};
use crate::types::DType;
use num_traits::Float;

/// Element-wise binary operations. Operands broadcast against each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Element-wise unary operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Square,
    Sqrt,
}

impl BinaryOp {
    pub fn name(&self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
        }
    }
}

impl UnaryOp {
    pub fn name(&self) -> &'static str {
        match self {
            UnaryOp::Neg => "neg",
            UnaryOp::Square => "square",
            UnaryOp::Sqrt => "sqrt",
        }
    }
}

/// Output dtype of `op` on `input`, or an error for combinations without a kernel.
pub fn unary_result_dtype(op: UnaryOp, input: DType) -> Result<DType, NeuroGraphError> {
    if op == UnaryOp::Sqrt && !input.is_float() {
        return Err(NeuroGraphError::UnsupportedOperation(format!(
            "sqrt is not defined for {:?}",
            input
        )));
    }
    Ok(input)
}

/// Output dtype of a binary operation: both operands must share their dtype.
pub fn binary_result_dtype(op: BinaryOp, lhs: DType, rhs: DType) -> Result<DType, NeuroGraphError> {
    if lhs != rhs {
        return Err(NeuroGraphError::DataTypeMismatch {
            expected: lhs,
            actual: rhs,
            operation: op.name().to_string(),
        });
    }
    Ok(lhs)
}

fn zip_broadcast<T: Copy>(
    lhs: &[T],
    lhs_shape: &[usize],
    rhs: &[T],
    rhs_shape: &[usize],
    out_shape: &[usize],
    f: impl Fn(T, T) -> T,
) -> Vec<T> {
    let lhs_idx = broadcast_indices(out_shape, &broadcast_strides(lhs_shape, out_shape));
    let rhs_idx = broadcast_indices(out_shape, &broadcast_strides(rhs_shape, out_shape));
    lhs_idx
        .iter()
        .zip(rhs_idx.iter())
        .map(|(&i, &j)| f(lhs[i], rhs[j]))
        .collect()
}

fn float_kernel<T: Float>(op: BinaryOp) -> fn(T, T) -> T {
    match op {
        BinaryOp::Add => |a, b| a + b,
        BinaryOp::Sub => |a, b| a - b,
        BinaryOp::Mul => |a, b| a * b,
        BinaryOp::Div => |a, b| a / b,
    }
}

impl Tensor {
    /// Applies a broadcasting element-wise binary operation.
    ///
    /// # Errors
    /// `DataTypeMismatch` if the dtypes differ, `BroadcastError` for incompatible shapes,
    /// `UnsupportedOperation` for integer division by zero.
    pub fn binary(&self, op: BinaryOp, other: &Tensor) -> Result<Tensor, NeuroGraphError> {
        binary_result_dtype(op, self.dtype(), other.dtype())?;
        let out_shape = broadcast_shapes(&self.shape, &other.shape)?;
        let buffer = match (&self.buffer, &other.buffer) {
            (Buffer::F32(a), Buffer::F32(b)) => Buffer::F32(zip_broadcast(
                a,
                &self.shape,
                b,
                &other.shape,
                &out_shape,
                float_kernel(op),
            )),
            (Buffer::F64(a), Buffer::F64(b)) => Buffer::F64(zip_broadcast(
                a,
                &self.shape,
                b,
                &other.shape,
                &out_shape,
                float_kernel(op),
            )),
            (Buffer::I64(a), Buffer::I64(b)) => {
                if op == BinaryOp::Div && b.iter().any(|&x| x == 0) {
                    return Err(NeuroGraphError::UnsupportedOperation(
                        "integer division by zero".to_string(),
                    ));
                }
                let kernel: fn(i64, i64) -> i64 = match op {
                    BinaryOp::Add => i64::wrapping_add,
                    BinaryOp::Sub => i64::wrapping_sub,
                    BinaryOp::Mul => i64::wrapping_mul,
                    BinaryOp::Div => i64::wrapping_div,
                };
                Buffer::I64(zip_broadcast(a, &self.shape, b, &other.shape, &out_shape, kernel))
            }
            _ => {
                return Err(NeuroGraphError::InternalError(
                    "buffer variants disagree with checked dtypes".to_string(),
                ))
            }
        };
        Ok(Tensor {
            shape: out_shape,
            buffer,
        })
    }

    pub fn add(&self, other: &Tensor) -> Result<Tensor, NeuroGraphError> {
        self.binary(BinaryOp::Add, other)
    }

    pub fn sub(&self, other: &Tensor) -> Result<Tensor, NeuroGraphError> {
        self.binary(BinaryOp::Sub, other)
    }

    pub fn mul(&self, other: &Tensor) -> Result<Tensor, NeuroGraphError> {
        self.binary(BinaryOp::Mul, other)
    }

    pub fn div(&self, other: &Tensor) -> Result<Tensor, NeuroGraphError> {
        self.binary(BinaryOp::Div, other)
    }

    /// Applies an element-wise unary operation.
    pub fn unary(&self, op: UnaryOp) -> Result<Tensor, NeuroGraphError> {
        unary_result_dtype(op, self.dtype())?;
        let buffer = match (&self.buffer, op) {
            (Buffer::F32(v), UnaryOp::Neg) => Buffer::F32(v.iter().map(|x| -x).collect()),
            (Buffer::F32(v), UnaryOp::Square) => Buffer::F32(v.iter().map(|x| x * x).collect()),
            (Buffer::F32(v), UnaryOp::Sqrt) => Buffer::F32(v.iter().map(|x| x.sqrt()).collect()),
            (Buffer::F64(v), UnaryOp::Neg) => Buffer::F64(v.iter().map(|x| -x).collect()),
            (Buffer::F64(v), UnaryOp::Square) => Buffer::F64(v.iter().map(|x| x * x).collect()),
            (Buffer::F64(v), UnaryOp::Sqrt) => Buffer::F64(v.iter().map(|x| x.sqrt()).collect()),
            (Buffer::I64(v), UnaryOp::Neg) => Buffer::I64(v.iter().map(|x| x.wrapping_neg()).collect()),
            (Buffer::I64(v), UnaryOp::Square) => {
                Buffer::I64(v.iter().map(|x| x.wrapping_mul(*x)).collect())
            }
            (Buffer::I64(_), UnaryOp::Sqrt) => {
                return Err(NeuroGraphError::InternalError(
                    "sqrt on I64 passed the dtype check".to_string(),
                ))
            }
        };
        Ok(Tensor {
            shape: self.shape(),
            buffer,
        })
    }

    pub fn neg(&self) -> Result<Tensor, NeuroGraphError> {
        self.unary(UnaryOp::Neg)
    }

    pub fn square(&self) -> Result<Tensor, NeuroGraphError> {
        self.unary(UnaryOp::Square)
    }

    pub fn sqrt(&self) -> Result<Tensor, NeuroGraphError> {
        self.unary(UnaryOp::Sqrt)
    }

    /// Converts the elements to `dtype`. Float to integer truncates toward zero.
    pub fn cast(&self, dtype: DType) -> Tensor {
        if self.dtype() == dtype {
            return self.clone();
        }
        let buffer = match (&self.buffer, dtype) {
            (Buffer::F32(v), DType::F64) => Buffer::F64(v.iter().map(|&x| x as f64).collect()),
            (Buffer::I64(v), DType::F32) => Buffer::F32(v.iter().map(|&x| x as f32).collect()),
            _ => return Tensor::from_f64_values(self.to_f64_vec(), self.shape(), dtype),
        };
        Tensor {
            shape: self.shape(),
            buffer,
        }
    }

    /// Sums every element into a zero-dimensional tensor of the same dtype.
    pub fn sum_all(&self) -> Tensor {
        match &self.buffer {
            Buffer::I64(v) => Tensor {
                shape: vec![],
                buffer: Buffer::I64(vec![v.iter().fold(0i64, |acc, x| acc.wrapping_add(*x))]),
            },
            _ => Tensor::scalar(self.to_f64_vec().iter().sum(), self.dtype()),
        }
    }

    /// Arithmetic mean of every element. Float dtypes only.
    pub fn mean_all(&self) -> Result<Tensor, NeuroGraphError> {
        if !self.dtype().is_float() {
            return Err(NeuroGraphError::UnsupportedOperation(format!(
                "mean is not defined for {:?}",
                self.dtype()
            )));
        }
        let n = self.numel() as f64;
        let total: f64 = self.to_f64_vec().iter().sum();
        Ok(Tensor::scalar(total / n, self.dtype()))
    }
}
