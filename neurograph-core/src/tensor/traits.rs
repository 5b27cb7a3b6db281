use crate::tensor::Tensor;
use approx::{AbsDiffEq, RelativeEq};
use std::fmt;

// Tensors compare element-wise in f64; shapes and dtypes must match exactly.
impl AbsDiffEq for Tensor {
    type Epsilon = f64;

    fn default_epsilon() -> f64 {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: f64) -> bool {
        self.shape == other.shape
            && self.dtype() == other.dtype()
            && self
                .to_f64_vec()
                .iter()
                .zip(other.to_f64_vec().iter())
                .all(|(a, b)| a.abs_diff_eq(b, epsilon))
    }
}

impl RelativeEq for Tensor {
    fn default_max_relative() -> f64 {
        f64::default_max_relative()
    }

    fn relative_eq(&self, other: &Self, epsilon: f64, max_relative: f64) -> bool {
        self.shape == other.shape
            && self.dtype() == other.dtype()
            && self
                .to_f64_vec()
                .iter()
                .zip(other.to_f64_vec().iter())
                .all(|(a, b)| a.relative_eq(b, epsilon, max_relative))
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tensor({:?}, shape={:?}, dtype={:?})", self.to_f64_vec(), self.shape, self.dtype())
    }
}
