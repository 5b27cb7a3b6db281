use crate::error::NeuroGraphError;
use crate::tensor::arithmetic::{BinaryOp, UnaryOp};
use crate::tensor::Tensor;
use crate::types::DType;
use approx::assert_relative_eq;

#[test]
fn test_elementwise_binary_ops() -> Result<(), NeuroGraphError> {
    let a = Tensor::new(vec![1.0, 2.0, 3.0], vec![3])?;
    let b = Tensor::new(vec![4.0, 5.0, 6.0], vec![3])?;
    assert_eq!(a.add(&b)?.get_f32_data()?, vec![5.0, 7.0, 9.0]);
    assert_eq!(a.sub(&b)?.get_f32_data()?, vec![-3.0, -3.0, -3.0]);
    assert_eq!(a.mul(&b)?.get_f32_data()?, vec![4.0, 10.0, 18.0]);
    assert_eq!(b.div(&a)?.get_f32_data()?, vec![4.0, 2.5, 2.0]);
    Ok(())
}

#[test]
fn test_scalar_broadcasting() -> Result<(), NeuroGraphError> {
    let m = Tensor::new_f64(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2])?;
    let s = Tensor::scalar(0.5, DType::F64);
    let scaled = m.binary(BinaryOp::Mul, &s)?;
    assert_eq!(scaled.shape(), vec![2, 2]);
    assert_eq!(scaled.get_f64_data()?, vec![0.5, 1.0, 1.5, 2.0]);
    Ok(())
}

#[test]
fn test_binary_dtype_mismatch() {
    let a = Tensor::new(vec![1.0], vec![1]).unwrap();
    let b = Tensor::new_f64(vec![1.0], vec![1]).unwrap();
    match a.add(&b) {
        Err(NeuroGraphError::DataTypeMismatch { expected, actual, operation }) => {
            assert_eq!(expected, DType::F32);
            assert_eq!(actual, DType::F64);
            assert_eq!(operation, "add");
        }
        other => panic!("Expected DataTypeMismatch, got {:?}", other),
    }
}

#[test]
fn test_integer_ops() -> Result<(), NeuroGraphError> {
    let counter = Tensor::scalar(41.0, DType::I64);
    let one = Tensor::scalar(1.0, DType::I64);
    assert_eq!(counter.add(&one)?.get_i64_data()?, vec![42]);

    let zero = Tensor::scalar(0.0, DType::I64);
    assert!(matches!(counter.div(&zero), Err(NeuroGraphError::UnsupportedOperation(_))));
    assert!(counter.sqrt().is_err());
    Ok(())
}

#[test]
fn test_unary_ops() -> Result<(), NeuroGraphError> {
    let t = Tensor::new(vec![4.0, 9.0], vec![2])?;
    assert_eq!(t.unary(UnaryOp::Sqrt)?.get_f32_data()?, vec![2.0, 3.0]);
    assert_eq!(t.square()?.get_f32_data()?, vec![16.0, 81.0]);
    assert_eq!(t.neg()?.get_f32_data()?, vec![-4.0, -9.0]);
    Ok(())
}

#[test]
fn test_cast() {
    let t = Tensor::new(vec![1.75, -1.75], vec![2]).unwrap();
    assert_eq!(t.cast(DType::I64).get_i64_data().unwrap(), vec![1, -1]);
    assert_eq!(t.cast(DType::F64).get_f64_data().unwrap(), vec![1.75, -1.75]);
    let i = Tensor::scalar(3.0, DType::I64);
    assert_eq!(i.cast(DType::F32).get_f32_data().unwrap(), vec![3.0]);
}

#[test]
fn test_reductions() -> Result<(), NeuroGraphError> {
    let t = Tensor::new_f64(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2])?;
    assert_relative_eq!(t.sum_all().item()?, 10.0);
    assert_relative_eq!(t.mean_all()?.item()?, 2.5);
    assert!(Tensor::scalar(1.0, DType::I64).mean_all().is_err());
    Ok(())
}

#[test]
fn test_tensor_approx_eq() {
    let a = Tensor::new_f64(vec![0.1 + 0.2], vec![1]).unwrap();
    let b = Tensor::new_f64(vec![0.3], vec![1]).unwrap();
    assert_relative_eq!(a, b, epsilon = 1e-12);
    let c = Tensor::new(vec![0.3], vec![1]).unwrap();
    assert!(approx::abs_diff_ne!(a, c, epsilon = 1e-3));
}
