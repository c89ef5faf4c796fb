use crate::errors::ModelError;
use crate::nn::{Dense, Module};
use approx::assert_abs_diff_eq;
use ndarray::{Array2, ArrayD, IxDyn, arr2};
use rand::SeedableRng;
use rand::rngs::StdRng;

/// 按名覆盖模块参数值（测试辅助）
fn set_param(module: &mut dyn Module, name: &str, value: ArrayD<f32>) {
    let mut value = Some(value);
    for param in module.parameters_mut() {
        if param.name() == name {
            param.set_value(value.take().unwrap()).unwrap();
            return;
        }
    }
    panic!("未找到参数{name}");
}

/// 按名读取模块参数梯度（测试辅助）
fn get_grad(module: &dyn Module, name: &str) -> ArrayD<f32> {
    for param in module.parameters() {
        if param.name() == name {
            return param.grad().clone();
        }
    }
    panic!("未找到参数{name}");
}

#[test]
fn test_dense_forward_value() {
    let mut rng = StdRng::seed_from_u64(0);
    let mut dense = Dense::new(3, 2, "fc", &mut rng);

    // 1. 手动设置权重与偏置便于验证
    let w = ArrayD::from_shape_vec(IxDyn(&[3, 2]), vec![1.0, 0.0, 0.0, 1.0, 1.0, 1.0]).unwrap();
    let b = ArrayD::from_shape_vec(IxDyn(&[1, 2]), vec![0.5, -0.5]).unwrap();
    set_param(&mut dense, "fc_W", w);
    set_param(&mut dense, "fc_b", b);

    // 2. x @ W + b = [1+3, 2+3] + [0.5, -0.5]
    let x = arr2(&[[1.0, 2.0, 3.0]]);
    let output = dense.forward(&x).unwrap();
    assert_eq!(output.shape(), &[1, 2]);
    assert_abs_diff_eq!(output[[0, 0]], 4.5, epsilon = 1e-6);
    assert_abs_diff_eq!(output[[0, 1]], 4.5, epsilon = 1e-6);
}

#[test]
fn test_dense_backward_gradients() {
    let mut rng = StdRng::seed_from_u64(0);
    let mut dense = Dense::new(3, 2, "fc", &mut rng);
    let w = ArrayD::from_shape_vec(IxDyn(&[3, 2]), vec![1.0, 0.0, 0.0, 1.0, 1.0, 1.0]).unwrap();
    set_param(&mut dense, "fc_W", w);
    set_param(&mut dense, "fc_b", ArrayD::zeros(IxDyn(&[1, 2])));

    let x = arr2(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
    let _ = dense.forward(&x).unwrap();
    let grad_out = Array2::<f32>::ones((2, 2));
    let grad_in = dense.backward(&grad_out).unwrap();

    // 1. dW = xᵀ·g
    let dw = get_grad(&dense, "fc_W");
    assert_abs_diff_eq!(dw[[0, 0]], 5.0, epsilon = 1e-6);
    assert_abs_diff_eq!(dw[[1, 1]], 7.0, epsilon = 1e-6);
    assert_abs_diff_eq!(dw[[2, 0]], 9.0, epsilon = 1e-6);

    // 2. db = Σ_行 g
    let db = get_grad(&dense, "fc_b");
    assert_abs_diff_eq!(db[[0, 0]], 2.0, epsilon = 1e-6);
    assert_abs_diff_eq!(db[[0, 1]], 2.0, epsilon = 1e-6);

    // 3. dx = g·Wᵀ
    assert_eq!(grad_in.shape(), &[2, 3]);
    assert_abs_diff_eq!(grad_in[[0, 0]], 1.0, epsilon = 1e-6);
    assert_abs_diff_eq!(grad_in[[0, 1]], 1.0, epsilon = 1e-6);
    assert_abs_diff_eq!(grad_in[[0, 2]], 2.0, epsilon = 1e-6);
}

#[test]
fn test_dense_dimension_mismatch() {
    let mut rng = StdRng::seed_from_u64(0);
    let mut dense = Dense::new(3, 2, "fc", &mut rng);
    let x = Array2::<f32>::zeros((4, 5));
    let result = dense.forward(&x);
    assert!(matches!(
        result,
        Err(ModelError::DimensionMismatch {
            expected: 3,
            actual: 5
        })
    ));
}

#[test]
fn test_dense_grad_accumulates_until_zeroed() {
    let mut rng = StdRng::seed_from_u64(0);
    let mut dense = Dense::new(2, 1, "fc", &mut rng);
    let x = arr2(&[[1.0, 1.0]]);
    let grad_out = Array2::<f32>::ones((1, 1));

    let _ = dense.forward(&x).unwrap();
    let _ = dense.backward(&grad_out).unwrap();
    let _ = dense.forward(&x).unwrap();
    let _ = dense.backward(&grad_out).unwrap();
    // 两次反向传播后梯度应累加
    assert_abs_diff_eq!(get_grad(&dense, "fc_W")[[0, 0]], 2.0, epsilon = 1e-6);

    for param in dense.parameters_mut() {
        param.zero_grad();
    }
    assert_abs_diff_eq!(get_grad(&dense, "fc_W")[[0, 0]], 0.0, epsilon = 1e-6);
}
