use crate::nn::criterion::{BinaryCrossEntropy, accuracy};
use approx::assert_abs_diff_eq;
use ndarray::arr2;

#[test]
fn test_bce_loss_value() {
    // -ln(0.8)两次取平均
    let probs = arr2(&[[0.8], [0.2]]);
    let targets = arr2(&[[1.0], [0.0]]);
    let loss = BinaryCrossEntropy::loss(&probs, &targets);
    assert_abs_diff_eq!(loss, -(0.8f32.ln()), epsilon = 1e-6);
}

#[test]
fn test_bce_loss_clamps_extreme_probs() {
    // 概率0/1被截断，不会产生无穷
    let probs = arr2(&[[0.0], [1.0]]);
    let targets = arr2(&[[1.0], [0.0]]);
    let loss = BinaryCrossEntropy::loss(&probs, &targets);
    assert!(loss.is_finite());
    assert_abs_diff_eq!(loss, -(BinaryCrossEntropy::EPSILON.ln()), epsilon = 1e-1);
}

#[test]
fn test_bce_loss_propagates_nan() {
    // 网络前向发散产出NaN时，损失同样为NaN（交给发散守卫处理）
    let probs = arr2(&[[f32::NAN]]);
    let targets = arr2(&[[1.0]]);
    assert!(BinaryCrossEntropy::loss(&probs, &targets).is_nan());
}

#[test]
fn test_grad_logits() {
    // (p - y) / N
    let probs = arr2(&[[0.8], [0.2]]);
    let targets = arr2(&[[1.0], [0.0]]);
    let grad = BinaryCrossEntropy::grad_logits(&probs, &targets);
    assert_abs_diff_eq!(grad[[0, 0]], -0.1, epsilon = 1e-6);
    assert_abs_diff_eq!(grad[[1, 0]], 0.1, epsilon = 1e-6);
}

#[test]
fn test_accuracy_threshold_inclusive() {
    // p = 0.5（含）判为类1
    let probs = arr2(&[[0.5], [0.5], [0.3]]);
    let targets = arr2(&[[1.0], [0.0], [0.0]]);
    assert_abs_diff_eq!(accuracy(&probs, &targets), 2.0 / 3.0, epsilon = 1e-6);
}

#[test]
fn test_accuracy_empty_batch() {
    let empty = ndarray::Array2::<f32>::zeros((0, 1));
    assert_abs_diff_eq!(accuracy(&empty, &empty), 0.0, epsilon = 1e-6);
}
