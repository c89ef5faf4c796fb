use crate::nn::{Adam, Module, Optimizer, Parameter};
use approx::assert_abs_diff_eq;
use ndarray::{ArrayD, IxDyn};

/// 只含单个参数的最小模块（测试辅助）
struct ToyModule {
    p: Parameter,
}

impl ToyModule {
    fn new(value: f32) -> Self {
        Self {
            p: Parameter::new(
                "toy_p",
                ArrayD::from_shape_vec(IxDyn(&[1]), vec![value]).unwrap(),
            ),
        }
    }

    fn set_grad(&mut self, grad: f32) {
        self.p.grad_mut().fill(grad);
    }

    fn value(&self) -> f32 {
        self.p.value()[[0]]
    }
}

impl Module for ToyModule {
    fn parameters(&self) -> Vec<&Parameter> {
        vec![&self.p]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        vec![&mut self.p]
    }
}

#[test]
fn test_adam_first_step_magnitude() {
    // 首步偏差修正后 m_hat = g、v_hat = g²，更新量 ≈ lr·sign(g)
    let mut module = ToyModule::new(2.0);
    let mut optimizer = Adam::new_default(0.1);
    module.set_grad(1.0);
    optimizer.step(&mut module).unwrap();
    assert_abs_diff_eq!(module.value(), 1.9, epsilon = 1e-4);
}

#[test]
fn test_adam_descends_along_gradient_sign() {
    let mut module = ToyModule::new(0.0);
    let mut optimizer = Adam::new_default(0.01);
    // 负梯度应使参数增大
    module.set_grad(-1.0);
    optimizer.step(&mut module).unwrap();
    assert!(module.value() > 0.0);
}

#[test]
fn test_adam_reset_clears_state() {
    let mut module = ToyModule::new(1.0);
    let mut optimizer = Adam::new_default(0.1);
    module.set_grad(1.0);
    optimizer.step(&mut module).unwrap();
    let after_first = module.value();

    optimizer.reset();
    module.set_grad(1.0);
    optimizer.step(&mut module).unwrap();
    // 重置后时间步回到1，更新量与首步一致
    assert_abs_diff_eq!(module.value(), after_first - 0.1, epsilon = 1e-3);
}

#[test]
fn test_learning_rate_accessors() {
    let mut optimizer = Adam::new_default(0.1);
    assert_abs_diff_eq!(optimizer.learning_rate(), 0.1, epsilon = 1e-9);
    optimizer.set_learning_rate(0.5);
    assert_abs_diff_eq!(optimizer.learning_rate(), 0.5, epsilon = 1e-9);
}
