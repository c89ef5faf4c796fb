/*
 * @Author       : 老董
 * @Date         : 2026-07-03
 * @Description  : Adam优化器实现
 */

use super::base::{Optimizer, OptimizerState};
use crate::errors::ModelError;
use crate::nn::module::Module;
use ndarray::ArrayD;
use std::collections::HashMap;

/// Adam优化器
///
/// 一、二阶矩估计按参数名保存（参数名在网络内唯一）。
pub struct Adam {
    state: OptimizerState,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    /// 一阶矩估计
    m: HashMap<String, ArrayD<f32>>,
    /// 二阶矩估计
    v: HashMap<String, ArrayD<f32>>,
    /// 时间步
    t: usize,
}

impl Adam {
    /// 创建新的Adam优化器
    pub fn new(learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self {
            state: OptimizerState::new(learning_rate),
            beta1,
            beta2,
            epsilon,
            m: HashMap::new(),
            v: HashMap::new(),
            t: 0,
        }
    }

    /// 使用默认参数创建Adam优化器（β1=0.9, β2=0.999, ε=1e-8）
    pub fn new_default(learning_rate: f32) -> Self {
        Self::new(learning_rate, 0.9, 0.999, 1e-8)
    }

    /// Adam 参数更新的核心逻辑（单个参数）
    fn update_parameter(&mut self, param: &mut crate::nn::Parameter) {
        let gradient = param.grad().clone();
        let name = param.name().to_string();

        // 原地更新一阶矩估计: m = β1 * m + (1 - β1) * g
        let m = self
            .m
            .entry(name.clone())
            .or_insert_with(|| ArrayD::zeros(gradient.raw_dim()));
        *m *= self.beta1;
        *m += &(&gradient * (1.0 - self.beta1));
        // 偏差修正
        let m_hat = &*m / (1.0 - self.beta1.powi(self.t as i32));

        // 原地更新二阶矩估计: v = β2 * v + (1 - β2) * g²
        let v = self
            .v
            .entry(name)
            .or_insert_with(|| ArrayD::zeros(gradient.raw_dim()));
        *v *= self.beta2;
        *v += &(&(&gradient * &gradient) * (1.0 - self.beta2));
        let v_hat = &*v / (1.0 - self.beta2.powi(self.t as i32));

        // 参数更新: θ = θ - α * m_hat / (√v_hat + ε)
        let denominator = v_hat.mapv(f32::sqrt) + self.epsilon;
        let update = m_hat / denominator;
        *param.value_mut() -= &(update * self.state.learning_rate());
    }
}

impl Optimizer for Adam {
    /// 参数更新（使用已计算的梯度）
    fn step(&mut self, module: &mut dyn Module) -> Result<(), ModelError> {
        self.t += 1;
        for param in module.parameters_mut() {
            self.update_parameter(param);
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.m.clear();
        self.v.clear();
        self.t = 0;
    }

    fn learning_rate(&self) -> f32 {
        self.state.learning_rate()
    }

    fn set_learning_rate(&mut self, lr: f32) {
        self.state.set_learning_rate(lr);
    }
}
