/*
 * @Author       : 老董
 * @Date         : 2026-07-03
 * @Description  : 优化器基础trait和辅助结构
 */

use crate::errors::ModelError;
use crate::nn::module::Module;

/// 优化器核心 trait
pub trait Optimizer {
    /// 参数更新（使用已计算的梯度）
    ///
    /// 训练循环：
    /// ```ignore
    /// network.zero_grad();
    /// let probs = network.forward(&x)?;
    /// network.backward(&grad)?;
    /// optimizer.step(&mut network)?; // ← 只更新参数，不做forward/backward
    /// ```
    fn step(&mut self, module: &mut dyn Module) -> Result<(), ModelError>;

    /// 重置累积状态
    fn reset(&mut self);

    /// 获取学习率
    fn learning_rate(&self) -> f32;

    /// 设置学习率
    fn set_learning_rate(&mut self, lr: f32);
}

/// 优化器状态管理（内部实现，不对外暴露）
pub(crate) struct OptimizerState {
    /// 学习率
    learning_rate: f32,
}

impl OptimizerState {
    pub(crate) const fn new(learning_rate: f32) -> Self {
        Self { learning_rate }
    }

    pub(crate) const fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    pub(crate) fn set_learning_rate(&mut self, lr: f32) {
        self.learning_rate = lr;
    }
}
