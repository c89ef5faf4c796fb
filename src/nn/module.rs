/*
 * @Author       : 老董
 * @Date         : 2026-07-02
 * @Description  : Parameter 与 Module trait 定义
 *
 * Parameter是带名字的可训练张量（值+梯度），名字在整个网络内唯一，
 * 同时充当权重文件与优化器动量表的键。
 */

use crate::errors::ModelError;
use ndarray::ArrayD;

/// 可训练参数：命名的值张量与同形状的梯度张量
#[derive(Debug, Clone)]
pub struct Parameter {
    name: String,
    value: ArrayD<f32>,
    grad: ArrayD<f32>,
}

impl Parameter {
    /// 创建新参数，梯度初始化为零
    pub fn new(name: &str, value: ArrayD<f32>) -> Self {
        let grad = ArrayD::zeros(value.raw_dim());
        Self {
            name: name.to_string(),
            value,
            grad,
        }
    }

    /// 参数名（网络内唯一）
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 参数值
    pub fn value(&self) -> &ArrayD<f32> {
        &self.value
    }

    /// 参数值（可变）
    pub fn value_mut(&mut self) -> &mut ArrayD<f32> {
        &mut self.value
    }

    /// 覆盖参数值
    ///
    /// 形状固定：构建后不允许改变形状，形状不符视为权重文件无效。
    pub fn set_value(&mut self, value: ArrayD<f32>) -> Result<(), ModelError> {
        if value.shape() != self.value.shape() {
            return Err(ModelError::InvalidWeightsFile(format!(
                "参数{}形状不匹配：期望{:?}，得到{:?}",
                self.name,
                self.value.shape(),
                value.shape()
            )));
        }
        self.value = value;
        Ok(())
    }

    /// 累积的梯度
    pub fn grad(&self) -> &ArrayD<f32> {
        &self.grad
    }

    /// 累积的梯度（可变）
    pub fn grad_mut(&mut self) -> &mut ArrayD<f32> {
        &mut self.grad
    }

    /// 梯度清零
    pub fn zero_grad(&mut self) {
        self.grad.fill(0.0);
    }

    /// 元素个数
    pub fn num_elements(&self) -> usize {
        self.value.len()
    }
}

/// 模块 trait
///
/// # 设计原则
/// - `forward()` **不是** trait 方法（签名各异）
/// - `new()` **不是** trait 方法（参数各异）
/// - `parameters()` 返回扁平的参数列表（签名一致，放入 trait）
///
/// 用于：
/// - 优化器需要知道要更新哪些参数
/// - 序列化/保存模型参数
/// - 统计参数数量
pub trait Module {
    /// 获取所有可训练参数
    fn parameters(&self) -> Vec<&Parameter>;

    /// 获取所有可训练参数（可变，供优化器更新）
    fn parameters_mut(&mut self) -> Vec<&mut Parameter>;

    /// 获取参数元素总量
    fn num_params(&self) -> usize {
        self.parameters().iter().map(|p| p.num_elements()).sum()
    }
}
