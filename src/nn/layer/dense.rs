/*
 * @Author       : 老董
 * @Date         : 2026-07-02
 * @Description  : Dense (全连接) 层
 *
 * 计算：`output = x @ W + b`
 *
 * # 输入/输出形状
 * - 输入：[batch_size, in_features]
 * - 输出：[batch_size, out_features]
 */

use crate::errors::ModelError;
use crate::nn::init;
use crate::nn::module::{Module, Parameter};
use ndarray::{Array2, ArrayD, Axis, Ix2, IxDyn};
use rand::rngs::StdRng;

/// Dense (全连接) 层
///
/// 前向传播缓存输入，反向传播据此累积`dW = xᵀ·g`、`db = Σ_行 g`，
/// 并返回对输入的梯度`dx = g·Wᵀ`。
pub struct Dense {
    /// 权重参数 [in_features, out_features]
    w: Parameter,
    /// 偏置参数 [1, out_features]
    b: Parameter,
    /// 输入特征维度
    in_features: usize,
    /// 输出特征维度
    out_features: usize,
    /// 前向传播缓存的输入（反向传播用）
    input_cache: Option<Array2<f32>>,
}

impl Dense {
    /// 创建新的 Dense 层
    ///
    /// # 参数
    /// - `in_features`: 输入特征维度
    /// - `out_features`: 输出特征维度
    /// - `name`: 层名称前缀（参数命名为`{name}_W`与`{name}_b`）
    /// - `rng`: 调用方持有的随机数生成器
    ///
    /// 权重：Kaiming初始化；偏置：零初始化。
    pub fn new(in_features: usize, out_features: usize, name: &str, rng: &mut StdRng) -> Self {
        let w = Parameter::new(
            &format!("{name}_W"),
            init::kaiming(&[in_features, out_features], in_features, rng),
        );
        let b = Parameter::new(&format!("{name}_b"), ArrayD::zeros(IxDyn(&[1, out_features])));
        Self {
            w,
            b,
            in_features,
            out_features,
            input_cache: None,
        }
    }

    /// 前向传播（训练用：缓存输入以供反向传播）
    ///
    /// # 参数
    /// - `x`: 输入，形状 [batch_size, in_features]
    ///
    /// # 返回
    /// 输出，形状 [batch_size, out_features]
    pub fn forward(&mut self, x: &Array2<f32>) -> Result<Array2<f32>, ModelError> {
        let output = self.infer(x)?;
        self.input_cache = Some(x.clone());
        Ok(output)
    }

    /// 前向传播（推理用：不缓存、不可变）
    pub fn infer(&self, x: &Array2<f32>) -> Result<Array2<f32>, ModelError> {
        if x.ncols() != self.in_features {
            return Err(ModelError::DimensionMismatch {
                expected: self.in_features,
                actual: x.ncols(),
            });
        }
        let w = self
            .w
            .value()
            .view()
            .into_dimensionality::<Ix2>()
            .expect("Dense权重须为二维");
        let b = self
            .b
            .value()
            .view()
            .into_dimensionality::<Ix2>()
            .expect("Dense偏置须为二维");
        let mut output = x.dot(&w);
        // bias广播：[1, out] 加到每一行
        output += &b;
        Ok(output)
    }

    /// 反向传播
    ///
    /// # 参数
    /// - `grad_output`: 损失对本层输出的梯度，形状 [batch_size, out_features]
    ///
    /// # 返回
    /// 损失对本层输入的梯度，形状 [batch_size, in_features]
    pub fn backward(&mut self, grad_output: &Array2<f32>) -> Result<Array2<f32>, ModelError> {
        let x = self
            .input_cache
            .as_ref()
            .expect("Dense::backward须在forward之后调用");

        let dw = x.t().dot(grad_output).into_dyn();
        let db = grad_output
            .sum_axis(Axis(0))
            .insert_axis(Axis(0))
            .into_dyn();
        *self.w.grad_mut() += &dw;
        *self.b.grad_mut() += &db;

        let w = self
            .w
            .value()
            .view()
            .into_dimensionality::<Ix2>()
            .expect("Dense权重须为二维");
        Ok(grad_output.dot(&w.t()))
    }

    /// 获取输入特征维度
    pub fn in_features(&self) -> usize {
        self.in_features
    }

    /// 获取输出特征维度
    pub fn out_features(&self) -> usize {
        self.out_features
    }
}

impl Module for Dense {
    fn parameters(&self) -> Vec<&Parameter> {
        vec![&self.w, &self.b]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        vec![&mut self.w, &mut self.b]
    }
}
