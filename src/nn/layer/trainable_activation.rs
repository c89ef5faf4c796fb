/*
 * @Author       : 老董
 * @Date         : 2026-07-05
 * @Description  : TrainableActivation - 可训练的分段激活层
 *
 * 每个特征独立学习K个变点（change-point）：变点位置`locations`、
 * 变点目标值`location_values`，以及控制软分配尖锐程度的`lambda_`。
 * 输出是按软分配权重加权的目标值之和，再经tanh压到(-1, 1)。
 *
 * 逐特征计算（特征间互不混合）：
 * 1. 特征值到各变点位置的平方距离
 * 2. 乘以`-lambda_`后取指数 → K个未归一化亲和度
 * 3. 对K个亲和度做softmax → 软分配权重（和为1）
 * 4. 输出 = tanh(Σ_k 权重_k · 目标值_k)
 *
 * `lambda_`很大时softmax趋于硬性最近变点选择；趋于0时趋于对目标值
 * 的均匀平均。
 */

use crate::errors::ModelError;
use crate::nn::init;
use crate::nn::module::{Module, Parameter};
use ndarray::{Array2, Array3, Ix3};
use rand::rngs::StdRng;

/// 变点数的合法范围
pub const NUM_CPS_RANGE: std::ops::RangeInclusive<usize> = 1..=3;

/// TrainableActivation 的配置对象
///
/// 两段式构建：先以变点数K创建配置（此处校验K的范围），
/// 再以已知的输入宽度D调用[`initialize`](Self::initialize)创建参数张量。
/// 参数形状自此固定，不再改变。
#[derive(Debug, Clone, Copy)]
pub struct TrainableActivationConfig {
    num_cps: usize,
}

impl TrainableActivationConfig {
    /// 创建配置
    ///
    /// # 参数
    /// - `num_cps`: 变点数K，合法范围 1 <= K <= 3
    pub fn new(num_cps: usize) -> Result<Self, ModelError> {
        if !NUM_CPS_RANGE.contains(&num_cps) {
            return Err(ModelError::InvalidNumChangePoints(num_cps));
        }
        Ok(Self { num_cps })
    }

    /// 获取变点数K
    pub const fn num_cps(&self) -> usize {
        self.num_cps
    }

    /// 按输入宽度D实例化激活层，创建三个参数张量
    ///
    /// # 参数
    /// - `input_dim`: 输入特征宽度D
    /// - `name`: 层名称前缀
    /// - `rng`: 调用方持有的随机数生成器
    ///
    /// 三个张量均按标准正态分布逐元素独立初始化：
    /// - `{name}_locations`: (1, D, K)
    /// - `{name}_location_values`: (1, D, K)
    /// - `{name}_lambda`: (1, D, 1)
    pub fn initialize(
        &self,
        input_dim: usize,
        name: &str,
        rng: &mut StdRng,
    ) -> TrainableActivation {
        let cp_shape = [1, input_dim, self.num_cps];
        let locations = Parameter::new(
            &format!("{name}_locations"),
            init::standard_normal(&cp_shape, rng),
        );
        let location_values = Parameter::new(
            &format!("{name}_location_values"),
            init::standard_normal(&cp_shape, rng),
        );
        let lambda_ = Parameter::new(
            &format!("{name}_lambda"),
            init::standard_normal(&[1, input_dim, 1], rng),
        );
        TrainableActivation {
            num_cps: self.num_cps,
            dim: input_dim,
            locations,
            location_values,
            lambda_,
            cache: None,
        }
    }
}

/// 前向传播的中间量缓存（反向传播用）
struct ForwardCache {
    /// 输入 (N, D)
    input: Array2<f32>,
    /// 平方距离 (N, D, K)
    sq_diff: Array3<f32>,
    /// 未归一化亲和度 exp(-λ·sq_diff) (N, D, K)
    affinities: Array3<f32>,
    /// 软分配权重 softmax(affinities) (N, D, K)
    probs: Array3<f32>,
    /// tanh后的输出 (N, D)
    output: Array2<f32>,
}

/// 可训练的分段激活层
///
/// 逐特征的逐元素变换（宽度D进、宽度D出），不做跨特征混合。
pub struct TrainableActivation {
    num_cps: usize,
    dim: usize,
    /// 变点位置 (1, D, K)
    locations: Parameter,
    /// 变点目标值 (1, D, K)
    location_values: Parameter,
    /// 逐特征软分配温度 (1, D, 1)
    lambda_: Parameter,
    cache: Option<ForwardCache>,
}

impl TrainableActivation {
    /// 前向传播（训练用：缓存中间量以供反向传播）
    ///
    /// # 参数
    /// - `x`: 输入，形状 (N, D)
    ///
    /// # 返回
    /// 输出，形状 (N, D)，各元素落在(-1, 1)
    pub fn forward(&mut self, x: &Array2<f32>) -> Result<Array2<f32>, ModelError> {
        let (output, cache) = self.compute(x)?;
        self.cache = Some(cache);
        Ok(output)
    }

    /// 前向传播（推理用：不缓存、不可变）
    pub fn infer(&self, x: &Array2<f32>) -> Result<Array2<f32>, ModelError> {
        let (output, _) = self.compute(x)?;
        Ok(output)
    }

    fn compute(&self, x: &Array2<f32>) -> Result<(Array2<f32>, ForwardCache), ModelError> {
        if x.ncols() != self.dim {
            return Err(ModelError::DimensionMismatch {
                expected: self.dim,
                actual: x.ncols(),
            });
        }
        let (n, d, k) = (x.nrows(), self.dim, self.num_cps);
        let loc = self
            .locations
            .value()
            .view()
            .into_dimensionality::<Ix3>()
            .expect("locations须为三维");
        let vals = self
            .location_values
            .value()
            .view()
            .into_dimensionality::<Ix3>()
            .expect("location_values须为三维");
        let lam = self
            .lambda_
            .value()
            .view()
            .into_dimensionality::<Ix3>()
            .expect("lambda须为三维");

        let mut sq_diff = Array3::<f32>::zeros((n, d, k));
        let mut affinities = Array3::<f32>::zeros((n, d, k));
        let mut probs = Array3::<f32>::zeros((n, d, k));
        let mut pre_tanh = Array2::<f32>::zeros((n, d));

        for i in 0..n {
            for j in 0..d {
                let lambda_j = lam[[0, j, 0]];
                // 1/2. 平方距离与亲和度
                let mut max_affinity = f32::NEG_INFINITY;
                for c in 0..k {
                    let diff = x[[i, j]] - loc[[0, j, c]];
                    let sq = diff * diff;
                    sq_diff[[i, j, c]] = sq;
                    let affinity = (-lambda_j * sq).exp();
                    affinities[[i, j, c]] = affinity;
                    max_affinity = max_affinity.max(affinity);
                }
                // 3. 对亲和度做softmax（减最大值保证数值稳定）
                let mut z_sum = 0.0;
                for c in 0..k {
                    let e = (affinities[[i, j, c]] - max_affinity).exp();
                    probs[[i, j, c]] = e;
                    z_sum += e;
                }
                // 4. 软分配加权的目标值之和
                let mut weighted = 0.0;
                for c in 0..k {
                    probs[[i, j, c]] /= z_sum;
                    weighted += vals[[0, j, c]] * probs[[i, j, c]];
                }
                pre_tanh[[i, j]] = weighted;
            }
        }

        let output = pre_tanh.mapv(f32::tanh);
        let cache = ForwardCache {
            input: x.clone(),
            sq_diff,
            affinities,
            probs,
            output: output.clone(),
        };
        Ok((output, cache))
    }

    /// 反向传播
    ///
    /// 按链式法则穿过 tanh → 加权和 → softmax → exp → 平方距离，
    /// 为三个参数张量累积梯度，并返回对输入的梯度。
    ///
    /// # 参数
    /// - `grad_output`: 损失对本层输出的梯度，形状 (N, D)
    ///
    /// # 返回
    /// 损失对本层输入的梯度，形状 (N, D)
    pub fn backward(&mut self, grad_output: &Array2<f32>) -> Result<Array2<f32>, ModelError> {
        let cache = self
            .cache
            .as_ref()
            .expect("TrainableActivation::backward须在forward之后调用");
        let (n, d, k) = (cache.input.nrows(), self.dim, self.num_cps);

        let loc = self
            .locations
            .value()
            .view()
            .into_dimensionality::<Ix3>()
            .expect("locations须为三维");
        let vals = self
            .location_values
            .value()
            .view()
            .into_dimensionality::<Ix3>()
            .expect("location_values须为三维");
        let lam = self
            .lambda_
            .value()
            .view()
            .into_dimensionality::<Ix3>()
            .expect("lambda须为三维");

        let mut grad_loc = Array3::<f32>::zeros((1, d, k));
        let mut grad_vals = Array3::<f32>::zeros((1, d, k));
        let mut grad_lam = Array3::<f32>::zeros((1, d, 1));
        let mut grad_input = Array2::<f32>::zeros((n, d));

        // dp缓冲区（K<=3）
        let mut dp = [0.0f32; 3];

        for i in 0..n {
            for j in 0..d {
                let y = cache.output[[i, j]];
                // tanh'(s) = 1 - tanh(s)²
                let ds = grad_output[[i, j]] * (1.0 - y * y);

                // 加权和：dv_k = ds·p_k；dp_k = ds·v_k
                let mut dot = 0.0;
                for c in 0..k {
                    let p = cache.probs[[i, j, c]];
                    grad_vals[[0, j, c]] += ds * p;
                    dp[c] = ds * vals[[0, j, c]];
                    dot += dp[c] * p;
                }

                let lambda_j = lam[[0, j, 0]];
                for c in 0..k {
                    let p = cache.probs[[i, j, c]];
                    // softmax雅可比：de_c = p_c·(dp_c - Σ_m dp_m·p_m)
                    let d_affinity = p * (dp[c] - dot);
                    // exp：d(-λ·sq) = de_c·e_c
                    let d_exponent = d_affinity * cache.affinities[[i, j, c]];
                    grad_lam[[0, j, 0]] += -cache.sq_diff[[i, j, c]] * d_exponent;
                    let d_sq = -lambda_j * d_exponent;
                    // 平方距离：d(diff²) = 2·diff
                    let diff = cache.input[[i, j]] - loc[[0, j, c]];
                    let d_diff = 2.0 * diff * d_sq;
                    grad_loc[[0, j, c]] += -d_diff;
                    grad_input[[i, j]] += d_diff;
                }
            }
        }

        let grad_loc = grad_loc.into_dyn();
        let grad_vals = grad_vals.into_dyn();
        let grad_lam = grad_lam.into_dyn();
        *self.locations.grad_mut() += &grad_loc;
        *self.location_values.grad_mut() += &grad_vals;
        *self.lambda_.grad_mut() += &grad_lam;
        Ok(grad_input)
    }

    /// 获取变点数K
    pub fn num_cps(&self) -> usize {
        self.num_cps
    }

    /// 获取特征宽度D
    pub fn dim(&self) -> usize {
        self.dim
    }
}

impl Module for TrainableActivation {
    fn parameters(&self) -> Vec<&Parameter> {
        vec![&self.locations, &self.location_values, &self.lambda_]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        vec![
            &mut self.locations,
            &mut self.location_values,
            &mut self.lambda_,
        ]
    }
}
