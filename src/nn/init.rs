/*
 * @Author       : 老董
 * @Date         : 2026-07-02
 * @Description  : 参数初始化（正态分布采样，Box-Muller实现）
 *
 * 随机数生成器由调用方注入：同一个种子驱动全部初始化与打乱顺序，
 * 保证重复训练可复现。
 */

use ndarray::{ArrayD, IxDyn};
use rand::Rng;
use rand::rngs::StdRng;

/// 按给定形状采样正态分布N(mean, std_dev²)
///
/// # 参数
/// - `mean`: 均值
/// - `std_dev`: 标准差
/// - `shape`: 目标形状
/// - `rng`: 调用方持有的随机数生成器
pub fn normal(mean: f32, std_dev: f32, shape: &[usize], rng: &mut StdRng) -> ArrayD<f32> {
    let data = (0..shape.iter().product::<usize>())
        .map(|_| {
            // u1取(0, 1]，避免ln(0)
            let u1: f32 = 1.0 - rng.gen_range(0.0f32..1.0);
            let u2: f32 = rng.gen_range(0.0f32..1.0);
            let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos();
            mean + std_dev * z0
        })
        .collect::<Vec<_>>();
    ArrayD::from_shape_vec(IxDyn(shape), data).expect("初始化形状与数据长度不一致")
}

/// 标准正态分布N(0, 1)采样
pub fn standard_normal(shape: &[usize], rng: &mut StdRng) -> ArrayD<f32> {
    normal(0.0, 1.0, shape, rng)
}

/// Kaiming初始化：N(0, 2/fan_in)，用于Dense层权重
pub fn kaiming(shape: &[usize], fan_in: usize, rng: &mut StdRng) -> ArrayD<f32> {
    let std_dev = (2.0 / fan_in as f32).sqrt();
    normal(0.0, std_dev, shape, rng)
}
