/*
 * @Author       : 老董
 * @Date         : 2026-07-03
 * @Description  : 损失函数与指标
 *
 * 网络末端是sigmoid单元，损失为二元交叉熵（BCE）。
 * 梯度走sigmoid+BCE的合并形式：对sigmoid前的logit求导得 (p - y) / N，
 * 由调用方直接回传给网络最后一个Dense层。
 */

use ndarray::Array2;

/// 二元交叉熵损失
pub struct BinaryCrossEntropy;

impl BinaryCrossEntropy {
    /// 概率截断下界（对应上界1-ε），避免ln(0)
    pub const EPSILON: f32 = 1e-7;

    /// 计算批平均的BCE损失
    ///
    /// # 参数
    /// - `probs`: 预测概率，形状 (N, 1)
    /// - `targets`: 0/1标签，形状 (N, 1)
    ///
    /// 概率截断到[ε, 1-ε]；若网络前向产出NaN，损失同样为NaN，
    /// 由训练控制器的发散守卫兜底。
    pub fn loss(probs: &Array2<f32>, targets: &Array2<f32>) -> f32 {
        let n = probs.nrows() as f32;
        let mut total = 0.0;
        for (p, y) in probs.iter().zip(targets.iter()) {
            let p = p.clamp(Self::EPSILON, 1.0 - Self::EPSILON);
            total += -(y * p.ln() + (1.0 - y) * (1.0 - p).ln());
        }
        total / n
    }

    /// 损失对sigmoid前logit的梯度：(p - y) / N
    ///
    /// # 返回
    /// 形状 (N, 1)
    pub fn grad_logits(probs: &Array2<f32>, targets: &Array2<f32>) -> Array2<f32> {
        let n = probs.nrows() as f32;
        (probs - targets) / n
    }
}

/// 分类准确率：阈值0.5（含）
///
/// p >= 0.5 判为类1；标签按同样阈值离散化。
pub fn accuracy(probs: &Array2<f32>, targets: &Array2<f32>) -> f32 {
    let n = probs.nrows();
    if n == 0 {
        return 0.0;
    }
    let correct = probs
        .iter()
        .zip(targets.iter())
        .filter(|(p, y)| (**p >= 0.5) == (**y >= 0.5))
        .count();
    correct as f32 / n as f32
}
