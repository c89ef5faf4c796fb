/*
 * @Author       : 老董
 * @Date         : 2026-07-02
 * @Description  : 模型错误类型定义
 */

use thiserror::Error;

/// 分类器相关的错误类型
///
/// 注意：训练发散（损失为无穷或NaN）**不是**错误，
/// 而是训练控制器的一种受控停止（见[`crate::training::StopReason::Diverged`]），
/// 部分训练的网络仍然可用。
#[derive(Error, Debug)]
pub enum ModelError {
    // 生命周期
    #[error("模型尚未训练（须先成功调用fit）")]
    UnfittedModel,
    #[error("模型目录{0}不存在")]
    DirectoryNotFound(String),

    // 超参数与输入校验
    #[error("变点数须在1到3之间，得到{0}")]
    InvalidNumChangePoints(usize),
    #[error("输入特征维度须大于0，得到{0}")]
    InvalidInputDim(usize),
    #[error("输入特征维度不匹配：期望{expected}，得到{actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("样本数不一致：输入{inputs}个，标签{targets}个")]
    SampleCountMismatch { inputs: usize, targets: usize },
    #[error("训练数据为空")]
    EmptyDataset,

    // 持久化
    #[error("模型I/O失败: {0}")]
    Io(#[from] std::io::Error),
    #[error("（反）序列化失败: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("权重文件无效: {0}")]
    InvalidWeightsFile(String),
}
