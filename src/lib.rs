//! # Trainact
//!
//! `trainact`是一个基于可训练分段激活函数（trainable activation function）的
//! 二分类器：每个特征学习自己的K个变点（change-point）位置与目标值，
//! 通过软分配（softmax归一化的亲和度）拼出逐特征的非线性响应曲线，
//! 以此替代固定形状的激活函数。
//!
//! 模块划分：
//! - [`nn`]：层（Dense / TrainableActivation）、优化器（Adam）、损失与初始化
//! - [`data`]：数据集与批量加载（打乱、验证集切分）
//! - [`network`]：固定拓扑的分类网络
//! - [`training`]：训练控制器（早停、发散守卫、周期日志）
//! - [`classifier`]：面向使用者的分类器门面（fit/predict/evaluate/save/load）

pub mod classifier;
pub mod data;
pub mod errors;
pub mod network;
pub mod nn;
pub mod training;

pub use classifier::{
    Classifier, Hyperparameters, evaluate_classifier, load_classifier, predict_with_classifier,
    save_classifier, save_training_history, train_classifier,
};
pub use errors::ModelError;
pub use network::ClassifierNetwork;
pub use training::{
    COST_THRESHOLD, History, LogFacade, StopReason, TrainingController, TrainingLogger,
    TrainingOptions, TrainingOutcome,
};
