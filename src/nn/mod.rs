/*
 * @Author       : 老董
 * @Date         : 2026-07-02
 * @Description  : 神经网络基础件：参数/模块抽象、层、优化器、损失与初始化
 */

pub mod criterion;
pub mod init;
pub mod layer;
mod module;
pub mod optimizer;

pub use layer::{Dense, TrainableActivation, TrainableActivationConfig};
pub use module::{Module, Parameter};
pub use optimizer::{Adam, Optimizer};

#[cfg(test)]
mod tests;
