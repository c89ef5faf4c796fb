/*
 * @Author       : 老董
 * @Date         : 2026-07-02
 * @Description  : Layer 模块 - 带显式前向/反向传播的网络层
 */

mod dense;
mod trainable_activation;

pub use dense::Dense;
pub use trainable_activation::{TrainableActivation, TrainableActivationConfig};
