/*
 * @Author       : 老董
 * @Date         : 2026-07-03
 * @Description  : 优化器模块
 */

mod adam;
mod base;

pub use adam::Adam;
pub use base::Optimizer;
