/*
 * @Author       : 老董
 * @Date         : 2026-07-08
 * @Description  : TrainingController - 训练控制器（状态机）
 *
 * 每个epoch结束后按固定顺序评估三件事（单一状态机，
 * 避免多个回调之间的顺序歧义）：
 * 1. 发散守卫：训练损失等于发散哨兵值（+∞）或为NaN → 立即硬停
 *    （警告日志，优先级最高，可覆盖早停计数）
 * 2. 早停记账：被监控的损失（样本数>=300时为验证损失，否则为训练损失）
 *    须至少改善min_delta才重置耐心计数；连续patience个epoch无改善 → 停
 * 3. 周期日志：epoch序号能被log_period整除时，输出一条包含全部指标
 *    （四舍五入到4位小数）的信息日志
 *
 * Stopped为终态，不支持恢复训练。
 */

use crate::data::{DataLoader, TensorDataset};
use crate::errors::ModelError;
use crate::network::ClassifierNetwork;
use crate::nn::criterion::{self, BinaryCrossEntropy};
use crate::nn::{Adam, Optimizer};
use rand::rngs::StdRng;
use std::collections::BTreeMap;

/// 发散哨兵值：训练损失到达该值视为发散
pub const COST_THRESHOLD: f32 = f32::INFINITY;

/// 训练停止原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// 损失发散（哨兵值或NaN），硬停
    Diverged,
    /// 被监控的损失连续patience个epoch无足够改善
    Plateaued,
    /// 跑满最大epoch数
    MaxEpochs,
}

/// 训练历史：指标名 -> 逐epoch的值
///
/// 指标按**名字**索引（loss / accuracy / val_loss / val_accuracy），
/// 不依赖任何返回顺序。
pub type History = BTreeMap<String, Vec<f32>>;

/// 注入式日志能力
///
/// 生命周期随Classifier/TrainingController实例，不依赖全局单例。
pub trait TrainingLogger {
    /// 信息日志
    fn info(&self, message: &str);
    /// 警告日志
    fn warn(&self, message: &str);
}

/// 默认日志实现：转发到`log`门面
pub struct LogFacade;

impl TrainingLogger for LogFacade {
    fn info(&self, message: &str) {
        log::info!("{message}");
    }

    fn warn(&self, message: &str) {
        log::warn!("{message}");
    }
}

/// 训练选项
#[derive(Debug, Clone)]
pub struct TrainingOptions {
    /// 批大小
    pub batch_size: usize,
    /// 最大epoch数
    pub max_epochs: usize,
    /// 早停耐心（连续无改善的epoch数）
    pub patience: usize,
    /// 视为改善的最小损失降幅
    pub min_delta: f32,
    /// 周期日志间隔（每log_period个epoch一条）
    pub log_period: usize,
    /// 验证集比例（尾部切分）
    pub validation_split: f32,
    /// 启用验证集切分的最小样本数
    pub validation_threshold: usize,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            batch_size: 100,
            max_epochs: 750,
            patience: 20,
            min_delta: 1e-3,
            log_period: 10,
            validation_split: 0.15,
            validation_threshold: 300,
        }
    }
}

/// 训练结果
pub struct TrainingOutcome {
    /// 停止原因
    pub reason: StopReason,
    /// 实际跑完的epoch数
    pub epochs_run: usize,
    /// 训练历史
    pub history: History,
}

/// 每epoch一次的停止判定核心（纯状态机，便于单测）
pub(crate) struct EpochMonitor {
    patience: usize,
    min_delta: f32,
    best: f32,
    wait: usize,
}

impl EpochMonitor {
    pub(crate) fn new(patience: usize, min_delta: f32) -> Self {
        Self {
            patience,
            min_delta,
            best: f32::INFINITY,
            wait: 0,
        }
    }

    /// 观察一个epoch的损失，返回是否应停止
    ///
    /// # 参数
    /// - `train_loss`: 本epoch的训练损失（发散守卫只看它）
    /// - `monitored_loss`: 早停监控的损失（有验证集时为验证损失）
    pub(crate) fn observe(&mut self, train_loss: f32, monitored_loss: f32) -> Option<StopReason> {
        // 1. 发散守卫优先，可覆盖早停计数
        #[allow(clippy::float_cmp)]
        if train_loss == COST_THRESHOLD || train_loss.is_nan() {
            return Some(StopReason::Diverged);
        }
        // 2. 早停记账（NaN的监控值不算改善，走耐心计数）
        if self.best - monitored_loss >= self.min_delta {
            self.best = monitored_loss;
            self.wait = 0;
        } else {
            self.wait += 1;
            if self.wait >= self.patience {
                return Some(StopReason::Plateaued);
            }
        }
        None
    }
}

/// 训练控制器
///
/// 驱动fit循环直到终态：收敛停滞（Plateaued）、发散（Diverged）
/// 或跑满最大epoch数（MaxEpochs）。每个epoch都重新打乱样本顺序。
pub struct TrainingController<'a> {
    options: TrainingOptions,
    logger: &'a dyn TrainingLogger,
}

impl<'a> TrainingController<'a> {
    /// 创建训练控制器
    pub fn new(options: TrainingOptions, logger: &'a dyn TrainingLogger) -> Self {
        Self { options, logger }
    }

    /// 同步阻塞地训练到终态
    ///
    /// # 参数
    /// - `network`: 待训练的网络（就地更新参数）
    /// - `optimizer`: 优化器
    /// - `dataset`: 训练数据
    /// - `rng`: 调用方持有的随机数生成器（决定每epoch的打乱顺序）
    pub fn fit(
        &self,
        network: &mut ClassifierNetwork,
        optimizer: &mut Adam,
        dataset: &TensorDataset,
        rng: &mut StdRng,
    ) -> Result<TrainingOutcome, ModelError> {
        if dataset.is_empty() {
            return Err(ModelError::EmptyDataset);
        }

        // 样本足够多时尾部切出验证集，否则监控训练损失
        let (train_set, val_set) = if dataset.len() >= self.options.validation_threshold {
            let (train, val) = dataset.split_tail(self.options.validation_split);
            (train, Some(val))
        } else {
            (dataset.clone(), None)
        };

        let loader = DataLoader::new(self.options.batch_size, true);
        let mut monitor = EpochMonitor::new(self.options.patience, self.options.min_delta);
        let mut history: History = BTreeMap::new();
        let mut reason = StopReason::MaxEpochs;
        let mut epochs_run = 0;

        for epoch in 0..self.options.max_epochs {
            // 批次循环：forward -> 损失 -> backward -> step
            let mut loss_sum = 0.0;
            let mut correct_sum = 0.0;
            let mut seen = 0.0;
            for (batch_x, batch_y) in loader.batches(&train_set, rng) {
                let probs = network.forward(&batch_x)?;
                let batch_len = batch_x.nrows() as f32;
                loss_sum += BinaryCrossEntropy::loss(&probs, &batch_y) * batch_len;
                correct_sum += criterion::accuracy(&probs, &batch_y) * batch_len;
                seen += batch_len;

                let grad = BinaryCrossEntropy::grad_logits(&probs, &batch_y);
                network.zero_grad();
                network.backward(&grad)?;
                optimizer.step(network)?;
            }
            let train_loss = loss_sum / seen;
            let train_accuracy = correct_sum / seen;

            let mut metrics: Vec<(&str, f32)> =
                vec![("loss", train_loss), ("accuracy", train_accuracy)];
            if let Some(val) = &val_set {
                let probs = network.predict(val.features())?;
                metrics.push(("val_loss", BinaryCrossEntropy::loss(&probs, val.labels())));
                metrics.push(("val_accuracy", criterion::accuracy(&probs, val.labels())));
            }
            for (name, value) in &metrics {
                history.entry((*name).to_string()).or_default().push(*value);
            }
            epochs_run = epoch + 1;

            // 被监控的损失：有验证集时为val_loss，否则为训练损失（按名查找）
            let monitored_key = if val_set.is_some() { "val_loss" } else { "loss" };
            let monitored_loss = metrics
                .iter()
                .find(|(name, _)| *name == monitored_key)
                .map(|(_, value)| *value)
                .expect("监控指标必然存在");

            match monitor.observe(train_loss, monitored_loss) {
                Some(StopReason::Diverged) => {
                    self.logger
                        .warn(&format!("损失为{train_loss}，停止训练！"));
                    reason = StopReason::Diverged;
                    break;
                }
                Some(stop) => {
                    reason = stop;
                    break;
                }
                None => {}
            }

            // 周期日志（发散/早停的epoch不再输出）
            if epoch % self.options.log_period == 0 {
                let metrics_text = metrics
                    .iter()
                    .map(|(name, value)| format!("{name}: {value:.4}"))
                    .collect::<Vec<_>>()
                    .join("  ");
                self.logger
                    .info(&format!("轮次: {epoch}, 指标: {metrics_text}"));
            }
        }

        Ok(TrainingOutcome {
            reason,
            epochs_run,
            history,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitor_diverged_on_nan() {
        let mut monitor = EpochMonitor::new(20, 1e-3);
        assert_eq!(monitor.observe(0.8, 0.8), None);
        assert_eq!(monitor.observe(f32::NAN, 0.7), Some(StopReason::Diverged));
    }

    #[test]
    fn test_monitor_diverged_on_sentinel() {
        let mut monitor = EpochMonitor::new(20, 1e-3);
        assert_eq!(
            monitor.observe(COST_THRESHOLD, 0.5),
            Some(StopReason::Diverged)
        );
    }

    #[test]
    fn test_monitor_plateau_after_patience() {
        let mut monitor = EpochMonitor::new(3, 1e-3);
        // 首个epoch：INF -> 0.5算改善
        assert_eq!(monitor.observe(0.5, 0.5), None);
        // 连续3个epoch无足够改善
        assert_eq!(monitor.observe(0.5, 0.5), None);
        assert_eq!(monitor.observe(0.5, 0.4999), None);
        assert_eq!(monitor.observe(0.5, 0.5), Some(StopReason::Plateaued));
    }

    #[test]
    fn test_monitor_improvement_resets_wait() {
        let mut monitor = EpochMonitor::new(2, 1e-3);
        assert_eq!(monitor.observe(0.5, 0.5), None);
        assert_eq!(monitor.observe(0.5, 0.5), None); // wait=1
        assert_eq!(monitor.observe(0.4, 0.4), None); // 改善，wait清零
        assert_eq!(monitor.observe(0.4, 0.4), None); // wait=1
        assert_eq!(monitor.observe(0.4, 0.4), Some(StopReason::Plateaued));
    }

    #[test]
    fn test_monitor_small_improvement_not_enough() {
        let mut monitor = EpochMonitor::new(2, 1e-3);
        assert_eq!(monitor.observe(0.5, 0.5), None);
        // 改善量5e-4 < min_delta=1e-3，不算改善
        assert_eq!(monitor.observe(0.4995, 0.4995), None);
        assert_eq!(monitor.observe(0.499, 0.499), Some(StopReason::Plateaued));
    }
}
