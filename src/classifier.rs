/*
 * @Author       : 老董
 * @Date         : 2026-07-10
 * @Description  : Classifier - 二分类器门面
 *
 * 持有超参数（D可推迟到首次fit时确定，之后冻结）与训练好的网络，
 * 对外提供fit/predict/predict_proba/evaluate/save/load/summary。
 *
 * 生命周期：未训练（network=None）→ 已训练（network=Some，fit后）
 * → 可选地持久化/恢复。不支持增量训练：fit总是重建全新网络。
 *
 * # 持久化目录布局
 * - `model_params`: 超参数键值blob（JSON：D、lr、num_cps）
 * - `model_wts`: 网络权重（二进制，按名存储）
 * - `history.json`: 训练历史（指标名 -> 逐epoch值，仅fit过才写）
 */

use crate::data::TensorDataset;
use crate::errors::ModelError;
use crate::network::ClassifierNetwork;
use crate::nn::Adam;
use crate::nn::layer::TrainableActivationConfig;
use crate::training::{
    History, LogFacade, TrainingController, TrainingLogger, TrainingOptions,
};
use ndarray::{Array1, Array2, Axis};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// 模型名称
pub const MODEL_NAME: &str =
    "ANN with Trainable Activation Function Binary Classifier - ndarray-CPU";
/// 超参数blob文件名
pub const MODEL_PARAMS_FNAME: &str = "model_params";
/// 网络权重文件名
pub const MODEL_WTS_FNAME: &str = "model_wts";
/// 训练历史文件名
pub const HISTORY_FNAME: &str = "history.json";

/// 超参数集合
///
/// 作为不透明的键值blob持久化（JSON）。D可缺省（首次fit时从数据推断）。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hyperparameters {
    /// 输入特征宽度（None表示推迟到fit时确定）
    #[serde(rename = "D")]
    pub d: Option<usize>,
    /// 学习率
    pub lr: f32,
    /// 每个特征的变点数K（1..=3）
    pub num_cps: usize,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            d: None,
            lr: 1e-3,
            num_cps: 2,
        }
    }
}

/// 持久化的超参数blob（保存时D必然已知）
#[derive(Serialize, Deserialize)]
struct ModelParams {
    #[serde(rename = "D")]
    d: usize,
    lr: f32,
    num_cps: usize,
}

/// 二分类器门面
///
/// 单个实例上的fit/predict不支持并发调用，调用方须串行访问
/// （`&mut self`的fit天然强制这一点）。
pub struct Classifier {
    d: Option<usize>,
    lr: f32,
    num_cps: usize,
    network: Option<ClassifierNetwork>,
    history: Option<History>,
    logger: Box<dyn TrainingLogger>,
}

impl Classifier {
    /// 每次fit固定使用的随机种子：同一份数据与超参数重复fit结果可复现
    /// （同一个种子同时决定权重初始化与每epoch的打乱顺序）
    const SEED: u64 = 0;

    /// 构建新的二分类器
    ///
    /// # 参数
    /// - `d`: 输入特征宽度，None表示fit时从数据推断
    /// - `lr`: 学习率（原始默认1e-3）
    /// - `num_cps`: 变点数K，合法范围 1 <= K <= 3（默认2）
    pub fn new(d: Option<usize>, lr: f32, num_cps: usize) -> Result<Self, ModelError> {
        // 提前校验K范围
        TrainableActivationConfig::new(num_cps)?;
        Ok(Self {
            d,
            lr,
            num_cps,
            network: None,
            history: None,
            logger: Box::new(LogFacade),
        })
    }

    /// 从超参数集合构建
    pub fn from_hyperparameters(hp: &Hyperparameters) -> Result<Self, ModelError> {
        Self::new(hp.d, hp.lr, hp.num_cps)
    }

    /// 注入日志能力（默认转发到`log`门面）
    pub fn with_logger(mut self, logger: Box<dyn TrainingLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// 输入特征宽度D（fit前可能未知）
    pub fn d(&self) -> Option<usize> {
        self.d
    }

    /// 学习率
    pub fn lr(&self) -> f32 {
        self.lr
    }

    /// 变点数K
    pub fn num_cps(&self) -> usize {
        self.num_cps
    }

    /// 是否已训练
    pub fn is_fitted(&self) -> bool {
        self.network.is_some()
    }

    /// 最近一次fit的训练历史
    pub fn history(&self) -> Option<&History> {
        self.history.as_ref()
    }

    /// 以默认训练选项（批大小100、最多750个epoch）拟合
    ///
    /// # 参数
    /// - `inputs`: 训练特征，形状 (N, D)
    /// - `targets`: 0/1标签，长度N
    pub fn fit(&mut self, inputs: &Array2<f32>, targets: &Array1<f32>) -> Result<(), ModelError> {
        self.fit_with(inputs, targets, &TrainingOptions::default())
    }

    /// 以指定训练选项拟合
    ///
    /// 从输入宽度推断D并冻结，丢弃任何既有网络重新构建，
    /// 固定种子后交给训练控制器同步跑到终态。
    pub fn fit_with(
        &mut self,
        inputs: &Array2<f32>,
        targets: &Array1<f32>,
        options: &TrainingOptions,
    ) -> Result<(), ModelError> {
        if inputs.nrows() == 0 {
            return Err(ModelError::EmptyDataset);
        }
        if inputs.nrows() != targets.len() {
            return Err(ModelError::SampleCountMismatch {
                inputs: inputs.nrows(),
                targets: targets.len(),
            });
        }
        let d = inputs.ncols();
        if d == 0 {
            return Err(ModelError::InvalidInputDim(0));
        }

        self.logger.info("计算后端: ndarray (CPU)");

        // 固定种子保证可复现
        let mut rng = StdRng::seed_from_u64(Self::SEED);
        let mut network = ClassifierNetwork::new(d, self.num_cps, &mut rng)?;
        let mut optimizer = Adam::new_default(self.lr);
        let dataset = TensorDataset::from_labels(inputs.clone(), targets)?;

        let controller = TrainingController::new(options.clone(), self.logger.as_ref());
        let outcome = controller.fit(&mut network, &mut optimizer, &dataset, &mut rng)?;

        self.d = Some(d);
        self.network = Some(network);
        self.history = Some(outcome.history);
        Ok(())
    }

    fn fitted_network(&self) -> Result<&ClassifierNetwork, ModelError> {
        self.network.as_ref().ok_or(ModelError::UnfittedModel)
    }

    /// 预测类1概率（单列）
    fn predict_class1_probs(&self, inputs: &Array2<f32>) -> Result<Array1<f32>, ModelError> {
        let probs = self.fitted_network()?.predict(inputs)?;
        Ok(probs.column(0).to_owned())
    }

    /// 预测类别标签
    ///
    /// 阈值0.5（含）：p >= 0.5 判为类1。
    ///
    /// # 返回
    /// 每行一个0/1标签
    pub fn predict(&self, inputs: &Array2<f32>) -> Result<Array1<u8>, ModelError> {
        let probs = self.predict_class1_probs(inputs)?;
        Ok(probs.mapv(|p| u8::from(p >= 0.5)))
    }

    /// 预测两列概率表
    ///
    /// # 返回
    /// 形状 (N, 2)：第0列 = 1 - p，第1列 = p
    pub fn predict_proba(&self, inputs: &Array2<f32>) -> Result<Array2<f32>, ModelError> {
        let class1 = self.predict_class1_probs(inputs)?;
        Ok(Array2::from_shape_fn((class1.len(), 2), |(i, j)| {
            if j == 0 { 1.0 - class1[i] } else { class1[i] }
        }))
    }

    /// 评估并返回准确率
    ///
    /// 指标按名计算（准确率），不依赖任何指标返回顺序。
    /// 未训练时返回[`ModelError::UnfittedModel`]。
    pub fn evaluate(
        &self,
        inputs: &Array2<f32>,
        targets: &Array1<f32>,
    ) -> Result<f32, ModelError> {
        let network = self.fitted_network()?;
        if inputs.nrows() != targets.len() {
            return Err(ModelError::SampleCountMismatch {
                inputs: inputs.nrows(),
                targets: targets.len(),
            });
        }
        let probs = network.predict(inputs)?;
        let targets = targets.clone().insert_axis(Axis(1));
        Ok(crate::nn::criterion::accuracy(&probs, &targets))
    }

    /// 生成网络拓扑的人类可读描述
    pub fn summary(&self) -> Result<String, ModelError> {
        Ok(self.fitted_network()?.summary())
    }

    /// 保存模型到目录
    ///
    /// 未训练时返回[`ModelError::UnfittedModel`]；目录不存在则创建。
    pub fn save<P: AsRef<Path>>(&self, model_dir_path: P) -> Result<(), ModelError> {
        let network = self.fitted_network()?;
        let dir = model_dir_path.as_ref();
        std::fs::create_dir_all(dir)?;

        let params = ModelParams {
            d: network.input_dim(),
            lr: self.lr,
            num_cps: self.num_cps,
        };
        let file = File::create(dir.join(MODEL_PARAMS_FNAME))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &params)?;

        network.save_weights(dir.join(MODEL_WTS_FNAME))?;

        if let Some(history) = &self.history {
            save_training_history(history, dir)?;
        }
        Ok(())
    }

    /// 从目录加载模型
    ///
    /// 目录不存在时返回[`ModelError::DirectoryNotFound`]。
    /// 先重建未训练结构的网络，再按名加载权重（只恢复可训练参数，
    /// 文件中缺失的优化器状态一律容忍）。
    pub fn load<P: AsRef<Path>>(model_dir_path: P) -> Result<Self, ModelError> {
        let dir = model_dir_path.as_ref();
        if !dir.is_dir() {
            return Err(ModelError::DirectoryNotFound(dir.display().to_string()));
        }

        let file = File::open(dir.join(MODEL_PARAMS_FNAME))?;
        let params: ModelParams = serde_json::from_reader(BufReader::new(file))?;

        let mut classifier = Self::new(Some(params.d), params.lr, params.num_cps)?;
        let mut rng = StdRng::seed_from_u64(Self::SEED);
        let mut network = ClassifierNetwork::new(params.d, params.num_cps, &mut rng)?;
        network.load_weights(dir.join(MODEL_WTS_FNAME))?;
        classifier.network = Some(network);
        Ok(classifier)
    }

    /// 显式重置回未训练状态（唯一允许的“已训练→未训练”转换）
    pub fn reset(&mut self) {
        self.network = None;
        self.history = None;
    }
}

impl fmt::Display for Classifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 参数按字母序排列
        let d_text = self
            .d
            .map_or_else(|| "未定".to_string(), |d| d.to_string());
        write!(
            f,
            "Model name: {MODEL_NAME} (D: {d_text}, lr: {}, num_cps: {})",
            self.lr, self.num_cps
        )
    }
}

// ==================== 便捷驱动函数 ====================

/// 按超参数实例化并训练一个分类器
pub fn train_classifier(
    train_inputs: &Array2<f32>,
    train_targets: &Array1<f32>,
    hyperparameters: &Hyperparameters,
) -> Result<Classifier, ModelError> {
    let mut classifier = Classifier::from_hyperparameters(hyperparameters)?;
    classifier.fit(train_inputs, train_targets)?;
    Ok(classifier)
}

/// 用训练好的分类器做预测
///
/// # 参数
/// - `return_probs`: true返回两列概率表，false返回单列0/1标签
pub fn predict_with_classifier(
    classifier: &Classifier,
    data: &Array2<f32>,
    return_probs: bool,
) -> Result<Array2<f32>, ModelError> {
    if return_probs {
        classifier.predict_proba(data)
    } else {
        let labels = classifier.predict(data)?;
        Ok(labels.mapv(f32::from).insert_axis(Axis(1)))
    }
}

/// 保存分类器到目录（不存在则创建）
pub fn save_classifier<P: AsRef<Path>>(
    model: &Classifier,
    model_dir_path: P,
) -> Result<(), ModelError> {
    model.save(model_dir_path)
}

/// 从目录加载分类器
pub fn load_classifier<P: AsRef<Path>>(model_dir_path: P) -> Result<Classifier, ModelError> {
    Classifier::load(model_dir_path)
}

/// 评估分类器并返回准确率
pub fn evaluate_classifier(
    model: &Classifier,
    test_inputs: &Array2<f32>,
    test_targets: &Array1<f32>,
) -> Result<f32, ModelError> {
    model.evaluate(test_inputs, test_targets)
}

/// 把训练历史写成JSON文件（指标名 -> 逐epoch值）
pub fn save_training_history<P: AsRef<Path>>(
    history: &History,
    dir_path: P,
) -> Result<(), ModelError> {
    let file = File::create(dir_path.as_ref().join(HISTORY_FNAME))?;
    serde_json::to_writer_pretty(BufWriter::new(file), history)?;
    Ok(())
}
