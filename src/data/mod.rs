/*
 * @Author       : 老董
 * @Date         : 2026-07-04
 * @Description  : TensorDataset 与 DataLoader - 数据批量加载
 *
 * 提供统一的数据迭代 API，支持：
 * - 自动分批 (batch_size)
 * - 随机打乱 (shuffle，随机数生成器由调用方注入)
 * - 验证集尾部切分 (validation split)
 */

use crate::errors::ModelError;
use ndarray::{Array1, Array2, Axis, s};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// TensorDataset - 持有特征和标签的数据集
///
/// # 示例
/// ```ignore
/// let dataset = TensorDataset::new(features, labels)?;
/// println!("样本数: {}", dataset.len());
/// ```
#[derive(Clone)]
pub struct TensorDataset {
    /// 特征 (N, D)
    features: Array2<f32>,
    /// 标签 (N, 1)
    labels: Array2<f32>,
}

impl TensorDataset {
    /// 创建新的 TensorDataset
    ///
    /// # 参数
    /// - `features`: 特征，形状 (N, D)
    /// - `labels`: 标签，形状 (N, 1)（样本数必须与 features 一致）
    pub fn new(features: Array2<f32>, labels: Array2<f32>) -> Result<Self, ModelError> {
        if features.nrows() != labels.nrows() {
            return Err(ModelError::SampleCountMismatch {
                inputs: features.nrows(),
                targets: labels.nrows(),
            });
        }
        Ok(Self { features, labels })
    }

    /// 从一维标签向量创建（内部转为列向量）
    pub fn from_labels(features: Array2<f32>, labels: &Array1<f32>) -> Result<Self, ModelError> {
        let labels = labels.clone().insert_axis(Axis(1));
        Self::new(features, labels)
    }

    /// 获取样本数量
    pub fn len(&self) -> usize {
        self.features.nrows()
    }

    /// 检查数据集是否为空
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 获取特征引用
    pub fn features(&self) -> &Array2<f32> {
        &self.features
    }

    /// 获取标签引用
    pub fn labels(&self) -> &Array2<f32> {
        &self.labels
    }

    /// 按比例把**末尾**⌈fraction·N⌉行切出作为验证集
    ///
    /// 尾部切分发生在任何打乱之前，打乱只作用于训练部分，
    /// 因此验证集在各个epoch之间保持不变。
    ///
    /// # 返回
    /// (训练集, 验证集)
    pub fn split_tail(&self, fraction: f32) -> (Self, Self) {
        let n = self.len();
        let n_val = ((n as f32) * fraction).ceil() as usize;
        let n_train = n - n_val;
        let train = Self {
            features: self.features.slice(s![..n_train, ..]).to_owned(),
            labels: self.labels.slice(s![..n_train, ..]).to_owned(),
        };
        let val = Self {
            features: self.features.slice(s![n_train.., ..]).to_owned(),
            labels: self.labels.slice(s![n_train.., ..]).to_owned(),
        };
        (train, val)
    }
}

/// DataLoader - 数据批量加载器
///
/// # 示例
/// ```ignore
/// let loader = DataLoader::new(100, true);
/// for (batch_x, batch_y) in loader.batches(&dataset, &mut rng) {
///     // ...
/// }
/// ```
pub struct DataLoader {
    batch_size: usize,
    shuffle: bool,
}

impl DataLoader {
    /// 创建新的 DataLoader
    ///
    /// # 参数
    /// - `batch_size`: 批大小（0按1处理）
    /// - `shuffle`: 每次调用[`batches`](Self::batches)前是否打乱样本顺序
    pub fn new(batch_size: usize, shuffle: bool) -> Self {
        Self {
            batch_size: batch_size.max(1),
            shuffle,
        }
    }

    /// 生成一个epoch的全部批次（保留末尾的不完整批次）
    ///
    /// # 参数
    /// - `dataset`: 数据集
    /// - `rng`: 调用方持有的随机数生成器（决定打乱顺序）
    pub fn batches(
        &self,
        dataset: &TensorDataset,
        rng: &mut StdRng,
    ) -> Vec<(Array2<f32>, Array2<f32>)> {
        let mut indices: Vec<usize> = (0..dataset.len()).collect();
        if self.shuffle {
            indices.shuffle(rng);
        }
        indices
            .chunks(self.batch_size)
            .map(|chunk| {
                (
                    dataset.features.select(Axis(0), chunk),
                    dataset.labels.select(Axis(0), chunk),
                )
            })
            .collect()
    }

    /// 获取批大小
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use rand::SeedableRng;

    fn make_dataset(n: usize) -> TensorDataset {
        let features = Array2::from_shape_fn((n, 2), |(i, j)| (i * 2 + j) as f32);
        let labels = Array2::from_shape_fn((n, 1), |(i, _)| (i % 2) as f32);
        TensorDataset::new(features, labels).unwrap()
    }

    #[test]
    fn test_dataset_sample_count_mismatch() {
        let features = Array2::<f32>::zeros((4, 2));
        let labels = Array2::<f32>::zeros((3, 1));
        let result = TensorDataset::new(features, labels);
        assert!(matches!(
            result,
            Err(ModelError::SampleCountMismatch {
                inputs: 4,
                targets: 3
            })
        ));
    }

    #[test]
    fn test_split_tail_counts() {
        // 301行、15%切分：向上取整46行验证，255行训练
        let dataset = make_dataset(301);
        let (train, val) = dataset.split_tail(0.15);
        assert_eq!(train.len(), 255);
        assert_eq!(val.len(), 46);
        // 验证集必须是末尾的行（切分先于打乱）
        assert_eq!(val.features()[[0, 0]], dataset.features()[[255, 0]]);
        assert_eq!(val.features()[[45, 0]], dataset.features()[[300, 0]]);
    }

    #[test]
    fn test_loader_batch_sizes() {
        let dataset = make_dataset(255);
        let loader = DataLoader::new(100, false);
        let mut rng = StdRng::seed_from_u64(0);
        let batches = loader.batches(&dataset, &mut rng);
        let sizes: Vec<usize> = batches.iter().map(|(x, _)| x.nrows()).collect();
        // 保留末尾不完整批次
        assert_eq!(sizes, vec![100, 100, 55]);
    }

    #[test]
    fn test_loader_shuffle_is_seed_deterministic() {
        let dataset = make_dataset(32);
        let loader = DataLoader::new(8, true);
        let mut rng1 = StdRng::seed_from_u64(7);
        let mut rng2 = StdRng::seed_from_u64(7);
        let b1 = loader.batches(&dataset, &mut rng1);
        let b2 = loader.batches(&dataset, &mut rng2);
        assert_eq!(b1[0].0, b2[0].0);
        assert_eq!(b1[0].1, b2[0].1);
    }

    #[test]
    fn test_loader_no_shuffle_keeps_order() {
        let dataset = make_dataset(5);
        let loader = DataLoader::new(2, false);
        let mut rng = StdRng::seed_from_u64(0);
        let batches = loader.batches(&dataset, &mut rng);
        assert_eq!(batches[0].0[[0, 0]], 0.0);
        assert_eq!(batches[0].0[[1, 0]], 2.0);
        assert_eq!(batches[2].0[[0, 0]], 8.0);
    }
}
