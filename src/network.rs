/*
 * @Author       : 老董
 * @Date         : 2026-07-06
 * @Description  : ClassifierNetwork - 固定拓扑的二分类网络
 *
 * 拓扑（D在构建时冻结，除D、K外不可配置）：
 *   Input(D) -> Dense(min(100, 5D)) -> TrainableActivation(K)
 *            -> Dense(2D) -> TrainableActivation(K)
 *            -> Dense(1) -> sigmoid
 *
 * 结构构建后不可变，训练只改参数值。
 * 权重持久化采用自有二进制格式（魔数+版本+按名存储的小端张量），
 * 加载按名匹配，文件里多余的条目与网络里缺失的条目都会被容忍
 * （只恢复可训练参数，不含优化器状态）。
 */

use crate::errors::ModelError;
use crate::nn::{Dense, Module, Parameter, TrainableActivation, TrainableActivationConfig};
use ndarray::{Array2, ArrayD, IxDyn};
use rand::rngs::StdRng;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// 网络名称
pub const NETWORK_NAME: &str = "binary_classifier_ann_train_act_fn";

/// 固定拓扑的二分类网络
///
/// 输出为单列概率（经末端sigmoid压到(0, 1)）。
pub struct ClassifierNetwork {
    input_dim: usize,
    num_cps: usize,
    dense1: Dense,
    act1: TrainableActivation,
    dense2: Dense,
    act2: TrainableActivation,
    dense3: Dense,
}

impl ClassifierNetwork {
    /// 权重文件魔数
    const WEIGHTS_MAGIC: &'static [u8; 4] = b"TAPR";
    /// 权重文件版本
    const WEIGHTS_VERSION: u32 = 1;

    /// 构建网络
    ///
    /// # 参数
    /// - `input_dim`: 输入特征宽度D（构建后冻结）
    /// - `num_cps`: 每个特征的变点数K（合法范围1..=3）
    /// - `rng`: 调用方持有的随机数生成器（决定全部初始化）
    pub fn new(input_dim: usize, num_cps: usize, rng: &mut StdRng) -> Result<Self, ModelError> {
        if input_dim == 0 {
            return Err(ModelError::InvalidInputDim(0));
        }
        let config = TrainableActivationConfig::new(num_cps)?;
        let hidden1 = (5 * input_dim).min(100);
        let hidden2 = 2 * input_dim;

        let dense1 = Dense::new(input_dim, hidden1, "dense1", rng);
        let act1 = config.initialize(hidden1, "act1", rng);
        let dense2 = Dense::new(hidden1, hidden2, "dense2", rng);
        let act2 = config.initialize(hidden2, "act2", rng);
        let dense3 = Dense::new(hidden2, 1, "dense3", rng);

        Ok(Self {
            input_dim,
            num_cps,
            dense1,
            act1,
            dense2,
            act2,
            dense3,
        })
    }

    /// 前向传播（训练用：各层缓存中间量）
    ///
    /// # 参数
    /// - `x`: 输入，形状 (N, D)
    ///
    /// # 返回
    /// 类1概率，形状 (N, 1)，各元素落在(0, 1)
    pub fn forward(&mut self, x: &Array2<f32>) -> Result<Array2<f32>, ModelError> {
        let z1 = self.dense1.forward(x)?;
        let a1 = self.act1.forward(&z1)?;
        let z2 = self.dense2.forward(&a1)?;
        let a2 = self.act2.forward(&z2)?;
        let logits = self.dense3.forward(&a2)?;
        Ok(logits.mapv(sigmoid))
    }

    /// 前向传播（推理用：不缓存、不可变）
    pub fn predict(&self, x: &Array2<f32>) -> Result<Array2<f32>, ModelError> {
        let z1 = self.dense1.infer(x)?;
        let a1 = self.act1.infer(&z1)?;
        let z2 = self.dense2.infer(&a1)?;
        let a2 = self.act2.infer(&z2)?;
        let logits = self.dense3.infer(&a2)?;
        Ok(logits.mapv(sigmoid))
    }

    /// 反向传播
    ///
    /// # 参数
    /// - `grad_logits`: 损失对末端sigmoid前logit的梯度（即`(p - y) / N`，
    ///   见[`crate::nn::criterion::BinaryCrossEntropy::grad_logits`]），形状 (N, 1)
    pub fn backward(&mut self, grad_logits: &Array2<f32>) -> Result<(), ModelError> {
        let g = self.dense3.backward(grad_logits)?;
        let g = self.act2.backward(&g)?;
        let g = self.dense2.backward(&g)?;
        let g = self.act1.backward(&g)?;
        let _ = self.dense1.backward(&g)?;
        Ok(())
    }

    /// 全部参数梯度清零
    pub fn zero_grad(&mut self) {
        for param in self.parameters_mut() {
            param.zero_grad();
        }
    }

    /// 获取输入特征宽度D
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    /// 获取变点数K
    pub fn num_cps(&self) -> usize {
        self.num_cps
    }

    /// 生成人类可读的拓扑描述
    pub fn summary(&self) -> String {
        let mut text = String::new();
        text.push_str(&format!("网络: {NETWORK_NAME}\n"));
        text.push_str(&format!(
            "  (0) Dense: {} -> {}\n",
            self.dense1.in_features(),
            self.dense1.out_features()
        ));
        text.push_str(&format!(
            "  (1) TrainableActivation: D={}, K={}\n",
            self.act1.dim(),
            self.act1.num_cps()
        ));
        text.push_str(&format!(
            "  (2) Dense: {} -> {}\n",
            self.dense2.in_features(),
            self.dense2.out_features()
        ));
        text.push_str(&format!(
            "  (3) TrainableActivation: D={}, K={}\n",
            self.act2.dim(),
            self.act2.num_cps()
        ));
        text.push_str(&format!(
            "  (4) Dense: {} -> {} (sigmoid)\n",
            self.dense3.in_features(),
            self.dense3.out_features()
        ));
        text.push_str(&format!("参数总量: {}\n", self.num_params()));
        text
    }

    /// 保存所有可训练参数到二进制文件
    pub fn save_weights<P: AsRef<Path>>(&self, path: P) -> Result<(), ModelError> {
        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::new(file);

        let params = self.parameters();
        writer.write_all(Self::WEIGHTS_MAGIC)?;
        writer.write_all(&Self::WEIGHTS_VERSION.to_le_bytes())?;
        writer.write_all(&(params.len() as u32).to_le_bytes())?;

        for param in &params {
            let name_bytes = param.name().as_bytes();
            writer.write_all(&(name_bytes.len() as u32).to_le_bytes())?;
            writer.write_all(name_bytes)?;

            let shape = param.value().shape();
            writer.write_all(&(shape.len() as u32).to_le_bytes())?;
            for &dim in shape {
                writer.write_all(&(dim as u32).to_le_bytes())?;
            }

            for &val in param.value().iter() {
                writer.write_all(&val.to_le_bytes())?;
            }
        }

        writer.flush()?;
        Ok(())
    }

    /// 从二进制文件加载参数（按名匹配，容忍缺失与多余条目）
    pub fn load_weights<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ModelError> {
        let file = File::open(path.as_ref())?;
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != Self::WEIGHTS_MAGIC {
            return Err(ModelError::InvalidWeightsFile(
                "魔数不符：这不是trainact格式的权重文件".to_string(),
            ));
        }

        let version = read_u32(&mut reader)?;
        if version != Self::WEIGHTS_VERSION {
            return Err(ModelError::InvalidWeightsFile(format!(
                "不支持的权重文件版本: {version}"
            )));
        }

        let param_count = read_u32(&mut reader)?;

        let mut by_name: HashMap<String, &mut Parameter> = self
            .parameters_mut()
            .into_iter()
            .map(|p| (p.name().to_string(), p))
            .collect();

        for _ in 0..param_count {
            let name_len = read_u32(&mut reader)? as usize;
            let mut name_bytes = vec![0u8; name_len];
            reader.read_exact(&mut name_bytes)?;
            let name = String::from_utf8(name_bytes)
                .map_err(|e| ModelError::InvalidWeightsFile(format!("参数名编码无效: {e}")))?;

            let ndim = read_u32(&mut reader)? as usize;
            let mut shape = Vec::with_capacity(ndim);
            for _ in 0..ndim {
                shape.push(read_u32(&mut reader)? as usize);
            }

            let data_len: usize = shape.iter().product();
            let mut data = Vec::with_capacity(data_len);
            let mut val_bytes = [0u8; 4];
            for _ in 0..data_len {
                reader.read_exact(&mut val_bytes)?;
                data.push(f32::from_le_bytes(val_bytes));
            }

            // 未知条目（如别的拓扑的参数、优化器状态）直接跳过
            if let Some(param) = by_name.get_mut(&name) {
                let tensor = ArrayD::from_shape_vec(IxDyn(&shape), data).map_err(|e| {
                    ModelError::InvalidWeightsFile(format!("参数{name}数据损坏: {e}"))
                })?;
                param.set_value(tensor)?;
            }
        }

        Ok(())
    }
}

impl Module for ClassifierNetwork {
    fn parameters(&self) -> Vec<&Parameter> {
        let mut params = self.dense1.parameters();
        params.extend(self.act1.parameters());
        params.extend(self.dense2.parameters());
        params.extend(self.act2.parameters());
        params.extend(self.dense3.parameters());
        params
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        let mut params = self.dense1.parameters_mut();
        params.extend(self.act1.parameters_mut());
        params.extend(self.dense2.parameters_mut());
        params.extend(self.act2.parameters_mut());
        params.extend(self.dense3.parameters_mut());
        params
    }
}

fn sigmoid(z: f32) -> f32 {
    1.0 / (1.0 + (-z).exp())
}

fn read_u32<R: Read>(reader: &mut R) -> Result<u32, ModelError> {
    let mut bytes = [0u8; 4];
    reader.read_exact(&mut bytes)?;
    Ok(u32::from_le_bytes(bytes))
}
