// 该文件是 Cheshu （车数） 项目的一部分。
// src/model/onnx.rs - ONNX Runtime 推理引擎
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use ort::{
  session::{Session, builder::GraphOptimizationLevel},
  value::TensorRef,
};
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::Model,
  tensor::{InputTensor, RawOutput},
  url_to_path,
};

const ONNX_NUM_INPUTS: usize = 1;
const ONNX_DEFAULT_THREADS: usize = 4;

#[derive(Error, Debug)]
pub enum OnnxModelError {
  #[error("模型加载错误: {0}")]
  ModelLoadError(std::io::Error),
  #[error("模型无效: {0}")]
  ModelInvalid(String),
  #[error("ONNX Runtime 错误: {0}")]
  OrtError(ort::Error),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
}

impl From<std::io::Error> for OnnxModelError {
  fn from(err: std::io::Error) -> Self {
    OnnxModelError::ModelLoadError(err)
  }
}

impl From<ort::Error> for OnnxModelError {
  fn from(err: ort::Error) -> Self {
    OnnxModelError::OrtError(err)
  }
}

/// ONNX 推理会话，构建时打开，析构时释放
pub struct OnnxModel {
  session: Session,
  input_name: String,
  output_name: String,
}

pub struct OnnxModelBuilder {
  model_path: String,
  threads: usize,
}

impl FromUrlWithScheme for OnnxModelBuilder {
  const SCHEME: &'static str = "onnx";
}

impl FromUrl for OnnxModelBuilder {
  type Error = OnnxModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(OnnxModelError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    let mut threads = ONNX_DEFAULT_THREADS;
    for (k, v) in url.query_pairs() {
      if k == "threads" {
        threads = v
          .parse()
          .map_err(|_| OnnxModelError::ModelPathError(format!("线程数无效: {}", v)))?;
      }
    }

    let model_path = url_to_path(url)
      .map_err(|e| OnnxModelError::ModelPathError(e.to_string()))?
      .display()
      .to_string();

    Ok(OnnxModelBuilder {
      model_path,
      threads,
    })
  }
}

impl OnnxModelBuilder {
  pub fn new(model_path: impl Into<String>) -> Self {
    Self {
      model_path: model_path.into(),
      threads: ONNX_DEFAULT_THREADS,
    }
  }

  pub fn threads(mut self, threads: usize) -> Self {
    self.threads = threads;
    self
  }

  pub fn build(self) -> Result<OnnxModel, OnnxModelError> {
    info!("加载模型文件: {}", self.model_path);
    let model_data = std::fs::read(&self.model_path)?;
    debug!(
      "模型文件大小: {:.2} MB",
      model_data.len() as f64 / (1024.0 * 1024.0)
    );

    info!("创建 ONNX Runtime 推理会话");
    let session = Session::builder()?
      .with_optimization_level(GraphOptimizationLevel::Level3)?
      .with_intra_threads(self.threads)?
      .commit_from_memory(&model_data)?;
    info!("模型加载完成");

    let num_inputs = session.inputs.len();
    let num_outputs = session.outputs.len();
    debug!("模型输入数量: {}", num_inputs);
    debug!("模型输出数量: {}", num_outputs);

    if num_inputs != ONNX_NUM_INPUTS {
      error!(
        "预期模型输入数量为 {}, 实际为 {}",
        ONNX_NUM_INPUTS, num_inputs
      );
      return Err(OnnxModelError::ModelInvalid(format!(
        "预期模型输入数量为 {}, 实际为 {}",
        ONNX_NUM_INPUTS, num_inputs
      )));
    }

    let Some(output) = session.outputs.first() else {
      error!("模型没有输出");
      return Err(OnnxModelError::ModelInvalid("模型没有输出".to_string()));
    };

    let input_name = session.inputs[0].name.clone();
    let output_name = output.name.clone();
    debug!("输入名称: {}, 输出名称: {}", input_name, output_name);

    Ok(OnnxModel {
      session,
      input_name,
      output_name,
    })
  }
}

impl Model for OnnxModel {
  type Error = OnnxModelError;

  fn infer(&mut self, input: &InputTensor) -> Result<RawOutput, Self::Error> {
    debug!("设置模型输入: {:?}", input.shape());
    let tensor = TensorRef::from_array_view((input.shape(), input.as_slice()))?;

    debug!("执行模型推理");
    let outputs = self
      .session
      .run(ort::inputs![self.input_name.as_str() => tensor])?;

    debug!("获取模型输出");
    let Some(output) = outputs.get(self.output_name.as_str()) else {
      return Err(OnnxModelError::ModelInvalid(format!(
        "缺少输出 {}",
        self.output_name
      )));
    };
    let (shape, data) = output.try_extract_tensor::<f32>()?;
    let shape: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();
    debug!("模型输出形状: {:?}", shape);

    Ok(RawOutput::new(data.to_vec(), &shape))
  }
}

impl Drop for OnnxModel {
  fn drop(&mut self) {
    info!("释放推理会话");
  }
}
