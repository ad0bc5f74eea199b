// 该文件是 Cheshu （车数） 项目的一部分。
// src/error.rs - 检测流水线错误定义
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

use thiserror::Error;

pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// 检测流水线各阶段的错误
#[derive(Error, Debug)]
pub enum DetectError {
  /// 输入图像退化（宽或高为零）
  #[error("输入无效: {0}")]
  InvalidInput(String),
  /// 输出张量长度与 `C x N` 不符
  #[error("输出张量形状不匹配: 期望长度 {expected}, 实际长度 {actual}")]
  InvalidShape { expected: usize, actual: usize },
  /// 推理引擎原样抛出的错误，不做重试
  #[error("推理引擎错误: {0}")]
  InferenceEngine(#[source] BoxedError),
  #[error("配置错误: {0}")]
  Config(#[from] crate::config::ConfigError),
  #[error("绘制错误: {0}")]
  Draw(#[from] crate::output::DrawError),
}

impl DetectError {
  pub fn engine<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    DetectError::InferenceEngine(Box::new(err))
  }
}
