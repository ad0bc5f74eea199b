// 该文件是 Cheshu （车数） 项目的一部分。
// src/model.rs - 模型
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

use std::collections::BTreeMap;

use image::RgbImage;
use serde::Serialize;

use crate::tensor::{InputTensor, RawOutput};

/// 外部推理引擎。输入为 `[1, 3, S, S]`，输出为 `[1, C, N]`
pub trait Model {
  type Error: std::error::Error + Send + Sync + 'static;

  fn infer(&mut self, input: &InputTensor) -> Result<RawOutput, Self::Error>;
}

impl<M: Model + ?Sized> Model for Box<M> {
  type Error = M::Error;

  fn infer(&mut self, input: &InputTensor) -> Result<RawOutput, Self::Error> {
    (**self).infer(input)
  }
}

mod bbox;
pub use self::bbox::BBox;

/// 解码后的候选检测，坐标位于模型输入空间
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
  pub bbox: BBox,
  pub score: f32,
  pub class_id: u32,
}

/// 带标签的检测结果，坐标位于原图空间
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectItem {
  pub label: String,
  pub class_id: u32,
  pub score: f32,
  pub bbox: BBox,
  /// 跨帧跟踪编号，仅在跟踪模式下存在
  #[serde(skip_serializing_if = "Option::is_none")]
  pub track_id: Option<u64>,
}

/// 单次检测的最终结果
#[derive(Debug, Clone)]
pub struct DetectionResult {
  /// 绘制了检测框的原图副本
  pub image: RgbImage,
  pub total_count: usize,
  pub class_counts: BTreeMap<String, usize>,
  pub items: Box<[DetectItem]>,
}

impl DetectionResult {
  pub fn is_empty(&self) -> bool {
    self.total_count == 0
  }

  pub fn report(&self) -> DetectionReport<'_> {
    DetectionReport {
      width: self.image.width(),
      height: self.image.height(),
      total_count: self.total_count,
      class_counts: &self.class_counts,
      detections: &self.items,
    }
  }
}

/// 可序列化的检测报告，不含图像
#[derive(Debug, Serialize)]
pub struct DetectionReport<'a> {
  pub width: u32,
  pub height: u32,
  pub total_count: usize,
  pub class_counts: &'a BTreeMap<String, usize>,
  pub detections: &'a [DetectItem],
}

mod decode;
mod finalize;
mod nms;
#[cfg(feature = "model_onnx")]
mod onnx;
mod preprocess;
mod track;

pub use self::decode::{Decode, decode};
pub use self::finalize::{annotate, finalize, label_items, rescale};
pub use self::nms::{iou, suppress};
#[cfg(feature = "model_onnx")]
pub use self::onnx::{OnnxModel, OnnxModelBuilder, OnnxModelError};
pub use self::preprocess::preprocess;
pub use self::track::Tracker;
