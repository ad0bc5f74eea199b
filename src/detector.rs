// 该文件是 Cheshu （车数） 项目的一部分。
// src/detector.rs - 车辆检测器
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

use image::RgbImage;
use tracing::{debug, info};

use crate::{
  config::DetectConfig,
  error::DetectError,
  model::{
    DetectItem, DetectionResult, Model, Tracker, annotate, decode, label_items, preprocess, suppress,
  },
  output::Draw,
};

/// 完整的检测流水线：预处理 -> 推理 -> 解码 -> NMS -> 坐标还原与计数。
/// 每次调用相互独立，不在调用之间保留缓冲区
pub struct Detector<M> {
  model: M,
  config: DetectConfig,
  draw: Draw,
}

impl<M: Model> Detector<M> {
  pub fn new(model: M, config: DetectConfig) -> Result<Self, DetectError> {
    config.validate()?;
    let draw = Draw::new()?.with_palette(config.num_classes);
    info!(
      "检测器就绪: 输入 {}x{}, {} 个类别, 置信度阈值 {}, IoU 阈值 {}, NMS {:?}",
      config.input_side,
      config.input_side,
      config.num_classes,
      config.confidence_threshold,
      config.iou_threshold,
      config.nms
    );

    Ok(Self {
      model,
      config,
      draw,
    })
  }

  pub fn with_draw(mut self, draw: Draw) -> Self {
    self.draw = draw;
    self
  }

  pub fn config(&self) -> &DetectConfig {
    &self.config
  }

  pub fn detect(&mut self, image: &RgbImage) -> Result<DetectionResult, DetectError> {
    let items = self.items(image)?;
    Ok(annotate(image, items, &self.draw))
  }

  /// 与 [`Detector::detect`] 相同，但在绘制前由 `tracker` 为每个检测分配跨帧编号
  pub fn detect_tracked(
    &mut self,
    image: &RgbImage,
    tracker: &mut Tracker,
  ) -> Result<DetectionResult, DetectError> {
    let mut items = self.items(image)?;
    tracker.update(&mut items);
    Ok(annotate(image, items, &self.draw))
  }

  fn items(&mut self, image: &RgbImage) -> Result<Vec<DetectItem>, DetectError> {
    let side = self.config.input_side;
    let input = preprocess(image, side)?;

    let now = std::time::Instant::now();
    let raw = self.model.infer(&input).map_err(DetectError::engine)?;
    debug!(
      "推理完成，耗时: {:.2?}, 输出形状: {:?}",
      now.elapsed(),
      raw.shape()
    );

    let candidates = decode(
      raw.as_slice(),
      raw.num_candidates(),
      self.config.num_classes,
      self.config.confidence_threshold,
    )?;
    let kept = suppress(candidates, self.config.iou_threshold, self.config.nms);

    let (width, height) = image.dimensions();
    Ok(label_items(kept, width, height, side, &self.config.labels))
  }

  /// 取回推理引擎，检测器本身随之释放
  pub fn into_model(self) -> M {
    self.model
  }
}
