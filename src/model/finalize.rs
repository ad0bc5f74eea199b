// 该文件是 Cheshu （车数） 项目的一部分。
// src/model/finalize.rs - 坐标还原与类别计数
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
use tracing::debug;

use crate::{
  label::LabelTable,
  model::{BBox, DetectItem, Detection, DetectionResult},
  output::Draw,
};

/// 将模型输入空间 (`model_side x model_side`) 的框映射回原图空间。
/// 预处理不保持宽高比，x、y 分别缩放
pub fn rescale(bbox: &BBox, original_width: u32, original_height: u32, model_side: usize) -> BBox {
  let scale_x = original_width as f32 / model_side as f32;
  let scale_y = original_height as f32 / model_side as f32;
  bbox.scale(scale_x, scale_y)
}

/// 还原坐标并查标签，得到原图空间的检测项
pub fn label_items<I>(
  detections: I,
  original_width: u32,
  original_height: u32,
  model_side: usize,
  labels: &LabelTable,
) -> Vec<DetectItem>
where
  I: IntoIterator<Item = Detection>,
{
  detections
    .into_iter()
    .map(|detection| DetectItem {
      label: labels.label_or_unknown(detection.class_id).to_string(),
      class_id: detection.class_id,
      score: detection.score,
      bbox: rescale(&detection.bbox, original_width, original_height, model_side),
      track_id: None,
    })
    .collect()
}

/// 按标签计数，并在原图副本上绘制结果；原图不被修改
pub fn annotate(image: &RgbImage, items: Vec<DetectItem>, draw: &Draw) -> DetectionResult {
  let items = items.into_boxed_slice();

  let mut class_counts = BTreeMap::new();
  for item in items.iter() {
    *class_counts.entry(item.label.clone()).or_insert(0usize) += 1;
  }

  let mut annotated = image.clone();
  draw.draw_items(&mut annotated, &items);

  debug!("检测到 {} 个物体: {:?}", items.len(), class_counts);

  DetectionResult {
    image: annotated,
    total_count: items.len(),
    class_counts,
    items,
  }
}

/// 还原坐标、查标签、计数，并在原图副本上绘制结果
pub fn finalize<I>(
  image: &RgbImage,
  detections: I,
  model_side: usize,
  labels: &LabelTable,
  draw: &Draw,
) -> DetectionResult
where
  I: IntoIterator<Item = Detection>,
{
  let (width, height) = image.dimensions();
  let items = label_items(detections, width, height, model_side, labels);
  annotate(image, items, draw)
}

#[cfg(test)]
mod tests {
  use image::Rgb;

  use super::*;

  fn det(bbox: [f32; 4], score: f32, class_id: u32) -> Detection {
    Detection {
      bbox: bbox.into(),
      score,
      class_id,
    }
  }

  #[test]
  fn rescale_uses_independent_axes() {
    let bbox = BBox::new(100.0, 100.0, 200.0, 200.0);
    assert_eq!(
      rescale(&bbox, 1280, 320, 640),
      BBox::new(200.0, 50.0, 400.0, 100.0)
    );
  }

  #[test]
  fn counts_labels_and_unknown_classes() {
    let image = RgbImage::from_pixel(640, 640, Rgb([10, 10, 10]));
    let draw = Draw::new().unwrap();
    let result = finalize(
      &image,
      [
        det([0.0, 0.0, 10.0, 10.0], 0.9, 3),
        det([20.0, 20.0, 30.0, 30.0], 0.8, 3),
        det([40.0, 40.0, 50.0, 50.0], 0.7, 99),
      ],
      640,
      &LabelTable::vehicles(),
      &draw,
    );

    assert_eq!(result.total_count, 3);
    assert_eq!(result.class_counts.get("Bus"), Some(&2));
    assert_eq!(result.class_counts.get("Unknown"), Some(&1));
    assert_eq!(
      result.class_counts.values().sum::<usize>(),
      result.total_count
    );
    assert_eq!(result.items[2].label, "Unknown");
  }

  #[test]
  fn source_image_is_not_mutated() {
    let image = RgbImage::from_pixel(64, 64, Rgb([10, 10, 10]));
    let before = image.clone();
    let draw = Draw::new().unwrap();

    let result = finalize(
      &image,
      [det([8.0, 8.0, 56.0, 56.0], 0.9, 0)],
      64,
      &LabelTable::vehicles(),
      &draw,
    );

    assert_eq!(image, before);
    assert_ne!(result.image, before);
  }

  #[test]
  fn no_detections_yield_empty_counts() {
    let image = RgbImage::new(16, 16);
    let draw = Draw::new().unwrap();
    let result = finalize(&image, [], 640, &LabelTable::vehicles(), &draw);

    assert!(result.is_empty());
    assert!(result.class_counts.is_empty());
    assert_eq!(result.image, image);
  }
}
