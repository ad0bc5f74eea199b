// 该文件是 Cheshu （车数） 项目的一部分。
// src/model/nms.rs - 非极大值抑制
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

use tracing::debug;

use crate::{
  config::NmsMode,
  model::{BBox, Detection},
};

/// 计算两个边界框的 IoU
pub fn iou(a: &BBox, b: &BBox) -> f32 {
  a.iou(b)
}

/// 贪心 NMS。按分数降序（同分保持原始顺序）扫描，
/// 与已保留框的 IoU 大于 `iou_threshold` 的框被抑制。
/// 返回的检测按分数降序排列
pub fn suppress<I>(detections: I, iou_threshold: f32, mode: NmsMode) -> Vec<Detection>
where
  I: IntoIterator<Item = Detection>,
{
  let mut sorted: Vec<Detection> = detections.into_iter().collect();
  // sort_by 是稳定排序
  sorted.sort_by(|a, b| b.score.total_cmp(&a.score));

  let mut suppressed = vec![false; sorted.len()];
  let mut kept = Vec::new();

  for i in 0..sorted.len() {
    if suppressed[i] {
      continue;
    }
    let current = sorted[i];
    kept.push(current);

    for j in (i + 1)..sorted.len() {
      if suppressed[j] {
        continue;
      }
      let other = &sorted[j];
      if mode == NmsMode::PerClass && other.class_id != current.class_id {
        continue;
      }
      if iou(&current.bbox, &other.bbox) > iou_threshold {
        suppressed[j] = true;
      }
    }
  }

  debug!("NMS: {} -> {} 个检测", sorted.len(), kept.len());
  kept
}
