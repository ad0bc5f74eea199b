// 该文件是 Cheshu （车数） 项目的一部分。
// src/model/decode.rs - 输出张量解码
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

use tracing::{debug, error};

use crate::{
  error::DetectError,
  model::{BBox, Detection},
};

/// 每个候选的框参数个数 (cx, cy, w, h)
pub const BOX_ATTRIBUTES: usize = 4;

/// 解码 `[4 + K][N]` 输出张量。返回按候选下标顺序惰性产出的迭代器，
/// 只保留最高类别分数严格大于 `threshold` 的候选
pub fn decode(
  raw: &[f32],
  num_candidates: usize,
  num_classes: usize,
  threshold: f32,
) -> Result<Decode<'_>, DetectError> {
  let expected = (BOX_ATTRIBUTES + num_classes) * num_candidates;
  if raw.len() != expected {
    error!(
      "输出大小不匹配 - 实际: {}, 期望: ({} + {}) x {} = {}",
      raw.len(),
      BOX_ATTRIBUTES,
      num_classes,
      num_candidates,
      expected
    );
    return Err(DetectError::InvalidShape {
      expected,
      actual: raw.len(),
    });
  }

  debug!(
    "解码 {} 个候选, {} 个类别, 阈值 {}",
    num_candidates, num_classes, threshold
  );

  Ok(Decode {
    raw,
    num_candidates,
    num_classes,
    threshold,
    index: 0,
  })
}

/// [`decode`] 返回的迭代器，可克隆以重新遍历
#[derive(Debug, Clone)]
pub struct Decode<'a> {
  raw: &'a [f32],
  num_candidates: usize,
  num_classes: usize,
  threshold: f32,
  index: usize,
}

impl Decode<'_> {
  #[inline]
  fn at(&self, attribute: usize, candidate: usize) -> f32 {
    self.raw[attribute * self.num_candidates + candidate]
  }

  /// 最高分类别；分数相同时取较小的类别 ID，NaN 分数不参与比较。
  /// 所有分数都是 NaN 时返回 `None`
  fn best_class(&self, candidate: usize) -> Option<(u32, f32)> {
    let mut best: Option<(u32, f32)> = None;
    for c in 0..self.num_classes {
      let conf = self.at(BOX_ATTRIBUTES + c, candidate);
      if conf.is_nan() {
        continue;
      }
      match best {
        Some((_, max_conf)) if conf <= max_conf => {}
        _ => best = Some((c as u32, conf)),
      }
    }
    best
  }

  fn candidate(&self, i: usize) -> Option<Detection> {
    let (class_id, score) = self.best_class(i)?;

    // NaN 分数同样被丢弃
    if !(score > self.threshold) {
      return None;
    }

    let bbox = BBox::from_cxcywh(self.at(0, i), self.at(1, i), self.at(2, i), self.at(3, i));
    Some(Detection {
      bbox,
      score,
      class_id,
    })
  }
}

impl Iterator for Decode<'_> {
  type Item = Detection;

  fn next(&mut self) -> Option<Self::Item> {
    while self.index < self.num_candidates {
      let i = self.index;
      self.index += 1;
      if let Some(detection) = self.candidate(i) {
        return Some(detection);
      }
    }
    None
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    (0, Some(self.num_candidates - self.index))
  }
}

impl std::iter::FusedIterator for Decode<'_> {}
