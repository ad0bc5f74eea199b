// 该文件是 Cheshu （车数） 项目的一部分。
// src/model/track.rs - 跨帧目标跟踪
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

use crate::model::{BBox, DetectItem, iou};

const DEFAULT_MATCH_IOU: f32 = 0.3;
const DEFAULT_MAX_AGE: usize = 30;

#[derive(Debug, Clone)]
struct Track {
  id: u64,
  class_id: u32,
  bbox: BBox,
  last_seen: usize,
}

/// 基于 IoU 的贪心跟踪器。
///
/// 每帧把检测与同类别的现有轨迹按 IoU 从大到小配对，IoU 需严格大于
/// 匹配阈值；未配对的检测开启新轨迹。轨迹连续 `max_age` 帧未被匹配即丢弃，
/// 编号从 1 开始且不复用
#[derive(Debug, Clone)]
pub struct Tracker {
  tracks: Vec<Track>,
  next_id: u64,
  frame: usize,
  match_iou: f32,
  max_age: usize,
}

impl Default for Tracker {
  fn default() -> Self {
    Self {
      tracks: Vec::new(),
      next_id: 1,
      frame: 0,
      match_iou: DEFAULT_MATCH_IOU,
      max_age: DEFAULT_MAX_AGE,
    }
  }
}

impl Tracker {
  pub fn with_match_iou(mut self, match_iou: f32) -> Self {
    self.match_iou = match_iou;
    self
  }

  pub fn with_max_age(mut self, max_age: usize) -> Self {
    self.max_age = max_age;
    self
  }

  /// 当前存活的轨迹数
  pub fn active(&self) -> usize {
    self.tracks.len()
  }

  /// 为本帧检测分配 `track_id`
  pub fn update(&mut self, items: &mut [DetectItem]) {
    self.frame += 1;

    let mut pairs = Vec::new();
    for (t, track) in self.tracks.iter().enumerate() {
      for (d, item) in items.iter().enumerate() {
        if track.class_id != item.class_id {
          continue;
        }
        let overlap = iou(&track.bbox, &item.bbox);
        if overlap > self.match_iou {
          pairs.push((overlap, t, d));
        }
      }
    }
    // 稳定排序，IoU 相同时先到先得
    pairs.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut track_taken = vec![false; self.tracks.len()];
    for (_, t, d) in pairs {
      if track_taken[t] || items[d].track_id.is_some() {
        continue;
      }
      track_taken[t] = true;
      let track = &mut self.tracks[t];
      track.bbox = items[d].bbox;
      track.last_seen = self.frame;
      items[d].track_id = Some(track.id);
    }

    for item in items.iter_mut().filter(|item| item.track_id.is_none()) {
      let id = self.next_id;
      self.next_id += 1;
      self.tracks.push(Track {
        id,
        class_id: item.class_id,
        bbox: item.bbox,
        last_seen: self.frame,
      });
      item.track_id = Some(id);
    }

    let frame = self.frame;
    let max_age = self.max_age;
    self
      .tracks
      .retain(|track| frame - track.last_seen <= max_age);

    debug!(
      "跟踪: 第 {} 帧, {} 个检测, {} 条活动轨迹",
      self.frame,
      items.len(),
      self.tracks.len()
    );
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn item(bbox: [f32; 4], class_id: u32) -> DetectItem {
    DetectItem {
      label: "Bus".to_string(),
      class_id,
      score: 0.9,
      bbox: bbox.into(),
      track_id: None,
    }
  }

  fn ids(items: &[DetectItem]) -> Vec<Option<u64>> {
    items.iter().map(|item| item.track_id).collect()
  }

  #[test]
  fn stationary_object_keeps_its_id() {
    let mut tracker = Tracker::default();
    for _ in 0..5 {
      let mut items = [item([10.0, 10.0, 50.0, 50.0], 3)];
      tracker.update(&mut items);
      assert_eq!(ids(&items), vec![Some(1)]);
    }
    assert_eq!(tracker.active(), 1);
  }

  #[test]
  fn moving_object_is_followed() {
    let mut tracker = Tracker::default();
    let mut first = [item([0.0, 0.0, 40.0, 40.0], 3)];
    tracker.update(&mut first);
    // 平移 8 像素，IoU = 1024 / 2176 > 0.3
    let mut second = [item([8.0, 8.0, 48.0, 48.0], 3)];
    tracker.update(&mut second);

    assert_eq!(ids(&second), vec![Some(1)]);
  }

  #[test]
  fn distinct_objects_get_distinct_ids() {
    let mut tracker = Tracker::default();
    let mut items = [
      item([0.0, 0.0, 10.0, 10.0], 3),
      item([100.0, 100.0, 110.0, 110.0], 3),
    ];
    tracker.update(&mut items);
    assert_eq!(ids(&items), vec![Some(1), Some(2)]);

    // 顺序交换后仍按位置匹配
    let mut swapped = [
      item([100.0, 100.0, 110.0, 110.0], 3),
      item([0.0, 0.0, 10.0, 10.0], 3),
    ];
    tracker.update(&mut swapped);
    assert_eq!(ids(&swapped), vec![Some(2), Some(1)]);
  }

  #[test]
  fn class_change_starts_new_track() {
    let mut tracker = Tracker::default();
    let mut first = [item([0.0, 0.0, 10.0, 10.0], 3)];
    tracker.update(&mut first);
    let mut second = [item([0.0, 0.0, 10.0, 10.0], 8)];
    tracker.update(&mut second);

    assert_eq!(ids(&second), vec![Some(2)]);
  }

  #[test]
  fn one_track_matches_at_most_one_detection() {
    let mut tracker = Tracker::default();
    let mut first = [item([0.0, 0.0, 10.0, 10.0], 3)];
    tracker.update(&mut first);

    let mut split = [item([0.0, 0.0, 10.0, 9.0], 3), item([0.0, 0.0, 10.0, 10.0], 3)];
    tracker.update(&mut split);
    // 完全重合的检测优先拿到原编号
    assert_eq!(ids(&split), vec![Some(2), Some(1)]);
  }

  #[test]
  fn stale_tracks_expire() {
    let mut tracker = Tracker::default().with_max_age(2);
    let mut first = [item([0.0, 0.0, 10.0, 10.0], 3)];
    tracker.update(&mut first);
    for _ in 0..3 {
      tracker.update(&mut []);
    }
    assert_eq!(tracker.active(), 0);

    let mut again = [item([0.0, 0.0, 10.0, 10.0], 3)];
    tracker.update(&mut again);
    assert_eq!(ids(&again), vec![Some(2)]);
  }

  #[test]
  fn track_survives_short_gap() {
    let mut tracker = Tracker::default().with_max_age(2);
    let mut first = [item([0.0, 0.0, 10.0, 10.0], 3)];
    tracker.update(&mut first);
    tracker.update(&mut []);
    tracker.update(&mut []);

    let mut again = [item([0.0, 0.0, 10.0, 10.0], 3)];
    tracker.update(&mut again);
    assert_eq!(ids(&again), vec![Some(1)]);
  }
}
