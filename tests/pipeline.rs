// 该文件是 Cheshu （车数） 项目的一部分。
// tests/pipeline.rs - 检测流水线端到端测试
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

use approx::assert_abs_diff_eq;
use image::RgbImage;
use thiserror::Error;

use cheshu::{
  DetectConfig, Detector, LabelTable, NmsMode,
  model::Model,
  tensor::{InputTensor, RawOutput},
};

const SIDE: usize = 640;
const NUM_CLASSES: usize = 11;

#[derive(Error, Debug)]
#[error("never fails")]
struct Infallible;

/// 返回固定输出的推理引擎
struct FixedModel(RawOutput);

impl Model for FixedModel {
  type Error = Infallible;

  fn infer(&mut self, input: &InputTensor) -> Result<RawOutput, Self::Error> {
    assert_eq!(input.shape(), [1, 3, SIDE, SIDE]);
    Ok(self.0.clone())
  }
}

/// 候选：左上右下角坐标、类别、分数
struct Candidate {
  corners: [f32; 4],
  class_id: usize,
  score: f32,
}

/// 按 `[4 + K][N]` 排布生成引擎输出
fn raw_output(candidates: &[Candidate], num_classes: usize) -> RawOutput {
  let n = candidates.len();
  let rows = 4 + num_classes;
  let mut data = vec![0.0f32; rows * n];
  for (i, c) in candidates.iter().enumerate() {
    let [x1, y1, x2, y2] = c.corners;
    data[i] = (x1 + x2) / 2.0;
    data[n + i] = (y1 + y2) / 2.0;
    data[2 * n + i] = x2 - x1;
    data[3 * n + i] = y2 - y1;
    data[(4 + c.class_id) * n + i] = c.score;
  }
  RawOutput::with_layout(data, rows, n)
}

fn detector(candidates: &[Candidate]) -> Detector<FixedModel> {
  Detector::new(
    FixedModel(raw_output(candidates, NUM_CLASSES)),
    DetectConfig::default(),
  )
  .unwrap()
}

#[test]
fn single_bus_is_rescaled_to_original_image() {
  let mut detector = detector(&[Candidate {
    corners: [100.0, 100.0, 200.0, 200.0],
    class_id: 3,
    score: 0.9,
  }]);
  let image = RgbImage::new(1280, 1280);

  let result = detector.detect(&image).unwrap();
  assert_eq!(result.total_count, 1);
  assert_eq!(result.class_counts.len(), 1);
  assert_eq!(result.class_counts.get("Bus"), Some(&1));

  let item = &result.items[0];
  assert_eq!(item.label, "Bus");
  assert_eq!(item.class_id, 3);
  assert_abs_diff_eq!(item.score, 0.9);
  assert_abs_diff_eq!(item.bbox.x1, 200.0, epsilon = 1e-3);
  assert_abs_diff_eq!(item.bbox.y1, 200.0, epsilon = 1e-3);
  assert_abs_diff_eq!(item.bbox.x2, 400.0, epsilon = 1e-3);
  assert_abs_diff_eq!(item.bbox.y2, 400.0, epsilon = 1e-3);
  assert_eq!(result.image.dimensions(), (1280, 1280));
}

#[test]
fn overlapping_same_class_keeps_higher_score() {
  // IoU = 80 / 100 = 0.8
  let mut detector = detector(&[
    Candidate {
      corners: [0.0, 0.0, 100.0, 100.0],
      class_id: 8,
      score: 0.6,
    },
    Candidate {
      corners: [0.0, 0.0, 100.0, 80.0],
      class_id: 8,
      score: 0.9,
    },
  ]);

  let result = detector.detect(&RgbImage::new(640, 640)).unwrap();
  assert_eq!(result.total_count, 1);
  assert_abs_diff_eq!(result.items[0].score, 0.9);
  assert_eq!(result.class_counts.get("Truck"), Some(&1));
}

#[test]
fn overlapping_different_classes_suppress_each_other() {
  // IoU = 90 / 100 = 0.9
  let candidates = [
    Candidate {
      corners: [0.0, 0.0, 100.0, 100.0],
      class_id: 3,
      score: 0.7,
    },
    Candidate {
      corners: [0.0, 0.0, 100.0, 90.0],
      class_id: 8,
      score: 0.8,
    },
  ];
  let mut detector = detector(&candidates);

  let result = detector.detect(&RgbImage::new(640, 640)).unwrap();
  assert_eq!(result.total_count, 1);
  assert_eq!(result.items[0].label, "Truck");
  assert_eq!(result.class_counts.get("Bus"), None);

  // 按类别 NMS 时两者都保留
  let mut detector = Detector::new(
    FixedModel(raw_output(&candidates, NUM_CLASSES)),
    DetectConfig::default().with_nms(NmsMode::PerClass),
  )
  .unwrap();
  let result = detector.detect(&RgbImage::new(640, 640)).unwrap();
  assert_eq!(result.total_count, 2);
  assert_eq!(result.items[0].label, "Truck");
  assert_eq!(result.items[1].label, "Bus");
}

#[test]
fn class_without_label_is_counted_as_unknown() {
  let labels = LabelTable::from_names(["Car", "Bus"]);
  let config = DetectConfig::default()
    .with_num_classes(3)
    .with_labels(labels);
  let candidates = [
    Candidate {
      corners: [10.0, 10.0, 50.0, 50.0],
      class_id: 2,
      score: 0.8,
    },
    Candidate {
      corners: [300.0, 300.0, 400.0, 400.0],
      class_id: 0,
      score: 0.7,
    },
  ];
  let mut detector = Detector::new(FixedModel(raw_output(&candidates, 3)), config).unwrap();

  let result = detector.detect(&RgbImage::new(640, 480)).unwrap();
  assert_eq!(result.total_count, 2);
  assert_eq!(result.items[0].label, "Unknown");
  assert_eq!(result.items[0].class_id, 2);
  assert_eq!(result.class_counts.get("Unknown"), Some(&1));
  assert_eq!(result.class_counts.get("Car"), Some(&1));
}

#[test]
fn empty_engine_output_yields_empty_result() {
  let mut detector = detector(&[]);
  let image = RgbImage::new(320, 240);

  let result = detector.detect(&image).unwrap();
  assert_eq!(result.total_count, 0);
  assert!(result.class_counts.is_empty());
  assert!(result.items.is_empty());
  assert!(result.is_empty());
  assert_eq!(result.image, image);
}

#[test]
fn low_confidence_candidates_never_count() {
  let mut detector = detector(&[
    Candidate {
      corners: [0.0, 0.0, 10.0, 10.0],
      class_id: 0,
      score: 0.45,
    },
    Candidate {
      corners: [100.0, 100.0, 110.0, 110.0],
      class_id: 1,
      score: 0.2,
    },
  ]);

  let result = detector.detect(&RgbImage::new(640, 640)).unwrap();
  assert!(result.is_empty());
}

#[test]
fn report_serializes_counts_and_detections() {
  let mut detector = detector(&[Candidate {
    corners: [100.0, 100.0, 200.0, 200.0],
    class_id: 7,
    score: 0.75,
  }]);
  let result = detector.detect(&RgbImage::new(640, 640)).unwrap();

  let report = serde_json::to_value(result.report()).unwrap();
  assert_eq!(report["width"], 640);
  assert_eq!(report["total_count"], 1);
  assert_eq!(report["class_counts"]["Motorcycle"], 1);
  assert_eq!(report["detections"][0]["class_id"], 7);
}
