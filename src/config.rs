// 该文件是 Cheshu （车数） 项目的一部分。
// src/config.rs - 检测配置
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

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::label::LabelTable;

pub const DEFAULT_INPUT_SIDE: usize = 640;
pub const DEFAULT_NUM_CLASSES: usize = 11;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.45;
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.45;

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("配置解析错误: {0}")]
  ParseError(#[from] serde_json::Error),
  #[error("配置无效: {0}")]
  Invalid(String),
}

/// NMS 抑制策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NmsMode {
  /// 不区分类别，重叠框之间互相抑制
  #[default]
  ClassAgnostic,
  /// 只在同一类别内抑制
  PerClass,
}

/// 检测流水线配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectConfig {
  /// 模型输入边长 S
  pub input_side: usize,
  /// 类别数 K
  pub num_classes: usize,
  pub confidence_threshold: f32,
  pub iou_threshold: f32,
  pub nms: NmsMode,
  pub labels: LabelTable,
}

impl Default for DetectConfig {
  fn default() -> Self {
    Self {
      input_side: DEFAULT_INPUT_SIDE,
      num_classes: DEFAULT_NUM_CLASSES,
      confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
      iou_threshold: DEFAULT_IOU_THRESHOLD,
      nms: NmsMode::default(),
      labels: LabelTable::vehicles(),
    }
  }
}

impl DetectConfig {
  /// 从 JSON 文件加载配置，缺省字段取默认值
  pub fn open<P>(path: P) -> Result<Self, ConfigError>
  where
    P: AsRef<Path>,
  {
    let path = path.as_ref();
    info!("加载配置文件: {}", path.display());
    let text = std::fs::read_to_string(path)?;
    let config: Self = serde_json::from_str(&text)?;
    config.validate()?;
    debug!("检测配置: {:?}", config);
    Ok(config)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.input_side == 0 {
      return Err(ConfigError::Invalid("输入边长不能为 0".to_string()));
    }
    if self.num_classes == 0 {
      return Err(ConfigError::Invalid("类别数不能为 0".to_string()));
    }
    for (name, value) in [
      ("置信度阈值", self.confidence_threshold),
      ("IoU 阈值", self.iou_threshold),
    ] {
      if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::Invalid(format!(
          "{} 必须位于 [0, 1]，实际为 {}",
          name, value
        )));
      }
    }
    Ok(())
  }

  pub fn with_input_side(mut self, input_side: usize) -> Self {
    self.input_side = input_side;
    self
  }

  pub fn with_num_classes(mut self, num_classes: usize) -> Self {
    self.num_classes = num_classes;
    self
  }

  pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
    self.confidence_threshold = threshold;
    self
  }

  pub fn with_iou_threshold(mut self, threshold: f32) -> Self {
    self.iou_threshold = threshold;
    self
  }

  pub fn with_nms(mut self, nms: NmsMode) -> Self {
    self.nms = nms;
    self
  }

  pub fn with_labels(mut self, labels: LabelTable) -> Self {
    self.labels = labels;
    self
  }
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use super::*;

  #[test]
  fn defaults_match_vehicle_model() {
    let config = DetectConfig::default();
    assert_eq!(config.input_side, 640);
    assert_eq!(config.num_classes, 11);
    assert_eq!(config.confidence_threshold, 0.45);
    assert_eq!(config.iou_threshold, 0.45);
    assert_eq!(config.nms, NmsMode::ClassAgnostic);
    assert_eq!(config.labels.get(3), Some("Bus"));
    assert!(config.validate().is_ok());
  }

  #[test]
  fn open_fills_missing_fields_with_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
      file,
      r#"{{ "confidence_threshold": 0.3, "nms": "per_class", "labels": {{ "0": "car" }} }}"#
    )
    .unwrap();

    let config = DetectConfig::open(file.path()).unwrap();
    assert_eq!(config.confidence_threshold, 0.3);
    assert_eq!(config.iou_threshold, DEFAULT_IOU_THRESHOLD);
    assert_eq!(config.input_side, DEFAULT_INPUT_SIDE);
    assert_eq!(config.nms, NmsMode::PerClass);
    assert_eq!(config.labels.len(), 1);
  }

  #[test]
  fn open_rejects_out_of_range_threshold() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{ "iou_threshold": 1.5 }}"#).unwrap();

    let err = DetectConfig::open(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
  }

  #[test]
  fn validate_rejects_zero_side() {
    let config = DetectConfig::default().with_input_side(0);
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
  }

  #[test]
  fn shipped_vehicle_config_parses() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/vehicles.json");
    let config = DetectConfig::open(path).unwrap();
    assert_eq!(config.labels, LabelTable::vehicles());
    assert_eq!(config, DetectConfig::default());
  }
}
