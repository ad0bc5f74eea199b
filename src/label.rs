// 该文件是 Cheshu （车数） 项目的一部分。
// src/label.rs - 类别标签表
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

use serde::{Deserialize, Serialize};

/// 标签表中查不到类别时使用的标签
pub const UNKNOWN_LABEL: &str = "Unknown";

/// 车辆数据集类别名称
pub const VEHICLE_CLASSES: [&str; 11] = [
  "Auto Rickshaw",
  "Cycle Rickshaw",
  "CNG/Tempo",
  "Bus",
  "Jeep/SUV",
  "Microbus",
  "Minibus",
  "Motorcycle",
  "Truck",
  "Private Sedan Car",
  "Trailer",
];

/// 类别 ID 到可读标签的映射，加载后只读
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelTable {
  labels: BTreeMap<u32, String>,
}

impl Default for LabelTable {
  fn default() -> Self {
    Self::vehicles()
  }
}

impl LabelTable {
  pub fn vehicles() -> Self {
    Self::from_names(VEHICLE_CLASSES)
  }

  /// 按顺序为名称分配 0..K 的类别 ID
  pub fn from_names<I, S>(names: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let labels = names
      .into_iter()
      .enumerate()
      .map(|(id, name)| (id as u32, name.into()))
      .collect();
    Self { labels }
  }

  pub fn get(&self, class_id: u32) -> Option<&str> {
    self.labels.get(&class_id).map(String::as_str)
  }

  /// 查不到时返回 [`UNKNOWN_LABEL`]
  pub fn label_or_unknown(&self, class_id: u32) -> &str {
    self.get(class_id).unwrap_or(UNKNOWN_LABEL)
  }

  pub fn len(&self) -> usize {
    self.labels.len()
  }

  pub fn is_empty(&self) -> bool {
    self.labels.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
    self.labels.iter().map(|(id, name)| (*id, name.as_str()))
  }
}

impl FromIterator<(u32, String)> for LabelTable {
  fn from_iter<T: IntoIterator<Item = (u32, String)>>(iter: T) -> Self {
    Self {
      labels: iter.into_iter().collect(),
    }
  }
}
