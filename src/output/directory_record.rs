// 该文件是 Cheshu （车数） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU16, Ordering};

use chrono::{Datelike, Local};
use thiserror::Error;
use tracing::debug;

use crate::{
  FromUrl, FromUrlWithScheme,
  input::Frame,
  model::DetectionResult,
  output::{Render, draw::Record},
  url_to_path,
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("路径解码错误: {0}")]
  PathError(#[from] std::string::FromUtf8Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("未知的记录方式: {0}，可选 json、txt、id")]
  UnknownRecordKind(String),
}

/// 每帧写入的内容
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
  /// 仅保存标注图像
  Draw,
  /// 标注图像加同名 JSON 报告
  Json,
  /// 原始图像加同名文本记录
  Text { label_with_name: bool },
}

impl RecordKind {
  fn from_query(value: &str) -> Result<Self, DirectoryRecordOutputError> {
    match value {
      "json" => Ok(RecordKind::Json),
      "txt" => Ok(RecordKind::Text {
        label_with_name: true,
      }),
      "id" => Ok(RecordKind::Text {
        label_with_name: false,
      }),
      other => Err(DirectoryRecordOutputError::UnknownRecordKind(
        other.to_string(),
      )),
    }
  }

  fn save_result(
    &self,
    path: &Path,
    frame: &Frame,
    result: &DetectionResult,
  ) -> Result<(), DirectoryRecordOutputError> {
    match self {
      RecordKind::Draw => {
        result.image.save(path)?;
      }
      RecordKind::Json => {
        result.image.save(path)?;
        let report = serde_json::to_string_pretty(&result.report())?;
        std::fs::write(path.with_extension("json"), report)?;
      }
      RecordKind::Text { label_with_name } => {
        frame.image.save(path)?;
        Record {
          label_with_name: *label_with_name,
        }
        .record(&result.items, path)?;
      }
    }

    Ok(())
  }
}

/// 按日期分目录保存每帧结果，默认跳过没有检测到车辆的帧
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  kind: RecordKind,
  frame_counter: AtomicU16,
  always: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch(
        uri.scheme().to_string(),
      ));
    }

    let kind = uri
      .query_pairs()
      .find(|(k, _)| k == "record")
      .map(|(_, v)| RecordKind::from_query(&v))
      .transpose()?
      .unwrap_or(RecordKind::Draw);
    let always = uri.query_pairs().any(|(k, _)| k == "always");

    Ok(Self::new(url_to_path(uri)?, kind).with_always(always))
  }
}

impl DirectoryRecordOutput {
  pub fn new(directory: impl Into<PathBuf>, kind: RecordKind) -> Self {
    DirectoryRecordOutput {
      directory: directory.into(),
      kind,
      frame_counter: AtomicU16::new(0),
      always: false,
    }
  }

  pub fn with_always(mut self, always: bool) -> Self {
    self.always = always;
    self
  }

  fn frame_id(&self) -> u16 {
    self.frame_counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
  }

  fn frame_path(&self, frame: &Frame) -> Result<PathBuf, DirectoryRecordOutputError> {
    let now = Local::now();
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    std::fs::create_dir_all(&directory)?;

    let stem = Path::new(&frame.name)
      .file_stem()
      .map(|stem| stem.to_string_lossy().into_owned())
      .unwrap_or_else(|| "frame".to_string());

    Ok(directory.join(format!(
      "{}-{}-{:04X}.png",
      now.format("%H-%M-%S"),
      stem,
      self.frame_id()
    )))
  }
}

impl Render for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, frame: &Frame, result: &DetectionResult) -> Result<(), Self::Error> {
    if !self.always && result.is_empty() {
      debug!("帧 {} 中没有检测到车辆，跳过记录", frame.name);
      return Ok(());
    }

    let path = self.frame_path(frame)?;
    self.kind.save_result(&path, frame, result)?;
    debug!("记录帧 {} 到 {}", frame.name, path.display());
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::collections::BTreeMap;

  use image::{Rgb, RgbImage};

  use super::*;
  use crate::model::{BBox, DetectItem};

  fn files_with_extension(dir: &Path, ext: &str) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir).unwrap() {
      let path = entry.unwrap().path();
      if path.is_dir() {
        found.extend(files_with_extension(&path, ext));
      } else if path.extension().is_some_and(|e| e == ext) {
        found.push(path);
      }
    }
    found
  }

  fn frame() -> Frame {
    Frame {
      name: "street.jpg".to_string(),
      image: RgbImage::from_pixel(8, 8, Rgb([0, 0, 255])),
    }
  }

  fn result_with_bus() -> DetectionResult {
    let mut class_counts = BTreeMap::new();
    class_counts.insert("Bus".to_string(), 1);
    DetectionResult {
      image: RgbImage::from_pixel(8, 8, Rgb([255, 0, 0])),
      total_count: 1,
      class_counts,
      items: vec![DetectItem {
        label: "Bus".to_string(),
        class_id: 1,
        score: 0.9,
        bbox: BBox::new(1.0, 1.0, 6.0, 6.0),
        track_id: None,
      }]
      .into_boxed_slice(),
    }
  }

  fn empty_result() -> DetectionResult {
    DetectionResult {
      image: RgbImage::new(8, 8),
      total_count: 0,
      class_counts: BTreeMap::new(),
      items: Box::new([]),
    }
  }

  #[test]
  fn parses_query_options() {
    let url = url::Url::parse("folder:///tmp/records?record=json&always").unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();
    assert_eq!(output.kind, RecordKind::Json);
    assert!(output.always);

    let url = url::Url::parse("folder:///tmp/records?record=id").unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();
    assert_eq!(
      output.kind,
      RecordKind::Text {
        label_with_name: false
      }
    );
    assert!(!output.always);

    let url = url::Url::parse("folder:///tmp/records?record=txt").unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();
    assert_eq!(
      output.kind,
      RecordKind::Text {
        label_with_name: true
      }
    );

    let url = url::Url::parse("folder:///tmp/records").unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();
    assert_eq!(output.kind, RecordKind::Draw);
  }

  #[test]
  fn unknown_record_kind_is_rejected() {
    let url = url::Url::parse("folder:///tmp/records?record=jsn").unwrap();
    assert!(matches!(
      DirectoryRecordOutput::from_url(&url),
      Err(DirectoryRecordOutputError::UnknownRecordKind(kind)) if kind == "jsn"
    ));
  }

  #[test]
  fn writes_json_report_next_to_annotated_image() {
    let dir = tempfile::tempdir().unwrap();
    let output = DirectoryRecordOutput::new(dir.path(), RecordKind::Json);
    output.render_result(&frame(), &result_with_bus()).unwrap();

    let images = files_with_extension(dir.path(), "png");
    assert_eq!(images.len(), 1);
    let saved = image::open(&images[0]).unwrap().to_rgb8();
    assert_eq!(*saved.get_pixel(0, 0), Rgb([255, 0, 0]));

    let reports = files_with_extension(dir.path(), "json");
    assert_eq!(reports.len(), 1);
    let report: serde_json::Value =
      serde_json::from_str(&std::fs::read_to_string(&reports[0]).unwrap()).unwrap();
    assert_eq!(report["total_count"], 1);
    assert_eq!(report["class_counts"]["Bus"], 1);
    assert_eq!(report["detections"][0]["label"], "Bus");
  }

  #[test]
  fn text_record_keeps_raw_frame() {
    let dir = tempfile::tempdir().unwrap();
    let output = DirectoryRecordOutput::new(
      dir.path(),
      RecordKind::Text {
        label_with_name: true,
      },
    );
    output.render_result(&frame(), &result_with_bus()).unwrap();

    let images = files_with_extension(dir.path(), "png");
    let saved = image::open(&images[0]).unwrap().to_rgb8();
    assert_eq!(*saved.get_pixel(0, 0), Rgb([0, 0, 255]));

    let records = files_with_extension(dir.path(), "txt");
    let text = std::fs::read_to_string(&records[0]).unwrap();
    assert!(text.starts_with("Bus, 0.9000"));
  }

  #[test]
  fn empty_results_are_skipped_unless_always() {
    let dir = tempfile::tempdir().unwrap();
    let output = DirectoryRecordOutput::new(dir.path(), RecordKind::Draw);
    output.render_result(&frame(), &empty_result()).unwrap();
    assert!(files_with_extension(dir.path(), "png").is_empty());

    let output = output.with_always(true);
    output.render_result(&frame(), &empty_result()).unwrap();
    assert_eq!(files_with_extension(dir.path(), "png").len(), 1);
  }

  #[test]
  fn frame_ids_increase() {
    let output = DirectoryRecordOutput::new("/tmp", RecordKind::Draw);
    assert_eq!(output.frame_id(), 1);
    assert_eq!(output.frame_id(), 2);
  }
}
