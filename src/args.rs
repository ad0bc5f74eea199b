// 该文件是 Cheshu （车数） 项目的一部分。
// src/args.rs - 命令行参数配置
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

use std::path::PathBuf;

use clap::Parser;
use url::Url;

use crate::config::{ConfigError, DetectConfig, NmsMode};

/// Cheshu 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// ONNX 模型，例如 onnx:///models/best.onnx?threads=4
  #[arg(long, value_name = "MODEL")]
  pub model: Url,

  /// 输入来源
  /// 支持格式:
  /// - 单张图片: image:///data/street.jpg
  /// - 图片目录: folder:///data/frames
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 输出路径
  /// 支持格式:
  /// - 图片: image:///data/street-out.png
  /// - 目录: folder:///data/records[?record=json|txt|id][&always]
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,

  /// JSON 配置文件，缺省使用内置车辆配置
  #[arg(long, value_name = "CONFIG")]
  pub config: Option<PathBuf>,

  /// 覆盖置信度阈值 (0.0 - 1.0)
  #[arg(long, value_name = "THRESHOLD")]
  pub confidence: Option<f32>,

  /// 覆盖 NMS IoU 阈值 (0.0 - 1.0)
  #[arg(long, value_name = "THRESHOLD")]
  pub iou: Option<f32>,

  /// 按类别分别做 NMS
  #[arg(long)]
  pub per_class: bool,

  /// 最大处理帧数（仅对连续任务有效）
  #[arg(long, value_name = "FRAME_NUMBER")]
  pub frame_number: Option<usize>,
}

impl Args {
  /// 加载配置文件（若有），再叠加命令行覆盖项并校验
  pub fn detect_config(&self) -> Result<DetectConfig, ConfigError> {
    let mut config = match &self.config {
      Some(path) => DetectConfig::open(path)?,
      None => DetectConfig::default(),
    };
    if let Some(threshold) = self.confidence {
      config = config.with_confidence_threshold(threshold);
    }
    if let Some(threshold) = self.iou {
      config = config.with_iou_threshold(threshold);
    }
    if self.per_class {
      config = config.with_nms(NmsMode::PerClass);
    }
    config.validate()?;
    Ok(config)
  }
}
