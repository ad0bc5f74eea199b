// 该文件是 Cheshu （车数） 项目的一部分。
// src/output/draw.rs - 目标检测结果可视化
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

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size},
  rect::Rect,
};
use thiserror::Error;

use crate::{config::DEFAULT_NUM_CLASSES, model::DetectItem};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 20.0;
const LABEL_TEXT_PADDING: i32 = 2;
const BOX_THICKNESS: i32 = 2;
const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

#[derive(Error, Debug)]
pub enum DrawError {
  #[error("无法加载字体: {0}")]
  InvalidFont(#[from] ab_glyph::InvalidFont),
}

/// 检测标签文本，例如 `Bus 90%`
pub fn label_text(label: &str, score: f32) -> String {
  format!("{} {}%", label, (score * 100.0).round() as i32)
}

/// 带跟踪编号的标签文本，例如 `Bus ID:7 90%`
pub fn tracked_label_text(label: &str, track_id: u64, score: f32) -> String {
  format!("{} ID:{} {}%", label, track_id, (score * 100.0).round() as i32)
}

/// 在图像上绘制检测框与标签
#[derive(Clone)]
pub struct Draw {
  font: FontArc,
  font_scale: PxScale,
  thickness: i32,
  colors: Vec<Rgb<u8>>,
}

impl Draw {
  pub fn new() -> Result<Self, DrawError> {
    let font_data: &'static [u8] = include_bytes!("../../assets/DejaVuSans.ttf");
    let font = FontArc::try_from_slice(font_data)?;

    Ok(Self {
      font,
      font_scale: PxScale::from(LABEL_FONT_SIZE),
      thickness: BOX_THICKNESS,
      colors: palette(DEFAULT_NUM_CLASSES),
    })
  }

  /// 每个类别一种颜色，共 `num_classes` 种
  pub fn with_palette(mut self, num_classes: usize) -> Self {
    self.colors = palette(num_classes.max(1));
    self
  }

  pub fn with_font_size(mut self, size: f32) -> Self {
    self.font_scale = PxScale::from(size);
    self
  }

  pub fn color(&self, class_id: u32) -> Rgb<u8> {
    self.colors[class_id as usize % self.colors.len()]
  }

  pub fn draw_items(&self, image: &mut RgbImage, items: &[DetectItem]) {
    for item in items {
      self.draw_item(image, item);
    }
  }

  /// 绘制单个检测，坐标为原图空间，超出图像的部分被裁剪。
  /// 框被裁剪成退化形状时只画边框可见的部分，标签总是绘制
  pub fn draw_item(&self, image: &mut RgbImage, item: &DetectItem) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    if w == 0 || h == 0 {
      return;
    }

    let x_min = (item.bbox.x1.floor() as i32).clamp(0, w - 1);
    let y_min = (item.bbox.y1.floor() as i32).clamp(0, h - 1);
    let x_max = (item.bbox.x2.ceil() as i32).clamp(0, w - 1);
    let y_max = (item.bbox.y2.ceil() as i32).clamp(0, h - 1);

    let color = self.color(item.class_id);

    // 边框加粗，由外向内逐层绘制
    if x_min < x_max && y_min < y_max {
      for t in 0..self.thickness {
        let rect_w = x_max - x_min + 1 - 2 * t;
        let rect_h = y_max - y_min + 1 - 2 * t;
        if rect_w <= 0 || rect_h <= 0 {
          break;
        }
        let rect = Rect::at(x_min + t, y_min + t).of_size(rect_w as u32, rect_h as u32);
        draw_hollow_rect_mut(image, rect, color);
      }
    }

    let text = match item.track_id {
      Some(id) => tracked_label_text(&item.label, id, item.score),
      None => label_text(&item.label, item.score),
    };
    let (text_w, text_h) = text_size(self.font_scale, &self.font, &text);
    let label_w = (text_w as i32 + 2 * LABEL_TEXT_PADDING).min(w);
    let label_h = (text_h as i32 + 2 * LABEL_TEXT_PADDING).min(h);

    // 标签放在框的左上角上方，放不下时贴住图像边缘
    let label_x = x_min.min(w - label_w);
    let label_y = (y_min - label_h).max(0);

    if label_w > 0 && label_h > 0 {
      let rect = Rect::at(label_x, label_y).of_size(label_w as u32, label_h as u32);
      draw_filled_rect_mut(image, rect, color);
      draw_text_mut(
        image,
        TEXT_COLOR,
        label_x + LABEL_TEXT_PADDING,
        label_y + LABEL_TEXT_PADDING,
        self.font_scale,
        &self.font,
        &text,
      );
    }
  }
}

fn palette(n: usize) -> Vec<Rgb<u8>> {
  (0..n)
    .map(|i| {
      let hue = (i as f32 / n as f32) * 360.0;
      hsv_to_rgb(hue, 0.8, 0.9)
    })
    .collect()
}

fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Rgb<u8> {
  let c = v * s;
  let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
  let m = v - c;

  let (r, g, b) = if h < 60.0 {
    (c, x, 0.0)
  } else if h < 120.0 {
    (x, c, 0.0)
  } else if h < 180.0 {
    (0.0, c, x)
  } else if h < 240.0 {
    (0.0, x, c)
  } else if h < 300.0 {
    (x, 0.0, c)
  } else {
    (c, 0.0, x)
  };

  Rgb([
    ((r + m) * 255.0) as u8,
    ((g + m) * 255.0) as u8,
    ((b + m) * 255.0) as u8,
  ])
}

/// 以文本形式记录检测结果，每行 `label, score, x1, y1, x2, y2`
pub struct Record {
  pub label_with_name: bool,
}

impl Record {
  pub fn lines(&self, items: &[DetectItem]) -> Vec<String> {
    items
      .iter()
      .map(|item| {
        let name = if self.label_with_name {
          item.label.clone()
        } else {
          item.class_id.to_string()
        };
        format!(
          "{}, {:.4}, {:.1}, {:.1}, {:.1}, {:.1}",
          name, item.score, item.bbox.x1, item.bbox.y1, item.bbox.x2, item.bbox.y2
        )
      })
      .collect()
  }

  pub fn record(&self, items: &[DetectItem], path: &std::path::Path) -> Result<(), std::io::Error> {
    std::fs::write(path.with_extension("txt"), self.lines(items).join("\n"))
  }
}
