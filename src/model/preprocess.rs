// 该文件是 Cheshu （车数） 项目的一部分。
// src/model/preprocess.rs - 图像预处理
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

use image::{RgbImage, imageops::FilterType};
use tracing::debug;

use crate::{error::DetectError, tensor::InputTensor};

/// 将图像缩放到 `side x side`（不保持宽高比，双线性插值），
/// 并转为通道平面排布、归一化到 [0, 1] 的输入张量
pub fn preprocess(image: &RgbImage, side: usize) -> Result<InputTensor, DetectError> {
  let (width, height) = image.dimensions();
  if width == 0 || height == 0 {
    return Err(DetectError::InvalidInput(format!(
      "图像尺寸为 {}x{}",
      width, height
    )));
  }
  if side == 0 {
    return Err(DetectError::InvalidInput("模型输入边长为 0".to_string()));
  }

  let resized = if (width as usize, height as usize) == (side, side) {
    image.clone()
  } else {
    image::imageops::resize(image, side as u32, side as u32, FilterType::Triangle)
  };
  debug!("预处理: {}x{} -> {}x{}", width, height, side, side);

  let mut tensor = InputTensor::zeros(side);
  let plane_size = tensor.plane_size();
  let slice = tensor.as_mut();

  for (i, pixel) in resized.pixels().enumerate() {
    slice[i] = pixel[0] as f32 / 255.0;
    slice[plane_size + i] = pixel[1] as f32 / 255.0;
    slice[2 * plane_size + i] = pixel[2] as f32 / 255.0;
  }

  Ok(tensor)
}
