// 该文件是 Cheshu （车数） 项目的一部分。
// src/tensor.rs - 模型输入/输出张量定义
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

use crate::error::DetectError;

pub const RGB_CHANNELS: usize = 3;

/// 通道平面排布（NCHW，N = 1）的归一化输入张量
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensor {
  data: Box<[f32]>,
  side: usize,
}

impl InputTensor {
  /// 全零张量，边长为 `side`
  pub fn zeros(side: usize) -> Self {
    let data = vec![0f32; RGB_CHANNELS * side * side].into_boxed_slice();
    Self { data, side }
  }

  pub fn from_planar(data: Vec<f32>, side: usize) -> Result<Self, DetectError> {
    let expected = RGB_CHANNELS * side * side;
    if data.len() != expected {
      return Err(DetectError::InvalidShape {
        expected,
        actual: data.len(),
      });
    }

    Ok(Self {
      data: data.into_boxed_slice(),
      side,
    })
  }

  pub fn side(&self) -> usize {
    self.side
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }

  /// 推理引擎声明的输入形状 `[1, 3, S, S]`
  pub fn shape(&self) -> [usize; 4] {
    [1, RGB_CHANNELS, self.side, self.side]
  }

  pub fn plane_size(&self) -> usize {
    self.side * self.side
  }

  /// 第 `channel` 个通道的平面
  pub fn plane(&self, channel: usize) -> &[f32] {
    let size = self.plane_size();
    &self.data[channel * size..(channel + 1) * size]
  }

  pub fn as_slice(&self) -> &[f32] {
    &self.data
  }

  pub fn len(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }
}

impl AsMut<[f32]> for InputTensor {
  fn as_mut(&mut self) -> &mut [f32] {
    &mut self.data
  }
}

/// 推理引擎输出，按属性行优先排布：先是全部候选的属性 0，再是属性 1，依此类推
#[derive(Debug, Clone, PartialEq)]
pub struct RawOutput {
  data: Box<[f32]>,
  shape: Box<[usize]>,
}

impl RawOutput {
  /// `shape` 为引擎报告的形状，通常是 `[1, C, N]`
  pub fn new(data: Vec<f32>, shape: &[usize]) -> Self {
    Self {
      data: data.into_boxed_slice(),
      shape: shape.into(),
    }
  }

  /// 已知 `[C][N]` 布局时直接构造
  pub fn with_layout(data: Vec<f32>, num_attributes: usize, num_candidates: usize) -> Self {
    Self::new(data, &[1, num_attributes, num_candidates])
  }

  pub fn shape(&self) -> &[usize] {
    &self.shape
  }

  /// 候选数 `N`，取形状的最后一维
  pub fn num_candidates(&self) -> usize {
    self.shape.last().copied().unwrap_or(0)
  }

  pub fn as_slice(&self) -> &[f32] {
    &self.data
  }

  pub fn len(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }
}
