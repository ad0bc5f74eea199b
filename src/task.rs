// 该文件是 Cheshu （车数） 项目的一部分。
// src/task.rs - 检测任务
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

use std::collections::{BTreeMap, BTreeSet};
use std::sync::mpsc::Receiver;
use std::{thread, time::Duration};

use tracing::{info, warn};

use crate::{
  detector::Detector,
  input::Frame,
  model::{DetectionResult, Model, Tracker},
  output::Render,
};

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, detector: Detector<M>, output: O) -> Result<Tally, Self::Error>;
}

/// 多帧累计的车辆计数。带跟踪编号的检测按编号去重，同一辆车跨帧只计一次；
/// 没有编号的检测每次都计数
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Tally {
  pub frames: usize,
  /// 各帧检测数之和，不去重
  pub detections: usize,
  track_ids: BTreeMap<String, BTreeSet<u64>>,
  untracked: BTreeMap<String, usize>,
}

impl Tally {
  pub fn add(&mut self, result: &DetectionResult) {
    self.frames += 1;
    self.detections += result.total_count;
    for item in result.items.iter() {
      match item.track_id {
        Some(id) => {
          self
            .track_ids
            .entry(item.label.clone())
            .or_default()
            .insert(id);
        }
        None => *self.untracked.entry(item.label.clone()).or_insert(0) += 1,
      }
    }
  }

  /// 每个类别的车辆数
  pub fn class_counts(&self) -> BTreeMap<String, usize> {
    let mut counts: BTreeMap<String, usize> = self
      .track_ids
      .iter()
      .map(|(label, ids)| (label.clone(), ids.len()))
      .collect();
    for (label, count) in &self.untracked {
      *counts.entry(label.clone()).or_insert(0) += count;
    }
    counts
  }

  pub fn total_count(&self) -> usize {
    self.track_ids.values().map(BTreeSet::len).sum::<usize>() + self.untracked.values().sum::<usize>()
  }

  pub fn summary(&self) -> String {
    let mut lines = vec![
      format!("Frames: {}", self.frames),
      format!("Detections: {}", self.detections),
      format!("Total Vehicles: {}", self.total_count()),
    ];
    lines.extend(
      self
        .class_counts()
        .iter()
        .map(|(label, count)| format!("  {}: {}", label, count)),
    );
    lines.join("\n")
  }
}

fn process_frame<M, O>(
  detector: &mut Detector<M>,
  tracker: &mut Tracker,
  output: &O,
  frame: &Frame,
  tally: &mut Tally,
) -> anyhow::Result<()>
where
  M: Model,
  O: Render,
  O::Error: std::error::Error + Send + Sync + 'static,
{
  let now = std::time::Instant::now();
  let result = detector.detect_tracked(&frame.image, tracker)?;
  let elapsed_a = now.elapsed();
  output.render_result(frame, &result)?;
  let elapsed_b = now.elapsed();
  info!(
    "{}: 检测到 {} 辆车 {:?}, 耗时: {:.2?} / {:.2?}",
    frame.name, result.total_count, result.class_counts, elapsed_a, elapsed_b
  );
  tally.add(&result);
  Ok(())
}

pub struct OneShotTask;

impl<I, M, O> Task<I, M, O> for OneShotTask
where
  I: Iterator<Item = Frame>,
  M: Model,
  O: Render,
  O::Error: std::error::Error + Send + Sync + 'static,
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, mut detector: Detector<M>, output: O) -> Result<Tally, Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧 {} 获取成功，开始检测...", frame.name);

    let mut tally = Tally::default();
    process_frame(
      &mut detector,
      &mut Tracker::default(),
      &output,
      &frame,
      &mut tally,
    )?;

    info!("任务完成");
    Ok(tally)
  }
}

#[derive(Default, Debug)]
pub struct ContinuousTask {
  frame_number: Option<usize>,
  interrupt: bool,
  tracker: Tracker,
}

impl ContinuousTask {
  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }

  pub fn with_tracker(mut self, tracker: Tracker) -> Self {
    self.tracker = tracker;
    self
  }

  /// 安装 Ctrl-C 处理，收到信号后处理完当前帧即退出
  pub fn with_interrupt(mut self, interrupt: bool) -> Self {
    self.interrupt = interrupt;
    self
  }

  fn install_interrupt(&self) -> anyhow::Result<Option<Receiver<()>>> {
    if !self.interrupt {
      return Ok(None);
    }

    let (tx, rx) = std::sync::mpsc::channel();
    ctrlc::set_handler(move || {
      info!("收到中断信号，准备退出...");
      let _ = tx.send(());
      thread::spawn(|| {
        thread::sleep(Duration::from_secs(30));
        warn!("强制退出程序");
        std::process::exit(1);
      });
    })
    .map_err(|err| anyhow::anyhow!("设置 Ctrl-C 处理失败: {}", err))?;
    Ok(Some(rx))
  }
}

impl<I, M, O> Task<I, M, O> for ContinuousTask
where
  I: Iterator<Item = Frame>,
  M: Model,
  O: Render,
  O::Error: std::error::Error + Send + Sync + 'static,
{
  type Error = anyhow::Error;

  fn run_task(mut self, input: I, mut detector: Detector<M>, output: O) -> Result<Tally, Self::Error> {
    info!("开始任务...");
    let rx = self.install_interrupt()?;

    let mut tally = Tally::default();
    for frame in input {
      info!("处理第 {} 帧图像: {}", tally.frames + 1, frame.name);
      process_frame(&mut detector, &mut self.tracker, &output, &frame, &mut tally)?;

      if self.frame_number.is_some_and(|n| tally.frames >= n) {
        info!("达到指定帧数 {}, 退出任务循环", tally.frames);
        break;
      }
      if rx.as_ref().is_some_and(|rx| rx.try_recv().is_ok()) {
        warn!("中断信号接收，退出任务循环");
        break;
      }
    }

    info!(
      "任务完成，共处理 {} 帧，{} 次检测，累计 {} 辆车",
      tally.frames,
      tally.detections,
      tally.total_count()
    );
    Ok(tally)
  }
}
