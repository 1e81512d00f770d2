//! # 进度与导出状态模块
//!
//! ## 设计思路
//!
//! 进度区间固定划分：切片阶段 0~50，打包前强制跳到 60，打包阶段 60~100。
//! `ProgressReporter` 保证回调收到的值单调不减，且落在 0~100 内。
//! `ExportState` 记录状态机 `Idle → Running → Completed | Failed`，
//! 供宿主侧展示“正在处理 / 进度 / 错误信息”。

/// 切片阶段结束时的进度值。
pub const SLICING_DONE: u8 = 50;
/// 交给打包器前强制上报的进度值。
pub const PACKAGING_START: u8 = 60;
pub const COMPLETE: u8 = 100;

const PACKAGING_SPAN: f64 = (COMPLETE - PACKAGING_START) as f64;

/// 单调进度上报器。
pub(crate) struct ProgressReporter<'a> {
    callback: &'a mut dyn FnMut(u8),
    last: u8,
}

impl<'a> ProgressReporter<'a> {
    pub(crate) fn new(callback: &'a mut dyn FnMut(u8)) -> Self {
        Self { callback, last: 0 }
    }

    pub(crate) fn report(&mut self, percent: u8) -> u8 {
        let value = percent.min(COMPLETE).max(self.last);
        self.last = value;
        (self.callback)(value);
        value
    }

    /// 切片阶段：`round(done / total * 50)`。
    pub(crate) fn report_slice(&mut self, done: usize, total: usize) -> u8 {
        self.report(slicing_percent(done, total))
    }

    /// 打包阶段：`60 + round(p * 40)`。
    pub(crate) fn report_packaging(&mut self, fraction: f64) -> u8 {
        self.report(packaging_percent(fraction))
    }
}

pub fn slicing_percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return SLICING_DONE;
    }
    let ratio = (done.min(total) as f64) / total as f64;
    (ratio * SLICING_DONE as f64).round() as u8
}

pub fn packaging_percent(fraction: f64) -> u8 {
    let fraction = if fraction.is_finite() { fraction.clamp(0.0, 1.0) } else { 0.0 };
    PACKAGING_START + (fraction * PACKAGING_SPAN).round() as u8
}

/// 运行中的子阶段。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunningPhase {
    Slicing,
    Packaging,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExportPhase {
    #[default]
    Idle,
    Running(RunningPhase),
    Completed,
    Failed(String),
}

/// 导出状态快照。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExportState {
    pub phase: ExportPhase,
    pub progress: u8,
}

impl ExportState {
    pub fn is_processing(&self) -> bool {
        matches!(self.phase, ExportPhase::Running(_))
    }

    pub fn error(&self) -> Option<&str> {
        match &self.phase {
            ExportPhase::Failed(message) => Some(message),
            _ => None,
        }
    }

    pub(crate) fn start(&mut self) {
        self.phase = ExportPhase::Running(RunningPhase::Slicing);
        self.progress = 0;
    }

    pub(crate) fn enter_packaging(&mut self) {
        self.phase = ExportPhase::Running(RunningPhase::Packaging);
    }

    /// 失败时保留已达到的进度。
    pub(crate) fn fail(&mut self, message: String) {
        self.phase = ExportPhase::Failed(message);
    }

    pub(crate) fn complete(&mut self) {
        self.phase = ExportPhase::Completed;
        self.progress = COMPLETE;
    }
}
