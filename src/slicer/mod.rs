//! # 切图模块（slicer）
//!
//! ## 设计思路
//!
//! 将“源图加载 → 视口与摆放 → 区域划分 → 边距内缩 → 采样编码 → 打包下载”
//! 按职责拆分为多个子模块，避免单文件膨胀与耦合。
//!
//! - `handler`：编排整条导出流水线（状态机 + 进度 + 阶段耗时日志）
//! - `geometry`：视口解析与摆放计算（纯函数）
//! - `partition`：网格 / 分割线区域划分与选择解析
//! - `padding`：边距内缩与输出尺寸取整
//! - `pipeline`：视口绘制、切片采样与编码
//! - `archive`：打包 / 下载接缝与默认 zip 实现
//! - `loader`：文件 / Base64 / 内存字节的加载与安全校验
//! - `config/error/types/source/progress`：配置、错误、参数模型、中间数据、进度
//!
//! ## 新同事快速上手
//!
//! ```text
//! SliceHandler::export
//!    ↓
//! geometry.rs（resolve_viewport + compute_placement）
//!    ↓
//! pipeline.rs（render_viewport，只绘制一次）
//!    ↓
//! partition.rs（partition + Selection::resolve）
//!    ↓  逐个区域串行
//! padding.rs → pipeline.rs（extract + encode_slice）
//!    ↓
//! archive.rs（ArchiveBuilder → DownloadTrigger）
//! ```

mod archive;
mod config;
mod error;
mod geometry;
mod handler;
mod loader;
mod padding;
mod partition;
mod pipeline;
mod progress;
mod source;
mod types;

pub use archive::{ArchiveBuilder, ArchiveEntry, DownloadTrigger, ZipArchiveBuilder};
pub use config::{SlicerConfig, SlicerPerformanceProfile};
pub use error::SliceError;
pub use geometry::{Placement, Transform, Viewport, compute_placement, resolve_viewport};
pub use handler::{
    ExportReport, FALLBACK_BASE_NAME, OutputSlice, SliceHandler, archive_file_name,
    file_base_name, slice_file_name,
};
pub use padding::{ExtractionRect, OutputSize, PaddedRegion, SizeRounding, apply_padding};
pub use partition::{Region, Selection, grid_regions, line_regions, partition};
pub use pipeline::{SliceExtractor, encode_slice};
pub use progress::{
    ExportPhase, ExportState, RunningPhase, packaging_percent, slicing_percent,
};
pub use source::{SourceImage, SourceRef};
pub use types::{
    CropMode, ExportFormat, GridSettings, PaddingSpec, SplitLine, SplitMode, SquareFit,
};
