//! # 图片切图工具 — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │          宿主（UI 状态 / 选择 / 进度条渲染）              │
//! │   GridSettings ── Selection ── on_progress(0..=100)       │
//! └───────┬──────────────────────────────────────────────────┘
//!         ↓ SliceHandler::export (Result<ExportReport, SliceError>)
//! ┌───────┴──────────────────────────────────────────────────┐
//! │  ┌─ slicer ───── 视口 · 摆放 · 划分 · 边距 · 采样 · 编码  │
//! │  │   ├─ archive     ArchiveBuilder / DownloadTrigger      │
//! │  │   └─ loader      文件 / Base64 / 字节 解码             │
//! │  │                                                       │
//! │  ├─ error ────── AppError (统一错误类型)                  │
//! │  ├─ settings     GridSettings JSON 持久化                 │
//! │  └─ storage      DirectoryDownload (落盘)                 │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`slicer`] | 切图流水线与导出编排 |
//! | [`error`] | 统一错误类型 `AppError` |
//! | [`settings`] | 切图设置的读取与保存 |
//! | [`storage`] | 把压缩包写入本地目录 |

pub mod error;
pub mod settings;
pub mod slicer;
pub mod storage;

/// 初始化 `env_logger`，默认级别 `info`，可通过 `RUST_LOG` 覆盖。
///
/// 重复调用是安全的，之后的调用不会生效。
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
