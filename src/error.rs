//! 统一错误类型模块
//!
//! # 设计思路
//!
//! `SliceError` 描述切图链路本身的失败；`AppError` 在其之上再叠加
//! 设置持久化与文件系统错误，作为宿主侧（UI / IPC）统一面对的错误类型。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `SliceError` / `std::io::Error` 提供 `From` 转换，无需手动 map。
//! - 实现 `Serialize` 将错误序列化为字符串，方便直接回传前端。

use serde::Serialize;

use crate::slicer::SliceError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 切图流水线错误（解码 / 绘制 / 打包 / 下载）
    #[error("{0}")]
    Slice(#[from] SliceError),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 设置文件解析 / 序列化失败
    #[error("设置错误: {0}")]
    Settings(String),
}

/// 将错误序列化为人类可读的字符串。
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
