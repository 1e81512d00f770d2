//! # 数据源与中间模型
//!
//! - `SourceRef` 表示外部来源语义（文件 / Base64 / 内存字节）
//! - `RawImageData` 表示已加载但未解码的字节
//! - `SourceImage` 表示已解码、只读的源图

use std::path::PathBuf;

use image::{DynamicImage, RgbaImage};

use super::SliceError;

/// 源图片来源。
pub enum SourceRef {
    /// 本地文件路径，文件名作为源名称。
    FilePath(PathBuf),
    /// Base64（支持 Data URL 与纯 Base64 字符串）。
    Base64 { data: String, name: Option<String> },
    /// 已在内存中的编码字节。
    Bytes { bytes: Vec<u8>, name: Option<String> },
}

/// 加载阶段输出：原始字节与来源标识。
pub(crate) struct RawImageData {
    pub(crate) bytes: Vec<u8>,
    /// 来源提示（用于日志与诊断）。
    pub(crate) source_hint: &'static str,
    pub(crate) name: Option<String>,
}

/// 解码后的源图。切图流程只读取，不修改。
#[derive(Debug, Clone)]
pub struct SourceImage {
    name: Option<String>,
    pixels: RgbaImage,
}

impl SourceImage {
    /// 由 RGBA 像素构造；宽或高为 0 时视为解码失败。
    pub fn new(name: Option<String>, pixels: RgbaImage) -> Result<Self, SliceError> {
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(SliceError::Decode(format!(
                "图片尺寸无效：{}x{}",
                pixels.width(),
                pixels.height()
            )));
        }
        Ok(Self { name, pixels })
    }

    pub fn from_dynamic(name: Option<String>, image: DynamicImage) -> Result<Self, SliceError> {
        Self::new(name, image.into_rgba8())
    }

    /// 原始文件名（含扩展名），无名称时为 `None`。
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}
