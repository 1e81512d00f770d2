//! # 打包与下载协作方
//!
//! ## 设计思路
//!
//! 打包格式与下载方式都由外部决定，这里只定义两个接缝：
//!
//! - `ArchiveBuilder`：文件名 → 字节 映射生成压缩包，过程中回报 0~1 进度
//! - `DownloadTrigger`：把压缩包连同建议文件名交给宿主环境
//!
//! 默认提供基于 `zip` crate 的 `ZipArchiveBuilder`：每个文件的 deflate 压缩
//! 在阻塞线程池中完成，进度回调留在调用方任务里触发。

use std::io::{Cursor, Write};

use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

use super::{SliceError, SlicerConfig};

/// 压缩包中的一个文件。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// 压缩包生成器。
///
/// `on_progress` 接收 0~1 的完成比例，可多次调用。
#[allow(async_fn_in_trait)]
pub trait ArchiveBuilder {
    async fn build(
        &self,
        entries: &[ArchiveEntry],
        on_progress: &mut dyn FnMut(f64),
    ) -> Result<Vec<u8>, SliceError>;
}

/// 下载触发器。
pub trait DownloadTrigger {
    fn deliver(&self, archive: Vec<u8>, suggested_name: &str) -> Result<(), SliceError>;
}

/// deflate 压缩的 zip 生成器。
#[derive(Debug, Clone)]
pub struct ZipArchiveBuilder {
    compression_level: i64,
}

impl ZipArchiveBuilder {
    pub fn new(compression_level: i64) -> Self {
        Self {
            compression_level: compression_level.clamp(1, 9),
        }
    }

    pub fn from_config(config: &SlicerConfig) -> Self {
        Self::new(config.archive_compression_level)
    }
}

impl Default for ZipArchiveBuilder {
    fn default() -> Self {
        Self::from_config(&SlicerConfig::default())
    }
}

impl ArchiveBuilder for ZipArchiveBuilder {
    async fn build(
        &self,
        entries: &[ArchiveEntry],
        on_progress: &mut dyn FnMut(f64),
    ) -> Result<Vec<u8>, SliceError> {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(self.compression_level));

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let total = entries.len();

        for (index, entry) in entries.iter().enumerate() {
            let name = entry.name.clone();
            let bytes = entry.bytes.clone();
            writer = run_blocking(move || {
                let fail = |e: &dyn std::fmt::Display| {
                    SliceError::Packaging(format!("写入 {} 失败：{}", name, e))
                };
                writer.start_file(name.as_str(), options).map_err(|e| fail(&e))?;
                writer.write_all(&bytes).map_err(|e| fail(&e))?;
                Ok(writer)
            })
            .await?;

            on_progress((index + 1) as f64 / total as f64);
        }

        let cursor = run_blocking(move || {
            writer
                .finish()
                .map_err(|e| SliceError::Packaging(format!("生成压缩包失败：{}", e)))
        })
        .await?;
        on_progress(1.0);

        Ok(cursor.into_inner())
    }
}

async fn run_blocking<T, F>(task: F) -> Result<T, SliceError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, SliceError> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| SliceError::Packaging(format!("打包任务异常退出：{}", e)))?
}
