//! 导出目录管理模块
//!
//! # 设计思路
//!
//! 下载触发器的默认实现：把压缩包写入指定目录。
//!
//! # 实现思路
//!
//! - 目录不存在时自动 `create_dir_all`，避免上层判断。
//! - 建议文件名只取最后一个路径分量，前缀里的 `/` 或 `..` 不会逃出目标目录。
//! - 所有可能失败的操作均返回 `Result`，不使用 `expect()` / `unwrap()`。

use std::fs;
use std::path::{Path, PathBuf};

use crate::slicer::{DownloadTrigger, SliceError};

/// 把压缩包保存到本地目录。
#[derive(Debug, Clone)]
pub struct DirectoryDownload {
    dir: PathBuf,
}

impl DirectoryDownload {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 建议文件名在目标目录下的实际路径。
    pub fn target_path(&self, suggested_name: &str) -> Result<PathBuf, SliceError> {
        let file_name = Path::new(suggested_name)
            .file_name()
            .ok_or_else(|| SliceError::Download(format!("无效的文件名：{}", suggested_name)))?;
        Ok(self.dir.join(file_name))
    }
}

impl DownloadTrigger for DirectoryDownload {
    fn deliver(&self, archive: Vec<u8>, suggested_name: &str) -> Result<(), SliceError> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).map_err(|e| {
                SliceError::Download(format!("创建导出目录 '{}' 失败: {}", self.dir.display(), e))
            })?;
        }

        let path = self.target_path(suggested_name)?;
        fs::write(&path, &archive)
            .map_err(|e| SliceError::Download(format!("写入 '{}' 失败: {}", path.display(), e)))?;

        log::info!("💾 压缩包已保存 - {}（{} bytes）", path.display(), archive.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_directory_and_writes_archive() {
        let root = tempfile::tempdir().expect("tempdir");
        let download = DirectoryDownload::new(root.path().join("exports"));

        download
            .deliver(b"PK".to_vec(), "cat_grid.zip")
            .expect("deliver should succeed");

        let written =
            fs::read(root.path().join("exports").join("cat_grid.zip")).expect("archive exists");
        assert_eq!(written, b"PK");
    }

    #[test]
    fn suggested_name_cannot_escape_directory() {
        let download = DirectoryDownload::new("/tmp/out");
        let path = download.target_path("../../etc/evil_grid.zip").expect("has file name");
        assert_eq!(path, PathBuf::from("/tmp/out/evil_grid.zip"));
    }

    #[test]
    fn empty_name_is_rejected() {
        let download = DirectoryDownload::new("/tmp/out");
        assert!(matches!(download.target_path(".."), Err(SliceError::Download(_))));
    }
}
