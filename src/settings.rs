//! 切图设置持久化
//!
//! `GridSettings` 以 pretty JSON 形式保存，字段名与前端保持一致（camelCase）。
//! 文件不存在时返回 `None`，由调用方决定使用默认设置。

use std::fs;
use std::path::Path;

use crate::error::AppError;
use crate::slicer::GridSettings;

pub fn load_grid_settings(path: &Path) -> Result<Option<GridSettings>, AppError> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)?;
    let parsed = serde_json::from_str::<GridSettings>(&content)
        .map_err(|e| AppError::Settings(format!("解析设置文件失败: {}", e)))?;

    Ok(Some(parsed))
}

pub fn save_grid_settings(path: &Path, settings: &GridSettings) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(settings)
        .map_err(|e| AppError::Settings(format!("序列化设置失败: {}", e)))?;

    fs::write(path, content)?;
    Ok(())
}
