//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中到 `SlicerConfig`：解码上限、画布上限、重采样滤镜、
//! 有损编码质量与压缩等级。性能档位（quality / balanced / speed）作为高层语义，
//! 映射到滤镜与压缩等级的组合。
//!
//! ## 实现思路
//!
//! - `Default` 提供与前端一致的默认值（有损质量 0.92）。
//! - `SlicerPerformanceProfile` 负责档位字符串解析与反向输出。
//! - `apply_performance_profile` / `infer_performance_profile` 成对出现，保证可往返。

use image::imageops::FilterType;

use super::SliceError;

/// 切图处理配置。
#[derive(Debug, Clone)]
pub struct SlicerConfig {
    /// 读取源文件时允许的最大体积（字节）。
    pub max_file_size: u64,
    /// 解码后的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
    /// 解码阶段允许的预计内存上限（按 RGBA 估算，字节）。
    pub max_decoded_bytes: u64,
    /// 视口画布 / 切片画布允许的最大像素数，超出视为画布无法创建。
    pub max_surface_pixels: u64,
    /// 单次划分允许的最大区域数。
    pub max_regions: u64,
    /// 绘制与切片时的重采样滤镜。
    pub resample_filter: FilterType,
    /// jpg / webp 的编码质量（0~1）。
    pub lossy_quality: f32,
    /// zip 压缩等级（deflate 1~9）。
    pub archive_compression_level: i64,
}

impl Default for SlicerConfig {
    fn default() -> Self {
        Self {
            max_file_size: 50 * 1024 * 1024,
            max_decoded_pixels: 40_000_000,
            max_decoded_bytes: 160 * 1024 * 1024,
            max_surface_pixels: 64_000_000,
            max_regions: 10_000,
            resample_filter: FilterType::Triangle,
            lossy_quality: 0.92,
            archive_compression_level: 6,
        }
    }
}

/// 切图性能档位。
///
/// - `Quality`：Lanczos3 重采样 + 最高压缩
/// - `Balanced`：双线性 + 默认压缩
/// - `Speed`：最近邻 + 最低压缩
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlicerPerformanceProfile {
    Quality,
    Balanced,
    Speed,
}

impl SlicerPerformanceProfile {
    /// 从外部字符串解析档位。
    ///
    /// # 示例
    /// ```rust
    /// use image_slicer::slicer::SlicerPerformanceProfile;
    ///
    /// let p = SlicerPerformanceProfile::from_str("balanced")?;
    /// assert_eq!(p.as_str(), "balanced");
    /// # Ok::<(), image_slicer::slicer::SliceError>(())
    /// ```
    pub fn from_str(profile: &str) -> Result<Self, SliceError> {
        match profile.trim().to_lowercase().as_str() {
            "quality" => Ok(Self::Quality),
            "balanced" => Ok(Self::Balanced),
            "speed" => Ok(Self::Speed),
            other => Err(SliceError::InvalidSettings(format!(
                "未知性能档位：{}（可选：quality / balanced / speed）",
                other
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quality => "quality",
            Self::Balanced => "balanced",
            Self::Speed => "speed",
        }
    }
}

impl SlicerConfig {
    /// 基于当前参数反推性能档位。
    pub(crate) fn infer_performance_profile(&self) -> SlicerPerformanceProfile {
        match self.resample_filter {
            FilterType::Lanczos3 | FilterType::CatmullRom
                if self.archive_compression_level >= 9 =>
            {
                SlicerPerformanceProfile::Quality
            }
            FilterType::Nearest => SlicerPerformanceProfile::Speed,
            _ if self.archive_compression_level <= 1 => SlicerPerformanceProfile::Speed,
            _ => SlicerPerformanceProfile::Balanced,
        }
    }

    /// 应用指定性能档位到实际参数。
    pub(crate) fn apply_performance_profile(&mut self, profile: SlicerPerformanceProfile) {
        match profile {
            SlicerPerformanceProfile::Quality => {
                self.resample_filter = FilterType::Lanczos3;
                self.archive_compression_level = 9;
            }
            SlicerPerformanceProfile::Balanced => {
                self.resample_filter = FilterType::Triangle;
                self.archive_compression_level = 6;
            }
            SlicerPerformanceProfile::Speed => {
                self.resample_filter = FilterType::Nearest;
                self.archive_compression_level = 1;
            }
        }
    }

    /// jpg / webp 编码使用的 1~100 质量值。
    pub(crate) fn quality_percent(&self) -> u8 {
        (self.lossy_quality * 100.0).round().clamp(1.0, 100.0) as u8
    }
}
