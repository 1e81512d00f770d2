//! # 源图加载模块
//!
//! ## 设计思路
//!
//! 解码属于外部协作方，这里提供一个默认实现：
//! 先做体积与文件签名检查，再读 header 尺寸做像素 / 内存上限拦截，
//! 最后才完整解码，降低恶意输入触发高内存开销的风险。
//!
//! ## 实现思路
//!
//! 1. 按来源读取原始字节（文件 / Base64 / 内存）
//! 2. `infer` 校验文件签名确实是图片
//! 3. 读取 header 尺寸，按像素上限与内存上限快速拒绝
//! 4. 完整解码并转换为 RGBA

use std::io::Cursor;
use std::path::Path;
use std::time::Instant;

use base64::{Engine as _, engine::general_purpose};
use image::GenericImageView;

use super::source::{RawImageData, SourceImage, SourceRef};
use super::{SliceError, SlicerConfig};

impl SourceImage {
    /// 从任意来源加载并解码源图。
    ///
    /// # 示例
    /// ```rust,ignore
    /// use image_slicer::slicer::{SlicerConfig, SourceImage, SourceRef};
    ///
    /// let image = SourceImage::load(SourceRef::FilePath("photo.png".into()), &SlicerConfig::default())?;
    /// # Ok::<(), image_slicer::slicer::SliceError>(())
    /// ```
    pub fn load(source: SourceRef, config: &SlicerConfig) -> Result<Self, SliceError> {
        let start = Instant::now();
        let raw = match source {
            SourceRef::FilePath(path) => Self::load_from_file(&path, config)?,
            SourceRef::Base64 { data, name } => RawImageData {
                bytes: Self::parse_base64_with_limit(&data, config.max_file_size)?,
                source_hint: "base64",
                name,
            },
            SourceRef::Bytes { bytes, name } => {
                Self::validate_file_size(bytes.len() as u64, config)?;
                RawImageData {
                    bytes,
                    source_hint: "memory",
                    name,
                }
            }
        };

        let image = Self::decode(raw, config)?;
        log::info!(
            "✅ 源图加载完成 - {}x{} 耗时 {}ms",
            image.width(),
            image.height(),
            start.elapsed().as_millis()
        );
        Ok(image)
    }

    fn load_from_file(path: &Path, config: &SlicerConfig) -> Result<RawImageData, SliceError> {
        log::info!("📁 开始读取本地图片 - 路径: {}", path.display());

        if !path.exists() {
            return Err(SliceError::FileSystem(format!("文件不存在：{}", path.display())));
        }

        let metadata = std::fs::metadata(path)
            .map_err(|e| SliceError::FileSystem(format!("无法读取文件信息：{}", e)))?;
        Self::validate_file_size(metadata.len(), config)?;

        let bytes = std::fs::read(path)
            .map_err(|e| SliceError::FileSystem(format!("无法读取图片文件：{}", e)))?;

        Ok(RawImageData {
            bytes,
            source_hint: "file",
            name: path
                .file_name()
                .and_then(|name| name.to_str())
                .map(str::to_owned),
        })
    }

    fn validate_file_size(len: u64, config: &SlicerConfig) -> Result<(), SliceError> {
        if len > config.max_file_size {
            return Err(SliceError::ResourceLimit(format!(
                "文件过大：{:.2} MB（限制：{:.2} MB）",
                len as f64 / 1024.0 / 1024.0,
                config.max_file_size as f64 / 1024.0 / 1024.0
            )));
        }
        Ok(())
    }

    fn parse_base64_with_limit(data: &str, max_file_size: u64) -> Result<Vec<u8>, SliceError> {
        let normalized = data.trim();

        let payload = if normalized.starts_with("data:image/") {
            let base64_start = normalized
                .find(";base64,")
                .ok_or_else(|| SliceError::InvalidFormat("缺少 base64 标记".to_string()))?;
            &normalized[base64_start + 8..]
        } else {
            normalized
        };

        // 解码前按长度估算上限，避免超大载荷先分配内存
        let estimated_len = (payload.len() as u64).div_ceil(4) * 3;
        if estimated_len > max_file_size {
            return Err(SliceError::ResourceLimit(format!(
                "Base64 预计解码体积过大：{:.2} MB（限制：{:.2} MB）",
                estimated_len as f64 / 1024.0 / 1024.0,
                max_file_size as f64 / 1024.0 / 1024.0
            )));
        }

        general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| SliceError::Decode(format!("Base64 解码失败：{}", e)))
    }

    fn validate_image_signature(bytes: &[u8]) -> Result<(), SliceError> {
        let kind = infer::get(bytes)
            .ok_or_else(|| SliceError::InvalidFormat("无法识别文件类型".to_string()))?;

        if kind.matcher_type() != infer::MatcherType::Image {
            return Err(SliceError::InvalidFormat(format!(
                "不是图片文件：{}",
                kind.mime_type()
            )));
        }
        Ok(())
    }

    fn decode(raw: RawImageData, config: &SlicerConfig) -> Result<Self, SliceError> {
        Self::validate_image_signature(&raw.bytes)?;

        let (header_width, header_height) = Self::inspect_dimensions_from_memory(&raw.bytes)?;
        Self::validate_pixel_limits(config, header_width, header_height)?;

        let decoded = image::load_from_memory(&raw.bytes)
            .map_err(|e| SliceError::Decode(format!("图片解码失败：{}", e)))?;

        let (width, height) = decoded.dimensions();
        Self::validate_pixel_limits(config, width, height)?;

        log::debug!(
            "🖼️ 解码成功 - 来源: {} 名称: {:?} 尺寸: {}x{}",
            raw.source_hint,
            raw.name,
            width,
            height
        );

        Self::from_dynamic(raw.name, decoded)
    }

    /// 仅通过图片头信息读取宽高，用于完整解码前的上限检查。
    fn inspect_dimensions_from_memory(bytes: &[u8]) -> Result<(u32, u32), SliceError> {
        image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| SliceError::InvalidFormat(format!("无法识别图片格式：{}", e)))?
            .into_dimensions()
            .map_err(|e| SliceError::InvalidFormat(format!("无法读取图片尺寸：{}", e)))
    }

    /// 校验像素数量与预计解码内存是否超过配置上限。
    fn validate_pixel_limits(
        config: &SlicerConfig,
        width: u32,
        height: u32,
    ) -> Result<(), SliceError> {
        let pixels = width as u64 * height as u64;
        if pixels > config.max_decoded_pixels {
            return Err(SliceError::ResourceLimit(format!(
                "图片像素过大：{} 像素（限制：{} 像素）",
                pixels, config.max_decoded_pixels
            )));
        }

        let estimated = pixels * 4;
        if estimated > config.max_decoded_bytes {
            return Err(SliceError::ResourceLimit(format!(
                "图片解码预计内存过大：{:.2} MB（限制：{:.2} MB）",
                estimated as f64 / 1024.0 / 1024.0,
                config.max_decoded_bytes as f64 / 1024.0 / 1024.0
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageBuffer, ImageFormat, Rgba};

    fn create_png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            Rgba([(x % 255) as u8, (y % 255) as u8, 0, 255])
        });
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut cursor, ImageFormat::Png)
            .expect("failed to encode test image");
        cursor.into_inner()
    }

    #[test]
    fn loads_bytes_with_name() {
        let image = SourceImage::load(
            SourceRef::Bytes {
                bytes: create_png_bytes(12, 8),
                name: Some("cat.png".into()),
            },
            &SlicerConfig::default(),
        )
        .expect("png should decode");

        assert_eq!((image.width(), image.height()), (12, 8));
        assert_eq!(image.name(), Some("cat.png"));
    }

    #[test]
    fn loads_data_url() {
        let encoded = general_purpose::STANDARD.encode(create_png_bytes(4, 4));
        let image = SourceImage::load(
            SourceRef::Base64 {
                data: format!("data:image/png;base64,{}", encoded),
                name: None,
            },
            &SlicerConfig::default(),
        )
        .expect("data url should decode");

        assert_eq!(image.width(), 4);
        assert_eq!(image.name(), None);
    }

    #[test]
    fn file_name_becomes_source_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("holiday.photo.png");
        std::fs::write(&path, create_png_bytes(3, 5)).expect("write png");

        let image = SourceImage::load(SourceRef::FilePath(path), &SlicerConfig::default())
            .expect("file should decode");

        assert_eq!(image.name(), Some("holiday.photo.png"));
    }

    #[test]
    fn missing_file_is_file_system_error() {
        let result = SourceImage::load(
            SourceRef::FilePath("/definitely/not/here.png".into()),
            &SlicerConfig::default(),
        );
        assert!(matches!(result, Err(SliceError::FileSystem(_))));
    }

    #[test]
    fn rejects_non_image_bytes() {
        let result = SourceImage::load(
            SourceRef::Bytes {
                bytes: b"just some text, not a picture".to_vec(),
                name: None,
            },
            &SlicerConfig::default(),
        );
        assert!(matches!(result, Err(SliceError::InvalidFormat(_))));
    }

    #[test]
    fn rejects_too_many_pixels() {
        let config = SlicerConfig {
            max_decoded_pixels: 100,
            ..SlicerConfig::default()
        };
        let result = SourceImage::load(
            SourceRef::Bytes {
                bytes: create_png_bytes(20, 20),
                name: None,
            },
            &config,
        );
        assert!(matches!(result, Err(SliceError::ResourceLimit(_))));
    }

    #[test]
    fn base64_limit_is_checked_before_decode() {
        let huge = "A".repeat(1024 * 1024);
        let result = SourceImage::parse_base64_with_limit(&huge, 32);
        assert!(matches!(result, Err(SliceError::ResourceLimit(_))));
    }

    #[test]
    fn zero_sized_pixels_are_rejected() {
        let result = SourceImage::new(None, image::RgbaImage::new(0, 10));
        assert!(matches!(result, Err(SliceError::Decode(_))));
    }
}
