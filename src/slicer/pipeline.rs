//! # 绘制与切片流水线模块
//!
//! ## 设计思路
//!
//! 视口画布与切片画布都通过同一个 `draw_image` 完成，语义对齐 Canvas 的
//! `drawImage(src, sx, sy, sw, sh, dx, dy, dw, dh)`：源矩形整体映射到目标矩形，
//! 不做任何留白适配；落在源图之外的部分采样为透明。
//!
//! ## 实现思路
//!
//! 1. 两个矩形先归一化（负宽高翻转为正）
//! 2. 按轴收敛：源矩形裁到源图范围，目标矩形同比例收缩；
//!    目标矩形再裁到画布范围，源矩形反向同步
//! 3. 目标跨度取整到像素，整像素 1:1 时直接拷贝，否则用 `fast_image_resize` 重采样
//!    （失败时回退 `image::imageops`）
//! 4. `imageops::replace` 写回目标画布
//!
//! 画布像素数受 `max_surface_pixels` 约束，超出视为画布无法创建。

use std::io::Cursor;

use fast_image_resize as fr;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops::{self, FilterType};
use image::{ExtendedColorType, ImageEncoder, Rgb, RgbImage, RgbaImage};

use super::geometry::{Placement, Viewport};
use super::padding::{ExtractionRect, PaddedRegion};
use super::source::SourceImage;
use super::types::ExportFormat;
use super::{SliceError, SlicerConfig};

/// `drawImage` 语义下的浮点矩形。
#[derive(Debug, Clone, Copy, PartialEq)]
struct DrawRect {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

impl DrawRect {
    fn sized(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: width as f64,
            height: height as f64,
        }
    }

    fn normalized(self) -> Self {
        let (x, width) = normalize_span(self.x, self.width);
        let (y, height) = normalize_span(self.y, self.height);
        Self { x, y, width, height }
    }

    fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

fn normalize_span(start: f64, len: f64) -> (f64, f64) {
    if len < 0.0 { (start + len, -len) } else { (start, len) }
}

impl From<Placement> for DrawRect {
    fn from(placement: Placement) -> Self {
        Self {
            x: placement.x,
            y: placement.y,
            width: placement.draw_width,
            height: placement.draw_height,
        }
    }
}

impl From<ExtractionRect> for DrawRect {
    fn from(rect: ExtractionRect) -> Self {
        Self {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
        }
    }
}

/// 单轴收敛结果：源区间（浮点）与目标像素区间（整数）。
#[derive(Debug, Clone, Copy, PartialEq)]
struct AxisSpan {
    src_start: f64,
    src_len: f64,
    dst_start: u32,
    dst_len: u32,
}

fn clip_axis(
    src_start: f64,
    src_len: f64,
    dst_start: f64,
    dst_len: f64,
    src_limit: f64,
    dst_limit: f64,
) -> Option<AxisSpan> {
    let scale = dst_len / src_len;

    let s0 = src_start.max(0.0);
    let s1 = (src_start + src_len).min(src_limit);
    if s1 <= s0 {
        return None;
    }
    let d0 = dst_start + (s0 - src_start) * scale;
    let d1 = dst_start + (s1 - src_start) * scale;

    let cd0 = d0.max(0.0);
    let cd1 = d1.min(dst_limit);
    if cd1 <= cd0 {
        return None;
    }
    let cs0 = s0 + (cd0 - d0) / scale;
    let cs1 = s0 + (cd1 - d0) / scale;

    let p0 = cd0.round();
    let p1 = cd1.round();
    if p1 <= p0 {
        return None;
    }

    Some(AxisSpan {
        src_start: cs0,
        src_len: cs1 - cs0,
        dst_start: p0 as u32,
        dst_len: (p1 - p0) as u32,
    })
}

/// 切片提取器。
///
/// 单次导出内独占使用，按顺序逐个生成切片画布。
#[derive(Debug, Clone)]
pub struct SliceExtractor {
    filter: FilterType,
    max_surface_pixels: u64,
}

impl SliceExtractor {
    pub fn new(filter: FilterType, max_surface_pixels: u64) -> Self {
        Self {
            filter,
            max_surface_pixels,
        }
    }

    pub fn from_config(config: &SlicerConfig) -> Self {
        Self::new(config.resample_filter, config.max_surface_pixels)
    }

    /// 将源图按摆放绘制到透明视口画布上。
    pub fn render_viewport(
        &self,
        source: &SourceImage,
        viewport: Viewport,
        placement: Placement,
    ) -> Result<RgbaImage, SliceError> {
        let mut canvas = self.create_surface(viewport.width, viewport.height)?;
        let drawn = self.draw_image(
            &mut canvas,
            source.pixels(),
            DrawRect::sized(source.width(), source.height()),
            placement.into(),
        )?;
        if !drawn {
            log::debug!("🫥 源图完全落在视口之外，视口画布保持透明");
        }
        Ok(canvas)
    }

    /// 从视口画布采样出一个切片画布（尺寸为 `region.output`）。
    pub fn extract(
        &self,
        canvas: &RgbaImage,
        region: &PaddedRegion,
    ) -> Result<RgbaImage, SliceError> {
        let output = region.output;
        let mut surface = self.create_surface(output.width, output.height)?;
        self.draw_image(
            &mut surface,
            canvas,
            region.source.into(),
            DrawRect::sized(output.width, output.height),
        )?;
        Ok(surface)
    }

    fn create_surface(&self, width: u32, height: u32) -> Result<RgbaImage, SliceError> {
        if width == 0 || height == 0 {
            return Err(SliceError::RasterContext(format!(
                "画布尺寸无效：{}x{}",
                width, height
            )));
        }

        let pixels = width as u64 * height as u64;
        if pixels > self.max_surface_pixels {
            return Err(SliceError::RasterContext(format!(
                "画布过大：{}x{}（限制：{} 像素）",
                width, height, self.max_surface_pixels
            )));
        }

        Ok(RgbaImage::new(width, height))
    }

    /// 返回是否实际写入了像素。
    fn draw_image(
        &self,
        dst: &mut RgbaImage,
        src: &RgbaImage,
        src_rect: DrawRect,
        dst_rect: DrawRect,
    ) -> Result<bool, SliceError> {
        let s = src_rect.normalized();
        let d = dst_rect.normalized();
        if s.is_empty() || d.is_empty() {
            return Ok(false);
        }

        let (src_w, src_h) = (src.width() as f64, src.height() as f64);
        let (dst_w, dst_h) = (dst.width() as f64, dst.height() as f64);
        let Some(x) = clip_axis(s.x, s.width, d.x, d.width, src_w, dst_w) else {
            return Ok(false);
        };
        let Some(y) = clip_axis(s.y, s.height, d.y, d.height, src_h, dst_h) else {
            return Ok(false);
        };

        let patch = self.resample(src, x, y)?;
        imageops::replace(dst, &patch, x.dst_start as i64, y.dst_start as i64);
        Ok(true)
    }

    fn resample(&self, src: &RgbaImage, x: AxisSpan, y: AxisSpan) -> Result<RgbaImage, SliceError> {
        let is_copy = x.src_start.fract() == 0.0
            && y.src_start.fract() == 0.0
            && x.src_len == x.dst_len as f64
            && y.src_len == y.dst_len as f64;
        if is_copy {
            return Ok(imageops::crop_imm(
                src,
                x.src_start as u32,
                y.src_start as u32,
                x.dst_len,
                y.dst_len,
            )
            .to_image());
        }

        match self.resize_with_fast_image_resize(src, x, y) {
            Ok(patch) => Ok(patch),
            Err(err) => {
                log::warn!("⚠️ fast_image_resize 重采样失败，回退 image::imageops：{}", err);
                Ok(self.resize_with_imageops(src, x, y))
            }
        }
    }

    fn resize_with_fast_image_resize(
        &self,
        src: &RgbaImage,
        x: AxisSpan,
        y: AxisSpan,
    ) -> Result<RgbaImage, SliceError> {
        let src_image = fr::images::ImageRef::new(
            src.width(),
            src.height(),
            src.as_raw(),
            fr::PixelType::U8x4,
        )
        .map_err(|e| SliceError::RasterContext(format!("构建源图像视图失败：{}", e)))?;

        let mut dst_image = fr::images::Image::new(x.dst_len, y.dst_len, fr::PixelType::U8x4);

        let options = fr::ResizeOptions::new()
            .resize_alg(self.resize_alg())
            .crop(x.src_start, y.src_start, x.src_len, y.src_len);

        let mut resizer = fr::Resizer::new();
        resizer
            .resize(&src_image, &mut dst_image, Some(&options))
            .map_err(|e| SliceError::RasterContext(format!("fast_image_resize 执行失败：{}", e)))?;

        RgbaImage::from_raw(x.dst_len, y.dst_len, dst_image.into_vec())
            .ok_or_else(|| {
                SliceError::RasterContext("fast_image_resize 输出缓冲长度异常".to_string())
            })
    }

    fn resize_with_imageops(&self, src: &RgbaImage, x: AxisSpan, y: AxisSpan) -> RgbaImage {
        let left = x.src_start.floor() as u32;
        let top = y.src_start.floor() as u32;
        let width = ((x.src_start + x.src_len).ceil() as u32).saturating_sub(left).max(1);
        let height = ((y.src_start + y.src_len).ceil() as u32).saturating_sub(top).max(1);

        let cropped = imageops::crop_imm(src, left, top, width, height).to_image();
        imageops::resize(&cropped, x.dst_len, y.dst_len, self.filter)
    }

    fn resize_alg(&self) -> fr::ResizeAlg {
        match self.filter {
            FilterType::Nearest => fr::ResizeAlg::Nearest,
            FilterType::Triangle => fr::ResizeAlg::Convolution(fr::FilterType::Bilinear),
            FilterType::CatmullRom => fr::ResizeAlg::Convolution(fr::FilterType::CatmullRom),
            FilterType::Gaussian => fr::ResizeAlg::Convolution(fr::FilterType::Mitchell),
            FilterType::Lanczos3 => fr::ResizeAlg::Convolution(fr::FilterType::Lanczos3),
        }
    }
}

/// 将切片画布编码为目标格式。
///
/// - png：无损 RGBA，不使用 `quality`
/// - jpg：先与黑色背景合成去掉 alpha，再按 `quality` 编码
/// - webp：`quality < 100` 时先量化 RGB 通道，再交给纯 Rust 编码器
pub fn encode_slice(
    surface: &RgbaImage,
    format: ExportFormat,
    quality: u8,
) -> Result<Vec<u8>, SliceError> {
    let (width, height) = surface.dimensions();
    let mut buffer = Vec::new();

    let result = match format {
        ExportFormat::Png => PngEncoder::new(Cursor::new(&mut buffer)).write_image(
            surface.as_raw(),
            width,
            height,
            ExtendedColorType::Rgba8,
        ),
        ExportFormat::Jpg => {
            let rgb = RgbImage::from_fn(width, height, |px, py| {
                let [r, g, b, a] = surface.get_pixel(px, py).0;
                let over_black = |c: u8| ((c as u16 * a as u16 + 127) / 255) as u8;
                Rgb([over_black(r), over_black(g), over_black(b)])
            });
            JpegEncoder::new_with_quality(Cursor::new(&mut buffer), quality).encode(
                rgb.as_raw(),
                width,
                height,
                ExtendedColorType::Rgb8,
            )
        }
        ExportFormat::Webp => {
            let mut rgba = surface.clone();
            quantize_rgb(&mut rgba, quality);
            WebPEncoder::new_lossless(Cursor::new(&mut buffer)).encode(
                rgba.as_raw(),
                width,
                height,
                ExtendedColorType::Rgba8,
            )
        }
    };

    result.map_err(|e| SliceError::Encode(format!("{} 编码失败：{}", format.extension(), e)))?;

    if buffer.is_empty() {
        return Err(SliceError::Encode(format!(
            "{} 编码器未产出数据",
            format.extension()
        )));
    }

    Ok(buffer)
}

/// 按质量把 RGB 通道收敛到更少的色阶，alpha 保持不变。
fn quantize_rgb(image: &mut RgbaImage, quality: u8) {
    if quality >= 100 {
        return;
    }
    let normalized = f32::from(quality.max(1)) / 100.0;
    let levels = (2.0 + normalized * normalized * 254.0).round().clamp(2.0, 256.0);
    let step = 255.0 / (levels - 1.0);

    for pixel in image.pixels_mut() {
        for channel in pixel.0.iter_mut().take(3) {
            let bucket = (f32::from(*channel) / step).round();
            *channel = (bucket * step).round().clamp(0.0, 255.0) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slicer::geometry::{Transform, compute_placement, resolve_viewport};
    use crate::slicer::padding::OutputSize;
    use crate::slicer::types::CropMode;
    use image::Rgba;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);
    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

    /// 四象限纯色源图：左上红、右上绿、左下蓝、右下白。
    fn quadrant_source(width: u32, height: u32) -> SourceImage {
        let pixels = RgbaImage::from_fn(width, height, |x, y| {
            match (x < width / 2, y < height / 2) {
                (true, true) => RED,
                (false, true) => GREEN,
                (true, false) => BLUE,
                (false, false) => WHITE,
            }
        });
        SourceImage::new(Some("quad.png".into()), pixels).expect("valid source")
    }

    fn extractor() -> SliceExtractor {
        SliceExtractor::from_config(&SlicerConfig::default())
    }

    fn padded(x: f64, y: f64, width: f64, height: f64, out_w: u32, out_h: u32) -> PaddedRegion {
        PaddedRegion {
            source: ExtractionRect { x, y, width, height },
            output: OutputSize {
                width: out_w,
                height: out_h,
            },
        }
    }

    #[test]
    fn identity_render_copies_source() {
        let source = quadrant_source(10, 10);
        let viewport = resolve_viewport(10, 10, CropMode::Original);
        let placement = compute_placement(viewport, 10, 10, Transform::IDENTITY);

        let canvas = extractor()
            .render_viewport(&source, viewport, placement)
            .expect("render should succeed");

        assert_eq!(&canvas, source.pixels());
    }

    #[test]
    fn square_crop_keeps_center() {
        // 20x10 源图裁成 10x10，横向居中 → 只剩中间 10 列
        let source = quadrant_source(20, 10);
        let viewport = resolve_viewport(20, 10, CropMode::Square);
        let placement = compute_placement(viewport, 20, 10, Transform::IDENTITY);

        let canvas = extractor()
            .render_viewport(&source, viewport, placement)
            .expect("render should succeed");

        assert_eq!(canvas.dimensions(), (10, 10));
        assert_eq!(*canvas.get_pixel(0, 0), RED);
        assert_eq!(*canvas.get_pixel(9, 0), GREEN);
        assert_eq!(*canvas.get_pixel(9, 9), WHITE);
    }

    #[test]
    fn offset_outside_viewport_leaves_transparent_canvas() {
        let source = quadrant_source(10, 10);
        let viewport = resolve_viewport(10, 10, CropMode::Original);
        let transform = Transform {
            offset_x: 2.0,
            ..Transform::IDENTITY
        };
        let placement = compute_placement(viewport, 10, 10, transform);

        let canvas = extractor()
            .render_viewport(&source, viewport, placement)
            .expect("render should not fail");

        assert!(canvas.pixels().all(|p| *p == CLEAR));
    }

    #[test]
    fn half_offset_shifts_content() {
        let source = quadrant_source(10, 10);
        let viewport = resolve_viewport(10, 10, CropMode::Original);
        let transform = Transform {
            offset_x: 0.5,
            ..Transform::IDENTITY
        };
        let placement = compute_placement(viewport, 10, 10, transform);

        let canvas = extractor()
            .render_viewport(&source, viewport, placement)
            .expect("render should succeed");

        assert_eq!(*canvas.get_pixel(2, 2), CLEAR);
        assert_eq!(*canvas.get_pixel(7, 2), RED);
    }

    #[test]
    fn extract_quadrant_as_is() {
        let source = quadrant_source(100, 100);
        let slice = extractor()
            .extract(source.pixels(), &padded(50.0, 0.0, 50.0, 50.0, 50, 50))
            .expect("extract should succeed");

        assert_eq!(slice.dimensions(), (50, 50));
        assert!(slice.pixels().all(|p| *p == GREEN));
    }

    #[test]
    fn extract_stretches_without_letterbox() {
        let source = quadrant_source(100, 100);
        // 100x50 的上半区域压到 20x40 输出，两侧不留白
        let slice = extractor()
            .extract(source.pixels(), &padded(0.0, 0.0, 100.0, 50.0, 20, 40))
            .expect("extract should succeed");

        assert_eq!(slice.dimensions(), (20, 40));
        assert_eq!(*slice.get_pixel(2, 20), RED);
        assert_eq!(*slice.get_pixel(17, 20), GREEN);
        assert_ne!(*slice.get_pixel(0, 0), CLEAR);
        assert_ne!(*slice.get_pixel(19, 39), CLEAR);
    }

    #[test]
    fn extract_out_of_range_samples_empty_space() {
        let source = quadrant_source(10, 10);
        let slice = extractor()
            .extract(source.pixels(), &padded(-10.0, 0.0, 20.0, 10.0, 20, 10))
            .expect("extract should succeed");

        assert_eq!(*slice.get_pixel(3, 3), CLEAR);
        assert_eq!(*slice.get_pixel(12, 2), RED);
    }

    #[test]
    fn degenerate_rect_yields_blank_one_pixel() {
        let source = quadrant_source(10, 10);
        let slice = extractor()
            .extract(source.pixels(), &padded(5.0, 5.0, -6.0, 0.0, 1, 1))
            .expect("extract should succeed");

        assert_eq!(slice.dimensions(), (1, 1));
        assert_eq!(*slice.get_pixel(0, 0), CLEAR);
    }

    #[test]
    fn oversized_surface_is_raster_context_error() {
        let extractor = SliceExtractor::new(FilterType::Triangle, 100);
        let source = quadrant_source(10, 10);

        let result = extractor.extract(source.pixels(), &padded(0.0, 0.0, 10.0, 10.0, 11, 10));
        assert!(matches!(result, Err(SliceError::RasterContext(_))));
    }

    #[test]
    fn encodes_every_format() {
        let surface = quadrant_source(8, 8).pixels().clone();

        let png = encode_slice(&surface, ExportFormat::Png, 92).expect("png");
        let jpg = encode_slice(&surface, ExportFormat::Jpg, 92).expect("jpg");
        let webp = encode_slice(&surface, ExportFormat::Webp, 92).expect("webp");

        assert_eq!(image::guess_format(&png).ok(), Some(image::ImageFormat::Png));
        assert_eq!(image::guess_format(&jpg).ok(), Some(image::ImageFormat::Jpeg));
        assert_eq!(image::guess_format(&webp).ok(), Some(image::ImageFormat::WebP));

        let decoded = image::load_from_memory(&png).expect("decode png").to_rgba8();
        assert_eq!(decoded, surface);
    }

    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 16) as u8, (y * 16) as u8, 100, 200])
        })
    }

    #[test]
    fn webp_quality_changes_output() {
        let surface = gradient(16, 16);

        let fine = encode_slice(&surface, ExportFormat::Webp, 92).expect("webp 92");
        let coarse = encode_slice(&surface, ExportFormat::Webp, 10).expect("webp 10");
        assert_ne!(fine, coarse);

        let decoded = image::load_from_memory(&coarse).expect("decode webp").to_rgba8();
        assert_ne!(decoded, surface);
        assert!(decoded.pixels().all(|p| p.0[3] == 200));
    }

    #[test]
    fn webp_full_quality_is_exact() {
        let surface = gradient(8, 8);
        let webp = encode_slice(&surface, ExportFormat::Webp, 100).expect("webp 100");

        let decoded = image::load_from_memory(&webp).expect("decode webp").to_rgba8();
        assert_eq!(decoded, surface);
    }

    #[test]
    fn quantize_keeps_extremes() {
        let mut image = RgbaImage::from_pixel(1, 1, Rgba([0, 255, 100, 7]));
        quantize_rgb(&mut image, 10);

        let [r, g, b, a] = image.get_pixel(0, 0).0;
        assert_eq!((r, g, a), (0, 255, 7));
        assert_ne!(b, 100);
    }

    #[test]
    fn clip_axis_maps_partial_overlap() {
        // 源 [-10, 10) 映射到目标 [0, 20)，只有源 [0, 10) 有像素 → 目标 [10, 20)
        let span = clip_axis(-10.0, 20.0, 0.0, 20.0, 10.0, 20.0).expect("overlap");
        assert_eq!(span.src_start, 0.0);
        assert_eq!(span.src_len, 10.0);
        assert_eq!((span.dst_start, span.dst_len), (10, 10));
    }
}
