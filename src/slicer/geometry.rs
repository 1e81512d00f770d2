//! 视口与摆放计算模块
//!
//! 两个纯函数：
//!
//! 1. **视口解析** (`resolve_viewport`)：`original` 直接使用源尺寸，
//!    `square` 取短边作为正方形边长。
//! 2. **摆放计算** (`compute_placement`)：先按缩放得到绘制尺寸，
//!    再居中，最后叠加“视口比例”偏移。
//!
//! 摆放结果不做任何收敛，图片可以部分甚至完全落在视口外，
//! 后续绘制只会采样到透明像素。

use super::types::{CropMode, GridSettings};

/// 逻辑画布尺寸。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// 源图在视口中的位置与绘制尺寸。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub draw_width: f64,
    pub draw_height: f64,
}

/// 缩放与偏移参数。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub scale_x: f64,
    pub scale_y: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        scale_x: 1.0,
        scale_y: 1.0,
        offset_x: 0.0,
        offset_y: 0.0,
    };
}

impl From<&GridSettings> for Transform {
    fn from(settings: &GridSettings) -> Self {
        Self {
            scale_x: settings.scale_x,
            scale_y: settings.scale_y,
            offset_x: settings.offset_x,
            offset_y: settings.offset_y,
        }
    }
}

/// 根据裁剪模式计算视口尺寸。
///
/// # 示例
/// ```rust
/// use image_slicer::slicer::{resolve_viewport, CropMode};
///
/// let viewport = resolve_viewport(1920, 1080, CropMode::Square);
/// assert_eq!((viewport.width, viewport.height), (1080, 1080));
/// ```
pub fn resolve_viewport(source_width: u32, source_height: u32, crop_mode: CropMode) -> Viewport {
    match crop_mode {
        CropMode::Original => Viewport {
            width: source_width,
            height: source_height,
        },
        CropMode::Square => {
            let side = source_width.min(source_height);
            Viewport {
                width: side,
                height: side,
            }
        }
    }
}

/// 计算源图在视口中的摆放。
///
/// # 后置条件
/// - `draw_width == source_width * scale_x`
/// - 偏移为 0 时绘制区域中心与视口中心重合
pub fn compute_placement(
    viewport: Viewport,
    source_width: u32,
    source_height: u32,
    transform: Transform,
) -> Placement {
    let viewport_width = viewport.width as f64;
    let viewport_height = viewport.height as f64;

    let draw_width = source_width as f64 * transform.scale_x;
    let draw_height = source_height as f64 * transform.scale_y;

    let base_x = (viewport_width - draw_width) / 2.0;
    let base_y = (viewport_height - draw_height) / 2.0;

    Placement {
        x: base_x + transform.offset_x * viewport_width,
        y: base_y + transform.offset_y * viewport_height,
        draw_width,
        draw_height,
    }
}
