//! 边距模块
//!
//! 对区域四边内缩得到采样矩形，同时计算输出画布尺寸。
//! 采样矩形原样保留（可能为负宽或越界），输出尺寸最少为 1×1。
//! 网格模式按 floor 取整、分割线模式按 round 取整，两者刻意区分。

use super::partition::Region;
use super::types::{PaddingSpec, SplitMode};

/// 输出尺寸取整策略。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeRounding {
    Floor,
    Round,
}

impl From<SplitMode> for SizeRounding {
    fn from(mode: SplitMode) -> Self {
        match mode {
            SplitMode::Grid => Self::Floor,
            SplitMode::Lines => Self::Round,
        }
    }
}

impl SizeRounding {
    fn apply(self, value: f64) -> u32 {
        let rounded = match self {
            Self::Floor => value.floor(),
            Self::Round => value.round(),
        };
        // NaN 与负数在转换时落到 0，再统一抬到 1
        (rounded as u32).max(1)
    }
}

/// 视口坐标系下的采样矩形。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractionRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// 输出画布尺寸（像素）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputSize {
    pub width: u32,
    pub height: u32,
}

/// 内缩后的区域。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaddedRegion {
    pub source: ExtractionRect,
    pub output: OutputSize,
}

pub fn apply_padding(
    region: &Region,
    padding: &PaddingSpec,
    rounding: SizeRounding,
) -> PaddedRegion {
    let width = region.width - padding.left - padding.right;
    let height = region.height - padding.top - padding.bottom;

    PaddedRegion {
        source: ExtractionRect {
            x: region.x + padding.left,
            y: region.y + padding.top,
            width,
            height,
        },
        output: OutputSize {
            width: rounding.apply(width),
            height: rounding.apply(height),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(x: f64, y: f64, width: f64, height: f64) -> Region {
        Region {
            x,
            y,
            width,
            height,
            row: 0,
            col: 0,
        }
    }

    #[test]
    fn zero_padding_keeps_region() {
        let padded = apply_padding(
            &region(10.0, 20.0, 50.0, 40.0),
            &PaddingSpec::default(),
            SizeRounding::Floor,
        );

        assert_eq!(
            padded.source,
            ExtractionRect {
                x: 10.0,
                y: 20.0,
                width: 50.0,
                height: 40.0
            }
        );
        assert_eq!(padded.output, OutputSize { width: 50, height: 40 });
    }

    #[test]
    fn margins_shift_and_shrink() {
        let padding = PaddingSpec {
            top: 1.0,
            right: 2.0,
            bottom: 3.0,
            left: 4.0,
        };

        let padded = apply_padding(&region(0.0, 0.0, 20.0, 20.0), &padding, SizeRounding::Round);

        assert_eq!((padded.source.x, padded.source.y), (4.0, 1.0));
        assert_eq!(padded.output, OutputSize { width: 14, height: 16 });
    }

    #[test]
    fn floor_and_round_differ_on_fractional_size() {
        let cell = region(0.0, 0.0, 33.6, 10.5);

        let floor = apply_padding(&cell, &PaddingSpec::default(), SizeRounding::Floor);
        let round = apply_padding(&cell, &PaddingSpec::default(), SizeRounding::Round);

        assert_eq!(floor.output, OutputSize { width: 33, height: 10 });
        assert_eq!(round.output, OutputSize { width: 34, height: 11 });
    }

    #[test]
    fn oversized_padding_clamps_output_to_one_pixel() {
        let padded = apply_padding(
            &region(0.0, 0.0, 10.0, 10.0),
            &PaddingSpec::uniform(8.0),
            SizeRounding::Floor,
        );

        assert_eq!(padded.source.width, -6.0);
        assert_eq!(padded.output, OutputSize { width: 1, height: 1 });
    }

    #[test]
    fn negative_padding_grows_extraction_rect() {
        let padded = apply_padding(
            &region(5.0, 5.0, 10.0, 10.0),
            &PaddingSpec::uniform(-5.0),
            SizeRounding::Round,
        );

        assert_eq!((padded.source.x, padded.source.width), (0.0, 20.0));
        assert_eq!(padded.output, OutputSize { width: 20, height: 20 });
    }

    #[test]
    fn rounding_follows_split_mode() {
        assert_eq!(SizeRounding::from(SplitMode::Grid), SizeRounding::Floor);
        assert_eq!(SizeRounding::from(SplitMode::Lines), SizeRounding::Round);
    }
}
