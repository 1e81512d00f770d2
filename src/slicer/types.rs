//! # 切图参数模型
//!
//! `GridSettings` 与前端状态对象一一对应（camelCase JSON），
//! 所有字段均有默认值，缺省字段不会导致反序列化失败。

use serde::{Deserialize, Serialize};

use super::SliceError;

/// 导出编码格式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Png,
    Jpg,
    Webp,
}

impl ExportFormat {
    /// 输出文件扩展名。
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpg => "jpg",
            Self::Webp => "webp",
        }
    }
}

/// 视口裁剪模式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CropMode {
    #[default]
    Original,
    Square,
}

/// 正方形适配方式。目前仅作为配置项保留，切图流程不读取。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SquareFit {
    #[default]
    Center,
    Stretch,
}

/// 分割模式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitMode {
    #[default]
    Grid,
    Lines,
}

impl SplitMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Grid => "grid",
            Self::Lines => "lines",
        }
    }
}

/// 分割线（位置为视口坐标系下的像素值）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitLine {
    pub id: String,
    pub position: f64,
}

impl SplitLine {
    pub fn new(id: impl Into<String>, position: f64) -> Self {
        Self {
            id: id.into(),
            position,
        }
    }
}

/// 四边边距（像素），对所有区域统一生效。
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PaddingSpec {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl PaddingSpec {
    pub fn uniform(value: f64) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }
}

/// 完整切图配置。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GridSettings {
    pub rows: u32,
    pub cols: u32,
    pub format: ExportFormat,
    pub crop_mode: CropMode,
    pub square_fit: SquareFit,
    /// 缩放倍数（1 = 100%）。
    pub scale_x: f64,
    pub scale_y: f64,
    /// 视口宽 / 高的比例偏移（通常在 -0.5 ~ 0.5）。
    pub offset_x: f64,
    pub offset_y: f64,
    pub padding_top: f64,
    pub padding_right: f64,
    pub padding_bottom: f64,
    pub padding_left: f64,
    pub file_prefix: String,
    pub split_mode: SplitMode,
    /// 仅 `lines` 模式使用。
    pub horizontal_lines: Vec<SplitLine>,
    pub vertical_lines: Vec<SplitLine>,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            rows: 3,
            cols: 3,
            format: ExportFormat::Png,
            crop_mode: CropMode::Original,
            square_fit: SquareFit::Center,
            scale_x: 1.0,
            scale_y: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
            padding_top: 0.0,
            padding_right: 0.0,
            padding_bottom: 0.0,
            padding_left: 0.0,
            file_prefix: String::new(),
            split_mode: SplitMode::Grid,
            horizontal_lines: Vec::new(),
            vertical_lines: Vec::new(),
        }
    }
}

impl GridSettings {
    pub fn padding(&self) -> PaddingSpec {
        PaddingSpec {
            top: self.padding_top,
            right: self.padding_right,
            bottom: self.padding_bottom,
            left: self.padding_left,
        }
    }

    pub fn set_padding(&mut self, padding: PaddingSpec) {
        self.padding_top = padding.top;
        self.padding_right = padding.right;
        self.padding_bottom = padding.bottom;
        self.padding_left = padding.left;
    }

    /// 划分后区域数的上界：grid 为 `rows * cols`，lines 为 `(H + 1) * (V + 1)`。
    pub fn region_count_bound(&self) -> u64 {
        match self.split_mode {
            SplitMode::Grid => self.rows as u64 * self.cols as u64,
            SplitMode::Lines => {
                (self.horizontal_lines.len() as u64 + 1) * (self.vertical_lines.len() as u64 + 1)
            }
        }
    }

    /// 校验数值合法性，区域数不得超过 `max_regions`。
    ///
    /// 负边距、越界分割线属于合法输入，由下游兜底；这里只拦截无法参与计算的值。
    pub fn validate(&self, max_regions: u64) -> Result<(), SliceError> {
        if self.split_mode == SplitMode::Grid && (self.rows == 0 || self.cols == 0) {
            return Err(SliceError::InvalidSettings(format!(
                "行列数必须为正整数：rows={} cols={}",
                self.rows, self.cols
            )));
        }

        let regions = self.region_count_bound();
        if regions > max_regions {
            return Err(SliceError::InvalidSettings(format!(
                "区域数过多：{}（限制：{}）",
                regions, max_regions
            )));
        }

        for (name, scale) in [("scaleX", self.scale_x), ("scaleY", self.scale_y)] {
            if !scale.is_finite() || scale <= 0.0 {
                return Err(SliceError::InvalidSettings(format!(
                    "{} 必须为正数：{}",
                    name, scale
                )));
            }
        }

        let finite_fields = [
            ("offsetX", self.offset_x),
            ("offsetY", self.offset_y),
            ("paddingTop", self.padding_top),
            ("paddingRight", self.padding_right),
            ("paddingBottom", self.padding_bottom),
            ("paddingLeft", self.padding_left),
        ];
        if let Some((name, value)) = finite_fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(SliceError::InvalidSettings(format!("{} 不是有效数值：{}", name, value)));
        }

        let mut lines = self.horizontal_lines.iter().chain(self.vertical_lines.iter());
        if let Some(line) = lines.find(|line| !line.position.is_finite()) {
            return Err(SliceError::InvalidSettings(format!(
                "分割线 {} 位置无效：{}",
                line.id, line.position
            )));
        }

        Ok(())
    }
}
