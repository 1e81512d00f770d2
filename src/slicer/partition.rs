//! # 区域划分模块
//!
//! ## 设计思路
//!
//! 视口被划分为按行优先排列的矩形区域，序号即对外的“选择键”：
//!
//! - `grid`：`rows * cols` 个等大单元，序号 `i` 对应 `(i / cols, i % cols)`
//! - `lines`：以排序后的分割线位置为边界，相邻边界两两组成单元
//!
//! ## 实现思路
//!
//! 分割线位置先收敛：只保留落在 `(0, size)` 开区间内的、互不相同的位置，
//! 因而重复线、越界线都不会报错，也不会产生越界或负尺寸区域。
//! 没有分割线的轴退化为单一整段。

use super::geometry::Viewport;
use super::types::{GridSettings, SplitLine, SplitMode};

/// 视口坐标系下的单个区域。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub row: u32,
    pub col: u32,
}

impl Region {
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// 导出选择：全部区域，或按给定顺序的部分区域。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    All,
    Subset(Vec<usize>),
}

impl Selection {
    /// 由前端的序号集合构造；空集合表示“全部”。
    ///
    /// 重复序号只保留第一次出现的位置，其余顺序保持不变。
    pub fn from_indices<I>(indices: I) -> Self
    where
        I: IntoIterator<Item = usize>,
    {
        let mut ordered: Vec<usize> = Vec::new();
        for index in indices {
            if !ordered.contains(&index) {
                ordered.push(index);
            }
        }

        if ordered.is_empty() {
            Self::All
        } else {
            Self::Subset(ordered)
        }
    }

    /// 解析为实际要导出的序号列表。
    ///
    /// 子集顺序原样保留（不排序）；空子集等同“全部”，
    /// 重复序号只取第一次，不存在对应区域的序号被丢弃。
    pub fn resolve(&self, region_count: usize) -> Vec<usize> {
        match self {
            Self::Subset(indices) if !indices.is_empty() => {
                let mut seen = vec![false; region_count];
                let (valid, ignored): (Vec<usize>, Vec<usize>) = indices
                    .iter()
                    .copied()
                    .filter(|&index| match seen.get_mut(index) {
                        Some(flag) => !std::mem::replace(flag, true),
                        None => true,
                    })
                    .partition(|&index| index < region_count);
                if !ignored.is_empty() {
                    log::warn!(
                        "⚠️ 忽略不存在的区域序号：{:?}（区域总数 {}）",
                        ignored,
                        region_count
                    );
                }
                valid
            }
            _ => (0..region_count).collect(),
        }
    }
}

/// 按模式划分视口。
pub fn partition(viewport: Viewport, settings: &GridSettings) -> Vec<Region> {
    match settings.split_mode {
        SplitMode::Grid => grid_regions(viewport, settings.rows, settings.cols),
        SplitMode::Lines => line_regions(
            viewport,
            &settings.horizontal_lines,
            &settings.vertical_lines,
        ),
    }
}

/// 等分网格。`rows` / `cols` 为 0 时返回空列表。
pub fn grid_regions(viewport: Viewport, rows: u32, cols: u32) -> Vec<Region> {
    if rows == 0 || cols == 0 {
        return Vec::new();
    }

    let width = viewport.width as f64;
    let height = viewport.height as f64;
    // 边界用 `k * size / n` 计算，最后一条边界严格等于视口尺寸
    let edge = |k: u32, size: f64, n: u32| k as f64 * size / n as f64;

    let mut regions = Vec::with_capacity(rows as usize * cols as usize);
    for row in 0..rows {
        let y = edge(row, height, rows);
        let next_y = edge(row + 1, height, rows);
        for col in 0..cols {
            let x = edge(col, width, cols);
            let next_x = edge(col + 1, width, cols);
            regions.push(Region {
                x,
                y,
                width: next_x - x,
                height: next_y - y,
                row,
                col,
            });
        }
    }
    regions
}

/// 分割线划分。
pub fn line_regions(
    viewport: Viewport,
    horizontal_lines: &[SplitLine],
    vertical_lines: &[SplitLine],
) -> Vec<Region> {
    let width = viewport.width as f64;
    let height = viewport.height as f64;

    let row_edges = boundaries(horizontal_lines, height);
    let col_edges = boundaries(vertical_lines, width);

    let mut regions = Vec::with_capacity((row_edges.len() - 1) * (col_edges.len() - 1));
    for (row, ys) in row_edges.windows(2).enumerate() {
        for (col, xs) in col_edges.windows(2).enumerate() {
            regions.push(Region {
                x: xs[0],
                y: ys[0],
                width: xs[1] - xs[0],
                height: ys[1] - ys[0],
                row: row as u32,
                col: col as u32,
            });
        }
    }
    regions
}

/// `[0, 排序去重后的内部位置…, size]`，长度至少为 2。
fn boundaries(lines: &[SplitLine], size: f64) -> Vec<f64> {
    let mut inner: Vec<f64> = lines
        .iter()
        .map(|line| line.position)
        .filter(|position| position.is_finite() && *position > 0.0 && *position < size)
        .collect();
    inner.sort_by(f64::total_cmp);
    inner.dedup();

    let mut edges = Vec::with_capacity(inner.len() + 2);
    edges.push(0.0);
    edges.extend(inner);
    edges.push(size);
    edges
}
