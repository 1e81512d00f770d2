//! # 导出编排模块
//!
//! ## 设计思路
//!
//! `SliceHandler` 只负责流程编排与配置管理。处理链路固定为：
//! 1. 读取配置快照，校验参数
//! 2. 解析视口、计算摆放，源图只绘制一次到视口画布
//! 3. 划分区域，按选择顺序逐个：内缩 → 采样 → 编码
//! 4. 上报 60，交给打包器；打包进度映射到 60~100
//! 5. 上报 100，把压缩包交给下载触发器
//!
//! ## 实现思路
//!
//! - 配置通过 `Arc<RwLock<SlicerConfig>>` 支持运行时切档，单次导出使用同一快照。
//! - 切片严格串行：前一个切片编码完成后才开始下一个。
//! - 编码失败只跳过当前切片；其它错误立即中断，不生成残缺压缩包。
//! - 记录 `slice/package/total` 阶段耗时，便于性能诊断。

use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;

use super::archive::{ArchiveBuilder, ArchiveEntry, DownloadTrigger};
use super::geometry::{Transform, Viewport, compute_placement, resolve_viewport};
use super::padding::{SizeRounding, apply_padding};
use super::partition::{Region, Selection, partition};
use super::pipeline::{SliceExtractor, encode_slice};
use super::progress::{COMPLETE, ExportState, PACKAGING_START, ProgressReporter};
use super::source::{SourceImage, SourceRef};
use super::types::{ExportFormat, GridSettings, SplitMode, SquareFit};
use super::{SliceError, SlicerConfig, SlicerPerformanceProfile};

/// 既没有前缀也没有源文件名时使用的基础名。
pub const FALLBACK_BASE_NAME: &str = "sliced";

/// 单个区域的编码结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSlice {
    pub buffer: Vec<u8>,
    pub row: u32,
    pub col: u32,
}

impl OutputSlice {
    pub fn file_name(&self, base_name: &str, format: ExportFormat) -> String {
        slice_file_name(base_name, self.row, self.col, format)
    }
}

/// 一次成功导出的摘要。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub archive_name: String,
    /// 压缩包内文件名，顺序即处理顺序。
    pub files: Vec<String>,
    /// 编码失败而被跳过的区域序号。
    pub skipped: Vec<usize>,
    pub archive_size: usize,
}

/// 切片阶段产物。
struct SliceBatch {
    base_name: String,
    slices: Vec<OutputSlice>,
    skipped: Vec<usize>,
}

/// `prefix` 优先；否则取源文件名最后一个 `.` 之前的部分；为空时回退 `sliced`。
///
/// 没有扩展名的文件名（如 `README`）同样回退 `sliced`。
pub fn file_base_name(prefix: &str, source_name: Option<&str>) -> String {
    if !prefix.is_empty() {
        return prefix.to_string();
    }

    let stem = source_name
        .and_then(|name| name.rfind('.').map(|dot| &name[..dot]))
        .unwrap_or_default();

    if stem.is_empty() {
        FALLBACK_BASE_NAME.to_string()
    } else {
        stem.to_string()
    }
}

/// `{base}_{row+1}_{col+1}.{ext}`
pub fn slice_file_name(base_name: &str, row: u32, col: u32, format: ExportFormat) -> String {
    format!("{}_{}_{}.{}", base_name, row + 1, col + 1, format.extension())
}

/// `{base}_grid.zip` / `{base}_lines.zip`
pub fn archive_file_name(base_name: &str, mode: SplitMode) -> String {
    format!("{}_{}.zip", base_name, mode.as_str())
}

/// 切图导出编排器。
pub struct SliceHandler {
    config: Arc<RwLock<SlicerConfig>>,
    state: Arc<Mutex<ExportState>>,
}

impl Default for SliceHandler {
    fn default() -> Self {
        Self::new(SlicerConfig::default())
    }
}

impl SliceHandler {
    /// # 示例
    /// ```rust
    /// use image_slicer::slicer::{SliceHandler, SlicerConfig, SlicerPerformanceProfile};
    ///
    /// let handler = SliceHandler::new(SlicerConfig::default());
    /// handler.set_performance_profile(SlicerPerformanceProfile::Speed)?;
    /// assert_eq!(handler.get_performance_profile()?, SlicerPerformanceProfile::Speed);
    /// # Ok::<(), image_slicer::slicer::SliceError>(())
    /// ```
    pub fn new(config: SlicerConfig) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            state: Arc::new(Mutex::new(ExportState::default())),
        }
    }

    /// 获取配置快照，保证单次导出链路使用一致参数。
    pub fn config_snapshot(&self) -> Result<SlicerConfig, SliceError> {
        self.config
            .read()
            .map(|cfg| cfg.clone())
            .map_err(|_| SliceError::SharedState("配置读取锁已中毒".to_string()))
    }

    fn update_config<F>(&self, apply: F) -> Result<(), SliceError>
    where
        F: FnOnce(&mut SlicerConfig),
    {
        let mut config = self
            .config
            .write()
            .map_err(|_| SliceError::SharedState("配置写入锁已中毒".to_string()))?;
        apply(&mut config);
        Ok(())
    }

    pub fn set_performance_profile(
        &self,
        profile: SlicerPerformanceProfile,
    ) -> Result<(), SliceError> {
        self.update_config(|config| {
            config.apply_performance_profile(profile);
            log::info!(
                "⚙️ 已切换切图性能档位：{:?}（filter={:?}, zip_level={}）",
                profile,
                config.resample_filter,
                config.archive_compression_level
            );
        })
    }

    pub fn get_performance_profile(&self) -> Result<SlicerPerformanceProfile, SliceError> {
        Ok(self.config_snapshot()?.infer_performance_profile())
    }

    /// 设置解码与画布上限。
    pub fn set_limits(
        &self,
        max_decoded_pixels: u64,
        max_surface_pixels: u64,
    ) -> Result<(), SliceError> {
        if max_decoded_pixels < 1_000_000 {
            return Err(SliceError::InvalidSettings(
                "max_decoded_pixels 不能小于 1,000,000".to_string(),
            ));
        }
        if max_surface_pixels < 1_000_000 {
            return Err(SliceError::InvalidSettings(
                "max_surface_pixels 不能小于 1,000,000".to_string(),
            ));
        }

        self.update_config(|config| {
            config.max_decoded_pixels = max_decoded_pixels;
            config.max_decoded_bytes = config.max_decoded_bytes.max(max_decoded_pixels * 4);
            config.max_surface_pixels = max_surface_pixels;
        })
    }

    /// 设置有损编码质量（0 < q ≤ 1）。
    pub fn set_lossy_quality(&self, quality: f32) -> Result<(), SliceError> {
        if !(quality > 0.0 && quality <= 1.0) {
            return Err(SliceError::InvalidSettings(format!(
                "lossy_quality 必须在 (0, 1] 之间：{}",
                quality
            )));
        }
        self.update_config(|config| config.lossy_quality = quality)
    }

    /// 当前导出状态快照。
    pub fn state(&self) -> Result<ExportState, SliceError> {
        self.state
            .lock()
            .map(|state| state.clone())
            .map_err(|_| SliceError::SharedState("状态锁已中毒".to_string()))
    }

    fn with_state<F>(&self, apply: F)
    where
        F: FnOnce(&mut ExportState),
    {
        match self.state.lock() {
            Ok(mut state) => apply(&mut state),
            Err(_) => log::warn!("⚠️ 状态锁已中毒，跳过状态更新"),
        }
    }

    fn begin(&self) -> Result<(), SliceError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| SliceError::SharedState("状态锁已中毒".to_string()))?;
        if state.is_processing() {
            return Err(SliceError::AlreadyRunning);
        }
        state.start();
        Ok(())
    }

    fn finish(&self, result: &Result<ExportReport, SliceError>) {
        match result {
            Ok(report) => {
                self.with_state(ExportState::complete);
                log::info!(
                    "📦 切图导出完成 - {}（{} 个文件，跳过 {} 个，{} KB）",
                    report.archive_name,
                    report.files.len(),
                    report.skipped.len(),
                    report.archive_size / 1024
                );
            }
            Err(err) => {
                log::error!("❌ 切图导出失败：{}", err);
                self.with_state(|state| state.fail(err.to_string()));
            }
        }
    }

    /// 预览用：视口与区域列表，不做任何绘制。
    pub fn regions(
        &self,
        source: &SourceImage,
        settings: &GridSettings,
    ) -> Result<(Viewport, Vec<Region>), SliceError> {
        settings.validate(self.config_snapshot()?.max_regions)?;
        let viewport = resolve_viewport(source.width(), source.height(), settings.crop_mode);
        Ok((viewport, partition(viewport, settings)))
    }

    /// 导出主入口：切片、打包并交给下载触发器。
    ///
    /// # 示例
    /// ```rust,ignore
    /// use image_slicer::slicer::{GridSettings, Selection, SliceHandler, ZipArchiveBuilder};
    /// use image_slicer::storage::DirectoryDownload;
    ///
    /// # async fn demo(source: image_slicer::slicer::SourceImage) -> Result<(), image_slicer::slicer::SliceError> {
    /// let handler = SliceHandler::default();
    /// handler
    ///     .export(
    ///         &source,
    ///         &GridSettings::default(),
    ///         &Selection::All,
    ///         &ZipArchiveBuilder::default(),
    ///         &DirectoryDownload::new("out"),
    ///         |percent| println!("{percent}%"),
    ///     )
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn export<A, D, P>(
        &self,
        source: &SourceImage,
        settings: &GridSettings,
        selection: &Selection,
        archive: &A,
        download: &D,
        on_progress: P,
    ) -> Result<ExportReport, SliceError>
    where
        A: ArchiveBuilder,
        D: DownloadTrigger,
        P: FnMut(u8),
    {
        self.begin()?;
        let result = self
            .run_export(source, settings, selection, archive, download, on_progress)
            .await;
        self.finish(&result);
        result
    }

    /// 先解码来源再导出；解码失败时不会上报任何进度。
    pub async fn export_source<A, D, P>(
        &self,
        source: SourceRef,
        settings: &GridSettings,
        selection: &Selection,
        archive: &A,
        download: &D,
        on_progress: P,
    ) -> Result<ExportReport, SliceError>
    where
        A: ArchiveBuilder,
        D: DownloadTrigger,
        P: FnMut(u8),
    {
        self.begin()?;
        let result = match self
            .config_snapshot()
            .and_then(|config| SourceImage::load(source, &config))
        {
            Ok(image) => {
                self.run_export(&image, settings, selection, archive, download, on_progress)
                    .await
            }
            Err(err) => Err(err),
        };
        self.finish(&result);
        result
    }

    async fn run_export<A, D, P>(
        &self,
        source: &SourceImage,
        settings: &GridSettings,
        selection: &Selection,
        archive: &A,
        download: &D,
        mut on_progress: P,
    ) -> Result<ExportReport, SliceError>
    where
        A: ArchiveBuilder,
        D: DownloadTrigger,
        P: FnMut(u8),
    {
        let config = self.config_snapshot()?;
        settings.validate(config.max_regions)?;
        let total_start = Instant::now();

        let state = Arc::clone(&self.state);
        let mut relay = |percent: u8| {
            if let Ok(mut state) = state.lock() {
                state.progress = percent;
            }
            on_progress(percent);
        };
        let mut reporter = ProgressReporter::new(&mut relay);

        let slice_start = Instant::now();
        let batch = self
            .render_slices(source, settings, selection, &config, &mut reporter)
            .await?;
        let slice_elapsed = slice_start.elapsed();

        self.with_state(ExportState::enter_packaging);
        reporter.report(PACKAGING_START);

        let entries: Vec<ArchiveEntry> = batch
            .slices
            .into_iter()
            .map(|slice| ArchiveEntry {
                name: slice.file_name(&batch.base_name, settings.format),
                bytes: slice.buffer,
            })
            .collect();
        let files: Vec<String> = entries.iter().map(|entry| entry.name.clone()).collect();

        let package_start = Instant::now();
        let blob = archive
            .build(&entries, &mut |fraction| {
                reporter.report_packaging(fraction);
            })
            .await?;
        let package_elapsed = package_start.elapsed();

        reporter.report(COMPLETE);

        let archive_name = archive_file_name(&batch.base_name, settings.split_mode);
        let archive_size = blob.len();
        download.deliver(blob, &archive_name)?;

        log::info!(
            "✅ 切图处理完成 - slice={}ms package={}ms total={}ms",
            slice_elapsed.as_millis(),
            package_elapsed.as_millis(),
            total_start.elapsed().as_millis()
        );

        Ok(ExportReport {
            archive_name,
            files,
            skipped: batch.skipped,
            archive_size,
        })
    }

    async fn render_slices(
        &self,
        source: &SourceImage,
        settings: &GridSettings,
        selection: &Selection,
        config: &SlicerConfig,
        reporter: &mut ProgressReporter<'_>,
    ) -> Result<SliceBatch, SliceError> {
        if settings.square_fit == SquareFit::Stretch {
            log::debug!("squareFit=stretch 不参与切图，按居中摆放处理");
        }

        let viewport = resolve_viewport(source.width(), source.height(), settings.crop_mode);
        let placement = compute_placement(
            viewport,
            source.width(),
            source.height(),
            Transform::from(settings),
        );

        let extractor = SliceExtractor::from_config(config);
        let canvas = extractor.render_viewport(source, viewport, placement)?;

        let regions = partition(viewport, settings);
        let order = selection.resolve(regions.len());
        let padding = settings.padding();
        let rounding = SizeRounding::from(settings.split_mode);
        let quality = config.quality_percent();
        let base_name = file_base_name(&settings.file_prefix, source.name());

        log::info!(
            "✂️ 开始切图 - 视口 {}x{} 模式 {} 区域 {} 个，导出 {} 个",
            viewport.width,
            viewport.height,
            settings.split_mode.as_str(),
            regions.len(),
            order.len()
        );

        let mut slices = Vec::with_capacity(order.len());
        let mut skipped = Vec::new();

        for (done, &index) in order.iter().enumerate() {
            let region = &regions[index];
            let padded = apply_padding(region, &padding, rounding);
            let surface = extractor.extract(&canvas, &padded)?;

            match encode_on_worker(surface, settings.format, quality).await {
                Ok(buffer) => {
                    log::debug!(
                        "🧩 切片 #{} ({}, {}) {}x{} → {} bytes",
                        index,
                        region.row,
                        region.col,
                        padded.output.width,
                        padded.output.height,
                        buffer.len()
                    );
                    slices.push(OutputSlice {
                        buffer,
                        row: region.row,
                        col: region.col,
                    });
                }
                Err(err) if !err.is_fatal() => {
                    log::warn!("⚠️ 切片 #{} 编码失败，已跳过：{}", index, err);
                    skipped.push(index);
                }
                Err(err) => return Err(err),
            }

            reporter.report_slice(done + 1, order.len());
        }

        Ok(SliceBatch {
            base_name,
            slices,
            skipped,
        })
    }
}

/// 编码放到阻塞线程池执行，并在此处挂起等待完成。
async fn encode_on_worker(
    surface: image::RgbaImage,
    format: ExportFormat,
    quality: u8,
) -> Result<Vec<u8>, SliceError> {
    tokio::task::spawn_blocking(move || encode_slice(&surface, format, quality))
        .await
        .map_err(|e| SliceError::RasterContext(format!("编码任务异常退出：{}", e)))?
}
