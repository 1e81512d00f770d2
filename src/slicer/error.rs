//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 切图链路中的所有失败统一收敛到 `SliceError`，调用侧可以按分支匹配。
//! 是否中断整次导出由 `is_fatal` 决定：只有编码失败属于“跳过当前切片”，
//! 其余错误都会立即向上冒泡，不产生残缺压缩包。

/// 切图与导出统一错误类型。
#[derive(Debug, thiserror::Error)]
pub enum SliceError {
    /// 视口画布或切片画布无法创建 / 写入。
    #[error("画布错误：{0}")]
    RasterContext(String),

    /// 单个切片编码失败（编码器未产出数据）。
    #[error("编码错误：{0}")]
    Encode(String),

    /// 源图片加载或解码失败。
    #[error("解码错误：{0}")]
    Decode(String),

    #[error("格式错误：{0}")]
    InvalidFormat(String),

    #[error("文件错误：{0}")]
    FileSystem(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),

    /// 压缩包生成失败。
    #[error("打包错误：{0}")]
    Packaging(String),

    /// 下载（落盘）失败。
    #[error("下载错误：{0}")]
    Download(String),

    #[error("参数错误：{0}")]
    InvalidSettings(String),

    /// 配置或状态锁不可用（持锁线程 panic）。
    #[error("状态错误：{0}")]
    SharedState(String),

    #[error("已有导出任务正在进行")]
    AlreadyRunning,
}

impl SliceError {
    /// 是否需要中断整次导出。
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Encode(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_encode_errors_are_recoverable() {
        assert!(!SliceError::Encode("empty".into()).is_fatal());
        assert!(SliceError::RasterContext("oom".into()).is_fatal());
        assert!(SliceError::Packaging("zip".into()).is_fatal());
        assert!(SliceError::Decode("bad".into()).is_fatal());
    }
}
