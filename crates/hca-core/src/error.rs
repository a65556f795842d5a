//! 统一错误类型定义.
//!
//! 所有 HCA crate 共用的错误类型, 支持跨模块传播. 解码过程中的错误均为致命错误, 不做重试.

use thiserror::Error;

/// HCA 解码器统一错误类型
#[derive(Debug, Error)]
pub enum HcaError {
    /// 无效参数 (配置错误, 例如启用循环但循环次数为 0)
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 头部无效 (块大小不合法, 未知的密码类型等)
    #[error("头部错误: {0}")]
    Header(String),

    /// 块校验和不匹配
    #[error("校验和错误: 块 {block}")]
    Checksum {
        /// 出错的块索引
        block: u32,
    },

    /// 块解码失败 (同步字错误, 数据不足, 比例因子越界等)
    #[error("解码失败: {0}")]
    DecodeFailed(String),

    /// 不支持的操作
    #[error("不支持的操作: {0}")]
    Unsupported(String),

    /// I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 已到达流末尾
    #[error("已到达流末尾")]
    Eof,
}

/// HCA 解码器统一 Result 类型
pub type HcaResult<T> = Result<T, HcaError>;

impl From<HcaError> for std::io::Error {
    fn from(err: HcaError) -> Self {
        match err {
            HcaError::Io(e) => e,
            HcaError::Eof => std::io::Error::from(std::io::ErrorKind::UnexpectedEof),
            HcaError::InvalidArgument(_) => {
                std::io::Error::new(std::io::ErrorKind::InvalidInput, err)
            }
            other => std::io::Error::new(std::io::ErrorKind::InvalidData, other),
        }
    }
}
