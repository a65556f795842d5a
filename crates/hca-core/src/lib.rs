//! # hca-core
//!
//! HCA 解码器核心库, 提供错误类型、位读取器、块校验和与 PCM 采样格式.
//!
//! 其余 crate 均建立在本 crate 之上.

pub mod bitreader;
pub mod bitwriter;
pub mod crc;
pub mod error;
pub mod sample_format;

// 重导出常用类型
pub use error::{HcaError, HcaResult};
pub use sample_format::{SampleEncodeFn, SampleFormat};
