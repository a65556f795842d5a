//! # hca
//!
//! 纯 Rust 实现的 CRI HCA 音频解码器.
//!
//! HCA 是 CRI Middleware 的有损音频压缩格式. 本库把一条 HCA 流解码为线性 PCM,
//! 可选地在前面加上合成的 WAV 头, 并支持循环区间展开.
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use std::io::Read;
//! use hca::format::{DecoderConfig, HcaDecoder, IoContext};
//!
//! let mut io = IoContext::open_read("bgm.hca").unwrap();
//! let config = DecoderConfig::default().with_key(0x0030_D9E8).with_loop(2);
//! let mut decoder = HcaDecoder::new(&mut io, config).unwrap();
//! println!("{} 声道, {} Hz", decoder.info().channel_count, decoder.info().sample_rate);
//!
//! let mut wav = Vec::new();
//! decoder.read_to_end(&mut wav).unwrap();
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `hca-core` | 错误类型, 位读取器, CRC-16, 采样格式 |
//! | `hca-codec` | 流参数, 常量表, 密码, 声道解码, IMDCT, 单块解码 |
//! | `hca-format` | 字节源, 头部解析, WAV 头, 块缓存与循环映射 |

/// 核心类型与工具
pub use hca_core as core;

/// 块解码
pub use hca_codec as codec;

/// 流层与解码器
pub use hca_format as format;

pub use hca_core::{HcaError, HcaResult, SampleFormat};
pub use hca_format::{DecoderConfig, HcaDecoder, IoContext};

/// 获取版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
