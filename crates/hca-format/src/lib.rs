//! # hca-format
//!
//! HCA 流层, 负责把字节源中的一条 HCA 流变成可随机读取的 PCM 字节流.
//!
//! 包括字节源抽象, 头部解析与探测, 解码配置, 合成 WAV 头,
//! 以及带块缓存与循环映射的 [`HcaDecoder`].
//!
//! ## 使用示例
//!
//! ```rust,no_run
//! use std::io::Read;
//! use hca_format::{DecoderConfig, HcaDecoder, IoContext};
//!
//! let mut io = IoContext::open_read("bgm.hca").unwrap();
//! let mut decoder = HcaDecoder::new(&mut io, DecoderConfig::default().with_key(0x0030_D9E8)).unwrap();
//! let mut wav = Vec::new();
//! decoder.read_to_end(&mut wav).unwrap();
//! ```

pub mod config;
pub mod decoder;
pub mod header;
pub mod io;
pub mod probe;
pub mod wave;

// 重导出常用类型
pub use config::DecoderConfig;
pub use decoder::HcaDecoder;
pub use header::{comment_text, parse_header, read_header};
pub use io::IoContext;
pub use probe::{ProbeScore, probe, probe_io};
