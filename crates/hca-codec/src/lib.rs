//! # hca-codec
//!
//! CRI HCA 音频块解码器.
//!
//! 一个块包含每声道 8 个子帧, 每子帧 128 个频谱系数. 解码流程:
//! 校验 CRC -> 解密 -> 解包比例因子/强度 -> 计算分辨率与增益 -> 反量化
//! -> 噪声填充与高频重建 -> 联合立体声 -> IMDCT.
//!
//! ## 使用示例
//!
//! ```rust
//! use hca_codec::{BlockDecoder, Cipher, HcaInfo};
//!
//! let info = HcaInfo {
//!     block_size: 0x100,
//!     block_count: 1,
//!     total_band_count: 128,
//!     base_band_count: 128,
//!     ..HcaInfo::default()
//! };
//! let decoder = BlockDecoder::new(info, Cipher::none()).unwrap();
//! assert_eq!(decoder.channels().len(), 1);
//! ```

pub mod ath;
pub mod block;
pub mod channel;
pub mod cipher;
pub mod imdct;
pub mod info;
pub mod tables;

// 重导出常用类型
pub use ath::AthCurve;
pub use block::BlockDecoder;
pub use channel::{Channel, ChannelType};
pub use cipher::Cipher;
pub use info::{HcaInfo, LoopInfo, SAMPLES_PER_BLOCK};
