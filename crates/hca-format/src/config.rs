//! 解码器配置.
//!
//! 配置由调用方在打开解码器时给出, 此后不可修改.

use hca_core::{SampleEncodeFn, SampleFormat};

/// 解码器配置
#[derive(Debug, Clone, Copy)]
pub struct DecoderConfig {
    /// 密钥低 32 位
    pub key1: u32,
    /// 密钥高 32 位
    pub key2: u32,
    /// 密钥修饰值 (ACB/AWB 中的子密钥, 0 表示不修饰)
    pub key_modifier: u16,
    /// 是否展开循环
    pub loop_enabled: bool,
    /// 循环区间播放次数
    pub loop_count: u32,
    /// 是否输出 WAV 头
    pub wave_header_enabled: bool,
    /// 软循环: 循环交给播放端处理, WAV 头中不写 smpl 块
    pub soft_loop: bool,
    /// 输出采样格式
    pub sample_format: SampleFormat,
    /// 自定义采样编码函数, 为 `None` 时使用 `sample_format` 的内置编码
    ///
    /// 自定义函数每次调用必须恰好写入 `sample_format` 的采样字节数.
    pub encode_fn: Option<SampleEncodeFn>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            key1: 0,
            key2: 0,
            key_modifier: 0,
            loop_enabled: false,
            loop_count: 1,
            wave_header_enabled: true,
            soft_loop: false,
            sample_format: SampleFormat::default(),
            encode_fn: None,
        }
    }
}

impl DecoderConfig {
    /// 64 位密钥
    pub fn cipher_key(&self) -> u64 {
        (u64::from(self.key2) << 32) | u64::from(self.key1)
    }

    /// 设置 64 位密钥
    pub fn with_key(mut self, key: u64) -> Self {
        self.key1 = key as u32;
        self.key2 = (key >> 32) as u32;
        self
    }

    /// 设置密钥修饰值
    pub fn with_key_modifier(mut self, modifier: u16) -> Self {
        self.key_modifier = modifier;
        self
    }

    /// 启用循环展开
    pub fn with_loop(mut self, loop_count: u32) -> Self {
        self.loop_enabled = true;
        self.loop_count = loop_count;
        self
    }

    /// 设置输出采样格式
    pub fn with_sample_format(mut self, format: SampleFormat) -> Self {
        self.sample_format = format;
        self
    }

    /// 实际使用的采样编码函数
    pub fn encoder(&self) -> SampleEncodeFn {
        self.encode_fn.unwrap_or_else(|| self.sample_format.encoder())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_默认配置() {
        let config = DecoderConfig::default();
        assert_eq!(config.cipher_key(), 0);
        assert_eq!(config.loop_count, 1);
        assert!(!config.loop_enabled);
        assert!(config.wave_header_enabled);
        assert_eq!(config.sample_format, SampleFormat::S16);
    }

    #[test]
    fn test_密钥拆分() {
        let config = DecoderConfig::default().with_key(0x0030_D9E8_1234_5678);
        assert_eq!(config.key1, 0x1234_5678);
        assert_eq!(config.key2, 0x0030_D9E8);
        assert_eq!(config.cipher_key(), 0x0030_D9E8_1234_5678);
    }

    #[test]
    fn test_自定义编码函数优先() {
        fn constant(_: f32, out: &mut Vec<u8>) {
            out.extend_from_slice(&[0xAA, 0xBB]);
        }
        let config = DecoderConfig {
            encode_fn: Some(constant),
            ..DecoderConfig::default()
        };
        let mut out = Vec::new();
        (config.encoder())(0.5, &mut out);
        assert_eq!(out, [0xAA, 0xBB]);
    }
}
