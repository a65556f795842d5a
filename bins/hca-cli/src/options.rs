//! 解码选项: JSON 配置文件与命令行参数合并为 [`DecoderConfig`].
//!
//! 配置文件示例:
//! ```json
//! { "key": "0x30D9E8", "key_modifier": 0, "loop_count": 2, "format": "s16" }
//! ```
//! 命令行参数优先于配置文件.

use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use hca_core::SampleFormat;
use hca_format::DecoderConfig;

/// 密钥既可以写成数字, 也可以写成十六进制字符串
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum KeyValue {
    Number(u64),
    Text(String),
}

impl KeyValue {
    fn resolve(&self) -> Result<u64> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Text(s) => parse_number(s),
        }
    }
}

/// JSON 配置文件
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub key: Option<KeyValue>,
    pub key_modifier: Option<u16>,
    pub loop_count: Option<u32>,
    pub format: Option<String>,
    pub soft_loop: Option<bool>,
    pub wave_header: Option<bool>,
}

impl ConfigFile {
    /// 读取配置文件
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("读取配置文件 {} 失败", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("解析配置文件 {} 失败", path.display()))
    }
}

/// 命令行中给出的解码选项
#[derive(Debug, Default)]
pub struct CliOptions {
    pub key: Option<u64>,
    pub key_modifier: Option<u16>,
    pub loop_count: Option<u32>,
    pub format: Option<SampleFormat>,
    pub soft_loop: bool,
    pub no_header: bool,
}

/// 解析十进制或 `0x` 前缀的十六进制数
pub fn parse_number(text: &str) -> Result<u64> {
    let text = text.trim();
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse::<u64>(),
    };
    parsed.with_context(|| format!("无效的数值: {text}"))
}

/// 供 clap 使用的 u64 解析
pub fn parse_key(text: &str) -> Result<u64, String> {
    parse_number(text).map_err(|e| e.to_string())
}

/// 供 clap 使用的 u16 解析
pub fn parse_modifier(text: &str) -> Result<u16, String> {
    let value = parse_number(text).map_err(|e| e.to_string())?;
    u16::try_from(value).map_err(|_| format!("密钥修饰值超出 16 位: {text}"))
}

/// 合并配置文件与命令行选项
pub fn build_config(file: Option<&ConfigFile>, cli: &CliOptions) -> Result<DecoderConfig> {
    let mut config = DecoderConfig::default();

    if let Some(file) = file {
        if let Some(key) = &file.key {
            config = config.with_key(key.resolve()?);
        }
        if let Some(modifier) = file.key_modifier {
            config.key_modifier = modifier;
        }
        if let Some(count) = file.loop_count {
            config = config.with_loop(count);
        }
        if let Some(format) = &file.format {
            config.sample_format = format.parse()?;
        }
        config.soft_loop = file.soft_loop.unwrap_or(config.soft_loop);
        config.wave_header_enabled = file.wave_header.unwrap_or(config.wave_header_enabled);
    }

    if let Some(key) = cli.key {
        config = config.with_key(key);
    }
    if let Some(modifier) = cli.key_modifier {
        config.key_modifier = modifier;
    }
    if let Some(count) = cli.loop_count {
        config = config.with_loop(count);
    }
    if let Some(format) = cli.format {
        config.sample_format = format;
    }
    if cli.soft_loop {
        config.soft_loop = true;
    }
    if cli.no_header {
        config.wave_header_enabled = false;
    }

    if config.loop_enabled && config.loop_count == 0 {
        bail!("循环次数必须大于 0");
    }
    Ok(config)
}
