//! PCM 采样格式与采样编码函数.
//!
//! 解码器内部以 `[-1, 1]` 范围的 `f32` 表示每个采样点, 输出时通过
//! [`SampleEncodeFn`] 逐点写入目标字节缓冲区. 调用方可以替换编码函数,
//! 但每次调用写入的字节数必须等于 [`SampleFormat::bytes_per_sample`].

use std::fmt;
use std::str::FromStr;

use crate::HcaError;

/// 采样编码函数: 将一个已限幅的采样点追加到输出缓冲区
pub type SampleEncodeFn = fn(f32, &mut Vec<u8>);

/// 输出采样格式 (交错排列, 小端)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SampleFormat {
    /// 无符号 8 位整数
    U8,
    /// 有符号 16 位整数
    #[default]
    S16,
    /// 有符号 24 位整数 (3 字节打包)
    S24,
    /// 有符号 32 位整数
    S32,
    /// 32 位浮点
    F32,
}

impl SampleFormat {
    /// 每个采样点占用的字节数
    pub const fn bytes_per_sample(&self) -> u32 {
        match self {
            Self::U8 => 1,
            Self::S16 => 2,
            Self::S24 => 3,
            Self::S32 | Self::F32 => 4,
        }
    }

    /// 每个采样点的位数
    pub const fn bits_per_sample(&self) -> u32 {
        self.bytes_per_sample() * 8
    }

    /// 是否为浮点格式
    pub const fn is_float(&self) -> bool {
        matches!(self, Self::F32)
    }

    /// 该格式的默认编码函数
    pub fn encoder(&self) -> SampleEncodeFn {
        match self {
            Self::U8 => encode_u8,
            Self::S16 => encode_s16,
            Self::S24 => encode_s24,
            Self::S32 => encode_s32,
            Self::F32 => encode_f32,
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::U8 => "u8",
            Self::S16 => "s16",
            Self::S24 => "s24",
            Self::S32 => "s32",
            Self::F32 => "f32",
        };
        write!(f, "{name}")
    }
}

impl FromStr for SampleFormat {
    type Err = HcaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "u8" | "8" => Ok(Self::U8),
            "s16" | "16" => Ok(Self::S16),
            "s24" | "24" => Ok(Self::S24),
            "s32" | "32" => Ok(Self::S32),
            "f32" | "flt" | "float" => Ok(Self::F32),
            other => Err(HcaError::InvalidArgument(format!(
                "未知的采样格式: {other}"
            ))),
        }
    }
}

/// 无符号 8 位, 以 0x80 为零点
pub fn encode_u8(sample: f32, out: &mut Vec<u8>) {
    let v = (sample * 127.0) as i32 + 0x80;
    out.push(v as u8);
}

/// 有符号 16 位小端
pub fn encode_s16(sample: f32, out: &mut Vec<u8>) {
    let v = (sample * 32767.0) as i16;
    out.extend_from_slice(&v.to_le_bytes());
}

/// 有符号 24 位小端
pub fn encode_s24(sample: f32, out: &mut Vec<u8>) {
    let v = (sample * 8_388_607.0) as i32;
    out.extend_from_slice(&v.to_le_bytes()[..3]);
}

/// 有符号 32 位小端, 以 f64 计算避免精度损失
pub fn encode_s32(sample: f32, out: &mut Vec<u8>) {
    let v = (f64::from(sample) * 2_147_483_647.0) as i32;
    out.extend_from_slice(&v.to_le_bytes());
}

/// 32 位浮点小端
pub fn encode_f32(sample: f32, out: &mut Vec<u8>) {
    out.extend_from_slice(&sample.to_le_bytes());
}
