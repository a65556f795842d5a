//! HCA 流参数.
//!
//! [`HcaInfo`] 由头部解析产生, 解码期间只读. 字段与头部各块一一对应,
//! 派生量 (高频组数, 声道类型布局) 由方法按需计算.

use hca_core::{HcaError, HcaResult};

use crate::channel::ChannelType;

/// 每块子帧数
pub const SUBFRAMES_PER_BLOCK: usize = 8;
/// 每子帧采样数 (同时也是频谱系数个数)
pub const SAMPLES_PER_SUBFRAME: usize = 128;
/// 每块采样数
pub const SAMPLES_PER_BLOCK: usize = SUBFRAMES_PER_BLOCK * SAMPLES_PER_SUBFRAME;

/// 已知的码流版本
pub const VERSION_V101: u16 = 0x0101;
pub const VERSION_V102: u16 = 0x0102;
pub const VERSION_V103: u16 = 0x0103;
pub const VERSION_V200: u16 = 0x0200;
pub const VERSION_V300: u16 = 0x0300;

/// 块大小下限与上限
pub const MIN_BLOCK_SIZE: u32 = 0x8;
pub const MAX_BLOCK_SIZE: u32 = 0xFFFF;

/// 声道数范围
pub const MIN_CHANNELS: u32 = 1;
pub const MAX_CHANNELS: u32 = 16;

/// 采样率上限
pub const MAX_SAMPLE_RATE: u32 = 0x7F_FFFF;

/// 噪声生成器初始种子
pub const DEFAULT_RANDOM_SEED: u32 = 1;

/// 循环重复次数字段中表示无限循环的值
pub const LOOP_INFINITE: u16 = 0x80;

/// 循环区间 (块索引, 闭区间)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopInfo {
    /// 循环起始块
    pub start_block: u32,
    /// 循环结束块 (包含)
    pub end_block: u32,
    /// 重复次数, 0x80 表示无限
    pub repeat_count: u16,
    /// 尾部保留字段
    pub trailing: u16,
}

impl LoopInfo {
    /// 是否为无限循环
    pub fn is_infinite(&self) -> bool {
        self.repeat_count == LOOP_INFINITE
    }

    /// 循环区间包含的块数
    pub fn block_count(&self) -> u32 {
        self.end_block - self.start_block + 1
    }
}

/// HCA 流参数
#[derive(Debug, Clone, PartialEq)]
pub struct HcaInfo {
    /// 版本号 (major * 0x100 + minor)
    pub version: u16,
    /// 头部大小, 即第一个数据块的偏移
    pub data_offset: u16,
    /// 声道数
    pub channel_count: u32,
    /// 采样率
    pub sample_rate: u32,
    /// 数据块数
    pub block_count: u32,
    /// 编码器前置延迟 (采样数)
    pub encoder_delay: u16,
    /// 编码器尾部填充 (采样数)
    pub encoder_padding: u16,
    /// 块大小 (字节), 0 表示 VBR
    pub block_size: u32,
    /// 最小分辨率
    pub min_resolution: u32,
    /// 最大分辨率
    pub max_resolution: u32,
    /// 轨道数
    pub track_count: u32,
    /// 声道配置
    pub channel_config: u32,
    /// 总频带数
    pub total_band_count: u32,
    /// 基础频带数
    pub base_band_count: u32,
    /// 立体声频带数
    pub stereo_band_count: u32,
    /// 每个高频组的频带数
    pub bands_per_hfr_group: u32,
    /// M/S 立体声标志 (v3.0)
    pub ms_stereo: u32,
    /// VBR 最大块大小
    pub vbr_max_block_size: u16,
    /// VBR 噪声电平
    pub vbr_noise_level: u16,
    /// ATH 曲线类型
    pub ath_type: u32,
    /// 循环信息
    pub loop_info: Option<LoopInfo>,
    /// 密码类型 (0, 1, 56)
    pub cipher_type: u32,
    /// 相对音量
    pub rva_volume: f32,
    /// 注释原始字节 (Shift-JIS)
    pub comment: Option<Vec<u8>>,
    /// 噪声生成器初始种子
    pub random_seed: u32,
}

impl Default for HcaInfo {
    fn default() -> Self {
        Self {
            version: VERSION_V200,
            data_offset: 0,
            channel_count: 1,
            sample_rate: 44100,
            block_count: 0,
            encoder_delay: 0,
            encoder_padding: 0,
            block_size: 0,
            min_resolution: 1,
            max_resolution: 15,
            track_count: 1,
            channel_config: 0,
            total_band_count: 0,
            base_band_count: 0,
            stereo_band_count: 0,
            bands_per_hfr_group: 0,
            ms_stereo: 0,
            vbr_max_block_size: 0,
            vbr_noise_level: 0,
            ath_type: 0,
            loop_info: None,
            cipher_type: 0,
            rva_volume: 1.0,
            comment: None,
            random_seed: DEFAULT_RANDOM_SEED,
        }
    }
}

impl HcaInfo {
    /// 是否为可变块大小流
    pub fn is_vbr(&self) -> bool {
        self.block_size == 0
    }

    /// 高频重建组数
    pub fn hfr_group_count(&self) -> u32 {
        if self.bands_per_hfr_group == 0 {
            return 0;
        }
        let bands = self
            .total_band_count
            .saturating_sub(self.base_band_count)
            .saturating_sub(self.stereo_band_count);
        bands.div_ceil(self.bands_per_hfr_group)
    }

    /// 总采样数 (每声道, 含编码器延迟与填充)
    pub fn sample_count(&self) -> u64 {
        u64::from(self.block_count) * SAMPLES_PER_BLOCK as u64
    }

    /// 时长 (秒)
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.sample_count() as f64 / f64::from(self.sample_rate)
    }

    /// 每轨道声道数
    pub fn channels_per_track(&self) -> u32 {
        self.channel_count / self.track_count.max(1)
    }

    /// 校验参数范围
    pub fn validate(&self) -> HcaResult<()> {
        if !matches!(
            self.version,
            VERSION_V101 | VERSION_V102 | VERSION_V103 | VERSION_V200 | VERSION_V300
        ) {
            return Err(HcaError::Header(format!(
                "未知的版本: {:#06x}",
                self.version
            )));
        }
        if !(MIN_CHANNELS..=MAX_CHANNELS).contains(&self.channel_count) {
            return Err(HcaError::Header(format!(
                "声道数超出范围: {}",
                self.channel_count
            )));
        }
        if !(1..=MAX_SAMPLE_RATE).contains(&self.sample_rate) {
            return Err(HcaError::Header(format!(
                "采样率超出范围: {}",
                self.sample_rate
            )));
        }
        if !self.is_vbr() && !(MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&self.block_size) {
            return Err(HcaError::Header(format!(
                "块大小超出范围: {}",
                self.block_size
            )));
        }
        if self.version <= VERSION_V200 {
            if self.min_resolution != 1 || self.max_resolution != 15 {
                return Err(HcaError::Header(format!(
                    "分辨率范围无效: {}..{}",
                    self.min_resolution, self.max_resolution
                )));
            }
        } else if self.min_resolution > self.max_resolution || self.max_resolution > 15 {
            return Err(HcaError::Header(format!(
                "分辨率范围无效: {}..{}",
                self.min_resolution, self.max_resolution
            )));
        }
        if self.track_count == 0 || self.track_count > self.channel_count {
            return Err(HcaError::Header(format!(
                "轨道数无效: {}",
                self.track_count
            )));
        }
        let limit = SAMPLES_PER_SUBFRAME as u32;
        if self.total_band_count > limit
            || self.base_band_count > limit
            || self.stereo_band_count > limit
            || self.base_band_count + self.stereo_band_count > limit
            || self.bands_per_hfr_group > limit
        {
            return Err(HcaError::Header(format!(
                "频带数超出范围: total={} base={} stereo={} hfr={}",
                self.total_band_count,
                self.base_band_count,
                self.stereo_band_count,
                self.bands_per_hfr_group
            )));
        }
        if let Some(lp) = &self.loop_info {
            if lp.start_block > lp.end_block || lp.end_block >= self.block_count {
                return Err(HcaError::Header(format!(
                    "循环区间无效: {}..={} (共 {} 块)",
                    lp.start_block, lp.end_block, self.block_count
                )));
            }
        }
        if !matches!(self.ath_type, 0 | 1) {
            return Err(HcaError::Header(format!(
                "未知的 ATH 类型: {}",
                self.ath_type
            )));
        }
        if !matches!(self.cipher_type, 0 | 1 | 56) {
            return Err(HcaError::Header(format!(
                "未知的密码类型: {}",
                self.cipher_type
            )));
        }
        Ok(())
    }

    /// 计算每个声道的类型
    ///
    /// 只有存在立体声频带且每轨道多于一个声道时才会出现主/从声道,
    /// 其余情况全部为独立声道.
    pub fn channel_types(&self) -> HcaResult<Vec<ChannelType>> {
        use ChannelType::{Discrete as D, StereoPrimary as P, StereoSecondary as S};

        let mut types = vec![D; self.channel_count as usize];
        let per_track = self.channels_per_track() as usize;
        if self.stereo_band_count == 0 || per_track <= 1 {
            return Ok(types);
        }

        let layout: Vec<ChannelType> = match per_track {
            2 => vec![P, S],
            3 => vec![P, S, D],
            4 if self.channel_config == 0 => vec![P, S, P, S],
            4 => vec![P, S, D, D],
            5 if self.channel_config <= 2 => vec![P, S, D, P, S],
            5 => vec![P, S, D, D, D],
            6 => vec![P, S, D, D, P, S],
            7 => vec![P, S, D, D, P, S, D],
            8 => vec![P, S, D, D, P, S, P, S],
            n => {
                return Err(HcaError::Header(format!(
                    "不支持的每轨道声道数: {n}"
                )));
            }
        };
        for track in 0..self.track_count as usize {
            let start = track * per_track;
            types[start..start + per_track].copy_from_slice(&layout);
        }
        Ok(types)
    }
}
