//! 单声道解码状态机.
//!
//! 每块按以下顺序处理一个声道:
//! 1. 解包比例因子与强度 (或 v2.0 的高频比例因子)
//! 2. 按 ATH 曲线与噪声电平计算每个系数的分辨率, 求出增益
//! 3. 每个子帧反量化频谱系数
//! 4. 噪声填充与高频重建
//! 5. 联合立体声 (需要成对声道, 见 [`apply_intensity_stereo`] 与 [`apply_ms_stereo`])
//! 6. IMDCT 与重叠相加
//!
//! 跨块保留的只有 IMDCT 重叠缓冲 ([`ChannelPersistentState`]),
//! 其余均为块内临时数据 ([`ChannelBlockScratch`]), 每块复用而不重新分配.

use hca_core::bitreader::BitReader;
use hca_core::{HcaError, HcaResult};

use crate::imdct::imdct_transform;
use crate::info::{HcaInfo, SAMPLES_PER_SUBFRAME, SUBFRAMES_PER_BLOCK, VERSION_V200};
use crate::tables::{
    INTENSITY_RATIO_TABLE, INVERT_TABLE, MAX_BIT_TABLE, MS_STEREO_RATIO, RANGE_TABLE,
    READ_BIT_TABLE, READ_VAL_TABLE, SCALE_CONVERSION_TABLE, SCALING_TABLE,
};

const N: usize = SAMPLES_PER_SUBFRAME;

/// 声道类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelType {
    /// 独立声道
    #[default]
    Discrete,
    /// 立体声主声道
    StereoPrimary,
    /// 立体声从声道 (只编码基础频带, 其余由强度立体声恢复)
    StereoSecondary,
}

/// 跨块保留的声道状态
#[derive(Debug, Clone)]
pub struct ChannelPersistentState {
    /// 上一子帧 IMDCT 的后半部分
    pub imdct_previous: [f32; N],
}

impl Default for ChannelPersistentState {
    fn default() -> Self {
        Self {
            imdct_previous: [0.0; N],
        }
    }
}

/// 块内临时数据
#[derive(Debug, Clone)]
pub struct ChannelBlockScratch {
    pub intensity: [u8; SUBFRAMES_PER_BLOCK],
    pub scalefactors: [u8; N],
    pub resolution: [u8; N],
    /// 前 `noise_count` 项为分辨率为 0 的系数索引, 末尾 `valid_count` 项倒序存放其余索引
    pub noises: [u8; N],
    pub noise_count: usize,
    pub valid_count: usize,
    pub gain: [f32; N],
    pub spectra: [[f32; N]; SUBFRAMES_PER_BLOCK],
    pub temp: [f32; N],
    pub wave: [[f32; N]; SUBFRAMES_PER_BLOCK],
}

impl Default for ChannelBlockScratch {
    fn default() -> Self {
        Self {
            intensity: [0; SUBFRAMES_PER_BLOCK],
            scalefactors: [0; N],
            resolution: [0; N],
            noises: [0; N],
            noise_count: 0,
            valid_count: 0,
            gain: [0.0; N],
            spectra: [[0.0; N]; SUBFRAMES_PER_BLOCK],
            temp: [0.0; N],
            wave: [[0.0; N]; SUBFRAMES_PER_BLOCK],
        }
    }
}

/// 单个声道
#[derive(Debug, Clone)]
pub struct Channel {
    /// 声道类型
    pub kind: ChannelType,
    /// 实际编码的系数个数
    pub coded_count: usize,
    /// 跨块状态
    pub state: ChannelPersistentState,
    /// 块内数据
    pub scratch: ChannelBlockScratch,
}

impl Channel {
    /// 创建声道, 从声道只编码基础频带
    pub fn new(kind: ChannelType, info: &HcaInfo) -> Self {
        let coded_count = match kind {
            ChannelType::StereoSecondary => info.base_band_count,
            _ => info.base_band_count + info.stereo_band_count,
        } as usize;
        Self {
            kind,
            coded_count: coded_count.min(N),
            state: ChannelPersistentState::default(),
            scratch: ChannelBlockScratch::default(),
        }
    }

    /// 清空跨块状态
    pub fn reset(&mut self) {
        self.state = ChannelPersistentState::default();
    }

    /// 输出波形
    pub fn wave(&self) -> &[[f32; N]; SUBFRAMES_PER_BLOCK] {
        &self.scratch.wave
    }

    /// 解包比例因子
    pub fn unpack_scalefactors(
        &mut self,
        br: &mut BitReader,
        hfr_group_count: u32,
        version: u16,
    ) -> HcaResult<()> {
        let sc = &mut self.scratch;
        let mut cs_count = self.coded_count;
        let delta_bits = br.read_bits(3);

        // v3.0 在末尾追加派生的高频比例因子
        let extra_count = if self.kind == ChannelType::StereoSecondary
            || hfr_group_count == 0
            || version <= VERSION_V200
        {
            0
        } else {
            hfr_group_count as usize
        };
        cs_count += extra_count;
        if cs_count > N {
            return Err(HcaError::DecodeFailed(format!(
                "比例因子个数超出范围: {cs_count}"
            )));
        }

        if delta_bits >= 6 {
            for sf in &mut sc.scalefactors[..cs_count] {
                *sf = br.read_bits(6) as u8;
            }
        } else if delta_bits > 0 {
            let expected_delta = (1u32 << delta_bits) - 1;
            let half = (expected_delta >> 1) as i32;
            let mut value = br.read_bits(6) as i32;

            if cs_count > 0 {
                sc.scalefactors[0] = value as u8;
            }
            for i in 1..cs_count {
                let delta = br.read_bits(delta_bits);
                if delta == expected_delta {
                    value = br.read_bits(6) as i32;
                } else {
                    let next = value + delta as i32 - half;
                    if !(0..64).contains(&next) {
                        return Err(HcaError::DecodeFailed(format!(
                            "比例因子越界: {next}"
                        )));
                    }
                    value = next;
                }
                sc.scalefactors[i] = value as u8;
            }
        } else {
            sc.scalefactors.fill(0);
        }

        for i in 0..extra_count {
            sc.scalefactors[N - 1 - i] = sc.scalefactors.get(cs_count - i).copied().unwrap_or(0);
        }
        Ok(())
    }

    /// 解包强度 (从声道) 或 v2.0 高频比例因子 (其他声道)
    pub fn unpack_intensity(
        &mut self,
        br: &mut BitReader,
        hfr_group_count: u32,
        version: u16,
    ) -> HcaResult<()> {
        let sc = &mut self.scratch;

        if self.kind != ChannelType::StereoSecondary {
            if version <= VERSION_V200 {
                let start = N - hfr_group_count as usize;
                for sf in &mut sc.scalefactors[start..] {
                    *sf = br.read_bits(6) as u8;
                }
            }
            return Ok(());
        }

        let mut value = br.peek_bits(4);
        if version <= VERSION_V200 {
            // 值为 15 时不消耗位, 其余子帧沿用上一块
            sc.intensity[0] = value as u8;
            if value < 15 {
                br.skip_bits(4);
                for v in &mut sc.intensity[1..] {
                    *v = br.read_bits(4) as u8;
                }
            }
            return Ok(());
        }

        br.skip_bits(4);
        if value >= 15 {
            sc.intensity.fill(7);
            return Ok(());
        }

        let delta_bits = br.read_bits(2);
        sc.intensity[0] = value as u8;
        if delta_bits == 3 {
            for v in &mut sc.intensity[1..] {
                *v = br.read_bits(4) as u8;
            }
            return Ok(());
        }

        let bmax = (2u32 << delta_bits) - 1;
        let bits = delta_bits + 1;
        for v in &mut sc.intensity[1..] {
            let delta = br.read_bits(bits);
            if delta == bmax {
                value = br.read_bits(4);
            } else {
                let next = value as i32 - (bmax >> 1) as i32 + delta as i32;
                if !(0..=15).contains(&next) {
                    return Err(HcaError::DecodeFailed(format!("强度越界: {next}")));
                }
                value = next as u32;
            }
            *v = value as u8;
        }
        Ok(())
    }

    /// 计算分辨率, 并把系数划分为噪声 (分辨率 0) 与有效两组
    pub fn calculate_resolution(
        &mut self,
        packed_noise_level: u32,
        ath: &[u8; N],
        min_resolution: u32,
        max_resolution: u32,
    ) {
        let sc = &mut self.scratch;
        let mut noise_count = 0usize;
        let mut valid_count = 0usize;

        for i in 0..self.coded_count {
            let scalefactor = sc.scalefactors[i];
            let mut resolution = 0u32;
            if scalefactor > 0 {
                let noise_level =
                    i32::from(ath[i]) + (packed_noise_level.wrapping_add(i as u32) >> 8) as i32;
                let curve_position = noise_level + 1 - ((5 * i32::from(scalefactor)) >> 1);
                resolution = if curve_position < 0 {
                    15
                } else if curve_position <= 65 {
                    u32::from(INVERT_TABLE[curve_position as usize])
                } else {
                    0
                };
                resolution = resolution.clamp(min_resolution, max_resolution.max(min_resolution));

                if resolution < 1 {
                    sc.noises[noise_count] = i as u8;
                    noise_count += 1;
                } else {
                    sc.noises[N - 1 - valid_count] = i as u8;
                    valid_count += 1;
                }
            }
            sc.resolution[i] = resolution as u8;
        }

        sc.noise_count = noise_count;
        sc.valid_count = valid_count;
        sc.resolution[self.coded_count..].fill(0);
    }

    /// 增益 = 比例因子缩放 * 分辨率范围
    pub fn calculate_gain(&mut self) {
        let sc = &mut self.scratch;
        for i in 0..self.coded_count {
            sc.gain[i] = SCALING_TABLE[sc.scalefactors[i] as usize]
                * RANGE_TABLE[sc.resolution[i] as usize];
        }
    }

    /// 反量化一个子帧的频谱系数
    pub fn dequantize(&mut self, br: &mut BitReader, subframe: usize) {
        let sc = &mut self.scratch;
        for i in 0..self.coded_count {
            let resolution = sc.resolution[i];
            let bits = MAX_BIT_TABLE[resolution as usize];
            let code = br.read_bits(u32::from(bits));

            let qc = if resolution > 7 {
                // 最低位为符号位, 零值没有符号位
                let magnitude = (code >> 1) as i32;
                let signed = if code & 1 != 0 { -magnitude } else { magnitude };
                if signed == 0 {
                    br.skip_bits(-1);
                }
                signed as f32
            } else {
                let index = ((resolution as usize) << 4) + code as usize;
                br.skip_bits(i32::from(READ_BIT_TABLE[index]) - i32::from(bits));
                READ_VAL_TABLE[index]
            };
            sc.spectra[subframe][i] = sc.gain[i] * qc;
        }
        sc.spectra[subframe][self.coded_count..].fill(0.0);
    }

    /// 用随机选取的有效系数填充分辨率为 0 的系数
    pub fn reconstruct_noise(
        &mut self,
        min_resolution: u32,
        ms_stereo: bool,
        random: &mut u32,
        subframe: usize,
    ) {
        if min_resolution > 0 {
            return;
        }
        let sc = &mut self.scratch;
        if sc.valid_count == 0 || sc.noise_count == 0 {
            return;
        }
        if ms_stereo && self.kind != ChannelType::StereoPrimary {
            return;
        }

        let valid_count = sc.valid_count as u32;
        let mut r = *random;
        for i in 0..sc.noise_count {
            r = r.wrapping_mul(0x343FD).wrapping_add(0x26_9EC3);
            let random_index =
                (N as u32 - valid_count + (((r & 0x7FFF) * valid_count) >> 15)) as usize;

            let noise_index = sc.noises[i] as usize;
            let valid_index = sc.noises[random_index] as usize;
            let sf_noise = i32::from(sc.scalefactors[noise_index]);
            let sf_valid = i32::from(sc.scalefactors[valid_index]);
            let sc_index = (sf_noise - sf_valid + 62).max(0) as usize;

            sc.spectra[subframe][noise_index] =
                SCALE_CONVERSION_TABLE[sc_index] * sc.spectra[subframe][valid_index];
        }
        *random = r;
    }

    /// 由低频带复制重建高频带
    pub fn reconstruct_high_frequency(&mut self, info: &HcaInfo, hfr_group_count: u32, subframe: usize) {
        if info.bands_per_hfr_group == 0 || self.kind == ChannelType::StereoSecondary {
            return;
        }

        let sc = &mut self.scratch;
        let start_band = (info.stereo_band_count + info.base_band_count) as i32;
        let total = info.total_band_count as i32;
        let hfr_start = N - hfr_group_count as usize;
        let group_limit = if info.version <= VERSION_V200 {
            hfr_group_count
        } else {
            hfr_group_count >> 1
        };

        let mut highband = start_band;
        let mut lowband = start_band - 1;
        for group in 0..hfr_group_count {
            let lowband_sub = i32::from(group < group_limit);
            let hfr_scale = i32::from(sc.scalefactors[hfr_start + group as usize]);

            for _ in 0..info.bands_per_hfr_group {
                if highband >= total || lowband < 0 {
                    break;
                }
                let sc_index =
                    (hfr_scale - i32::from(sc.scalefactors[lowband as usize]) + 63).max(0) as usize;
                sc.spectra[subframe][highband as usize] =
                    SCALE_CONVERSION_TABLE[sc_index] * sc.spectra[subframe][lowband as usize];
                highband += 1;
                lowband -= lowband_sub;
            }
        }

        if highband > 0 {
            sc.spectra[subframe][highband as usize - 1] = 0.0;
        }
    }

    /// IMDCT 并与上一子帧重叠相加
    pub fn imdct(&mut self, subframe: usize) {
        let sc = &mut self.scratch;
        imdct_transform(
            &mut sc.spectra[subframe],
            &mut sc.temp,
            &mut self.state.imdct_previous,
            &mut sc.wave[subframe],
        );
    }
}

/// 强度立体声: 由主声道频谱与从声道的强度比例恢复左右声道
pub fn apply_intensity_stereo(
    primary: &mut Channel,
    secondary: &mut Channel,
    subframe: usize,
    base_band_count: usize,
    total_band_count: usize,
) {
    if primary.kind != ChannelType::StereoPrimary {
        return;
    }
    let ratio_l = INTENSITY_RATIO_TABLE[secondary.scratch.intensity[subframe] as usize & 0xF];
    let ratio_r = 2.0 - ratio_l;
    let sp_l = &mut primary.scratch.spectra[subframe];
    let sp_r = &mut secondary.scratch.spectra[subframe];
    for band in base_band_count..total_band_count.min(N) {
        let coef = sp_l[band];
        sp_l[band] = coef * ratio_l;
        sp_r[band] = coef * ratio_r;
    }
}

/// M/S 立体声: 由中间声道与差值声道恢复左右声道
pub fn apply_ms_stereo(
    primary: &mut Channel,
    secondary: &mut Channel,
    subframe: usize,
    base_band_count: usize,
    total_band_count: usize,
) {
    if primary.kind != ChannelType::StereoPrimary {
        return;
    }
    let sp_l = &mut primary.scratch.spectra[subframe];
    let sp_r = &mut secondary.scratch.spectra[subframe];
    for band in base_band_count..total_band_count.min(N) {
        let l = sp_l[band];
        let r = sp_r[band];
        sp_l[band] = (l + r) * MS_STEREO_RATIO;
        sp_r[band] = (l - r) * MS_STEREO_RATIO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::info::VERSION_V300;
    use hca_core::bitwriter::BitWriter;

    fn info_with_bands(base: u32, stereo: u32, total: u32) -> HcaInfo {
        HcaInfo {
            block_size: 0x100,
            base_band_count: base,
            stereo_band_count: stereo,
            total_band_count: total,
            ..HcaInfo::default()
        }
    }

    fn channel(kind: ChannelType, coded: u32) -> Channel {
        Channel::new(kind, &info_with_bands(coded, 0, coded))
    }

    #[test]
    fn test_从声道只编码基础频带() {
        let info = info_with_bands(20, 10, 40);
        assert_eq!(Channel::new(ChannelType::StereoPrimary, &info).coded_count, 30);
        assert_eq!(Channel::new(ChannelType::StereoSecondary, &info).coded_count, 20);
        assert_eq!(Channel::new(ChannelType::Discrete, &info).coded_count, 30);
    }

    #[test]
    fn test_比例因子_固定位宽() {
        let mut bw = BitWriter::new();
        bw.write_bits(6, 3);
        for v in [1, 2, 63, 0] {
            bw.write_bits(v, 6);
        }
        let data = bw.finish();
        let mut br = BitReader::new(&data);
        let mut ch = channel(ChannelType::Discrete, 4);
        ch.unpack_scalefactors(&mut br, 0, VERSION_V200).unwrap();
        assert_eq!(&ch.scratch.scalefactors[..4], &[1, 2, 63, 0]);
        assert_eq!(br.position(), 27);
    }

    #[test]
    fn test_比例因子_差分与转义() {
        let mut bw = BitWriter::new();
        bw.write_bits(2, 3);
        bw.write_bits(10, 6);
        bw.write_bits(2, 2); // +1
        bw.write_bits(3, 2); // 转义
        bw.write_bits(40, 6);
        bw.write_bits(0, 2); // -1
        let data = bw.finish();
        let mut br = BitReader::new(&data);
        let mut ch = channel(ChannelType::Discrete, 4);
        ch.unpack_scalefactors(&mut br, 0, VERSION_V200).unwrap();
        assert_eq!(&ch.scratch.scalefactors[..4], &[10, 11, 40, 39]);
    }

    #[test]
    fn test_比例因子_差分越界() {
        let mut bw = BitWriter::new();
        bw.write_bits(2, 3);
        bw.write_bits(63, 6);
        bw.write_bits(2, 2);
        let data = bw.finish();
        let mut br = BitReader::new(&data);
        let mut ch = channel(ChannelType::Discrete, 2);
        let err = ch.unpack_scalefactors(&mut br, 0, VERSION_V200).unwrap_err();
        assert!(matches!(err, HcaError::DecodeFailed(_)));
    }

    #[test]
    fn test_比例因子_零位宽全部清零() {
        let data = [0u8; 4];
        let mut br = BitReader::new(&data);
        let mut ch = channel(ChannelType::Discrete, 4);
        ch.scratch.scalefactors.fill(5);
        ch.unpack_scalefactors(&mut br, 0, VERSION_V200).unwrap();
        assert!(ch.scratch.scalefactors.iter().all(|&v| v == 0));
        assert_eq!(br.position(), 3);
    }

    #[test]
    fn test_比例因子_v3_派生高频比例() {
        let mut bw = BitWriter::new();
        bw.write_bits(6, 3);
        for v in 1..=6 {
            bw.write_bits(v, 6);
        }
        let data = bw.finish();
        let mut br = BitReader::new(&data);
        let mut ch = channel(ChannelType::Discrete, 4);
        ch.unpack_scalefactors(&mut br, 2, VERSION_V300).unwrap();
        assert_eq!(&ch.scratch.scalefactors[..6], &[1, 2, 3, 4, 5, 6]);
        assert_eq!(ch.scratch.scalefactors[126], 6);
        assert_eq!(ch.scratch.scalefactors[127], 0);
        assert_eq!(br.position(), 3 + 36);
    }

    #[test]
    fn test_强度_v2_固定位宽() {
        let mut bw = BitWriter::new();
        bw.write_bits(3, 4);
        for v in 1..=7 {
            bw.write_bits(v, 4);
        }
        let data = bw.finish();
        let mut br = BitReader::new(&data);
        let mut ch = channel(ChannelType::StereoSecondary, 4);
        ch.unpack_intensity(&mut br, 0, VERSION_V200).unwrap();
        assert_eq!(ch.scratch.intensity, [3, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(br.position(), 32);
    }

    #[test]
    fn test_强度_v2_值15不消耗位() {
        let data = [0xF0, 0x00];
        let mut br = BitReader::new(&data);
        let mut ch = channel(ChannelType::StereoSecondary, 4);
        ch.unpack_intensity(&mut br, 0, VERSION_V200).unwrap();
        assert_eq!(ch.scratch.intensity[0], 15);
        assert_eq!(br.position(), 0);
    }

    #[test]
    fn test_强度_v3_差分() {
        let mut bw = BitWriter::new();
        bw.write_bits(5, 4);
        bw.write_bits(1, 2); // 2 位差分
        bw.write_bits(2, 2); // +1
        bw.write_bits(3, 2); // 转义
        bw.write_bits(12, 4);
        for _ in 0..5 {
            bw.write_bits(1, 2); // 不变
        }
        bw.write_bits(0, 2);
        let data = bw.finish();
        let mut br = BitReader::new(&data);
        let mut ch = channel(ChannelType::StereoSecondary, 4);
        ch.unpack_intensity(&mut br, 0, VERSION_V300).unwrap();
        assert_eq!(ch.scratch.intensity, [5, 6, 12, 12, 12, 12, 12, 12]);
    }

    #[test]
    fn test_强度_v3_值15与越界() {
        let data = [0xF0];
        let mut br = BitReader::new(&data);
        let mut ch = channel(ChannelType::StereoSecondary, 4);
        ch.unpack_intensity(&mut br, 0, VERSION_V300).unwrap();
        assert_eq!(ch.scratch.intensity, [7; 8]);
        assert_eq!(br.position(), 4);

        let mut bw = BitWriter::new();
        bw.write_bits(0, 4);
        bw.write_bits(0, 2); // 1 位差分, bmax = 1
        bw.write_bits(0, 1); // 0 - 0 + 0 = 0
        bw.write_bits(0, 1);
        let data = bw.finish();
        let mut br = BitReader::new(&data);
        // 0 - (1 >> 1) + 0 = 0, 合法
        ch.unpack_intensity(&mut br, 0, VERSION_V300).unwrap();

        let mut bw = BitWriter::new();
        bw.write_bits(0, 4);
        bw.write_bits(2, 2); // 3 位差分, bmax = 7, 偏移 3
        bw.write_bits(0, 3); // 0 - 3 + 0 < 0
        let data = bw.finish();
        let mut br = BitReader::new(&data);
        assert!(ch.unpack_intensity(&mut br, 0, VERSION_V300).is_err());
    }

    #[test]
    fn test_v2_高频比例因子() {
        let mut bw = BitWriter::new();
        for v in [7, 8, 9] {
            bw.write_bits(v, 6);
        }
        let data = bw.finish();
        let mut br = BitReader::new(&data);
        let mut ch = channel(ChannelType::Discrete, 4);
        ch.unpack_intensity(&mut br, 3, VERSION_V200).unwrap();
        assert_eq!(&ch.scratch.scalefactors[125..], &[7, 8, 9]);
    }

    #[test]
    fn test_分辨率与噪声划分() {
        let ath = [0u8; N];
        let mut ch = channel(ChannelType::Discrete, 4);
        ch.scratch.scalefactors[..4].copy_from_slice(&[0, 63, 10, 30]);
        ch.calculate_resolution(100 << 8, &ath, 1, 15);
        assert_eq!(&ch.scratch.resolution[..4], &[0, 15, 1, 10]);
        assert_eq!(ch.scratch.noise_count, 0);
        assert_eq!(ch.scratch.valid_count, 3);
        assert_eq!(&ch.scratch.noises[125..], &[3, 2, 1]);

        // v3 允许分辨率 0, 该系数进入噪声组
        ch.calculate_resolution(100 << 8, &ath, 0, 15);
        assert_eq!(&ch.scratch.resolution[..4], &[0, 15, 0, 10]);
        assert_eq!(ch.scratch.noise_count, 1);
        assert_eq!(ch.scratch.noises[0], 2);
        assert_eq!(ch.scratch.valid_count, 2);
    }

    #[test]
    fn test_分辨率_噪声电平回绕() {
        let ath = [0u8; N];
        let mut ch = channel(ChannelType::Discrete, 1);
        ch.scratch.scalefactors[0] = 63;
        // 0 << 8 - 1 回绕为极大值, 曲线位置超出表范围, 分辨率钳到下限
        ch.calculate_resolution(0u32.wrapping_sub(1), &ath, 1, 15);
        assert_eq!(ch.scratch.resolution[0], 1);
    }

    #[test]
    fn test_增益() {
        let mut ch = channel(ChannelType::Discrete, 2);
        ch.scratch.scalefactors[..2].copy_from_slice(&[63, 1]);
        ch.scratch.resolution[..2].copy_from_slice(&[15, 1]);
        ch.calculate_gain();
        assert_eq!(ch.scratch.gain[0], SCALING_TABLE[63] * RANGE_TABLE[15]);
        assert_eq!(ch.scratch.gain[1], SCALING_TABLE[1] * RANGE_TABLE[1]);
    }

    #[test]
    fn test_反量化_符号幅度与前缀码() {
        let mut bw = BitWriter::new();
        bw.write_bits(10, 12); // +5
        bw.write_bits(0, 11); // 零值少一位
        bw.write_bits(0b10, 2); // 前缀码 +1
        bw.write_bits(11, 12); // -5
        let data = bw.finish();
        let mut br = BitReader::new(&data);

        let mut ch = channel(ChannelType::Discrete, 4);
        ch.scratch.resolution[..4].copy_from_slice(&[15, 15, 1, 15]);
        ch.scratch.gain[..4].copy_from_slice(&[1.0, 1.0, 0.5, 2.0]);
        ch.scratch.spectra[2].fill(9.0);
        ch.dequantize(&mut br, 2);
        assert_eq!(&ch.scratch.spectra[2][..4], &[5.0, 0.0, 0.5, -10.0]);
        assert!(ch.scratch.spectra[2][4..].iter().all(|&v| v == 0.0));
        assert_eq!(br.position(), 12 + 11 + 2 + 12);
    }

    #[test]
    fn test_噪声填充() {
        let mut ch = channel(ChannelType::Discrete, 4);
        ch.scratch.scalefactors[..4].copy_from_slice(&[30, 0, 30, 0]);
        ch.scratch.noises[0] = 2;
        ch.scratch.noises[N - 1] = 0;
        ch.scratch.noise_count = 1;
        ch.scratch.valid_count = 1;
        ch.scratch.spectra[0][0] = 2.0;

        let mut random = 1u32;
        ch.reconstruct_noise(1, false, &mut random, 0);
        assert_eq!(ch.scratch.spectra[0][2], 0.0);
        assert_eq!(random, 1);

        ch.reconstruct_noise(0, false, &mut random, 0);
        assert_eq!(ch.scratch.spectra[0][2], SCALE_CONVERSION_TABLE[62] * 2.0);
        assert_eq!(random, 0x343FD + 0x26_9EC3);

        // M/S 立体声时只处理主声道
        let mut random = 1u32;
        ch.reconstruct_noise(0, true, &mut random, 1);
        assert_eq!(random, 1);
    }

    #[test]
    fn test_高频重建() {
        let info = HcaInfo {
            bands_per_hfr_group: 2,
            ..info_with_bands(4, 0, 8)
        };
        let hfr_groups = info.hfr_group_count();
        assert_eq!(hfr_groups, 2);

        let mut ch = Channel::new(ChannelType::Discrete, &info);
        ch.scratch.scalefactors[..4].copy_from_slice(&[10, 20, 30, 40]);
        ch.scratch.scalefactors[126] = 40;
        ch.scratch.scalefactors[127] = 40;
        ch.scratch.spectra[0][..4].copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
        ch.reconstruct_high_frequency(&info, hfr_groups, 0);

        let sp = &ch.scratch.spectra[0];
        assert_eq!(sp[4], 4.0);
        assert_eq!(sp[5], SCALE_CONVERSION_TABLE[73] * 3.0);
        assert_eq!(sp[6], SCALE_CONVERSION_TABLE[83] * 2.0);
        assert_eq!(sp[7], 0.0);
    }

    #[test]
    fn test_高频重建_v3_组限减半() {
        let info = HcaInfo {
            version: VERSION_V300,
            bands_per_hfr_group: 2,
            ..info_with_bands(4, 0, 8)
        };
        let mut ch = Channel::new(ChannelType::Discrete, &info);
        ch.scratch.scalefactors[..4].copy_from_slice(&[10, 20, 30, 40]);
        ch.scratch.scalefactors[126] = 40;
        ch.scratch.scalefactors[127] = 40;
        ch.scratch.spectra[0][..4].copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
        ch.reconstruct_high_frequency(&info, 2, 0);

        // 第二组不再向低频移动, 重复使用频带 1
        let sp = &ch.scratch.spectra[0];
        assert_eq!(sp[6], SCALE_CONVERSION_TABLE[83] * 2.0);
        assert_eq!(sp[7], 0.0);
    }

    #[test]
    fn test_高频重建_从声道跳过() {
        let info = HcaInfo {
            bands_per_hfr_group: 2,
            ..info_with_bands(4, 0, 8)
        };
        let mut ch = Channel::new(ChannelType::StereoSecondary, &info);
        ch.scratch.spectra[0][..4].copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
        ch.reconstruct_high_frequency(&info, 2, 0);
        assert!(ch.scratch.spectra[0][4..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_强度立体声() {
        let info = info_with_bands(2, 2, 4);
        let mut left = Channel::new(ChannelType::StereoPrimary, &info);
        let mut right = Channel::new(ChannelType::StereoSecondary, &info);
        left.scratch.spectra[0][..4].copy_from_slice(&[1.0, 1.0, 3.0, 4.0]);
        right.scratch.spectra[0][..4].copy_from_slice(&[5.0, 5.0, 9.0, 9.0]);
        right.scratch.intensity[0] = 0;

        apply_intensity_stereo(&mut left, &mut right, 0, 2, 4);
        assert_eq!(&left.scratch.spectra[0][..4], &[1.0, 1.0, 6.0, 8.0]);
        assert_eq!(&right.scratch.spectra[0][..4], &[5.0, 5.0, 0.0, 0.0]);
    }

    #[test]
    fn test_强度立体声_非主声道不处理() {
        let info = info_with_bands(2, 2, 4);
        let mut left = Channel::new(ChannelType::Discrete, &info);
        let mut right = Channel::new(ChannelType::Discrete, &info);
        left.scratch.spectra[0][..4].copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
        apply_intensity_stereo(&mut left, &mut right, 0, 2, 4);
        assert_eq!(&left.scratch.spectra[0][..4], &[1.0, 2.0, 3.0, 4.0]);
        assert!(right.scratch.spectra[0].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_ms_立体声() {
        let info = info_with_bands(0, 2, 2);
        let mut left = Channel::new(ChannelType::StereoPrimary, &info);
        let mut right = Channel::new(ChannelType::StereoSecondary, &info);
        left.scratch.spectra[3][..2].copy_from_slice(&[1.0, 2.0]);
        right.scratch.spectra[3][..2].copy_from_slice(&[0.5, 2.0]);
        apply_ms_stereo(&mut left, &mut right, 3, 0, 2);
        assert_eq!(left.scratch.spectra[3][0], 1.5 * MS_STEREO_RATIO);
        assert_eq!(right.scratch.spectra[3][0], 0.5 * MS_STEREO_RATIO);
        assert_eq!(left.scratch.spectra[3][1], 4.0 * MS_STEREO_RATIO);
        assert_eq!(right.scratch.spectra[3][1], 0.0);
    }

    #[test]
    fn test_重置清空重叠缓冲() {
        let mut ch = channel(ChannelType::Discrete, 4);
        ch.scratch.spectra[0][0] = 1.0;
        ch.imdct(0);
        assert!(ch.state.imdct_previous.iter().any(|&v| v != 0.0));
        ch.reset();
        assert!(ch.state.imdct_previous.iter().all(|&v| v == 0.0));
    }
}
