//! 单块解码流水线.
//!
//! [`BlockDecoder`] 持有解码所需的全部状态 (密码表, ATH 曲线, 声道, 噪声种子),
//! 每次把一个原始块解码为 8 个子帧的浮点波形. 块必须按顺序解码,
//! 因为 IMDCT 重叠缓冲与噪声种子在块之间延续.

use log::{debug, trace, warn};

use hca_core::bitreader::BitReader;
use hca_core::crc::verify_crc16;
use hca_core::{HcaError, HcaResult, SampleEncodeFn};

use crate::ath::AthCurve;
use crate::channel::{Channel, apply_intensity_stereo, apply_ms_stereo};
use crate::cipher::Cipher;
use crate::info::{HcaInfo, SAMPLES_PER_SUBFRAME, SUBFRAMES_PER_BLOCK};

/// 块同步字
pub const BLOCK_SYNC: u32 = 0xFFFF;

/// 块解码器
pub struct BlockDecoder {
    info: HcaInfo,
    cipher: Cipher,
    ath: AthCurve,
    channels: Vec<Channel>,
    hfr_group_count: u32,
    random: u32,
    /// 解密后的块数据, 每块复用
    buffer: Vec<u8>,
}

impl BlockDecoder {
    /// 按流参数与密码创建解码器
    pub fn new(info: HcaInfo, cipher: Cipher) -> HcaResult<Self> {
        info.validate()?;
        if info.is_vbr() {
            return Err(HcaError::Unsupported("VBR 块大小".into()));
        }

        let ath = AthCurve::new(info.ath_type, info.sample_rate)?;
        let channels = info
            .channel_types()?
            .into_iter()
            .map(|kind| Channel::new(kind, &info))
            .collect::<Vec<_>>();
        let hfr_group_count = info.hfr_group_count();

        debug!(
            "HCA 块解码器: 版本 {:#06x}, {} 声道, {} Hz, 块大小 {}, 密码类型 {}",
            info.version,
            info.channel_count,
            info.sample_rate,
            info.block_size,
            cipher.cipher_type(),
        );

        Ok(Self {
            random: info.random_seed,
            buffer: vec![0; info.block_size as usize],
            info,
            cipher,
            ath,
            channels,
            hfr_group_count,
        })
    }

    /// 流参数
    pub fn info(&self) -> &HcaInfo {
        &self.info
    }

    /// 声道状态
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// 清空跨块状态, 回到流起点
    pub fn reset(&mut self) {
        for channel in &mut self.channels {
            channel.reset();
        }
        self.random = self.info.random_seed;
    }

    /// 解码一个原始块 (仍处于加密状态)
    ///
    /// 先校验 CRC, 再解密, 然后解包并变换. `index` 仅用于错误信息.
    pub fn decode_block(&mut self, block: &[u8], index: u32) -> HcaResult<()> {
        if block.len() != self.info.block_size as usize {
            return Err(HcaError::DecodeFailed(format!(
                "块 {index} 长度 {} 与块大小 {} 不符",
                block.len(),
                self.info.block_size
            )));
        }
        if !verify_crc16(block) {
            return Err(HcaError::Checksum { block: index });
        }

        let mut buffer = std::mem::take(&mut self.buffer);
        buffer.clear();
        buffer.extend_from_slice(block);
        self.cipher.decrypt(&mut buffer);
        let result = self.decode_plain(&buffer, index);
        self.buffer = buffer;
        result
    }

    fn decode_plain(&mut self, data: &[u8], index: u32) -> HcaResult<()> {
        let info = &self.info;
        let mut br = BitReader::new(data);

        let sync = br.read_bits(16);
        if sync != BLOCK_SYNC {
            return Err(HcaError::DecodeFailed(format!(
                "块 {index} 同步字错误: {sync:#06x}"
            )));
        }

        let acceptable_noise_level = br.read_bits(9);
        let evaluation_boundary = br.read_bits(7);
        let packed_noise_level = (acceptable_noise_level << 8).wrapping_sub(evaluation_boundary);

        for channel in &mut self.channels {
            channel.unpack_scalefactors(&mut br, self.hfr_group_count, info.version)?;
            channel.unpack_intensity(&mut br, self.hfr_group_count, info.version)?;
            channel.calculate_resolution(
                packed_noise_level,
                self.ath.table(),
                info.min_resolution,
                info.max_resolution,
            );
            channel.calculate_gain();
        }

        for subframe in 0..SUBFRAMES_PER_BLOCK {
            for channel in &mut self.channels {
                channel.dequantize(&mut br, subframe);
            }
        }

        // 末尾 16 位为校验和
        if br.position() + 16 > br.len_bits() {
            warn!(
                "块 {index} 读取越界: {} / {} 位",
                br.position(),
                br.len_bits()
            );
        }

        let base = info.base_band_count as usize;
        let total = info.total_band_count as usize;
        let ms_stereo = info.ms_stereo != 0;
        for subframe in 0..SUBFRAMES_PER_BLOCK {
            for channel in &mut self.channels {
                channel.reconstruct_noise(info.min_resolution, ms_stereo, &mut self.random, subframe);
                channel.reconstruct_high_frequency(info, self.hfr_group_count, subframe);
            }

            if info.stereo_band_count > 0 {
                for ch in 0..self.channels.len().saturating_sub(1) {
                    let (left, right) = self.channels.split_at_mut(ch + 1);
                    let primary = &mut left[ch];
                    let secondary = &mut right[0];
                    apply_intensity_stereo(primary, secondary, subframe, base, total);
                    if ms_stereo {
                        apply_ms_stereo(primary, secondary, subframe, base, total);
                    }
                }
            }

            for channel in &mut self.channels {
                channel.imdct(subframe);
            }
        }

        trace!("块 {index} 解码完成, 读取 {} 位", br.position());
        Ok(())
    }

    /// 输出当前块的交错 PCM
    ///
    /// 每个采样先乘以相对音量并限幅到 `[-1, 1]`, 再交给 `encode` 写入.
    pub fn write_samples(&self, volume: f32, encode: SampleEncodeFn, out: &mut Vec<u8>) {
        for subframe in 0..SUBFRAMES_PER_BLOCK {
            for sample in 0..SAMPLES_PER_SUBFRAME {
                for channel in &self.channels {
                    let value = (channel.wave()[subframe][sample] * volume).clamp(-1.0, 1.0);
                    encode(value, out);
                }
            }
        }
    }
}
