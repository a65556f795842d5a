//! HCA 流解码器.
//!
//! [`HcaDecoder`] 把 HCA 流呈现为一条可随机读取的 PCM 字节流:
//! ```text
//! [WAV 头 (可选)] [块 0] [块 1] ... [块 N-1]
//! ```
//! 启用循环且源带有循环区间时, 虚拟流中循环区间重复 `loop_count` 次,
//! 读取位置经 [`HcaDecoder::map_looped_position`] 映射回单遍流.
//!
//! 块按需解码并缓存. 由于 IMDCT 重叠与噪声种子跨块延续,
//! 块总是按升序解码: 请求块 n 时, 先解码之前所有尚未解码的块.

use std::io::{self, Read, Seek, SeekFrom};

use bytes::Bytes;
use log::{debug, trace};

use hca_codec::info::{HcaInfo, LoopInfo, SAMPLES_PER_BLOCK};
use hca_codec::{BlockDecoder, Cipher};
use hca_core::{HcaError, HcaResult, SampleEncodeFn};

use crate::config::DecoderConfig;
use crate::header::read_header;
use crate::io::IoContext;
use crate::wave::{build_wave_header, wave_header_size};

/// HCA 流解码器
pub struct HcaDecoder<'a> {
    /// 字节源, 解码器不负责关闭
    io: &'a mut IoContext,
    /// HCA 流在字节源中的起始偏移
    stream_start: u64,
    config: DecoderConfig,
    blocks: BlockDecoder,
    encode: SampleEncodeFn,
    /// WAV 头, 未启用时为空
    wave_header: Vec<u8>,
    /// 每块解码后的 PCM 字节数
    wave_block_size: u64,
    /// 虚拟流总长度
    length: u64,
    /// 已解码块缓存
    cache: Vec<Option<Bytes>>,
    /// 下一个待解码的块
    next_block: u32,
    /// 原始块读取缓冲区
    raw: Vec<u8>,
    /// 虚拟流读取位置
    position: u64,
}

impl<'a> HcaDecoder<'a> {
    /// 从字节源当前位置打开 HCA 流
    pub fn new(io: &'a mut IoContext, config: DecoderConfig) -> HcaResult<Self> {
        let stream_start = io.position()?;
        let info = read_header(io)?;

        if config.loop_enabled && info.loop_info.is_some() && config.loop_count == 0 {
            return Err(HcaError::InvalidArgument(
                "启用循环时循环次数不能为 0".into(),
            ));
        }

        let cipher = Cipher::new(info.cipher_type, config.cipher_key(), config.key_modifier)?;
        let blocks = BlockDecoder::new(info, cipher)?;
        let info = blocks.info();

        let wave_block_size = SAMPLES_PER_BLOCK as u64
            * u64::from(info.channel_count)
            * u64::from(config.sample_format.bytes_per_sample());
        let header_len = if config.wave_header_enabled {
            wave_header_size(info, config.soft_loop) as u64
        } else {
            0
        };
        let length = header_len + stream_bytes(info, &config, wave_block_size);
        let wave_header = if config.wave_header_enabled {
            build_wave_header(
                info,
                config.sample_format,
                config.soft_loop,
                length - header_len,
            )?
        } else {
            Vec::new()
        };

        debug!(
            "HCA 解码器: {} 块, 每块输出 {} 字节, 虚拟流长度 {}, 循环 {}",
            info.block_count,
            wave_block_size,
            length,
            if active_loop(info, &config).is_some() {
                config.loop_count
            } else {
                0
            },
        );

        let cache = vec![None; info.block_count as usize];
        let raw = vec![0; info.block_size as usize];
        Ok(Self {
            stream_start,
            encode: config.encoder(),
            cache,
            raw,
            io,
            config,
            blocks,
            wave_header,
            wave_block_size,
            length,
            next_block: 0,
            position: 0,
        })
    }

    /// 流参数
    pub fn info(&self) -> &HcaInfo {
        self.blocks.info()
    }

    /// 解码器配置
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// WAV 头字节, 未启用时为空
    pub fn wave_header(&self) -> &[u8] {
        &self.wave_header
    }

    /// 每块解码后的 PCM 字节数
    pub fn wave_block_size(&self) -> u64 {
        self.wave_block_size
    }

    /// 虚拟流总长度 (含 WAV 头与循环展开)
    pub fn length(&self) -> u64 {
        self.length
    }

    /// 当前虚拟读取位置
    pub fn position(&self) -> u64 {
        self.position
    }

    /// 设置虚拟读取位置, 超出长度后读取返回 0
    pub fn set_position(&mut self, position: u64) {
        self.position = position;
    }

    /// 把虚拟流位置映射回单遍流位置
    ///
    /// 第一遍循环结束之前的位置原样返回; 之后减去已完整经过的循环区间长度,
    /// 最多减去 `loop_count - 1` 次, 使最后一遍与循环后部分落回单遍流.
    pub fn map_looped_position(&self, position: u64) -> u64 {
        let Some(lp) = active_loop(self.info(), &self.config) else {
            return position;
        };

        let header_len = self.wave_header.len() as u64;
        let pre_loop = u64::from(lp.start_block) * self.wave_block_size;
        let loop_len = u64::from(lp.block_count()) * self.wave_block_size;
        if position < header_len + pre_loop + loop_len {
            return position;
        }

        let elapsed = (position - header_len - pre_loop) / loop_len;
        let repeats = elapsed.min(u64::from(self.config.loop_count.saturating_sub(1)));
        position - repeats * loop_len
    }

    /// 解码指定块, 返回其 PCM 字节
    pub fn decode_block(&mut self, index: u32) -> HcaResult<Bytes> {
        let block_count = self.info().block_count;
        if index >= block_count {
            return Err(HcaError::InvalidArgument(format!(
                "块索引 {index} 超出范围 (共 {block_count} 块)"
            )));
        }
        while self.next_block <= index {
            self.decode_next()?;
        }
        self.cache[index as usize]
            .clone()
            .ok_or_else(|| HcaError::DecodeFailed(format!("块 {index} 不在缓存中")))
    }

    fn decode_next(&mut self) -> HcaResult<()> {
        let index = self.next_block;
        let (data_offset, block_size) = {
            let info = self.info();
            (u64::from(info.data_offset), u64::from(info.block_size))
        };

        self.io.seek(SeekFrom::Start(
            self.stream_start + data_offset + block_size * u64::from(index),
        ))?;
        let read = self.io.read(&mut self.raw)?;
        if read < self.raw.len() {
            return Err(HcaError::DecodeFailed(format!(
                "块 {index} 数据不足: {read}/{}",
                self.raw.len()
            )));
        }
        self.blocks.decode_block(&self.raw, index)?;

        let mut pcm = Vec::with_capacity(self.wave_block_size as usize);
        let volume = self.info().rva_volume;
        self.blocks.write_samples(volume, self.encode, &mut pcm);
        if pcm.len() as u64 != self.wave_block_size {
            return Err(HcaError::InvalidArgument(format!(
                "采样编码函数输出 {} 字节, 期望 {} 字节",
                pcm.len(),
                self.wave_block_size
            )));
        }

        trace!("HCA 块 {index} 解码完成");
        self.cache[index as usize] = Some(Bytes::from(pcm));
        self.next_block += 1;
        Ok(())
    }

    /// 从当前位置读取, 返回读取的字节数, 到达末尾返回 0
    pub fn read(&mut self, buf: &mut [u8]) -> HcaResult<usize> {
        let header_len = self.wave_header.len() as u64;
        let mut total = 0usize;

        while total < buf.len() && self.position < self.length {
            let mapped = self.map_looped_position(self.position);
            let wanted = ((buf.len() - total) as u64).min(self.length - self.position);
            let copied = if mapped < header_len {
                let start = mapped as usize;
                let n = (header_len - mapped).min(wanted) as usize;
                buf[total..total + n].copy_from_slice(&self.wave_header[start..start + n]);
                n
            } else {
                let audio = mapped - header_len;
                let index = (audio / self.wave_block_size) as u32;
                let offset = (audio % self.wave_block_size) as usize;
                let block = self.decode_block(index)?;
                let n = (self.wave_block_size - offset as u64).min(wanted) as usize;
                buf[total..total + n].copy_from_slice(&block[offset..offset + n]);
                n
            };
            total += copied;
            self.position += copied as u64;
        }

        Ok(total)
    }

    /// 读取到 `buffer[offset..offset + count]`, `count` 按缓冲区剩余长度截断
    pub fn read_at(&mut self, buffer: &mut [u8], offset: usize, count: usize) -> HcaResult<usize> {
        let count = count.min(buffer.len().saturating_sub(offset));
        if count == 0 {
            return Ok(0);
        }
        self.read(&mut buffer[offset..offset + count])
    }
}

/// 生效的循环区间: 源带有循环且配置启用了循环
fn active_loop<'i>(info: &'i HcaInfo, config: &DecoderConfig) -> Option<&'i LoopInfo> {
    info.loop_info.as_ref().filter(|_| config.loop_enabled)
}

/// 虚拟流中 PCM 部分的长度
fn stream_bytes(info: &HcaInfo, config: &DecoderConfig, wave_block_size: u64) -> u64 {
    match active_loop(info, config) {
        Some(lp) => {
            let pre_loop = u64::from(lp.start_block);
            let post_loop = u64::from(info.block_count - 1 - lp.end_block);
            let loop_blocks = u64::from(lp.block_count());
            (pre_loop + post_loop + u64::from(config.loop_count) * loop_blocks) * wave_block_size
        }
        None => u64::from(info.block_count) * wave_block_size,
    }
}

impl Read for HcaDecoder<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        HcaDecoder::read(self, buf).map_err(io::Error::from)
    }
}

impl Seek for HcaDecoder<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(offset) => self.length.checked_add_signed(offset),
            SeekFrom::Current(offset) => self.position.checked_add_signed(offset),
        };
        let target = target.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "seek 位置不能为负")
        })?;
        self.position = target;
        Ok(target)
    }
}
