//! HCA 头部解析与生成.
//!
//! 头部由若干按固定顺序排列的块组成:
//! ```text
//! HCA\0  版本 + 头部大小
//! fmt\0  声道数, 采样率, 块数, 编码器延迟与填充
//! comp   (v2.0+) 或 dec\0 (v1.x) 压缩参数
//! vbr\0  ath\0  loop  ciph  rva\0  comm  pad\0   (均可选)
//! ```
//! 加密流的块标签最高位被置 1, 比较时统一用 0x7F7F7F7F 屏蔽.
//! 整个头部 (含末尾 2 字节校验和) 的 CRC-16 必须为 0.

use std::io::{Cursor, Read};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use log::debug;

use hca_codec::info::{HcaInfo, LoopInfo, VERSION_V200};
use hca_core::crc::{seal_crc16, verify_crc16};
use hca_core::{HcaError, HcaResult};

use crate::io::IoContext;

/// 块标签屏蔽位
pub const CHUNK_MASK: u32 = 0x7F7F_7F7F;

pub const TAG_HCA: u32 = u32::from_be_bytes(*b"HCA\0");
pub const TAG_FMT: u32 = u32::from_be_bytes(*b"fmt\0");
pub const TAG_COMP: u32 = u32::from_be_bytes(*b"comp");
pub const TAG_DEC: u32 = u32::from_be_bytes(*b"dec\0");
pub const TAG_VBR: u32 = u32::from_be_bytes(*b"vbr\0");
pub const TAG_ATH: u32 = u32::from_be_bytes(*b"ath\0");
pub const TAG_LOOP: u32 = u32::from_be_bytes(*b"loop");
pub const TAG_CIPH: u32 = u32::from_be_bytes(*b"ciph");
pub const TAG_RVA: u32 = u32::from_be_bytes(*b"rva\0");
pub const TAG_COMM: u32 = u32::from_be_bytes(*b"comm");
pub const TAG_PAD: u32 = u32::from_be_bytes(*b"pad\0");

/// `HCA\0` 块长度 (标签 + 版本 + 头部大小)
const BASE_CHUNK_SIZE: usize = 8;

/// 从字节源当前位置读取并解析头部
///
/// 返回后字节源位于第一个数据块处.
pub fn read_header(io: &mut IoContext) -> HcaResult<HcaInfo> {
    let mut data = vec![0u8; BASE_CHUNK_SIZE];
    io.read_exact(&mut data).map_err(truncated)?;
    let header_size = u16::from_be_bytes([data[6], data[7]]) as usize;
    if header_size < BASE_CHUNK_SIZE {
        return Err(HcaError::Header(format!("头部大小无效: {header_size}")));
    }
    data.resize(header_size, 0);
    io.read_exact(&mut data[BASE_CHUNK_SIZE..]).map_err(truncated)?;
    parse_header(&data)
}

fn truncated(err: HcaError) -> HcaError {
    match err {
        HcaError::Eof => HcaError::Header("头部数据不足".into()),
        other => other,
    }
}

/// 解析内存中的头部
///
/// `data` 可以比头部长, 多出的部分被忽略.
pub fn parse_header(data: &[u8]) -> HcaResult<HcaInfo> {
    if data.len() < BASE_CHUNK_SIZE {
        return Err(HcaError::Header("头部数据不足".into()));
    }
    let mut cur = Cursor::new(data);
    if read_tag(&mut cur)? != TAG_HCA {
        return Err(HcaError::Header("不是 HCA 流".into()));
    }
    let version = cur.read_u16::<BigEndian>()?;
    let header_size = cur.read_u16::<BigEndian>()?;
    let size = header_size as usize;
    if size < BASE_CHUNK_SIZE || size > data.len() {
        return Err(HcaError::Header(format!(
            "头部大小无效: {header_size} (可用 {} 字节)",
            data.len()
        )));
    }
    if !verify_crc16(&data[..size]) {
        return Err(HcaError::Header("头部校验和错误".into()));
    }

    // 校验和 2 字节不参与块解析
    let mut cur = Cursor::new(&data[..size - 2]);
    cur.set_position(BASE_CHUNK_SIZE as u64);

    let mut info = HcaInfo {
        version,
        data_offset: header_size,
        ..HcaInfo::default()
    };

    if peek_tag(&cur) != Some(TAG_FMT) {
        return Err(HcaError::Header("缺少 fmt 块".into()));
    }
    ensure(&cur, 16, "fmt")?;
    cur.set_position(cur.position() + 4);
    info.channel_count = u32::from(cur.read_u8()?);
    info.sample_rate = cur.read_u24::<BigEndian>()?;
    info.block_count = cur.read_u32::<BigEndian>()?;
    info.encoder_delay = cur.read_u16::<BigEndian>()?;
    info.encoder_padding = cur.read_u16::<BigEndian>()?;

    match peek_tag(&cur) {
        Some(TAG_COMP) => {
            ensure(&cur, 16, "comp")?;
            cur.set_position(cur.position() + 4);
            info.block_size = u32::from(cur.read_u16::<BigEndian>()?);
            info.min_resolution = u32::from(cur.read_u8()?);
            info.max_resolution = u32::from(cur.read_u8()?);
            info.track_count = u32::from(cur.read_u8()?);
            info.channel_config = u32::from(cur.read_u8()?);
            info.total_band_count = u32::from(cur.read_u8()?);
            info.base_band_count = u32::from(cur.read_u8()?);
            info.stereo_band_count = u32::from(cur.read_u8()?);
            info.bands_per_hfr_group = u32::from(cur.read_u8()?);
            info.ms_stereo = u32::from(cur.read_u8()?);
            cur.read_u8()?;
        }
        Some(TAG_DEC) => {
            ensure(&cur, 12, "dec")?;
            cur.set_position(cur.position() + 4);
            info.block_size = u32::from(cur.read_u16::<BigEndian>()?);
            info.min_resolution = u32::from(cur.read_u8()?);
            info.max_resolution = u32::from(cur.read_u8()?);
            info.total_band_count = u32::from(cur.read_u8()?) + 1;
            info.base_band_count = u32::from(cur.read_u8()?) + 1;
            let layout = cur.read_u8()?;
            info.track_count = u32::from(layout >> 4);
            info.channel_config = u32::from(layout & 0x0F);
            let stereo_type = cur.read_u8()?;
            if stereo_type == 0 {
                info.base_band_count = info.total_band_count;
            }
            info.stereo_band_count = info.total_band_count.saturating_sub(info.base_band_count);
            info.bands_per_hfr_group = 0;
        }
        _ => return Err(HcaError::Header("缺少 comp/dec 块".into())),
    }

    if peek_tag(&cur) == Some(TAG_VBR) {
        ensure(&cur, 8, "vbr")?;
        cur.set_position(cur.position() + 4);
        info.vbr_max_block_size = cur.read_u16::<BigEndian>()?;
        info.vbr_noise_level = cur.read_u16::<BigEndian>()?;
    }

    info.ath_type = default_ath_type(version);
    if peek_tag(&cur) == Some(TAG_ATH) {
        ensure(&cur, 6, "ath")?;
        cur.set_position(cur.position() + 4);
        info.ath_type = u32::from(cur.read_u16::<BigEndian>()?);
    }

    if peek_tag(&cur) == Some(TAG_LOOP) {
        ensure(&cur, 16, "loop")?;
        cur.set_position(cur.position() + 4);
        info.loop_info = Some(LoopInfo {
            start_block: cur.read_u32::<BigEndian>()?,
            end_block: cur.read_u32::<BigEndian>()?,
            repeat_count: cur.read_u16::<BigEndian>()?,
            trailing: cur.read_u16::<BigEndian>()?,
        });
    }

    if peek_tag(&cur) == Some(TAG_CIPH) {
        ensure(&cur, 6, "ciph")?;
        cur.set_position(cur.position() + 4);
        info.cipher_type = u32::from(cur.read_u16::<BigEndian>()?);
    }

    if peek_tag(&cur) == Some(TAG_RVA) {
        ensure(&cur, 8, "rva")?;
        cur.set_position(cur.position() + 4);
        info.rva_volume = cur.read_f32::<BigEndian>()?;
    }

    if peek_tag(&cur) == Some(TAG_COMM) {
        ensure(&cur, 5, "comm")?;
        cur.set_position(cur.position() + 4);
        let len = cur.read_u8()? as usize;
        ensure(&cur, len, "comm")?;
        let mut comment = vec![0u8; len];
        cur.read_exact(&mut comment)?;
        info.comment = Some(comment);
    }

    // pad 块及其后的数据不含参数

    if info.track_count == 0 {
        info.track_count = 1;
    }
    info.validate()?;

    debug!(
        "HCA 头部: 版本 {:#06x}, {} 声道, {} Hz, {} 块 x {} 字节, 循环 {:?}, 密码类型 {}",
        info.version,
        info.channel_count,
        info.sample_rate,
        info.block_count,
        info.block_size,
        info.loop_info,
        info.cipher_type,
    );
    Ok(info)
}

/// 缺少 ath 块时的默认曲线类型
pub fn default_ath_type(version: u16) -> u32 {
    if version < VERSION_V200 { 1 } else { 0 }
}

/// 按参数生成头部 (v2.0+ 的 comp 布局), 末尾附带校验和
///
/// `data_offset` 字段被忽略, 实际头部大小由内容决定.
pub fn build_header(info: &HcaInfo) -> HcaResult<Vec<u8>> {
    info.validate()?;

    let mut out = Vec::with_capacity(96);
    out.write_u32::<BigEndian>(TAG_HCA)?;
    out.write_u16::<BigEndian>(info.version)?;
    out.write_u16::<BigEndian>(0)?;

    out.write_u32::<BigEndian>(TAG_FMT)?;
    out.write_u8(info.channel_count as u8)?;
    out.write_u24::<BigEndian>(info.sample_rate)?;
    out.write_u32::<BigEndian>(info.block_count)?;
    out.write_u16::<BigEndian>(info.encoder_delay)?;
    out.write_u16::<BigEndian>(info.encoder_padding)?;

    out.write_u32::<BigEndian>(TAG_COMP)?;
    out.write_u16::<BigEndian>(info.block_size as u16)?;
    for value in [
        info.min_resolution,
        info.max_resolution,
        info.track_count,
        info.channel_config,
        info.total_band_count,
        info.base_band_count,
        info.stereo_band_count,
        info.bands_per_hfr_group,
        info.ms_stereo,
        0,
    ] {
        out.write_u8(value as u8)?;
    }

    if info.is_vbr() {
        out.write_u32::<BigEndian>(TAG_VBR)?;
        out.write_u16::<BigEndian>(info.vbr_max_block_size)?;
        out.write_u16::<BigEndian>(info.vbr_noise_level)?;
    }
    if info.ath_type != default_ath_type(info.version) {
        out.write_u32::<BigEndian>(TAG_ATH)?;
        out.write_u16::<BigEndian>(info.ath_type as u16)?;
    }
    if let Some(lp) = &info.loop_info {
        out.write_u32::<BigEndian>(TAG_LOOP)?;
        out.write_u32::<BigEndian>(lp.start_block)?;
        out.write_u32::<BigEndian>(lp.end_block)?;
        out.write_u16::<BigEndian>(lp.repeat_count)?;
        out.write_u16::<BigEndian>(lp.trailing)?;
    }
    if info.cipher_type != 0 {
        out.write_u32::<BigEndian>(TAG_CIPH)?;
        out.write_u16::<BigEndian>(info.cipher_type as u16)?;
    }
    if info.rva_volume != 1.0 {
        out.write_u32::<BigEndian>(TAG_RVA)?;
        out.write_f32::<BigEndian>(info.rva_volume)?;
    }
    if let Some(comment) = &info.comment {
        let len = u8::try_from(comment.len())
            .map_err(|_| HcaError::InvalidArgument(format!("注释过长: {}", comment.len())))?;
        out.write_u32::<BigEndian>(TAG_COMM)?;
        out.write_u8(len)?;
        out.extend_from_slice(comment);
    }

    out.extend_from_slice(&[0, 0]);
    let header_size = u16::try_from(out.len())
        .map_err(|_| HcaError::InvalidArgument(format!("头部过长: {}", out.len())))?;
    out[6..8].copy_from_slice(&header_size.to_be_bytes());
    seal_crc16(&mut out);
    Ok(out)
}

/// 把注释从 Shift-JIS 解码为文本, 去掉末尾的 NUL
pub fn comment_text(info: &HcaInfo) -> Option<String> {
    let bytes = info.comment.as_deref()?;
    let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |p| p + 1);
    let (text, _, had_errors) = encoding_rs::SHIFT_JIS.decode(&bytes[..end]);
    if had_errors {
        debug!("注释包含无法解码的 Shift-JIS 字节");
    }
    Some(text.into_owned())
}

fn read_tag(cur: &mut Cursor<&[u8]>) -> HcaResult<u32> {
    Ok(cur.read_u32::<BigEndian>()? & CHUNK_MASK)
}

fn remaining(cur: &Cursor<&[u8]>) -> usize {
    cur.get_ref().len().saturating_sub(cur.position() as usize)
}

fn peek_tag(cur: &Cursor<&[u8]>) -> Option<u32> {
    let pos = cur.position() as usize;
    let tag = cur.get_ref().get(pos..pos + 4)?;
    Some(u32::from_be_bytes([tag[0], tag[1], tag[2], tag[3]]) & CHUNK_MASK)
}

fn ensure(cur: &Cursor<&[u8]>, size: usize, chunk: &str) -> HcaResult<()> {
    if remaining(cur) < size {
        return Err(HcaError::Header(format!("{chunk} 块被截断")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hca_codec::info::{VERSION_V102, VERSION_V300};

    fn sample_info() -> HcaInfo {
        HcaInfo {
            version: VERSION_V300,
            channel_count: 2,
            sample_rate: 48000,
            block_count: 12,
            encoder_delay: 0x80,
            encoder_padding: 0x60,
            block_size: 0x155,
            min_resolution: 1,
            max_resolution: 15,
            track_count: 1,
            total_band_count: 128,
            base_band_count: 96,
            stereo_band_count: 20,
            bands_per_hfr_group: 4,
            ms_stereo: 1,
            loop_info: Some(LoopInfo {
                start_block: 2,
                end_block: 9,
                repeat_count: 0x80,
                trailing: 0x400,
            }),
            cipher_type: 56,
            rva_volume: 0.5,
            comment: Some("テスト".as_bytes().to_vec()),
            ..HcaInfo::default()
        }
    }

    #[test]
    fn test_生成后解析一致() {
        let info = sample_info();
        let header = build_header(&info).unwrap();
        let parsed = parse_header(&header).unwrap();
        assert_eq!(parsed.data_offset as usize, header.len());
        assert_eq!(
            parsed,
            HcaInfo {
                data_offset: header.len() as u16,
                ..info
            }
        );
    }

    #[test]
    fn test_从字节源读取后位于数据起点() {
        let header = build_header(&sample_info()).unwrap();
        let mut data = header.clone();
        data.extend_from_slice(&[0xFF, 0xFF, 0x12]);
        let mut io = IoContext::from_bytes(data);
        let info = read_header(&mut io).unwrap();
        assert_eq!(info.channel_count, 2);
        assert_eq!(io.position().unwrap(), header.len() as u64);
    }

    #[test]
    fn test_头部校验和错误() {
        let mut header = build_header(&sample_info()).unwrap();
        header[12] ^= 0x01;
        assert!(matches!(parse_header(&header), Err(HcaError::Header(_))));
    }

    #[test]
    fn test_屏蔽加密标签() {
        let mut header = build_header(&sample_info()).unwrap();
        // fmt 与 comp 标签最高位置 1
        for i in [8, 9, 10, 24, 25, 26, 27] {
            header[i] |= 0x80;
        }
        seal_crc16(&mut header);
        let parsed = parse_header(&header).unwrap();
        assert_eq!(parsed.sample_rate, 48000);
        assert_eq!(parsed.block_size, 0x155);
    }

    fn dec_header(stereo_type: u8) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"HCA\0");
        out.extend_from_slice(&VERSION_V102.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(b"fmt\0");
        out.extend_from_slice(&[2, 0x00, 0xAC, 0x44]);
        out.extend_from_slice(&3u32.to_be_bytes());
        out.extend_from_slice(&[0, 0, 0, 0]);
        out.extend_from_slice(b"dec\0");
        out.extend_from_slice(&0x200u16.to_be_bytes());
        // min, max, total-1, base-1, track:4|config:4, stereo_type
        out.extend_from_slice(&[1, 15, 127, 99, 0x10, stereo_type]);
        out.extend_from_slice(b"pad\0");
        out.extend_from_slice(&[0, 0]);
        let size = out.len() as u16;
        out[6..8].copy_from_slice(&size.to_be_bytes());
        seal_crc16(&mut out);
        out
    }

    #[test]
    fn test_解析_dec_块() {
        let info = parse_header(&dec_header(1)).unwrap();
        assert_eq!(info.sample_rate, 44100);
        assert_eq!(info.block_size, 0x200);
        assert_eq!(info.total_band_count, 128);
        assert_eq!(info.base_band_count, 100);
        assert_eq!(info.stereo_band_count, 28);
        assert_eq!(info.track_count, 1);
        assert_eq!(info.bands_per_hfr_group, 0);
        // v1.x 缺少 ath 块时默认类型 1
        assert_eq!(info.ath_type, 1);
    }

    #[test]
    fn test_dec_立体声类型为零时无立体声频带() {
        let info = parse_header(&dec_header(0)).unwrap();
        assert_eq!(info.base_band_count, 128);
        assert_eq!(info.stereo_band_count, 0);
        assert_eq!(info.hfr_group_count(), 0);
    }

    #[test]
    fn test_轨道数为零视为一() {
        let mut header = build_header(&HcaInfo {
            block_size: 0x100,
            block_count: 1,
            ..HcaInfo::default()
        })
        .unwrap();
        // comp 块中的 track_count 字段
        header[32] = 0;
        seal_crc16(&mut header);
        assert_eq!(parse_header(&header).unwrap().track_count, 1);
    }

    #[test]
    fn test_缺少_comp_块() {
        let mut out = b"HCA\0\x02\x00\x00\x00".to_vec();
        out.extend_from_slice(b"fmt\0\x01\x00\xAC\x44\x00\x00\x00\x01\x00\x00\x00\x00");
        out.extend_from_slice(&[0, 0]);
        let size = out.len() as u16;
        out[6..8].copy_from_slice(&size.to_be_bytes());
        seal_crc16(&mut out);
        assert!(matches!(parse_header(&out), Err(HcaError::Header(_))));
    }

    #[test]
    fn test_非_hca_与截断() {
        assert!(matches!(parse_header(b"RIFF\0\0\0\0"), Err(HcaError::Header(_))));
        let header = build_header(&sample_info()).unwrap();
        let mut io = IoContext::from_bytes(header[..20].to_vec());
        assert!(matches!(read_header(&mut io), Err(HcaError::Header(_))));
    }

    #[test]
    fn test_注释解码() {
        let info = HcaInfo {
            comment: Some(vec![0x83, 0x65, 0x83, 0x58, 0x83, 0x67, 0x00]),
            ..HcaInfo::default()
        };
        assert_eq!(comment_text(&info).as_deref(), Some("テスト"));
        assert_eq!(comment_text(&HcaInfo::default()), None);
    }
}
