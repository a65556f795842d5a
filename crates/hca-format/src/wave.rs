//! 合成 WAV 头.
//!
//! 解码输出可以带一个 RIFF/WAVE 头前缀, 使字节流本身就是完整的 WAV 文件:
//! ```text
//! RIFF header:  "RIFF" + riff_size + "WAVE"
//! fmt  chunk:   "fmt " + 16 + format + channels + rate + byte_rate + align + bits
//! smpl chunk:   (有循环且未启用软循环) 68 字节, 单个循环区间
//! note chunk:   (有注释) "note" + size + 0 + 注释 + NUL, 4 字节对齐
//! data chunk:   "data" + data_size
//! ```
//! 所有字段均为小端序.

use byteorder::{LittleEndian, WriteBytesExt};
use log::{debug, warn};

use hca_codec::SAMPLES_PER_BLOCK;
use hca_codec::info::{HcaInfo, LOOP_INFINITE};
use hca_core::{HcaResult, SampleFormat};

/// WAV 音频格式码: PCM 整数
const WAV_FORMAT_PCM: u16 = 0x0001;
/// WAV 音频格式码: IEEE 浮点
const WAV_FORMAT_IEEE_FLOAT: u16 = 0x0003;

/// RIFF + fmt 部分大小
const RIFF_SECTION_SIZE: usize = 36;
/// smpl 块大小 (含块头)
const SMPL_SECTION_SIZE: usize = 68;
/// data 块头大小
const DATA_SECTION_SIZE: usize = 8;
/// smpl 块中的 MIDI 基准音符 (C4)
const MIDI_UNITY_NOTE: u32 = 0x3C;

/// 是否写入 smpl 块
fn has_smpl(info: &HcaInfo, soft_loop: bool) -> bool {
    info.loop_info.is_some() && !soft_loop
}

/// note 块的数据长度 (注释 + NUL + 4 字节名称字段, 按 4 字节对齐)
fn note_size(info: &HcaInfo) -> Option<usize> {
    let comment = info.comment.as_ref().filter(|c| !c.is_empty())?;
    Some((4 + comment.len() + 1).next_multiple_of(4))
}

/// WAV 头总大小
pub fn wave_header_size(info: &HcaInfo, soft_loop: bool) -> usize {
    let mut size = RIFF_SECTION_SIZE;
    if has_smpl(info, soft_loop) {
        size += SMPL_SECTION_SIZE;
    }
    if let Some(note) = note_size(info) {
        size += 8 + note;
    }
    size + DATA_SECTION_SIZE
}

/// 生成 WAV 头
///
/// `data_size` 为 data 块声明的 PCM 字节数, 超出 32 位时饱和.
pub fn build_wave_header(
    info: &HcaInfo,
    format: SampleFormat,
    soft_loop: bool,
    data_size: u64,
) -> HcaResult<Vec<u8>> {
    let header_size = wave_header_size(info, soft_loop);
    let mut out = Vec::with_capacity(header_size);

    let (audio_format, bits_per_sample) = if format.is_float() {
        (WAV_FORMAT_IEEE_FLOAT, 32)
    } else {
        (WAV_FORMAT_PCM, format.bits_per_sample() as u16)
    };
    let channels = info.channel_count as u16;
    let block_align = channels * (bits_per_sample / 8);
    let byte_rate = info.sample_rate * u32::from(block_align);

    let data_size = u32::try_from(data_size).unwrap_or_else(|_| {
        warn!("PCM 数据长度 {data_size} 超出 WAV 可表示范围, 已截断");
        u32::MAX
    });
    let riff_size = (header_size as u32 - 8).saturating_add(data_size);

    // RIFF header
    out.extend_from_slice(b"RIFF");
    out.write_u32::<LittleEndian>(riff_size)?;
    out.extend_from_slice(b"WAVE");

    // fmt chunk
    out.extend_from_slice(b"fmt ");
    out.write_u32::<LittleEndian>(16)?;
    out.write_u16::<LittleEndian>(audio_format)?;
    out.write_u16::<LittleEndian>(channels)?;
    out.write_u32::<LittleEndian>(info.sample_rate)?;
    out.write_u32::<LittleEndian>(byte_rate)?;
    out.write_u16::<LittleEndian>(block_align)?;
    out.write_u16::<LittleEndian>(bits_per_sample)?;

    if let (Some(lp), true) = (&info.loop_info, has_smpl(info, soft_loop)) {
        let block_samples = SAMPLES_PER_BLOCK as u32;
        let sample_period = (1.0 / f64::from(info.sample_rate) * 1_000_000_000.0) as u32;
        let play_count = if lp.repeat_count == LOOP_INFINITE {
            0
        } else {
            u32::from(lp.repeat_count)
        };

        out.extend_from_slice(b"smpl");
        out.write_u32::<LittleEndian>((SMPL_SECTION_SIZE - 8) as u32)?;
        // manufacturer, product
        out.write_u32::<LittleEndian>(0)?;
        out.write_u32::<LittleEndian>(0)?;
        out.write_u32::<LittleEndian>(sample_period)?;
        out.write_u32::<LittleEndian>(MIDI_UNITY_NOTE)?;
        // pitch fraction, SMPTE format, SMPTE offset
        out.write_u32::<LittleEndian>(0)?;
        out.write_u32::<LittleEndian>(0)?;
        out.write_u32::<LittleEndian>(0)?;
        // 循环数, 附加数据大小
        out.write_u32::<LittleEndian>(1)?;
        out.write_u32::<LittleEndian>(0x18)?;
        // 循环标识, 循环类型 (正向)
        out.write_u32::<LittleEndian>(0)?;
        out.write_u32::<LittleEndian>(0)?;
        out.write_u32::<LittleEndian>(
            lp.start_block * block_samples + u32::from(info.encoder_padding),
        )?;
        out.write_u32::<LittleEndian>(lp.end_block * block_samples)?;
        out.write_u32::<LittleEndian>(0)?;
        out.write_u32::<LittleEndian>(play_count)?;
    }

    if let (Some(comment), Some(note)) = (&info.comment, note_size(info)) {
        out.extend_from_slice(b"note");
        out.write_u32::<LittleEndian>(note as u32)?;
        out.write_u32::<LittleEndian>(0)?;
        out.extend_from_slice(comment);
        // NUL 终止符与对齐填充
        out.resize(out.len() + note - 4 - comment.len(), 0);
    }

    out.extend_from_slice(b"data");
    out.write_u32::<LittleEndian>(data_size)?;

    debug!(
        "WAV 头: {} 字节, {} 声道, {} Hz, {} 位, data_size={}",
        out.len(),
        channels,
        info.sample_rate,
        bits_per_sample,
        data_size,
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hca_codec::LoopInfo;

    fn le32(data: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes(data[offset..offset + 4].try_into().unwrap())
    }

    fn le16(data: &[u8], offset: usize) -> u16 {
        u16::from_le_bytes(data[offset..offset + 2].try_into().unwrap())
    }

    fn stereo_info() -> HcaInfo {
        HcaInfo {
            channel_count: 2,
            sample_rate: 48000,
            block_count: 10,
            block_size: 0x100,
            ..HcaInfo::default()
        }
    }

    #[test]
    fn test_基础头部布局() {
        let info = stereo_info();
        let header = build_wave_header(&info, SampleFormat::S16, false, 40960).unwrap();
        assert_eq!(header.len(), 44);
        assert_eq!(wave_header_size(&info, false), 44);
        assert_eq!(&header[0..4], b"RIFF");
        assert_eq!(le32(&header, 4), 36 + 40960);
        assert_eq!(&header[8..16], b"WAVEfmt ");
        assert_eq!(le32(&header, 16), 16);
        assert_eq!(le16(&header, 20), 1);
        assert_eq!(le16(&header, 22), 2);
        assert_eq!(le32(&header, 24), 48000);
        assert_eq!(le32(&header, 28), 48000 * 4);
        assert_eq!(le16(&header, 32), 4);
        assert_eq!(le16(&header, 34), 16);
        assert_eq!(&header[36..40], b"data");
        assert_eq!(le32(&header, 40), 40960);
    }

    #[test]
    fn test_浮点格式() {
        let header = build_wave_header(&stereo_info(), SampleFormat::F32, false, 0).unwrap();
        assert_eq!(le16(&header, 20), 3);
        assert_eq!(le16(&header, 32), 8);
        assert_eq!(le16(&header, 34), 32);
    }

    #[test]
    fn test_循环写入_smpl_块() {
        let info = HcaInfo {
            encoder_padding: 0x80,
            loop_info: Some(LoopInfo {
                start_block: 2,
                end_block: 7,
                repeat_count: LOOP_INFINITE,
                trailing: 0,
            }),
            ..stereo_info()
        };
        let header = build_wave_header(&info, SampleFormat::S16, false, 1000).unwrap();
        assert_eq!(header.len(), 44 + 68);
        assert_eq!(le32(&header, 4), 36 + 68 + 1000);
        let smpl = &header[36..36 + 68];
        assert_eq!(&smpl[0..4], b"smpl");
        assert_eq!(le32(smpl, 4), 60);
        assert_eq!(le32(smpl, 16), 20833);
        assert_eq!(le32(smpl, 20), 0x3C);
        assert_eq!(le32(smpl, 36), 1);
        assert_eq!(le32(smpl, 40), 0x18);
        assert_eq!(le32(smpl, 52), 2 * 1024 + 0x80);
        assert_eq!(le32(smpl, 56), 7 * 1024);
        // 无限循环标记写为 0
        assert_eq!(le32(smpl, 64), 0);
        assert_eq!(&header[104..108], b"data");

        // 软循环时不写 smpl
        let soft = build_wave_header(&info, SampleFormat::S16, true, 1000).unwrap();
        assert_eq!(soft.len(), 44);
    }

    #[test]
    fn test_有限循环次数() {
        let info = HcaInfo {
            loop_info: Some(LoopInfo {
                start_block: 0,
                end_block: 9,
                repeat_count: 3,
                trailing: 0,
            }),
            ..stereo_info()
        };
        let header = build_wave_header(&info, SampleFormat::S16, false, 0).unwrap();
        assert_eq!(le32(&header, 36 + 64), 3);
    }

    #[test]
    fn test_注释写入_note_块() {
        let info = HcaInfo {
            comment: Some(b"abc".to_vec()),
            ..stereo_info()
        };
        // 4 + 3 + 1 = 8, 已对齐
        let header = build_wave_header(&info, SampleFormat::S16, false, 0).unwrap();
        assert_eq!(header.len(), 44 + 16);
        assert_eq!(&header[36..40], b"note");
        assert_eq!(le32(&header, 40), 8);
        assert_eq!(le32(&header, 44), 0);
        assert_eq!(&header[48..52], b"abc\0");
        assert_eq!(&header[52..56], b"data");

        let info = HcaInfo {
            comment: Some(b"hello".to_vec()),
            ..stereo_info()
        };
        // 4 + 5 + 1 = 10, 对齐到 12
        let header = build_wave_header(&info, SampleFormat::S16, false, 0).unwrap();
        assert_eq!(header.len(), 44 + 20);
        assert_eq!(le32(&header, 40), 12);
        assert_eq!(&header[48..56], b"hello\0\0\0");
        assert_eq!(le32(&header, 4), 36 + 20);
    }

    #[test]
    fn test_数据长度饱和() {
        let header = build_wave_header(&stereo_info(), SampleFormat::S16, false, 1 << 40).unwrap();
        assert_eq!(le32(&header, 40), u32::MAX);
        assert_eq!(le32(&header, 4), u32::MAX);
    }
}
