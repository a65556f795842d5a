//! HCA 流探测.
//!
//! 通过头部魔数与文件扩展名判断字节源是否为 HCA 流.
//! 加密流的块标签最高位被置 1, 比较前需要先屏蔽.

use std::io::SeekFrom;

use hca_core::HcaResult;

use crate::header::{CHUNK_MASK, TAG_HCA};
use crate::io::IoContext;

/// 探测置信度
///
/// 数值越高, 表示对格式判断越有信心.
pub type ProbeScore = u32;

/// 最低探测分数 (仅根据扩展名)
pub const SCORE_EXTENSION: ProbeScore = 50;

/// 最高探测分数 (魔数完全匹配)
pub const SCORE_MAX: ProbeScore = 100;

/// 根据开头数据与文件名探测
///
/// - `Some(score)`: 可能是 HCA 流
/// - `None`: 不是
pub fn probe(data: &[u8], filename: Option<&str>) -> Option<ProbeScore> {
    if let Some(tag) = data.get(..4) {
        let tag = u32::from_be_bytes([tag[0], tag[1], tag[2], tag[3]]) & CHUNK_MASK;
        if tag == TAG_HCA {
            return Some(SCORE_MAX);
        }
    }

    if let Some(name) = filename {
        if name.to_ascii_lowercase().ends_with(".hca") {
            return Some(SCORE_EXTENSION);
        }
    }

    None
}

/// 探测字节源, 不改变其读取位置
pub fn probe_io(io: &mut IoContext) -> HcaResult<Option<ProbeScore>> {
    let start = io.position()?;
    let mut magic = [0u8; 4];
    let read = io.read(&mut magic)?;
    io.seek(SeekFrom::Start(start))?;
    Ok(probe(&magic[..read], None))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_魔数匹配() {
        assert_eq!(probe(b"HCA\0\x02\x00", None), Some(SCORE_MAX));
        // 加密流标签最高位被置位
        assert_eq!(probe(&[0xC8, 0xC3, 0xC1, 0x00], None), Some(SCORE_MAX));
    }

    #[test]
    fn test_扩展名与不匹配() {
        assert_eq!(probe(b"RIFF", Some("bgm_01.HCA")), Some(SCORE_EXTENSION));
        assert_eq!(probe(b"RIFF", Some("bgm_01.wav")), None);
        assert_eq!(probe(b"HC", None), None);
    }

    #[test]
    fn test_探测不消耗数据() {
        let mut io = IoContext::from_bytes(b"xxHCA\0\x03\x00".to_vec());
        io.seek(SeekFrom::Start(2)).unwrap();
        assert_eq!(probe_io(&mut io).unwrap(), Some(SCORE_MAX));
        assert_eq!(io.position().unwrap(), 2);
    }
}
