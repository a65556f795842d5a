//! 比特流写入器.
//!
//! 与 [`BitReader`](crate::bitreader::BitReader) 对应的大端位序写入器,
//! 用于构造 HCA 头部与数据块 (测试数据, 基准数据, 重新封装).

use crate::crc::seal_crc16;

/// 比特流写入器
///
/// # 示例
/// ```
/// use hca_core::bitwriter::BitWriter;
///
/// let mut bw = BitWriter::new();
/// bw.write_bits(0xFFFF, 16);
/// bw.write_bits(0b101, 3);
/// let block = bw.finish_block(8);
/// assert_eq!(block.len(), 8);
/// assert_eq!(&block[..3], &[0xFF, 0xFF, 0b1010_0000]);
/// assert!(hca_core::crc::verify_crc16(&block));
/// ```
#[derive(Debug, Default, Clone)]
pub struct BitWriter {
    /// 已完成的字节
    data: Vec<u8>,
    /// 正在填充的字节
    current: u8,
    /// 当前字节已填充的位数 (0-7)
    filled: u8,
}

impl BitWriter {
    /// 创建新的比特流写入器
    pub fn new() -> Self {
        Self::default()
    }

    /// 已写入的总位数
    pub fn bits_written(&self) -> usize {
        self.data.len() * 8 + self.filled as usize
    }

    /// 写入值的低 N 位 (最多 32 位), 高位在前
    pub fn write_bits(&mut self, value: u32, n: u32) {
        debug_assert!(n <= 32, "write_bits: n={n} 超过 32 位");
        for shift in (0..n.min(32)).rev() {
            let bit = ((value >> shift) & 1) as u8;
            self.current = (self.current << 1) | bit;
            self.filled += 1;
            if self.filled == 8 {
                self.data.push(self.current);
                self.current = 0;
                self.filled = 0;
            }
        }
    }

    /// 写入整字节序列
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.write_bits(u32::from(b), 8);
        }
    }

    /// 补零到字节边界并返回数据
    pub fn finish(mut self) -> Vec<u8> {
        if self.filled > 0 {
            self.current <<= 8 - self.filled;
            self.data.push(self.current);
        }
        self.data
    }

    /// 补零到 `size` 字节, 并把末尾两字节写为 CRC-16
    ///
    /// 已写入的数据超过 `size - 2` 字节时, 超出部分会被截断.
    pub fn finish_block(self, size: usize) -> Vec<u8> {
        let mut data = self.finish();
        data.resize(size, 0);
        seal_crc16(&mut data);
        data
    }
}
