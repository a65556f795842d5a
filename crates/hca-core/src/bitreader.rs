//! 比特流读取器.
//!
//! 按大端位序 (MSB first) 从字节缓冲区中读取 HCA 块内的各个字段.
//!
//! 与通用读取器不同, 越界读取不报错: 返回 0 且游标照常前进. 块内数据损坏时
//! 由上层的同步字与比例因子检查发现问题, 而不是由读取器中途失败.

/// 比特流读取器
///
/// # 示例
/// ```
/// use hca_core::bitreader::BitReader;
///
/// let data = [0b10110001, 0b01010101];
/// let mut br = BitReader::new(&data);
/// assert_eq!(br.read_bits(4), 0b1011);
/// assert_eq!(br.peek_bits(4), 0b0001);
/// assert_eq!(br.read_bits(12), 0b0001_0101_0101);
/// assert_eq!(br.read_bits(8), 0);
/// ```
pub struct BitReader<'a> {
    /// 源数据
    data: &'a [u8],
    /// 总位数
    size: usize,
    /// 当前位游标
    bit: usize,
}

impl<'a> BitReader<'a> {
    /// 创建新的比特流读取器
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            size: data.len() * 8,
            bit: 0,
        }
    }

    /// 当前位游标
    pub fn position(&self) -> usize {
        self.bit
    }

    /// 缓冲区总位数
    pub fn len_bits(&self) -> usize {
        self.size
    }

    /// 游标是否已越过缓冲区末尾
    pub fn is_overrun(&self) -> bool {
        self.bit > self.size
    }

    /// 查看接下来的 N 位 (最多 32 位), 不移动游标
    ///
    /// 剩余位数不足时返回 0.
    pub fn peek_bits(&self, n: u32) -> u32 {
        if n == 0 {
            return 0;
        }
        let n = n.min(32);
        match self.bit.checked_add(n as usize) {
            Some(end) if end <= self.size => {}
            _ => return 0,
        }

        // 32 位字段在任意位偏移下最多跨 5 个字节
        let start = self.bit >> 3;
        let mut window = 0u64;
        for i in 0..5 {
            let byte = self.data.get(start + i).copied().unwrap_or(0);
            window = (window << 8) | u64::from(byte);
        }
        let rem = (self.bit & 7) as u32;
        ((window << (24 + rem)) >> (64 - n)) as u32
    }

    /// 读取 N 位 (最多 32 位) 并前进 N 位
    pub fn read_bits(&mut self, n: u32) -> u32 {
        let value = self.peek_bits(n);
        self.bit = self.bit.wrapping_add(n as usize);
        value
    }

    /// 读取 1 位, 返回布尔值
    pub fn read_flag(&mut self) -> bool {
        self.read_bits(1) != 0
    }

    /// 按有符号位数移动游标, 负数表示回退
    pub fn skip_bits(&mut self, n: i32) {
        self.bit = self.bit.wrapping_add_signed(n as isize);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_bits_basic() {
        let data = [0xA5, 0x3C];
        let mut br = BitReader::new(&data);
        assert_eq!(br.read_bits(1), 1);
        assert_eq!(br.read_bits(3), 0b010);
        assert_eq!(br.read_bits(8), 0x53);
        assert_eq!(br.read_bits(4), 0xC);
        assert_eq!(br.position(), 16);
    }

    #[test]
    fn test_read_bits_32_非对齐() {
        let data = [0x0F, 0xFF, 0xFF, 0xFF, 0xF0];
        let mut br = BitReader::new(&data);
        br.skip_bits(4);
        assert_eq!(br.read_bits(32), 0xFFFF_FFFF);
        assert_eq!(br.read_bits(4), 0);
    }

    #[test]
    fn test_peek_不移动游标() {
        let data = [0xFF, 0x00];
        let br = BitReader::new(&data);
        assert_eq!(br.peek_bits(4), 0xF);
        assert_eq!(br.peek_bits(4), 0xF);
        assert_eq!(br.position(), 0);
    }

    #[test]
    fn test_越界读取返回零并前进() {
        let data = [0xFF];
        let mut br = BitReader::new(&data);
        assert_eq!(br.read_bits(6), 0x3F);
        // 只剩 2 位, 读取 4 位越界
        assert_eq!(br.read_bits(4), 0);
        assert_eq!(br.position(), 10);
        assert!(br.is_overrun());
        assert_eq!(br.read_bits(1), 0);
    }

    #[test]
    fn test_负数跳过回退() {
        let data = [0b0110_0000];
        let mut br = BitReader::new(&data);
        assert_eq!(br.read_bits(3), 0b011);
        br.skip_bits(-1);
        assert_eq!(br.read_bits(2), 0b10);
        assert_eq!(br.position(), 4);
    }

    #[test]
    fn test_读取零位() {
        let data = [0xFF];
        let mut br = BitReader::new(&data);
        assert_eq!(br.read_bits(0), 0);
        assert_eq!(br.position(), 0);
    }
}
