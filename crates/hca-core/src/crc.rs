//! CRC 校验和计算.
//!
//! HCA 头部与每个数据块的末尾两字节都是 CRC-16 (多项式 0x8005, 初始值 0).
//! 对包含校验字段在内的整段数据计算, 结果为 0 即校验通过.

/// CRC-16 查找表 (多项式 0x8005)
const CRC16_TABLE: [u16; 256] = {
    let mut table = [0u16; 256];
    let mut i = 0u16;
    while i < 256 {
        let mut crc = i << 8;
        let mut j = 0;
        while j < 8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ 0x8005;
            } else {
                crc <<= 1;
            }
            j += 1;
        }
        table[i as usize] = crc;
        i += 1;
    }
    table
};

/// 计算 CRC-16
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for &byte in data {
        crc = (crc << 8) ^ CRC16_TABLE[((crc >> 8) as u8 ^ byte) as usize];
    }
    crc
}

/// 校验以 CRC-16 结尾的数据段
pub fn verify_crc16(data: &[u8]) -> bool {
    crc16(data) == 0
}

/// 计算 `data[..len-2]` 的 CRC 并以大端写入末尾两字节
///
/// 用于构造测试数据与重新封装块.
pub fn seal_crc16(data: &mut [u8]) {
    if data.len() < 2 {
        return;
    }
    let body = data.len() - 2;
    let crc = crc16(&data[..body]);
    data[body..].copy_from_slice(&crc.to_be_bytes());
}
