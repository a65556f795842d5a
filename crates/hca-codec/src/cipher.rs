//! HCA 块加密.
//!
//! 三种密码类型都是逐字节代换:
//! - 类型 0: 恒等表 (未加密)
//! - 类型 1: 由 `v = v * 13 + 11` 生成的固定表
//! - 类型 56: 由 64 位密钥展开的表, 可附加子密钥 (key modifier)
//!
//! 表的 0x00 与 0xFF 两项始终映射为自身. 密钥错误无法在此处发现,
//! 只会表现为块校验或解包失败.

use hca_core::{HcaError, HcaResult};

/// 代换表
pub type CipherTable = [u8; 256];

/// 块解密器
#[derive(Debug, Clone)]
pub struct Cipher {
    /// 实际生效的密码类型
    cipher_type: u32,
    /// 解密表
    table: CipherTable,
    /// 加密表 (解密表的逆)
    inverse: CipherTable,
}

impl Cipher {
    /// 按头部密码类型与调用方持有的密钥构建
    ///
    /// `key` 为 `(key2 << 32) | key1`, `modifier` 为非零时先与密钥相乘.
    /// 类型 56 在最终密钥为 0 时退化为类型 0.
    pub fn new(cipher_type: u32, key: u64, modifier: u16) -> HcaResult<Self> {
        let key = apply_key_modifier(key, modifier);
        let (cipher_type, table) = match cipher_type {
            0 => (0, identity_table()),
            1 => (1, static_table()),
            56 if key == 0 => (0, identity_table()),
            56 => (56, keyed_table(key)),
            other => {
                return Err(HcaError::Header(format!("未知的密码类型: {other}")));
            }
        };

        let mut inverse = [0u8; 256];
        for (plain, &cipher) in table.iter().enumerate() {
            inverse[cipher as usize] = plain as u8;
        }

        Ok(Self {
            cipher_type,
            table,
            inverse,
        })
    }

    /// 不加密
    pub fn none() -> Self {
        let table = identity_table();
        Self {
            cipher_type: 0,
            table,
            inverse: table,
        }
    }

    /// 实际生效的密码类型
    pub fn cipher_type(&self) -> u32 {
        self.cipher_type
    }

    /// 解密表
    pub fn table(&self) -> &CipherTable {
        &self.table
    }

    /// 原地解密
    pub fn decrypt(&self, data: &mut [u8]) {
        if self.cipher_type == 0 {
            return;
        }
        for byte in data {
            *byte = self.table[*byte as usize];
        }
    }

    /// 原地加密, `decrypt(encrypt(x)) == x`
    pub fn encrypt(&self, data: &mut [u8]) {
        if self.cipher_type == 0 {
            return;
        }
        for byte in data {
            *byte = self.inverse[*byte as usize];
        }
    }
}

/// 应用子密钥: `key * ((modifier << 16) | ((u16)!modifier + 2))`
pub fn apply_key_modifier(key: u64, modifier: u16) -> u64 {
    if modifier == 0 {
        return key;
    }
    let factor = (u64::from(modifier) << 16) | (u64::from(!modifier) + 2);
    key.wrapping_mul(factor)
}

fn identity_table() -> CipherTable {
    let mut table = [0u8; 256];
    for (i, slot) in table.iter_mut().enumerate() {
        *slot = i as u8;
    }
    table
}

fn static_table() -> CipherTable {
    let next = |v: u32| (v * 13 + 11) & 0xFF;
    let mut table = [0u8; 256];
    let mut v = 0u32;
    for slot in &mut table[1..0xFF] {
        v = next(v);
        if v == 0 || v == 0xFF {
            v = next(v);
        }
        *slot = v as u8;
    }
    table[0xFF] = 0xFF;
    table
}

/// 4 位线性同余序列, 16 项各不相同
fn nibble_sequence(seed: u8) -> [u8; 16] {
    let mul = ((seed & 1) << 3) | 5;
    let add = (seed & 0xE) | 1;
    let mut key = seed >> 4;
    let mut out = [0u8; 16];
    for slot in &mut out {
        key = (key.wrapping_mul(mul).wrapping_add(add)) & 0xF;
        *slot = key;
    }
    out
}

fn keyed_table(key: u64) -> CipherTable {
    let key = key.wrapping_sub(1);
    let kc = key.to_le_bytes();

    let seed = [
        kc[1],
        kc[1] ^ kc[6],
        kc[2] ^ kc[3],
        kc[2],
        kc[2] ^ kc[1],
        kc[3] ^ kc[4],
        kc[3],
        kc[3] ^ kc[2],
        kc[4] ^ kc[5],
        kc[4],
        kc[4] ^ kc[3],
        kc[5] ^ kc[6],
        kc[5],
        kc[5] ^ kc[4],
        kc[6] ^ kc[1],
        kc[6],
    ];

    let rows = nibble_sequence(kc[0]);
    let mut base = [0u8; 256];
    for (r, &row) in rows.iter().enumerate() {
        let cols = nibble_sequence(seed[r]);
        for (c, &col) in cols.iter().enumerate() {
            base[r * 16 + c] = (row << 4) | col;
        }
    }

    // 步长 17 遍历全部 256 项, 跳过 0x00 与 0xFF
    let mut table = [0u8; 256];
    let mut x = 0usize;
    let mut pos = 1usize;
    for _ in 0..256 {
        x = (x + 17) & 0xFF;
        let v = base[x];
        if v != 0 && v != 0xFF {
            table[pos] = v;
            pos += 1;
        }
    }
    table[0xFF] = 0xFF;
    table
}
