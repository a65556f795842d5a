//! ATH (绝对听觉阈值) 曲线.
//!
//! 按采样率对基准曲线重采样, 得到每个频谱系数的阈值偏置, 用于选择量化分辨率.
//! v1.2 之后的编码器基本只使用类型 0 (全零曲线).

use hca_core::{HcaError, HcaResult};

use crate::info::SAMPLES_PER_SUBFRAME;
use crate::tables::ATH_BASE_CURVE;

/// 基准曲线中可用的最大索引 (不含)
const ATH_INDEX_LIMIT: u32 = 654;

/// 每个频谱系数的阈值表
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AthCurve {
    table: [u8; SAMPLES_PER_SUBFRAME],
}

impl AthCurve {
    /// 按类型与采样率构建曲线
    pub fn new(ath_type: u32, sample_rate: u32) -> HcaResult<Self> {
        let mut table = [0u8; SAMPLES_PER_SUBFRAME];
        match ath_type {
            0 => {}
            1 => {
                let mut acc = 0u32;
                for i in 0..SAMPLES_PER_SUBFRAME {
                    acc = acc.wrapping_add(sample_rate);
                    let index = acc >> 13;
                    if index >= ATH_INDEX_LIMIT {
                        table[i..].fill(0xFF);
                        break;
                    }
                    table[i] = ATH_BASE_CURVE[index as usize];
                }
            }
            other => {
                return Err(HcaError::Header(format!("未知的 ATH 类型: {other}")));
            }
        }
        Ok(Self { table })
    }

    /// 阈值表
    pub fn table(&self) -> &[u8; SAMPLES_PER_SUBFRAME] {
        &self.table
    }
}
