//! 128 点 IMDCT.
//!
//! 先做 7 级蝶形, 再做 7 级查表旋转, 最后与上一子帧的后半部分加窗重叠.
//! 两个缓冲区交替作为输入输出, 结果最终回到 `spectra`.

use crate::info::SAMPLES_PER_SUBFRAME;
use crate::tables::{COS_TABLES, IMDCT_WINDOW, SIN_TABLES};

const N: usize = SAMPLES_PER_SUBFRAME;
const HALF: usize = N / 2;
const MDCT_BITS: usize = 7;

/// 一级蝶形: `count1` 组, 每组 `count2` 对
fn butterfly(src: &[f32; N], dst: &mut [f32; N], count1: usize, count2: usize) {
    let mut s = 0;
    let mut d1 = 0;
    let mut d2 = count2;
    for _ in 0..count1 {
        for _ in 0..count2 {
            let a = src[s];
            let b = src[s + 1];
            s += 2;
            dst[d1] = a + b;
            dst[d2] = a - b;
            d1 += 1;
            d2 += 1;
        }
        d1 += count2;
        d2 += count2;
    }
}

/// 一级旋转
fn rotate(src: &[f32; N], dst: &mut [f32; N], stage: usize, count1: usize, count2: usize) {
    let sin_table = &SIN_TABLES[stage];
    let cos_table = &COS_TABLES[stage];
    let mut t = 0;
    let mut s1 = 0;
    let mut s2 = count2;
    let mut d1 = 0;
    let mut d2 = count2 * 2 - 1;
    for _ in 0..count1 {
        for _ in 0..count2 {
            let a = src[s1];
            let b = src[s2];
            let sin = sin_table[t];
            let cos = cos_table[t];
            s1 += 1;
            s2 += 1;
            t += 1;
            dst[d1] = a * sin - b * cos;
            dst[d2] = a * cos + b * sin;
            d1 += 1;
            d2 = d2.wrapping_sub(1);
        }
        s1 += count2;
        s2 += count2;
        d1 += count2;
        d2 = d2.wrapping_add(count2 * 3);
    }
}

/// 对一个子帧做 IMDCT, 输出 128 个采样到 `wave`, 并更新 `previous`
///
/// `spectra` 与 `temp` 的内容会被覆盖.
pub fn imdct_transform(
    spectra: &mut [f32; N],
    temp: &mut [f32; N],
    previous: &mut [f32; N],
    wave: &mut [f32; N],
) {
    let mut count1 = 1;
    let mut count2 = HALF;
    for stage in 0..MDCT_BITS {
        if stage % 2 == 0 {
            butterfly(spectra, temp, count1, count2);
        } else {
            butterfly(temp, spectra, count1, count2);
        }
        count1 <<= 1;
        count2 >>= 1;
    }

    // 蝶形级数为奇数, 此时数据位于 temp
    let mut count1 = HALF;
    let mut count2 = 1;
    for stage in 0..MDCT_BITS {
        if stage % 2 == 0 {
            rotate(temp, spectra, stage, count1, count2);
        } else {
            rotate(spectra, temp, stage, count1, count2);
        }
        count1 >>= 1;
        count2 <<= 1;
    }

    let dct = &*spectra;
    for i in 0..HALF {
        wave[i] = IMDCT_WINDOW[i] * dct[i + HALF] + previous[i];
        wave[i + HALF] = IMDCT_WINDOW[i + HALF] * dct[N - 1 - i] - previous[i + HALF];
        previous[i] = IMDCT_WINDOW[N - 1 - i] * dct[HALF - i - 1];
        previous[i + HALF] = IMDCT_WINDOW[HALF - i - 1] * dct[i];
    }
}
