//! HCA 解码性能基准测试.
//!
//! 覆盖单块解码 (含解密与 IMDCT), 采样编码与整条流读取.

use std::hint::black_box;
use std::io::Read;

use criterion::{Criterion, criterion_group, criterion_main};
use hca::codec::block::BLOCK_SYNC;
use hca::codec::{BlockDecoder, Cipher, HcaInfo};
use hca::core::bitwriter::BitWriter;
use hca::core::crc::seal_crc16;
use hca::format::header::build_header;
use hca::{DecoderConfig, HcaDecoder, IoContext, SampleFormat};

const BLOCK_SIZE: usize = 0x200;
const KEY: u64 = 0x0030_D9E8;

/// 双声道流参数, 每声道 16 个系数
fn make_info(block_count: u32) -> HcaInfo {
    HcaInfo {
        channel_count: 2,
        sample_rate: 48000,
        block_size: BLOCK_SIZE as u32,
        block_count,
        total_band_count: 16,
        base_band_count: 16,
        cipher_type: 56,
        ..HcaInfo::default()
    }
}

/// 比例因子 40 对应分辨率 15, 每个系数一个伪随机的 12 位量化码
fn make_block(cipher: &Cipher, seed: u32) -> Vec<u8> {
    let mut bw = BitWriter::new();
    bw.write_bits(BLOCK_SYNC, 16);
    bw.write_bits(0, 16);
    for _ in 0..2 {
        bw.write_bits(6, 3);
        for _ in 0..16 {
            bw.write_bits(40, 6);
        }
    }
    let mut state = seed;
    for _ in 0..8 * 2 * 16 {
        state = state.wrapping_mul(0x343FD).wrapping_add(0x269EC3);
        bw.write_bits((state >> 16) & 0xFFF, 12);
    }
    let mut block = bw.finish_block(BLOCK_SIZE);
    cipher.encrypt(&mut block[..BLOCK_SIZE - 2]);
    seal_crc16(&mut block);
    block
}

fn make_stream(block_count: u32) -> Vec<u8> {
    let cipher = Cipher::new(56, KEY, 0).unwrap();
    let mut data = build_header(&make_info(block_count)).unwrap();
    for n in 0..block_count {
        data.extend_from_slice(&make_block(&cipher, n));
    }
    data
}

fn bench_block_decode(c: &mut Criterion) {
    c.bench_function("hca_block_decode_stereo", |b| {
        let cipher = Cipher::new(56, KEY, 0).unwrap();
        let block = make_block(&cipher, 1);
        let mut decoder = BlockDecoder::new(make_info(1), cipher).unwrap();
        b.iter(|| {
            decoder.decode_block(black_box(&block), 0).unwrap();
        });
    });
}

fn bench_sample_encode(c: &mut Criterion) {
    let cipher = Cipher::new(56, KEY, 0).unwrap();
    let block = make_block(&cipher, 1);
    let mut decoder = BlockDecoder::new(make_info(1), cipher).unwrap();
    decoder.decode_block(&block, 0).unwrap();

    for format in [SampleFormat::S16, SampleFormat::F32] {
        c.bench_function(&format!("hca_write_samples_{format}"), |b| {
            let mut out = Vec::with_capacity(2 * 1024 * 4);
            b.iter(|| {
                out.clear();
                decoder.write_samples(1.0, format.encoder(), &mut out);
                black_box(out.len());
            });
        });
    }
}

fn bench_stream_read(c: &mut Criterion) {
    c.bench_function("hca_stream_read_64_blocks", |b| {
        let data = make_stream(64);
        let mut out = Vec::new();
        b.iter(|| {
            let mut io = IoContext::from_bytes(data.clone());
            let mut decoder = HcaDecoder::new(&mut io, DecoderConfig::default().with_key(KEY)).unwrap();
            out.clear();
            decoder.read_to_end(&mut out).unwrap();
            black_box(out.len());
        });
    });
}

criterion_group!(benches, bench_block_decode, bench_sample_encode, bench_stream_read);
criterion_main!(benches);
