//! hca-probe - HCA 头部信息探测工具
//!
//! 解析 HCA 文件头部并以文本或 JSON 输出流参数.

use std::process;

use clap::Parser;
use serde::Serialize;

use hca_codec::HcaInfo;
use hca_format::{IoContext, comment_text, probe_io, read_header};

/// HCA 头部信息探测工具
#[derive(Parser, Debug)]
#[command(name = "hca-probe", version, about = "纯 Rust HCA 信息探测工具")]
struct Cli {
    /// 输入文件路径
    input: String,

    /// 输出 JSON 格式
    #[arg(long)]
    json: bool,

    /// 静默模式 (只输出探测结果)
    #[arg(short, long)]
    quiet: bool,
}

// ============================================================
// 输出结构体
// ============================================================

/// 探测结果
#[derive(Serialize)]
struct ProbeOutput {
    filename: String,
    probe_score: Option<u32>,
    version: String,
    header_size: u16,
    channels: u32,
    sample_rate: u32,
    block_count: u32,
    block_size: u32,
    duration: f64,
    encoder_delay: u16,
    encoder_padding: u16,
    compression: CompressionInfo,
    ath_type: u32,
    cipher_type: u32,
    rva_volume: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    vbr: Option<VbrInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    loop_info: Option<LoopOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<String>,
}

/// 压缩参数
#[derive(Serialize)]
struct CompressionInfo {
    min_resolution: u32,
    max_resolution: u32,
    track_count: u32,
    channel_config: u32,
    total_band_count: u32,
    base_band_count: u32,
    stereo_band_count: u32,
    bands_per_hfr_group: u32,
    hfr_group_count: u32,
    ms_stereo: bool,
}

/// VBR 参数
#[derive(Serialize)]
struct VbrInfo {
    max_block_size: u16,
    noise_level: u16,
}

/// 循环区间
#[derive(Serialize)]
struct LoopOutput {
    start_block: u32,
    end_block: u32,
    repeat_count: u16,
    infinite: bool,
}

impl ProbeOutput {
    fn new(filename: &str, probe_score: Option<u32>, info: &HcaInfo) -> Self {
        Self {
            filename: filename.to_string(),
            probe_score,
            version: format!("{}.{}", info.version >> 8, info.version & 0xFF),
            header_size: info.data_offset,
            channels: info.channel_count,
            sample_rate: info.sample_rate,
            block_count: info.block_count,
            block_size: info.block_size,
            duration: info.duration_secs(),
            encoder_delay: info.encoder_delay,
            encoder_padding: info.encoder_padding,
            compression: CompressionInfo {
                min_resolution: info.min_resolution,
                max_resolution: info.max_resolution,
                track_count: info.track_count,
                channel_config: info.channel_config,
                total_band_count: info.total_band_count,
                base_band_count: info.base_band_count,
                stereo_band_count: info.stereo_band_count,
                bands_per_hfr_group: info.bands_per_hfr_group,
                hfr_group_count: info.hfr_group_count(),
                ms_stereo: info.ms_stereo != 0,
            },
            ath_type: info.ath_type,
            cipher_type: info.cipher_type,
            rva_volume: info.rva_volume,
            vbr: info.is_vbr().then_some(VbrInfo {
                max_block_size: info.vbr_max_block_size,
                noise_level: info.vbr_noise_level,
            }),
            loop_info: info.loop_info.map(|lp| LoopOutput {
                start_block: lp.start_block,
                end_block: lp.end_block,
                repeat_count: lp.repeat_count,
                infinite: lp.is_infinite(),
            }),
            comment: comment_text(info),
        }
    }
}

// ============================================================
// 主逻辑
// ============================================================

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if !cli.quiet {
        eprintln!(
            "hca-probe 版本 {} -- 纯 Rust HCA 信息探测工具",
            env!("CARGO_PKG_VERSION")
        );
        eprintln!("输入文件: {}", cli.input);
    }

    let mut io = match IoContext::open_read(&cli.input) {
        Ok(io) => io,
        Err(e) => {
            eprintln!("错误: 无法打开文件 '{}': {e}", cli.input);
            process::exit(1);
        }
    };

    let probe_score = match probe_io(&mut io) {
        Ok(score) => score,
        Err(e) => {
            eprintln!("错误: 无法读取文件: {e}");
            process::exit(1);
        }
    };
    if probe_score.is_none() {
        log::warn!("文件开头不是 HCA 标签, 仍尝试解析");
    }

    let info = match read_header(&mut io) {
        Ok(info) => info,
        Err(e) => {
            eprintln!("错误: 无法解析 HCA 头部: {e}");
            process::exit(1);
        }
    };

    let output = ProbeOutput::new(&cli.input, probe_score, &info);
    if cli.json {
        match serde_json::to_string_pretty(&output) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("错误: JSON 序列化失败: {e}");
                process::exit(1);
            }
        }
    } else {
        print_text(&output);
    }
}

/// 文本格式输出
fn print_text(output: &ProbeOutput) {
    println!("[HCA]");
    println!("filename={}", output.filename);
    println!("version={}", output.version);
    println!("header_size={}", output.header_size);
    println!("channels={}", output.channels);
    println!("sample_rate={}", output.sample_rate);
    println!("block_count={}", output.block_count);
    println!("block_size={}", output.block_size);
    println!("duration={:.6}", output.duration);
    println!("encoder_delay={}", output.encoder_delay);
    println!("encoder_padding={}", output.encoder_padding);
    println!("ath_type={}", output.ath_type);
    println!("cipher_type={}", output.cipher_type);
    println!("rva_volume={}", output.rva_volume);
    println!("[/HCA]");

    let comp = &output.compression;
    println!("[COMPRESSION]");
    println!("resolution={}..{}", comp.min_resolution, comp.max_resolution);
    println!("track_count={}", comp.track_count);
    println!("channel_config={}", comp.channel_config);
    println!(
        "bands=total:{} base:{} stereo:{}",
        comp.total_band_count, comp.base_band_count, comp.stereo_band_count
    );
    println!(
        "hfr=groups:{} bands_per_group:{}",
        comp.hfr_group_count, comp.bands_per_hfr_group
    );
    println!("ms_stereo={}", comp.ms_stereo);
    println!("[/COMPRESSION]");

    if let Some(vbr) = &output.vbr {
        println!("[VBR]");
        println!("max_block_size={}", vbr.max_block_size);
        println!("noise_level={}", vbr.noise_level);
        println!("[/VBR]");
    }

    if let Some(lp) = &output.loop_info {
        println!("[LOOP]");
        println!("blocks={}..={}", lp.start_block, lp.end_block);
        if lp.infinite {
            println!("repeat=infinite");
        } else {
            println!("repeat={}", lp.repeat_count);
        }
        println!("[/LOOP]");
    }

    if let Some(comment) = &output.comment {
        println!("comment={comment}");
    }
}
