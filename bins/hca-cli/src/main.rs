//! hca-cli - HCA 解码命令行工具
//!
//! 把一个 HCA 文件解码为 WAV (或不带头部的裸 PCM).

mod logging;
mod options;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{debug, error, info};

use hca_core::SampleFormat;
use hca_format::probe::SCORE_MAX;
use hca_format::{HcaDecoder, IoContext, comment_text, probe_io};

use options::{CliOptions, ConfigFile, build_config, parse_key, parse_modifier};

#[derive(Parser, Debug)]
#[command(name = "hca-cli", version, about = "纯 Rust HCA 解码工具")]
struct Cli {
    /// 输入 HCA 文件
    #[arg(short, long)]
    input: PathBuf,

    /// 输出文件 (默认与输入同名, 扩展名为 .wav)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// 64 位解密密钥 (十进制或 0x 前缀十六进制)
    #[arg(short, long, value_parser = parse_key)]
    key: Option<u64>,

    /// 密钥修饰值 (ACB/AWB 子密钥)
    #[arg(short = 'm', long, value_parser = parse_modifier)]
    key_modifier: Option<u16>,

    /// 展开循环区间, 指定循环播放次数
    #[arg(short = 'l', long = "loop")]
    loop_count: Option<u32>,

    /// 输出采样格式 (u8, s16, s24, s32, f32)
    #[arg(short, long)]
    format: Option<SampleFormat>,

    /// 软循环: 不在 WAV 头中写入 smpl 块
    #[arg(long)]
    soft_loop: bool,

    /// 只输出 PCM 数据, 不写 WAV 头
    #[arg(long)]
    no_header: bool,

    /// JSON 配置文件, 命令行参数优先
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 覆盖输出文件
    #[arg(short = 'y', long)]
    overwrite: bool,

    /// 日志级别 (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = logging::init("hca-cli", cli.verbose) {
        eprintln!("警告: {e:#}");
    }

    if let Err(e) = run(&cli) {
        error!("{e:#}");
        eprintln!("错误: {e:#}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output(&cli.input, cli.no_header));
    if !cli.overwrite && output.exists() {
        bail!("输出文件已存在 '{}', 使用 -y 覆盖", output.display());
    }

    let file_config = cli.config.as_deref().map(ConfigFile::load).transpose()?;
    let config = build_config(
        file_config.as_ref(),
        &CliOptions {
            key: cli.key,
            key_modifier: cli.key_modifier,
            loop_count: cli.loop_count,
            format: cli.format,
            soft_loop: cli.soft_loop,
            no_header: cli.no_header,
        },
    )?;
    debug!("解码配置: {config:?}");

    let mut io = IoContext::open_read(&cli.input)
        .with_context(|| format!("无法打开输入文件 '{}'", cli.input.display()))?;
    if probe_io(&mut io)? != Some(SCORE_MAX) {
        bail!("'{}' 不是 HCA 文件", cli.input.display());
    }

    let mut decoder = HcaDecoder::new(&mut io, config).context("打开 HCA 流失败")?;
    let info = decoder.info();
    info!(
        "输入: {} ({} 声道, {} Hz, {} 块, {:.2} 秒, 密码类型 {})",
        cli.input.display(),
        info.channel_count,
        info.sample_rate,
        info.block_count,
        info.duration_secs(),
        info.cipher_type,
    );
    if let Some(comment) = comment_text(info) {
        info!("注释: {comment}");
    }

    let started = Instant::now();
    let file = File::create(&output)
        .with_context(|| format!("无法创建输出文件 '{}'", output.display()))?;
    let mut writer = BufWriter::new(file);
    let written = std::io::copy(&mut decoder, &mut writer).context("解码失败")?;
    writer.flush().context("写入输出文件失败")?;

    info!(
        "输出: {} ({} 字节, 耗时 {:.2?})",
        output.display(),
        written,
        started.elapsed(),
    );
    Ok(())
}

/// 默认输出路径: 替换输入文件的扩展名
fn default_output(input: &Path, raw: bool) -> PathBuf {
    input.with_extension(if raw { "pcm" } else { "wav" })
}
