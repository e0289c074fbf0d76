use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, ValueEnum};
use log::{info, warn};
use regex::Regex;
use rssinav::algorithms::PathRecorder;
use rssinav::ingress::parse_scan_payload;
use rssinav::registry::load_registry;
use rssinav::scanner::{BleScanner, ScannerConfig, DEFAULT_NAME_PATTERN};
use rssinav::{PipelineConfig, PipelineHandle, PipelineService};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Source {
    /// 每行一条 JSON 扫描负载
    Stdin,
    /// 本机蓝牙扫描
    Ble,
}

#[derive(Parser, Debug)]
#[command(name = "rssinav")]
#[command(about = "RSSI beacon positioning pipeline", long_about = None)]
struct Args {
    /// 信标表文件（name;x;y，首行为表头）
    #[arg(long, value_name = "FILE")]
    registry: PathBuf,

    /// 流水线配置（JSON），缺省使用默认参数
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// 扫描数据来源
    #[arg(long, value_enum, default_value = "stdin")]
    source: Source,

    /// 蓝牙扫描时的信标名称白名单
    #[arg(long, default_value = DEFAULT_NAME_PATTERN)]
    name_pattern: String,

    /// 结束时把记录的路径写入该文件（X;Y 格式）
    #[arg(long, value_name = "FILE")]
    path_out: Option<PathBuf>,
}

async fn feed_stdin(handle: PipelineHandle) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "reset" {
            handle.reset_session().await?;
            continue;
        }
        match parse_scan_payload(line) {
            Ok(scan) => handle.submit_scan(scan, Utc::now()).await?,
            Err(e) => warn!("忽略无效扫描数据: {}", e),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let registry = load_registry(&args.registry)
        .with_context(|| format!("无法加载信标表 {}", args.registry.display()))?;
    let config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("无法加载配置 {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    info!("{}", config.rssi_model());

    let PipelineService {
        handle,
        mut events,
        task,
    } = PipelineService::spawn(Arc::new(registry), config)?;

    let record = args.path_out.is_some();
    let consumer = tokio::spawn(async move {
        let mut recorder = PathRecorder::new();
        if record {
            recorder.start_recording();
        }
        while let Some(output) = events.recv().await {
            match serde_json::to_string(&output) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!("事件序列化失败: {}", e),
            }
            if let Some(fix) = &output.fix {
                recorder.accept(fix);
            }
        }
        recorder.stop_recording();
        recorder
    });

    match args.source {
        Source::Stdin => feed_stdin(handle).await?,
        Source::Ble => {
            let pattern = Regex::new(&args.name_pattern).context("名称白名单正则无效")?;
            let scanner = BleScanner::new(ScannerConfig::new(pattern));
            tokio::select! {
                result = scanner.run(handle) => { result?; }
                _ = tokio::signal::ctrl_c() => info!("收到中断信号"),
            }
        }
    }

    task.await.context("定位任务异常退出")?;
    let recorder = consumer.await.context("事件消费任务异常退出")?;

    if let Some(path) = &args.path_out {
        std::fs::write(path, recorder.export())
            .with_context(|| format!("无法写入路径文件 {}", path.display()))?;
        info!(
            "已写入 {} 个路径点（总长 {:.2} m）到 {}",
            recorder.len(),
            recorder.total_distance(),
            path.display()
        );
    }
    Ok(())
}
