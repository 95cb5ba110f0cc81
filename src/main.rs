//! rswappalyzer-har 命令行入口
//! 读取 HAR 抓包或信号包 JSON，输出检测到的技术栈

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use rswappalyzer_har::{
    detections_to_pretty_json, detections_to_pretty_text, ConfigManager, Detection, FingerprintCache,
    GlobalConfig, SignalBundle, TechDetector,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

#[derive(Debug, Parser)]
#[command(name = "rswappalyzer-har", version, about = "Detect web technologies from a HAR capture")]
#[command(group(ArgGroup::new("input").required(true).args(["har", "bundle"])))]
struct Cli {
    /// HAR 抓包文件
    #[arg(long, value_name = "PATH")]
    har: Option<PathBuf>,

    /// 信号包 JSON 文件
    #[arg(long, value_name = "PATH")]
    bundle: Option<PathBuf>,

    /// 指纹数据目录（默认读取 WAPPALYZER_DATA_DIR）
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// 删除本地指纹数据并重新拉取
    #[arg(long)]
    refresh_data: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// 输出文件，缺省写到标准输出
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,
}

fn init_logger(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn write_output(payload: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::write(path, payload).with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote results to {}", path.display());
        }
        None => println!("{}", payload),
    }
    Ok(())
}

fn render(detections: &[Detection], format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Json => detections_to_pretty_json(detections)?,
        OutputFormat::Pretty => detections_to_pretty_text(detections),
    })
}

fn build_config(cli: &Cli) -> GlobalConfig {
    let mut builder = ConfigManager::custom().verbose(cli.verbose);
    if let Some(data_dir) = cli.data_dir.clone() {
        builder = builder.data_dir(data_dir);
    }
    builder.build()
}

async fn run(cli: Cli, config: GlobalConfig) -> Result<()> {
    // 输入文件先于指纹加载检查
    if let Some(har) = &cli.har {
        if !har.exists() {
            error!("HAR file not found: {}", har.display());
            process::exit(1);
        }
    }

    let cache = FingerprintCache::new(config);

    let store = if cli.refresh_data {
        cache.refresh().await
    } else {
        cache.get().await
    }
    .context("Failed to load fingerprint data")?;
    let detector = TechDetector::new(store);
    info!(
        "[Detect] Technologies: {} | Categories: {} | Groups: {}",
        detector.store().technologies.len(),
        detector.store().categories.len(),
        detector.store().groups.len()
    );

    let detections = match (&cli.har, &cli.bundle) {
        (Some(har), _) => detector.analyze_har(har),
        (None, Some(bundle)) => {
            let text = std::fs::read_to_string(bundle)
                .with_context(|| format!("Failed to read {}", bundle.display()))?;
            let value: serde_json::Value = serde_json::from_str(&text)
                .with_context(|| format!("Invalid JSON in {}", bundle.display()))?;
            detector.analyze_json(&value)
        }
        (None, None) => detector.analyze(&SignalBundle::default()),
    };

    let payload = render(&detections, cli.format)?;
    write_output(&payload, cli.output.as_deref())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = build_config(&cli);
    init_logger(config.verbose);

    if let Err(e) = run(cli, config).await {
        error!("{:#}", e);
        process::exit(1);
    }
}
