// ==========================================
// 光纤路由分析 - 命令行入口
// ==========================================
// 用法: fibre-trace-assist <报表文件> [--db 参考库] [--no-crawl] ...
// 输出: TraceRunReport (JSON) 写入 stdout 或 --output
// ==========================================

use anyhow::{Context, Result};
use clap::Parser;
use fibre_trace_assist::config::{get_default_db_path, ConfigManager};
use fibre_trace_assist::crawler::{DetailFetcher, DisabledFetcher, HttpDetailFetcher};
use fibre_trace_assist::repository::{NoReferenceLookup, ReferenceLookup, SqliteReferenceRepository};
use fibre_trace_assist::{i18n, logging, CancelFlag, FibreType, PipelineConfig, TracePipeline, TraceSource};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "fibre-trace-assist")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Fibre trace tube classification, tray visibility and cross-section alerts", long_about = None)]
struct Cli {
    /// Trace report (.csv / .xlsx / .xls / .html / .htm)
    input: PathBuf,

    /// Reference database (Cable / SpliceCases / config_kv)
    #[arg(long, env = "FIBRE_TRACE_ASSIST_DB_PATH")]
    db: Option<PathBuf>,

    /// Skip cross-section fetches
    #[arg(long)]
    no_crawl: bool,

    /// Path fibre type (local / junction / trunk), overrides inference
    #[arg(long)]
    fibre_type: Option<FibreType>,

    /// Display language for commentary and diagnostics (en / zh-CN)
    #[arg(long)]
    locale: Option<String>,

    /// Write the JSON report to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Maximum concurrent cross-section fetches
    #[arg(long)]
    concurrency: Option<usize>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    if cli.json {
        logging::init_json(level);
    } else {
        logging::init_with_default(level);
    }

    info!("==================================================");
    info!("{} v{}", fibre_trace_assist::APP_NAME, fibre_trace_assist::VERSION);
    info!("==================================================");

    // 参考库: --db / 环境变量 / 默认路径（不存在则不接入）
    let db_path = cli
        .db
        .clone()
        .unwrap_or_else(|| PathBuf::from(get_default_db_path()));
    let (lookup, mut config) = open_reference(&db_path)?;

    // 命令行覆写
    if cli.no_crawl {
        config.crawl_enabled = false;
    }
    if let Some(concurrency) = cli.concurrency {
        config.fetch_concurrency = concurrency;
    }
    if let Some(locale) = &cli.locale {
        config.locale = locale.clone();
    }
    config.validate().context("invalid configuration")?;
    i18n::set_locale(&config.locale);

    let source = TraceSource::from_path(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;

    // Ctrl-C → 协作式取消（编排器与抓取重试共用）
    let cancel = CancelFlag::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("收到中断信号, 停止后续处理");
                cancel.cancel();
            }
        });
    }

    let fetcher: Arc<dyn DetailFetcher> = if config.crawl_enabled {
        let http = HttpDetailFetcher::new(&config).context("failed to build HTTP client")?;
        Arc::new(http.with_cancel_flag(cancel.clone()))
    } else {
        Arc::new(DisabledFetcher)
    };

    let pipeline = TracePipeline::new(lookup, fetcher, config)
        .with_cancel_flag(cancel)
        .with_fibre_type(cli.fibre_type);
    let report = pipeline.run(source).await.context("trace analysis failed")?;
    pipeline.shutdown();

    let json = serde_json::to_string_pretty(&report)?;
    match &cli.output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "报告已写入");
        }
        None => println!("{}", json),
    }

    info!(
        rows = report.rows.len(),
        alerts = report.alert_count(),
        diagnostics = report.diagnostics.len(),
        parity = ?report.parity,
        cancelled = report.cancelled,
        "完成"
    );
    Ok(())
}

/// 打开参考库并加载配置; 文件不存在时使用默认配置, 缺少 Cable 表时不查询
fn open_reference(db_path: &Path) -> Result<(Arc<dyn ReferenceLookup>, PipelineConfig)> {
    if !db_path.exists() {
        warn!(path = %db_path.display(), "参考库不存在, 跳过 segment 查询与建议");
        return Ok((Arc::new(NoReferenceLookup), PipelineConfig::default()));
    }

    let path = db_path.to_string_lossy();
    let config = ConfigManager::new(&path)
        .and_then(|manager| manager.load_pipeline_config())
        .context("failed to load configuration")?;
    let repo = SqliteReferenceRepository::new(&path).context("failed to open reference database")?;
    if !repo.is_available() {
        warn!(path = %path, "参考库缺少 Cable 表, 跳过 segment 查询与建议");
        return Ok((Arc::new(NoReferenceLookup), config));
    }
    info!(path = %path, "参考库已接入");
    Ok((Arc::new(repo), config))
}
