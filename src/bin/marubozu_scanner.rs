//! Marubozu сканер Binance Futures
//! Раз в цикл проходит по топ-инструментам, ищет марубозу на последней закрытой свече
//! и шлет один алерт на каждую новую подходящую свечу

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use marubozu_scanner::alerts::{LogNotifier, Notifier, TelegramNotifier};
use marubozu_scanner::exchanges::BinanceFuturesClient;
use marubozu_scanner::screener::scanner::Scanner;
use marubozu_scanner::utils::config::{ScannerConfig, ENV_TELEGRAM_CHAT_ID, ENV_TELEGRAM_TOKEN};
use marubozu_scanner::utils::logging::init_logging;

#[derive(Parser)]
#[command(name = "marubozu-scanner", about = "Scan Binance futures for Marubozu candles and send alerts")]
struct Args {
    /// YAML config (missing file = defaults)
    #[arg(short, long, default_value = "config/marubozu.yaml")]
    config: PathBuf,

    /// Run a single scan cycle and exit
    #[arg(long)]
    once: bool,

    /// Write alerts to the log instead of Telegram
    #[arg(long)]
    dry_run: bool,

    /// Candle interval override (1h, 4h, 1d ...)
    #[arg(short, long)]
    interval: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();
    init_logging();

    let mut config = ScannerConfig::load_or_default(&args.config)
        .with_context(|| format!("Failed to load config {}", args.config.display()))?;
    config.apply_env_overrides();
    if let Some(interval) = args.interval {
        config.interval = interval;
    }
    config.validate().context("Invalid scanner config")?;

    let source = BinanceFuturesClient::new(&config.binance.base_url, config.request_timeout())
        .context("Failed to build Binance client")?;
    let notifier = build_notifier(&config, args.dry_run)?;

    let scanner = Scanner::new(config, Arc::new(source), notifier);

    if args.once {
        let report = scanner.run_cycle().await?;
        log::info!("✅ {}", report);
        return Ok(());
    }

    let shutdown = scanner.shutdown_signal();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("🛑 Ctrl-C: дорабатываем текущий символ и выходим...");
            shutdown.trigger();
        }
    });

    scanner.run().await;
    Ok(())
}

fn build_notifier(config: &ScannerConfig, dry_run: bool) -> Result<Arc<dyn Notifier>> {
    if dry_run {
        log::info!("🧪 Dry-run: алерты пишутся только в лог");
        return Ok(Arc::new(LogNotifier));
    }

    match config.telegram.credentials() {
        Some((token, chat_id)) => {
            let notifier = TelegramNotifier::new(&config.telegram.api_base, token, chat_id, config.request_timeout())
                .context("Failed to build Telegram notifier")?;
            log::info!("📨 Алерты уходят в Telegram (chat {})", chat_id);
            Ok(Arc::new(notifier))
        }
        None => {
            log::warn!(
                "⚠️  {} / {} не заданы, алерты только в лог",
                ENV_TELEGRAM_TOKEN, ENV_TELEGRAM_CHAT_ID
            );
            Ok(Arc::new(LogNotifier))
        }
    }
}
