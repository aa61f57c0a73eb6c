//! Quotesync collector CLI.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use quotesync_core::logging::{init_logging, LogConfig};
use quotesync_collector::{universe, CollectorConfig, SyncRunner};
use quotesync_store::{PgPriceStore, StoreConfig};
use secrecy::ExposeSecret;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "quotesync-collector")]
#[command(about = "Incremental daily-bar synchronizer", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// 일봉 동기화 1회 실행
    Sync {
        /// 특정 심볼만 동기화 (쉼표로 구분, 예: "PETR4,VALE3")
        #[arg(long, conflicts_with = "sample")]
        symbols: Option<String>,

        /// 샘플 종목(PETR4, VALE3, EZTC3, BBDC4, ITUB4)만 동기화
        #[arg(long)]
        sample: bool,
    },

    /// 데이터베이스 마이그레이션 실행
    Migrate,

    /// 데몬 모드: 주기적으로 전체 종목 동기화
    Daemon,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 로깅 초기화
    let filter = format!(
        "quotesync_collector={0},quotesync_provider={0},quotesync_store={0},quotesync_core={0}",
        cli.log_level
    );
    init_logging(LogConfig::new(filter).format_from_env()).map_err(|e| anyhow::anyhow!(e))?;

    tracing::info!("Quotesync Collector 시작");

    // 설정 로드
    let config = CollectorConfig::from_env()?;
    tracing::debug!(
        workers = config.schedule.workers,
        batch_size = config.schedule.batch_size,
        "설정 로드 완료"
    );

    // DB 연결
    let store = PgPriceStore::connect(
        config.database_url.expose_secret(),
        &StoreConfig::for_workers(config.schedule.workers),
    )
    .await
    .context("데이터베이스 연결 실패")?;

    // 종료 신호
    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("종료 신호 수신, 진행 중인 작업만 마무리합니다");
            signal_token.cancel();
        }
    });

    // 명령 실행
    match cli.command {
        Commands::Migrate => {
            store.migrate().await?;
        }
        Commands::Sync { symbols, sample } => {
            let universe = match (symbols, sample) {
                (Some(list), _) => universe::parse_symbol_list(&list),
                (None, true) => universe::sample_universe(),
                (None, false) => universe::builtin_universe(),
            };
            if universe.is_empty() {
                anyhow::bail!("동기화할 심볼이 없습니다");
            }

            let runner = SyncRunner::from_config(&config, Arc::new(store.clone()))?;
            let summary = runner.run(&universe, &shutdown).await;
            summary.log_summary("일봉 동기화");
        }
        Commands::Daemon => {
            tracing::info!(
                interval_minutes = config.daemon.interval_minutes,
                "=== 데몬 모드 시작 ==="
            );

            let runner = SyncRunner::from_config(&config, Arc::new(store.clone()))?;
            let universe = universe::builtin_universe();

            let mut interval = tokio::time::interval(config.daemon.interval());
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        tracing::info!("데몬 종료 중...");
                        break;
                    }
                    _ = interval.tick() => {
                        let summary = runner.run(&universe, &shutdown).await;
                        summary.log_summary("일봉 동기화");

                        tracing::info!(
                            interval_minutes = config.daemon.interval_minutes,
                            "다음 실행까지 대기"
                        );
                    }
                }
            }
        }
    }

    store.pool().close().await;
    tracing::info!("Quotesync Collector 종료");

    Ok(())
}
