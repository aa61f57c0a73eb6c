//! 동기화 실행 조립.
//!
//! 설정으로부터 제공자, 요청 간격 게이트, 재시도 컨트롤러, 스케줄러를 구성하고
//! 실행마다 데드라인 토큰을 새로 만듭니다.

use std::sync::Arc;
use std::time::Duration;

use quotesync_core::AliasSet;
use quotesync_provider::{
    Backoff, QuoteSource, RateGate, RetryController, YahooChartClient, YahooConfig,
};
use quotesync_store::PriceStore;
use tokio_util::sync::CancellationToken;

use crate::config::CollectorConfig;
use crate::modules::{arm_deadline, BatchScheduler, SchedulerConfig, SymbolSync, SystemClock};
use crate::stats::RunSummary;
use crate::Result;

/// 한 번의 동기화 실행기.
pub struct SyncRunner {
    scheduler: BatchScheduler,
    deadline: Duration,
}

impl SyncRunner {
    pub fn new(sync: Arc<SymbolSync>, scheduler: SchedulerConfig, deadline: Duration) -> Self {
        Self {
            scheduler: BatchScheduler::new(sync, scheduler),
            deadline,
        }
    }

    /// 설정으로 Yahoo 제공자를 사용하는 실행기를 구성합니다.
    pub fn from_config(config: &CollectorConfig, store: Arc<dyn PriceStore>) -> Result<Self> {
        let source = YahooChartClient::new(YahooConfig {
            base_url: config.fetch.base_url.clone(),
            symbol_suffix: config.fetch.symbol_suffix.clone(),
            timezone: config.sync.timezone,
            ..Default::default()
        })?;
        let aliases = config.load_aliases()?;

        tracing::info!(
            provider = source.name(),
            aliases = aliases.len(),
            workers = config.schedule.workers,
            batch_size = config.schedule.batch_size,
            deadline_secs = config.schedule.deadline_secs,
            "실행기 구성 완료"
        );

        Ok(Self::with_source(config, store, Arc::new(source), aliases))
    }

    /// 제공자를 지정해 실행기를 구성합니다.
    pub fn with_source(
        config: &CollectorConfig,
        store: Arc<dyn PriceStore>,
        source: Arc<dyn QuoteSource>,
        aliases: AliasSet,
    ) -> Self {
        let gate = Arc::new(RateGate::new(config.fetch.min_request_interval()));
        let retry = RetryController::new(
            gate,
            Backoff::new(config.fetch.backoff_base()),
            config.fetch.max_retries,
        );
        let sync = SymbolSync::with_calendar(
            store,
            source,
            retry,
            Arc::new(aliases),
            Arc::new(SystemClock),
            config.sync.timezone,
            config.sync.start_date,
        );
        let scheduler = SchedulerConfig {
            batch_size: config.schedule.batch_size,
            workers: config.schedule.workers,
            inter_batch_delay: config.schedule.batch_delay(),
            ..Default::default()
        };

        Self::new(Arc::new(sync), scheduler, config.schedule.deadline())
    }

    /// 종목 목록을 동기화합니다.
    ///
    /// 실행 토큰은 `shutdown`의 자식이므로 종료 신호도 데드라인과 같은 방식으로 처리됩니다.
    pub async fn run(&self, universe: &[String], shutdown: &CancellationToken) -> RunSummary {
        let cancel = shutdown.child_token();
        let _deadline = arm_deadline(cancel.clone(), self.deadline);

        self.scheduler.run(universe, &cancel).await
    }
}
