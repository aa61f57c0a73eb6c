//! 동기화 파이프라인 통합 테스트.
//!
//! 스크립트 제공자와 메모리 저장소로 전체 흐름을 검증합니다:
//! - 이미 최신인 종목은 요청하지 않음
//! - 유효하지 않은 일봉은 저장하지 않음
//! - 별칭 대체 조회
//! - 데드라인 이후 새 배치를 시작하지 않음
//! - 배치 경계와 워커 수 제한
//! - 종목 단위 실패 격리

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use chrono_tz::America::Sao_Paulo;
use quotesync_collector::modules::{FixedClock, SchedulerConfig, SymbolOutcome, SymbolSync};
use quotesync_collector::SyncRunner;
use quotesync_core::{AliasSet, FetchWindow, RawBar};
use quotesync_provider::{
    Backoff, FetchError, FetchedSeries, QuoteSource, RateGate, RetryController,
};
use quotesync_store::MemoryPriceStore;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

// ============================================================================
// 테스트 헬퍼
// ============================================================================

/// 심볼별로 미리 정한 응답을 돌려주는 제공자.
///
/// 스크립트가 비면 `Empty`를 반환합니다.
#[derive(Default)]
struct ScriptedSource {
    responses: Mutex<HashMap<String, VecDeque<Result<FetchedSeries, FetchError>>>>,
    delays: Mutex<HashMap<String, Duration>>,
    panics: Mutex<HashSet<String>>,
    calls: Mutex<Vec<(String, Instant)>>,
}

impl ScriptedSource {
    fn respond(&self, symbol: &str, response: Result<FetchedSeries, FetchError>) {
        self.responses
            .lock()
            .unwrap()
            .entry(symbol.to_string())
            .or_default()
            .push_back(response);
    }

    fn respond_bars(&self, symbol: &str, name: Option<&str>, bars: Vec<RawBar>) {
        self.respond(
            symbol,
            Ok(FetchedSeries {
                symbol: symbol.to_string(),
                display_name: name.map(str::to_string),
                bars,
            }),
        );
    }

    fn delay(&self, symbol: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(symbol.to_string(), delay);
    }

    fn panic_on(&self, symbol: &str) {
        self.panics.lock().unwrap().insert(symbol.to_string());
    }

    fn calls_for(&self, symbol: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| s == symbol)
            .count()
    }

    fn first_call(&self, symbol: &str) -> Option<Instant> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .find(|(s, _)| s == symbol)
            .map(|(_, at)| *at)
    }

    fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl QuoteSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch(&self, window: &FetchWindow) -> Result<FetchedSeries, FetchError> {
        let symbol = window.symbol.clone();
        self.calls
            .lock()
            .unwrap()
            .push((symbol.clone(), Instant::now()));

        let delay = self.delays.lock().unwrap().get(&symbol).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let should_panic = self.panics.lock().unwrap().contains(&symbol);
        if should_panic {
            panic!("scripted panic for {}", symbol);
        }

        let next = self
            .responses
            .lock()
            .unwrap()
            .get_mut(&symbol)
            .and_then(|queue| queue.pop_front());
        next.unwrap_or_else(|| Err(FetchError::Empty(format!("{}: no script", symbol))))
    }
}

fn day(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, m, d).unwrap()
}

fn bar(date: NaiveDate, close: f64, volume: i64) -> RawBar {
    RawBar::new(date, close, close + 1.0, close - 1.0, close, volume)
}

/// 2024-06-14 18:30 (상파울루)
fn fixed_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock(
        Sao_Paulo
            .with_ymd_and_hms(2024, 6, 14, 18, 30, 0)
            .unwrap()
            .with_timezone(&Utc),
    ))
}

fn symbol_sync(
    store: &Arc<MemoryPriceStore>,
    source: &Arc<ScriptedSource>,
    aliases: AliasSet,
) -> Arc<SymbolSync> {
    let gate = RateGate::new(Duration::ZERO).with_jitter(Duration::ZERO, Duration::ZERO);
    let retry = RetryController::new(Arc::new(gate), Backoff::new(Duration::from_millis(10)), 2);

    Arc::new(SymbolSync::with_calendar(
        store.clone(),
        source.clone(),
        retry,
        Arc::new(aliases),
        fixed_clock(),
        Sao_Paulo,
        NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
    ))
}

fn scheduler(batch_size: usize, workers: usize, delay: Duration) -> SchedulerConfig {
    SchedulerConfig {
        batch_size,
        workers,
        inter_batch_delay: delay,
        jitter_min: Duration::ZERO,
        jitter_max: Duration::ZERO,
    }
}

fn universe(symbols: &[&str]) -> Vec<String> {
    symbols.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// 시나리오
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_current_symbol_skipped_and_new_symbol_backfilled() {
    let store = Arc::new(MemoryPriceStore::new());
    store
        .seed("AAA3", "Alpha", &[bar(day(6, 14), 10.0, 1000)])
        .unwrap();

    let source = Arc::new(ScriptedSource::default());
    source.respond_bars(
        "BBB4",
        Some("Beta SA"),
        vec![
            bar(day(6, 3), 20.0, 500),
            bar(day(6, 4), 21.0, 0),
            bar(day(6, 5), 22.0, 700),
        ],
    );

    let runner = SyncRunner::new(
        symbol_sync(&store, &source, AliasSet::empty()),
        scheduler(5, 3, Duration::from_secs(1)),
        Duration::from_secs(600),
    );
    let summary = runner
        .run(&universe(&["AAA3", "BBB4"]), &CancellationToken::new())
        .await;

    assert_eq!(summary.total, 2);
    assert_eq!(summary.current, 1);
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.rows_written, 2);
    assert!(!summary.deadline_reached);

    assert_eq!(source.calls_for("AAA3"), 0);
    assert_eq!(store.bars("BBB4").len(), 2);
    assert_eq!(store.instrument("BBB4").unwrap().name, "Beta SA");

    // 같은 데이터로 다시 실행해도 새로 저장되는 행이 없음
    let again = runner
        .run(&universe(&["AAA3", "BBB4"]), &CancellationToken::new())
        .await;
    assert_eq!(again.current, 1);
    assert_eq!(again.no_data, 1);
    assert_eq!(again.rows_written, 0);
    assert_eq!(store.bars("BBB4").len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_single_worker_run_with_one_empty_symbol_completes() {
    let store = Arc::new(MemoryPriceStore::new());
    let source = Arc::new(ScriptedSource::default());
    source.respond_bars(
        "AAA3",
        Some("Alpha"),
        vec![
            bar(day(6, 10), 10.0, 100),
            bar(day(6, 11), 10.5, 200),
            bar(day(6, 12), 11.0, 300),
        ],
    );

    let runner = SyncRunner::new(
        symbol_sync(&store, &source, AliasSet::empty()),
        scheduler(1, 1, Duration::from_secs(2)),
        Duration::from_secs(600),
    );
    let summary = runner
        .run(&universe(&["AAA3", "BBB4"]), &CancellationToken::new())
        .await;

    assert_eq!(summary.total, 2);
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.no_data, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.rows_written, 3);
    assert_eq!(summary.processed(), 2);

    assert_eq!(store.instrument_count(), 1);
    assert_eq!(store.bars("AAA3").len(), 3);
    assert!(store.instrument("BBB4").is_none());
    // 빈 응답도 재시도 대상
    assert_eq!(source.calls_for("BBB4"), 3);
}

#[tokio::test(start_paused = true)]
async fn test_alias_fallback_persists_under_canonical_symbol() {
    let store = Arc::new(MemoryPriceStore::new());
    let source = Arc::new(ScriptedSource::default());
    source.respond_bars(
        "BRDT3.SA",
        Some("Vibra Energia S.A."),
        vec![bar(day(6, 3), 25.0, 100)],
    );

    let aliases = AliasSet::new(vec![("VBBR3", vec!["BRDT3.SA"])], ".SA").unwrap();
    let sync = symbol_sync(&store, &source, aliases);

    let outcome = sync.sync("VBBR3", &CancellationToken::new()).await;

    assert_eq!(
        outcome,
        SymbolOutcome::Updated {
            symbol: "VBBR3".to_string(),
            name: "Vibra Energia S.A.".to_string(),
            variant: Some("BRDT3.SA".to_string()),
            rows: 1,
        }
    );
    // 정규 심볼은 재시도 횟수만큼, 별칭은 첫 시도에 성공
    assert_eq!(source.calls_for("VBBR3"), 3);
    assert_eq!(source.calls_for("BRDT3.SA"), 1);
    assert!(store.instrument("BRDT3.SA").is_none());
    assert_eq!(store.bars("VBBR3").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_missing_name_falls_back_to_symbol() {
    let store = Arc::new(MemoryPriceStore::new());
    let source = Arc::new(ScriptedSource::default());
    source.respond_bars("EZTC3", None, vec![bar(day(6, 3), 15.0, 100)]);

    let outcome = symbol_sync(&store, &source, AliasSet::empty())
        .sync("EZTC3", &CancellationToken::new())
        .await;

    assert_eq!(outcome.label(), "updated");
    assert_eq!(store.instrument("EZTC3").unwrap().name, "EZTC3");
}

#[tokio::test(start_paused = true)]
async fn test_deadline_stops_new_batches() {
    let store = Arc::new(MemoryPriceStore::new());
    let source = Arc::new(ScriptedSource::default());
    for symbol in ["S1", "S2", "S3", "S4"] {
        source.delay(symbol, Duration::from_secs(1));
        source.respond_bars(symbol, None, vec![bar(day(6, 3), 5.0, 100)]);
    }

    let runner = SyncRunner::new(
        symbol_sync(&store, &source, AliasSet::empty()),
        scheduler(2, 2, Duration::from_secs(1)),
        Duration::from_millis(500),
    );
    let summary = runner
        .run(&universe(&["S1", "S2", "S3", "S4"]), &CancellationToken::new())
        .await;

    // 진행 중이던 첫 배치는 끝까지 수행됨
    assert_eq!(summary.updated, 2);
    assert_eq!(summary.not_scheduled, 2);
    assert_eq!(summary.unscheduled, vec!["S3".to_string(), "S4".to_string()]);
    assert!(summary.deadline_reached);
    assert_eq!(source.total_calls(), 2);
    assert_eq!(source.calls_for("S3"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_before_start_schedules_nothing() {
    let store = Arc::new(MemoryPriceStore::new());
    let source = Arc::new(ScriptedSource::default());

    let runner = SyncRunner::new(
        symbol_sync(&store, &source, AliasSet::empty()),
        scheduler(2, 2, Duration::ZERO),
        Duration::from_secs(600),
    );
    let shutdown = CancellationToken::new();
    shutdown.cancel();

    let summary = runner.run(&universe(&["S1", " S2", "S3"]), &shutdown).await;

    assert_eq!(summary.not_scheduled, 3);
    assert_eq!(summary.unscheduled, universe(&["S1", "S2", "S3"]));
    assert_eq!(summary.processed(), 0);
    assert_eq!(source.total_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_next_batch_waits_for_slowest_symbol() {
    let store = Arc::new(MemoryPriceStore::new());
    let source = Arc::new(ScriptedSource::default());
    source.delay("FAST3", Duration::from_millis(100));
    source.delay("SLOW3", Duration::from_secs(2));
    for symbol in ["FAST3", "SLOW3", "NEXT3"] {
        source.respond_bars(symbol, None, vec![bar(day(6, 3), 5.0, 100)]);
    }

    let started = Instant::now();
    let runner = SyncRunner::new(
        symbol_sync(&store, &source, AliasSet::empty()),
        scheduler(2, 2, Duration::from_secs(1)),
        Duration::from_secs(600),
    );
    let summary = runner
        .run(&universe(&["FAST3", "SLOW3", "NEXT3"]), &CancellationToken::new())
        .await;

    assert_eq!(summary.updated, 3);
    let next = source.first_call("NEXT3").unwrap();
    assert!(next - started >= Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn test_worker_count_bounds_concurrency() {
    let store = Arc::new(MemoryPriceStore::new());
    let source = Arc::new(ScriptedSource::default());
    for symbol in ["W1", "W2", "W3"] {
        source.delay(symbol, Duration::from_secs(1));
        source.respond_bars(symbol, None, vec![bar(day(6, 3), 5.0, 100)]);
    }

    let runner = SyncRunner::new(
        symbol_sync(&store, &source, AliasSet::empty()),
        scheduler(3, 1, Duration::ZERO),
        Duration::from_secs(600),
    );
    runner
        .run(&universe(&["W1", "W2", "W3"]), &CancellationToken::new())
        .await;

    let mut starts: Vec<Instant> = ["W1", "W2", "W3"]
        .iter()
        .map(|s| source.first_call(s).unwrap())
        .collect();
    starts.sort();
    for pair in starts.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_secs(1));
    }
}

#[tokio::test(start_paused = true)]
async fn test_failures_are_isolated_per_symbol() {
    let store = Arc::new(MemoryPriceStore::new());
    store.fail_bars_for("CCC3").unwrap();

    let source = Arc::new(ScriptedSource::default());
    source.panic_on("BOOM3");
    source.respond_bars("CCC3", Some("Gamma"), vec![bar(day(6, 3), 5.0, 100)]);
    for _ in 0..3 {
        source.respond("NET3", Err(FetchError::Network("connection reset".into())));
    }
    source.respond_bars("OK3", Some("Okay"), vec![bar(day(6, 3), 5.0, 100)]);

    let runner = SyncRunner::new(
        symbol_sync(&store, &source, AliasSet::empty()),
        scheduler(2, 2, Duration::ZERO),
        Duration::from_secs(600),
    );
    let summary = runner
        .run(
            &universe(&["BOOM3", "CCC3", "NET3", "ZZZZ3", "OK3"]),
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(summary.failed, 3);
    assert_eq!(summary.no_data, 1);
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.processed(), 5);

    // 저장 실패한 종목은 종목 행도 남지 않음
    assert!(store.instrument("CCC3").is_none());
    assert_eq!(source.calls_for("NET3"), 3);
    assert_eq!(source.calls_for("ZZZZ3"), 3);
    assert_eq!(store.bars("OK3").len(), 1);
}
