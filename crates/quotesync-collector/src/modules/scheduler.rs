//! 배치 스케줄러.
//!
//! # 실행 흐름
//!
//! ```text
//! universe ──chunks(batch_size)──> batch 1 ──> batch 2 ──> ...
//!                                    │
//!                  buffer_unordered(workers)로 종목별 태스크 실행
//!                                    │
//!                  배치 전체 완료 후 다음 배치 (delay + jitter 대기)
//! ```
//!
//! 데드라인이 지나면 새 배치를 시작하지 않고 남은 종목은 `not_scheduled`로 집계합니다.
//! 남은 종목마다 `abandoned` 이벤트를 한 번씩 남깁니다.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use rand::Rng;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::pipeline::{SymbolOutcome, SymbolSync};
use crate::stats::RunSummary;

/// 스케줄러 설정.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// 배치당 종목 수
    pub batch_size: usize,
    /// 동시 워커 수
    pub workers: usize,
    /// 배치 간 기본 대기
    pub inter_batch_delay: Duration,
    /// 배치 간 추가 지터 하한
    pub jitter_min: Duration,
    /// 배치 간 추가 지터 상한
    pub jitter_max: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            workers: 3,
            inter_batch_delay: Duration::from_secs(15),
            jitter_min: Duration::from_secs(1),
            jitter_max: Duration::from_secs(5),
        }
    }
}

impl SchedulerConfig {
    fn pause(&self) -> Duration {
        let jitter = if self.jitter_max <= self.jitter_min {
            self.jitter_min
        } else {
            rand::thread_rng().gen_range(self.jitter_min..self.jitter_max)
        };
        self.inter_batch_delay + jitter
    }
}

/// 종목 목록을 배치 단위로 동기화하는 스케줄러.
pub struct BatchScheduler {
    sync: Arc<SymbolSync>,
    config: SchedulerConfig,
}

impl BatchScheduler {
    pub fn new(sync: Arc<SymbolSync>, config: SchedulerConfig) -> Self {
        Self { sync, config }
    }

    /// 전체 종목을 동기화하고 실행 요약을 반환합니다.
    pub async fn run(&self, universe: &[String], cancel: &CancellationToken) -> RunSummary {
        let started = Instant::now();
        let mut summary = RunSummary::new(universe.len());

        let batch_size = self.config.batch_size.max(1);
        let workers = self.config.workers.max(1);
        let batch_count = universe.len().div_ceil(batch_size);

        tracing::info!(
            symbols = universe.len(),
            batches = batch_count,
            batch_size,
            workers,
            "동기화 시작"
        );

        for (idx, batch) in universe.chunks(batch_size).enumerate() {
            if cancel.is_cancelled() {
                let remaining = &universe[idx * batch_size..];
                summary.not_scheduled = remaining.len();
                tracing::warn!(
                    not_scheduled = summary.not_scheduled,
                    "데드라인 경과, 남은 배치를 건너뜁니다"
                );
                // 시작하지 못한 종목도 종목별 종료 이벤트를 남김 (집계는 not_scheduled)
                for symbol in remaining {
                    let outcome = SymbolOutcome::Abandoned {
                        symbol: symbol.trim().to_string(),
                        reason: "데드라인 경과로 배치 미시작".to_string(),
                    };
                    outcome.log();
                    summary.unscheduled.push(outcome.symbol().to_string());
                }
                break;
            }

            tracing::debug!(
                batch = idx + 1,
                batches = batch_count,
                size = batch.len(),
                "배치 시작"
            );

            let outcomes: Vec<SymbolOutcome> = stream::iter(batch.iter().cloned())
                .map(|symbol| self.spawn_symbol(symbol, cancel.clone()))
                .buffer_unordered(workers)
                .collect()
                .await;

            for outcome in &outcomes {
                outcome.log();
                summary.record(outcome);
            }

            let is_last = idx + 1 == batch_count;
            if !is_last && !cancel.is_cancelled() {
                let pause = self.config.pause();
                tracing::debug!(pause_ms = pause.as_millis() as u64, "배치 간 대기");
                tokio::select! {
                    _ = tokio::time::sleep(pause) => {}
                    _ = cancel.cancelled() => {}
                }
            }
        }

        summary.deadline_reached = cancel.is_cancelled();
        summary.elapsed = started.elapsed();
        summary
    }

    /// 종목 하나를 별도 태스크로 실행합니다. 태스크가 패닉해도 `Failed`로 수습합니다.
    async fn spawn_symbol(&self, symbol: String, cancel: CancellationToken) -> SymbolOutcome {
        let sync = self.sync.clone();
        let task_symbol = symbol.clone();
        let handle = tokio::spawn(async move { sync.sync(&task_symbol, &cancel).await });

        match handle.await {
            Ok(outcome) => outcome,
            Err(e) => SymbolOutcome::Failed {
                symbol: symbol.trim().to_string(),
                reason: format!("워커 태스크 비정상 종료: {}", e),
            },
        }
    }
}
