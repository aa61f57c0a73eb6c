//! 종목 단위 동기화.
//!
//! ```text
//! 구간 결정 ──[AlreadyCurrent]──> current
//!    │
//!    └──> 별칭 해석 ──[일봉 없음]──> no_data / failed / abandoned
//!             │
//!             └──> 트랜잭션 저장 ──> updated / failed
//! ```
//!
//! 어떤 실패도 다른 종목에 영향을 주지 않으며, 모든 종목은 정확히 하나의 결과를 남깁니다.

use std::sync::Arc;

use chrono::NaiveDate;
use chrono_tz::Tz;
use quotesync_core::{AliasSet, WindowDecision};
use quotesync_provider::{QuoteSource, RetryController};
use quotesync_store::PriceStore;
use tokio_util::sync::CancellationToken;

use super::resolver::AliasResolver;
use super::window::{Clock, SystemClock, WindowCalculator};

/// 종목 하나의 최종 상태.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolOutcome {
    /// 이미 최신 (요청 없음)
    Current {
        symbol: String,
        last: Option<NaiveDate>,
    },
    /// 저장 완료
    Updated {
        symbol: String,
        name: String,
        variant: Option<String>,
        rows: usize,
    },
    /// 모든 후보에서 데이터 없음
    NoData { symbol: String, reason: String },
    /// 조회 또는 저장 실패
    Failed { symbol: String, reason: String },
    /// 데드라인으로 중단
    Abandoned { symbol: String, reason: String },
}

impl SymbolOutcome {
    pub fn symbol(&self) -> &str {
        match self {
            SymbolOutcome::Current { symbol, .. }
            | SymbolOutcome::Updated { symbol, .. }
            | SymbolOutcome::NoData { symbol, .. }
            | SymbolOutcome::Failed { symbol, .. }
            | SymbolOutcome::Abandoned { symbol, .. } => symbol,
        }
    }

    /// 로그/리포트용 결과 이름.
    pub fn label(&self) -> &'static str {
        match self {
            SymbolOutcome::Current { .. } => "current",
            SymbolOutcome::Updated { .. } => "updated",
            SymbolOutcome::NoData { .. } => "no_data",
            SymbolOutcome::Failed { .. } => "failed",
            SymbolOutcome::Abandoned { .. } => "abandoned",
        }
    }

    /// 종목 결과를 구조화 로그 한 줄로 남깁니다.
    pub fn log(&self) {
        let outcome = self.label();
        match self {
            SymbolOutcome::Current { symbol, last } => {
                tracing::info!(outcome, symbol = %symbol, last = ?last, "이미 최신");
            }
            SymbolOutcome::Updated {
                symbol,
                name,
                variant,
                rows,
            } => {
                tracing::info!(
                    outcome,
                    symbol = %symbol,
                    name = %name,
                    variant = variant.as_deref().unwrap_or(""),
                    rows,
                    "저장 완료"
                );
            }
            SymbolOutcome::NoData { symbol, reason } => {
                tracing::warn!(outcome, symbol = %symbol, reason = %reason, "데이터 없음");
            }
            SymbolOutcome::Failed { symbol, reason } => {
                tracing::error!(outcome, symbol = %symbol, reason = %reason, "동기화 실패");
            }
            SymbolOutcome::Abandoned { symbol, reason } => {
                tracing::warn!(outcome, symbol = %symbol, reason = %reason, "데드라인으로 중단");
            }
        }
    }
}

/// 종목 단위 동기화 실행기.
///
/// 워커 태스크 사이에서 `Arc`로 공유됩니다.
pub struct SymbolSync {
    store: Arc<dyn PriceStore>,
    windows: WindowCalculator,
    resolver: AliasResolver,
}

impl SymbolSync {
    /// 시스템 시계, 상파울루 시간대, 2023-01-01 시작 일자로 생성합니다.
    pub fn new(
        store: Arc<dyn PriceStore>,
        source: Arc<dyn QuoteSource>,
        retry: RetryController,
        aliases: Arc<AliasSet>,
    ) -> Self {
        let floor = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default();
        Self::with_calendar(
            store,
            source,
            retry,
            aliases,
            Arc::new(SystemClock),
            chrono_tz::America::Sao_Paulo,
            floor,
        )
    }

    /// 시계, 거래소 시간대, 시작 일자를 지정해 생성합니다.
    pub fn with_calendar(
        store: Arc<dyn PriceStore>,
        source: Arc<dyn QuoteSource>,
        retry: RetryController,
        aliases: Arc<AliasSet>,
        clock: Arc<dyn Clock>,
        timezone: Tz,
        floor: NaiveDate,
    ) -> Self {
        Self {
            windows: WindowCalculator::new(store.clone(), clock, timezone, floor),
            resolver: AliasResolver::new(source, retry, aliases),
            store,
        }
    }

    /// 종목 하나를 동기화합니다.
    pub async fn sync(&self, symbol: &str, cancel: &CancellationToken) -> SymbolOutcome {
        let symbol = symbol.trim().to_string();

        if cancel.is_cancelled() {
            return SymbolOutcome::Abandoned {
                symbol,
                reason: "시작 전 데드라인 경과".to_string(),
            };
        }

        let window = match self.windows.decide(&symbol).await {
            Ok(WindowDecision::AlreadyCurrent { last }) => {
                return SymbolOutcome::Current { symbol, last };
            }
            Ok(WindowDecision::Fetch(window)) => window,
            Err(e) => {
                return SymbolOutcome::Failed {
                    symbol,
                    reason: format!("마지막 일자 조회 실패: {}", e),
                };
            }
        };

        tracing::debug!(symbol = %symbol, start = %window.start, "수집 시작");

        let resolution = self.resolver.resolve(&symbol, &window, cancel).await;

        if resolution.bars.is_empty() {
            let reason = resolution
                .last_failure()
                .unwrap_or_else(|| "후보 없음".to_string());
            return if resolution.deadline_hit {
                SymbolOutcome::Abandoned { symbol, reason }
            } else if resolution.only_no_data() {
                SymbolOutcome::NoData { symbol, reason }
            } else {
                SymbolOutcome::Failed { symbol, reason }
            };
        }

        match self
            .store
            .persist_instrument(&symbol, &resolution.name, &resolution.bars)
            .await
        {
            Ok(report) => SymbolOutcome::Updated {
                symbol,
                name: resolution.name,
                variant: resolution.variant,
                rows: report.written,
            },
            Err(e) => SymbolOutcome::Failed {
                symbol,
                reason: format!("저장 실패: {}", e),
            },
        }
    }
}
