//! 별칭 대체 조회.
//!
//! 정규 심볼로 데이터를 받지 못하면 별칭을 순서대로 시도하고,
//! 처음으로 일봉이 있는 후보에서 멈춥니다.

use std::future::Future;
use std::sync::Arc;

use quotesync_core::{AliasSet, FetchWindow, RawBar};
use quotesync_provider::{FetchedSeries, QuoteSource, RetryController, RetryError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// 후보 순회 결과.
#[derive(Debug, Default)]
pub struct FirstHit {
    /// 일봉을 돌려준 후보와 그 결과
    pub winner: Option<(String, FetchedSeries)>,
    /// 실패한 후보와 사유 (시도 순서)
    pub failures: Vec<(String, RetryError)>,
    /// 데드라인 때문에 남은 후보를 건너뛰었는지
    pub deadline_hit: bool,
}

/// 후보를 순서대로 시도해 처음으로 일봉이 있는 결과를 반환합니다.
///
/// 첫 성공에서 멈추며, 데드라인이 지나면 남은 후보는 시도하지 않습니다.
pub async fn first_non_empty<F, Fut>(
    candidates: &[String],
    cancel: &CancellationToken,
    mut attempt: F,
) -> FirstHit
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<FetchedSeries, RetryError>>,
{
    let mut hit = FirstHit::default();

    for candidate in candidates {
        if cancel.is_cancelled() {
            hit.deadline_hit = true;
            break;
        }

        match attempt(candidate.clone()).await {
            Ok(series) if !series.is_empty() => {
                hit.winner = Some((candidate.clone(), series));
                break;
            }
            Ok(_) => hit
                .failures
                .push((candidate.clone(), RetryError::NoData { attempts: 1 })),
            Err(RetryError::DeadlineExceeded { attempts }) => {
                hit.failures
                    .push((candidate.clone(), RetryError::DeadlineExceeded { attempts }));
                hit.deadline_hit = true;
                break;
            }
            Err(e) => hit.failures.push((candidate.clone(), e)),
        }
    }

    hit
}

/// 별칭 해석 결과.
#[derive(Debug)]
pub struct Resolution {
    /// 저장할 종목명 (제공자 이름, 없으면 정규 심볼)
    pub name: String,
    /// 일봉을 돌려준 별칭 (정규 심볼이면 `None`)
    pub variant: Option<String>,
    /// 원시 일봉 (비어 있으면 저장하지 않음)
    pub bars: Vec<RawBar>,
    /// 실패한 후보와 사유
    pub failures: Vec<(String, RetryError)>,
    /// 데드라인으로 조회를 중단했는지
    pub deadline_hit: bool,
}

impl Resolution {
    /// 실패가 모두 "데이터 없음"인지 확인.
    pub fn only_no_data(&self) -> bool {
        self.failures.iter().all(|(_, e)| e.is_no_data())
    }

    /// 마지막 실패 사유.
    pub fn last_failure(&self) -> Option<String> {
        self.failures
            .last()
            .map(|(candidate, e)| format!("{}: {}", candidate, e))
    }
}

/// 정규 심볼 → 별칭 순서로 조회하는 해석기.
#[derive(Clone)]
pub struct AliasResolver {
    source: Arc<dyn QuoteSource>,
    retry: RetryController,
    aliases: Arc<AliasSet>,
}

impl AliasResolver {
    pub fn new(source: Arc<dyn QuoteSource>, retry: RetryController, aliases: Arc<AliasSet>) -> Self {
        Self {
            source,
            retry,
            aliases,
        }
    }

    /// 종목의 일봉을 조회합니다.
    pub async fn resolve(
        &self,
        symbol: &str,
        window: &FetchWindow,
        cancel: &CancellationToken,
    ) -> Resolution {
        let candidates = self.aliases.candidates(symbol);
        if candidates.len() > 1 {
            debug!(symbol, candidates = candidates.len(), "별칭 후보 포함 조회");
        }

        let hit = first_non_empty(&candidates, cancel, |candidate| {
            let source = self.source.clone();
            let retry = self.retry.clone();
            let cancel = cancel.clone();
            let window = window.for_symbol(candidate.clone());
            async move {
                retry
                    .attempt(&candidate, &cancel, || source.fetch(&window))
                    .await
            }
        })
        .await;

        match hit.winner {
            Some((candidate, series)) => {
                let variant = (candidate != symbol).then_some(candidate);
                if let Some(alias) = &variant {
                    info!(symbol, alias = %alias, "별칭으로 데이터 조회 성공");
                }
                Resolution {
                    name: series.display_name.unwrap_or_else(|| symbol.to_string()),
                    variant,
                    bars: series.bars,
                    failures: hit.failures,
                    deadline_hit: hit.deadline_hit,
                }
            }
            None => Resolution {
                name: symbol.to_string(),
                variant: None,
                bars: Vec::new(),
                failures: hit.failures,
                deadline_hit: hit.deadline_hit,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use quotesync_provider::FetchError;
    use std::sync::Mutex;

    fn candidates(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn series(symbol: &str) -> FetchedSeries {
        FetchedSeries {
            symbol: symbol.to_string(),
            display_name: Some(format!("{} name", symbol)),
            bars: vec![RawBar::new(
                NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
                1.0,
                1.0,
                1.0,
                1.0,
                10,
            )],
        }
    }

    #[tokio::test]
    async fn test_stops_at_first_non_empty() {
        let tried = &Mutex::new(Vec::new());
        let cancel = CancellationToken::new();

        let hit = first_non_empty(
            &candidates(&["TRPL4", "TRPL4F.SA", "ISA.SA", "TRPL3.SA"]),
            &cancel,
            move |c| async move {
                tried.lock().unwrap().push(c.clone());
                if c == "ISA.SA" {
                    Ok(series(&c))
                } else {
                    Err(RetryError::NoData { attempts: 3 })
                }
            },
        )
        .await;

        assert_eq!(hit.winner.unwrap().0, "ISA.SA");
        assert_eq!(hit.failures.len(), 2);
        assert_eq!(*tried.lock().unwrap(), vec!["TRPL4", "TRPL4F.SA", "ISA.SA"]);
    }

    #[tokio::test]
    async fn test_records_every_failure() {
        let cancel = CancellationToken::new();

        let hit = first_non_empty(&candidates(&["VBBR3", "BRDT3.SA"]), &cancel, |c| async move {
            if c == "VBBR3" {
                Err(RetryError::NoData { attempts: 3 })
            } else {
                Err(RetryError::Exhausted {
                    attempts: 3,
                    last: FetchError::Network("reset".into()),
                })
            }
        })
        .await;

        assert!(hit.winner.is_none());
        assert!(!hit.deadline_hit);
        assert_eq!(hit.failures[0].0, "VBBR3");
        assert!(matches!(hit.failures[1].1, RetryError::Exhausted { .. }));
    }

    #[tokio::test]
    async fn test_skips_remaining_after_deadline() {
        let tried = &Mutex::new(Vec::new());
        let cancel = CancellationToken::new();
        let trigger = &cancel;

        let hit = first_non_empty(
            &candidates(&["BRPR3", "BRPR11.SA"]),
            &cancel,
            move |c| async move {
                tried.lock().unwrap().push(c);
                trigger.cancel();
                Err(RetryError::NoData { attempts: 1 })
            },
        )
        .await;

        assert!(hit.deadline_hit);
        assert!(hit.winner.is_none());
        assert_eq!(*tried.lock().unwrap(), vec!["BRPR3"]);
    }

    #[tokio::test]
    async fn test_resolution_failure_summary() {
        let resolution = Resolution {
            name: "AAA3".into(),
            variant: None,
            bars: Vec::new(),
            failures: vec![("AAA3".into(), RetryError::NoData { attempts: 3 })],
            deadline_hit: false,
        };
        assert!(resolution.only_no_data());
        assert_eq!(
            resolution.last_failure().unwrap(),
            "AAA3: no data after 3 attempts"
        );
    }
}
