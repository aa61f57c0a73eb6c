//! 지수 백오프 재시도.
//!
//! # 시도 흐름
//!
//! ```text
//! RateGate 통과 ──> fetch ──[성공 + 일봉 있음]──> Ok
//!                     │
//!              [재시도 가능 실패]
//!                     ↓
//!       base * 2^(k-1) * U[0.5, 1.5) 대기 ──> 다음 시도
//! ```
//!
//! 총 시도 횟수는 `1 + max_retries`입니다. 데드라인이 지나면 남은 시도와 대기를
//! 모두 건너뜁니다.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{FetchError, FetchedSeries, RateGate, RetryError};

/// 지수 백오프 계산기.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
}

impl Backoff {
    /// 대기 시간에 곱해지는 지터 계수 하한 (포함).
    pub const JITTER_MIN: f64 = 0.5;
    /// 지터 계수 상한 (미포함).
    pub const JITTER_MAX: f64 = 1.5;

    pub fn new(base: Duration) -> Self {
        Self { base }
    }

    pub fn base(&self) -> Duration {
        self.base
    }

    /// 지터 없는 k번째 재시도 대기 시간 (k는 1부터).
    pub fn expected(&self, k: u32) -> Duration {
        let exp = k.saturating_sub(1).min(31);
        self.base.saturating_mul(1u32 << exp)
    }

    /// 지정한 지터 계수를 적용한 대기 시간.
    pub fn delay_with(&self, k: u32, factor: f64) -> Duration {
        self.expected(k).mul_f64(factor)
    }

    /// 무작위 지터를 적용한 k번째 재시도 대기 시간.
    pub fn delay(&self, k: u32) -> Duration {
        let factor = rand::thread_rng().gen_range(Self::JITTER_MIN..Self::JITTER_MAX);
        self.delay_with(k, factor)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

/// 요청 간격 제한과 재시도를 묶은 컨트롤러.
///
/// 모든 워커가 같은 [`RateGate`]를 공유해야 프로세스 전체 요청 간격이 지켜집니다.
#[derive(Debug, Clone)]
pub struct RetryController {
    gate: Arc<RateGate>,
    backoff: Backoff,
    max_retries: u32,
}

impl RetryController {
    pub fn new(gate: Arc<RateGate>, backoff: Backoff, max_retries: u32) -> Self {
        Self {
            gate,
            backoff,
            max_retries,
        }
    }

    pub fn gate(&self) -> &Arc<RateGate> {
        &self.gate
    }

    /// 최대 시도 횟수 (첫 시도 포함).
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// `fetch`를 재시도 정책에 따라 실행합니다.
    ///
    /// 일봉이 하나도 없는 성공 응답은 `Empty` 실패로 취급합니다.
    pub async fn attempt<F, Fut>(
        &self,
        symbol: &str,
        cancel: &CancellationToken,
        mut fetch: F,
    ) -> Result<FetchedSeries, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<FetchedSeries, FetchError>>,
    {
        let max_attempts = self.max_attempts();
        let mut attempts = 0u32;
        let mut last_error: Option<FetchError> = None;

        while attempts < max_attempts {
            if !self.gate.acquire(cancel).await {
                debug!(symbol, attempts, "데드라인 경과, 요청 생략");
                return Err(RetryError::DeadlineExceeded { attempts });
            }

            attempts += 1;
            let error = match fetch().await {
                Ok(series) if !series.is_empty() => return Ok(series),
                Ok(series) => FetchError::Empty(format!("{}: 일봉 없음", series.symbol)),
                Err(e) if !e.is_retryable() => return Err(RetryError::Fatal(e)),
                Err(e) => e,
            };

            warn!(
                symbol,
                attempt = attempts,
                max_attempts,
                kind = %error.kind(),
                error = %error,
                "조회 실패"
            );
            last_error = Some(error);

            if attempts >= max_attempts {
                break;
            }
            if cancel.is_cancelled() {
                return Err(RetryError::DeadlineExceeded { attempts });
            }

            let delay = self.backoff.delay(attempts);
            debug!(symbol, delay_ms = delay.as_millis() as u64, "재시도 대기");
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => return Err(RetryError::DeadlineExceeded { attempts }),
            }
        }

        match last_error {
            Some(FetchError::Empty(_)) | None => Err(RetryError::NoData { attempts }),
            Some(last) => Err(RetryError::Exhausted { attempts, last }),
        }
    }
}
