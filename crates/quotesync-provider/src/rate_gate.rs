//! 프로세스 전역 요청 간격 제한.
//!
//! 마지막 요청 시각은 모든 워커가 공유하는 유일한 가변 상태이며,
//! 뮤텍스 안에서만 읽고 갱신합니다. 대기 중에도 락을 쥐고 있으므로
//! 두 워커가 각자 간격을 계산해 동시에 요청하는 일이 없습니다.

use std::time::Duration;

use rand::Rng;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// 요청 간 최소 간격 게이트.
#[derive(Debug)]
pub struct RateGate {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
    jitter_min: Duration,
    jitter_max: Duration,
}

impl RateGate {
    /// 기본 지터(0.5~2초)로 게이트를 생성합니다.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval,
            jitter_min: Duration::from_millis(500),
            jitter_max: Duration::from_millis(2000),
        }
    }

    /// 대기 시 더해지는 지터 범위를 지정합니다.
    pub fn with_jitter(mut self, min: Duration, max: Duration) -> Self {
        self.jitter_min = min;
        self.jitter_max = max;
        self
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// 요청 허가를 받을 때까지 대기합니다.
    ///
    /// 데드라인이 이미 지났거나 대기 중에 지나면 즉시 `false`를 반환합니다.
    pub async fn acquire(&self, cancel: &CancellationToken) -> bool {
        if cancel.is_cancelled() {
            return false;
        }

        let mut last = tokio::select! {
            guard = self.last_request.lock() => guard,
            _ = cancel.cancelled() => return false,
        };

        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed + self.jitter();
                debug!(wait_ms = wait.as_millis() as u64, "요청 간격 대기");
                tokio::select! {
                    _ = tokio::time::sleep(wait) => {}
                    _ = cancel.cancelled() => return false,
                }
            }
        }

        *last = Some(Instant::now());
        true
    }

    fn jitter(&self) -> Duration {
        if self.jitter_max <= self.jitter_min {
            self.jitter_min
        } else {
            rand::thread_rng().gen_range(self.jitter_min..self.jitter_max)
        }
    }
}
