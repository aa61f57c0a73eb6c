//! 종목별 수집 구간 결정.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use quotesync_core::{compute_window, WindowDecision};
use quotesync_store::{PriceStore, StoreError};

/// 현재 시각 공급자.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// 시스템 시계.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 고정 시계 (테스트, 재실행용).
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// 저장소의 마지막 일자와 현재 시각으로 수집 구간을 결정합니다.
///
/// 네트워크 요청은 하지 않습니다.
#[derive(Clone)]
pub struct WindowCalculator {
    store: Arc<dyn PriceStore>,
    clock: Arc<dyn Clock>,
    timezone: Tz,
    floor: NaiveDate,
}

impl WindowCalculator {
    pub fn new(
        store: Arc<dyn PriceStore>,
        clock: Arc<dyn Clock>,
        timezone: Tz,
        floor: NaiveDate,
    ) -> Self {
        Self {
            store,
            clock,
            timezone,
            floor,
        }
    }

    /// 종목의 수집 구간.
    pub async fn decide(&self, symbol: &str) -> Result<WindowDecision, StoreError> {
        let last = self.store.last_bar_date(symbol).await?;
        let now = self.clock.now().with_timezone(&self.timezone);
        Ok(compute_window(symbol, last, &now, self.floor))
    }
}
