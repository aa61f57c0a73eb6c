//! 증분 수집 구간 계산.
//!
//! 종목의 마지막 저장 일자를 기준으로 제공자에 요청할 최소 구간을 계산합니다.
//!
//! ```text
//! 마지막 일자 없음      → [floor, now)
//! 마지막 일자 >= 오늘   → AlreadyCurrent (네트워크 호출 없음)
//! 그 외                 → [마지막 일자 + 1일, now)
//! ```

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// 제공자에 요청할 수집 구간.
///
/// 한 번의 동기화 시도 동안만 사용되고 버려집니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchWindow {
    /// 정규 심볼
    pub symbol: String,
    /// 시작 일자 (마지막 저장 일자 다음 날)
    pub start: NaiveDate,
    /// 시작 일자 0시의 절대 시각 (거래소 시간대 기준)
    pub start_at: DateTime<Utc>,
    /// 종료 시각 (계산 시점)
    pub end: DateTime<Utc>,
}

impl FetchWindow {
    /// 거래소 시간대 기준으로 구간을 생성합니다.
    pub fn new<Tz: TimeZone>(symbol: impl Into<String>, start: NaiveDate, now: &DateTime<Tz>) -> Self {
        Self {
            symbol: symbol.into(),
            start,
            start_at: start_of_day(start, &now.timezone()),
            end: now.with_timezone(&Utc),
        }
    }

    /// 같은 구간을 다른 심볼(별칭)로 복사합니다.
    pub fn for_symbol(&self, symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..self.clone()
        }
    }

    /// 시작이 종료 이후라 요청할 것이 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.start_at >= self.end
    }

    /// 요청 시작 Unix 타임스탬프 (초).
    pub fn period1(&self) -> i64 {
        self.start_at.timestamp()
    }

    /// 요청 종료 Unix 타임스탬프 (초).
    pub fn period2(&self) -> i64 {
        self.end.timestamp()
    }
}

/// 구간 계산 결과.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowDecision {
    /// 수집 필요
    Fetch(FetchWindow),
    /// 이미 최신 (네트워크 호출 생략)
    AlreadyCurrent { last: Option<NaiveDate> },
}

/// 마지막 저장 일자로부터 수집 구간을 계산합니다.
///
/// # Arguments
/// * `symbol` - 정규 심볼
/// * `last` - 마지막 저장 일자 (한 번도 동기화되지 않았으면 `None`)
/// * `now` - 현재 시각 (거래소 시간대)
/// * `floor` - 최초 수집 시작 일자
pub fn compute_window<Tz: TimeZone>(
    symbol: &str,
    last: Option<NaiveDate>,
    now: &DateTime<Tz>,
    floor: NaiveDate,
) -> WindowDecision {
    let today = now.date_naive();

    let start = match last {
        Some(last) if last >= today => return WindowDecision::AlreadyCurrent { last: Some(last) },
        Some(last) => last + Duration::days(1),
        None => floor,
    };

    let window = FetchWindow::new(symbol, start, now);
    if window.is_empty() {
        WindowDecision::AlreadyCurrent { last }
    } else {
        WindowDecision::Fetch(window)
    }
}

/// 주어진 시간대에서 날짜의 0시를 UTC 시각으로 변환합니다.
///
/// 0시가 존재하지 않는 날(DST 전환)은 UTC 0시로 대체합니다.
fn start_of_day<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| midnight.and_utc())
}
