//! 시세 제공자 트레잇.

use async_trait::async_trait;
use quotesync_core::{FetchWindow, RawBar};

use crate::FetchError;

/// 한 번의 요청으로 받은 정규화된 일봉 묶음.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FetchedSeries {
    /// 요청한 식별자 (정규 심볼 또는 별칭)
    pub symbol: String,
    /// 제공자가 알려준 종목명
    pub display_name: Option<String>,
    /// 날짜순 원시 일봉
    pub bars: Vec<RawBar>,
}

impl FetchedSeries {
    /// 일봉이 하나도 없는지 확인.
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

/// 일봉 시세 제공자.
///
/// 구현체는 요청 한 번과 응답 해석만 담당합니다. 재시도와 요청 간격 제한은
/// [`crate::RetryController`]가 감쌉니다.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// 제공자 이름 (로깅용).
    fn name(&self) -> &str;

    /// `window.symbol`의 `[start, end)` 구간 일봉을 조회합니다.
    async fn fetch(&self, window: &FetchWindow) -> Result<FetchedSeries, FetchError>;
}
