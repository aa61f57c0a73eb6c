//! 종목과 일봉의 멱등 저장.
//!
//! 이 crate는 다음을 제공합니다:
//! - `PriceStore` 트레잇 (마지막 저장 일자 조회, 종목 단위 트랜잭션 저장)
//! - PostgreSQL 구현 (`PgPriceStore`)
//! - 테스트와 드라이런용 메모리 구현 (`MemoryPriceStore`)

pub mod error;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::NaiveDate;
use quotesync_core::RawBar;

pub use error::{Result, StoreError};
pub use memory::MemoryPriceStore;
pub use postgres::{PgPriceStore, StoreConfig};

/// 종목 단위 저장 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistReport {
    /// 종목 식별자
    pub instrument_id: i64,
    /// 유효성 검사를 통과해 기록된 일봉 수
    pub written: usize,
}

/// 일봉 저장소.
///
/// `persist_instrument`는 종목 upsert와 일봉 upsert를 하나의 단위로 처리합니다.
/// 중간에 실패하면 아무것도 남지 않아야 합니다.
#[async_trait]
pub trait PriceStore: Send + Sync {
    /// 종목의 마지막 저장 일자. 한 번도 저장되지 않았으면 `None`.
    async fn last_bar_date(&self, symbol: &str) -> Result<Option<NaiveDate>>;

    /// 종목명을 갱신하고 유효한 일봉을 upsert합니다.
    async fn persist_instrument(
        &self,
        symbol: &str,
        name: &str,
        bars: &[RawBar],
    ) -> Result<PersistReport>;
}
