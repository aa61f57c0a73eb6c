//! 시세 제공자 연동.
//!
//! 이 crate는 다음을 제공합니다:
//! - `QuoteSource` 트레잇과 Yahoo Finance chart API 구현
//! - 요청마다 바뀌는 클라이언트 식별자(User-Agent)
//! - 프로세스 전역 요청 간격 제한(`RateGate`)
//! - 지수 백오프 + 지터 재시도(`RetryController`)

pub mod error;
pub mod identity;
pub mod rate_gate;
pub mod retry;
pub mod source;
pub mod yahoo;

pub use error::{FetchError, FetchErrorKind, RetryError};
pub use identity::{ClientIdentity, IdentityPool};
pub use rate_gate::RateGate;
pub use retry::{Backoff, RetryController};
pub use source::{FetchedSeries, QuoteSource};
pub use yahoo::{YahooChartClient, YahooConfig};
