//! # Quotesync Core
//!
//! 일봉 동기화 파이프라인 전반에서 사용하는 도메인 타입을 제공합니다:
//! - 제공자 원시 일봉(`RawBar`)과 저장 가능한 일봉(`PriceBar`)
//! - 저장 전 유효성 필터
//! - 증분 수집 구간(`FetchWindow`) 계산
//! - 심볼 별칭 집합(`AliasSet`)
//! - 로깅 인프라

pub mod alias;
pub mod error;
pub mod logging;
pub mod types;
pub mod window;

pub use alias::AliasSet;
pub use error::*;
pub use logging::*;
pub use types::*;
pub use window::*;
