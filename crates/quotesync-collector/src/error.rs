//! 에러 타입 정의.

use quotesync_core::AliasError;
use quotesync_provider::FetchError;
use quotesync_store::StoreError;
use thiserror::Error;

/// Collector 에러 타입.
///
/// 실행 전체를 중단시키는 에러만 표현합니다. 종목 단위 실패는
/// [`crate::modules::SymbolOutcome`]으로 기록되고 실행은 계속됩니다.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// 설정 에러
    #[error("Configuration error: {0}")]
    Config(String),

    /// 저장소 에러 (연결, 마이그레이션)
    #[error(transparent)]
    Store(#[from] StoreError),

    /// 별칭 설정 검증 실패
    #[error("Alias configuration error: {0}")]
    Aliases(#[from] AliasError),

    /// 제공자 클라이언트 생성 실패
    #[error("Provider error: {0}")]
    Provider(#[from] FetchError),

    /// 파일 입출력 에러
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, CollectorError>;
