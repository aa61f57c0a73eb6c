//! 제공자 에러 타입.

use thiserror::Error;

/// 단일 요청 실패 분류.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    Network,
    Protocol,
    Empty,
    InvalidSymbol,
}

impl std::fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchErrorKind::Network => write!(f, "network"),
            FetchErrorKind::Protocol => write!(f, "protocol"),
            FetchErrorKind::Empty => write!(f, "empty"),
            FetchErrorKind::InvalidSymbol => write!(f, "invalid_symbol"),
        }
    }
}

/// 단일 제공자 요청 에러.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// 연결 실패, 타임아웃, 2xx가 아닌 응답
    #[error("Network error: {0}")]
    Network(String),

    /// 해석할 수 없는 응답 또는 제공자가 보고한 에러
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// 데이터 없음 (결과 누락, 배열 길이 불일치 등 구조적으로 불완전한 응답 포함)
    #[error("No data: {0}")]
    Empty(String),

    /// 요청할 수 없는 심볼
    #[error("Invalid symbol: {0:?}")]
    InvalidSymbol(String),
}

impl FetchError {
    /// 에러 분류.
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::Network(_) => FetchErrorKind::Network,
            FetchError::Protocol(_) => FetchErrorKind::Protocol,
            FetchError::Empty(_) => FetchErrorKind::Empty,
            FetchError::InvalidSymbol(_) => FetchErrorKind::InvalidSymbol,
        }
    }

    /// 재시도 가능한 에러인지 확인.
    ///
    /// 제공자가 일시적으로 빈 응답을 내려주는 경우가 있어 `Empty`도 재시도합니다.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FetchError::InvalidSymbol(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Protocol(err.to_string())
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Protocol(err.to_string())
    }
}

/// 재시도 컨트롤러의 최종 실패.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetryError {
    /// 모든 시도가 끝났고 마지막 결과가 "데이터 없음" (에러가 아닌 정상 결과)
    #[error("no data after {attempts} attempts")]
    NoData { attempts: u32 },

    /// 재시도 횟수 소진
    #[error("exhausted after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: FetchError },

    /// 전역 데드라인 경과로 남은 재시도를 포기함
    #[error("deadline reached after {attempts} attempts")]
    DeadlineExceeded { attempts: u32 },

    /// 재시도 불가능한 에러
    #[error("fatal: {0}")]
    Fatal(FetchError),
}

impl RetryError {
    /// 실제로 요청한 횟수.
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::NoData { attempts }
            | RetryError::Exhausted { attempts, .. }
            | RetryError::DeadlineExceeded { attempts } => *attempts,
            RetryError::Fatal(_) => 1,
        }
    }

    /// "데이터 없음"으로 끝났는지 확인.
    pub fn is_no_data(&self) -> bool {
        matches!(self, RetryError::NoData { .. })
    }
}
