//! 코어 도메인 에러 타입.

use thiserror::Error;

/// 별칭 설정 검증 에러.
///
/// 별칭 집합은 로드 시점에 한 번 검증되며, 이후에는 불변입니다.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AliasError {
    /// 빈 심볼 키
    #[error("별칭 설정에 빈 심볼이 있습니다")]
    EmptySymbol,

    /// 별칭 목록이 비어 있음
    #[error("{symbol}: 별칭 목록이 비어 있습니다")]
    EmptyList { symbol: String },

    /// 빈 별칭 문자열
    #[error("{symbol}: 빈 별칭이 포함되어 있습니다")]
    EmptyAlias { symbol: String },

    /// 자기 자신을 가리키는 별칭
    #[error("{symbol}: 별칭 {alias}이(가) 원래 심볼과 같습니다")]
    SelfAlias { symbol: String, alias: String },

    /// 같은 목록 안의 중복 별칭
    #[error("{symbol}: 별칭 {alias}이(가) 중복되었습니다")]
    DuplicateAlias { symbol: String, alias: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_error_message_names_symbol() {
        let err = AliasError::SelfAlias {
            symbol: "VBBR3".to_string(),
            alias: "VBBR3.SA".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("VBBR3"));
        assert!(msg.contains("VBBR3.SA"));
    }
}
