//! 종목(Instrument) 정의와 심볼 정규화.

use serde::{Deserialize, Serialize};

/// 동기화 대상 종목.
///
/// `symbol`이 자연 키이며, `name`은 동기화마다 마지막 값으로 갱신됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    /// 저장소 식별자
    pub id: i64,
    /// 정규 심볼 (예: "PETR4")
    pub symbol: String,
    /// 표시 이름
    pub name: String,
}

/// 유니버스 입력 심볼을 정규화합니다.
///
/// 앞뒤 공백을 제거하고, 빈 문자열이면 `None`을 반환합니다.
pub fn normalize_symbol(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// 제공자 요청용 심볼로 변환합니다.
///
/// 이미 시장 접미사(`.`)가 붙은 심볼은 그대로 사용하고,
/// 그렇지 않으면 `suffix`를 붙입니다 (예: "PETR4" + ".SA" → "PETR4.SA").
pub fn provider_symbol(symbol: &str, suffix: &str) -> String {
    let symbol = symbol.trim();
    if symbol.contains('.') || suffix.is_empty() {
        symbol.to_string()
    } else {
        format!("{}{}", symbol, suffix)
    }
}
