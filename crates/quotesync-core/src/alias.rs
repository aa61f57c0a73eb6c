//! 심볼 별칭 집합.
//!
//! 종목명이 바뀌었거나 제공자가 다른 식별자로만 데이터를 내려주는 경우를 위해
//! 정규 심볼 → 대체 식별자 목록을 보관합니다. 로드 시점에 검증되며 불변입니다.

use std::collections::{BTreeMap, HashSet};

use crate::error::AliasError;
use crate::types::provider_symbol;

/// 검증된 불변 별칭 집합.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasSet {
    entries: BTreeMap<String, Vec<String>>,
}

impl AliasSet {
    /// 별칭 없는 빈 집합.
    pub fn empty() -> Self {
        Self::default()
    }

    /// 별칭 항목을 검증해 집합을 생성합니다.
    ///
    /// 별칭이 정규 심볼 자신을 가리키는지는 제공자 접미사(`suffix`)를 붙인 형태로
    /// 비교합니다 ("TRPL4"와 "TRPL4.SA"는 같은 요청).
    pub fn new<I, S, A>(entries: I, suffix: &str) -> Result<Self, AliasError>
    where
        I: IntoIterator<Item = (S, Vec<A>)>,
        S: Into<String>,
        A: Into<String>,
    {
        let mut validated = BTreeMap::new();

        for (symbol, aliases) in entries {
            let symbol: String = symbol.into().trim().to_string();
            if symbol.is_empty() {
                return Err(AliasError::EmptySymbol);
            }
            if aliases.is_empty() {
                return Err(AliasError::EmptyList { symbol });
            }

            let canonical = provider_symbol(&symbol, suffix);
            let mut seen = HashSet::new();
            let mut list = Vec::with_capacity(aliases.len());

            for alias in aliases {
                let alias: String = alias.into().trim().to_string();
                if alias.is_empty() {
                    return Err(AliasError::EmptyAlias { symbol });
                }
                if alias == symbol || provider_symbol(&alias, suffix) == canonical {
                    return Err(AliasError::SelfAlias { symbol, alias });
                }
                if !seen.insert(provider_symbol(&alias, suffix)) {
                    return Err(AliasError::DuplicateAlias { symbol, alias });
                }
                list.push(alias);
            }

            validated.insert(symbol, list);
        }

        Ok(Self { entries: validated })
    }

    /// 심볼의 별칭 목록 (없으면 빈 슬라이스).
    pub fn aliases_for(&self, symbol: &str) -> &[String] {
        self.entries.get(symbol).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 시도 순서대로 후보 식별자를 반환합니다: 정규 심볼, 그 다음 별칭들.
    pub fn candidates(&self, symbol: &str) -> Vec<String> {
        std::iter::once(symbol.to_string())
            .chain(self.aliases_for(symbol).iter().cloned())
            .collect()
    }

    /// 별칭이 설정된 심볼 수.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 비어 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
