//! 메모리 저장소.
//!
//! PostgreSQL 구현과 같은 의미를 가지며, 종목 단위 저장은 스테이징 후 한 번에 반영합니다.
//! 테스트와 DB 없는 드라이런에 사용합니다.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use quotesync_core::{valid_bars, Instrument, PriceBar, RawBar};

use crate::error::{Result, StoreError};
use crate::{PersistReport, PriceStore};

#[derive(Debug, Default)]
struct MemoryState {
    instruments: BTreeMap<String, Instrument>,
    bars: BTreeMap<i64, BTreeMap<NaiveDate, PriceBar>>,
    next_id: i64,
    fail_bars_for: HashSet<String>,
    persist_calls: usize,
}

/// 메모리 일봉 저장소.
#[derive(Debug, Default)]
pub struct MemoryPriceStore {
    state: Mutex<MemoryState>,
}

impl MemoryPriceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 이미 동기화된 종목을 미리 채워 넣습니다.
    pub fn seed(&self, symbol: &str, name: &str, bars: &[RawBar]) -> Result<PersistReport> {
        let mut state = self.lock()?;
        Ok(commit(&mut state, symbol, name, valid_bars(bars)))
    }

    /// 이후 `symbol`의 일봉 기록이 실패하도록 설정합니다 (롤백 확인용).
    pub fn fail_bars_for(&self, symbol: &str) -> Result<()> {
        self.lock()?.fail_bars_for.insert(symbol.to_string());
        Ok(())
    }

    /// 저장된 종목.
    pub fn instrument(&self, symbol: &str) -> Option<Instrument> {
        self.lock().ok()?.instruments.get(symbol).cloned()
    }

    /// 저장된 종목 수.
    pub fn instrument_count(&self) -> usize {
        self.lock().map(|s| s.instruments.len()).unwrap_or(0)
    }

    /// 종목의 저장된 일봉 (날짜순).
    pub fn bars(&self, symbol: &str) -> Vec<PriceBar> {
        let Ok(state) = self.lock() else {
            return Vec::new();
        };
        state
            .instruments
            .get(symbol)
            .and_then(|inst| state.bars.get(&inst.id))
            .map(|bars| bars.values().cloned().collect())
            .unwrap_or_default()
    }

    /// `persist_instrument` 호출 횟수 (실패 포함).
    pub fn persist_calls(&self) -> usize {
        self.lock().map(|s| s.persist_calls).unwrap_or(0)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|e| StoreError::Connection(format!("memory store poisoned: {}", e)))
    }
}

fn commit(state: &mut MemoryState, symbol: &str, name: &str, valid: Vec<PriceBar>) -> PersistReport {
    let instrument_id = match state.instruments.get_mut(symbol) {
        Some(existing) => {
            existing.name = name.to_string();
            existing.id
        }
        None => {
            state.next_id += 1;
            let id = state.next_id;
            state.instruments.insert(
                symbol.to_string(),
                Instrument {
                    id,
                    symbol: symbol.to_string(),
                    name: name.to_string(),
                },
            );
            id
        }
    };

    let written = valid.len();
    let rows = state.bars.entry(instrument_id).or_default();
    for bar in valid {
        rows.insert(bar.date, bar);
    }

    PersistReport {
        instrument_id,
        written,
    }
}

#[async_trait]
impl PriceStore for MemoryPriceStore {
    async fn last_bar_date(&self, symbol: &str) -> Result<Option<NaiveDate>> {
        let state = self.lock()?;
        Ok(state
            .instruments
            .get(symbol)
            .and_then(|inst| state.bars.get(&inst.id))
            .and_then(|bars| bars.keys().next_back().copied()))
    }

    async fn persist_instrument(
        &self,
        symbol: &str,
        name: &str,
        bars: &[RawBar],
    ) -> Result<PersistReport> {
        let valid = valid_bars(bars);
        let mut state = self.lock()?;
        state.persist_calls += 1;

        // 스테이징 단계 실패는 아무것도 반영하지 않음
        if state.fail_bars_for.contains(symbol) {
            return Err(StoreError::Query(format!("{}: 일봉 기록 실패", symbol)));
        }

        Ok(commit(&mut state, symbol, name, valid))
    }
}
