//! 실행 통계 구조체.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::modules::SymbolOutcome;

/// 한 번의 동기화 실행 요약
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// 대상 종목 수
    pub total: usize,
    /// 이미 최신 (요청 생략)
    pub current: usize,
    /// 저장 완료
    pub updated: usize,
    /// 모든 후보에서 데이터 없음
    pub no_data: usize,
    /// 실패
    pub failed: usize,
    /// 데드라인으로 중단
    pub abandoned: usize,
    /// 데드라인 이후 배치가 시작되지 않아 처리되지 않은 종목 수
    pub not_scheduled: usize,
    /// 시작되지 않은 종목 목록
    pub unscheduled: Vec<String>,
    /// 저장된 총 일봉 수
    pub rows_written: usize,
    /// 데드라인 도달 여부
    pub deadline_reached: bool,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl RunSummary {
    /// 새 요약 생성
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    /// 종목 결과 반영
    pub fn record(&mut self, outcome: &SymbolOutcome) {
        match outcome {
            SymbolOutcome::Current { .. } => self.current += 1,
            SymbolOutcome::Updated { rows, .. } => {
                self.updated += 1;
                self.rows_written += rows;
            }
            SymbolOutcome::NoData { .. } => self.no_data += 1,
            SymbolOutcome::Failed { .. } => self.failed += 1,
            SymbolOutcome::Abandoned { .. } => self.abandoned += 1,
        }
    }

    /// 최종 상태에 도달한 종목 수
    pub fn processed(&self) -> usize {
        self.current + self.updated + self.no_data + self.failed + self.abandoned
    }

    /// 성공률 계산 (%). 이미 최신인 종목도 성공으로 봅니다.
    pub fn success_rate(&self) -> f64 {
        let processed = self.processed();
        if processed == 0 {
            0.0
        } else {
            ((self.current + self.updated) as f64 / processed as f64) * 100.0
        }
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            total = self.total,
            current = self.current,
            updated = self.updated,
            no_data = self.no_data,
            failed = self.failed,
            abandoned = self.abandoned,
            not_scheduled = self.not_scheduled,
            rows_written = self.rows_written,
            deadline_reached = self.deadline_reached,
            success_rate = format!("{:.1}%", self.success_rate()),
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "동기화 완료"
        );
    }
}
