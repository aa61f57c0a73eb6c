//! Quotesync 일봉 수집기.
//!
//! 이 crate는 종목 목록의 일봉을 증분 동기화하는 바이너리를 제공합니다:
//! - 환경변수 기반 설정
//! - 마지막 저장 일자 기반 수집 구간 계산
//! - 별칭 대체 조회
//! - 배치 + 워커 풀 스케줄링과 전역 데드라인
//! - 실행 요약 로그

pub mod config;
pub mod error;
pub mod modules;
pub mod runner;
pub mod stats;
pub mod universe;

pub use config::CollectorConfig;
pub use error::{CollectorError, Result};
pub use runner::SyncRunner;
pub use stats::RunSummary;
