//! 환경변수 기반 설정 모듈.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use chrono_tz::Tz;
use quotesync_core::AliasSet;
use secrecy::SecretString;
use serde::Deserialize;

use crate::error::CollectorError;
use crate::universe;
use crate::Result;

/// 요청 간 최소 간격 기본값 (초)
const DEFAULT_MIN_REQUEST_INTERVAL_SECS: f64 = 3.0;

/// Collector 전체 설정
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// 데이터베이스 URL
    pub database_url: SecretString,
    /// 실행 스케줄 설정
    pub schedule: ScheduleConfig,
    /// 제공자 요청 설정
    pub fetch: FetchConfig,
    /// 증분 수집 기준 설정
    pub sync: SyncConfig,
    /// 데몬 모드 설정
    pub daemon: DaemonConfig,
}

/// 실행 스케줄 설정
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// 전역 실행 제한 시간 (초)
    pub deadline_secs: u64,
    /// 동시 워커 수
    pub workers: usize,
    /// 배치당 심볼 수
    pub batch_size: usize,
    /// 배치 간 대기 (초)
    pub batch_delay_secs: u64,
}

/// 제공자 요청 설정
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// 요청 간 최소 간격 (초)
    pub min_request_interval_secs: f64,
    /// 첫 시도 이후 재시도 횟수
    pub max_retries: u32,
    /// 백오프 기준 (밀리초)
    pub backoff_base_ms: u64,
    /// 제공자 기본 URL
    pub base_url: String,
    /// 정규 심볼에 붙일 시장 접미사
    pub symbol_suffix: String,
}

/// 증분 수집 기준 설정
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// 한 번도 수집되지 않은 종목의 시작 일자
    pub start_date: NaiveDate,
    /// 거래소 시간대
    pub timezone: Tz,
    /// 별칭 설정 파일 (없으면 내장 별칭 사용)
    pub aliases_file: Option<PathBuf>,
}

/// 데몬 모드 설정
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// 실행 주기 (분 단위)
    pub interval_minutes: u64,
}

/// 별칭 파일 형식.
///
/// ```toml
/// [aliases]
/// VBBR3 = ["BRDT3.SA"]
/// ```
#[derive(Debug, Deserialize)]
struct AliasFile {
    #[serde(default)]
    aliases: BTreeMap<String, Vec<String>>,
}

impl CollectorConfig {
    /// 환경변수에서 설정 로드 (`.env` 포함)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 키 조회 함수로 설정을 구성합니다.
    ///
    /// `DATABASE_URL` 외의 값은 없거나 해석할 수 없으면 기본값을 사용합니다.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                CollectorError::Config("DATABASE_URL 환경변수가 설정되지 않았습니다".to_string())
            })?;

        let parse = |key: &str| lookup(key).map(|v| v.trim().to_string());

        Ok(Self {
            database_url: SecretString::from(database_url),
            schedule: ScheduleConfig {
                deadline_secs: parse_or(parse("SCRIPT_TIMEOUT"), 1500),
                workers: parse_or(parse("MAX_WORKERS"), 3usize).max(1),
                batch_size: parse_or(parse("BATCH_SIZE"), 5usize).max(1),
                batch_delay_secs: parse_or(parse("BATCH_DELAY"), 15),
            },
            fetch: FetchConfig {
                min_request_interval_secs: parse("MIN_REQUEST_INTERVAL")
                    .and_then(|v| v.parse::<f64>().ok())
                    .filter(|secs| Duration::try_from_secs_f64(*secs).is_ok())
                    .unwrap_or(DEFAULT_MIN_REQUEST_INTERVAL_SECS),
                max_retries: parse_or(parse("FETCH_MAX_RETRIES"), 2),
                backoff_base_ms: parse_or(parse("FETCH_BACKOFF_BASE_MS"), 1000),
                base_url: parse("YAHOO_BASE_URL")
                    .filter(|v| !v.is_empty())
                    .unwrap_or_else(|| "https://query1.finance.yahoo.com".to_string()),
                symbol_suffix: parse("SYMBOL_SUFFIX").unwrap_or_else(|| ".SA".to_string()),
            },
            sync: SyncConfig {
                start_date: parse_or(parse("SYNC_START_DATE"), default_start_date()),
                timezone: parse_or(parse("MARKET_TIMEZONE"), chrono_tz::America::Sao_Paulo),
                aliases_file: parse("SYMBOL_ALIASES_FILE")
                    .filter(|v| !v.is_empty())
                    .map(PathBuf::from),
            },
            daemon: DaemonConfig {
                interval_minutes: parse_or(parse("DAEMON_INTERVAL_MINUTES"), 1440),
            },
        })
    }

    /// 별칭 집합을 로드합니다. 파일이 지정되지 않았으면 내장 별칭을 사용합니다.
    pub fn load_aliases(&self) -> Result<AliasSet> {
        match &self.sync.aliases_file {
            Some(path) => load_alias_file(path, &self.fetch.symbol_suffix),
            None => Ok(universe::builtin_aliases(&self.fetch.symbol_suffix)?),
        }
    }
}

impl ScheduleConfig {
    /// 전역 실행 제한 시간
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }

    /// 배치 간 대기
    pub fn batch_delay(&self) -> Duration {
        Duration::from_secs(self.batch_delay_secs)
    }
}

impl FetchConfig {
    /// 요청 간 최소 간격
    pub fn min_request_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.min_request_interval_secs)
            .unwrap_or_else(|_| Duration::from_secs_f64(DEFAULT_MIN_REQUEST_INTERVAL_SECS))
    }

    /// 백오프 기준
    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }
}

impl DaemonConfig {
    /// 실행 주기를 Duration으로 반환
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.max(1).saturating_mul(60))
    }
}

/// TOML 별칭 파일을 읽어 검증합니다.
pub fn load_alias_file(path: &Path, suffix: &str) -> Result<AliasSet> {
    let raw = std::fs::read_to_string(path)?;
    parse_alias_toml(&raw, suffix)
}

fn parse_alias_toml(raw: &str, suffix: &str) -> Result<AliasSet> {
    let file: AliasFile = toml::from_str(raw)
        .map_err(|e| CollectorError::Config(format!("별칭 파일 해석 실패: {}", e)))?;
    Ok(AliasSet::new(file.aliases, suffix)?)
}

fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default()
}

/// 값을 파싱 (없거나 실패 시 기본값 사용)
fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.parse().ok()).unwrap_or(default)
}
