//! PostgreSQL 저장소.
//!
//! 종목 하나의 저장은 하나의 트랜잭션입니다:
//!
//! ```text
//! BEGIN
//!   INSERT INTO instruments ... ON CONFLICT (symbol) DO UPDATE  → id
//!   INSERT INTO price_bars SELECT ... FROM UNNEST(...)          (500행 단위)
//!     ON CONFLICT (instrument_id, date) DO UPDATE
//! COMMIT
//! ```
//!
//! 어느 단계든 실패하면 트랜잭션이 커밋 없이 drop되어 롤백됩니다.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use quotesync_core::{valid_bars, RawBar};
use rust_decimal::Decimal;
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions};
use tracing::{debug, info, instrument};

use crate::error::{Result, StoreError};
use crate::{PersistReport, PriceStore};

/// UNNEST 일괄 삽입 단위.
const BULK_CHUNK: usize = 500;

/// 연결 풀 설정.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// 최대 연결 수 (워커 수 + 1 권장)
    pub max_connections: u32,
    /// 최소 유지 연결 수
    pub min_connections: u32,
    /// 연결 획득 타임아웃 (초)
    pub acquire_timeout_secs: u64,
    /// 유휴 연결 타임아웃 (초)
    pub idle_timeout_secs: u64,
}

impl StoreConfig {
    /// 워커 수에 맞춘 풀 설정. 워커마다 연결 하나씩, 조회용 하나를 더 둡니다.
    pub fn for_workers(workers: usize) -> Self {
        Self {
            max_connections: workers.saturating_add(1).min(u32::MAX as usize) as u32,
            ..Default::default()
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_connections: 4,
            min_connections: 1,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,
        }
    }
}

/// PostgreSQL 일봉 저장소.
#[derive(Clone)]
pub struct PgPriceStore {
    pool: PgPool,
}

impl PgPriceStore {
    /// 연결 풀을 생성합니다.
    pub async fn connect(url: &str, config: &StoreConfig) -> Result<Self> {
        info!(max_connections = config.max_connections, "데이터베이스 연결 중");

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .connect(url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        info!("데이터베이스 연결 완료");
        Ok(Self { pool })
    }

    /// 기존 연결 풀을 재사용합니다.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 내장 마이그레이션을 실행합니다.
    pub async fn migrate(&self) -> Result<()> {
        info!("마이그레이션 실행 중");
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        info!("마이그레이션 완료");
        Ok(())
    }

    /// 종목을 upsert하고 식별자를 반환합니다. 이미 있으면 이름만 갱신합니다.
    pub async fn upsert_instrument(conn: &mut PgConnection, symbol: &str, name: &str) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO instruments (symbol, name)
            VALUES ($1, $2)
            ON CONFLICT (symbol) DO UPDATE SET
                name = EXCLUDED.name
            RETURNING id
            "#,
        )
        .bind(symbol)
        .bind(name)
        .fetch_one(&mut *conn)
        .await?;

        Ok(id)
    }

    /// 유효한 일봉만 골라 upsert하고 기록한 행 수를 반환합니다.
    pub async fn upsert_bars(
        conn: &mut PgConnection,
        instrument_id: i64,
        bars: &[RawBar],
    ) -> Result<usize> {
        let valid = valid_bars(bars);
        if valid.is_empty() {
            return Ok(0);
        }

        let mut written = 0;

        // UNNEST 패턴으로 일괄 삽입
        for chunk in valid.chunks(BULK_CHUNK) {
            let dates: Vec<NaiveDate> = chunk.iter().map(|b| b.date).collect();
            let opens: Vec<Decimal> = chunk.iter().map(|b| b.open).collect();
            let highs: Vec<Decimal> = chunk.iter().map(|b| b.high).collect();
            let lows: Vec<Decimal> = chunk.iter().map(|b| b.low).collect();
            let closes: Vec<Decimal> = chunk.iter().map(|b| b.close).collect();
            let volumes: Vec<i64> = chunk.iter().map(|b| b.volume).collect();
            let min_prices: Vec<Decimal> = chunk.iter().map(|b| b.min_price).collect();
            let max_prices: Vec<Decimal> = chunk.iter().map(|b| b.max_price).collect();

            let result = sqlx::query(
                r#"
                INSERT INTO price_bars
                    (instrument_id, date, open, high, low, close, volume, min_price, max_price)
                SELECT $1, t.* FROM UNNEST(
                    $2::date[], $3::numeric[], $4::numeric[], $5::numeric[], $6::numeric[],
                    $7::bigint[], $8::numeric[], $9::numeric[]
                ) AS t(date, open, high, low, close, volume, min_price, max_price)
                ON CONFLICT (instrument_id, date) DO UPDATE SET
                    open = EXCLUDED.open,
                    high = EXCLUDED.high,
                    low = EXCLUDED.low,
                    close = EXCLUDED.close,
                    volume = EXCLUDED.volume,
                    min_price = EXCLUDED.min_price,
                    max_price = EXCLUDED.max_price
                "#,
            )
            .bind(instrument_id)
            .bind(&dates)
            .bind(&opens)
            .bind(&highs)
            .bind(&lows)
            .bind(&closes)
            .bind(&volumes)
            .bind(&min_prices)
            .bind(&max_prices)
            .execute(&mut *conn)
            .await?;

            written += result.rows_affected() as usize;
        }

        debug!(instrument_id, written, "일봉 upsert");
        Ok(written)
    }
}

#[async_trait]
impl PriceStore for PgPriceStore {
    #[instrument(skip(self))]
    async fn last_bar_date(&self, symbol: &str) -> Result<Option<NaiveDate>> {
        let last: Option<NaiveDate> = sqlx::query_scalar(
            r#"
            SELECT MAX(pb.date)
            FROM price_bars pb
            JOIN instruments i ON i.id = pb.instrument_id
            WHERE i.symbol = $1
            "#,
        )
        .bind(symbol)
        .fetch_one(&self.pool)
        .await?;

        Ok(last)
    }

    #[instrument(skip(self, bars), fields(count = bars.len()))]
    async fn persist_instrument(
        &self,
        symbol: &str,
        name: &str,
        bars: &[RawBar],
    ) -> Result<PersistReport> {
        let mut tx = self.pool.begin().await?;

        let instrument_id = Self::upsert_instrument(&mut *tx, symbol, name).await?;
        let written = Self::upsert_bars(&mut *tx, instrument_id, bars).await?;

        tx.commit().await?;

        Ok(PersistReport {
            instrument_id,
            written,
        })
    }
}
