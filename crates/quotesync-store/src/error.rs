//! 저장소 에러 타입.

use thiserror::Error;

/// 저장소 관련 에러.
#[derive(Debug, Error)]
pub enum StoreError {
    /// 데이터베이스 연결 에러
    #[error("Database connection error: {0}")]
    Connection(String),

    /// 쿼리 실행 에러
    #[error("Query error: {0}")]
    Query(String),

    /// 마이그레이션 에러
    #[error("Migration error: {0}")]
    Migration(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Connection(err.to_string())
            }
            sqlx::Error::Database(db_err) => StoreError::Query(db_err.message().to_string()),
            _ => StoreError::Query(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::Migration(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
