//! # PostgreSQL source of record
//!
//! Maps the relational model in `migrations/` to the `domains` entities.
//! Every port is implemented on [`PgStore`], which is a cheap clone of the
//! connection pool.

mod matches;
mod swipes;
mod users;

use domains::{DomainError, Gender, PairKey, UserId};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;
use uuid::Uuid;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Opens a pool and brings the schema up to date.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, DomainError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(db_error)?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|err| DomainError::storage(format!("migration failed: {err}")))?;
        info!(max_connections, "postgres pool ready");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

pub(crate) fn db_error(err: sqlx::Error) -> DomainError {
    DomainError::storage(err.to_string())
}

pub(crate) fn parse_gender(raw: &str) -> Result<Gender, DomainError> {
    Gender::parse(raw).ok_or_else(|| DomainError::storage(format!("unknown gender '{raw}' in users table")))
}

pub(crate) fn pair_from_row(low: Uuid, high: Uuid) -> Result<PairKey, DomainError> {
    PairKey::new(UserId(low), UserId(high))
        .map_err(|err| DomainError::storage(format!("corrupt pair ({low}, {high}): {err}")))
}
