use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::ports::SwipeStore;
use domains::{
    Decision, DecisionOutcome, DecisionWrite, DomainResult, Match, MatchRecord, PairKey, SwipePair,
    UserId,
};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use super::matches::{MatchRow, MATCH_COLUMNS};
use super::{db_error, pair_from_row, PgStore};

#[derive(Debug, sqlx::FromRow)]
struct PairRow {
    user_low: Uuid,
    user_high: Uuid,
    liked_low: Option<bool>,
    liked_high: Option<bool>,
    superlike_low: bool,
    superlike_high: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PairRow> for SwipePair {
    type Error = domains::DomainError;

    fn try_from(row: PairRow) -> Result<Self, Self::Error> {
        Ok(SwipePair {
            key: pair_from_row(row.user_low, row.user_high)?,
            decision_low: Decision::from_flag(row.liked_low),
            decision_high: Decision::from_flag(row.liked_high),
            superlike_low: row.superlike_low,
            superlike_high: row.superlike_high,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const PAIR_COLUMNS: &str = "user_low, user_high, liked_low, liked_high, superlike_low, \
     superlike_high, created_at, updated_at";

impl PgStore {
    /// Inserts the pair's match unless one already exists, then returns the
    /// surviving row. Runs inside the decision transaction, after the pair
    /// row lock is taken.
    async fn match_for_pair(
        tx: &mut Transaction<'_, Postgres>,
        key: PairKey,
        at: DateTime<Utc>,
    ) -> DomainResult<MatchRecord> {
        let candidate = Match::new(key, at);
        let inserted = sqlx::query(
            r#"
            INSERT INTO matches (id, user_low, user_high, matched_at, status)
            VALUES ($1, $2, $3, $4, 'active')
            ON CONFLICT (user_low, user_high) DO NOTHING
            "#,
        )
        .bind(candidate.id.as_uuid())
        .bind(key.low().as_uuid())
        .bind(key.high().as_uuid())
        .bind(at)
        .execute(&mut **tx)
        .await
        .map_err(db_error)?
        .rows_affected();

        if inserted == 1 {
            return Ok(MatchRecord {
                record: candidate,
                created: true,
            });
        }

        let row = sqlx::query_as::<_, MatchRow>(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches WHERE user_low = $1 AND user_high = $2"
        ))
        .bind(key.low().as_uuid())
        .bind(key.high().as_uuid())
        .fetch_one(&mut **tx)
        .await
        .map_err(db_error)?;

        Ok(MatchRecord {
            record: row.try_into()?,
            created: false,
        })
    }
}

#[async_trait]
impl SwipeStore for PgStore {
    async fn record_decision(&self, write: DecisionWrite) -> DomainResult<DecisionOutcome> {
        let key = write.key;
        let mut tx = self.pool().begin().await.map_err(db_error)?;

        sqlx::query(
            r#"
            INSERT INTO swipe_pairs (user_low, user_high, created_at, updated_at)
            VALUES ($1, $2, $3, $3)
            ON CONFLICT (user_low, user_high) DO NOTHING
            "#,
        )
        .bind(key.low().as_uuid())
        .bind(key.high().as_uuid())
        .bind(write.at)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        // Row lock: concurrent writers on this pair queue up here.
        let row = sqlx::query_as::<_, PairRow>(&format!(
            "SELECT {PAIR_COLUMNS} FROM swipe_pairs \
             WHERE user_low = $1 AND user_high = $2 FOR UPDATE"
        ))
        .bind(key.low().as_uuid())
        .bind(key.high().as_uuid())
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;

        let mut pair = SwipePair::try_from(row)?;
        let changed = pair.apply(write.role, write.liked, write.superliked, write.at);
        if changed {
            sqlx::query(
                r#"
                UPDATE swipe_pairs
                SET liked_low = $3, liked_high = $4,
                    superlike_low = $5, superlike_high = $6,
                    updated_at = $7
                WHERE user_low = $1 AND user_high = $2
                "#,
            )
            .bind(key.low().as_uuid())
            .bind(key.high().as_uuid())
            .bind(pair.decision_low.as_flag())
            .bind(pair.decision_high.as_flag())
            .bind(pair.superlike_low)
            .bind(pair.superlike_high)
            .bind(pair.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        }

        let matched = if pair.is_mutual() {
            Some(Self::match_for_pair(&mut tx, key, write.at).await?)
        } else {
            None
        };

        tx.commit().await.map_err(db_error)?;
        Ok(DecisionOutcome {
            pair,
            changed,
            matched,
        })
    }

    async fn get_pair(&self, key: PairKey) -> DomainResult<Option<SwipePair>> {
        let row = sqlx::query_as::<_, PairRow>(&format!(
            "SELECT {PAIR_COLUMNS} FROM swipe_pairs WHERE user_low = $1 AND user_high = $2"
        ))
        .bind(key.low().as_uuid())
        .bind(key.high().as_uuid())
        .fetch_optional(self.pool())
        .await
        .map_err(db_error)?;

        row.map(SwipePair::try_from).transpose()
    }

    async fn decided_by(&self, user: UserId) -> DomainResult<Vec<UserId>> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT user_high FROM swipe_pairs WHERE user_low = $1 AND liked_low IS NOT NULL
            UNION ALL
            SELECT user_low FROM swipe_pairs WHERE user_high = $1 AND liked_high IS NOT NULL
            "#,
        )
        .bind(user.as_uuid())
        .fetch_all(self.pool())
        .await
        .map_err(db_error)?;

        Ok(ids.into_iter().map(UserId).collect())
    }
}
