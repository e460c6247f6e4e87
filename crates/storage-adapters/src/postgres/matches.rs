use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::ports::MatchRepository;
use domains::{
    ChatMessage, DomainError, DomainResult, Match, MatchId, MatchStatus, MessageId, PairKey, UserId,
};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use super::{db_error, pair_from_row, PgStore};

pub(super) const MATCH_COLUMNS: &str = "id, user_low, user_high, matched_at, status, unmatched_at";
const MESSAGE_COLUMNS: &str = "id, match_id, sender_id, text, sent_at, read_at";

#[derive(Debug, sqlx::FromRow)]
pub(super) struct MatchRow {
    id: Uuid,
    user_low: Uuid,
    user_high: Uuid,
    matched_at: DateTime<Utc>,
    status: String,
    unmatched_at: Option<DateTime<Utc>>,
}

impl TryFrom<MatchRow> for Match {
    type Error = DomainError;

    fn try_from(row: MatchRow) -> Result<Self, Self::Error> {
        let status = match row.status.as_str() {
            "active" => MatchStatus::Active,
            "unmatched" => MatchStatus::Unmatched,
            other => {
                return Err(DomainError::storage(format!(
                    "unknown match status '{other}'"
                )))
            }
        };
        Ok(Match {
            id: MatchId(row.id),
            pair: pair_from_row(row.user_low, row.user_high)?,
            matched_at: row.matched_at,
            status,
            unmatched_at: row.unmatched_at,
        })
    }
}

fn status_str(status: MatchStatus) -> &'static str {
    match status {
        MatchStatus::Active => "active",
        MatchStatus::Unmatched => "unmatched",
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: Uuid,
    match_id: Uuid,
    sender_id: Uuid,
    text: String,
    sent_at: DateTime<Utc>,
    read_at: Option<DateTime<Utc>>,
}

impl From<MessageRow> for ChatMessage {
    fn from(row: MessageRow) -> Self {
        ChatMessage {
            id: MessageId(row.id),
            match_id: MatchId(row.match_id),
            sender_id: UserId(row.sender_id),
            text: row.text,
            sent_at: row.sent_at,
            read_at: row.read_at,
        }
    }
}

impl PgStore {
    /// Loads a match inside `tx`, optionally taking its row lock.
    async fn load_match(
        tx: &mut Transaction<'_, Postgres>,
        id: MatchId,
        lock: &'static str,
    ) -> DomainResult<Match> {
        let row = sqlx::query_as::<_, MatchRow>(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches WHERE id = $1 {lock}"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut **tx)
        .await
        .map_err(db_error)?
        .ok_or_else(|| DomainError::not_found("match", id))?;
        row.try_into()
    }
}

#[async_trait]
impl MatchRepository for PgStore {
    async fn get_match(&self, id: MatchId) -> DomainResult<Option<Match>> {
        let row = sqlx::query_as::<_, MatchRow>(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(self.pool())
        .await
        .map_err(db_error)?;
        row.map(Match::try_from).transpose()
    }

    async fn find_by_pair(&self, key: PairKey) -> DomainResult<Option<Match>> {
        let row = sqlx::query_as::<_, MatchRow>(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches WHERE user_low = $1 AND user_high = $2"
        ))
        .bind(key.low().as_uuid())
        .bind(key.high().as_uuid())
        .fetch_optional(self.pool())
        .await
        .map_err(db_error)?;
        row.map(Match::try_from).transpose()
    }

    async fn list_for_user(&self, user: UserId) -> DomainResult<Vec<Match>> {
        let rows = sqlx::query_as::<_, MatchRow>(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches \
             WHERE user_low = $1 OR user_high = $1 \
             ORDER BY matched_at DESC, id DESC"
        ))
        .bind(user.as_uuid())
        .fetch_all(self.pool())
        .await
        .map_err(db_error)?;
        rows.into_iter().map(Match::try_from).collect()
    }

    async fn unmatch(&self, id: MatchId, by: UserId, at: DateTime<Utc>) -> DomainResult<Match> {
        let mut tx = self.pool().begin().await.map_err(db_error)?;
        let mut record = Self::load_match(&mut tx, id, "FOR UPDATE").await?;
        record.unmatch(by, at)?;

        sqlx::query("UPDATE matches SET status = $2, unmatched_at = $3 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(status_str(record.status))
            .bind(record.unmatched_at)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        Ok(record)
    }

    async fn append_message(
        &self,
        id: MatchId,
        sender: UserId,
        text: &str,
        at: DateTime<Utc>,
    ) -> DomainResult<ChatMessage> {
        let mut tx = self.pool().begin().await.map_err(db_error)?;
        // Shared lock: blocks a concurrent unmatch, not other senders.
        let conversation = Self::load_match(&mut tx, id, "FOR SHARE").await?;
        let message = ChatMessage::compose(&conversation, sender, text, at)?;

        sqlx::query(
            r#"
            INSERT INTO chat_messages (id, match_id, sender_id, text, sent_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(message.id.as_uuid())
        .bind(id.as_uuid())
        .bind(sender.as_uuid())
        .bind(&message.text)
        .bind(message.sent_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        Ok(message)
    }

    async fn list_messages(&self, id: MatchId) -> DomainResult<Vec<ChatMessage>> {
        let rows = sqlx::query_as::<_, MessageRow>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM chat_messages \
             WHERE match_id = $1 ORDER BY sent_at ASC, id ASC"
        ))
        .bind(id.as_uuid())
        .fetch_all(self.pool())
        .await
        .map_err(db_error)?;
        Ok(rows.into_iter().map(ChatMessage::from).collect())
    }

    async fn mark_read(
        &self,
        id: MessageId,
        reader: UserId,
        at: DateTime<Utc>,
    ) -> DomainResult<ChatMessage> {
        let mut tx = self.pool().begin().await.map_err(db_error)?;
        let row = sqlx::query_as::<_, MessageRow>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM chat_messages WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error)?
        .ok_or_else(|| DomainError::not_found("message", id))?;

        let mut message = ChatMessage::from(row);
        let conversation = Self::load_match(&mut tx, message.match_id, "").await?;
        if message.mark_read(&conversation, reader, at)? {
            sqlx::query("UPDATE chat_messages SET read_at = $2 WHERE id = $1")
                .bind(id.as_uuid())
                .bind(message.read_at)
                .execute(&mut *tx)
                .await
                .map_err(db_error)?;
        }

        tx.commit().await.map_err(db_error)?;
        Ok(message)
    }
}
