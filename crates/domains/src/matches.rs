//! # Matches and conversations
//!
//! A [`Match`] is created once per canonical pair and only ever moves from
//! `Active` to `Unmatched`. Messages reference their match by id; there are
//! no back-references from a match to its messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{DomainError, DomainResult};
use crate::models::{MatchId, MessageId, UserId};
use crate::pair::PairKey;

pub const MAX_MESSAGE_CHARS: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Active,
    Unmatched,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    /// Members in canonical order.
    pub pair: PairKey,
    pub matched_at: DateTime<Utc>,
    pub status: MatchStatus,
    pub unmatched_at: Option<DateTime<Utc>>,
}

impl Match {
    pub fn new(pair: PairKey, now: DateTime<Utc>) -> Self {
        Self {
            id: MatchId::new(),
            pair,
            matched_at: now,
            status: MatchStatus::Active,
            unmatched_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == MatchStatus::Active
    }

    pub fn user_a(&self) -> UserId {
        self.pair.low()
    }

    pub fn user_b(&self) -> UserId {
        self.pair.high()
    }

    pub fn involves(&self, user: UserId) -> bool {
        self.pair.contains(user)
    }

    /// Terminal transition. Only a member may unmatch, and only once.
    pub fn unmatch(&mut self, by: UserId, now: DateTime<Utc>) -> DomainResult<()> {
        if !self.involves(by) {
            return Err(DomainError::invalid_argument(format!(
                "user {by} is not a member of match {}",
                self.id
            )));
        }
        if !self.is_active() {
            return Err(DomainError::invalid_state(format!(
                "match {} is already unmatched",
                self.id
            )));
        }
        self.status = MatchStatus::Unmatched;
        self.unmatched_at = Some(now);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub match_id: MatchId,
    pub sender_id: UserId,
    pub text: String,
    pub sent_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

impl ChatMessage {
    /// Builds a message for `conversation`, enforcing every write rule.
    pub fn compose(
        conversation: &Match,
        sender: UserId,
        text: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if !conversation.is_active() {
            return Err(DomainError::invalid_state(format!(
                "match {} is no longer active",
                conversation.id
            )));
        }
        if !conversation.involves(sender) {
            return Err(DomainError::invalid_argument(format!(
                "user {sender} is not a member of match {}",
                conversation.id
            )));
        }

        let text = text.trim();
        let chars = text.chars().count();
        if chars == 0 {
            return Err(DomainError::invalid_argument("message text is empty"));
        }
        if chars > MAX_MESSAGE_CHARS {
            return Err(DomainError::invalid_argument(format!(
                "message text is {chars} characters, limit is {MAX_MESSAGE_CHARS}"
            )));
        }

        Ok(Self {
            id: MessageId::new(),
            match_id: conversation.id,
            sender_id: sender,
            text: text.to_string(),
            sent_at: now,
            read_at: None,
        })
    }

    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }

    /// Marks the message read on behalf of its recipient.
    ///
    /// Returns `false` if it was already read.
    pub fn mark_read(
        &mut self,
        conversation: &Match,
        reader: UserId,
        now: DateTime<Utc>,
    ) -> DomainResult<bool> {
        if conversation.id != self.match_id || !conversation.involves(reader) {
            return Err(DomainError::invalid_argument(format!(
                "user {reader} cannot read message {}",
                self.id
            )));
        }
        if reader == self.sender_id {
            return Err(DomainError::invalid_argument(
                "a sender cannot mark their own message read",
            ));
        }
        if self.is_read() {
            return Ok(false);
        }
        self.read_at = Some(now);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn members() -> (UserId, UserId) {
        (UserId(Uuid::from_u128(1)), UserId(Uuid::from_u128(2)))
    }

    fn active_match() -> Match {
        let (a, b) = members();
        Match::new(PairKey::new(a, b).unwrap(), Utc::now())
    }

    #[test]
    fn unmatch_is_terminal() {
        let (a, b) = members();
        let mut m = active_match();
        m.unmatch(a, Utc::now()).unwrap();
        assert_eq!(m.status, MatchStatus::Unmatched);
        assert!(matches!(
            m.unmatch(b, Utc::now()),
            Err(DomainError::InvalidState(_))
        ));
    }

    #[test]
    fn outsider_cannot_unmatch() {
        let mut m = active_match();
        let outsider = UserId(Uuid::from_u128(3));
        assert!(matches!(
            m.unmatch(outsider, Utc::now()),
            Err(DomainError::InvalidArgument(_))
        ));
        assert!(m.is_active());
    }

    #[test]
    fn message_to_unmatched_is_invalid_state() {
        let (a, _) = members();
        let mut m = active_match();
        m.unmatch(a, Utc::now()).unwrap();
        assert!(matches!(
            ChatMessage::compose(&m, a, "hello", Utc::now()),
            Err(DomainError::InvalidState(_))
        ));
    }

    #[test]
    fn message_text_bounds() {
        let (a, _) = members();
        let m = active_match();
        let long = "x".repeat(5000);

        assert!(matches!(
            ChatMessage::compose(&m, a, &long, Utc::now()),
            Err(DomainError::InvalidArgument(_))
        ));
        assert!(matches!(
            ChatMessage::compose(&m, a, "   \n\t ", Utc::now()),
            Err(DomainError::InvalidArgument(_))
        ));

        let exact = "ё".repeat(MAX_MESSAGE_CHARS);
        assert!(ChatMessage::compose(&m, a, &exact, Utc::now()).is_ok());
    }

    #[test]
    fn message_is_trimmed_and_sender_checked() {
        let (a, _) = members();
        let m = active_match();
        let msg = ChatMessage::compose(&m, a, "  hi there  ", Utc::now()).unwrap();
        assert_eq!(msg.text, "hi there");

        let outsider = UserId(Uuid::from_u128(9));
        assert!(matches!(
            ChatMessage::compose(&m, outsider, "hi", Utc::now()),
            Err(DomainError::InvalidArgument(_))
        ));
    }

    #[test]
    fn only_recipient_marks_read_once() {
        let (a, b) = members();
        let m = active_match();
        let mut msg = ChatMessage::compose(&m, a, "hey", Utc::now()).unwrap();

        assert!(msg.mark_read(&m, a, Utc::now()).is_err());
        assert!(msg.mark_read(&m, b, Utc::now()).unwrap());
        let first = msg.read_at;
        assert!(!msg.mark_read(&m, b, Utc::now()).unwrap());
        assert_eq!(msg.read_at, first);
    }
}
