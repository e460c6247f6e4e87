//! Match lifecycle after the swipe: listing, unmatching and chat.

use std::sync::Arc;

use chrono::Utc;
use domains::ports::MatchRepository;
use domains::{canonicalize, ChatMessage, DomainError, DomainResult, Match, MatchId, MessageId, UserId};
use tracing::{debug, info};

#[derive(Clone)]
pub struct ConversationService {
    matches: Arc<dyn MatchRepository>,
}

impl ConversationService {
    pub fn new(matches: Arc<dyn MatchRepository>) -> Self {
        Self { matches }
    }

    /// Matches of `user`, newest first, including unmatched ones.
    pub async fn list_matches(&self, user: UserId) -> DomainResult<Vec<Match>> {
        self.matches.list_for_user(user).await
    }

    pub async fn get_match(&self, id: MatchId) -> DomainResult<Match> {
        self.matches
            .get_match(id)
            .await?
            .ok_or_else(|| DomainError::not_found("match", id))
    }

    /// The match between two users, in whichever order they are given.
    pub async fn match_between(&self, user: UserId, other: UserId) -> DomainResult<Match> {
        let canonical = canonicalize(user, other)?;
        self.matches
            .find_by_pair(canonical.key)
            .await?
            .ok_or_else(|| DomainError::not_found("match", format!("{user}/{other}")))
    }

    pub async fn unmatch(&self, id: MatchId, by: UserId) -> DomainResult<Match> {
        let record = self.matches.unmatch(id, by, Utc::now()).await?;
        info!(match_id = %id, by = %by, "match dissolved");
        Ok(record)
    }

    pub async fn send_message(&self, id: MatchId, sender: UserId, text: &str) -> DomainResult<ChatMessage> {
        let message = self.matches.append_message(id, sender, text, Utc::now()).await?;
        debug!(match_id = %id, message_id = %message.id, "message stored");
        Ok(message)
    }

    /// Conversation history, oldest first. Only members may read it.
    pub async fn list_messages(&self, id: MatchId, requester: UserId) -> DomainResult<Vec<ChatMessage>> {
        let conversation = self.get_match(id).await?;
        if !conversation.involves(requester) {
            return Err(DomainError::invalid_argument(format!(
                "user {requester} is not a member of match {id}"
            )));
        }
        self.matches.list_messages(id).await
    }

    pub async fn mark_read(&self, id: MessageId, reader: UserId) -> DomainResult<ChatMessage> {
        self.matches.mark_read(id, reader, Utc::now()).await
    }
}
