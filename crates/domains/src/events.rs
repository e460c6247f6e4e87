//! Domain events handed to the external notifier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{MatchId, UserId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    MatchCreated {
        match_id: MatchId,
        user_a: UserId,
        user_b: UserId,
        matched_at: DateTime<Utc>,
    },
    ProfileUpdated {
        user_id: UserId,
        updated_at: DateTime<Utc>,
    },
    /// Every recorded decision, matched or not, for downstream analytics.
    SwipeProcessed {
        from_user: UserId,
        to_user: UserId,
        liked: bool,
        superliked: bool,
        processed_at: DateTime<Utc>,
    },
}

impl DomainEvent {
    /// Channel suffix the event is published under.
    pub fn topic(&self) -> &'static str {
        match self {
            DomainEvent::MatchCreated { .. } => "match-created",
            DomainEvent::ProfileUpdated { .. } => "profile-updated",
            DomainEvent::SwipeProcessed { .. } => "swipe-processed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_tagged() {
        let event = DomainEvent::ProfileUpdated {
            user_id: UserId::new(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "profile_updated");
        assert_eq!(event.topic(), "profile-updated");

        let back: DomainEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn swipe_events_carry_both_sides() {
        let (from_user, to_user) = (UserId::new(), UserId::new());
        let event = DomainEvent::SwipeProcessed {
            from_user,
            to_user,
            liked: true,
            superliked: false,
            processed_at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "swipe_processed");
        assert_eq!(json["from_user"], serde_json::to_value(from_user).unwrap());
        assert_eq!(event.topic(), "swipe-processed");
    }
}
