//! # Swipes
//!
//! One [`SwipePair`] row per canonical pair, with a decision slot for each
//! role. Adapters load the row, call [`SwipePair::apply`] and persist it
//! inside a single atomic unit; the rule itself lives here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::matches::Match;
use crate::pair::{PairKey, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    #[default]
    Undecided,
    Like,
    Dislike,
}

impl Decision {
    pub fn from_liked(liked: bool) -> Self {
        if liked {
            Decision::Like
        } else {
            Decision::Dislike
        }
    }

    /// Nullable-boolean storage form: `None` undecided, `Some(true)` like.
    pub fn as_flag(self) -> Option<bool> {
        match self {
            Decision::Undecided => None,
            Decision::Like => Some(true),
            Decision::Dislike => Some(false),
        }
    }

    pub fn from_flag(flag: Option<bool>) -> Self {
        match flag {
            None => Decision::Undecided,
            Some(liked) => Decision::from_liked(liked),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwipePair {
    pub key: PairKey,
    pub decision_low: Decision,
    pub decision_high: Decision,
    pub superlike_low: bool,
    pub superlike_high: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SwipePair {
    pub fn new(key: PairKey, now: DateTime<Utc>) -> Self {
        Self {
            key,
            decision_low: Decision::Undecided,
            decision_high: Decision::Undecided,
            superlike_low: false,
            superlike_high: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn decision(&self, role: Role) -> Decision {
        match role {
            Role::Low => self.decision_low,
            Role::High => self.decision_high,
        }
    }

    pub fn superliked(&self, role: Role) -> bool {
        match role {
            Role::Low => self.superlike_low,
            Role::High => self.superlike_high,
        }
    }

    /// Writes `role`'s decision. A superlike only sticks alongside a like.
    ///
    /// Returns `false` when the slot already held exactly this decision; the
    /// row, including `updated_at`, is then left untouched.
    pub fn apply(&mut self, role: Role, liked: bool, superliked: bool, now: DateTime<Utc>) -> bool {
        let decision = Decision::from_liked(liked);
        let superliked = liked && superliked;
        if self.decision(role) == decision && self.superliked(role) == superliked {
            return false;
        }

        let (slot, flag) = match role {
            Role::Low => (&mut self.decision_low, &mut self.superlike_low),
            Role::High => (&mut self.decision_high, &mut self.superlike_high),
        };
        *slot = decision;
        *flag = superliked;
        self.updated_at = now;
        true
    }

    pub fn is_mutual(&self) -> bool {
        self.decision_low == Decision::Like && self.decision_high == Decision::Like
    }

    pub fn has_decided(&self, role: Role) -> bool {
        self.decision(role) != Decision::Undecided
    }
}

/// One decision to record atomically against a canonical pair.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionWrite {
    pub key: PairKey,
    pub role: Role,
    pub liked: bool,
    pub superliked: bool,
    pub at: DateTime<Utc>,
}

/// What the atomic decision write observed and produced.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionOutcome {
    pub pair: SwipePair,
    /// Whether the write altered the stored row.
    pub changed: bool,
    /// The pair's match, if the pair is mutual.
    pub matched: Option<MatchRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord {
    pub record: Match,
    /// `true` only for the single write that inserted the match.
    pub created: bool,
}
