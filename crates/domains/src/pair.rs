//! # Pair Canonicalizer
//!
//! Two identities always map to the same unordered-pair key: the lower id
//! occupies the `Low` slot, the higher one the `High` slot. Storage rows for
//! swipes and matches are keyed by [`PairKey`], so a pair has exactly one row
//! no matter who acted first.

use serde::{Deserialize, Serialize};

use crate::errors::{DomainError, DomainResult};
use crate::models::UserId;

/// Which side of a canonical pair an identity occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Low,
    High,
}

impl Role {
    pub fn other(self) -> Self {
        match self {
            Role::Low => Role::High,
            Role::High => Role::Low,
        }
    }
}

/// Unordered pair of distinct identities in canonical order (`low < high`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PairKey {
    low: UserId,
    high: UserId,
}

impl PairKey {
    pub fn new(a: UserId, b: UserId) -> DomainResult<Self> {
        canonicalize(a, b).map(|canonical| canonical.key)
    }

    pub fn low(&self) -> UserId {
        self.low
    }

    pub fn high(&self) -> UserId {
        self.high
    }

    pub fn member(&self, role: Role) -> UserId {
        match role {
            Role::Low => self.low,
            Role::High => self.high,
        }
    }

    pub fn role_of(&self, user: UserId) -> Option<Role> {
        if user == self.low {
            Some(Role::Low)
        } else if user == self.high {
            Some(Role::High)
        } else {
            None
        }
    }

    pub fn contains(&self, user: UserId) -> bool {
        self.role_of(user).is_some()
    }

    /// The member that is not `user`, if `user` belongs to the pair.
    pub fn partner_of(&self, user: UserId) -> Option<UserId> {
        self.role_of(user).map(|role| self.member(role.other()))
    }
}

/// Result of canonicalizing `(first, second)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Canonical {
    pub key: PairKey,
    /// Role held by the first argument.
    pub first: Role,
}

impl Canonical {
    pub fn second(&self) -> Role {
        self.first.other()
    }
}

/// Orders two identities into a [`PairKey`]. Fails on self-pairs.
pub fn canonicalize(first: UserId, second: UserId) -> DomainResult<Canonical> {
    if first == second {
        return Err(DomainError::invalid_argument(
            "a pair needs two distinct identities",
        ));
    }

    let (key, role) = if first < second {
        (PairKey { low: first, high: second }, Role::Low)
    } else {
        (PairKey { low: second, high: first }, Role::High)
    };

    Ok(Canonical { key, first: role })
}
