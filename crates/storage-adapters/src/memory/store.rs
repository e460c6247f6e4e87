use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use domains::ports::{CandidateSelector, MatchRepository, SwipeStore, UserRepository};
use domains::{
    CandidateQuery, ChatMessage, DecisionOutcome, DecisionWrite, DomainError, DomainResult, Gender,
    GeoPoint, Match, MatchId, MatchRecord, MessageId, PairKey, Profile, ProfileDetails, SwipePair,
    UserId,
};

/// Source of record held in process memory.
///
/// Lock order is `pairs` → `match_by_pair` → `matches` and, separately,
/// `matches` → `messages`. No path takes them the other way round.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    users: DashMap<UserId, ProfileDetails>,
    pairs: DashMap<PairKey, SwipePair>,
    match_by_pair: DashMap<PairKey, MatchId>,
    matches: DashMap<MatchId, Match>,
    messages: DashMap<MessageId, ChatMessage>,
    profile_reads: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a user.
    pub fn insert_user(&self, details: ProfileDetails) {
        self.inner.users.insert(details.profile.id, details);
    }

    /// Number of `get_profile` calls served so far.
    pub fn profile_reads(&self) -> usize {
        self.inner.profile_reads.load(Ordering::SeqCst)
    }

    fn match_for_pair(&self, key: PairKey, at: DateTime<Utc>) -> DomainResult<MatchRecord> {
        match self.inner.match_by_pair.entry(key) {
            Entry::Occupied(existing) => {
                let id = *existing.get();
                let record = self
                    .inner
                    .matches
                    .get(&id)
                    .map(|m| m.clone())
                    .ok_or_else(|| DomainError::storage(format!("dangling match index for {id}")))?;
                Ok(MatchRecord { record, created: false })
            }
            Entry::Vacant(slot) => {
                let record = Match::new(key, at);
                self.inner.matches.insert(record.id, record.clone());
                slot.insert(record.id);
                Ok(MatchRecord { record, created: true })
            }
        }
    }

    fn update_user<F>(&self, id: UserId, at: DateTime<Utc>, change: F) -> Option<Profile>
    where
        F: FnOnce(&mut Profile),
    {
        let mut details = self.inner.users.get_mut(&id)?;
        change(&mut details.profile);
        details.profile.last_active = at;
        Some(details.profile.clone())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn get_profile(&self, id: UserId) -> DomainResult<Option<Profile>> {
        self.inner.profile_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.inner.users.get(&id).map(|d| d.profile.clone()))
    }

    async fn get_details(&self, id: UserId) -> DomainResult<Option<ProfileDetails>> {
        Ok(self.inner.users.get(&id).map(|d| d.clone()))
    }

    async fn photo_urls(&self, ids: &[UserId]) -> DomainResult<HashMap<UserId, Vec<String>>> {
        Ok(ids
            .iter()
            .filter_map(|id| {
                let details = self.inner.users.get(id)?;
                if details.photos.is_empty() {
                    return None;
                }
                let mut photos = details.photos.clone();
                photos.sort_by_key(|p| !p.is_main);
                Some((*id, photos.into_iter().map(|p| p.url).collect()))
            })
            .collect())
    }

    async fn update_profile(
        &self,
        id: UserId,
        bio: &str,
        preferred_gender: Gender,
        at: DateTime<Utc>,
    ) -> DomainResult<Option<Profile>> {
        Ok(self.update_user(id, at, |profile| {
            profile.bio = bio.to_string();
            profile.preferred_gender = preferred_gender;
        }))
    }

    async fn update_location(
        &self,
        id: UserId,
        location: GeoPoint,
        at: DateTime<Utc>,
    ) -> DomainResult<Option<Profile>> {
        Ok(self.update_user(id, at, |profile| profile.location = location))
    }
}

#[async_trait]
impl SwipeStore for MemoryStore {
    async fn record_decision(&self, write: DecisionWrite) -> DomainResult<DecisionOutcome> {
        // The entry guard is the per-pair lock; it stays held until the
        // match, if any, has been read or created.
        let mut pair = self
            .inner
            .pairs
            .entry(write.key)
            .or_insert_with(|| SwipePair::new(write.key, write.at));
        let changed = pair.apply(write.role, write.liked, write.superliked, write.at);

        let matched = if pair.is_mutual() {
            Some(self.match_for_pair(write.key, write.at)?)
        } else {
            None
        };

        Ok(DecisionOutcome {
            pair: pair.clone(),
            changed,
            matched,
        })
    }

    async fn get_pair(&self, key: PairKey) -> DomainResult<Option<SwipePair>> {
        Ok(self.inner.pairs.get(&key).map(|p| p.clone()))
    }

    async fn decided_by(&self, user: UserId) -> DomainResult<Vec<UserId>> {
        Ok(self
            .inner
            .pairs
            .iter()
            .filter_map(|pair| {
                let role = pair.key.role_of(user)?;
                pair.has_decided(role).then(|| pair.key.member(role.other()))
            })
            .collect())
    }
}

#[async_trait]
impl MatchRepository for MemoryStore {
    async fn get_match(&self, id: MatchId) -> DomainResult<Option<Match>> {
        Ok(self.inner.matches.get(&id).map(|m| m.clone()))
    }

    async fn find_by_pair(&self, key: PairKey) -> DomainResult<Option<Match>> {
        let Some(id) = self.inner.match_by_pair.get(&key).map(|id| *id) else {
            return Ok(None);
        };
        Ok(self.inner.matches.get(&id).map(|m| m.clone()))
    }

    async fn list_for_user(&self, user: UserId) -> DomainResult<Vec<Match>> {
        let mut found: Vec<Match> = self
            .inner
            .matches
            .iter()
            .filter(|m| m.involves(user))
            .map(|m| m.clone())
            .collect();
        found.sort_by(|a, b| b.matched_at.cmp(&a.matched_at).then(b.id.cmp(&a.id)));
        Ok(found)
    }

    async fn unmatch(&self, id: MatchId, by: UserId, at: DateTime<Utc>) -> DomainResult<Match> {
        let mut record = self
            .inner
            .matches
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("match", id))?;
        record.unmatch(by, at)?;
        Ok(record.clone())
    }

    async fn append_message(
        &self,
        id: MatchId,
        sender: UserId,
        text: &str,
        at: DateTime<Utc>,
    ) -> DomainResult<ChatMessage> {
        // Holding the read guard keeps a concurrent unmatch out until the
        // message is stored.
        let conversation = self
            .inner
            .matches
            .get(&id)
            .ok_or_else(|| DomainError::not_found("match", id))?;
        let message = ChatMessage::compose(&conversation, sender, text, at)?;
        self.inner.messages.insert(message.id, message.clone());
        Ok(message)
    }

    async fn list_messages(&self, id: MatchId) -> DomainResult<Vec<ChatMessage>> {
        let mut history: Vec<ChatMessage> = self
            .inner
            .messages
            .iter()
            .filter(|m| m.match_id == id)
            .map(|m| m.clone())
            .collect();
        history.sort_by(|a, b| a.sent_at.cmp(&b.sent_at).then(a.id.cmp(&b.id)));
        Ok(history)
    }

    async fn mark_read(
        &self,
        id: MessageId,
        reader: UserId,
        at: DateTime<Utc>,
    ) -> DomainResult<ChatMessage> {
        let match_id = self
            .inner
            .messages
            .get(&id)
            .map(|m| m.match_id)
            .ok_or_else(|| DomainError::not_found("message", id))?;
        // Membership never changes, so a snapshot of the match is enough.
        let conversation = self
            .inner
            .matches
            .get(&match_id)
            .map(|m| m.clone())
            .ok_or_else(|| DomainError::not_found("match", match_id))?;

        let mut message = self
            .inner
            .messages
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("message", id))?;
        message.mark_read(&conversation, reader, at)?;
        Ok(message.clone())
    }
}

#[async_trait]
impl CandidateSelector for MemoryStore {
    async fn select(&self, query: &CandidateQuery) -> DomainResult<Vec<UserId>> {
        let area = query.location.bounding_box(query.max_distance_km);
        let mut hits: Vec<(DateTime<Utc>, UserId)> = self
            .inner
            .users
            .iter()
            .map(|d| d.profile.clone())
            .filter(|p| {
                !query.exclude.contains(&p.id)
                    && p.id != query.seeker
                    && p.gender == query.gender
                    && query.ages.admits(p.birth_date, query.as_of)
                    && area.contains(&p.location)
            })
            .map(|p| (p.last_active, p.id))
            .collect();

        hits.sort_by(|a, b| b.cmp(a));
        Ok(hits.into_iter().take(query.count).map(|(_, id)| id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use domains::{canonicalize, AgeRange, Photo};
    use std::collections::HashSet;
    use uuid::Uuid;

    fn user(n: u128, gender: Gender, born: NaiveDate, location: GeoPoint) -> ProfileDetails {
        ProfileDetails {
            profile: Profile {
                id: UserId(Uuid::from_u128(n)),
                first_name: format!("user{n}"),
                last_name: "Test".into(),
                bio: String::new(),
                birth_date: born,
                gender,
                preferred_gender: Gender::Female,
                location,
                last_active: Utc::now() - chrono::Duration::minutes(n as i64),
            },
            photos: vec![
                Photo { url: format!("https://cdn.test/{n}/b.jpg"), is_main: false },
                Photo { url: format!("https://cdn.test/{n}/a.jpg"), is_main: true },
            ],
        }
    }

    fn paris() -> GeoPoint {
        GeoPoint::new(48.8566, 2.3522).unwrap()
    }

    fn write(from: u128, to: u128, liked: bool) -> DecisionWrite {
        let canonical = canonicalize(UserId(Uuid::from_u128(from)), UserId(Uuid::from_u128(to))).unwrap();
        DecisionWrite {
            key: canonical.key,
            role: canonical.first,
            liked,
            superliked: false,
            at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn mutual_like_creates_one_match() {
        let store = MemoryStore::new();
        let first = store.record_decision(write(1, 2, true)).await.unwrap();
        assert!(first.matched.is_none());

        let second = store.record_decision(write(2, 1, true)).await.unwrap();
        let created = second.matched.unwrap();
        assert!(created.created);

        let again = store.record_decision(write(1, 2, true)).await.unwrap();
        assert!(!again.changed);
        let existing = again.matched.unwrap();
        assert!(!existing.created);
        assert_eq!(existing.record.id, created.record.id);
    }

    #[tokio::test]
    async fn dislike_after_like_leaves_match_in_place() {
        let store = MemoryStore::new();
        store.record_decision(write(1, 2, true)).await.unwrap();
        store.record_decision(write(2, 1, true)).await.unwrap();

        let outcome = store.record_decision(write(1, 2, false)).await.unwrap();
        assert!(outcome.matched.is_none());
        let key = PairKey::new(UserId(Uuid::from_u128(1)), UserId(Uuid::from_u128(2))).unwrap();
        assert!(store.find_by_pair(key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn decided_by_covers_both_roles() {
        let store = MemoryStore::new();
        store.record_decision(write(5, 9, true)).await.unwrap();
        store.record_decision(write(5, 2, false)).await.unwrap();
        store.record_decision(write(7, 5, true)).await.unwrap();

        let mut decided = store.decided_by(UserId(Uuid::from_u128(5))).await.unwrap();
        decided.sort();
        assert_eq!(decided, vec![UserId(Uuid::from_u128(2)), UserId(Uuid::from_u128(9))]);
    }

    #[tokio::test]
    async fn selector_applies_every_filter() {
        let store = MemoryStore::new();
        let today = Utc::now().date_naive();
        let thirty = today.checked_sub_months(chrono::Months::new(30 * 12)).unwrap();
        let fifty = today.checked_sub_months(chrono::Months::new(50 * 12)).unwrap();
        let far = GeoPoint::new(40.7, -74.0).unwrap();

        store.insert_user(user(1, Gender::Female, thirty, paris()));
        store.insert_user(user(2, Gender::Female, thirty, paris()));
        store.insert_user(user(3, Gender::Male, thirty, paris()));
        store.insert_user(user(4, Gender::Female, fifty, paris()));
        store.insert_user(user(5, Gender::Female, thirty, far));
        store.insert_user(user(6, Gender::Female, thirty, paris()));

        let query = CandidateQuery {
            seeker: UserId(Uuid::from_u128(99)),
            location: paris(),
            max_distance_km: 50.0,
            gender: Gender::Female,
            ages: AgeRange::new(Some(25), Some(35)).unwrap(),
            exclude: HashSet::from([UserId(Uuid::from_u128(6))]),
            count: 10,
            as_of: today,
        };
        let got = store.select(&query).await.unwrap();
        // Most recently active first.
        assert_eq!(got, vec![UserId(Uuid::from_u128(1)), UserId(Uuid::from_u128(2))]);
    }

    #[tokio::test]
    async fn main_photo_comes_first() {
        let store = MemoryStore::new();
        store.insert_user(user(1, Gender::Female, NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(), paris()));
        let urls = store.photo_urls(&[UserId(Uuid::from_u128(1))]).await.unwrap();
        assert_eq!(urls[&UserId(Uuid::from_u128(1))][0], "https://cdn.test/1/a.jpg");
    }

    #[tokio::test]
    async fn messages_are_rejected_after_unmatch() {
        let store = MemoryStore::new();
        store.record_decision(write(1, 2, true)).await.unwrap();
        let record = store
            .record_decision(write(2, 1, true))
            .await
            .unwrap()
            .matched
            .unwrap()
            .record;

        let sent = store
            .append_message(record.id, UserId(Uuid::from_u128(1)), " hi ", Utc::now())
            .await
            .unwrap();
        assert_eq!(sent.text, "hi");

        store.unmatch(record.id, UserId(Uuid::from_u128(2)), Utc::now()).await.unwrap();
        let err = store
            .append_message(record.id, UserId(Uuid::from_u128(1)), "still there?", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));

        let again = store
            .unmatch(record.id, UserId(Uuid::from_u128(1)), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(again, DomainError::InvalidState(_)));
    }

    #[tokio::test]
    async fn recipient_marks_read_once() {
        let store = MemoryStore::new();
        store.record_decision(write(1, 2, true)).await.unwrap();
        let record = store
            .record_decision(write(2, 1, true))
            .await
            .unwrap()
            .matched
            .unwrap()
            .record;
        let sent = store
            .append_message(record.id, UserId(Uuid::from_u128(1)), "hello", Utc::now())
            .await
            .unwrap();

        let sender = store.mark_read(sent.id, UserId(Uuid::from_u128(1)), Utc::now()).await;
        assert!(matches!(sender, Err(DomainError::InvalidArgument(_))));

        let first = store.mark_read(sent.id, UserId(Uuid::from_u128(2)), Utc::now()).await.unwrap();
        let second = store.mark_read(sent.id, UserId(Uuid::from_u128(2)), Utc::now()).await.unwrap();
        assert!(first.is_read());
        assert_eq!(first.read_at, second.read_at);
    }
}
