//! Shared fixtures: an in-memory deployment with every adapter exposed so
//! tests can inspect what the services did.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use domains::{Gender, GeoPoint, Photo, Profile, ProfileDetails, UserId};
use services::{CachePolicy, ConversationService, DeckCache, EventEmitter, MatchingService, ProfileCache};
use storage_adapters::memory::{MemoryDeckStore, MemoryEventBus, MemoryProfileStore, MemoryStore};
use uuid::Uuid;

pub const AMSTERDAM: (f64, f64) = (52.37, 4.89);

pub fn uid(n: u128) -> UserId {
    UserId(Uuid::from_u128(n))
}

pub struct Person {
    pub id: u128,
    pub gender: Gender,
    pub seeking: Gender,
    pub birth_year: i32,
    pub at: (f64, f64),
    pub active_minutes_ago: i64,
}

impl Person {
    pub fn new(id: u128, gender: Gender, seeking: Gender) -> Self {
        Self {
            id,
            gender,
            seeking,
            birth_year: 1995,
            at: AMSTERDAM,
            active_minutes_ago: 0,
        }
    }

    pub fn born(mut self, year: i32) -> Self {
        self.birth_year = year;
        self
    }

    pub fn at(mut self, latitude: f64, longitude: f64) -> Self {
        self.at = (latitude, longitude);
        self
    }

    pub fn active_minutes_ago(mut self, minutes: i64) -> Self {
        self.active_minutes_ago = minutes;
        self
    }

    pub fn details(&self, now: DateTime<Utc>) -> ProfileDetails {
        ProfileDetails {
            profile: Profile {
                id: uid(self.id),
                first_name: format!("Person{}", self.id),
                last_name: "Example".into(),
                bio: String::new(),
                birth_date: NaiveDate::from_ymd_opt(self.birth_year, 1, 1).unwrap(),
                gender: self.gender,
                preferred_gender: self.seeking,
                location: GeoPoint::new(self.at.0, self.at.1).unwrap(),
                last_active: now - Duration::minutes(self.active_minutes_ago),
            },
            photos: vec![Photo {
                url: format!("https://cdn.example/{}.jpg", self.id),
                is_main: true,
            }],
        }
    }
}

/// One process worth of services over a shared source of record.
pub struct Node {
    pub profile_store: Arc<MemoryProfileStore>,
    pub deck_store: Arc<MemoryDeckStore>,
    pub profiles: ProfileCache,
    pub matching: MatchingService,
}

pub struct Harness {
    pub store: MemoryStore,
    pub bus: MemoryEventBus,
    pub policy: CachePolicy,
}

impl Harness {
    pub fn new(people: &[Person]) -> Self {
        let store = MemoryStore::new();
        let now = Utc::now();
        for person in people {
            store.insert_user(person.details(now));
        }
        Self {
            store,
            bus: MemoryEventBus::recording(),
            policy: CachePolicy::default(),
        }
    }

    /// A fresh set of caches over the shared store and bus, like a second
    /// replica of the service.
    pub fn node(&self) -> Node {
        let profile_store = Arc::new(MemoryProfileStore::new());
        let deck_store = Arc::new(MemoryDeckStore::new());
        let profiles = ProfileCache::new(
            Arc::new(self.store.clone()),
            profile_store.clone(),
            deck_store.clone(),
            self.policy,
        );
        let decks = DeckCache::new(
            deck_store.clone(),
            Arc::new(self.store.clone()),
            Arc::new(self.store.clone()),
            self.policy,
        );
        let events = EventEmitter::new(Arc::new(self.bus.clone()), self.policy.notify_timeout);
        let matching = MatchingService::new(
            Arc::new(self.store.clone()),
            Arc::new(self.store.clone()),
            profiles.clone(),
            decks,
            events,
        );
        Node {
            profile_store,
            deck_store,
            profiles,
            matching,
        }
    }

    pub fn conversations(&self) -> ConversationService {
        ConversationService::new(Arc::new(self.store.clone()))
    }
}
