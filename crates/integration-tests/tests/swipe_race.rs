mod common;

use common::{uid, Harness, Person};
use domains::ports::{MatchRepository, SwipeStore};
use domains::{DomainEvent, Gender, PairKey};
use services::DecisionRequest;

fn like(from: u128, to: u128) -> DecisionRequest {
    DecisionRequest {
        from_user: uid(from),
        to_user: uid(to),
        liked: true,
        superliked: false,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn simultaneous_mutual_likes_create_exactly_one_match() {
    let pairs: Vec<(u128, u128)> = (0..16).map(|i| (100 + 2 * i, 101 + 2 * i)).collect();
    let mut people = Vec::new();
    for &(a, b) in &pairs {
        people.push(Person::new(a, Gender::Male, Gender::Female));
        people.push(Person::new(b, Gender::Female, Gender::Male));
    }
    let harness = Harness::new(&people);
    let left = harness.node();
    let right = harness.node();

    let mut handles = Vec::new();
    for &(a, b) in &pairs {
        let left = left.matching.clone();
        let right = right.matching.clone();
        handles.push(tokio::spawn(async move {
            let (first, second) = tokio::join!(
                left.record_decision(like(a, b)),
                right.record_decision(like(b, a)),
            );
            (a, b, first.unwrap(), second.unwrap())
        }));
    }

    for handle in handles {
        let (a, b, first, second) = handle.await.unwrap();
        let matched: Vec<_> = [&first, &second].into_iter().filter(|r| r.is_match).collect();
        assert_eq!(matched.len(), 1, "pair {a}/{b} reported {matched:?}");

        let listed = harness.store.list_for_user(uid(a)).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(Some(listed[0].id), matched[0].match_id);

        let pair = harness
            .store
            .get_pair(PairKey::new(uid(a), uid(b)).unwrap())
            .await
            .unwrap()
            .unwrap();
        assert!(pair.is_mutual());
    }

    let created = harness
        .bus
        .published()
        .await
        .into_iter()
        .filter(|event| matches!(event, DomainEvent::MatchCreated { .. }))
        .count();
    assert_eq!(created, pairs.len());
}

#[tokio::test]
async fn repeated_likes_after_a_match_return_the_same_match() {
    let harness = Harness::new(&[
        Person::new(1, Gender::Male, Gender::Female),
        Person::new(2, Gender::Female, Gender::Male),
    ]);
    let node = harness.node();

    assert!(!node.matching.record_decision(like(1, 2)).await.unwrap().is_match);
    let first = node.matching.record_decision(like(2, 1)).await.unwrap();
    let again = node.matching.record_decision(like(1, 2)).await.unwrap();

    assert!(first.is_match && again.is_match);
    assert_eq!(first.match_id, again.match_id);
    let events = harness.bus.published().await;
    let created = events
        .iter()
        .filter(|event| matches!(event, DomainEvent::MatchCreated { .. }))
        .count();
    let swipes = events
        .iter()
        .filter(|event| matches!(event, DomainEvent::SwipeProcessed { .. }))
        .count();
    assert_eq!((created, swipes), (1, 3));
    assert_eq!(node.matching.match_score(uid(1)).await.unwrap(), 1);
    assert_eq!(node.matching.match_score(uid(2)).await.unwrap(), 1);
}

#[tokio::test]
async fn unmatched_pairs_never_rematch() {
    let harness = Harness::new(&[
        Person::new(1, Gender::Male, Gender::Female),
        Person::new(2, Gender::Female, Gender::Male),
    ]);
    let node = harness.node();
    node.matching.record_decision(like(1, 2)).await.unwrap();
    let result = node.matching.record_decision(like(2, 1)).await.unwrap();
    let match_id = result.match_id.unwrap();

    harness.conversations().unmatch(match_id, uid(1)).await.unwrap();
    let after = node.matching.record_decision(like(1, 2)).await.unwrap();

    assert!(!after.is_match);
    assert_eq!(harness.store.list_for_user(uid(2)).await.unwrap().len(), 1);
}
