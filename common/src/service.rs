//! The four ranking operations, independent of any transport.

use crate::elo::{self, Side};
use crate::error::{RankerError, Result};
use crate::pairing;
use crate::store::{PhraseStore, validate_phrase_text};
use crate::{ComparisonData, ComparisonOutcome, NewComparison, PhraseRecord, RatingUpdate};
use rand::Rng;

/// How many times a vote is recomputed when a concurrent vote changed
/// one of its phrases' ratings first.
pub const MAX_RATING_RETRIES: usize = 5;

/// Fetch two distinct phrases chosen uniformly at random.
///
/// # Errors
/// Returns [`RankerError::NotEnoughData`] if fewer than two phrases exist.
pub fn compare_pair<R: Rng + ?Sized>(
    store: &dyn PhraseStore,
    rng: &mut R,
) -> Result<[PhraseRecord; 2]> {
    let ids = store.get_phrase_ids()?;
    let (first_id, second_id) = pairing::choose_pair(&ids, rng)?;
    let (first, second) = load_pair(store, first_id, second_id)?;
    Ok([first, second])
}

/// [`compare_pair`] using the thread-local generator.
pub fn compare_random_pair(store: &dyn PhraseStore) -> Result<[PhraseRecord; 2]> {
    compare_pair(store, &mut rand::rng())
}

/// Create a new phrase at the default rating.
///
/// # Errors
/// Returns [`RankerError::Validation`] for blank or oversized text.
pub fn submit_phrase(store: &dyn PhraseStore, text: Option<&str>) -> Result<PhraseRecord> {
    let text = validate_phrase_text(text.unwrap_or_default())?;
    let record = store.insert_phrase(&text)?;
    log::info!("Created phrase #{}", record.phrase_id);
    Ok(record)
}

/// Validate a vote, compute new ratings and persist everything at once.
///
/// # Errors
/// Returns [`RankerError::Validation`] for missing ids, a self-comparison or
/// a winner that is not one of the compared phrases, [`RankerError::NotFound`]
/// for unknown phrases and [`RankerError::Conflict`] if concurrent votes kept
/// invalidating the computed ratings.
pub fn submit_comparison(
    store: &dyn PhraseStore,
    request: &ComparisonData,
) -> Result<ComparisonOutcome> {
    let comparison = validate_comparison(request)?;
    let winner = Side::from_winner_id(
        comparison.phrase1_id,
        comparison.phrase2_id,
        comparison.winner_id,
    )
    .ok_or_else(|| {
        RankerError::Validation(format!(
            "Winner #{} is not one of the compared phrases (#{} and #{})",
            comparison.winner_id, comparison.phrase1_id, comparison.phrase2_id
        ))
    })?;

    for attempt in 1..=MAX_RATING_RETRIES {
        let (phrase1, phrase2) = load_pair(store, comparison.phrase1_id, comparison.phrase2_id)?;
        let change = elo::update_ratings(phrase1.elo_rating, phrase2.elo_rating, winner);
        let updates = [
            RatingUpdate {
                phrase_id: phrase1.phrase_id,
                previous_rating: phrase1.elo_rating,
                new_rating: change.rating_a,
            },
            RatingUpdate {
                phrase_id: phrase2.phrase_id,
                previous_rating: phrase2.elo_rating,
                new_rating: change.rating_b,
            },
        ];

        match store.record_comparison_and_update_ratings(&comparison, &updates) {
            Ok(record) => {
                log::debug!(
                    "Comparison #{}: #{} {:.2} -> {:.2}, #{} {:.2} -> {:.2}",
                    record.comparison_id,
                    phrase1.phrase_id,
                    phrase1.elo_rating,
                    change.rating_a,
                    phrase2.phrase_id,
                    phrase2.elo_rating,
                    change.rating_b
                );
                return Ok(ComparisonOutcome {
                    comparison: record,
                    phrase1: PhraseRecord {
                        elo_rating: change.rating_a,
                        ..phrase1
                    },
                    phrase2: PhraseRecord {
                        elo_rating: change.rating_b,
                        ..phrase2
                    },
                });
            }
            Err(RankerError::StaleRating { phrase_id }) => {
                log::warn!(
                    "Rating for phrase #{phrase_id} changed during update (attempt {attempt}/{MAX_RATING_RETRIES}), retrying"
                );
            }
            Err(err) => return Err(err),
        }
    }

    Err(RankerError::Conflict(format!(
        "Ratings for phrases #{} and #{} kept changing, try again later",
        comparison.phrase1_id, comparison.phrase2_id
    )))
}

/// All phrases, highest rating first.
pub fn list_ranked(store: &dyn PhraseStore) -> Result<Vec<PhraseRecord>> {
    store.get_phrases_ranked()
}

fn validate_comparison(request: &ComparisonData) -> Result<NewComparison> {
    let (Some(phrase1_id), Some(phrase2_id), Some(winner_id)) =
        (request.phrase1_id, request.phrase2_id, request.winner_id)
    else {
        return Err(RankerError::Validation(
            "All phrase IDs are required".to_string(),
        ));
    };
    if phrase1_id == phrase2_id {
        return Err(RankerError::Validation(
            "A phrase cannot be compared with itself".to_string(),
        ));
    }
    Ok(NewComparison {
        phrase1_id,
        phrase2_id,
        winner_id,
    })
}

fn load_pair(
    store: &dyn PhraseStore,
    first_id: u32,
    second_id: u32,
) -> Result<(PhraseRecord, PhraseRecord)> {
    let mut phrases = store.get_phrases_by_ids(&[first_id, second_id])?;
    let mut take = |id: u32| {
        let position = phrases
            .iter()
            .position(|p| p.phrase_id == id)
            .ok_or(RankerError::NotFound(id))?;
        Ok::<_, RankerError>(phrases.swap_remove(position))
    };
    let first = take(first_id)?;
    let second = take(second_id)?;
    Ok((first, second))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::MemoryStore;
    use crate::{ComparisonRecord, StoreHealth, StoreSnapshot};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn vote(phrase1_id: u32, phrase2_id: u32, winner_id: u32) -> ComparisonData {
        ComparisonData {
            phrase1_id: Some(phrase1_id),
            phrase2_id: Some(phrase2_id),
            winner_id: Some(winner_id),
        }
    }

    fn rating_of(store: &dyn PhraseStore, id: u32) -> f64 {
        store.get_phrases_by_ids(&[id]).unwrap()[0].elo_rating
    }

    /// Wraps a store and reports a stale rating for the first few writes.
    struct ContendedStore {
        inner: MemoryStore,
        stale_writes: AtomicUsize,
    }

    impl ContendedStore {
        fn new(stale_writes: usize) -> Self {
            Self {
                inner: MemoryStore::new(),
                stale_writes: AtomicUsize::new(stale_writes),
            }
        }
    }

    impl PhraseStore for ContendedStore {
        fn insert_phrase(&self, text: &str) -> Result<PhraseRecord> {
            self.inner.insert_phrase(text)
        }
        fn get_phrase_ids(&self) -> Result<Vec<u32>> {
            self.inner.get_phrase_ids()
        }
        fn get_phrases_by_ids(&self, ids: &[u32]) -> Result<Vec<PhraseRecord>> {
            self.inner.get_phrases_by_ids(ids)
        }
        fn record_comparison_and_update_ratings(
            &self,
            comparison: &NewComparison,
            updates: &[RatingUpdate; 2],
        ) -> Result<ComparisonRecord> {
            let remaining = self.stale_writes.load(Ordering::SeqCst);
            if remaining > 0 {
                self.stale_writes.store(remaining - 1, Ordering::SeqCst);
                // Simulate another vote landing first
                let current = self.inner.get_phrases_by_ids(&[comparison.phrase1_id])?;
                self.inner.overwrite_ratings(&[RatingUpdate {
                    phrase_id: comparison.phrase1_id,
                    previous_rating: current[0].elo_rating,
                    new_rating: current[0].elo_rating + 10.0,
                }])?;
                return Err(RankerError::StaleRating {
                    phrase_id: comparison.phrase1_id,
                });
            }
            self.inner
                .record_comparison_and_update_ratings(comparison, updates)
        }
        fn get_phrases_ranked(&self) -> Result<Vec<PhraseRecord>> {
            self.inner.get_phrases_ranked()
        }
        fn get_comparisons(&self) -> Result<Vec<ComparisonRecord>> {
            self.inner.get_comparisons()
        }
        fn load_snapshot(&self) -> Result<StoreSnapshot> {
            self.inner.load_snapshot()
        }
        fn overwrite_ratings(&self, updates: &[RatingUpdate]) -> Result<()> {
            self.inner.overwrite_ratings(updates)
        }
        fn health_check(&self) -> Result<StoreHealth> {
            self.inner.health_check()
        }
    }

    #[test_log::test]
    fn test_compare_pair_needs_two_phrases() {
        let store = MemoryStore::new();
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(
            compare_pair(&store, &mut rng),
            Err(RankerError::NotEnoughData { available: 0 })
        );
        store.insert_phrase("only one").unwrap();
        assert_eq!(
            compare_pair(&store, &mut rng),
            Err(RankerError::NotEnoughData { available: 1 })
        );
    }

    #[test_log::test]
    fn test_compare_pair_returns_distinct_phrases() {
        let store = MemoryStore::new();
        for text in ["alpha", "beta", "gamma"] {
            store.insert_phrase(text).unwrap();
        }
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..20 {
            let [first, second] = compare_pair(&store, &mut rng).unwrap();
            assert_ne!(first.phrase_id, second.phrase_id);
            assert!(!first.text.is_empty());
        }
        let [first, second] = compare_random_pair(&store).unwrap();
        assert_ne!(first.phrase_id, second.phrase_id);
    }

    #[test_log::test]
    fn test_submit_phrase_round_trip() {
        let store = MemoryStore::new();
        let created = submit_phrase(&store, Some("foo")).unwrap();
        assert_eq!(created.text, "foo");
        assert_eq!(created.elo_rating, 1500.0);

        let ranked = list_ranked(&store).unwrap();
        assert!(
            ranked
                .iter()
                .any(|p| p.text == "foo" && p.elo_rating == 1500.0)
        );
    }

    #[test_log::test]
    fn test_submit_phrase_rejects_blank() {
        let store = MemoryStore::new();
        for text in [None, Some(""), Some("   "), Some("\t\n")] {
            assert!(matches!(
                submit_phrase(&store, text),
                Err(RankerError::Validation(_))
            ));
        }
        assert!(list_ranked(&store).unwrap().is_empty());
    }

    #[test_log::test]
    fn test_submit_comparison_scenario() {
        let store = MemoryStore::new();
        let p1 = submit_phrase(&store, Some("P1")).unwrap().phrase_id;
        let p2 = submit_phrase(&store, Some("P2")).unwrap().phrase_id;

        let outcome = submit_comparison(&store, &vote(p1, p2, p1)).unwrap();
        assert_eq!(outcome.phrase1.elo_rating, 1516.0);
        assert_eq!(outcome.phrase2.elo_rating, 1484.0);
        assert_eq!(rating_of(&store, p1), 1516.0);
        assert_eq!(rating_of(&store, p2), 1484.0);

        // Second vote is computed from the updated ratings, not the originals
        let outcome = submit_comparison(&store, &vote(p1, p2, p2)).unwrap();
        let expected = elo::update_ratings(1516.0, 1484.0, Side::B);
        assert_eq!(outcome.phrase1.elo_rating, expected.rating_a);
        assert_eq!(outcome.phrase2.elo_rating, expected.rating_b);
        assert!(rating_of(&store, p2) > 1500.0);
        assert_eq!(store.get_comparisons().unwrap().len(), 2);
    }

    #[test_log::test]
    fn test_submit_comparison_order_of_ids_does_not_matter() {
        let store = MemoryStore::new();
        let p1 = submit_phrase(&store, Some("P1")).unwrap().phrase_id;
        let p2 = submit_phrase(&store, Some("P2")).unwrap().phrase_id;

        let outcome = submit_comparison(&store, &vote(p2, p1, p1)).unwrap();
        assert_eq!(outcome.phrase1.phrase_id, p2);
        assert_eq!(outcome.phrase1.elo_rating, 1484.0);
        assert_eq!(outcome.phrase2.elo_rating, 1516.0);
    }

    #[test_log::test]
    fn test_submit_comparison_validation() {
        let store = MemoryStore::new();
        let p1 = submit_phrase(&store, Some("P1")).unwrap().phrase_id;
        let p2 = submit_phrase(&store, Some("P2")).unwrap().phrase_id;

        let missing = ComparisonData {
            phrase1_id: Some(p1),
            phrase2_id: None,
            winner_id: Some(p1),
        };
        let cases = [
            missing,
            ComparisonData::default(),
            vote(p1, p1, p1),
            vote(p1, p2, 77),
        ];
        for request in &cases {
            assert!(
                matches!(
                    submit_comparison(&store, request),
                    Err(RankerError::Validation(_))
                ),
                "{request:?}"
            );
        }

        assert!(store.get_comparisons().unwrap().is_empty());
        assert_eq!(rating_of(&store, p1), 1500.0);
    }

    #[test_log::test]
    fn test_submit_comparison_unknown_phrase() {
        let store = MemoryStore::new();
        let p1 = submit_phrase(&store, Some("P1")).unwrap().phrase_id;
        assert_eq!(
            submit_comparison(&store, &vote(p1, 42, 42)),
            Err(RankerError::NotFound(42))
        );
    }

    #[test_log::test]
    fn test_submit_comparison_retries_stale_ratings() {
        let store = ContendedStore::new(2);
        let p1 = submit_phrase(&store, Some("P1")).unwrap().phrase_id;
        let p2 = submit_phrase(&store, Some("P2")).unwrap().phrase_id;

        let outcome = submit_comparison(&store, &vote(p1, p2, p1)).unwrap();

        // Two concurrent bumps of +10 landed before the vote went through
        let expected = elo::update_ratings(1520.0, 1500.0, Side::A);
        assert_eq!(outcome.phrase1.elo_rating, expected.rating_a);
        assert_eq!(rating_of(&store, p1), expected.rating_a);
        assert_eq!(store.get_comparisons().unwrap().len(), 1);
    }

    #[test_log::test]
    fn test_submit_comparison_gives_up_after_retries() {
        let store = ContendedStore::new(MAX_RATING_RETRIES);
        let p1 = submit_phrase(&store, Some("P1")).unwrap().phrase_id;
        let p2 = submit_phrase(&store, Some("P2")).unwrap().phrase_id;

        let result = submit_comparison(&store, &vote(p1, p2, p1));
        assert!(matches!(result, Err(RankerError::Conflict(_))));
        assert!(store.get_comparisons().unwrap().is_empty());
    }

    #[test_log::test]
    fn test_list_ranked_is_idempotent() {
        let store = MemoryStore::new();
        let p1 = submit_phrase(&store, Some("P1")).unwrap().phrase_id;
        let p2 = submit_phrase(&store, Some("P2")).unwrap().phrase_id;
        submit_phrase(&store, Some("P3")).unwrap();
        submit_comparison(&store, &vote(p1, p2, p2)).unwrap();

        let first = list_ranked(&store).unwrap();
        let second = list_ranked(&store).unwrap();
        assert_eq!(first, second);
        let ids: Vec<u32> = first.iter().map(|p| p.phrase_id).collect();
        assert_eq!(ids, vec![p2, 3, p1]);
    }
}
