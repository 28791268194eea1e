//! A process-local store, used by tests and by the API's in-memory mode.

use crate::elo::DEFAULT_RATING;
use crate::error::{RankerError, Result};
use crate::store::{PhraseStore, compare_ranked, validate_phrase_text};
use crate::{
    ComparisonRecord, NewComparison, PhraseRecord, RatingUpdate, StoreHealth, StoreSnapshot,
};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct MemoryTables {
    phrases: BTreeMap<u32, PhraseRecord>,
    comparisons: Vec<ComparisonRecord>,
    last_phrase_id: u32,
    last_comparison_id: u32,
}

/// Phrases and comparisons held behind a single mutex, so every
/// operation is atomic with respect to every other.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<MemoryTables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryTables>> {
        self.tables
            .lock()
            .map_err(|_| RankerError::Store("memory store lock poisoned".to_string()))
    }
}

impl PhraseStore for MemoryStore {
    fn insert_phrase(&self, text: &str) -> Result<PhraseRecord> {
        let text = validate_phrase_text(text)?;
        let mut tables = self.lock()?;
        tables.last_phrase_id += 1;
        let record = PhraseRecord {
            phrase_id: tables.last_phrase_id,
            text,
            elo_rating: DEFAULT_RATING,
            created_at: Utc::now(),
        };
        tables.phrases.insert(record.phrase_id, record.clone());
        Ok(record)
    }

    fn get_phrase_ids(&self) -> Result<Vec<u32>> {
        Ok(self.lock()?.phrases.keys().copied().collect())
    }

    fn get_phrases_by_ids(&self, ids: &[u32]) -> Result<Vec<PhraseRecord>> {
        let tables = self.lock()?;
        Ok(tables
            .phrases
            .values()
            .filter(|p| ids.contains(&p.phrase_id))
            .cloned()
            .collect())
    }

    fn record_comparison_and_update_ratings(
        &self,
        comparison: &NewComparison,
        updates: &[RatingUpdate; 2],
    ) -> Result<ComparisonRecord> {
        let mut tables = self.lock()?;

        for id in [comparison.phrase1_id, comparison.phrase2_id, comparison.winner_id] {
            if !tables.phrases.contains_key(&id) {
                return Err(RankerError::NotFound(id));
            }
        }
        apply_guarded(&mut tables, updates)?;

        tables.last_comparison_id += 1;
        let record = ComparisonRecord {
            comparison_id: tables.last_comparison_id,
            phrase1_id: comparison.phrase1_id,
            phrase2_id: comparison.phrase2_id,
            winner_id: comparison.winner_id,
            created_at: Utc::now(),
        };
        tables.comparisons.push(record.clone());
        Ok(record)
    }

    fn get_phrases_ranked(&self) -> Result<Vec<PhraseRecord>> {
        let mut phrases: Vec<PhraseRecord> = self.lock()?.phrases.values().cloned().collect();
        phrases.sort_by(compare_ranked);
        Ok(phrases)
    }

    fn get_comparisons(&self) -> Result<Vec<ComparisonRecord>> {
        Ok(self.lock()?.comparisons.clone())
    }

    fn load_snapshot(&self) -> Result<StoreSnapshot> {
        let tables = self.lock()?;
        let mut phrases: Vec<PhraseRecord> = tables.phrases.values().cloned().collect();
        phrases.sort_by(compare_ranked);
        Ok(StoreSnapshot {
            phrases,
            comparisons: tables.comparisons.clone(),
        })
    }

    fn overwrite_ratings(&self, updates: &[RatingUpdate]) -> Result<()> {
        let mut tables = self.lock()?;
        apply_guarded(&mut tables, updates)
    }

    fn health_check(&self) -> Result<StoreHealth> {
        let _tables = self.lock()?;
        Ok(StoreHealth {
            connected: true,
            tables: vec!["comparisons".to_string(), "phrases".to_string()],
        })
    }
}

/// Check every update against the current ratings, then apply them all.
fn apply_guarded(tables: &mut MemoryTables, updates: &[RatingUpdate]) -> Result<()> {
    for update in updates {
        let current = tables
            .phrases
            .get(&update.phrase_id)
            .ok_or(RankerError::NotFound(update.phrase_id))?;
        if current.elo_rating != update.previous_rating {
            return Err(RankerError::StaleRating {
                phrase_id: update.phrase_id,
            });
        }
    }

    // All checks passed, nothing below can fail
    for update in updates {
        if let Some(phrase) = tables.phrases.get_mut(&update.phrase_id) {
            phrase.elo_rating = update.new_rating;
        }
    }
    Ok(())
}
