//! Storage port for phrases and comparisons.

use crate::error::{RankerError, Result};
use crate::{
    ComparisonRecord, MAX_PHRASE_LENGTH, NewComparison, PhraseRecord, RatingUpdate, StoreHealth,
    StoreSnapshot,
};
use std::cmp::Ordering;

/// Persistence operations the ranking service relies on.
///
/// Implementations must be thread-safe; a single handle is shared by every
/// request. Phrases and comparisons are never deleted.
pub trait PhraseStore: Send + Sync {
    /// Create a phrase with the default rating.
    fn insert_phrase(&self, text: &str) -> Result<PhraseRecord>;

    /// Every phrase id, ascending.
    fn get_phrase_ids(&self) -> Result<Vec<u32>>;

    /// The phrases with the given ids, ascending by id. Unknown ids are skipped.
    fn get_phrases_by_ids(&self, ids: &[u32]) -> Result<Vec<PhraseRecord>>;

    /// Write a comparison and both rating updates as one unit.
    ///
    /// If any phrase's stored rating differs from its update's
    /// `previous_rating`, nothing is written and
    /// [`RankerError::StaleRating`] is returned.
    fn record_comparison_and_update_ratings(
        &self,
        comparison: &NewComparison,
        updates: &[RatingUpdate; 2],
    ) -> Result<ComparisonRecord>;

    /// Every phrase, highest rating first, ties by ascending id.
    fn get_phrases_ranked(&self) -> Result<Vec<PhraseRecord>>;

    /// Every comparison in the order it was recorded.
    fn get_comparisons(&self) -> Result<Vec<ComparisonRecord>>;

    /// Every phrase (ranked) and every comparison, read as one consistent view.
    fn load_snapshot(&self) -> Result<StoreSnapshot>;

    /// Apply several guarded rating writes as one unit.
    ///
    /// Nothing is written if any phrase is unknown ([`RankerError::NotFound`])
    /// or no longer holds its `previous_rating` ([`RankerError::StaleRating`]).
    fn overwrite_ratings(&self, updates: &[RatingUpdate]) -> Result<()>;

    fn health_check(&self) -> Result<StoreHealth>;
}

/// Trim a submitted phrase and check it fits.
///
/// # Errors
/// Returns [`RankerError::Validation`] if the text is blank or too long.
pub fn validate_phrase_text(text: &str) -> Result<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(RankerError::Validation(
            "Phrase text is required".to_string(),
        ));
    }
    let length = trimmed.chars().count();
    if length > MAX_PHRASE_LENGTH {
        return Err(RankerError::Validation(format!(
            "Phrase text is too long ({length} characters, maximum {MAX_PHRASE_LENGTH})"
        )));
    }
    Ok(trimmed.to_string())
}

/// Updates in ascending phrase id order. Rows are always locked in this
/// order so two writers touching the same phrases cannot deadlock.
pub fn sorted_by_phrase_id(updates: &[RatingUpdate]) -> Vec<RatingUpdate> {
    let mut sorted = updates.to_vec();
    sorted.sort_by_key(|u| u.phrase_id);
    sorted
}

/// Ranking order: rating descending, then id ascending.
pub fn compare_ranked(a: &PhraseRecord, b: &PhraseRecord) -> Ordering {
    b.elo_rating
        .total_cmp(&a.elo_rating)
        .then(a.phrase_id.cmp(&b.phrase_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn phrase(phrase_id: u32, elo_rating: f64) -> PhraseRecord {
        PhraseRecord {
            phrase_id,
            text: format!("phrase {phrase_id}"),
            elo_rating,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_validate_phrase_text() {
        assert_eq!(validate_phrase_text("foo").unwrap(), "foo");
        assert_eq!(validate_phrase_text("  foo bar \n").unwrap(), "foo bar");
        assert!(matches!(
            validate_phrase_text(""),
            Err(RankerError::Validation(_))
        ));
        assert!(matches!(
            validate_phrase_text(" \t\n "),
            Err(RankerError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_phrase_text_length() {
        let longest = "x".repeat(MAX_PHRASE_LENGTH);
        assert_eq!(validate_phrase_text(&longest).unwrap(), longest);
        let too_long = "x".repeat(MAX_PHRASE_LENGTH + 1);
        assert!(matches!(
            validate_phrase_text(&too_long),
            Err(RankerError::Validation(_))
        ));
        // multibyte characters count once each
        let accented = "é".repeat(MAX_PHRASE_LENGTH);
        assert!(validate_phrase_text(&accented).is_ok());
    }

    #[test]
    fn test_compare_ranked() {
        let mut phrases = vec![
            phrase(1, 1484.0),
            phrase(4, 1500.0),
            phrase(2, 1516.0),
            phrase(3, 1500.0),
        ];
        phrases.sort_by(compare_ranked);
        let ids: Vec<u32> = phrases.iter().map(|p| p.phrase_id).collect();
        assert_eq!(ids, vec![2, 3, 4, 1]);
    }

    #[test]
    fn test_sorted_by_phrase_id() {
        let update = |phrase_id| RatingUpdate {
            phrase_id,
            previous_rating: 1500.0,
            new_rating: 1516.0,
        };
        // A vote on (2, 1) locks the same rows in the same order as one on (1, 2)
        let reversed = sorted_by_phrase_id(&[update(2), update(1)]);
        let forward = sorted_by_phrase_id(&[update(1), update(2)]);
        assert_eq!(reversed, forward);
        let ids: Vec<u32> = reversed.iter().map(|u| u.phrase_id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert!(sorted_by_phrase_id(&[]).is_empty());
    }
}
