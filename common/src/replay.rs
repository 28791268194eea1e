//! Rebuild ratings from the comparison log and compare them with stored ratings.
//!
//! Stored ratings are updated incrementally and never recomputed, so this is
//! the only way to confirm that every phrase's rating still equals the
//! default rating plus the effect of every comparison it took part in.

use crate::elo::{self, DEFAULT_RATING, Side};
use crate::error::{RankerError, Result};
use crate::{ComparisonRecord, PhraseRecord, RatingUpdate};
use std::collections::BTreeMap;

/// A phrase whose stored rating disagrees with its replayed rating.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingDrift {
    pub phrase_id: u32,
    pub stored_rating: f64,
    pub replayed_rating: f64,
}

impl RatingDrift {
    pub fn difference(&self) -> f64 {
        self.stored_rating - self.replayed_rating
    }

    /// A write that restores the replayed rating, refused by the store if
    /// the phrase has moved off its stored rating since it was read.
    pub fn correction(&self) -> RatingUpdate {
        RatingUpdate {
            phrase_id: self.phrase_id,
            previous_rating: self.stored_rating,
            new_rating: self.replayed_rating,
        }
    }
}

/// Summary of a replay pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayReport {
    pub ratings: BTreeMap<u32, f64>,
    pub applied: usize,
    pub skipped: Vec<u32>,
}

/// Replay every comparison in creation order, starting each phrase at the default rating.
///
/// Comparisons whose winner is neither compared phrase are skipped and
/// listed in the report; they cannot be scored.
///
/// # Errors
/// Returns [`RankerError::NotFound`] if a comparison references an unknown phrase.
pub fn replay_ratings(
    phrases: &[PhraseRecord],
    comparisons: &[ComparisonRecord],
) -> Result<ReplayReport> {
    let mut ratings: BTreeMap<u32, f64> = phrases
        .iter()
        .map(|p| (p.phrase_id, DEFAULT_RATING))
        .collect();

    let mut ordered: Vec<&ComparisonRecord> = comparisons.iter().collect();
    ordered.sort_by_key(|c| (c.created_at, c.comparison_id));

    let mut applied = 0;
    let mut skipped = Vec::new();
    for comparison in ordered {
        let rating_a = *ratings
            .get(&comparison.phrase1_id)
            .ok_or(RankerError::NotFound(comparison.phrase1_id))?;
        let rating_b = *ratings
            .get(&comparison.phrase2_id)
            .ok_or(RankerError::NotFound(comparison.phrase2_id))?;

        let Some(winner) = Side::from_winner_id(
            comparison.phrase1_id,
            comparison.phrase2_id,
            comparison.winner_id,
        ) else {
            log::warn!(
                "Comparison #{} has winner #{} which is not one of #{} and #{}, skipping",
                comparison.comparison_id,
                comparison.winner_id,
                comparison.phrase1_id,
                comparison.phrase2_id
            );
            skipped.push(comparison.comparison_id);
            continue;
        };

        let change = elo::update_ratings(rating_a, rating_b, winner);
        ratings.insert(comparison.phrase1_id, change.rating_a);
        ratings.insert(comparison.phrase2_id, change.rating_b);
        applied += 1;
    }

    Ok(ReplayReport {
        ratings,
        applied,
        skipped,
    })
}

/// Phrases whose stored rating is more than `tolerance` away from the replayed one.
pub fn find_drift(
    phrases: &[PhraseRecord],
    replayed: &BTreeMap<u32, f64>,
    tolerance: f64,
) -> Vec<RatingDrift> {
    phrases
        .iter()
        .filter_map(|p| {
            let replayed_rating = *replayed.get(&p.phrase_id)?;
            ((p.elo_rating - replayed_rating).abs() > tolerance).then_some(RatingDrift {
                phrase_id: p.phrase_id,
                stored_rating: p.elo_rating,
                replayed_rating,
            })
        })
        .collect()
}
