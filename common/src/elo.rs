//! Pairwise Elo rating updates.
//!
//! Ratings are unbounded floats. A long losing streak can push a rating
//! below zero; nothing here clamps it.

use serde::{Deserialize, Serialize};

/// Rating given to every newly created phrase.
pub const DEFAULT_RATING: f64 = 1500.0;
/// Maximum rating change from a single comparison.
pub const K_FACTOR: f64 = 32.0;
/// A rating difference of this size means 10:1 expected odds.
pub const RATING_SCALE: f64 = 400.0;

/// Which side of a comparison won.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    A,
    B,
}

impl Side {
    /// Resolve a winner id against the two compared ids.
    /// Returns `None` when the winner is neither of them.
    pub fn from_winner_id(phrase_a_id: u32, phrase_b_id: u32, winner_id: u32) -> Option<Self> {
        if winner_id == phrase_a_id {
            Some(Side::A)
        } else if winner_id == phrase_b_id {
            Some(Side::B)
        } else {
            None
        }
    }

    pub fn other(self) -> Self {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }
}

/// New ratings after one comparison, with the expected scores they were derived from.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RatingChange {
    pub rating_a: f64,
    pub rating_b: f64,
    pub expected_a: f64,
    pub expected_b: f64,
}

/// Expected scores for A and B using the logistic curve.
pub fn expected_scores(rating_a: f64, rating_b: f64) -> (f64, f64) {
    let expected_a = 1.0 / (1.0 + 10.0_f64.powf((rating_b - rating_a) / RATING_SCALE));
    (expected_a, 1.0 - expected_a)
}

/// Expected scores computed from transformed ratings `10^(r/400)`.
///
/// Mathematically identical to [`expected_scores`], but the transformed
/// values overflow for ratings above roughly 123,000.
pub fn expected_scores_transformed(rating_a: f64, rating_b: f64) -> (f64, f64) {
    let transformed_a = 10.0_f64.powf(rating_a / RATING_SCALE);
    let transformed_b = 10.0_f64.powf(rating_b / RATING_SCALE);
    let total = transformed_a + transformed_b;
    (transformed_a / total, transformed_b / total)
}

/// Apply one comparison outcome to a pair of ratings.
pub fn update_ratings(rating_a: f64, rating_b: f64, winner: Side) -> RatingChange {
    let (expected_a, expected_b) = expected_scores(rating_a, rating_b);
    let score_a = match winner {
        Side::A => 1.0,
        Side::B => 0.0,
    };
    let score_b = 1.0 - score_a;

    RatingChange {
        rating_a: rating_a + K_FACTOR * (score_a - expected_a),
        rating_b: rating_b + K_FACTOR * (score_b - expected_b),
        expected_a,
        expected_b,
    }
}
