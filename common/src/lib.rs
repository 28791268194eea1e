//! A library with common utilities for ranking phrases by pairwise comparison.

pub mod elo;
pub mod error;
pub mod memory_store;
pub mod pairing;
pub mod replay;
pub mod service;
pub mod store;

#[cfg(feature = "network")]
pub mod client_api;
#[cfg(feature = "database")]
pub mod db_util;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Longest phrase accepted, matching the width of the `phrases.text` column.
pub const MAX_PHRASE_LENGTH: usize = 255;

/// A phrase as stored, including its current rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraseRecord {
    pub phrase_id: u32,
    pub text: String,
    pub elo_rating: f64,
    pub created_at: DateTime<Utc>,
}

/// A single recorded comparison outcome. Never modified once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonRecord {
    pub comparison_id: u32,
    pub phrase1_id: u32,
    pub phrase2_id: u32,
    pub winner_id: u32,
    pub created_at: DateTime<Utc>,
}

/// A comparison that has been validated but not yet written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewComparison {
    pub phrase1_id: u32,
    pub phrase2_id: u32,
    pub winner_id: u32,
}

/// A rating write guarded by the rating it was computed from.
/// Stores must refuse the write if the phrase no longer holds `previous_rating`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingUpdate {
    pub phrase_id: u32,
    pub previous_rating: f64,
    pub new_rating: f64,
}

/// The persisted comparison along with both phrases as they stand afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonOutcome {
    pub comparison: ComparisonRecord,
    pub phrase1: PhraseRecord,
    pub phrase2: PhraseRecord,
}

/// Phrases and comparisons read together, so the ratings and the log agree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreSnapshot {
    pub phrases: Vec<PhraseRecord>,
    pub comparisons: Vec<ComparisonRecord>,
}

/// Result of a store diagnostic check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreHealth {
    pub connected: bool,
    pub tables: Vec<String>,
}

/// A phrase as sent over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraseData {
    pub id: u32,
    pub text: String,
    pub elo_rating: f64,
}

impl From<PhraseRecord> for PhraseData {
    fn from(record: PhraseRecord) -> Self {
        Self {
            id: record.phrase_id,
            text: record.text,
            elo_rating: record.elo_rating,
        }
    }
}

/// Body of a phrase submission. Fields are optional so a missing value
/// can be reported as a validation failure instead of a parse failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPhraseData {
    pub text: Option<String>,
}

/// Body of a comparison vote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonData {
    pub phrase1_id: Option<u32>,
    pub phrase2_id: Option<u32>,
    pub winner_id: Option<u32>,
}

/// Response to a successful comparison vote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResultData {
    pub message: String,
    pub comparison_id: u32,
    pub phrase1: PhraseData,
    pub phrase2: PhraseData,
}

impl From<ComparisonOutcome> for ComparisonResultData {
    fn from(outcome: ComparisonOutcome) -> Self {
        Self {
            message: "Ratings updated successfully".to_string(),
            comparison_id: outcome.comparison.comparison_id,
            phrase1: outcome.phrase1.into(),
            phrase2: outcome.phrase2.into(),
        }
    }
}

/// Generic `{message}` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageData {
    pub message: String,
}

/// Error body returned by the API for any failed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorData {
    pub error: String,
    pub message: String,
}
