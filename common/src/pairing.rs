//! Choosing which two phrases to put head-to-head.

use crate::error::{RankerError, Result};
use rand::Rng;
use rand::seq::index;

/// Pick two distinct ids uniformly at random.
///
/// # Errors
/// Returns [`RankerError::NotEnoughData`] if fewer than two ids are available.
pub fn choose_pair<R: Rng + ?Sized>(ids: &[u32], rng: &mut R) -> Result<(u32, u32)> {
    if ids.len() < 2 {
        return Err(RankerError::NotEnoughData {
            available: ids.len(),
        });
    }
    let picked = index::sample(rng, ids.len(), 2);
    Ok((ids[picked.index(0)], ids[picked.index(1)]))
}
