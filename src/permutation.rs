//! Draw sequences: a permutation written as successive picks from a shrinking pool
//!
//! Draw `i` is an index into the pool that remains after the first `i` picks,
//! so it lies in `0..N - i`. The last pick always comes from a pool of one and
//! is never stored, which leaves `N - 1` draws for `N` items.

use crate::error::{RankError, RankResult};
use rand::Rng;

/// Number of draws that fully describe a permutation of `item_count` items
pub fn draw_count(item_count: usize) -> usize {
    item_count.saturating_sub(1)
}

/// Check every draw against the size of the pool it picks from
pub fn validate_draws(item_count: usize, draws: &[usize]) -> RankResult<()> {
    for (position, &value) in draws.iter().enumerate() {
        let pool = item_count.saturating_sub(position);
        if value >= pool {
            return Err(RankError::invalid_draw(position, value, pool));
        }
    }
    Ok(())
}

/// Fill the missing suffix of `draws` with uniform random picks
///
/// Existing draws are kept, a trailing pick from a pool of one is dropped.
pub fn complete_draws<R: Rng + ?Sized>(
    item_count: usize,
    draws: &mut Vec<usize>,
    rng: &mut R,
) -> RankResult<()> {
    validate_draws(item_count, draws)?;
    let needed = draw_count(item_count);
    draws.truncate(needed);
    for position in draws.len()..needed {
        draws.push(rng.gen_range(0..item_count - position));
    }
    Ok(())
}

/// A fresh random draw sequence for `item_count` items
pub fn random_draws<R: Rng + ?Sized>(item_count: usize, rng: &mut R) -> Vec<usize> {
    (0..draw_count(item_count))
        .map(|position| rng.gen_range(0..item_count - position))
        .collect()
}

/// Expand a complete draw sequence into the permutation it describes
pub fn permutation_from_draws(item_count: usize, draws: &[usize]) -> RankResult<Vec<usize>> {
    validate_draws(item_count, draws)?;
    if draws.len() < draw_count(item_count) {
        return Err(RankError::internal(&format!(
            "{} draws cannot describe {item_count} items",
            draws.len()
        )));
    }

    let mut pool: Vec<usize> = (0..item_count).collect();
    let mut order = Vec::with_capacity(item_count);
    for position in 0..item_count {
        let pick = draws.get(position).copied().unwrap_or(0);
        order.push(pool.remove(pick));
    }
    Ok(order)
}
