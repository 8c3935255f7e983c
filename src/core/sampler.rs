/// Weighted random choice over parallel item/weight slices.

use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::rngs::StdRng;
use rand::Rng;
use thiserror::Error;

/// Caller contract violations. Data conditions never produce these.
#[derive(Debug, Error, PartialEq)]
pub enum SampleError {
    #[error("cannot sample from an empty item list")]
    Empty,
    #[error("{items} items but {weights} weights")]
    LengthMismatch { items: usize, weights: usize },
    #[error("weight at index {index} is negative or not finite: {weight}")]
    InvalidWeight { index: usize, weight: f64 },
}

/// Pick one item with probability proportional to its weight.
///
/// Zero weights are never chosen unless every weight is zero, in which case
/// the pick is uniform.
pub fn weighted_pick<'a, T>(
    items: &'a [T],
    weights: &[f64],
    rng: &mut StdRng,
) -> Result<&'a T, SampleError> {
    if items.is_empty() {
        return Err(SampleError::Empty);
    }
    if items.len() != weights.len() {
        return Err(SampleError::LengthMismatch {
            items: items.len(),
            weights: weights.len(),
        });
    }
    if let Some((index, &weight)) = weights
        .iter()
        .enumerate()
        .find(|(_, w)| !w.is_finite() || **w < 0.0)
    {
        return Err(SampleError::InvalidWeight { index, weight });
    }

    if weights.iter().all(|w| *w == 0.0) {
        return Ok(&items[rng.gen_range(0..items.len())]);
    }

    let total: f64 = weights.iter().sum();
    let dist = if total.is_finite() {
        WeightedIndex::new(weights)
    } else {
        // Every weight is finite but their sum overflows.
        let max = weights.iter().cloned().fold(0.0, f64::max);
        WeightedIndex::new(weights.iter().map(|w| w / max))
    }
    .map_err(|_| SampleError::Empty)?;
    Ok(&items[dist.sample(rng)])
}

/// Pick one item, reading each weight from the item itself.
pub fn weighted_pick_by<'a, T, F>(
    items: &'a [T],
    weight_of: F,
    rng: &mut StdRng,
) -> Result<&'a T, SampleError>
where
    F: Fn(&T) -> f64,
{
    let weights: Vec<f64> = items.iter().map(|i| sanitize_weight(weight_of(i))).collect();
    weighted_pick(items, &weights, rng)
}

/// Catalog weights are data: negative or non-finite values count as zero.
pub fn sanitize_weight(weight: f64) -> f64 {
    if weight.is_finite() && weight > 0.0 {
        weight
    } else {
        0.0
    }
}
