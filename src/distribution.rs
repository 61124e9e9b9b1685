//! Helpers for working with discrete distributions: building a cumulative distribution from a
//! probability mass function, inverting it with a uniform draw, and locating a value among
//! ordered breakpoints.
//!
//! The same binary search serves two purposes in the model. The *left* insertion point inverts
//! a CDF (the bucket whose cumulative mass first reaches the draw), while the *right* insertion
//! point counts how many breakpoints are `<=` a value, which is how the current stage of an
//! infection timeline is found.

use crate::rand::Rng;

/// Returns the running partial sums of `pmf`.
///
/// The last element equals 1.0 only if `pmf` is a valid probability mass function; that is
/// checked where parameters are validated, not here.
#[must_use]
pub fn cumulative(pmf: &[f64]) -> Vec<f64> {
    pmf.iter()
        .scan(0.0, |sum, p| {
            *sum += p;
            Some(*sum)
        })
        .collect()
}

/// Returns the leftmost index at which `x` could be inserted into `sorted` while keeping it
/// ordered. If `x` is already present, this is the index of its first occurrence.
pub fn insertion_point_left<T: PartialOrd>(sorted: &[T], x: &T) -> usize {
    let (mut lo, mut hi) = (0, sorted.len());
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if sorted[mid] < *x {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

/// Returns the rightmost index at which `x` could be inserted into `sorted` while keeping it
/// ordered, i.e. the number of elements `<= x`.
pub fn insertion_point_right<T: PartialOrd>(sorted: &[T], x: &T) -> usize {
    let (mut lo, mut hi) = (0, sorted.len());
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if *x < sorted[mid] {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    lo
}

/// Maps a uniform draw in `[0, 1)` to a bucket of the distribution whose cumulative form is
/// `cdf`. A CDF whose last element falls slightly short of 1.0 through rounding would
/// otherwise yield an out-of-range bucket, so the result is clamped to the last bucket.
///
/// # Panics
///
/// Panics if `cdf` is empty.
#[must_use]
pub fn invert_cdf(cdf: &[f64], uniform: f64) -> usize {
    assert!(!cdf.is_empty(), "cannot invert an empty distribution");
    insertion_point_left(cdf, &uniform).min(cdf.len() - 1)
}

/// Draws a bucket from `cdf` using `rng`.
pub fn sample_cdf<R: Rng>(rng: &mut R, cdf: &[f64]) -> usize {
    let uniform: f64 = rng.random();
    invert_cdf(cdf, uniform)
}

/// Samples `n` distinct elements of `collection` uniformly without replacement, returning each
/// together with its index in `collection`. Requests larger than the collection return every
/// element (in shuffled order).
pub fn sample_with_indices<'a, T, R>(
    rng: &mut R,
    collection: &'a [T],
    n: usize,
) -> Vec<(&'a T, usize)>
where
    R: Rng,
{
    let len = collection.len();
    if n == 0 || len == 0 {
        return Vec::new();
    }
    if n == 1 {
        let idx = rng.random_range(0..len);
        return vec![(&collection[idx], idx)];
    }

    // Partial Fisher-Yates: only the first `n` positions need to be settled.
    let n = n.min(len);
    let mut indices: Vec<usize> = (0..len).collect();
    for k in 0..n {
        let j = rng.random_range(k..len);
        indices.swap(k, j);
    }
    indices
        .into_iter()
        .take(n)
        .map(|idx| (&collection[idx], idx))
        .collect()
}
