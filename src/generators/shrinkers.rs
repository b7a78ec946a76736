//! Candidate simplification schemes shared by the built-in generators:
//! halving shrinks for numerics, and chunk-removal shrinks for sequences
//! and maps, adapted from the classic QuickCheck list shrinker.

use std::cmp::min;

use crate::value::Value;

/// Halving steps attempted per numeric shrink; bounds the candidate list
/// even for values with enormous magnitudes.
const MAX_HALVINGS: usize = 64;

/// Candidates for an integral value: emit `x - y` and `y` while halving `y`
/// toward zero, widen each to its ±1 neighbours, and keep only those of
/// strictly smaller magnitude. Terminates in O(log n) steps and never
/// emits a candidate as large as the original.
pub fn integral_shrink(x: i128) -> Vec<i128> {
    let mut candidates = Vec::new();
    let mut y = x;
    for _ in 0..MAX_HALVINGS {
        if y == 0 {
            break;
        }
        candidates.push(x - y);
        candidates.push(y);
        y /= 2;
    }
    candidates
        .iter()
        .flat_map(|&c| vec![c - 1, c, c + 1])
        .filter(|&c| c.abs() < x.abs())
        .collect()
}

/// Candidates for a float: NaN and +∞ (conventionally simplest) plus an
/// integral-style halving sequence. Callers filter by score; this only
/// enumerates.
pub fn float_shrink(x: f64) -> Vec<f64> {
    let mut candidates = vec![f64::NAN, f64::INFINITY];
    if x.is_finite() {
        let mut y = x;
        for _ in 0..MAX_HALVINGS {
            if y.trunc() == 0.0 {
                break;
            }
            candidates.push(x - y);
            candidates.push(y);
            y = (y / 2.0).trunc();
        }
    }
    candidates
        .iter()
        .flat_map(|&c| vec![c - 1.0, c, c + 1.0])
        .collect()
}

/// Every way of removing chunks of `k` items from `xs` (of length `n`):
/// the remainder after dropping the first `k`, then recursively the same
/// with the dropped prefix reattached.
pub fn list_remove<T: Clone>(k: usize, n: usize, xs: &[T]) -> Vec<Vec<T>> {
    let cut = min(k, xs.len());
    let (xs1, xs2) = xs.split_at(cut);
    if k > n {
        Vec::new()
    } else if xs2.is_empty() {
        vec![Vec::new()]
    } else {
        let mut out = vec![xs2.to_vec()];
        for ys in list_remove(k, n - k, xs2) {
            let mut kept = xs1.to_vec();
            kept.extend(ys);
            out.push(kept);
        }
        out
    }
}

/// Shrinks each element in place, one at a time, holding the rest fixed.
pub fn shrink_each<T, F>(f: &F, xs: &[T]) -> Vec<Vec<T>>
where
    T: Clone,
    F: Fn(&T) -> Vec<T>,
{
    match xs.split_first() {
        None => Vec::new(),
        Some((x, rest)) => {
            let mut out: Vec<Vec<T>> = f(x)
                .into_iter()
                .map(|y| {
                    let mut shrunk = Vec::with_capacity(xs.len());
                    shrunk.push(y);
                    shrunk.extend_from_slice(rest);
                    shrunk
                })
                .collect();
            for tail in shrink_each(f, rest) {
                let mut shrunk = Vec::with_capacity(xs.len());
                shrunk.push(x.clone());
                shrunk.extend(tail);
                out.push(shrunk);
            }
            out
        }
    }
}

/// The full sequence shrink: the empty list, chunk removals of halving
/// sizes, then per-element shrinks via `f`.
pub fn list_shrink<T, F>(f: &F, xs: &[T]) -> Vec<Vec<T>>
where
    T: Clone,
    F: Fn(&T) -> Vec<T>,
{
    let mut candidates = vec![Vec::new()];
    let n = xs.len();
    let mut k = n;
    while k > 0 {
        candidates.extend(list_remove(k, n, xs));
        k /= 2;
    }
    candidates.extend(shrink_each(f, xs));
    candidates
}

/// Chunk removal over key/value pairs: both halves survive as candidates,
/// and pairing is preserved throughout.
pub fn map_remove(k: usize, n: usize, pairs: &[(Value, Value)]) -> Vec<Vec<(Value, Value)>> {
    let cut = min(k, pairs.len());
    let (xs1, xs2) = pairs.split_at(cut);
    if k > n {
        Vec::new()
    } else if xs2.is_empty() {
        vec![Vec::new()]
    } else {
        let mut out = vec![xs1.to_vec(), xs2.to_vec()];
        for ys in list_remove(k, n - k, xs2) {
            let mut kept = xs1.to_vec();
            kept.extend(ys);
            out.push(kept);
        }
        out
    }
}

/// Removal-based map shrink over halving chunk sizes.
pub fn map_shrink(pairs: &[(Value, Value)]) -> Vec<Vec<(Value, Value)>> {
    let mut candidates = Vec::new();
    let n = pairs.len();
    let mut k = n;
    while k > 0 {
        candidates.extend(map_remove(k, n, pairs));
        k /= 2;
    }
    candidates
}
