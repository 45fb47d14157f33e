//! Subsequence containment and support counting.

use crate::database::SequenceDatabase;
use crate::pattern::{ItemSet, Pattern};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};

/// Whether `pattern` occurs in `sequence` with order preserved.
///
/// Each pattern element must be a subset of a distinct sequence element,
/// matched positions strictly increasing. Gaps are allowed, so taking the
/// earliest match for every pattern element is never worse than any other.
pub fn contains(sequence: &[ItemSet], pattern: &[ItemSet]) -> bool {
    let mut next = 0;
    for element in sequence {
        if next == pattern.len() {
            break;
        }
        if pattern[next].is_subset(element) {
            next += 1;
        }
    }
    next == pattern.len()
}

/// Number of subjects whose sequence contains `pattern`.
pub fn count(db: &SequenceDatabase, pattern: &[ItemSet]) -> usize {
    db.sequences()
        .iter()
        .filter(|sequence| contains(&sequence.elements, pattern))
        .count()
}

/// Support of every candidate, counted in parallel. Results are only
/// returned once all scans are done.
pub fn count_all(db: &SequenceDatabase, candidates: &HashSet<Pattern>) -> HashMap<Pattern, usize> {
    candidates
        .par_iter()
        .map(|candidate| (candidate.clone(), count(db, candidate)))
        .collect()
}
