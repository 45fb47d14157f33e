//! Level-wise candidate generation with downward-closure pruning.

use crate::pattern::{drop_first_item, drop_last_item, item_count, singleton, sub_patterns, Alphabet, Pattern};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use tracing::trace;

#[derive(Copy, Clone, Debug, Default)]
pub struct CandidateGenerator {
    /// Also grow patterns by adding items to an existing element.
    concurrent: bool,
}

impl CandidateGenerator {
    pub fn new(concurrent: bool) -> Self {
        Self { concurrent }
    }

    /// Level-1 candidates: one singleton element per distinct item.
    pub fn initial(&self, alphabet: &Alphabet) -> HashSet<Pattern> {
        (0..alphabet.len()).map(|item| vec![singleton(item)]).collect()
    }

    /// Candidates one item longer than the (uniform-length) frequent set.
    pub fn next(&self, frequent: &HashSet<Pattern>) -> HashSet<Pattern> {
        let level = match frequent.iter().next() {
            Some(pattern) => item_count(pattern),
            None => return HashSet::new(),
        };

        let joined = if level == 1 {
            self.join_items(frequent)
        } else {
            self.join_overlapping(frequent)
        };
        let generated = joined.len();

        let candidates: HashSet<Pattern> = joined
            .into_par_iter()
            .filter(|candidate| {
                sub_patterns(candidate)
                    .iter()
                    .all(|sub| frequent.contains(sub))
            })
            .collect();

        trace!(level = level + 1, generated, kept = candidates.len(), "candidates pruned");
        candidates
    }

    // <{a}> & <{b}> give <{a},{b}> for every ordered pair and <{a,b}> for a < b.
    fn join_items(&self, frequent: &HashSet<Pattern>) -> HashSet<Pattern> {
        let mut items: Vec<usize> = frequent
            .iter()
            .filter_map(|pattern| pattern[0].iter().next())
            .collect();
        items.sort_unstable();

        let mut result = HashSet::new();
        for &a in &items {
            for &b in &items {
                result.insert(vec![singleton(a), singleton(b)]);
                if self.concurrent && a < b {
                    let mut both = singleton(a);
                    both.insert(b);
                    result.insert(vec![both]);
                }
            }
        }
        result
    }

    // A joins B when A without its first item equals B without its last item.
    fn join_overlapping(&self, frequent: &HashSet<Pattern>) -> HashSet<Pattern> {
        let mut by_prefix: HashMap<Pattern, Vec<&Pattern>> = HashMap::new();
        for pattern in frequent {
            by_prefix.entry(drop_last_item(pattern)).or_default().push(pattern);
        }

        frequent
            .par_iter()
            .flat_map_iter(|pattern_a| {
                let suffix = drop_first_item(pattern_a);
                let partners = by_prefix.get(&suffix).map(Vec::as_slice).unwrap_or(&[]);
                partners
                    .iter()
                    .flat_map(move |pattern_b| self.join(pattern_a, pattern_b))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    fn join(&self, pattern_a: &Pattern, pattern_b: &Pattern) -> Vec<Pattern> {
        let mut result = Vec::with_capacity(2);
        let (last_b, last_a) = match (pattern_b.last(), pattern_a.last()) {
            (Some(last_b), Some(last_a)) => (last_b, last_a),
            _ => return result,
        };
        let item = match last_b.iter().last() {
            Some(item) => item,
            None => return result,
        };

        // Produce A -> x
        if last_b.len() == 1 {
            let mut pattern = pattern_a.clone();
            pattern.push(singleton(item));
            result.push(pattern);
        }

        // Produce A with x folded into its last element
        if (last_b.len() > 1 || self.concurrent) && !last_a.contains(item) {
            let mut pattern = pattern_a.clone();
            if let Some(last) = pattern.last_mut() {
                last.insert(item);
            }
            result.push(pattern);
        }

        result
    }
}
