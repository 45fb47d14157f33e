//! Level-wise (GSP style) miner.
//!
//! Every requested threshold keeps its own lattice of frequent patterns,
//! but each level is counted once: the union of all lattices' candidates
//! is scanned against the database and the counts are shared.

use crate::candidate::CandidateGenerator;
use crate::config::MinSupport;
use crate::database::SequenceDatabase;
use crate::error::{MiningError, Result};
use crate::pattern::{item_count, Alphabet, ItemSet, Pattern};
use crate::support;
use rayon::prelude::*;
use std::cmp::Reverse;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Shared flag checked between levels.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MinerState {
    Initializing,
    Mining(usize),
    Done,
}

/// A pattern together with the number of subjects containing it.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct FrequentPattern {
    pub pattern: Pattern,
    pub support: usize,
}

impl FrequentPattern {
    pub fn length(&self) -> usize {
        item_count(&self.pattern)
    }

    pub fn ratio(&self, subjects: usize) -> f64 {
        if subjects == 0 {
            0.0
        } else {
            self.support as f64 / subjects as f64
        }
    }
}

/// Frequent patterns of one threshold, `levels[k - 1]` holding length `k`.
#[derive(Clone, Debug, PartialEq)]
pub struct ThresholdResult {
    pub threshold: MinSupport,
    pub min_count: usize,
    pub levels: Vec<Vec<FrequentPattern>>,
}

impl ThresholdResult {
    pub fn level(&self, length: usize) -> &[FrequentPattern] {
        length
            .checked_sub(1)
            .and_then(|idx| self.levels.get(idx))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn patterns(&self) -> impl Iterator<Item = &FrequentPattern> {
        self.levels.iter().flatten()
    }

    pub fn contains(&self, pattern: &[ItemSet]) -> bool {
        self.level(item_count(pattern))
            .iter()
            .any(|record| record.pattern == pattern)
    }
}

#[derive(Clone, Debug)]
pub struct MiningResult {
    pub partition: String,
    pub concurrent: bool,
    pub alphabet: Alphabet,
    pub subject_count: usize,
    pub thresholds: Vec<ThresholdResult>,
    pub elapsed: Duration,
}

struct Lattice {
    min_count: usize,
    candidates: HashSet<Pattern>,
    levels: Vec<Vec<FrequentPattern>>,
    active: bool,
}

pub struct Miner {
    db: SequenceDatabase,
    generator: CandidateGenerator,
    concurrent: bool,
    max_length: Option<usize>,
    partition: String,
    state: MinerState,
}

impl Miner {
    pub fn new(db: SequenceDatabase, concurrent: bool) -> Self {
        Self {
            db,
            generator: CandidateGenerator::new(concurrent),
            concurrent,
            max_length: None,
            partition: "all".to_string(),
            state: MinerState::Initializing,
        }
    }

    pub fn with_max_length(mut self, max_length: Option<usize>) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn with_partition(mut self, partition: impl Into<String>) -> Self {
        self.partition = partition.into();
        self
    }

    pub fn state(&self) -> MinerState {
        self.state
    }

    /// Mine every threshold until each lattice runs dry.
    pub fn mine(&mut self, thresholds: &[MinSupport], cancel: &CancellationToken) -> Result<MiningResult> {
        let started = Instant::now();
        self.state = MinerState::Initializing;

        if self.db.is_empty() {
            return Err(MiningError::empty(&self.partition));
        }
        if thresholds.is_empty() {
            return Err(MiningError::unsupported("min_support", "at least one threshold is required"));
        }

        let subjects = self.db.subject_count();
        let initial = self.generator.initial(self.db.alphabet());
        let mut lattices: Vec<Lattice> = thresholds
            .iter()
            .map(|threshold| Lattice {
                min_count: threshold.resolve(subjects),
                candidates: initial.clone(),
                levels: Vec::new(),
                active: true,
            })
            .collect();

        info!(
            partition = %self.partition,
            subjects,
            items = self.db.alphabet().len(),
            thresholds = thresholds.len(),
            "mining started"
        );

        let mut level = 1;
        loop {
            if cancel.is_cancelled() {
                info!(partition = %self.partition, level, "mining cancelled");
                return Err(MiningError::Cancelled);
            }
            self.state = MinerState::Mining(level);

            let union: HashSet<Pattern> = lattices
                .iter()
                .filter(|lattice| lattice.active)
                .flat_map(|lattice| lattice.candidates.iter().cloned())
                .collect();
            let counts = support::count_all(&self.db, &union);

            for lattice in lattices.iter_mut().filter(|lattice| lattice.active) {
                let min_count = lattice.min_count;
                let mut frequent: Vec<FrequentPattern> = lattice
                    .candidates
                    .drain()
                    .filter_map(|pattern| {
                        let support = counts.get(&pattern).copied().unwrap_or(0);
                        if support >= min_count {
                            Some(FrequentPattern { pattern, support })
                        } else {
                            None
                        }
                    })
                    .collect();
                frequent.sort_unstable_by(|a, b| {
                    (Reverse(a.support), &a.pattern).cmp(&(Reverse(b.support), &b.pattern))
                });

                debug!(level, min_count, frequent = frequent.len(), "level filtered");
                if frequent.is_empty() {
                    lattice.active = false;
                } else {
                    lattice.levels.push(frequent);
                }
            }

            info!(
                partition = %self.partition,
                level,
                candidates = union.len(),
                "level counted"
            );

            if self.max_length.map_or(false, |max| level >= max) {
                break;
            }

            let generator = self.generator;
            lattices
                .par_iter_mut()
                .filter(|lattice| lattice.active)
                .for_each(|lattice| {
                    let frontier: HashSet<Pattern> = lattice
                        .levels
                        .last()
                        .map(|records| records.iter().map(|record| record.pattern.clone()).collect())
                        .unwrap_or_default();
                    lattice.candidates = generator.next(&frontier);
                    if lattice.candidates.is_empty() {
                        lattice.active = false;
                    }
                });

            if lattices.iter().all(|lattice| !lattice.active) {
                break;
            }
            level += 1;
        }

        self.state = MinerState::Done;
        let elapsed = started.elapsed();
        info!(partition = %self.partition, levels = level, ?elapsed, "mining finished");

        Ok(MiningResult {
            partition: self.partition.clone(),
            concurrent: self.concurrent,
            alphabet: self.db.alphabet().clone(),
            subject_count: subjects,
            thresholds: thresholds
                .iter()
                .zip(lattices)
                .map(|(&threshold, lattice)| ThresholdResult {
                    threshold,
                    min_count: lattice.min_count,
                    levels: lattice.levels,
                })
                .collect(),
            elapsed,
        })
    }
}
