//! A complete run: partition rows by category, mine each partition and
//! hand the results to the output writers.

use crate::aggregate::{RunSummary, SupportTable};
use crate::config::{RunConfig, RunMode};
use crate::database::{EventRow, SequenceDatabase};
use crate::error::{MiningError, Result};
use crate::miner::{CancellationToken, Miner, MiningResult};
use crate::output;
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{info, warn};

pub const ALL_CATEGORIES: &str = "all";
const UNCATEGORIZED: &str = "uncategorized";

/// Rows selected for one lattice.
#[derive(Clone, Debug)]
pub struct Partition<'a> {
    pub label: String,
    pub rows: Vec<&'a EventRow>,
}

/// Split rows per the category filter and run mode.
pub fn partition<'a>(rows: &'a [EventRow], config: &RunConfig) -> Vec<Partition<'a>> {
    let selected = |row: &EventRow| {
        config.categories.is_empty()
            || row
                .category
                .as_ref()
                .map_or(false, |category| config.categories.contains(category))
    };

    match config.mode {
        RunMode::Together => {
            let label = if config.categories.is_empty() {
                ALL_CATEGORIES.to_string()
            } else {
                config.categories.iter().cloned().collect::<Vec<_>>().join("+")
            };
            vec![Partition {
                label,
                rows: rows.iter().filter(|row| selected(row)).collect(),
            }]
        }
        RunMode::Separate => {
            let labels: BTreeSet<String> = if config.categories.is_empty() {
                rows.iter()
                    .map(|row| row.category.clone().unwrap_or_else(|| UNCATEGORIZED.to_string()))
                    .collect()
            } else {
                config.categories.clone()
            };
            labels
                .into_iter()
                .map(|label| {
                    let rows = rows
                        .iter()
                        .filter(|row| {
                            row.category.as_deref().unwrap_or(UNCATEGORIZED) == label
                                && selected(row)
                        })
                        .collect();
                    Partition { label, rows }
                })
                .collect()
        }
    }
}

/// Build the partition's database. Only an empty partition fails with
/// `EmptyDataset`; anything else wrong with its rows is a run-level error.
pub fn build_partition(partition: &Partition, config: &RunConfig) -> Result<SequenceDatabase> {
    if partition.rows.is_empty() {
        return Err(MiningError::empty(&partition.label));
    }
    let rows: Vec<EventRow> = partition.rows.iter().map(|&row| row.clone()).collect();
    SequenceDatabase::build(&rows, config.grouping())
}

fn mine_database(
    label: &str,
    db: SequenceDatabase,
    config: &RunConfig,
    cancel: &CancellationToken,
) -> Result<MiningResult> {
    Miner::new(db, config.concurrency)
        .with_max_length(config.max_length)
        .with_partition(label)
        .mine(&config.min_supports, cancel)
}

#[derive(Debug)]
pub struct PartitionReport {
    pub table: SupportTable,
    pub summary: RunSummary,
    pub files: Vec<PathBuf>,
}

#[derive(Debug)]
pub struct PartitionOutcome {
    pub label: String,
    pub result: Result<PartitionReport>,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub partitions: Vec<PartitionOutcome>,
}

impl RunReport {
    pub fn succeeded(&self) -> impl Iterator<Item = (&str, &PartitionReport)> {
        self.partitions
            .iter()
            .filter_map(|outcome| outcome.result.as_ref().ok().map(|report| (outcome.label.as_str(), report)))
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &MiningError)> {
        self.partitions
            .iter()
            .filter_map(|outcome| outcome.result.as_ref().err().map(|err| (outcome.label.as_str(), err)))
    }

    pub fn is_success(&self) -> bool {
        self.failed().next().is_none()
    }
}

/// Mine every partition and write its tables and summary.
///
/// Every partition's database is built before any mining starts, so
/// malformed rows and unsupported settings fail the whole run. A partition
/// left without subjects is reported in its outcome and the others still
/// complete.
pub fn run(rows: &[EventRow], config: &RunConfig, cancel: &CancellationToken) -> Result<RunReport> {
    config.validate()?;

    let partitions = partition(rows, config);
    info!(partitions = partitions.len(), mode = ?config.mode, "run started");

    let mut built = Vec::with_capacity(partitions.len());
    for partition in &partitions {
        match build_partition(partition, config) {
            Ok(db) => built.push((partition.label.clone(), Ok(db))),
            Err(err @ MiningError::EmptyDataset { .. }) => built.push((partition.label.clone(), Err(err))),
            Err(err) => return Err(err),
        }
    }

    std::fs::create_dir_all(&config.output_dir)?;
    let labels: Vec<&str> = built.iter().map(|(label, _)| label.as_str()).collect();
    let stems = output::unique_stems(&labels);

    let mined: Vec<(String, Result<MiningResult>)> = built
        .into_par_iter()
        .map(|(label, db)| {
            let result = db.and_then(|db| mine_database(&label, db, config, cancel));
            (label, result)
        })
        .collect();

    // written sequentially so summary blocks never interleave
    let mut report = RunReport::default();
    for ((label, result), stem) in mined.into_iter().zip(stems) {
        let result = result.and_then(|result| {
            let table = SupportTable::from_result(&result);
            let summary = RunSummary::from_result(&result);
            let mut files = output::write_tables(&config.output_dir, &stem, &table)?;
            files.push(output::append_summary(&config.output_dir, &summary)?);
            Ok(PartitionReport { table, summary, files })
        });
        if let Err(err) = &result {
            warn!(partition = %label, error = %err, "partition failed");
        }
        report.partitions.push(PartitionOutcome { label, result });
    }
    Ok(report)
}
