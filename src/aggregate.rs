//! Merges per-threshold results into an exportable table and a summary.

use crate::error::Result;
use crate::miner::MiningResult;
use crate::pattern::{item_count, Pattern};
use serde::ser::{Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};

/// One distinct pattern and the support it reached under each threshold.
#[derive(Clone, Debug, PartialEq)]
pub struct SupportRow {
    pub pattern: Pattern,
    pub label: String,
    pub length: usize,
    pub support: usize,
    /// Aligned with [`SupportTable::thresholds`]; `None` when the pattern
    /// did not reach that threshold.
    pub cells: Vec<Option<usize>>,
    /// Matching subjects over all subjects, as a percentage.
    pub percent: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SupportTable {
    pub thresholds: Vec<String>,
    pub rows: Vec<SupportRow>,
}

impl SupportTable {
    pub fn from_result(result: &MiningResult) -> Self {
        let thresholds: Vec<String> = result
            .thresholds
            .iter()
            .map(|threshold| threshold.threshold.to_string())
            .collect();

        let mut index: HashMap<&Pattern, usize> = HashMap::new();
        let mut rows: Vec<SupportRow> = Vec::new();
        for (column, threshold) in result.thresholds.iter().enumerate() {
            for record in threshold.patterns() {
                let row = *index.entry(&record.pattern).or_insert_with(|| {
                    rows.push(SupportRow {
                        pattern: record.pattern.clone(),
                        label: result.alphabet.render(&record.pattern),
                        length: record.length(),
                        support: record.support,
                        cells: vec![None; thresholds.len()],
                        percent: record.ratio(result.subject_count) * 100.0,
                    });
                    rows.len() - 1
                });
                rows[row].cells[column] = Some(record.support);
            }
        }

        rows.sort_by(|a, b| {
            a.length
                .cmp(&b.length)
                .then(b.support.cmp(&a.support))
                .then_with(|| a.label.cmp(&b.label))
        });

        Self { thresholds, rows }
    }

    /// Rows that reached the threshold in column `column`.
    pub fn retained(&self, column: usize) -> impl Iterator<Item = &SupportRow> {
        self.rows
            .iter()
            .filter(move |row| row.cells.get(column).copied().flatten().is_some())
    }

    pub fn find(&self, label: &str) -> Option<&SupportRow> {
        self.rows.iter().find(|row| row.label == label)
    }
}

/// Counts keyed by threshold, serialized as a JSON object in threshold order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ByThreshold<T>(pub Vec<(String, T)>);

impl<T: Serialize> Serialize for ByThreshold<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(key, value)| (key, value)))
    }
}

impl<T> ByThreshold<T> {
    pub fn get(&self, threshold: &str) -> Option<&T> {
        self.0
            .iter()
            .find(|(key, _)| key == threshold)
            .map(|(_, value)| value)
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct RunSummary {
    pub partition: String,
    pub concurrent: bool,
    /// Frequent single-item patterns per threshold.
    pub single_items: ByThreshold<usize>,
    /// Frequent longer patterns per threshold, by length.
    pub itemsets: ByThreshold<BTreeMap<usize, usize>>,
    pub subject_count: usize,
    pub elapsed_secs: f64,
}

impl RunSummary {
    pub fn from_result(result: &MiningResult) -> Self {
        let mut single_items = Vec::new();
        let mut itemsets = Vec::new();
        for threshold in &result.thresholds {
            let key = threshold.threshold.to_string();
            single_items.push((key.clone(), threshold.level(1).len()));

            let mut by_length = BTreeMap::new();
            for record in threshold.patterns() {
                let length = item_count(&record.pattern);
                if length > 1 {
                    *by_length.entry(length).or_insert(0) += 1;
                }
            }
            itemsets.push((key, by_length));
        }

        Self {
            partition: result.partition.clone(),
            concurrent: result.concurrent,
            single_items: ByThreshold(single_items),
            itemsets: ByThreshold(itemsets),
            subject_count: result.subject_count,
            elapsed_secs: result.elapsed.as_secs_f64(),
        }
    }

    /// Text block appended to the summary file.
    pub fn render(&self) -> Result<String> {
        Ok(format!(
            "{rule}\n[{partition}] concurrency={concurrency}\n{single}\n\n{itemsets}\n\n\
             Transaction #: {subjects}\n\n--- {secs} seconds ---\n\n",
            rule = "=".repeat(60),
            partition = self.partition,
            concurrency = if self.concurrent { "on" } else { "off" },
            single = serde_json::to_string(&self.single_items)?,
            itemsets = serde_json::to_string(&self.itemsets)?,
            subjects = self.subject_count,
            secs = self.elapsed_secs,
        ))
    }
}
