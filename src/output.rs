//! Writes support tables and summary blocks to the output directory.

use crate::aggregate::{RunSummary, SupportTable};
use crate::error::Result;
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

pub const SUMMARY_FILE: &str = "summary.txt";

fn file_stem(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect()
}

/// File stems for the given partition labels, one per label and pairwise
/// distinct. A label whose sanitized form is already taken gets its position
/// appended.
pub fn unique_stems(labels: &[&str]) -> Vec<String> {
    let mut taken = HashSet::with_capacity(labels.len());
    labels
        .iter()
        .enumerate()
        .map(|(idx, label)| {
            let mut stem = file_stem(label);
            while !taken.insert(stem.clone()) {
                stem = format!("{}_{}", stem, idx);
            }
            stem
        })
        .collect()
}

/// One CSV per threshold, holding the patterns retained at that threshold
/// with their support under every requested threshold. `stem` comes from
/// [`unique_stems`].
pub fn write_tables(dir: &Path, stem: &str, table: &SupportTable) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;

    let mut written = Vec::with_capacity(table.thresholds.len());
    for (column, threshold) in table.thresholds.iter().enumerate() {
        let path = dir.join(format!("{}_minsup_{}.csv", stem, file_stem(threshold)));
        let mut writer = csv::Writer::from_path(&path)?;

        let mut header = vec!["Pattern".to_string(), "Length".to_string()];
        header.extend(table.thresholds.iter().cloned());
        header.push("Count %".to_string());
        writer.write_record(&header)?;

        let mut rows = 0;
        for row in table.retained(column) {
            let mut record = vec![row.label.clone(), row.length.to_string()];
            record.extend(
                row.cells
                    .iter()
                    .map(|cell| cell.map(|support| support.to_string()).unwrap_or_default()),
            );
            record.push(format!("{:.2}", row.percent));
            writer.write_record(&record)?;
            rows += 1;
        }
        writer.flush()?;

        info!(path = %path.display(), rows, "support table written");
        written.push(path);
    }
    Ok(written)
}

/// Append the summary block; earlier runs are kept.
pub fn append_summary(dir: &Path, summary: &RunSummary) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(SUMMARY_FILE);
    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    file.write_all(summary.render()?.as_bytes())?;
    info!(path = %path.display(), partition = %summary.partition, "summary appended");
    Ok(path)
}
