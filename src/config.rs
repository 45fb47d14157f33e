//! Run parameters.
//!
//! [`Settings`] is the raw, optional form read from a TOML file and
//! overridden by command-line flags. [`RunConfig`] is the validated value
//! the core runs with; building one is where configuration errors surface.

use crate::database::GroupingUnit;
use crate::error::{MiningError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// A minimum-support threshold: an absolute subject count when above 1,
/// otherwise a ratio of the subject count.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum MinSupport {
    Count(usize),
    Ratio(f64),
}

impl MinSupport {
    pub fn from_value(value: f64) -> Result<Self> {
        if !value.is_finite() || value <= 0.0 {
            return Err(MiningError::unsupported(
                "min_support",
                format!("{} is not a positive number", value),
            ));
        }
        if value > 1.0 {
            if value.fract() != 0.0 {
                return Err(MiningError::unsupported(
                    "min_support",
                    format!("{} is above 1 but not a whole subject count", value),
                ));
            }
            Ok(MinSupport::Count(value as usize))
        } else {
            Ok(MinSupport::Ratio(value))
        }
    }

    /// Smallest support count that meets this threshold.
    pub fn resolve(self, subjects: usize) -> usize {
        match self {
            MinSupport::Count(count) => count,
            MinSupport::Ratio(ratio) => {
                let needed = (ratio * subjects as f64 - 1e-9).ceil();
                (needed.max(1.0)) as usize
            }
        }
    }
}

impl FromStr for MinSupport {
    type Err = MiningError;

    fn from_str(value: &str) -> Result<Self> {
        let parsed = value.trim().parse::<f64>().map_err(|_| {
            MiningError::unsupported("min_support", format!("`{}` is not a number", value.trim()))
        })?;
        MinSupport::from_value(parsed)
    }
}

impl fmt::Display for MinSupport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MinSupport::Count(count) => write!(f, "{}", count),
            MinSupport::Ratio(ratio) => write!(f, "{}", ratio),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// One lattice over every selected category.
    #[default]
    Together,
    /// One lattice per selected category.
    Separate,
}

impl FromStr for RunMode {
    type Err = MiningError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "together" => Ok(RunMode::Together),
            "separate" | "separately" => Ok(RunMode::Separate),
            other => Err(MiningError::unsupported(
                "mode",
                format!("unknown run mode `{}` (expected together or separate)", other),
            )),
        }
    }
}

/// Raw settings as found in a TOML file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub min_support: Vec<f64>,
    pub categories: Vec<String>,
    pub mode: Option<RunMode>,
    pub concurrency: bool,
    pub group_by: Option<String>,
    pub semester_order: Vec<String>,
    pub max_length: Option<usize>,
    pub output: Option<PathBuf>,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }
}

/// Validated parameters of one run.
#[derive(Clone, Debug, PartialEq)]
pub struct RunConfig {
    pub min_supports: Vec<MinSupport>,
    /// Categories to keep; empty keeps everything.
    pub categories: BTreeSet<String>,
    pub mode: RunMode,
    pub concurrency: bool,
    pub group_by: GroupingUnit,
    pub semester_order: Vec<String>,
    pub max_length: Option<usize>,
    pub output_dir: PathBuf,
}

impl RunConfig {
    pub fn new(min_supports: Vec<MinSupport>, output_dir: impl Into<PathBuf>) -> Result<Self> {
        let config = Self {
            min_supports,
            categories: BTreeSet::new(),
            mode: RunMode::Together,
            concurrency: false,
            group_by: GroupingUnit::Exact,
            semester_order: Vec::new(),
            max_length: None,
            output_dir: output_dir.into(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Grouping unit when concurrency is on, `None` otherwise.
    pub fn grouping(&self) -> Option<GroupingUnit> {
        if self.concurrency {
            Some(self.group_by)
        } else {
            None
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_supports.is_empty() {
            return Err(MiningError::unsupported("min_support", "at least one threshold is required"));
        }
        let mut seen = BTreeSet::new();
        for threshold in &self.min_supports {
            MinSupport::from_value(match threshold {
                MinSupport::Count(count) => *count as f64,
                MinSupport::Ratio(ratio) => *ratio,
            })?;
            if !seen.insert(threshold.to_string()) {
                return Err(MiningError::unsupported(
                    "min_support",
                    format!("threshold {} is listed twice", threshold),
                ));
            }
        }
        if self.max_length == Some(0) {
            return Err(MiningError::unsupported("max_length", "must be at least 1"));
        }
        Ok(())
    }
}

impl TryFrom<Settings> for RunConfig {
    type Error = MiningError;

    fn try_from(settings: Settings) -> Result<Self> {
        let min_supports = settings
            .min_support
            .iter()
            .map(|&value| MinSupport::from_value(value))
            .collect::<Result<Vec<_>>>()?;
        let group_by = match settings.group_by.as_deref() {
            Some(unit) => unit.parse()?,
            None => GroupingUnit::Exact,
        };
        let config = RunConfig {
            min_supports,
            categories: settings.categories.into_iter().collect(),
            mode: settings.mode.unwrap_or_default(),
            concurrency: settings.concurrency,
            group_by,
            semester_order: settings.semester_order,
            max_length: settings.max_length,
            output_dir: settings.output.unwrap_or_else(|| PathBuf::from("output")),
        };
        config.validate()?;
        Ok(config)
    }
}
