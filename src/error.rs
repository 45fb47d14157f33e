//! Error type shared by every stage of a mining run.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MiningError>;

/// Failures surfaced to the caller. Counting a candidate never fails, so
/// none of these originate inside the level loop except `Cancelled`.
#[derive(Debug, Error)]
pub enum MiningError {
    /// A required field is missing, empty, unparsable or not orderable.
    #[error("malformed input at {row}: field `{field}`: {reason}")]
    MalformedInput {
        row: String,
        field: String,
        reason: String,
    },

    /// No subjects remain for a partition after filtering.
    #[error("no subjects to mine in partition `{partition}`")]
    EmptyDataset { partition: String },

    /// A run parameter cannot be honored (unknown grouping unit, bad threshold list, ...).
    #[error("unsupported configuration `{setting}`: {reason}")]
    UnsupportedConfiguration { setting: String, reason: String },

    #[error("mining run cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

impl MiningError {
    pub fn malformed(row: impl Into<String>, field: impl Into<String>, reason: impl Into<String>) -> Self {
        MiningError::MalformedInput {
            row: row.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn unsupported(setting: impl Into<String>, reason: impl Into<String>) -> Self {
        MiningError::UnsupportedConfiguration {
            setting: setting.into(),
            reason: reason.into(),
        }
    }

    pub fn empty(partition: impl Into<String>) -> Self {
        MiningError::EmptyDataset {
            partition: partition.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::MiningError;

    #[test]
    fn test_messages_carry_context() {
        let err = MiningError::malformed("row 4", "EventTime", "cannot parse `soon`");
        assert_eq!(
            err.to_string(),
            "malformed input at row 4: field `EventTime`: cannot parse `soon`"
        );

        let err = MiningError::empty("Biology");
        assert!(err.to_string().contains("Biology"));

        let err = MiningError::unsupported("group_by", "unknown unit `X`");
        assert!(err.to_string().contains("group_by"));
    }
}
