//! Sequence database construction.
//!
//! Rows of (subject, item, ordering key, optional group key) are grouped
//! per subject into an ordered list of [`ItemSet`] elements. The database
//! is immutable once built and is shared read-only by the miner and its
//! rayon workers.

use crate::error::{MiningError, Result};
use crate::pattern::{singleton, Alphabet, ItemSet, Pattern};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Ordering key of an event.
///
/// Integer indices and timestamps never compare with each other; a subject
/// mixing both cannot be ordered.
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum EventTime {
    Index(i64),
    Timestamp(NaiveDateTime),
}

impl EventTime {
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Ok(index) = value.parse::<i64>() {
            return Some(EventTime::Index(index));
        }
        if let Ok(stamp) = DateTime::parse_from_rfc3339(value) {
            return Some(EventTime::Timestamp(stamp.naive_utc()));
        }
        for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
            if let Ok(stamp) = NaiveDateTime::parse_from_str(value, format) {
                return Some(EventTime::Timestamp(stamp));
            }
        }
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(EventTime::Timestamp)
    }

    /// Start of quarter `quarter` (1-based) of `year`.
    pub fn quarter_start(year: i32, quarter: u32) -> Option<Self> {
        let month = quarter.checked_sub(1)? * 3 + 1;
        NaiveDate::from_ymd_opt(year, month, 1)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(EventTime::Timestamp)
    }

    fn same_kind(&self, other: &EventTime) -> bool {
        matches!(
            (self, other),
            (EventTime::Index(_), EventTime::Index(_))
                | (EventTime::Timestamp(_), EventTime::Timestamp(_))
        )
    }
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EventTime::Index(index) => write!(f, "{}", index),
            EventTime::Timestamp(stamp) => write!(f, "{}", stamp),
        }
    }
}

/// Time granularity used to collapse concurrent events.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum GroupingUnit {
    #[default]
    Exact,
    Year,
    Quarter,
    Month,
    Week,
    Semester,
}

impl FromStr for GroupingUnit {
    type Err = MiningError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "E" | "EXACT" => Ok(GroupingUnit::Exact),
            "Y" | "YEAR" => Ok(GroupingUnit::Year),
            "Q" | "QUARTER" => Ok(GroupingUnit::Quarter),
            "M" | "MONTH" => Ok(GroupingUnit::Month),
            "W" | "WEEK" => Ok(GroupingUnit::Week),
            "S" | "SEMESTER" => Ok(GroupingUnit::Semester),
            other => Err(MiningError::unsupported(
                "group_by",
                format!("unknown time grouping unit `{}` (expected E, Y, Q, M, W or S)", other),
            )),
        }
    }
}

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
enum GroupKey {
    Explicit(String),
    Exact(EventTime),
    Period(i32, u32),
}

impl GroupingUnit {
    fn key(self, time: EventTime) -> Result<GroupKey> {
        let stamp = match time {
            _ if self == GroupingUnit::Exact => return Ok(GroupKey::Exact(time)),
            EventTime::Timestamp(stamp) => stamp,
            EventTime::Index(_) => {
                return Err(MiningError::unsupported(
                    "group_by",
                    format!("{:?} grouping needs timestamp event times, found integer keys", self),
                ))
            }
        };
        let key = match self {
            GroupingUnit::Exact => GroupKey::Exact(time),
            GroupingUnit::Year => GroupKey::Period(stamp.year(), 0),
            GroupingUnit::Quarter | GroupingUnit::Semester => {
                GroupKey::Period(stamp.year(), (stamp.month() - 1) / 3 + 1)
            }
            GroupingUnit::Month => GroupKey::Period(stamp.year(), stamp.month()),
            GroupingUnit::Week => {
                let week = stamp.iso_week();
                GroupKey::Period(week.year(), week.week())
            }
        };
        Ok(key)
    }
}

/// One validated input row.
#[derive(Clone, Debug, PartialEq)]
pub struct EventRow {
    pub subject: String,
    pub item: String,
    pub time: EventTime,
    pub category: Option<String>,
    /// Pre-derived concurrency group, used instead of the grouping unit.
    pub order: Option<String>,
}

impl EventRow {
    pub fn new(subject: impl Into<String>, item: impl Into<String>, time: EventTime) -> Self {
        Self {
            subject: subject.into(),
            item: item.into(),
            time,
            category: None,
            order: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }
}

/// The ordered elements of one subject.
#[derive(Clone, Debug, PartialEq)]
pub struct Sequence {
    pub subject: String,
    pub elements: Pattern,
}

pub struct SequenceDatabase {
    alphabet: Alphabet,
    sequences: Vec<Sequence>,
}

impl SequenceDatabase {
    /// Build from rows. `grouping` is `None` when concurrency is disabled,
    /// in which case every row stays its own single-item element.
    pub fn build(rows: &[EventRow], grouping: Option<GroupingUnit>) -> Result<Self> {
        let alphabet = Alphabet::from_labels(rows.iter().map(|row| row.item.as_str()));

        let mut subjects: BTreeMap<&str, Vec<&EventRow>> = BTreeMap::new();
        for (idx, row) in rows.iter().enumerate() {
            if row.subject.trim().is_empty() {
                return Err(MiningError::malformed(format!("row {}", idx + 1), "ID", "empty subject id"));
            }
            if row.item.trim().is_empty() {
                return Err(MiningError::malformed(format!("row {}", idx + 1), "Item", "empty item"));
            }
            subjects.entry(row.subject.as_str()).or_default().push(row);
        }

        let sequences = subjects
            .into_iter()
            .map(|(subject, events)| {
                let elements = match grouping {
                    Some(unit) => collapse(&alphabet, subject, &events, unit)?,
                    None => spread(&alphabet, subject, &events)?,
                };
                if elements.is_empty() {
                    return Err(MiningError::malformed(format!("subject {}", subject), "ID", "subject has no events"));
                }
                Ok(Sequence {
                    subject: subject.to_string(),
                    elements,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            subjects = sequences.len(),
            items = alphabet.len(),
            concurrent = grouping.is_some(),
            "built sequence database"
        );

        Ok(Self { alphabet, sequences })
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn sequences(&self) -> &[Sequence] {
        &self.sequences
    }

    /// Denominator of every support ratio.
    pub fn subject_count(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }
}

fn check_comparable(subject: &str, events: &[&EventRow]) -> Result<()> {
    if let Some(first) = events.first() {
        if let Some(odd) = events.iter().find(|row| !row.time.same_kind(&first.time)) {
            return Err(MiningError::malformed(
                format!("subject {}", subject),
                "EventTime",
                format!("`{}` cannot be ordered against `{}`", odd.time, first.time),
            ));
        }
    }
    Ok(())
}

fn collapse(alphabet: &Alphabet, subject: &str, events: &[&EventRow], unit: GroupingUnit) -> Result<Pattern> {
    check_comparable(subject, events)?;

    let mut groups: HashMap<GroupKey, (EventTime, ItemSet)> = HashMap::new();
    for row in events {
        let key = match &row.order {
            Some(order) if !order.trim().is_empty() => GroupKey::Explicit(order.trim().to_string()),
            _ => unit.key(row.time)?,
        };
        let item = alphabet.id(&row.item).ok_or_else(|| {
            MiningError::malformed(format!("subject {}", subject), "Item", format!("`{}` not interned", row.item))
        })?;
        let (earliest, items) = groups.entry(key).or_insert_with(|| (row.time, ItemSet::new()));
        if row.time < *earliest {
            *earliest = row.time;
        }
        items.insert(item);
    }

    let mut groups: Vec<(EventTime, GroupKey, ItemSet)> = groups
        .into_iter()
        .map(|(key, (earliest, items))| (earliest, key, items))
        .collect();
    groups.sort_unstable_by(|a, b| (a.0, &a.1).cmp(&(b.0, &b.1)));
    Ok(groups.into_iter().map(|(_, _, items)| items).collect())
}

fn spread(alphabet: &Alphabet, subject: &str, events: &[&EventRow]) -> Result<Pattern> {
    check_comparable(subject, events)?;

    let mut keyed = events
        .iter()
        .map(|row| {
            alphabet.id(&row.item).map(|item| (row.time, item)).ok_or_else(|| {
                MiningError::malformed(format!("subject {}", subject), "Item", format!("`{}` not interned", row.item))
            })
        })
        .collect::<Result<Vec<_>>>()?;
    keyed.sort_unstable();
    keyed.dedup();
    Ok(keyed.into_iter().map(|(_, item)| singleton(item)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(subject: &str, item: &str, time: i64) -> EventRow {
        EventRow::new(subject, item, EventTime::Index(time))
    }

    fn stamp(value: &str) -> EventTime {
        EventTime::parse(value).unwrap()
    }

    #[test]
    fn test_parse_event_time() {
        assert_eq!(EventTime::parse("42"), Some(EventTime::Index(42)));
        assert!(matches!(EventTime::parse("2021-09-01"), Some(EventTime::Timestamp(_))));
        assert!(matches!(EventTime::parse("2021-09-01 10:30"), Some(EventTime::Timestamp(_))));
        assert!(matches!(EventTime::parse("2021-09-01T10:30:00Z"), Some(EventTime::Timestamp(_))));
        assert_eq!(EventTime::parse("next fall"), None);
        assert_eq!(EventTime::quarter_start(2021, 3), Some(stamp("2021-07-01")));
        assert_eq!(EventTime::quarter_start(2021, 0), None);
    }

    #[test]
    fn test_spread_sorts_by_time() {
        let rows = vec![row("s1", "b", 2), row("s1", "a", 1), row("s2", "c", 5), row("s1", "a", 1)];
        let db = SequenceDatabase::build(&rows, None).unwrap();

        assert_eq!(db.subject_count(), 2);
        let alphabet = db.alphabet();
        assert_eq!(
            db.sequences()[0].elements,
            alphabet.pattern(&[vec!["a"], vec!["b"]]).unwrap()
        );
        assert!(db
            .sequences()
            .iter()
            .all(|sequence| sequence.elements.iter().all(|element| element.len() == 1)));
    }

    #[test]
    fn test_collapse_same_key() {
        let rows = vec![row("s1", "x", 3), row("s1", "y", 3), row("s1", "z", 1)];
        let db = SequenceDatabase::build(&rows, Some(GroupingUnit::Exact)).unwrap();
        let alphabet = db.alphabet();
        assert_eq!(
            db.sequences()[0].elements,
            alphabet.pattern(&[vec!["z"], vec!["x", "y"]]).unwrap()
        );
    }

    #[test]
    fn test_collapse_by_year_and_explicit_order() {
        let rows = vec![
            EventRow::new("s1", "a", stamp("2020-02-01")),
            EventRow::new("s1", "b", stamp("2020-11-01")),
            EventRow::new("s1", "c", stamp("2021-01-15")),
        ];
        let db = SequenceDatabase::build(&rows, Some(GroupingUnit::Year)).unwrap();
        let alphabet = db.alphabet();
        assert_eq!(
            db.sequences()[0].elements,
            alphabet.pattern(&[vec!["a", "b"], vec!["c"]]).unwrap()
        );

        let rows = vec![
            row("s1", "a", 1).with_order("T1"),
            row("s1", "b", 2).with_order("T1"),
            row("s1", "c", 3).with_order("T2"),
        ];
        let db = SequenceDatabase::build(&rows, Some(GroupingUnit::Exact)).unwrap();
        assert_eq!(db.sequences()[0].elements.len(), 2);
    }

    #[test]
    fn test_mixed_time_kinds_are_malformed() {
        let rows = vec![row("s1", "a", 1), EventRow::new("s1", "b", stamp("2020-01-01"))];
        let err = SequenceDatabase::build(&rows, None).err().unwrap();
        assert!(matches!(err, MiningError::MalformedInput { ref field, .. } if field == "EventTime"));
    }

    #[test]
    fn test_period_grouping_rejects_integer_times() {
        let rows = vec![row("s1", "a", 1)];
        let err = SequenceDatabase::build(&rows, Some(GroupingUnit::Year)).err().unwrap();
        assert!(matches!(err, MiningError::UnsupportedConfiguration { .. }));
    }

    #[test]
    fn test_empty_item_is_malformed() {
        let rows = vec![row("s1", " ", 1)];
        assert!(matches!(
            SequenceDatabase::build(&rows, None),
            Err(MiningError::MalformedInput { .. })
        ));
    }

    #[test]
    fn test_grouping_unit_parse() {
        assert_eq!("q".parse::<GroupingUnit>().unwrap(), GroupingUnit::Quarter);
        assert_eq!("Week".parse::<GroupingUnit>().unwrap(), GroupingUnit::Week);
        assert!("X".parse::<GroupingUnit>().is_err());
    }
}
