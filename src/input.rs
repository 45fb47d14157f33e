//! Reads the prepared event table.
//!
//! Required columns are `Item`, `ID` and `EventTime`. When `EventTime` is
//! absent, `Year` and `Semester` can stand in for it given a semester
//! order; `Department` is read as `Category` when the latter is missing.

use crate::database::{EventRow, EventTime};
use crate::error::{MiningError, Result};
use serde::Deserialize;
use std::io;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(rename = "Item")]
    item: Option<String>,
    #[serde(rename = "ID")]
    id: Option<String>,
    #[serde(rename = "EventTime")]
    event_time: Option<String>,
    #[serde(rename = "Category")]
    category: Option<String>,
    #[serde(rename = "Department")]
    department: Option<String>,
    #[serde(rename = "EventOrder")]
    event_order: Option<String>,
    #[serde(rename = "Year")]
    year: Option<String>,
    #[serde(rename = "Semester")]
    semester: Option<String>,
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Rows from a CSV file on disk.
pub fn read_path(path: &Path, semester_order: &[String]) -> Result<Vec<EventRow>> {
    let file = std::fs::File::open(path)?;
    debug!(path = %path.display(), "reading event table");
    read_rows(file, semester_order)
}

pub fn read_rows<R: io::Read>(reader: R, semester_order: &[String]) -> Result<Vec<EventRow>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let headers = reader.headers()?.clone();
    let has = |name: &str| headers.iter().any(|header| header == name);
    for required in ["Item", "ID"] {
        if !has(required) {
            return Err(MiningError::malformed("header", required, "required column is missing"));
        }
    }
    let derive_time = !has("EventTime");
    if derive_time {
        if !(has("Year") && has("Semester")) {
            return Err(MiningError::malformed(
                "header",
                "EventTime",
                "required column is missing and no Year/Semester pair to derive it from",
            ));
        }
        if semester_order.is_empty() {
            return Err(MiningError::unsupported(
                "semester_order",
                "EventTime must be derived from Year/Semester but no semester order was given",
            ));
        }
    }

    let mut rows = Vec::new();
    for (idx, raw) in reader.deserialize::<RawRow>().enumerate() {
        // header is line 1
        let line = format!("line {}", idx + 2);
        let raw = raw.map_err(|err| record_error(&line, &headers, err))?;

        let item = present(raw.item).ok_or_else(|| MiningError::malformed(&line, "Item", "empty value"))?;
        let subject = present(raw.id).ok_or_else(|| MiningError::malformed(&line, "ID", "empty value"))?;
        let time = match present(raw.event_time) {
            Some(value) => EventTime::parse(&value).ok_or_else(|| {
                MiningError::malformed(&line, "EventTime", format!("cannot order `{}`", value))
            })?,
            None if derive_time => semester_time(&line, raw.year, raw.semester, semester_order)?,
            None => return Err(MiningError::malformed(&line, "EventTime", "empty value")),
        };

        rows.push(EventRow {
            subject,
            item,
            time,
            category: present(raw.category).or_else(|| present(raw.department)),
            order: present(raw.event_order),
        });
    }

    if rows.is_empty() {
        warn!("event table has no rows");
    }
    debug!(rows = rows.len(), "event table read");
    Ok(rows)
}

/// A record the reader could not decode: wrong field count, bytes that are
/// not UTF-8, or a value serde rejects.
fn record_error(line: &str, headers: &csv::StringRecord, err: csv::Error) -> MiningError {
    let field = match err.kind() {
        csv::ErrorKind::Utf8 { err, .. } => headers.get(err.field()),
        csv::ErrorKind::Deserialize { err, .. } => err.field().and_then(|idx| headers.get(idx as usize)),
        _ => None,
    };
    MiningError::malformed(line, field.unwrap_or("row"), err.to_string())
}

fn semester_time(
    line: &str,
    year: Option<String>,
    semester: Option<String>,
    semester_order: &[String],
) -> Result<EventTime> {
    let year = present(year).ok_or_else(|| MiningError::malformed(line, "Year", "empty value"))?;
    let year: i32 = year
        .parse()
        .map_err(|_| MiningError::malformed(line, "Year", format!("`{}` is not a year", year)))?;
    let semester = present(semester).ok_or_else(|| MiningError::malformed(line, "Semester", "empty value"))?;

    let position = semester_order
        .iter()
        .position(|known| known.trim().eq_ignore_ascii_case(&semester))
        .ok_or_else(|| {
            MiningError::malformed(line, "Semester", format!("`{}` is not in the semester order", semester))
        })?;
    EventTime::quarter_start(year, position as u32 + 1).ok_or_else(|| {
        MiningError::unsupported("semester_order", "at most four semesters fit in a year")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_required_and_optional_columns() {
        let data = "ID,Item,EventTime,Department,Grade\n\
                    s1, Calc I ,1,Math,A\n\
                    s1,Calc II,2,Math,B\n\
                    s2,Bio,2021-01-05,,C\n";
        let rows = read_rows(data.as_bytes(), &[]).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], EventRow::new("s1", "Calc I", EventTime::Index(1)).with_category("Math"));
        assert_eq!(rows[2].category, None);
        assert!(matches!(rows[2].time, EventTime::Timestamp(_)));
    }

    #[test]
    fn test_missing_required_column() {
        let data = "ID,EventTime\ns1,1\n";
        let err = read_rows(data.as_bytes(), &[]).unwrap_err();
        assert!(matches!(err, MiningError::MalformedInput { ref field, .. } if field == "Item"));
    }

    #[test]
    fn test_unparsable_time_names_line() {
        let data = "ID,Item,EventTime\ns1,a,1\ns1,b,someday\n";
        let err = read_rows(data.as_bytes(), &[]).unwrap_err();
        match err {
            MiningError::MalformedInput { row, field, .. } => {
                assert_eq!(row, "line 3");
                assert_eq!(field, "EventTime");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_short_row_is_malformed() {
        let data = "ID,Item,EventTime\ns1,a,1\ns1,b\n";
        match read_rows(data.as_bytes(), &[]).unwrap_err() {
            MiningError::MalformedInput { row, field, .. } => {
                assert_eq!(row, "line 3");
                assert_eq!(field, "row");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_invalid_utf8_is_malformed() {
        let data: &[u8] = b"ID,Item,EventTime\ns1,\xff\xfe,1\n";
        match read_rows(data, &[]).unwrap_err() {
            MiningError::MalformedInput { row, field, .. } => {
                assert_eq!(row, "line 2");
                assert_eq!(field, "Item");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_event_time_from_year_and_semester() {
        let order = vec!["Spring".to_string(), "Summer".to_string(), "Fall".to_string()];
        let data = "ID,Item,Year,Semester,EventOrder\n\
                    s1,a,2020,Fall,\n\
                    s1,b,2021,spring,T9\n";
        let rows = read_rows(data.as_bytes(), &order).unwrap();
        assert_eq!(rows[0].time, EventTime::quarter_start(2020, 3).unwrap());
        assert_eq!(rows[1].time, EventTime::quarter_start(2021, 1).unwrap());
        assert_eq!(rows[1].order.as_deref(), Some("T9"));

        let data = "ID,Item,Year,Semester\ns1,a,2020,Winter\n";
        assert!(matches!(
            read_rows(data.as_bytes(), &order),
            Err(MiningError::MalformedInput { .. })
        ));
        assert!(matches!(
            read_rows(data.as_bytes(), &[]),
            Err(MiningError::UnsupportedConfiguration { .. })
        ));
    }
}
