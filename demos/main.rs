use seq_tool::{CancellationToken, EventRow, EventTime, GroupingUnit, Miner, MinSupport, SequenceDatabase, SupportTable};

const DATA: &[(&str, &str, i64)] = &[
    ("s0", "calc1", 1),
    ("s0", "prog1", 1),
    ("s0", "calc2", 2),
    ("s1", "calc1", 1),
    ("s1", "prog1", 2),
    ("s1", "calc2", 3),
    ("s2", "calc1", 1),
    ("s2", "prog1", 1),
    ("s2", "calc2", 2),
    ("s2", "algo", 2),
];

fn main() -> seq_tool::Result<()> {
    let rows: Vec<EventRow> = DATA
        .iter()
        .map(|&(subject, item, time)| EventRow::new(subject, item, EventTime::Index(time)))
        .collect();

    let db = SequenceDatabase::build(&rows, Some(GroupingUnit::Exact))?;
    let result = Miner::new(db, true).mine(
        &[MinSupport::Count(3), MinSupport::Count(2)],
        &CancellationToken::new(),
    )?;

    let table = SupportTable::from_result(&result);
    for row in &table.rows {
        println!("Pattern: {}, Support: {:?}, {:.1}%", row.label, row.cells, row.percent);
    }
    Ok(())
}
