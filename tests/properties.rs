//! Property tests over small random databases.

use proptest::prelude::*;
use seq_tool::pattern::sub_patterns;
use seq_tool::{
    support, CancellationToken, EventRow, EventTime, GroupingUnit, Miner, MinSupport, MiningResult,
    SequenceDatabase,
};
use std::collections::HashSet;

const ITEMS: &[&str] = &["a", "b", "c", "d"];

/// Up to six subjects with up to five (time, item) events each. Times are
/// drawn from a small range so collisions exercise concurrent elements.
fn histories() -> impl Strategy<Value = Vec<EventRow>> {
    prop::collection::vec(prop::collection::vec((0i64..4, 0usize..ITEMS.len()), 1..6), 1..7).prop_map(
        |subjects| {
            subjects
                .into_iter()
                .enumerate()
                .flat_map(|(subject, events)| {
                    events.into_iter().map(move |(time, item)| {
                        EventRow::new(format!("s{}", subject), ITEMS[item], EventTime::Index(time))
                    })
                })
                .collect()
        },
    )
}

fn mine(rows: &[EventRow], concurrent: bool, thresholds: &[MinSupport]) -> MiningResult {
    let grouping = if concurrent { Some(GroupingUnit::Exact) } else { None };
    let db = SequenceDatabase::build(rows, grouping).unwrap();
    Miner::new(db, concurrent)
        .with_max_length(Some(4))
        .mine(thresholds, &CancellationToken::new())
        .unwrap()
}

fn on_threads<T: Send>(threads: usize, op: impl FnOnce() -> T + Send) -> T {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .unwrap()
        .install(op)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_downward_closure(rows in histories(), concurrent in any::<bool>()) {
        let result = mine(&rows, concurrent, &[MinSupport::Count(2)]);
        let threshold = &result.thresholds[0];
        for record in threshold.patterns().filter(|record| record.length() > 1) {
            for sub in sub_patterns(&record.pattern) {
                prop_assert!(threshold.contains(&sub), "{} lost a sub-pattern", result.alphabet.render(&record.pattern));
            }
        }
    }

    #[test]
    fn prop_looser_threshold_is_superset(rows in histories(), concurrent in any::<bool>()) {
        let result = mine(&rows, concurrent, &[MinSupport::Count(3), MinSupport::Count(2)]);
        let strict: HashSet<_> = result.thresholds[0].patterns().collect();
        let loose: HashSet<_> = result.thresholds[1].patterns().collect();
        prop_assert!(strict.is_subset(&loose));
    }

    #[test]
    fn prop_single_item_support_counts_subjects(rows in histories()) {
        let result = mine(&rows, false, &[MinSupport::Ratio(0.01)]);
        for record in result.thresholds[0].level(1) {
            let item = record.pattern[0].iter().next().unwrap();
            let label = result.alphabet.label(item);
            let subjects: HashSet<&str> = rows
                .iter()
                .filter(|row| row.item == label)
                .map(|row| row.subject.as_str())
                .collect();
            prop_assert_eq!(record.support, subjects.len());
        }
        prop_assert_eq!(result.thresholds[0].level(1).len(), result.alphabet.len());
    }

    #[test]
    fn prop_result_ignores_worker_count(rows in histories(), concurrent in any::<bool>()) {
        let thresholds = [MinSupport::Count(2), MinSupport::Count(1)];
        let single = on_threads(1, || mine(&rows, concurrent, &thresholds));
        let many = on_threads(4, || mine(&rows, concurrent, &thresholds));
        prop_assert_eq!(single.thresholds, many.thresholds);
        prop_assert_eq!(single.subject_count, many.subject_count);
    }

    #[test]
    fn prop_reported_support_is_exact(rows in histories(), concurrent in any::<bool>()) {
        let grouping = if concurrent { Some(GroupingUnit::Exact) } else { None };
        let db = SequenceDatabase::build(&rows, grouping).unwrap();
        let result = mine(&rows, concurrent, &[MinSupport::Count(1)]);
        for record in result.thresholds[0].patterns() {
            prop_assert_eq!(record.support, support::count(&db, &record.pattern));
        }
    }

    #[test]
    fn prop_no_itemsets_without_concurrency(rows in histories()) {
        let db = SequenceDatabase::build(&rows, None).unwrap();
        prop_assert!(db
            .sequences()
            .iter()
            .all(|sequence| sequence.elements.iter().all(|element| element.len() == 1)));

        let result = mine(&rows, false, &[MinSupport::Count(1)]);
        prop_assert!(result
            .thresholds[0]
            .patterns()
            .all(|record| record.pattern.iter().all(|element| element.len() == 1)));
    }
}

/// Brute force over every pattern up to three items confirms nothing
/// frequent is missed.
#[test]
fn test_no_false_negatives_against_brute_force() {
    let rows: Vec<EventRow> = [
        ("s1", "a", 1),
        ("s1", "b", 1),
        ("s1", "c", 2),
        ("s2", "a", 1),
        ("s2", "b", 1),
        ("s2", "c", 3),
        ("s2", "a", 4),
        ("s3", "b", 1),
        ("s3", "c", 2),
        ("s3", "a", 2),
    ]
    .iter()
    .map(|&(subject, item, time)| EventRow::new(subject, item, EventTime::Index(time)))
    .collect();

    let db = SequenceDatabase::build(&rows, Some(GroupingUnit::Exact)).unwrap();
    let result = mine(&rows, true, &[MinSupport::Count(2)]);
    let alphabet = db.alphabet();

    let labels = ["a", "b", "c"];
    let mut elements: Vec<String> = labels.iter().map(|label| label.to_string()).collect();
    for (i, x) in labels.iter().enumerate() {
        for y in &labels[i + 1..] {
            elements.push(format!("{{{}, {}}}", x, y));
        }
    }
    elements.push("{a, b, c}".to_string());

    let mut shapes: Vec<String> = elements.clone();
    for first in &elements {
        for second in &elements {
            shapes.push(format!("{} -> {}", first, second));
            for third in &elements {
                shapes.push(format!("{} -> {} -> {}", first, second, third));
            }
        }
    }

    for shape in shapes {
        let pattern = alphabet.parse(&shape).unwrap();
        if seq_tool::pattern::item_count(&pattern) > 3 {
            continue;
        }
        let frequent = support::count(&db, &pattern) >= 2;
        assert_eq!(result.thresholds[0].contains(&pattern), frequent, "{}", shape);
    }
}
