use std::collections::BTreeMap;

use crate::model::{Cell, Dataset};

/// A quantity cell after coercion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Numeric {
    Number(f64),
    Missing,
}

/// Numbers pass through, numeric text is parsed, everything else is missing.
pub fn coerce(cell: &Cell) -> Numeric {
    let n = match cell {
        Cell::Number(n) => Some(*n),
        Cell::Text(s) => s.trim().parse::<f64>().ok(),
        Cell::Empty | Cell::Bool(_) | Cell::DateTime(_) => None,
    };
    match n {
        Some(n) if n.is_finite() => Numeric::Number(n),
        _ => Numeric::Missing,
    }
}

/// Sum of the present values and the count of missing ones. An empty or
/// all-missing input sums to 0.
pub fn missing_aware_sum<I: IntoIterator<Item = Numeric>>(values: I) -> (f64, usize) {
    values.into_iter().fold((0.0, 0), |(sum, missing), v| match v {
        Numeric::Number(n) => (sum + n, missing),
        Numeric::Missing => (sum, missing + 1),
    })
}

/// One group of an aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    /// Key cells as canonical text, in key-column order.
    pub key: Vec<String>,
    pub total: f64,
    pub rows: usize,
    pub missing: usize,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Aggregation {
    /// Sorted by key.
    pub groups: Vec<Group>,
    /// Input rows seen; every row lands in exactly one group.
    pub rows: usize,
    pub missing: usize,
}

/// Group rows by the key columns and sum `value_column` in row order.
pub fn aggregate(dataset: &Dataset, key_columns: &[usize], value_column: usize) -> Aggregation {
    let mut groups: BTreeMap<Vec<String>, (f64, usize, usize)> = BTreeMap::new();

    for row in dataset.rows() {
        let key: Vec<String> = key_columns
            .iter()
            .map(|&c| row.get(c).map(Cell::key_text).unwrap_or_default())
            .collect();
        let value = row.get(value_column).map(coerce).unwrap_or(Numeric::Missing);
        let entry = groups.entry(key).or_insert((0.0, 0, 0));
        match value {
            Numeric::Number(n) => entry.0 += n,
            Numeric::Missing => entry.2 += 1,
        }
        entry.1 += 1;
    }

    let mut out = Aggregation::default();
    for (key, (total, rows, missing)) in groups {
        out.rows += rows;
        out.missing += missing;
        out.groups.push(Group {
            key,
            total,
            rows,
            missing,
        });
    }
    out
}
