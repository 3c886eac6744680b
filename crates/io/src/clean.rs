// Load-time cleaning of known columns

use salesgrid_recon::model::{Cell, Dataset};

use crate::xlsx::{excel_serial_to_datetime, parse_datetime};

/// Date column coerced to date/time; unparseable cells become empty.
pub const DATE_COLUMN: &str = "日期";
/// Sales-type column coerced to text so codes like `1` and `"1"` agree.
pub const SALES_KIND_COLUMN: &str = "實績種類";

pub fn clean(dataset: &mut Dataset) {
    if let Some(col) = dataset.column_index(DATE_COLUMN) {
        let mut dropped = 0usize;
        dataset.map_column(col, |cell| {
            let out = to_datetime(cell);
            if out.is_empty() && !cell.is_empty() {
                dropped += 1;
            }
            out
        });
        if dropped > 0 {
            log::warn!("{dropped} value(s) in '{DATE_COLUMN}' are not dates and were cleared");
        }
    }
    if let Some(col) = dataset.column_index(SALES_KIND_COLUMN) {
        dataset.map_column(col, |cell| match cell {
            Cell::Empty => Cell::Empty,
            other => Cell::text(other.key_text()),
        });
    }
}

fn to_datetime(cell: &Cell) -> Cell {
    let parsed = match cell {
        Cell::DateTime(dt) => Some(*dt),
        Cell::Number(n) => excel_serial_to_datetime(*n),
        Cell::Text(s) => parse_datetime(s),
        Cell::Empty | Cell::Bool(_) => None,
    };
    parsed.map_or(Cell::Empty, Cell::DateTime)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn date_and_kind_columns_cleaned() {
        let mut ds = Dataset::new(
            vec!["日期".into(), "實績種類".into(), "other".into()],
            vec![
                vec![Cell::text("2024/03/01"), Cell::Number(1.0), Cell::Number(1.0)],
                vec![Cell::text("soon"), Cell::Empty, Cell::text("x")],
                vec![Cell::Number(45292.0), Cell::text("零售"), Cell::Empty],
            ],
        )
        .unwrap();
        clean(&mut ds);

        let mar1 = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let jan1 = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(ds.cell(0, 0), Some(&Cell::DateTime(mar1)));
        assert_eq!(ds.cell(1, 0), Some(&Cell::Empty));
        assert_eq!(ds.cell(2, 0), Some(&Cell::DateTime(jan1)));

        assert_eq!(ds.cell(0, 1), Some(&Cell::text("1")));
        assert_eq!(ds.cell(1, 1), Some(&Cell::Empty));
        assert_eq!(ds.cell(2, 1), Some(&Cell::text("零售")));

        assert_eq!(ds.cell(0, 2), Some(&Cell::Number(1.0)));
    }

    #[test]
    fn datasets_without_known_columns_untouched() {
        let mut ds = Dataset::new(vec!["a".into()], vec![vec![Cell::text("2024-01-01")]]).unwrap();
        let before = ds.clone();
        clean(&mut ds);
        assert_eq!(ds, before);
    }
}
