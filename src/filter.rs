use rayon::prelude::*;

use crate::flatten::FlatRow;

/// Returns the rows with any cell containing `query`, in their stored order.
///
/// Only the cell text is lower-cased, the query is matched as typed. An upper
/// case query therefore never matches cells with letters.
pub fn filter_rows<'a>(rows: &'a [FlatRow], query: &str) -> Vec<&'a FlatRow> {
    if query.is_empty() {
        return rows.iter().collect();
    }
    rows.par_iter()
        .filter(|row| row_matches(row, query))
        .collect()
}

fn row_matches(row: &FlatRow, query: &str) -> bool {
    row.cells()
        .iter()
        .any(|cell| cell.to_string().to_lowercase().contains(query))
}
