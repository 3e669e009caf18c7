use std::cmp::Ordering;

use tracing::trace;

use crate::flatten::{FlatRow, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Unsorted,
    Ascending,
    Descending,
}

impl SortDirection {
    /// Direction stored after a toggle. Unsorted behaves like ascending, so the
    /// first toggle of any column sorts ascending and the second descending.
    pub fn next(self) -> Self {
        match self {
            SortDirection::Unsorted => SortDirection::Descending,
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    /// The order `sort_rows` actually applies for this direction.
    pub fn applied(self) -> Self {
        match self {
            SortDirection::Unsorted | SortDirection::Ascending => SortDirection::Ascending,
            SortDirection::Descending => SortDirection::Descending,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            SortDirection::Unsorted => "",
            SortDirection::Ascending => "↑",
            SortDirection::Descending => "↓",
        }
    }
}

// Values of different kinds never compare by content, they follow this rank.
fn kind_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::Text(_) => 3,
    }
}

/// Natural ordering of two cells. Numbers compare numerically, text by bytes.
/// Mixed kinds are ordered by kind (null, bool, number, text), not by coercion.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => {
            let a = a.as_f64().unwrap_or(f64::NAN);
            let b = b.as_f64().unwrap_or(f64::NAN);
            a.total_cmp(&b)
        }
        (Value::Text(a), Value::Text(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        _ => kind_rank(a).cmp(&kind_rank(b)),
    }
}

/// Stable in place sort of `rows` by the cells of `column`.
pub fn sort_rows(rows: &mut [FlatRow], column: usize, direction: SortDirection) {
    let cmp = |a: &FlatRow, b: &FlatRow| match (a.get(column), b.get(column)) {
        (Some(a), Some(b)) => compare_values(a, b),
        (a, b) => a.is_some().cmp(&b.is_some()),
    };
    match direction.applied() {
        SortDirection::Descending => rows.sort_by(|a, b| cmp(b, a)),
        _ => rows.sort_by(cmp),
    }
}

/// Per column sort directions, indexed like the dataset headers.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SortState {
    directions: Vec<SortDirection>,
    active: Option<(usize, SortDirection)>,
}

impl SortState {
    pub fn new(columns: usize) -> Self {
        SortState {
            directions: vec![SortDirection::Unsorted; columns],
            active: None,
        }
    }

    pub fn direction(&self, column: usize) -> SortDirection {
        self.directions.get(column).copied().unwrap_or_default()
    }

    /// Column and order of the most recent sort.
    pub fn active(&self) -> Option<(usize, SortDirection)> {
        self.active
    }

    /// Sorts `rows` using the stored direction of `column`, then stores the
    /// next direction for that column only.
    pub fn toggle(&mut self, rows: &mut [FlatRow], column: usize) {
        if column >= self.directions.len() {
            self.directions.resize(column + 1, SortDirection::Unsorted);
        }
        let current = self.direction(column);
        sort_rows(rows, column, current);
        self.directions[column] = current.next();
        self.active = Some((column, current.applied()));
        trace!(
            "Sorted column {column} {:?}, next {:?}",
            current.applied(),
            self.directions[column]
        );
    }
}
