use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde_json::Value;

use crate::i18n::Locale;
use crate::types::{Record, display_value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub key: String,
    pub direction: SortDirection,
}

/// Client-side view settings over the loaded record set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridQuery {
    pub search: String,
    /// Column key -> accepted substrings (any may match).
    pub filters: BTreeMap<String, Vec<String>>,
    pub sort: Option<SortSpec>,
}

fn cell_text(record: &Record, key: &str) -> Option<String> {
    match record.get(key) {
        None | Some(Value::Null) => None,
        Some(value) => Some(display_value(value)),
    }
}

/// True if any of `columns` contains `term`, ignoring case. An empty term
/// matches everything.
#[must_use]
pub fn matches_search(record: &Record, columns: &[String], term: &str) -> bool {
    if term.is_empty() {
        return true;
    }
    let term = term.to_lowercase();
    columns.iter().any(|key| {
        cell_text(record, key).is_some_and(|text| text.to_lowercase().contains(&term))
    })
}

#[must_use]
pub fn matches_filters(record: &Record, filters: &BTreeMap<String, Vec<String>>) -> bool {
    filters.iter().all(|(key, accepted)| {
        if accepted.is_empty() {
            return true;
        }
        let Some(text) = cell_text(record, key) else {
            return false;
        };
        let text = text.to_lowercase();
        accepted
            .iter()
            .any(|needle| text.contains(&needle.to_lowercase()))
    })
}

/// Column ordering: strings case-insensitively (exact order breaks ties),
/// numbers numerically, missing values last regardless of direction.
fn compare_cells(a: Option<&Value>, b: Option<&Value>, direction: SortDirection) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    let ordering = match (a, b) {
        (None, None) => return Ordering::Equal,
        (None, Some(_)) => return Ordering::Greater,
        (Some(_), None) => return Ordering::Less,
        (Some(Value::String(x)), Some(Value::String(y))) => x
            .to_lowercase()
            .cmp(&y.to_lowercase())
            .then_with(|| x.cmp(y)),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => display_value(x).cmp(&display_value(y)),
    };
    match direction {
        SortDirection::Ascending => ordering,
        SortDirection::Descending => ordering.reverse(),
    }
}

/// Search, then column filters, then a stable sort.
#[must_use]
pub fn apply<'a>(records: &'a [Record], columns: &[String], query: &GridQuery) -> Vec<&'a Record> {
    let mut rows: Vec<&Record> = records
        .iter()
        .filter(|record| matches_search(record, columns, &query.search))
        .filter(|record| matches_filters(record, &query.filters))
        .collect();
    if let Some(sort) = &query.sort {
        rows.sort_by(|a, b| compare_cells(a.get(&sort.key), b.get(&sort.key), sort.direction));
    }
    rows
}

/// One page of rows plus its position in the whole result.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub rows: Vec<T>,
    /// 1-based page number actually shown.
    pub number: usize,
    pub page_count: usize,
    pub total: usize,
    /// 1-based index of the first row, 0 when empty.
    pub start: usize,
    pub end: usize,
}

impl<T> Page<T> {
    #[must_use]
    pub fn summary(&self, locale: Locale) -> String {
        locale.page_summary(self.start, self.end, self.total)
    }
}

/// Cuts `rows` to one page. Out-of-range page numbers clamp to the nearest
/// valid page.
#[must_use]
pub fn paginate<T>(rows: Vec<T>, page: usize, page_size: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let total = rows.len();
    let page_count = total.div_ceil(page_size).max(1);
    let number = page.clamp(1, page_count);
    let offset = (number - 1) * page_size;
    let rows: Vec<T> = rows.into_iter().skip(offset).take(page_size).collect();
    let (start, end) = if rows.is_empty() {
        (0, 0)
    } else {
        (offset + 1, offset + rows.len())
    };
    Page {
        rows,
        number,
        page_count,
        total,
        start,
        end,
    }
}
