//! View projection: the rows and columns a view shows.
//!
//! Maps between two spaces:
//! - Storage space: canonical positions in `DatabaseModel::rows()` / `columns()`
//! - View space: what the user sees, after filtering, sorting and hiding
//!
//! Every projected row and column carries its original storage position, so an
//! edit made in view space can be turned back into an `Action` without lookups.
//! Projection never mutates the model.

use std::cmp::Ordering;

use ordered_float::OrderedFloat;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization as _;

use crate::column::{is_checked, split_tokens, Column, ColumnType};
use crate::model::DatabaseModel;
use crate::view::{FilterOperator, FilterRule, SortDirection, SortRule, View};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedColumn<'a> {
    pub column: &'a Column,
    /// Storage position of the column (its index in every row)
    pub original_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedRow<'a> {
    pub cells: &'a [String],
    /// Storage position of the row
    pub original_index: usize,
}

impl<'a> ProjectedRow<'a> {
    /// Cell under a projected column
    pub fn cell(&self, column: &ProjectedColumn<'_>) -> &'a str {
        self.cells.get(column.original_index).map(|c| c.as_str()).unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Projection<'a> {
    pub columns: Vec<ProjectedColumn<'a>>,
    pub rows: Vec<ProjectedRow<'a>>,
}

impl<'a> Projection<'a> {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Storage row behind a view row
    pub fn view_to_storage(&self, view_row: usize) -> Option<usize> {
        self.rows.get(view_row).map(|r| r.original_index)
    }

    /// View row showing a storage row, or None when it is filtered out
    pub fn storage_to_view(&self, storage_row: usize) -> Option<usize> {
        self.rows.iter().position(|r| r.original_index == storage_row)
    }

    /// Storage column behind a display column
    pub fn column_to_storage(&self, view_col: usize) -> Option<usize> {
        self.columns.get(view_col).map(|c| c.original_index)
    }

    /// Cell text at view coordinates
    pub fn cell(&self, view_row: usize, view_col: usize) -> Option<&'a str> {
        let row = self.rows.get(view_row)?;
        let col = self.columns.get(view_col)?;
        Some(row.cell(col))
    }

    /// View-space rows as owned strings, in display column order
    pub fn to_table(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| self.columns.iter().map(|c| row.cell(c).to_string()).collect())
            .collect()
    }

    pub fn header(&self) -> Vec<&'a str> {
        self.columns.iter().map(|c| c.column.name.as_str()).collect()
    }
}

/// Project a model through one of its views.
///
/// An out-of-range `view_index` falls back to the first view.
pub fn project_view(model: &DatabaseModel, view_index: usize) -> Projection<'_> {
    let view = match model.view(view_index) {
        Some(view) => view,
        None => {
            log::debug!("project_view: view {view_index} out of range, using first view");
            &model.views()[0]
        }
    };
    Projection { columns: project_columns(model, view), rows: project_rows(model, view) }
}

/// Columns in display order, hidden ones removed
pub fn project_columns<'a>(model: &'a DatabaseModel, view: &View) -> Vec<ProjectedColumn<'a>> {
    model
        .display_order()
        .into_iter()
        .map(|i| ProjectedColumn { column: &model.columns()[i], original_index: i })
        .filter(|c| !view.is_hidden(&c.column.name))
        .collect()
}

/// Rows passing every filter, in sorted order
pub fn project_rows<'a>(model: &'a DatabaseModel, view: &View) -> Vec<ProjectedRow<'a>> {
    let mut rows: Vec<ProjectedRow<'a>> = model
        .rows()
        .iter()
        .enumerate()
        .map(|(i, cells)| ProjectedRow { cells: cells.as_slice(), original_index: i })
        .filter(|row| view.filters.iter().all(|f| passes_filter(model, f, row.cells)))
        .collect();

    // Resolve rule columns once; rules on missing columns drop out of the chain
    let keys: Vec<(usize, ColumnType, SortDirection)> = view
        .sorts
        .iter()
        .filter_map(|rule: &SortRule| {
            let pos = model.column_position(&rule.column)?;
            Some((pos, model.columns()[pos].kind, rule.direction))
        })
        .collect();

    if !keys.is_empty() {
        // Vec::sort_by is stable: rows equal on every key keep storage order
        rows.sort_by(|a, b| {
            for &(pos, kind, direction) in &keys {
                let left = a.cells.get(pos).map(|c| c.as_str()).unwrap_or("");
                let right = b.cells.get(pos).map(|c| c.as_str()).unwrap_or("");
                let ord = compare_cells(kind, left, right);
                let ord = match direction {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
    }

    rows
}

// =============================================================================
// Filtering
// =============================================================================

fn passes_filter(model: &DatabaseModel, filter: &FilterRule, cells: &[String]) -> bool {
    let Some(pos) = model.column_position(&filter.column) else {
        return true;
    };
    let cell = cells.get(pos).map(|c| c.as_str()).unwrap_or("");
    let kind = model.columns()[pos].kind;

    match filter.operator {
        FilterOperator::IsEmpty => cell.is_empty(),
        FilterOperator::IsNotEmpty => !cell.is_empty(),
        FilterOperator::Contains => cell_contains(kind, cell, &filter.value),
        FilterOperator::DoesNotContain => !cell_contains(kind, cell, &filter.value),
    }
}

/// Does the cell match any of the values? An empty value list matches everything.
pub fn cell_contains(kind: ColumnType, cell: &str, values: &[String]) -> bool {
    if values.is_empty() {
        return true;
    }
    match kind {
        ColumnType::MultiSelect => {
            let tokens = split_tokens(cell);
            values.iter().any(|v| tokens.contains(&v.as_str()))
        }
        ColumnType::Select => values.iter().any(|v| v == cell),
        _ => {
            let haystack = cell.to_lowercase();
            values.iter().any(|v| haystack.contains(&v.to_lowercase()))
        }
    }
}

// =============================================================================
// Sorting
// =============================================================================

/// Ascending comparison of two cells of the given column type
pub fn compare_cells(kind: ColumnType, a: &str, b: &str) -> Ordering {
    match kind {
        // None (not a number) sorts below every number
        ColumnType::Number => parse_number(a).cmp(&parse_number(b)),
        ColumnType::Checkbox => is_checked(a).cmp(&is_checked(b)),
        _ => compare_text(a, b),
    }
}

/// Collation-style ordering, weakest difference last:
/// base letters (accents and case folded away), then accents, then case
/// (lowercase first), then raw code points.
fn compare_text(a: &str, b: &str) -> Ordering {
    base_letters(a)
        .cmp(base_letters(b))
        .then_with(|| accented(a).cmp(accented(b)))
        .then_with(|| {
            for (x, y) in a.nfd().zip(b.nfd()) {
                if x != y {
                    match (x.is_lowercase(), y.is_lowercase()) {
                        (true, false) => return Ordering::Less,
                        (false, true) => return Ordering::Greater,
                        _ => {}
                    }
                }
            }
            Ordering::Equal
        })
        .then_with(|| a.cmp(b))
}

/// Compatibility-decomposed, combining marks stripped, lowercased: "Éclair" -> "eclair"
fn base_letters(s: &str) -> impl Iterator<Item = char> + '_ {
    s.nfkd().filter(|&c| !is_combining_mark(c)).flat_map(char::to_lowercase)
}

/// Lowercased canonical decomposition, marks kept: "é" sorts after "e"
fn accented(s: &str) -> impl Iterator<Item = char> + '_ {
    s.nfd().flat_map(char::to_lowercase)
}

/// Numeric value of the longest numeric prefix of `text` (leading whitespace allowed).
///
/// `"12px"` reads as 12, `"abc"` and `""` as not-a-number.
pub fn parse_number(text: &str) -> Option<OrderedFloat<f64>> {
    let s = text.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    if s[end..].starts_with("Infinity") {
        let inf = if s.starts_with('-') { f64::NEG_INFINITY } else { f64::INFINITY };
        return Some(OrderedFloat(inf));
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }

    // Exponent only counts when followed by at least one digit
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && matches!(bytes[exp_end], b'+' | b'-') {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().ok().filter(|n| !n.is_nan()).map(OrderedFloat)
}
