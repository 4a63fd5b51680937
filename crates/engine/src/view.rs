//! Saved views: named sort/filter/visibility rules over the same rows.
//!
//! Views reference columns by NAME, never by storage position. The model rewrites
//! these references when a column is renamed and prunes them when a column is
//! deleted, so a view never points at a column that does not exist.
//!
//! The `with_*` helpers are pure edits used by presentation code to build the
//! payload of an update-view transition.

use serde::{Deserialize, Serialize};

use crate::column::Column;

/// Name of the view every new document starts with
pub const DEFAULT_VIEW_NAME: &str = "Default";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortRule {
    pub column: String,
    #[serde(default)]
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterOperator {
    #[default]
    Contains,
    DoesNotContain,
    IsEmpty,
    IsNotEmpty,
}

impl FilterOperator {
    /// Empty-tests ignore the value list
    pub fn takes_values(&self) -> bool {
        matches!(self, FilterOperator::Contains | FilterOperator::DoesNotContain)
    }

    pub fn label(&self) -> &'static str {
        match self {
            FilterOperator::Contains => "Contains",
            FilterOperator::DoesNotContain => "Does not contain",
            FilterOperator::IsEmpty => "Is empty",
            FilterOperator::IsNotEmpty => "Is not empty",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRule {
    pub column: String,
    #[serde(default)]
    pub operator: FilterOperator,
    #[serde(default)]
    pub value: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    pub name: String,
    #[serde(default)]
    pub sorts: Vec<SortRule>,
    #[serde(default)]
    pub filters: Vec<FilterRule>,
    /// Treated as a set; order is kept only so files round-trip byte for byte
    #[serde(default)]
    pub hidden_columns: Vec<String>,
}

impl Default for View {
    fn default() -> Self {
        Self::new(DEFAULT_VIEW_NAME)
    }
}

impl View {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sorts: Vec::new(),
            filters: Vec::new(),
            hidden_columns: Vec::new(),
        }
    }

    pub fn is_hidden(&self, column: &str) -> bool {
        self.hidden_columns.iter().any(|c| c == column)
    }

    /// Does any sort, filter, or visibility rule mention this column?
    pub fn references(&self, column: &str) -> bool {
        self.sorts.iter().any(|s| s.column == column)
            || self.filters.iter().any(|f| f.column == column)
            || self.is_hidden(column)
    }

    // -------------------------------------------------------------------------
    // Cascades (driven by the model on column rename/delete)
    // -------------------------------------------------------------------------

    pub(crate) fn rename_column(&mut self, old: &str, new: &str) {
        for sort in self.sorts.iter_mut().filter(|s| s.column == old) {
            sort.column = new.to_string();
        }
        for filter in self.filters.iter_mut().filter(|f| f.column == old) {
            filter.column = new.to_string();
        }
        for hidden in self.hidden_columns.iter_mut().filter(|h| h.as_str() == old) {
            *hidden = new.to_string();
        }
    }

    pub(crate) fn drop_column(&mut self, name: &str) {
        self.sorts.retain(|s| s.column != name);
        self.filters.retain(|f| f.column != name);
        self.hidden_columns.retain(|h| h != name);
    }

    /// Remove every reference for which `exists` is false, and collapse duplicate hidden entries
    pub(crate) fn retain_columns<F: Fn(&str) -> bool>(&mut self, exists: F) {
        self.sorts.retain(|s| exists(&s.column));
        self.filters.retain(|f| exists(&f.column));
        let mut seen: Vec<String> = Vec::with_capacity(self.hidden_columns.len());
        for hidden in self.hidden_columns.drain(..) {
            if exists(&hidden) && !seen.contains(&hidden) {
                seen.push(hidden);
            }
        }
        self.hidden_columns = seen;
    }

    // -------------------------------------------------------------------------
    // Editing helpers
    // -------------------------------------------------------------------------

    /// Append an ascending sort on the first column not already sorted on.
    /// Falls back to the first column; a table without columns gets no sort.
    pub fn with_sort_added(&self, columns: &[&Column]) -> View {
        let mut next = self.clone();
        let pick = columns
            .iter()
            .find(|c| !self.sorts.iter().any(|s| s.column == c.name))
            .or_else(|| columns.first());
        if let Some(col) = pick {
            next.sorts.push(SortRule { column: col.name.clone(), direction: SortDirection::Asc });
        }
        next
    }

    /// Append an empty `contains` filter on the first column
    pub fn with_filter_added(&self, columns: &[&Column]) -> View {
        let mut next = self.clone();
        if let Some(col) = columns.first() {
            next.filters.push(FilterRule {
                column: col.name.clone(),
                operator: FilterOperator::Contains,
                value: Vec::new(),
            });
        }
        next
    }

    /// Point a filter at another column. The old values make no sense there, so they are cleared.
    pub fn with_filter_column(&self, index: usize, column: &str) -> View {
        let mut next = self.clone();
        if let Some(filter) = next.filters.get_mut(index) {
            filter.column = column.to_string();
            filter.value.clear();
        }
        next
    }

    /// Switching to an empty-test clears the filter's values
    pub fn with_filter_operator(&self, index: usize, operator: FilterOperator) -> View {
        let mut next = self.clone();
        if let Some(filter) = next.filters.get_mut(index) {
            filter.operator = operator;
            if !operator.takes_values() {
                filter.value.clear();
            }
        }
        next
    }

    pub fn with_filter_values(&self, index: usize, values: Vec<String>) -> View {
        let mut next = self.clone();
        if let Some(filter) = next.filters.get_mut(index) {
            filter.value = values;
        }
        next
    }

    pub fn with_sort_direction(&self, index: usize, direction: SortDirection) -> View {
        let mut next = self.clone();
        if let Some(sort) = next.sorts.get_mut(index) {
            sort.direction = direction;
        }
        next
    }

    pub fn without_sort(&self, index: usize) -> View {
        let mut next = self.clone();
        if index < next.sorts.len() {
            next.sorts.remove(index);
        }
        next
    }

    pub fn without_filter(&self, index: usize) -> View {
        let mut next = self.clone();
        if index < next.filters.len() {
            next.filters.remove(index);
        }
        next
    }

    pub fn with_sorts_cleared(&self) -> View {
        View { sorts: Vec::new(), ..self.clone() }
    }

    pub fn with_filters_cleared(&self) -> View {
        View { filters: Vec::new(), ..self.clone() }
    }

    pub fn with_hidden_toggled(&self, column: &str) -> View {
        let mut next = self.clone();
        if next.is_hidden(column) {
            next.hidden_columns.retain(|h| h != column);
        } else {
            next.hidden_columns.push(column.to_string());
        }
        next
    }
}

/// Parse free-text filter input: comma separated, trimmed, empties dropped
pub fn parse_filter_input(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

/// Inverse of `parse_filter_input`, for pre-filling an input box
pub fn format_filter_input(values: &[String]) -> String {
    values.join(", ")
}
