//! The database model and its state transitions.
//!
//! Three collections are kept mutually consistent:
//! - `columns`: schema, indexed by STORAGE position (fixed at creation)
//! - `rows`: cell arrays aligned to storage position, never to display order
//! - `views`: sort/filter/visibility rules that reference columns BY NAME
//!
//! Invariants (checked by `check_invariants`, preserved by every transition):
//! 1. every row has exactly `columns.len()` cells
//! 2. column names are pairwise distinct
//! 3. views only reference existing column names
//! 4. `column_index` values are pairwise distinct (total display order)
//! 5. option values are unique within a column, and only select-like columns carry options
//! 6. there is at least one view, and view names are pairwise distinct
//!
//! Fields are private: the only way to change a model is through an `Action`.

use std::fmt;

use rustc_hash::FxHashSet;

use crate::action::{Action, ColumnUpdate};
use crate::column::{
    join_tokens, pick_color, split_tokens, Column, ColumnType, SelectOption, TagColor,
    ADD_COLUMN_WIDTH, MIN_COLUMN_WIDTH,
};
use crate::view::View;

/// Name given to columns and views whose requested name is blank
pub const UNTITLED: &str = "Untitled";

#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseModel {
    columns: Vec<Column>,
    rows: Vec<Vec<String>>,
    views: Vec<View>,
}

impl Default for DatabaseModel {
    fn default() -> Self {
        Self::new()
    }
}

impl DatabaseModel {
    /// Empty table with the single default view
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            views: vec![View::default()],
        }
    }

    /// Assemble a model from loosely-validated parts (e.g. a hand-edited file).
    ///
    /// Anything that would break an invariant is repaired rather than rejected:
    /// blank or duplicate column names are renamed, colliding display indices are
    /// moved to the end, rows are padded/truncated,
    /// option lists are cleaned, missing views are defaulted, duplicate view names
    /// are suffixed and dangling view references are pruned.
    pub fn from_parts(columns: Vec<Column>, rows: Vec<Vec<String>>, views: Vec<View>) -> Self {
        let mut model = Self { columns: Vec::with_capacity(columns.len()), rows: Vec::new(), views: Vec::new() };

        for mut column in columns {
            let requested = if column.name.trim().is_empty() { UNTITLED.to_string() } else { column.name.clone() };
            let name = model.unique_column_name(&requested, None);
            if name != column.name {
                log::debug!("renamed column '{}' to '{}' on load", column.name, name);
            }
            column.name = name;
            column.options = normalize_options(column.kind, column.options.take().unwrap_or_default());
            if model.columns.iter().any(|c| c.column_index == column.column_index) {
                let next = model.next_column_index();
                log::debug!("column '{}': columnIndex {} taken, using {}", column.name, column.column_index, next);
                column.column_index = next;
            }
            model.columns.push(column);
        }

        let width = model.columns.len();
        model.rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();

        for mut view in views {
            let requested = if view.name.trim().is_empty() { UNTITLED.to_string() } else { view.name.clone() };
            view.name = model.unique_view_name(&requested, None);
            view.retain_columns(|c| model.column_position(c).is_some());
            model.views.push(view);
        }
        if model.views.is_empty() {
            model.views.push(View::default());
        }

        model
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn views(&self) -> &[View] {
        &self.views
    }

    pub fn column(&self, col: usize) -> Option<&Column> {
        self.columns.get(col)
    }

    pub fn row(&self, row: usize) -> Option<&[String]> {
        self.rows.get(row).map(|r| r.as_slice())
    }

    pub fn view(&self, view: usize) -> Option<&View> {
        self.views.get(view)
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row).and_then(|r| r.get(col)).map(|c| c.as_str())
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Storage position of the column with this name
    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn view_position(&self, name: &str) -> Option<usize> {
        self.views.iter().position(|v| v.name == name)
    }

    /// Storage positions in display order (ascending `column_index`, ties by storage position)
    pub fn display_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.columns.len()).collect();
        order.sort_by_key(|&i| self.columns[i].column_index);
        order
    }

    /// Columns in display order
    pub fn display_columns(&self) -> Vec<&Column> {
        self.display_order().into_iter().map(|i| &self.columns[i]).collect()
    }

    /// Rendered table width: every column plus the add-column affordance
    pub fn total_width(&self) -> f64 {
        self.columns.iter().map(Column::effective_width).sum::<f64>() + ADD_COLUMN_WIDTH
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Apply one action and return the resulting model. `self` is left untouched.
    pub fn apply(&self, action: Action) -> DatabaseModel {
        let mut next = self.clone();
        next.apply_mut(action);
        next
    }

    /// Apply one action in place.
    ///
    /// Out-of-range positions are caller bugs: they are logged and ignored, so the
    /// model is never left half-edited.
    pub fn apply_mut(&mut self, action: Action) {
        log::debug!("apply {}", action.kind());
        match action {
            Action::SetCell { row, col, value } => self.set_cell(row, col, value),
            Action::AddRow => self.add_row(),
            Action::DeleteRow { row } => self.delete_row(row),
            Action::AddColumn { column } => self.add_column(column),
            Action::DeleteColumn { col } => self.delete_column(col),
            Action::UpdateColumn { col, update } => self.update_column(col, update),
            Action::SetColumnWidth { col, width } => self.set_column_width(col, width),
            Action::ReorderColumn { a, b } => self.reorder_column(a, b),
            Action::AddSelectOption { col, value, color } => self.add_select_option(col, value, color),
            Action::UpdateSelectOption { col, old_value, replacement } => {
                self.update_select_option(col, &old_value, replacement)
            }
            Action::RemoveOptionDefinition { col, value } => self.remove_option_definition(col, &value),
            Action::AddView { name } => self.add_view(&name),
            Action::RenameView { view, name } => self.rename_view(view, &name),
            Action::DeleteView { view } => self.delete_view(view),
            Action::UpdateView { view, replacement } => self.update_view(view, replacement),
        }
    }

    // -------------------------------------------------------------------------
    // Rows
    // -------------------------------------------------------------------------

    fn set_cell(&mut self, row: usize, col: usize, value: String) {
        match self.rows.get_mut(row).and_then(|r| r.get_mut(col)) {
            Some(cell) => *cell = value,
            None => log::warn!("set_cell: ({row}, {col}) out of range"),
        }
    }

    fn add_row(&mut self) {
        self.rows.push(vec![String::new(); self.columns.len()]);
    }

    fn delete_row(&mut self, row: usize) {
        if row >= self.rows.len() {
            log::warn!("delete_row: row {row} out of range");
            return;
        }
        self.rows.remove(row);
    }

    // -------------------------------------------------------------------------
    // Columns
    // -------------------------------------------------------------------------

    fn add_column(&mut self, mut column: Column) {
        let requested = if column.name.trim().is_empty() { UNTITLED.to_string() } else { column.name.clone() };
        column.name = self.unique_column_name(&requested, None);
        column.column_index = self.next_column_index();
        column.options = normalize_options(column.kind, column.options.take().unwrap_or_default());
        if let Some(w) = column.width {
            column.width = clamp_width(w);
        }

        self.columns.push(column);
        for row in &mut self.rows {
            row.push(String::new());
        }
    }

    /// Display index that puts a new column after every existing one.
    ///
    /// When `max + 1` would overflow, existing indices are first renumbered 0..n
    /// in their current display order.
    fn next_column_index(&mut self) -> i64 {
        let Some(max) = self.columns.iter().map(|c| c.column_index).max() else {
            return 0;
        };
        if let Some(next) = max.checked_add(1) {
            return next;
        }
        log::debug!("columnIndex {max} at the limit, renumbering {} columns", self.columns.len());
        for (position, storage) in self.display_order().into_iter().enumerate() {
            self.columns[storage].column_index = position as i64;
        }
        self.columns.len() as i64
    }

    fn delete_column(&mut self, col: usize) {
        if col >= self.columns.len() {
            log::warn!("delete_column: column {col} out of range");
            return;
        }

        let removed = self.columns.remove(col);
        for row in &mut self.rows {
            if col < row.len() {
                row.remove(col);
            }
        }

        // Close the display-order gap
        for column in &mut self.columns {
            if column.column_index > removed.column_index {
                column.column_index -= 1;
            }
        }

        for view in &mut self.views {
            view.drop_column(&removed.name);
        }
    }

    fn update_column(&mut self, col: usize, update: ColumnUpdate) {
        if col >= self.columns.len() {
            log::warn!("update_column: column {col} out of range");
            return;
        }

        let requested = if update.name.trim().is_empty() { UNTITLED.to_string() } else { update.name };
        let name = self.unique_column_name(&requested, Some(col));
        let options = normalize_options(update.kind, update.options);

        let column = &mut self.columns[col];
        let old_name = std::mem::replace(&mut column.name, name.clone());
        column.kind = update.kind;
        column.options = options;
        if let Some(wrap) = update.wrap_content {
            column.wrap_content = Some(wrap);
        }

        if old_name != name {
            for view in &mut self.views {
                view.rename_column(&old_name, &name);
            }
        }
    }

    fn set_column_width(&mut self, col: usize, width: f64) {
        let Some(column) = self.columns.get_mut(col) else {
            log::warn!("set_column_width: column {col} out of range");
            return;
        };
        match clamp_width(width) {
            Some(w) => column.width = Some(w),
            None => log::warn!("set_column_width: ignoring non-finite width {width}"),
        }
    }

    fn reorder_column(&mut self, a: usize, b: usize) {
        if a >= self.columns.len() || b >= self.columns.len() {
            log::warn!("reorder_column: ({a}, {b}) out of range");
            return;
        }
        if a == b {
            return;
        }
        let ia = self.columns[a].column_index;
        self.columns[a].column_index = self.columns[b].column_index;
        self.columns[b].column_index = ia;
    }

    // -------------------------------------------------------------------------
    // Select options
    // -------------------------------------------------------------------------

    /// Option list of a select-like column, or None (logged) when the column can't carry options
    fn options_mut(&mut self, col: usize, op: &str) -> Option<&mut Vec<SelectOption>> {
        let Some(column) = self.columns.get_mut(col) else {
            log::warn!("{op}: column {col} out of range");
            return None;
        };
        if !column.kind.has_options() {
            log::warn!("{op}: column '{}' is not a select column", column.name);
            return None;
        }
        Some(column.options.get_or_insert_with(Vec::new))
    }

    fn add_select_option(&mut self, col: usize, value: String, color: Option<TagColor>) {
        let Some(options) = self.options_mut(col, "add_select_option") else {
            return;
        };
        let value = value.trim();
        if value.is_empty() || options.iter().any(|o| o.value == value) {
            return;
        }
        let color = color.unwrap_or_else(|| pick_color(options.len()));
        options.push(SelectOption::new(value, color));
    }

    fn update_select_option(&mut self, col: usize, old_value: &str, replacement: Option<SelectOption>) {
        let Some(options) = self.options_mut(col, "update_select_option") else {
            return;
        };
        let Some(pos) = options.iter().position(|o| o.value == old_value) else {
            log::warn!("update_select_option: no option '{old_value}'");
            return;
        };

        let new_value = match replacement {
            None => {
                options.remove(pos);
                None
            }
            Some(replacement) => {
                let value = replacement.value.trim().to_string();
                if value.is_empty() {
                    log::warn!("update_select_option: blank replacement for '{old_value}'");
                    return;
                }
                if value == old_value {
                    options[pos].color = replacement.color;
                    return;
                }
                if options.iter().any(|o| o.value == value) {
                    // Renamed onto an existing option: the two merge, keeping the existing definition
                    options.remove(pos);
                } else {
                    options[pos] = SelectOption::new(value.clone(), replacement.color);
                }
                Some(value)
            }
        };

        let kind = self.columns[col].kind;
        for row in &mut self.rows {
            if let Some(cell) = row.get_mut(col) {
                if let Some(rewritten) = rewrite_cell(kind, cell, old_value, new_value.as_deref()) {
                    *cell = rewritten;
                }
            }
        }
    }

    fn remove_option_definition(&mut self, col: usize, value: &str) {
        if let Some(options) = self.options_mut(col, "remove_option_definition") {
            options.retain(|o| o.value != value);
        }
    }

    // -------------------------------------------------------------------------
    // Views
    // -------------------------------------------------------------------------

    fn add_view(&mut self, name: &str) {
        let requested = if name.trim().is_empty() { UNTITLED } else { name.trim() };
        let name = self.unique_view_name(requested, None);
        self.views.push(View::new(name));
    }

    fn rename_view(&mut self, view: usize, name: &str) {
        if view >= self.views.len() {
            log::warn!("rename_view: view {view} out of range");
            return;
        }
        let name = name.trim();
        if name.is_empty() {
            return;
        }
        let name = self.unique_view_name(name, Some(view));
        self.views[view].name = name;
    }

    fn delete_view(&mut self, view: usize) {
        if view >= self.views.len() {
            log::warn!("delete_view: view {view} out of range");
            return;
        }
        if self.views.len() <= 1 {
            log::debug!("delete_view: keeping the last view");
            return;
        }
        self.views.remove(view);
    }

    fn update_view(&mut self, view: usize, mut replacement: View) {
        if view >= self.views.len() {
            log::warn!("update_view: view {view} out of range");
            return;
        }
        if replacement.name.trim().is_empty() {
            replacement.name = self.views[view].name.clone();
        }
        replacement.name = self.unique_view_name(&replacement.name, Some(view));
        replacement.retain_columns(|c| self.columns.iter().any(|col| col.name == c));
        self.views[view] = replacement;
    }

    // -------------------------------------------------------------------------
    // Naming
    // -------------------------------------------------------------------------

    /// `base`, or `base 2`, `base 3`, ... whichever is first unused by other columns
    fn unique_column_name(&self, base: &str, exclude: Option<usize>) -> String {
        unique_name(base, |candidate| {
            self.columns
                .iter()
                .enumerate()
                .any(|(i, c)| Some(i) != exclude && c.name == candidate)
        })
    }

    fn unique_view_name(&self, base: &str, exclude: Option<usize>) -> String {
        unique_name(base, |candidate| {
            self.views
                .iter()
                .enumerate()
                .any(|(i, v)| Some(i) != exclude && v.name == candidate)
        })
    }

    // =========================================================================
    // Invariants
    // =========================================================================

    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let width = self.columns.len();
        for (i, row) in self.rows.iter().enumerate() {
            if row.len() != width {
                return Err(InvariantViolation::RowWidth { row: i, expected: width, actual: row.len() });
            }
        }

        let mut names = FxHashSet::default();
        let mut indices = FxHashSet::default();
        for column in &self.columns {
            if !names.insert(column.name.as_str()) {
                return Err(InvariantViolation::DuplicateColumnName(column.name.clone()));
            }
            if !indices.insert(column.column_index) {
                return Err(InvariantViolation::DuplicateColumnIndex(column.column_index));
            }
            if !column.kind.has_options() && column.options.is_some() {
                return Err(InvariantViolation::OptionsOnPlainColumn(column.name.clone()));
            }
            let mut values = FxHashSet::default();
            for option in column.options() {
                if !values.insert(option.value.as_str()) {
                    return Err(InvariantViolation::DuplicateOptionValue {
                        column: column.name.clone(),
                        value: option.value.clone(),
                    });
                }
            }
        }

        if self.views.is_empty() {
            return Err(InvariantViolation::NoViews);
        }
        let mut view_names = FxHashSet::default();
        for view in &self.views {
            if !view_names.insert(view.name.as_str()) {
                return Err(InvariantViolation::DuplicateViewName(view.name.clone()));
            }
            let referenced = view
                .sorts
                .iter()
                .map(|s| &s.column)
                .chain(view.filters.iter().map(|f| &f.column))
                .chain(view.hidden_columns.iter());
            for column in referenced {
                if !names.contains(column.as_str()) {
                    return Err(InvariantViolation::DanglingViewReference {
                        view: view.name.clone(),
                        column: column.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}

/// First of `base`, `base 2`, `base 3`, ... for which `taken` is false
pub fn unique_name<F: Fn(&str) -> bool>(base: &str, taken: F) -> String {
    if !taken(base) {
        return base.to_string();
    }
    let mut n = 2usize;
    loop {
        let candidate = format!("{base} {n}");
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Options only exist on select-like columns; blank values are dropped, duplicates keep the first
fn normalize_options(kind: ColumnType, options: Vec<SelectOption>) -> Option<Vec<SelectOption>> {
    if !kind.has_options() {
        return None;
    }
    let mut cleaned: Vec<SelectOption> = Vec::with_capacity(options.len());
    for option in options {
        if option.value.trim().is_empty() || cleaned.iter().any(|o| o.value == option.value) {
            continue;
        }
        cleaned.push(option);
    }
    Some(cleaned)
}

fn clamp_width(width: f64) -> Option<f64> {
    if width.is_finite() {
        Some(width.max(MIN_COLUMN_WIDTH))
    } else {
        None
    }
}

/// New cell content after option `old` was renamed to `new` (or deleted when None).
/// Returns None when the cell is unaffected.
fn rewrite_cell(kind: ColumnType, cell: &str, old: &str, new: Option<&str>) -> Option<String> {
    match kind {
        ColumnType::Select => (cell == old).then(|| new.unwrap_or_default().to_string()),
        ColumnType::MultiSelect => {
            let tokens = split_tokens(cell);
            if !tokens.contains(&old) {
                return None;
            }
            let mut out: Vec<&str> = Vec::with_capacity(tokens.len());
            for token in tokens {
                let mapped = if token == old { new } else { Some(token) };
                if let Some(t) = mapped {
                    if !out.contains(&t) {
                        out.push(t);
                    }
                }
            }
            Some(join_tokens(&out))
        }
        _ => None,
    }
}

// =============================================================================
// Errors
// =============================================================================

/// A broken model invariant, reported by `DatabaseModel::check_invariants`
#[derive(Debug, Clone, PartialEq)]
pub enum InvariantViolation {
    RowWidth { row: usize, expected: usize, actual: usize },
    DuplicateColumnName(String),
    DuplicateColumnIndex(i64),
    OptionsOnPlainColumn(String),
    DuplicateOptionValue { column: String, value: String },
    NoViews,
    DuplicateViewName(String),
    DanglingViewReference { view: String, column: String },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RowWidth { row, expected, actual } => {
                write!(f, "row {row} has {actual} cells, expected {expected}")
            }
            Self::DuplicateColumnName(name) => write!(f, "duplicate column name '{name}'"),
            Self::DuplicateColumnIndex(idx) => write!(f, "duplicate columnIndex {idx}"),
            Self::OptionsOnPlainColumn(name) => {
                write!(f, "column '{name}' has options but is not a select column")
            }
            Self::DuplicateOptionValue { column, value } => {
                write!(f, "column '{column}': duplicate option '{value}'")
            }
            Self::NoViews => write!(f, "model has no views"),
            Self::DuplicateViewName(name) => write!(f, "duplicate view name '{name}'"),
            Self::DanglingViewReference { view, column } => {
                write!(f, "view '{view}' references missing column '{column}'")
            }
        }
    }
}

impl std::error::Error for InvariantViolation {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{FilterOperator, FilterRule, SortDirection, SortRule};

    fn status_view(name: &str, column: &str) -> View {
        let mut view = View::new(name);
        view.sorts.push(SortRule { column: column.into(), direction: SortDirection::Asc });
        view.filters.push(FilterRule {
            column: column.into(),
            operator: FilterOperator::Contains,
            value: vec!["x".into()],
        });
        view.hidden_columns.push(column.into());
        view
    }

    /// Name | Status | Priority(select High/Low), three rows
    fn sample() -> DatabaseModel {
        let columns = vec![
            Column { column_index: 0, ..Column::new("Name", ColumnType::Text) },
            Column { column_index: 1, ..Column::new("Status", ColumnType::Text) },
            Column {
                column_index: 2,
                ..Column::new("Priority", ColumnType::Select).with_options(vec![
                    SelectOption::new("High", TagColor::Red),
                    SelectOption::new("Low", TagColor::Gray),
                ])
            },
        ];
        let rows = vec![
            vec!["a".into(), "open".into(), "High".into()],
            vec!["b".into(), "done".into(), "Low".into()],
            vec!["c".into(), "".into(), "".into()],
        ];
        let views = vec![status_view("Default", "Status"), status_view("Names", "Name")];
        DatabaseModel::from_parts(columns, rows, views)
    }

    #[test]
    fn test_new_model_has_default_view() {
        let model = DatabaseModel::new();
        assert_eq!(model.views().len(), 1);
        assert_eq!(model.views()[0].name, "Default");
        assert_eq!(model.column_count(), 0);
        assert!(model.check_invariants().is_ok());
    }

    #[test]
    fn test_apply_leaves_original_untouched() {
        let model = sample();
        let next = model.apply(Action::SetCell { row: 0, col: 0, value: "z".into() });
        assert_eq!(model.cell(0, 0), Some("a"));
        assert_eq!(next.cell(0, 0), Some("z"));
    }

    #[test]
    fn test_add_and_delete_row() {
        let model = sample().apply(Action::AddRow);
        assert_eq!(model.row_count(), 4);
        assert_eq!(model.row(3).unwrap(), &["", "", ""]);

        let model = model.apply(Action::DeleteRow { row: 0 });
        assert_eq!(model.row_count(), 3);
        assert_eq!(model.cell(0, 0), Some("b"));
        assert!(model.check_invariants().is_ok());
    }

    #[test]
    fn test_out_of_range_is_noop() {
        let model = sample();
        assert_eq!(model.apply(Action::DeleteRow { row: 99 }), model);
        assert_eq!(model.apply(Action::SetCell { row: 0, col: 9, value: "x".into() }), model);
        assert_eq!(model.apply(Action::DeleteColumn { col: 9 }), model);
        assert_eq!(model.apply(Action::ReorderColumn { a: 0, b: 9 }), model);
    }

    #[test]
    fn test_add_column_suffixes_name_and_pads_rows() {
        let model = sample()
            .apply(Action::AddColumn { column: Column::new("Status", ColumnType::Text) })
            .apply(Action::AddColumn { column: Column::new("Status", ColumnType::Text) });

        let names: Vec<&str> = model.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Name", "Status", "Priority", "Status 2", "Status 3"]);
        assert_eq!(model.columns()[3].column_index, 3);
        assert_eq!(model.columns()[4].column_index, 4);
        assert!(model.rows().iter().all(|r| r.len() == 5));
        assert!(model.check_invariants().is_ok());
    }

    #[test]
    fn test_add_column_index_follows_max() {
        // After a reorder the max index still decides the new index
        let model = sample()
            .apply(Action::ReorderColumn { a: 0, b: 2 })
            .apply(Action::AddColumn { column: Column::new("Extra", ColumnType::Number) });
        assert_eq!(model.column_by_name("Extra").unwrap().column_index, 3);
    }

    #[test]
    fn test_add_column_to_empty_model() {
        let model = DatabaseModel::new().apply(Action::AddColumn { column: Column::new("", ColumnType::Text) });
        assert_eq!(model.columns()[0].name, "Untitled");
        assert_eq!(model.columns()[0].column_index, 0);
    }

    #[test]
    fn test_delete_column_cascades() {
        let model = sample().apply(Action::DeleteColumn { col: 1 });

        assert_eq!(model.column_count(), 2);
        assert!(model.rows().iter().all(|r| r.len() == 2));
        assert_eq!(model.row(0).unwrap(), &["a", "High"]);
        // Gap closed
        assert_eq!(model.column_by_name("Priority").unwrap().column_index, 1);
        for view in model.views() {
            assert!(!view.references("Status"));
        }
        // Untouched view keeps its rules
        assert!(model.views()[1].references("Name"));
        assert!(model.check_invariants().is_ok());
    }

    #[test]
    fn test_rename_cascades_to_views() {
        let update = ColumnUpdate::from_column(&sample().columns()[1]).renamed("State");
        let model = sample().apply(Action::UpdateColumn { col: 1, update });

        let default = &model.views()[0];
        assert_eq!(default.sorts[0].column, "State");
        assert_eq!(default.filters[0].column, "State");
        assert_eq!(default.hidden_columns, vec!["State".to_string()]);

        let names = &model.views()[1];
        assert_eq!(names.sorts[0].column, "Name");
        assert!(model.check_invariants().is_ok());
    }

    #[test]
    fn test_rename_collision_suffixes_and_cascades() {
        let update = ColumnUpdate::from_column(&sample().columns()[1]).renamed("Name");
        let model = sample().apply(Action::UpdateColumn { col: 1, update });
        assert_eq!(model.columns()[1].name, "Name 2");
        assert_eq!(model.views()[0].sorts[0].column, "Name 2");
        assert_eq!(model.views()[1].sorts[0].column, "Name");
    }

    #[test]
    fn test_update_keeps_own_name() {
        let update = ColumnUpdate::from_column(&sample().columns()[0]).retyped(ColumnType::Date);
        let model = sample().apply(Action::UpdateColumn { col: 0, update });
        assert_eq!(model.columns()[0].name, "Name");
        assert_eq!(model.columns()[0].kind, ColumnType::Date);
    }

    #[test]
    fn test_update_blank_name_becomes_untitled() {
        let update = ColumnUpdate::from_column(&sample().columns()[0]).renamed("   ");
        let model = sample().apply(Action::UpdateColumn { col: 0, update });
        assert_eq!(model.columns()[0].name, "Untitled");
        assert_eq!(model.views()[1].sorts[0].column, "Untitled");
    }

    #[test]
    fn test_retype_drops_options() {
        let update = ColumnUpdate::from_column(&sample().columns()[2]).retyped(ColumnType::Text);
        let model = sample().apply(Action::UpdateColumn { col: 2, update });
        assert!(model.columns()[2].options.is_none());
        // Data is kept
        assert_eq!(model.cell(0, 2), Some("High"));
    }

    #[test]
    fn test_update_cleans_options() {
        let mut update = ColumnUpdate::from_column(&sample().columns()[2]);
        update.options.push(SelectOption::new("  ", TagColor::Blue));
        update.options.push(SelectOption::new("High", TagColor::Blue));
        let model = sample().apply(Action::UpdateColumn { col: 2, update });
        let values: Vec<&str> = model.columns()[2].options().iter().map(|o| o.value.as_str()).collect();
        assert_eq!(values, vec!["High", "Low"]);
    }

    #[test]
    fn test_wrap_flag() {
        let update = ColumnUpdate::from_column(&sample().columns()[0]).wrapping(true);
        let model = sample().apply(Action::UpdateColumn { col: 0, update });
        assert!(model.columns()[0].wraps());

        let update = ColumnUpdate::from_column(&model.columns()[0]);
        let model = model.apply(Action::UpdateColumn { col: 0, update });
        assert!(model.columns()[0].wraps(), "None leaves the flag alone");
    }

    #[test]
    fn test_set_column_width() {
        let model = sample().apply(Action::SetColumnWidth { col: 0, width: 250.0 });
        assert_eq!(model.columns()[0].width, Some(250.0));
        let model = model.apply(Action::SetColumnWidth { col: 0, width: 10.0 });
        assert_eq!(model.columns()[0].width, Some(MIN_COLUMN_WIDTH));
        let model = model.apply(Action::SetColumnWidth { col: 0, width: f64::NAN });
        assert_eq!(model.columns()[0].width, Some(MIN_COLUMN_WIDTH));
    }

    #[test]
    fn test_total_width() {
        let model = sample().apply(Action::SetColumnWidth { col: 0, width: 100.0 });
        assert_eq!(model.total_width(), 100.0 + 180.0 + 180.0 + 32.0);
    }

    #[test]
    fn test_reorder_swaps_display_index_only() {
        let model = sample().apply(Action::ReorderColumn { a: 0, b: 2 });
        assert_eq!(model.columns()[0].column_index, 2);
        assert_eq!(model.columns()[2].column_index, 0);
        assert_eq!(model.display_order(), vec![2, 1, 0]);
        // Storage untouched
        assert_eq!(model.row(0).unwrap(), sample().row(0).unwrap());

        let back = model.apply(Action::ReorderColumn { a: 0, b: 2 });
        assert_eq!(back, sample());
    }

    #[test]
    fn test_add_select_option() {
        let model = sample().apply(Action::AddSelectOption { col: 2, value: " Mid ".into(), color: None });
        let opt = model.columns()[2].option("Mid").unwrap();
        assert_eq!(opt.color, pick_color(2));

        // Duplicate and blank are ignored
        let again = model
            .apply(Action::AddSelectOption { col: 2, value: "Mid".into(), color: Some(TagColor::Red) })
            .apply(Action::AddSelectOption { col: 2, value: "".into(), color: None });
        assert_eq!(again, model);

        // Not a select column
        let text = sample().apply(Action::AddSelectOption { col: 0, value: "x".into(), color: None });
        assert!(text.columns()[0].options.is_none());
    }

    #[test]
    fn test_delete_option_from_all_rows() {
        let model = sample().apply(Action::delete_select_option(2, "High"));
        assert!(!model.columns()[2].has_option("High"));
        assert_eq!(model.cell(0, 2), Some(""));
        assert_eq!(model.cell(1, 2), Some("Low"));
        assert_eq!(model.cell(2, 2), Some(""));
    }

    #[test]
    fn test_remove_option_definition_only() {
        let model = sample().apply(Action::RemoveOptionDefinition { col: 2, value: "High".into() });
        assert!(!model.columns()[2].has_option("High"));
        assert_eq!(model.cell(0, 2), Some("High"));
        assert_eq!(model.cell(1, 2), Some("Low"));
    }

    #[test]
    fn test_rename_option_rewrites_select_cells() {
        let model = sample().apply(Action::UpdateSelectOption {
            col: 2,
            old_value: "High".into(),
            replacement: Some(SelectOption::new("Urgent", TagColor::Pink)),
        });
        assert_eq!(model.columns()[2].options()[0], SelectOption::new("Urgent", TagColor::Pink));
        assert_eq!(model.cell(0, 2), Some("Urgent"));
        assert_eq!(model.cell(1, 2), Some("Low"));
    }

    #[test]
    fn test_recolor_option_leaves_rows() {
        let model = sample().apply(Action::UpdateSelectOption {
            col: 2,
            old_value: "Low".into(),
            replacement: Some(SelectOption::new("Low", TagColor::Green)),
        });
        assert_eq!(model.columns()[2].color_for("Low"), TagColor::Green);
        assert_eq!(model.rows(), sample().rows());
    }

    #[test]
    fn test_rename_option_onto_existing_merges() {
        let model = sample().apply(Action::UpdateSelectOption {
            col: 2,
            old_value: "High".into(),
            replacement: Some(SelectOption::new("Low", TagColor::Blue)),
        });
        let values: Vec<&str> = model.columns()[2].options().iter().map(|o| o.value.as_str()).collect();
        assert_eq!(values, vec!["Low"]);
        assert_eq!(model.columns()[2].color_for("Low"), TagColor::Gray);
        assert_eq!(model.cell(0, 2), Some("Low"));
        assert!(model.check_invariants().is_ok());
    }

    #[test]
    fn test_multiselect_option_cascade() {
        let columns = vec![Column::new("Tags", ColumnType::MultiSelect).with_options(vec![
            SelectOption::new("a", TagColor::Gray),
            SelectOption::new("b", TagColor::Blue),
            SelectOption::new("c", TagColor::Green),
        ])];
        let rows = vec![vec!["a|b".into()], vec!["b".into()], vec!["c|a".into()], vec!["".into()]];
        let model = DatabaseModel::from_parts(columns, rows, vec![]);

        let renamed = model.apply(Action::UpdateSelectOption {
            col: 0,
            old_value: "a".into(),
            replacement: Some(SelectOption::new("z", TagColor::Red)),
        });
        let cells: Vec<&str> = renamed.rows().iter().map(|r| r[0].as_str()).collect();
        assert_eq!(cells, vec!["z|b", "b", "c|z", ""]);

        let deleted = model.apply(Action::delete_select_option(0, "a"));
        let cells: Vec<&str> = deleted.rows().iter().map(|r| r[0].as_str()).collect();
        assert_eq!(cells, vec!["b", "b", "c", ""]);

        // Merge onto existing token doesn't duplicate it
        let merged = model.apply(Action::UpdateSelectOption {
            col: 0,
            old_value: "a".into(),
            replacement: Some(SelectOption::new("b", TagColor::Blue)),
        });
        assert_eq!(merged.cell(0, 0), Some("b"));
    }

    #[test]
    fn test_view_lifecycle() {
        let model = sample().apply(Action::AddView { name: "Names".into() });
        assert_eq!(model.views().len(), 3);
        assert_eq!(model.views()[2].name, "Names 2");
        assert!(model.views()[2].sorts.is_empty());

        let model = model.apply(Action::RenameView { view: 2, name: "Default".into() });
        assert_eq!(model.views()[2].name, "Default 2");

        let model = model.apply(Action::RenameView { view: 2, name: "  ".into() });
        assert_eq!(model.views()[2].name, "Default 2");

        let model = model.apply(Action::DeleteView { view: 0 });
        assert_eq!(model.views().len(), 2);
        assert_eq!(model.views()[0].name, "Names");
        assert!(model.check_invariants().is_ok());
    }

    #[test]
    fn test_last_view_cannot_be_deleted() {
        let model = DatabaseModel::new();
        let after = model.apply(Action::DeleteView { view: 0 });
        assert_eq!(after.views().len(), 1);
        assert_eq!(after, model);
    }

    #[test]
    fn test_update_view_prunes_and_dedupes() {
        let mut replacement = status_view("Names", "Status");
        replacement.hidden_columns.push("Nope".into());
        let model = sample().apply(Action::UpdateView { view: 0, replacement });
        assert_eq!(model.views()[0].name, "Names 2");
        assert_eq!(model.views()[0].hidden_columns, vec!["Status".to_string()]);
        assert!(model.check_invariants().is_ok());
    }

    #[test]
    fn test_from_parts_repairs() {
        let columns = vec![
            Column::new("", ColumnType::Text),
            Column::new("", ColumnType::Text),
            Column { options: Some(vec![SelectOption::new("x", TagColor::Red)]), ..Column::new("n", ColumnType::Number) },
        ];
        let columns: Vec<Column> = columns
            .into_iter()
            .enumerate()
            .map(|(i, c)| Column { column_index: i as i64, ..c })
            .collect();
        let rows = vec![vec!["1".into()], vec!["1".into(), "2".into(), "3".into(), "4".into()]];
        let mut view = View::new("");
        view.sorts.push(SortRule { column: "gone".into(), direction: SortDirection::Asc });

        let model = DatabaseModel::from_parts(columns, rows, vec![view]);
        assert_eq!(model.columns()[0].name, "Untitled");
        assert_eq!(model.columns()[1].name, "Untitled 2");
        assert!(model.columns()[2].options.is_none());
        assert_eq!(model.row(0).unwrap(), &["1", "", ""]);
        assert_eq!(model.row(1).unwrap(), &["1", "2", "3"]);
        assert_eq!(model.views()[0].name, "Untitled");
        assert!(model.views()[0].sorts.is_empty());
        assert!(model.check_invariants().is_ok());
    }

    #[test]
    fn test_from_parts_moves_colliding_index() {
        let columns = vec![
            Column { column_index: 0, ..Column::new("a", ColumnType::Text) },
            Column { column_index: 0, ..Column::new("b", ColumnType::Text) },
            Column { column_index: 1, ..Column::new("c", ColumnType::Text) },
        ];
        let model = DatabaseModel::from_parts(columns, vec![], vec![]);
        let indices: Vec<i64> = model.columns().iter().map(|c| c.column_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(model.check_invariants().is_ok());
    }

    #[test]
    fn test_from_parts_collision_at_index_limit_renumbers() {
        let columns = vec![
            Column { column_index: i64::MAX, ..Column::new("x", ColumnType::Text) },
            Column { column_index: 3, ..Column::new("y", ColumnType::Text) },
            Column { column_index: i64::MAX, ..Column::new("z", ColumnType::Text) },
        ];
        let model = DatabaseModel::from_parts(columns, vec![], vec![]);
        let indices: Vec<i64> = model.columns().iter().map(|c| c.column_index).collect();
        assert_eq!(indices, vec![1, 0, 2]);
        let names: Vec<&str> = model.display_columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["y", "x", "z"]);
        assert!(model.check_invariants().is_ok());
    }

    #[test]
    fn test_add_column_after_index_limit_renumbers() {
        let columns = vec![
            Column { column_index: 5, ..Column::new("a", ColumnType::Text) },
            Column { column_index: i64::MAX, ..Column::new("b", ColumnType::Text) },
        ];
        let model = DatabaseModel::from_parts(columns, vec![vec!["1".into(), "2".into()]], vec![])
            .apply(Action::AddColumn { column: Column::new("c", ColumnType::Text) });

        let indices: Vec<i64> = model.columns().iter().map(|c| c.column_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(model.row(0).unwrap(), &["1", "2", ""]);
        assert!(model.check_invariants().is_ok());

        // Plenty of room again afterwards
        let model = model.apply(Action::AddColumn { column: Column::new("d", ColumnType::Text) });
        assert_eq!(model.columns()[3].column_index, 3);
    }

    #[test]
    fn test_check_invariants_reports() {
        let broken = DatabaseModel {
            columns: vec![
                Column { column_index: 0, ..Column::new("a", ColumnType::Text) },
                Column { column_index: 0, ..Column::new("b", ColumnType::Text) },
            ],
            rows: vec![],
            views: vec![View::default()],
        };
        assert_eq!(broken.check_invariants(), Err(InvariantViolation::DuplicateColumnIndex(0)));

        let broken = DatabaseModel {
            columns: vec![Column::new("a", ColumnType::Text)],
            rows: vec![vec![]],
            views: vec![View::default()],
        };
        assert_eq!(
            broken.check_invariants(),
            Err(InvariantViolation::RowWidth { row: 0, expected: 1, actual: 0 })
        );

        let broken = DatabaseModel { columns: vec![], rows: vec![], views: vec![] };
        assert_eq!(broken.check_invariants(), Err(InvariantViolation::NoViews));
        assert_eq!(broken.check_invariants().unwrap_err().to_string(), "model has no views");
    }

    #[test]
    fn test_unique_name() {
        let taken = ["a", "a 2"];
        assert_eq!(unique_name("a", |n| taken.contains(&n)), "a 3");
        assert_eq!(unique_name("b", |n| taken.contains(&n)), "b");
    }
}
