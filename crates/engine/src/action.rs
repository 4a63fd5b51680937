//! User intents accepted by the model engine.
//!
//! Every edit to a `DatabaseModel` is expressed as one of these actions. Column and
//! row positions are STORAGE positions (indices into `columns()` / `rows()`), never
//! display positions. Views are addressed by their index in `views()`.
//!
//! Actions are serde-tagged so hosts can script edits as JSON, e.g.
//! `{"type": "set_cell", "row": 0, "col": 2, "value": "Done"}`.

use serde::{Deserialize, Serialize};

use crate::column::{Column, ColumnType, SelectOption, TagColor};
use crate::view::View;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    SetCell { row: usize, col: usize, value: String },
    AddRow,
    DeleteRow { row: usize },

    AddColumn { column: Column },
    DeleteColumn { col: usize },
    UpdateColumn { col: usize, update: ColumnUpdate },
    SetColumnWidth { col: usize, width: f64 },
    /// Swap the display positions of two columns
    ReorderColumn { a: usize, b: usize },

    AddSelectOption {
        col: usize,
        value: String,
        /// None picks the next palette color
        #[serde(default)]
        color: Option<TagColor>,
    },
    /// Rename/recolor an option, or delete it from the definition AND every row when
    /// `replacement` is None
    UpdateSelectOption {
        col: usize,
        old_value: String,
        #[serde(default)]
        replacement: Option<SelectOption>,
    },
    /// Drop an option's definition but keep the values already stored in rows
    RemoveOptionDefinition { col: usize, value: String },

    AddView { name: String },
    RenameView { view: usize, name: String },
    DeleteView { view: usize },
    UpdateView { view: usize, replacement: View },
}

impl Action {
    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Action::SetCell { .. } => "set_cell",
            Action::AddRow => "add_row",
            Action::DeleteRow { .. } => "delete_row",
            Action::AddColumn { .. } => "add_column",
            Action::DeleteColumn { .. } => "delete_column",
            Action::UpdateColumn { .. } => "update_column",
            Action::SetColumnWidth { .. } => "set_column_width",
            Action::ReorderColumn { .. } => "reorder_column",
            Action::AddSelectOption { .. } => "add_select_option",
            Action::UpdateSelectOption { .. } => "update_select_option",
            Action::RemoveOptionDefinition { .. } => "remove_option_definition",
            Action::AddView { .. } => "add_view",
            Action::RenameView { .. } => "rename_view",
            Action::DeleteView { .. } => "delete_view",
            Action::UpdateView { .. } => "update_view",
        }
    }

    /// Option deletion that also clears the value out of every row
    pub fn delete_select_option(col: usize, value: impl Into<String>) -> Self {
        Action::UpdateSelectOption { col, old_value: value.into(), replacement: None }
    }
}

/// New settings for an existing column (the column editor's "save")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnUpdate {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ColumnType,
    /// Ignored unless `kind` is select/multiselect
    #[serde(default)]
    pub options: Vec<SelectOption>,
    /// None leaves the wrap flag untouched
    #[serde(default)]
    pub wrap_content: Option<bool>,
}

impl ColumnUpdate {
    /// Start from a column's current settings
    pub fn from_column(column: &Column) -> Self {
        Self {
            name: column.name.clone(),
            kind: column.kind,
            options: column.options().to_vec(),
            wrap_content: None,
        }
    }

    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn retyped(mut self, kind: ColumnType) -> Self {
        self.kind = kind;
        self
    }

    pub fn wrapping(mut self, wrap: bool) -> Self {
        self.wrap_content = Some(wrap);
        self
    }
}
