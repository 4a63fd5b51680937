pub mod action;
pub mod column;
pub mod document;
pub mod model;
pub mod projection;
pub mod view;

pub use action::{Action, ColumnUpdate};
pub use column::{Column, ColumnType, SelectOption, TagColor};
pub use document::{ChangeOrigin, Document, DocumentEvent};
pub use model::{DatabaseModel, InvariantViolation};
pub use projection::{project_view, Projection};
pub use view::{FilterOperator, FilterRule, SortDirection, SortRule, View};
