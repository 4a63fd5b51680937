use serde::{Deserialize, Serialize, Serializer};

/// Display width used when a column has no explicit width
pub const DEFAULT_COLUMN_WIDTH: f64 = 180.0;

/// Narrowest width a column can be resized to
pub const MIN_COLUMN_WIDTH: f64 = 80.0;

/// Extra width reserved after the last column for the add-column affordance
pub const ADD_COLUMN_WIDTH: f64 = 32.0;

/// Separator between selected values in a multiselect cell
pub const MULTISELECT_DELIMITER: char = '|';

/// Checkbox cells are checked only when they hold exactly this string
pub const CHECKBOX_TRUE: &str = "true";

/// Field type of a column
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    #[default]
    Text,
    Number,
    Date,
    Checkbox,
    Select,
    #[serde(rename = "multiselect")]
    MultiSelect,
}

impl ColumnType {
    pub const ALL: [ColumnType; 6] = [
        ColumnType::Text,
        ColumnType::Number,
        ColumnType::Date,
        ColumnType::Checkbox,
        ColumnType::Select,
        ColumnType::MultiSelect,
    ];

    /// Parse the persisted type tag. Unknown tags read as text.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "number" => ColumnType::Number,
            "date" => ColumnType::Date,
            "checkbox" => ColumnType::Checkbox,
            "select" => ColumnType::Select,
            "multiselect" => ColumnType::MultiSelect,
            _ => ColumnType::Text,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            ColumnType::Text => "text",
            ColumnType::Number => "number",
            ColumnType::Date => "date",
            ColumnType::Checkbox => "checkbox",
            ColumnType::Select => "select",
            ColumnType::MultiSelect => "multiselect",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ColumnType::Text => "Text",
            ColumnType::Number => "Number",
            ColumnType::Date => "Date",
            ColumnType::Checkbox => "Checkbox",
            ColumnType::Select => "Select",
            ColumnType::MultiSelect => "Multi-select",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            ColumnType::Text => "Aa",
            ColumnType::Number => "#",
            ColumnType::Date => "📅",
            ColumnType::Checkbox => "☑",
            ColumnType::Select => "▾",
            ColumnType::MultiSelect => "≡",
        }
    }

    /// Select and multiselect columns carry an option list
    pub fn has_options(&self) -> bool {
        matches!(self, ColumnType::Select | ColumnType::MultiSelect)
    }
}

/// Tag color for a select option
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagColor {
    #[default]
    Gray,
    Brown,
    Orange,
    Yellow,
    Green,
    Blue,
    Purple,
    Pink,
    Red,
}

impl TagColor {
    pub const ALL: [TagColor; 9] = [
        TagColor::Gray,
        TagColor::Brown,
        TagColor::Orange,
        TagColor::Yellow,
        TagColor::Green,
        TagColor::Blue,
        TagColor::Purple,
        TagColor::Pink,
        TagColor::Red,
    ];

    /// Cycle order used when new options are created without an explicit color
    const PALETTE: [TagColor; 9] = [
        TagColor::Gray,
        TagColor::Blue,
        TagColor::Green,
        TagColor::Orange,
        TagColor::Purple,
        TagColor::Pink,
        TagColor::Red,
        TagColor::Yellow,
        TagColor::Brown,
    ];

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.tag() == tag)
    }

    pub fn tag(&self) -> &'static str {
        match self {
            TagColor::Gray => "gray",
            TagColor::Brown => "brown",
            TagColor::Orange => "orange",
            TagColor::Yellow => "yellow",
            TagColor::Green => "green",
            TagColor::Blue => "blue",
            TagColor::Purple => "purple",
            TagColor::Pink => "pink",
            TagColor::Red => "red",
        }
    }
}

/// Default color for the n-th option of a column. Colors repeat every nine options.
pub fn pick_color(index: usize) -> TagColor {
    TagColor::PALETTE[index % TagColor::PALETTE.len()]
}

/// One selectable value of a select/multiselect column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    #[serde(default)]
    pub color: TagColor,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, color: TagColor) -> Self {
        Self { value: value.into(), color }
    }
}

/// Schema for one field across all rows.
///
/// A column's storage position (its index in `DatabaseModel::columns` and in every row)
/// never changes after creation. Display order is carried separately by `column_index`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ColumnType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<SelectOption>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_width"
    )]
    pub width: Option<f64>,
    #[serde(default)]
    pub column_index: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrap_content: Option<bool>,
}

/// Whole-number widths are written as JSON integers (`180`, not `180.0`)
fn serialize_width<S: Serializer>(width: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
    match width {
        Some(w) if w.fract() == 0.0 && w.abs() < 1e15 => serializer.serialize_i64(*w as i64),
        Some(w) => serializer.serialize_f64(*w),
        None => serializer.serialize_none(),
    }
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnType) -> Self {
        Self {
            name: name.into(),
            kind,
            options: if kind.has_options() { Some(Vec::new()) } else { None },
            width: None,
            column_index: 0,
            wrap_content: None,
        }
    }

    pub fn with_options(mut self, options: Vec<SelectOption>) -> Self {
        if self.kind.has_options() {
            self.options = Some(options);
        }
        self
    }

    pub fn effective_width(&self) -> f64 {
        self.width.unwrap_or(DEFAULT_COLUMN_WIDTH)
    }

    pub fn wraps(&self) -> bool {
        self.wrap_content.unwrap_or(false)
    }

    pub fn options(&self) -> &[SelectOption] {
        self.options.as_deref().unwrap_or(&[])
    }

    pub fn option(&self, value: &str) -> Option<&SelectOption> {
        self.options().iter().find(|o| o.value == value)
    }

    pub fn has_option(&self, value: &str) -> bool {
        self.option(value).is_some()
    }

    /// Color shown for a cell value; values without a definition render gray
    pub fn color_for(&self, value: &str) -> TagColor {
        self.option(value).map(|o| o.color).unwrap_or_default()
    }
}

// =============================================================================
// Cell helpers
// =============================================================================

/// Split a multiselect cell into its selected values. Empty tokens are dropped.
pub fn split_tokens(cell: &str) -> Vec<&str> {
    cell.split(MULTISELECT_DELIMITER).filter(|t| !t.is_empty()).collect()
}

pub fn join_tokens<S: AsRef<str>>(tokens: &[S]) -> String {
    let mut out = String::new();
    for (i, token) in tokens.iter().enumerate() {
        if i > 0 {
            out.push(MULTISELECT_DELIMITER);
        }
        out.push_str(token.as_ref());
    }
    out
}

/// Add `value` to a multiselect cell if absent, remove it if present
pub fn toggle_token(cell: &str, value: &str) -> String {
    let mut tokens = split_tokens(cell);
    if let Some(pos) = tokens.iter().position(|t| *t == value) {
        tokens.remove(pos);
    } else {
        tokens.push(value);
    }
    join_tokens(&tokens)
}

pub fn is_checked(cell: &str) -> bool {
    cell == CHECKBOX_TRUE
}

pub fn toggle_checkbox(cell: &str) -> &'static str {
    if is_checked(cell) { "false" } else { CHECKBOX_TRUE }
}
