//! Text codec: CSV with schema embedded in the header.
//!
//! File layout:
//! - Header record: one JSON object per column (`{"name":..,"type":..,"columnIndex":..}`),
//!   in storage order. The first column's object also carries `"views": [...]`.
//! - Every following record is one row, cells verbatim.
//!
//! Plain CSV headers (legacy or hand-made files) decode as text columns named after
//! the header cell, so any ordinary CSV opens as a table.

use serde_json::{Map, Value};

use csvdb_engine::column::{Column, ColumnType, SelectOption};
use csvdb_engine::model::{DatabaseModel, UNTITLED};
use csvdb_engine::view::View;

use crate::error::CodecError;

/// Key under which the view list rides along in the first header cell
pub const VIEWS_KEY: &str = "views";

const BOM: char = '\u{feff}';

// =============================================================================
// Decode
// =============================================================================

/// Parse file text into a model.
///
/// Only an unterminated quoted field is fatal. Everything else (bad header JSON,
/// short or long rows, dangling view references) is repaired.
pub fn decode(text: &str) -> Result<DatabaseModel, CodecError> {
    decode_with_delimiter(text, b',')
}

/// `decode` for plain files that separate fields with something other than a comma
pub fn decode_with_delimiter(text: &str, delimiter: u8) -> Result<DatabaseModel, CodecError> {
    let text = text.strip_prefix(BOM).unwrap_or(text);
    if text.trim().is_empty() {
        return Ok(DatabaseModel::new());
    }

    check_quotes(text, delimiter as char)?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = reader.records();
    let header = match records.next() {
        Some(record) => record?,
        None => return Ok(DatabaseModel::new()),
    };

    let mut columns = Vec::with_capacity(header.len());
    let mut views = Vec::new();
    for (i, cell) in header.iter().enumerate() {
        let (column, cell_views) = decode_header_cell(cell, i);
        if i == 0 {
            views = cell_views;
        }
        columns.push(column);
    }

    let mut rows = Vec::new();
    for record in records {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect::<Vec<String>>());
    }

    log::debug!("decoded {} columns, {} rows, {} views", columns.len(), rows.len(), views.len());
    Ok(DatabaseModel::from_parts(columns, rows, views))
}

/// One header cell: the column, plus the view list when the cell carries one
fn decode_header_cell(cell: &str, position: usize) -> (Column, Vec<View>) {
    let object = match serde_json::from_str::<Value>(cell) {
        Ok(Value::Object(object)) => object,
        _ => {
            if !cell.is_empty() {
                log::debug!("header cell {position} is plain text");
            }
            let name = if cell.trim().is_empty() { UNTITLED } else { cell };
            let column = Column { column_index: position as i64, ..Column::new(name, ColumnType::Text) };
            return (column, Vec::new());
        }
    };

    let views = object.get(VIEWS_KEY).map(decode_views).unwrap_or_default();
    (column_from_object(&object, position), views)
}

/// Field-by-field read so one bad field doesn't throw away the whole column
fn column_from_object(object: &Map<String, Value>, position: usize) -> Column {
    let name = match object.get("name").and_then(Value::as_str) {
        Some(name) if !name.trim().is_empty() => name.to_string(),
        _ => UNTITLED.to_string(),
    };

    let kind = object
        .get("type")
        .and_then(Value::as_str)
        .map(ColumnType::from_tag)
        .unwrap_or_default();

    let options = object.get("options").and_then(Value::as_array).map(|entries| {
        entries
            .iter()
            .filter_map(|entry| match serde_json::from_value::<SelectOption>(entry.clone()) {
                Ok(option) => Some(option),
                Err(e) => {
                    log::warn!("column '{name}': skipping option {entry}: {e}");
                    None
                }
            })
            .collect::<Vec<_>>()
    });

    let column_index = object
        .get("columnIndex")
        .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
        .unwrap_or(position as i64);

    Column {
        name,
        kind,
        options,
        width: object.get("width").and_then(Value::as_f64),
        column_index,
        wrap_content: object.get("wrapContent").and_then(Value::as_bool),
    }
}

/// Views that fail to parse are dropped; an empty result means "use the default view"
fn decode_views(value: &Value) -> Vec<View> {
    let Some(entries) = value.as_array() else {
        log::warn!("ignoring non-array views property");
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| match serde_json::from_value::<View>(entry.clone()) {
            Ok(view) => Some(view),
            Err(e) => {
                log::warn!("skipping view {entry}: {e}");
                None
            }
        })
        .collect()
}

/// Reject text whose last quoted field never closes.
///
/// The csv reader tolerates this by swallowing the rest of the file into one cell,
/// which would silently corrupt the table.
fn check_quotes(text: &str, delimiter: char) -> Result<(), CodecError> {
    let mut line = 1usize;
    let mut open_line = 0usize;
    let mut in_quotes = false;
    let mut at_field_start = true;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                }
                '"' => in_quotes = false,
                '\n' => line += 1,
                _ => {}
            }
            continue;
        }
        match c {
            '"' if at_field_start => {
                in_quotes = true;
                open_line = line;
                at_field_start = false;
            }
            c if c == delimiter => at_field_start = true,
            '\n' => {
                line += 1;
                at_field_start = true;
            }
            '\r' => at_field_start = true,
            _ => at_field_start = false,
        }
    }

    if in_quotes {
        return Err(CodecError::UnterminatedQuote { line: open_line });
    }
    Ok(())
}

// =============================================================================
// Encode
// =============================================================================

/// Serialize a model to file text: `\n` line endings, trailing newline.
///
/// A model without columns has no header cell to carry its views, so it encodes
/// to empty text.
pub fn encode(model: &DatabaseModel) -> Result<String, CodecError> {
    if model.columns().is_empty() {
        return Ok(String::new());
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    let mut header = Vec::with_capacity(model.column_count());
    for (i, column) in model.columns().iter().enumerate() {
        header.push(encode_header_cell(column, (i == 0).then(|| model.views()))?);
    }
    writer.write_record(&header)?;

    for row in model.rows() {
        writer.write_record(row)?;
    }

    let bytes = writer.into_inner().map_err(|e| CodecError::Io(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| CodecError::Csv(e.to_string()))
}

fn encode_header_cell(column: &Column, views: Option<&[View]>) -> Result<String, CodecError> {
    let mut value = serde_json::to_value(column)?;
    if let (Some(views), Value::Object(object)) = (views, &mut value) {
        object.insert(VIEWS_KEY.to_string(), serde_json::to_value(views)?);
    }
    Ok(serde_json::to_string(&value)?)
}
