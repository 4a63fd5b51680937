// Projection export (what a view shows, not the stored file)

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde_json::{Map, Value};

use csvdb_engine::projection::Projection;

use crate::error::CodecError;

/// Plain CSV: a header row of column names, then the visible cells in display order
pub fn to_csv(projection: &Projection<'_>) -> Result<String, CodecError> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    if projection.column_count() > 0 {
        writer.write_record(projection.header())?;
        for row in &projection.rows {
            writer.write_record(projection.columns.iter().map(|c| row.cell(c)))?;
        }
    }

    let bytes = writer.into_inner().map_err(|e| CodecError::Io(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| CodecError::Csv(e.to_string()))
}

/// JSON array of objects keyed by column name, keys in display order
pub fn to_json_value(projection: &Projection<'_>) -> Value {
    let rows = projection
        .rows
        .iter()
        .map(|row| {
            let mut object = Map::new();
            for column in &projection.columns {
                object.insert(column.column.name.clone(), Value::String(row.cell(column).to_string()));
            }
            Value::Object(object)
        })
        .collect();
    Value::Array(rows)
}

pub fn to_json(projection: &Projection<'_>) -> Result<String, CodecError> {
    Ok(serde_json::to_string_pretty(&to_json_value(projection))?)
}

pub fn export_csv(projection: &Projection<'_>, path: &Path) -> Result<(), CodecError> {
    std::fs::write(path, to_csv(projection)?)?;
    Ok(())
}

pub fn export_json(projection: &Projection<'_>, path: &Path) -> Result<(), CodecError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &to_json_value(projection))?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
