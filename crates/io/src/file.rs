// Database file load/save

use std::path::Path;

use csvdb_engine::model::DatabaseModel;

use crate::codec;
use crate::error::CodecError;

pub fn load(path: &Path) -> Result<DatabaseModel, CodecError> {
    let content = read_file_as_utf8(path)?;
    let model = codec::decode(&content)?;
    log::info!(
        "loaded {}: {} columns, {} rows, {} views",
        path.display(),
        model.column_count(),
        model.row_count(),
        model.views().len()
    );
    Ok(model)
}

/// Load a plain delimited file (no embedded schema), guessing the delimiter
pub fn import_plain(path: &Path) -> Result<DatabaseModel, CodecError> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);
    log::debug!("{}: using delimiter {:?}", path.display(), delimiter as char);
    codec::decode_with_delimiter(&content, delimiter)
}

pub fn save(model: &DatabaseModel, path: &Path) -> Result<(), CodecError> {
    let text = codec::encode(model)?;
    std::fs::write(path, text)?;
    log::info!("saved {}", path.display());
    Ok(())
}

/// Read a file as text. Bytes that are not valid UTF-8 are decoded as Windows-1252,
/// the usual encoding of spreadsheet exports.
pub fn read_file_as_utf8(path: &Path) -> Result<String, CodecError> {
    let bytes = std::fs::read(path)?;
    if let Ok(text) = std::str::from_utf8(&bytes) {
        return Ok(text.to_owned());
    }
    log::warn!("{} is not UTF-8, reading as Windows-1252", path.display());
    Ok(encoding_rs::WINDOWS_1252.decode_without_bom_handling(&bytes).0.into_owned())
}

/// Guess the field delimiter of a plain CSV from its first records.
///
/// Each candidate (tab, semicolon, comma, pipe) parses a sample of up to ten records;
/// quoted fields may span lines. A candidate scores the number of records matching
/// the first record's width, times that width. Widths of one never score, and comma
/// wins when nothing does.
pub fn sniff_delimiter(content: &str) -> u8 {
    const SAMPLE: usize = 10;

    let mut best = (b',', 0usize);
    for delim in [b'\t', b';', b',', b'|'] {
        let widths = record_widths(content, delim, SAMPLE);
        let Some((&first, rest)) = widths.split_first() else {
            return b',';
        };
        if first <= 1 {
            continue;
        }
        // Wider records break ties
        let score = (1 + rest.iter().filter(|&&w| w == first).count()) * first;
        if score > best.1 {
            best = (delim, score);
        }
    }

    log::trace!("sniffed delimiter {:?}", best.0 as char);
    best.0
}

/// Field counts of the first `limit` non-blank records parsed with `delim`.
/// Parsing stops at the first malformed record.
fn record_widths(content: &str, delim: u8, limit: usize) -> Vec<usize> {
    csv::ReaderBuilder::new()
        .delimiter(delim)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes())
        .records()
        .map_while(Result::ok)
        .filter(|record| !(record.len() == 1 && record[0].is_empty()))
        .take(limit)
        .map(|record| record.len())
        .collect()
}
