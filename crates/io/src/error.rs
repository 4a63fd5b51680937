use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum CodecError {
    /// A quoted field that never closes. `line` is where the quote opened (1-based).
    UnterminatedQuote { line: usize },
    /// Any other CSV reader/writer failure.
    Csv(String),
    /// Header JSON could not be produced.
    Json(String),
    /// File read/write error.
    Io(String),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnterminatedQuote { line } => write!(f, "unterminated quoted field starting on line {line}"),
            Self::Csv(msg) => write!(f, "CSV error: {msg}"),
            Self::Json(msg) => write!(f, "JSON error: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for CodecError {}

impl From<csv::Error> for CodecError {
    fn from(e: csv::Error) -> Self {
        if e.is_io_error() {
            Self::Io(e.to_string())
        } else {
            Self::Csv(e.to_string())
        }
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e.to_string())
    }
}

impl From<std::io::Error> for CodecError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
