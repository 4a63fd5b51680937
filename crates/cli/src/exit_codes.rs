//! CLI Exit Code Registry
//!
//! Single source of truth for `csvdb` exit codes. Scripts rely on these.
//!
//! | Code | Meaning                                               |
//! |------|-------------------------------------------------------|
//! | 0    | Success                                               |
//! | 1    | General error                                         |
//! | 2    | Usage error (bad arguments, unknown view or format)   |
//! | 3    | Decode error (file is not readable as a database)     |
//! | 4    | I/O error (missing file, permission, disk)            |
//! | 5    | Invariant violation in a decoded or edited model      |
//! | 6    | Malformed action document passed to `apply`           |
//! | 7    | `validate --strict`: file is not in canonical form    |
//!
//! New codes go at the end; never renumber an existing one.

use csvdb_io::CodecError;

/// Command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Unspecified failure. Prefer a specific code.
pub const EXIT_ERROR: u8 = 1;

/// Bad arguments: unknown view, unsupported output extension, bad column type.
pub const EXIT_USAGE: u8 = 2;

/// The file could not be decoded (unterminated quote, broken CSV).
pub const EXIT_DECODE: u8 = 3;

/// Reading or writing a file failed.
pub const EXIT_IO: u8 = 4;

/// A model failed `check_invariants`.
pub const EXIT_INVARIANT: u8 = 5;

/// The actions file is not a JSON array of actions.
pub const EXIT_BAD_ACTIONS: u8 = 6;

/// Re-encoding the decoded file does not reproduce it byte for byte.
pub const EXIT_NOT_CANONICAL: u8 = 7;

/// Map a codec error onto its exit code.
pub fn codec_exit_code(err: &CodecError) -> u8 {
    match err {
        CodecError::Io(_) => EXIT_IO,
        CodecError::UnterminatedQuote { .. } | CodecError::Csv(_) | CodecError::Json(_) => EXIT_DECODE,
    }
}
