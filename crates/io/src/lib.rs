// File I/O operations

pub mod codec;
pub mod error;
pub mod export;
pub mod file;

pub use codec::{decode, encode};
pub use error::CodecError;
