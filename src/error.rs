use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Bad magic or version tag.
    #[error("{what} at offset {offset:#x}: expected {expected}, found {found}")]
    Format {
        what: &'static str,
        offset: usize,
        expected: String,
        found: String,
    },
    /// An offset or length would read past the end of the buffer.
    #[error("{what} at offset {offset:#x} (+{len} bytes) is outside the {size} byte buffer")]
    Bounds {
        what: &'static str,
        offset: usize,
        len: usize,
        size: usize,
    },
    /// An input document is missing fields or carries the wrong format tag.
    #[error("schema error: {0}")]
    Schema(String),
    #[error("invalid clip `{clip}`: {reason}")]
    InvalidClip { clip: String, reason: String },
    #[error("failed to serialize: {0}")]
    Serialize(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn magic(what: &'static str, offset: usize, expected: &[u8], found: &[u8]) -> Self {
        Error::Format {
            what,
            offset,
            expected: format!("{:?}", String::from_utf8_lossy(expected)),
            found: format!("{:?}", String::from_utf8_lossy(found)),
        }
    }

    pub(crate) fn version(what: &'static str, offset: usize, expected: u32, found: u32) -> Self {
        Error::Format {
            what,
            offset,
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }
}

impl From<cookie_factory::GenError> for Error {
    fn from(e: cookie_factory::GenError) -> Self {
        match e {
            cookie_factory::GenError::IoError(e) => Error::Io(e),
            e => Error::Serialize(format!("{:?}", e)),
        }
    }
}
