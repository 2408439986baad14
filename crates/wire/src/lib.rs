//! # Wire
//!
//! Framing for the search exchange between a client and the search server,
//! and the named-pipe channel that carries it.
//!
//! One exchange is one request and one response:
//!
//! ```text
//! client ──▶ server   criteria  plate[8] | city[64] | year: i32            (76 bytes)
//! server ──▶ client   count: i32
//!                     count × fine  year: i32 | plate[8] | date[16] |
//!                                   amount: i32 | city[64] | paid[4]      (100 bytes each)
//! ```
//!
//! Integers are little-endian, text fields are NUL padded (see
//! [`record::FixedStr`]). There is no versioning, checksum or error status:
//! a failed search and an empty one look the same to the client.

mod codec;
#[cfg(unix)]
mod fifo;

pub use codec::{
    read_fine, read_response, write_fine, write_response, SearchCriteria, CRITERIA_BYTES,
    FINE_BYTES,
};
#[cfg(unix)]
pub use fifo::{ensure_fifo, FifoChannel, DEFAULT_REQUEST_FIFO, DEFAULT_RESPONSE_FIFO};

use record::FieldError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("field `{field}`: {source}")]
    Field {
        field: &'static str,
        #[source]
        source: FieldError,
    },
    #[error("invalid result count {0}")]
    BadCount(i32),
    #[error("{0} results do not fit in a response")]
    TooMany(usize),
    #[error("{0} exists and is not a fifo")]
    NotFifo(PathBuf),
}

impl WireError {
    /// `true` when the channel itself failed, as opposed to the peer sending
    /// a payload that does not decode.
    pub fn is_channel_failure(&self) -> bool {
        matches!(self, WireError::Io(_) | WireError::NotFifo(_))
    }
}
