//! Named-pipe transport.
//!
//! Two FIFOs carry one exchange at a time: the client writes criteria into
//! the request FIFO, the server answers through the response FIFO. Opening a
//! FIFO blocks until the other end is opened too, and reads and writes block
//! until the peer keeps up. Nothing here times out.

use record::Fine;
use std::ffi::CString;
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};

use crate::codec::{read_response, write_response, SearchCriteria};
use crate::WireError;

/// Client to server.
pub const DEFAULT_REQUEST_FIFO: &str = "/tmp/fifo_c2s";

/// Server to client.
pub const DEFAULT_RESPONSE_FIFO: &str = "/tmp/fifo_s2c";

/// Creates a FIFO at `path` (mode 0666, before umask) unless one exists.
///
/// # Errors
///
/// Fails if something other than a FIFO already sits at `path`, or if
/// `mkfifo` fails for any reason other than a concurrent creation.
pub fn ensure_fifo(path: &Path) -> Result<(), WireError> {
    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_fifo() => return Ok(()),
        Ok(_) => return Err(WireError::NotFifo(path.to_path_buf())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    // SAFETY: c_path is a valid NUL-terminated string that outlives the call.
    let rc = unsafe { libc::mkfifo(c_path.as_ptr(), 0o666) };
    if rc != 0 {
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::AlreadyExists {
            return Err(err.into());
        }
    }
    tracing::debug!(path = %path.display(), "created fifo");
    Ok(())
}

/// The pair of FIFOs shared by a client and the server.
#[derive(Debug, Clone)]
pub struct FifoChannel {
    request: PathBuf,
    response: PathBuf,
}

impl Default for FifoChannel {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_FIFO, DEFAULT_RESPONSE_FIFO)
    }
}

impl FifoChannel {
    pub fn new<P: AsRef<Path>>(request: P, response: P) -> Self {
        Self {
            request: request.as_ref().to_path_buf(),
            response: response.as_ref().to_path_buf(),
        }
    }

    pub fn request_path(&self) -> &Path {
        &self.request
    }

    pub fn response_path(&self) -> &Path {
        &self.response
    }

    /// Makes sure both FIFOs exist.
    pub fn create(&self) -> Result<(), WireError> {
        ensure_fifo(&self.request)?;
        ensure_fifo(&self.response)
    }

    /// Server side: waits for a client and reads one request.
    ///
    /// The request FIFO is closed again before returning.
    pub fn receive(&self) -> Result<SearchCriteria, WireError> {
        let mut rdr = BufReader::new(File::open(&self.request)?);
        SearchCriteria::read_from(&mut rdr)
    }

    /// Server side: sends the response for the last request.
    pub fn respond(&self, fines: &[Fine]) -> Result<(), WireError> {
        let file = OpenOptions::new().write(true).open(&self.response)?;
        write_response(&mut BufWriter::new(file), fines)
    }

    /// Client side: one full exchange.
    pub fn call(&self, criteria: &SearchCriteria) -> Result<Vec<Fine>, WireError> {
        {
            let mut w = OpenOptions::new().write(true).open(&self.request)?;
            criteria.write_to(&mut w)?;
        }
        let mut rdr = BufReader::new(File::open(&self.response)?);
        read_response(&mut rdr)
    }
}
