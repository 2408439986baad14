use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use thiserror::Error;

use crate::fine::{Fine, ParseError, Plate};
use crate::LINE_LIMIT;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("no record at offset {0}")]
    Eof(u64),
    #[error("malformed record at offset {offset}: {source}")]
    Malformed {
        offset: u64,
        #[source]
        source: ParseError,
    },
}

/// A data line read sequentially from the store.
#[derive(Debug)]
pub struct Entry {
    /// Byte offset of the first byte of the line.
    pub offset: u64,
    /// 1-based line number, header included.
    pub line: u64,
    /// The line's plate; only this field is checked on a sequential read.
    pub plate: Result<Plate, ParseError>,
}

/// Sequential and random-access reader over a record store.
///
/// The reader tracks the byte offset of the next unread line itself, so
/// offsets stay exact whatever the line terminators are.
///
/// At most [`LINE_LIMIT`] + 1 bytes of a line are buffered. The rest of a
/// longer line is skipped unread, and the truncated line then fails to parse
/// with [`ParseError::LineTooLong`].
pub struct RecordStore<R: Read> {
    rdr: BufReader<R>,
    pos: u64,
    line: u64,
    buf: Vec<u8>,
}

impl RecordStore<File> {
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Ok(Self::from_reader(File::open(path)?))
    }
}

impl<R: Read> RecordStore<R> {
    pub fn from_reader(reader: R) -> Self {
        Self {
            rdr: BufReader::new(reader),
            pos: 0,
            line: 0,
            buf: Vec::new(),
        }
    }

    /// Byte offset of the next line to be read.
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Consumes the header line. Returns `false` if the store is empty.
    pub fn skip_header(&mut self) -> io::Result<bool> {
        Ok(self.read_raw()?.is_some())
    }

    /// Reads the next line and extracts its plate. Returns `Ok(None)` at end
    /// of file.
    ///
    /// Only I/O failures are errors here; a line without a usable plate is
    /// returned with `plate` set to the parse error. The remaining fields are
    /// left for [`read_at`](Self::read_at).
    pub fn next_entry(&mut self) -> io::Result<Option<Entry>> {
        let Some(offset) = self.read_raw()? else {
            return Ok(None);
        };
        Ok(Some(Entry {
            offset,
            line: self.line,
            plate: Fine::parse_plate(&self.buf),
        }))
    }

    /// Reads one line into `buf`, returning the offset it started at.
    ///
    /// `buf` keeps at most `LINE_LIMIT + 1` bytes; `pos` still advances past
    /// the whole line.
    fn read_raw(&mut self) -> io::Result<Option<u64>> {
        self.buf.clear();
        let cap = LINE_LIMIT as u64 + 1;
        let mut n = (&mut self.rdr).take(cap).read_until(b'\n', &mut self.buf)? as u64;
        if n == 0 {
            return Ok(None);
        }
        if n == cap && self.buf.last() != Some(&b'\n') {
            n += self.skip_line()?;
        }
        let offset = self.pos;
        self.pos += n;
        self.line += 1;
        Ok(Some(offset))
    }

    /// Discards input up to and including the next `\n`, returning the number
    /// of bytes dropped.
    fn skip_line(&mut self) -> io::Result<u64> {
        let mut skipped = 0u64;
        loop {
            let (used, done) = {
                let chunk = self.rdr.fill_buf()?;
                if chunk.is_empty() {
                    return Ok(skipped);
                }
                match chunk.iter().position(|&b| b == b'\n') {
                    Some(i) => (i + 1, true),
                    None => (chunk.len(), false),
                }
            };
            self.rdr.consume(used);
            skipped += used as u64;
            if done {
                return Ok(skipped);
            }
        }
    }
}

impl<R: Read + Seek> RecordStore<R> {
    /// Re-reads the record whose line starts at `offset`.
    pub fn read_at(&mut self, offset: u64) -> Result<Fine, StoreError> {
        self.rdr.seek(SeekFrom::Start(offset))?;
        self.pos = offset;
        if self.read_raw()?.is_none() {
            return Err(StoreError::Eof(offset));
        }
        Fine::parse_line(&self.buf).map_err(|source| StoreError::Malformed { offset, source })
    }
}
