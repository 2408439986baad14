//! # Record
//!
//! The traffic-fine dataset as the rest of the workspace sees it.
//!
//! The record store is a plain comma-separated text file with a header line
//! followed by one fine per line:
//!
//! ```text
//! year,plate,date,amount,city,paid
//! 2015,ABC123,2015-04-01,150,Springfield,no
//! ```
//!
//! Each data line sits at a known byte offset. The hash index stores those
//! offsets and lookups re-parse the line found there, so the store itself is
//! never rewritten.
//!
//! ## Key properties
//! - **Fixed-width text**: every string field is a [`FixedStr`] with the same
//!   capacity it has on disk and on the wire. Overlong input is rejected, not
//!   truncated.
//! - **Strict parsing**: a line must have exactly six fields, numeric fields
//!   must parse, and lines over [`LINE_LIMIT`] bytes are malformed.
//! - **Offset tracking**: [`RecordStore`] reports the byte offset and plate of
//!   every line it yields and can re-read a full record from any such offset.
//! - **Bounded lines**: a line is never buffered past [`LINE_LIMIT`] + 1 bytes.
//!
//! ## Example
//! ```rust
//! use record::Fine;
//!
//! let fine = Fine::parse_line(b"2018,ABC123,2018-09-09,200,Shelbyville,yes\n").unwrap();
//! assert_eq!(fine.year, 2018);
//! assert_eq!(fine.plate.as_str(), "ABC123");
//! assert_eq!(fine.city.as_str(), "Shelbyville");
//! ```

mod fine;
mod fixed;
mod store;

pub use fine::{Fine, ParseError, Plate};
pub use fixed::{FieldError, FixedStr};
pub use store::{Entry, RecordStore, StoreError};

/// Width of a plate field, terminator included (at most 7 bytes of text).
pub const PLATE_SIZE: usize = 8;

/// Width of the fine date field, terminator included.
pub const DATE_SIZE: usize = 16;

/// Width of the city field, terminator included.
pub const CITY_SIZE: usize = 64;

/// Width of the paid flag field, terminator included.
pub const PAID_SIZE: usize = 4;

/// Longest accepted record line in bytes, line terminator included.
///
/// Longer lines are reported as [`ParseError::LineTooLong`].
pub const LINE_LIMIT: usize = 256;
