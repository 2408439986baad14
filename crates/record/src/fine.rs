use thiserror::Error;

use crate::fixed::{FieldError, FixedStr};
use crate::{CITY_SIZE, DATE_SIZE, LINE_LIMIT, PAID_SIZE, PLATE_SIZE};

/// A license plate as stored in index nodes and search criteria.
pub type Plate = FixedStr<PLATE_SIZE>;

/// Number of comma-separated fields in a record line.
const FIELD_COUNT: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("line is {0} bytes, limit is {}", LINE_LIMIT)]
    LineTooLong(usize),
    #[error("line is not valid utf-8")]
    InvalidUtf8,
    #[error("expected {} fields, found {0}", FIELD_COUNT)]
    FieldCount(usize),
    #[error("plate is empty")]
    EmptyPlate,
    #[error("field `{field}` is not an integer: {value:?}")]
    Integer { field: &'static str, value: String },
    #[error("field `{field}`: {source}")]
    Field {
        field: &'static str,
        #[source]
        source: FieldError,
    },
}

/// One traffic fine, as parsed from a record store line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Fine {
    /// Year of validity.
    pub year: i32,
    pub plate: Plate,
    /// Issuance date, kept as the text found in the store.
    pub date: FixedStr<DATE_SIZE>,
    pub amount: i32,
    pub city: FixedStr<CITY_SIZE>,
    /// Paid flag token (`yes` / `no` in practice).
    pub paid: FixedStr<PAID_SIZE>,
}

impl Fine {
    /// Parses one raw store line (`year,plate,date,amount,city,paid`).
    ///
    /// A trailing `\n` or `\r\n` is ignored. The line length is checked on the
    /// raw bytes, terminator included, before anything else.
    pub fn parse_line(raw: &[u8]) -> Result<Self, ParseError> {
        let line = std::str::from_utf8(trim_line(raw)?).map_err(|_| ParseError::InvalidUtf8)?;

        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != FIELD_COUNT {
            return Err(ParseError::FieldCount(fields.len()));
        }

        let plate = plate_field(fields[1])?;

        Ok(Self {
            year: integer("year", fields[0])?,
            plate,
            date: text("date", fields[2])?,
            amount: integer("amount", fields[3])?,
            city: text("city", fields[4])?,
            paid: text("paid", fields[5])?,
        })
    }

    /// Extracts only the plate (second field) of a raw store line.
    ///
    /// The other fields are not inspected: a line whose plate is valid yields
    /// it even if the line would fail [`Fine::parse_line`]. The line limit
    /// still applies.
    ///
    /// # Errors
    ///
    /// [`ParseError::LineTooLong`], [`ParseError::FieldCount`] if there is no
    /// second field, [`ParseError::InvalidUtf8`] if the plate bytes are not
    /// UTF-8, and the plate errors of [`Fine::parse_line`].
    pub fn parse_plate(raw: &[u8]) -> Result<Plate, ParseError> {
        let line = trim_line(raw)?;
        let mut fields = line.split(|&b| b == b',');
        let field = fields.nth(1).ok_or(ParseError::FieldCount(1))?;
        let field = std::str::from_utf8(field).map_err(|_| ParseError::InvalidUtf8)?;
        plate_field(field)
    }
}

/// Checks the line limit and drops a trailing `\n` or `\r\n`.
fn trim_line(raw: &[u8]) -> Result<&[u8], ParseError> {
    if raw.len() > LINE_LIMIT {
        return Err(ParseError::LineTooLong(raw.len()));
    }
    let line = raw.strip_suffix(b"\n").unwrap_or(raw);
    Ok(line.strip_suffix(b"\r").unwrap_or(line))
}

fn plate_field(value: &str) -> Result<Plate, ParseError> {
    let plate = text::<PLATE_SIZE>("plate", value)?;
    if plate.is_empty() {
        return Err(ParseError::EmptyPlate);
    }
    Ok(plate)
}

fn integer(field: &'static str, value: &str) -> Result<i32, ParseError> {
    value.trim().parse().map_err(|_| ParseError::Integer {
        field,
        value: value.to_string(),
    })
}

fn text<const N: usize>(field: &'static str, value: &str) -> Result<FixedStr<N>, ParseError> {
    FixedStr::new(value).map_err(|source| ParseError::Field { field, source })
}
