use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use record::{Fine, FixedStr, Plate, CITY_SIZE, DATE_SIZE, PAID_SIZE, PLATE_SIZE};
use std::io::{Read, Write};

use crate::WireError;

/// Encoded size of [`SearchCriteria`].
pub const CRITERIA_BYTES: usize = PLATE_SIZE + CITY_SIZE + 4;

/// Encoded size of one [`Fine`].
pub const FINE_BYTES: usize = 4 + PLATE_SIZE + DATE_SIZE + 4 + CITY_SIZE + PAID_SIZE;

/// What a client asks for.
///
/// An empty `city` and a `year` of 0 are wildcards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SearchCriteria {
    pub plate: Plate,
    pub city: FixedStr<CITY_SIZE>,
    pub year: i32,
}

impl SearchCriteria {
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<(), WireError> {
        let mut buf = Vec::with_capacity(CRITERIA_BYTES);
        buf.extend_from_slice(self.plate.as_padded());
        buf.extend_from_slice(self.city.as_padded());
        buf.write_i32::<LittleEndian>(self.year)?;
        w.write_all(&buf)?;
        w.flush()?;
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> Result<Self, WireError> {
        let mut buf = [0u8; CRITERIA_BYTES];
        r.read_exact(&mut buf)?;
        let mut br = &buf[..];
        Ok(Self {
            plate: read_field(&mut br, "plate")?,
            city: read_field(&mut br, "city")?,
            year: br.read_i32::<LittleEndian>()?,
        })
    }
}

pub fn write_fine<W: Write>(w: &mut W, fine: &Fine) -> Result<(), WireError> {
    w.write_i32::<LittleEndian>(fine.year)?;
    w.write_all(fine.plate.as_padded())?;
    w.write_all(fine.date.as_padded())?;
    w.write_i32::<LittleEndian>(fine.amount)?;
    w.write_all(fine.city.as_padded())?;
    w.write_all(fine.paid.as_padded())?;
    Ok(())
}

pub fn read_fine<R: Read>(r: &mut R) -> Result<Fine, WireError> {
    let mut buf = [0u8; FINE_BYTES];
    r.read_exact(&mut buf)?;
    let mut br = &buf[..];
    Ok(Fine {
        year: br.read_i32::<LittleEndian>()?,
        plate: read_field(&mut br, "plate")?,
        date: read_field(&mut br, "date")?,
        amount: br.read_i32::<LittleEndian>()?,
        city: read_field(&mut br, "city")?,
        paid: read_field(&mut br, "paid")?,
    })
}

/// Writes the count followed by every fine, then flushes.
pub fn write_response<W: Write>(w: &mut W, fines: &[Fine]) -> Result<(), WireError> {
    let count = i32::try_from(fines.len()).map_err(|_| WireError::TooMany(fines.len()))?;
    let mut buf = Vec::with_capacity(4 + fines.len() * FINE_BYTES);
    buf.write_i32::<LittleEndian>(count)?;
    for fine in fines {
        write_fine(&mut buf, fine)?;
    }
    w.write_all(&buf)?;
    w.flush()?;
    Ok(())
}

pub fn read_response<R: Read>(r: &mut R) -> Result<Vec<Fine>, WireError> {
    let count = r.read_i32::<LittleEndian>()?;
    let n = usize::try_from(count).map_err(|_| WireError::BadCount(count))?;
    // the count is untrusted, let the vec grow past a modest guess
    let mut fines = Vec::with_capacity(n.min(1024));
    for _ in 0..n {
        fines.push(read_fine(r)?);
    }
    Ok(fines)
}

fn read_field<const N: usize>(r: &mut &[u8], field: &'static str) -> Result<FixedStr<N>, WireError> {
    let mut raw = [0u8; N];
    r.read_exact(&mut raw)?;
    FixedStr::from_padded(raw).map_err(|source| WireError::Field { field, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use record::FieldError;
    use std::io::Cursor;

    fn sample() -> Fine {
        Fine::parse_line(b"2018,ABC123,2018-09-09,200,Shelbyville,yes").unwrap()
    }

    #[test]
    fn sizes_match_layout() {
        assert_eq!(CRITERIA_BYTES, 76);
        assert_eq!(FINE_BYTES, 100);
    }

    #[test]
    fn criteria_layout() {
        let c = SearchCriteria {
            plate: Plate::new("ABC123").unwrap(),
            city: FixedStr::new("Shelbyville").unwrap(),
            year: 2018,
        };
        let mut buf = Vec::new();
        c.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), CRITERIA_BYTES);
        assert_eq!(&buf[..8], b"ABC123\0\0");
        assert_eq!(&buf[8..19], b"Shelbyville");
        assert!(buf[19..72].iter().all(|&b| b == 0));
        assert_eq!(&buf[72..], &2018i32.to_le_bytes());

        assert_eq!(SearchCriteria::read_from(&mut Cursor::new(buf)).unwrap(), c);
    }

    #[test]
    fn criteria_with_unterminated_plate_is_rejected() {
        let mut buf = b"ABCDEFGH".to_vec();
        buf.extend_from_slice(&[0u8; CITY_SIZE]);
        buf.extend_from_slice(&0i32.to_le_bytes());
        let err = SearchCriteria::read_from(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(
            err,
            WireError::Field {
                field: "plate",
                source: FieldError::Unterminated
            }
        ));
        assert!(!err.is_channel_failure());
    }

    #[test]
    fn short_criteria_is_a_channel_failure() {
        let err = SearchCriteria::read_from(&mut Cursor::new(vec![0u8; 10])).unwrap_err();
        assert!(err.is_channel_failure());
    }

    #[test]
    fn fine_layout() {
        let mut buf = Vec::new();
        write_fine(&mut buf, &sample()).unwrap();
        assert_eq!(buf.len(), FINE_BYTES);
        assert_eq!(&buf[..4], &2018i32.to_le_bytes());
        assert_eq!(&buf[4..12], b"ABC123\0\0");
        assert_eq!(&buf[12..22], b"2018-09-09");
        assert_eq!(&buf[28..32], &200i32.to_le_bytes());
        assert_eq!(&buf[96..100], b"yes\0");
    }

    #[test]
    fn response_is_count_then_records() {
        let fines = vec![sample(), Fine::parse_line(b"2015,ABC123,2015-04-01,150,Springfield,no").unwrap()];
        let mut buf = Vec::new();
        write_response(&mut buf, &fines).unwrap();
        assert_eq!(buf.len(), 4 + 2 * FINE_BYTES);
        assert_eq!(&buf[..4], &2i32.to_le_bytes());

        let back = read_response(&mut Cursor::new(buf)).unwrap();
        assert_eq!(back, fines);
    }

    #[test]
    fn empty_response_is_zero_count() {
        let mut buf = Vec::new();
        write_response(&mut buf, &[]).unwrap();
        assert_eq!(buf, 0i32.to_le_bytes().to_vec());
        assert!(read_response(&mut Cursor::new(buf)).unwrap().is_empty());
    }

    #[test]
    fn negative_count_is_rejected() {
        let buf = (-3i32).to_le_bytes().to_vec();
        assert!(matches!(
            read_response(&mut Cursor::new(buf)),
            Err(WireError::BadCount(-3))
        ));
    }

    #[test]
    fn truncated_response_is_an_error() {
        let mut buf = Vec::new();
        write_response(&mut buf, &[sample(), sample()]).unwrap();
        buf.truncate(4 + FINE_BYTES + 10);
        assert!(matches!(
            read_response(&mut Cursor::new(buf)),
            Err(WireError::Io(_))
        ));
    }
}
