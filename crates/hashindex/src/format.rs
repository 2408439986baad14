//! On-disk layout of the hash table and node store, plus the bucket hash.
//!
//! Hash table file: `table_size` consecutive slots, each an `i64 LE`.
//!
//! ```text
//! [slot 0: i64][slot 1: i64] ... [slot N-1: i64]      -1 = empty
//! ```
//!
//! Node store file: append-only array of 24-byte nodes, addressed by byte
//! offset.
//!
//! ```text
//! [key: 8 bytes, NUL padded][data_offset: i64 LE][next_offset: i64 LE]
//! ```
//!
//! Changing any constant here invalidates existing index files.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use record::{FieldError, Plate, PLATE_SIZE};
use std::io::{self, Read, Write};
use thiserror::Error;

/// Bucket count used when none is configured.
pub const DEFAULT_TABLE_SIZE: u64 = 20_000_003;

/// Size of one hash table slot in bytes.
pub const SLOT_BYTES: u64 = 8;

/// Size of one node in bytes: key + `data_offset` + `next_offset`.
pub const NODE_BYTES: u64 = PLATE_SIZE as u64 + 8 + 8;

/// Raw value of an empty slot or a chain terminator.
const EMPTY: i64 = -1;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid slot value {0}")]
    CorruptSlot(i64),
    #[error("invalid data offset {0}")]
    CorruptOffset(i64),
    #[error("invalid node key: {0}")]
    CorruptKey(#[from] FieldError),
    #[error("node offset {offset} outside node store of {len} bytes")]
    NodeOutOfRange { offset: u64, len: u64 },
}

/// A bucket head or a node's `next` link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Empty,
    /// Byte offset of a node in the node store.
    Node(u64),
}

impl Slot {
    pub fn from_raw(raw: i64) -> Result<Self, IndexError> {
        match raw {
            EMPTY => Ok(Slot::Empty),
            n if n >= 0 => Ok(Slot::Node(n as u64)),
            n => Err(IndexError::CorruptSlot(n)),
        }
    }

    pub fn to_raw(self) -> i64 {
        match self {
            Slot::Empty => EMPTY,
            Slot::Node(offset) => offset as i64,
        }
    }
}

pub fn read_slot<R: Read>(r: &mut R) -> Result<Slot, IndexError> {
    Slot::from_raw(r.read_i64::<LittleEndian>()?)
}

pub fn write_slot<W: Write>(w: &mut W, slot: Slot) -> io::Result<()> {
    w.write_i64::<LittleEndian>(slot.to_raw())
}

/// One chain link in the node store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexNode {
    pub key: Plate,
    /// Byte offset of the record line in the record store.
    pub data_offset: u64,
    pub next: Slot,
}

impl IndexNode {
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(self.key.as_padded())?;
        w.write_i64::<LittleEndian>(self.data_offset as i64)?;
        write_slot(w, self.next)
    }

    pub fn read_from<R: Read>(r: &mut R) -> Result<Self, IndexError> {
        let mut raw = [0u8; PLATE_SIZE];
        r.read_exact(&mut raw)?;
        let key = Plate::from_padded(raw)?;
        let data_offset = r.read_i64::<LittleEndian>()?;
        if data_offset < 0 {
            return Err(IndexError::CorruptOffset(data_offset));
        }
        let next = read_slot(r)?;
        Ok(Self {
            key,
            data_offset: data_offset as u64,
            next,
        })
    }
}

/// DJB2 string hash: `h = 5381; h = h * 33 + b` with wrapping arithmetic.
pub fn djb2(bytes: &[u8]) -> u64 {
    bytes.iter().fold(5381u64, |h, &b| {
        (h << 5).wrapping_add(h).wrapping_add(u64::from(b))
    })
}

/// Bucket index of `key` in a table of `table_size` buckets.
pub fn bucket_of(key: &Plate, table_size: u64) -> u64 {
    djb2(key.as_bytes()) % table_size
}

/// Byte position of a bucket's slot in the hash table file.
pub fn slot_pos(bucket: u64) -> u64 {
    bucket * SLOT_BYTES
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn djb2_known_values() {
        assert_eq!(djb2(b""), 5381);
        assert_eq!(djb2(b"a"), 5381 * 33 + 97);
        assert_eq!(djb2(b"ab"), (5381 * 33 + 97) * 33 + 98);
    }

    #[test]
    fn djb2_wraps_instead_of_overflowing() {
        // long enough to overflow 64 bits many times over
        let long = vec![b'z'; 1000];
        assert_eq!(djb2(&long), djb2(&long));
    }

    #[test]
    fn bucket_is_deterministic_and_in_range() {
        let key = Plate::new("ABC123").unwrap();
        let a = bucket_of(&key, DEFAULT_TABLE_SIZE);
        let b = bucket_of(&key, DEFAULT_TABLE_SIZE);
        assert_eq!(a, b);
        assert!(a < DEFAULT_TABLE_SIZE);
        assert_eq!(bucket_of(&key, 1), 0);
    }

    #[test]
    fn slot_raw_values() {
        assert_eq!(Slot::from_raw(-1).unwrap(), Slot::Empty);
        assert_eq!(Slot::from_raw(48).unwrap(), Slot::Node(48));
        assert!(matches!(Slot::from_raw(-2), Err(IndexError::CorruptSlot(-2))));
        assert_eq!(Slot::Empty.to_raw(), -1);
        assert_eq!(Slot::Node(0).to_raw(), 0);
    }

    #[test]
    fn empty_slot_is_all_ones() {
        let mut buf = Vec::new();
        write_slot(&mut buf, Slot::Empty).unwrap();
        assert_eq!(buf, vec![0xff; SLOT_BYTES as usize]);
    }

    #[test]
    fn node_layout() {
        let node = IndexNode {
            key: Plate::new("ABC123").unwrap(),
            data_offset: 33,
            next: Slot::Empty,
        };
        let mut buf = Vec::new();
        node.write_to(&mut buf).unwrap();
        assert_eq!(buf.len() as u64, NODE_BYTES);
        assert_eq!(&buf[..8], b"ABC123\0\0");
        assert_eq!(&buf[8..16], &33i64.to_le_bytes());
        assert_eq!(&buf[16..24], &(-1i64).to_le_bytes());

        let back = IndexNode::read_from(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn node_rejects_corruption() {
        let mut buf = b"ABC123\0\0".to_vec();
        buf.extend_from_slice(&(-5i64).to_le_bytes());
        buf.extend_from_slice(&(-1i64).to_le_bytes());
        assert!(matches!(
            IndexNode::read_from(&mut Cursor::new(&buf)),
            Err(IndexError::CorruptOffset(-5))
        ));

        let mut unterminated = b"ABCDEFGH".to_vec();
        unterminated.extend_from_slice(&[0u8; 16]);
        assert!(matches!(
            IndexNode::read_from(&mut Cursor::new(&unterminated)),
            Err(IndexError::CorruptKey(_))
        ));

        let short = b"ABC".to_vec();
        assert!(matches!(
            IndexNode::read_from(&mut Cursor::new(&short)),
            Err(IndexError::Io(_))
        ));
    }
}
