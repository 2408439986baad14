use anyhow::{bail, Context, Result};
use record::{Fine, Plate, RecordStore};
use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::format::{
    bucket_of, read_slot, slot_pos, IndexError, IndexNode, Slot, NODE_BYTES, SLOT_BYTES,
};

/// A record found through the index, with the store offset it was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub data_offset: u64,
    pub fine: Fine,
}

/// Result of walking one bucket chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lookup {
    /// Matching records in chain order, most recently indexed first.
    pub hits: Vec<Hit>,
    /// `false` if the chain broke or a matching record could not be re-read.
    /// `hits` then holds what was collected before the failure.
    pub complete: bool,
    /// `true` if more records matched than the requested limit.
    pub truncated: bool,
}

impl Lookup {
    pub fn into_fines(self) -> Vec<Fine> {
        self.hits.into_iter().map(|h| h.fine).collect()
    }
}

/// Summary of an index's occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
    pub table_size: u64,
    pub nodes: u64,
    pub occupied_buckets: u64,
}

/// Read-only access to a built index and the record store behind it.
///
/// Only paths and sizes are kept; each lookup opens the hash table, node
/// store and record store, walks one chain and closes them again.
#[derive(Debug, Clone)]
pub struct IndexReader {
    index_path: PathBuf,
    nodes_path: PathBuf,
    dataset_path: PathBuf,
    table_size: u64,
    node_count: u64,
}

impl IndexReader {
    /// Opens an index built by [`IndexBuilder`](crate::IndexBuilder).
    ///
    /// # Validation
    ///
    /// - The hash table length must be a non-zero multiple of 8; it also
    ///   determines the table size.
    /// - The node store length must be a multiple of the node size.
    /// - The record store must be readable.
    pub fn open<P: AsRef<Path>>(index_path: P, nodes_path: P, dataset_path: P) -> Result<Self> {
        let index_path = index_path.as_ref().to_path_buf();
        let nodes_path = nodes_path.as_ref().to_path_buf();
        let dataset_path = dataset_path.as_ref().to_path_buf();

        let table_len = std::fs::metadata(&index_path)
            .with_context(|| format!("opening hash table {}", index_path.display()))?
            .len();
        if table_len == 0 || table_len % SLOT_BYTES != 0 {
            bail!("hash table has invalid length {}", table_len);
        }

        let nodes_len = std::fs::metadata(&nodes_path)
            .with_context(|| format!("opening node store {}", nodes_path.display()))?
            .len();
        if nodes_len % NODE_BYTES != 0 {
            bail!("node store has invalid length {}", nodes_len);
        }

        File::open(&dataset_path)
            .with_context(|| format!("opening dataset {}", dataset_path.display()))?;

        Ok(Self {
            index_path,
            nodes_path,
            dataset_path,
            table_size: table_len / SLOT_BYTES,
            node_count: nodes_len / NODE_BYTES,
        })
    }

    pub fn table_size(&self) -> u64 {
        self.table_size
    }

    pub fn node_count(&self) -> u64 {
        self.node_count
    }

    /// Every record whose plate equals `plate`, most recently indexed first.
    ///
    /// A plate that was never indexed yields an empty, complete [`Lookup`].
    ///
    /// # Errors
    ///
    /// Same as [`lookup_where`](Self::lookup_where).
    pub fn lookup(&self, plate: &Plate) -> Result<Lookup> {
        self.lookup_where(plate, usize::MAX, |_| true)
    }

    /// Walks the chain for `plate`, keeping records accepted by `filter`.
    ///
    /// The walk stops once `limit` records are kept and another accepted one
    /// turns up (`truncated`), or when the chain breaks (`!complete`).
    ///
    /// # Read Path
    ///
    /// 1. Read slot `djb2(plate) % table_size` from the hash table.
    /// 2. Follow `next` offsets through the node store, at most `node_count`
    ///    nodes, comparing the full 8-byte key.
    /// 3. For each matching node, re-read and parse the line at `data_offset`
    ///    in the record store, then apply `filter`.
    ///
    /// # Errors
    ///
    /// Failing to open any of the three files or to read the bucket head is
    /// an error. Problems further down the chain only mark the result
    /// incomplete.
    pub fn lookup_where<F>(&self, plate: &Plate, limit: usize, mut filter: F) -> Result<Lookup>
    where
        F: FnMut(&Fine) -> bool,
    {
        let mut table = File::open(&self.index_path)?;
        let mut nodes = File::open(&self.nodes_path)?;
        let mut store = RecordStore::open(&self.dataset_path)?;

        // bucket head
        let bucket = bucket_of(plate, self.table_size);
        table.seek(SeekFrom::Start(slot_pos(bucket)))?;
        let mut next = read_slot(&mut table).context("reading bucket head")?;

        let mut found = Lookup {
            hits: Vec::new(),
            complete: true,
            truncated: false,
        };
        let mut visited = 0u64;

        while let Slot::Node(offset) = next {
            if visited == self.node_count {
                tracing::warn!(bucket, visited, "chain longer than node store, stopping");
                found.complete = false;
                break;
            }
            visited += 1;

            let node = match self.read_node(&mut nodes, offset) {
                Ok(node) => node,
                Err(e) => {
                    tracing::warn!(bucket, offset, error = %e, "broken chain, returning partial results");
                    found.complete = false;
                    break;
                }
            };
            next = node.next;

            if node.key != *plate {
                continue;
            }

            // re-read the record and check its plate against the key
            let fine = match store.read_at(node.data_offset) {
                Ok(fine) if fine.plate == *plate => fine,
                Ok(fine) => {
                    tracing::warn!(
                        offset = node.data_offset,
                        record_plate = %fine.plate,
                        "index points at a record with another plate"
                    );
                    found.complete = false;
                    continue;
                }
                Err(e) => {
                    tracing::warn!(offset = node.data_offset, error = %e, "cannot re-read record");
                    found.complete = false;
                    continue;
                }
            };

            if !filter(&fine) {
                continue;
            }
            if found.hits.len() >= limit {
                found.truncated = true;
                break;
            }
            found.hits.push(Hit {
                data_offset: node.data_offset,
                fine,
            });
        }

        Ok(found)
    }

    /// Counts nodes and non-empty buckets.
    ///
    /// Scans the whole hash table sequentially; the node count comes from the
    /// node store length measured at [`open`](Self::open).
    ///
    /// # Errors
    ///
    /// Returns an error if the hash table cannot be opened or read, or holds
    /// a negative offset other than the empty marker.
    pub fn stats(&self) -> Result<IndexStats> {
        let mut table = BufReader::new(File::open(&self.index_path)?);
        let mut occupied_buckets = 0;
        for _ in 0..self.table_size {
            if let Slot::Node(_) = read_slot(&mut table)? {
                occupied_buckets += 1;
            }
        }
        Ok(IndexStats {
            table_size: self.table_size,
            nodes: self.node_count,
            occupied_buckets,
        })
    }

    fn read_node(&self, nodes: &mut File, offset: u64) -> Result<IndexNode, IndexError> {
        let len = self.node_count * NODE_BYTES;
        if offset % NODE_BYTES != 0 || offset + NODE_BYTES > len {
            return Err(IndexError::NodeOutOfRange { offset, len });
        }
        nodes.seek(SeekFrom::Start(offset))?;
        IndexNode::read_from(nodes)
    }
}
