use anyhow::{bail, Context, Result};
use record::RecordStore;
use std::ffi::OsString;
use std::fs::{rename, File, OpenOptions};
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::format::{
    bucket_of, read_slot, slot_pos, write_slot, IndexNode, Slot, DEFAULT_TABLE_SIZE, NODE_BYTES,
    SLOT_BYTES,
};

/// Outcome of a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildStats {
    /// Data lines written to the node store.
    pub indexed: u64,
    /// Data lines skipped as malformed.
    pub skipped: u64,
    pub table_size: u64,
}

/// Builds the hash table and node store from a record store in one pass.
///
/// Every build starts from empty files: both outputs are written under a
/// `.tmp` name next to their target, fsynced, then renamed into place. An
/// interrupted build leaves the previous index untouched.
#[derive(Debug, Clone, Copy)]
pub struct IndexBuilder {
    table_size: u64,
}

impl Default for IndexBuilder {
    fn default() -> Self {
        Self {
            table_size: DEFAULT_TABLE_SIZE,
        }
    }
}

impl IndexBuilder {
    /// Builder for a hash table of `table_size` buckets.
    ///
    /// The size is fixed into the hash table file; readers derive it from the
    /// file length, so it never has to be passed again.
    ///
    /// # Errors
    ///
    /// Returns an error if `table_size` is zero.
    pub fn new(table_size: u64) -> Result<Self> {
        if table_size == 0 {
            bail!("table size must be at least 1");
        }
        Ok(Self { table_size })
    }

    pub fn table_size(&self) -> u64 {
        self.table_size
    }

    /// Indexes every data line of `dataset` into `index_path` (hash table) and
    /// `nodes_path` (node store).
    ///
    /// For each record, in file order: hash the plate, read the bucket head,
    /// append a node linking to the old head, and point the bucket at the new
    /// node. Chains therefore list the most recently indexed record first.
    ///
    /// Only the plate of each line is validated here. A line with a usable
    /// plate is indexed even if its other fields are bad; lookups re-parse the
    /// whole line and report it then.
    ///
    /// # File Layout
    ///
    /// ```text
    /// hash table: table_size x slot(i64 LE), -1 = empty
    /// node store: repeated key[8] | data_offset(i64 LE) | next(i64 LE)
    /// ```
    ///
    /// # Crash Safety
    ///
    /// Both files are written as `<path>.tmp`, synced, then renamed into
    /// place, node store first. On failure the temp files are removed.
    ///
    /// # Errors
    ///
    /// Any I/O failure aborts the build. A dataset without a header line is an
    /// error. Data lines without a usable plate are logged and counted, never
    /// fatal.
    pub fn build(&self, dataset: &Path, index_path: &Path, nodes_path: &Path) -> Result<BuildStats> {
        let mut store = RecordStore::open(dataset)
            .with_context(|| format!("opening dataset {}", dataset.display()))?;

        if !store.skip_header()? {
            bail!("dataset {} has no header line", dataset.display());
        }

        let table_tmp = tmp_path(index_path);
        let nodes_tmp = tmp_path(nodes_path);

        let stats = self
            .write_tmp(&mut store, &table_tmp, &nodes_tmp)
            .and_then(|stats| {
                // nodes first: an installed table must not point into an older node store
                rename(&nodes_tmp, nodes_path)
                    .with_context(|| format!("installing {}", nodes_path.display()))?;
                rename(&table_tmp, index_path)
                    .with_context(|| format!("installing {}", index_path.display()))?;
                Ok(stats)
            });

        let stats = match stats {
            Ok(stats) => stats,
            Err(e) => {
                discard(&table_tmp);
                discard(&nodes_tmp);
                return Err(e);
            }
        };

        tracing::info!(
            indexed = stats.indexed,
            skipped = stats.skipped,
            table_size = stats.table_size,
            bytes = store.position(),
            "index built"
        );
        Ok(stats)
    }

    /// Writes both index files under their temporary names.
    fn write_tmp<R: Read>(
        &self,
        store: &mut RecordStore<R>,
        table_tmp: &Path,
        nodes_tmp: &Path,
    ) -> Result<BuildStats> {
        let mut table = self.create_table(table_tmp)?;
        let mut nodes = BufWriter::new(create(nodes_tmp)?);

        let mut stats = BuildStats {
            indexed: 0,
            skipped: 0,
            table_size: self.table_size,
        };

        while let Some(entry) = store.next_entry()? {
            let plate = match entry.plate {
                Ok(plate) => plate,
                Err(e) => {
                    tracing::warn!(line = entry.line, error = %e, "skipping record without a usable plate");
                    stats.skipped += 1;
                    continue;
                }
            };

            // current head of the bucket
            let pos = slot_pos(bucket_of(&plate, self.table_size));
            table.seek(SeekFrom::Start(pos))?;
            let head = read_slot(&mut table)?;

            // append the node; nodes are never rewritten, so its offset is known
            let node_offset = stats.indexed * NODE_BYTES;
            IndexNode {
                key: plate,
                data_offset: entry.offset,
                next: head,
            }
            .write_to(&mut nodes)?;

            // bucket now starts at the new node
            table.seek(SeekFrom::Start(pos))?;
            write_slot(&mut table, Slot::Node(node_offset))?;
            stats.indexed += 1;
        }

        // flush and sync both files before they are renamed
        let nodes = nodes.into_inner().map_err(|e| e.into_error())?;
        nodes.sync_all()?;
        table.sync_all()?;
        Ok(stats)
    }

    /// Creates a hash table file with every slot empty.
    fn create_table(&self, path: &Path) -> Result<File> {
        let mut file = create(path)?;
        // an empty slot (-1) is all ones in two's complement
        let len = self.table_size * SLOT_BYTES;
        let written = io::copy(&mut io::repeat(0xff).take(len), &mut file)?;
        debug_assert_eq!(written, len);
        file.flush()?;
        Ok(file)
    }
}

fn create(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(true)
        .open(path)
        .with_context(|| format!("creating {}", path.display()))
}

fn discard(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "cannot remove temporary file");
        }
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}
