//! Search engine answering plate queries from the hash index.
use anyhow::Result;
use hashindex::IndexReader;
use record::Fine;
use std::path::Path;
use wire::SearchCriteria;

/// Result cap used when none is configured.
pub const DEFAULT_MAX_RESULTS: usize = 100;

/// Returns `true` if `fine` passes the optional filters of `criteria`.
///
/// An empty city and a zero year match anything; otherwise the comparison is
/// exact (city is case-sensitive). Both filters must pass.
pub fn matches(criteria: &SearchCriteria, fine: &Fine) -> bool {
    let city_ok = criteria.city.is_empty() || fine.city == criteria.city;
    let year_ok = criteria.year == 0 || fine.year == criteria.year;
    city_ok && year_ok
}

/// Records found for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOutcome {
    /// Matching fines, most recently indexed first, at most `max_results`.
    pub fines: Vec<Fine>,
    /// `false` if the index chain could not be walked to its end.
    pub complete: bool,
    /// `true` if matches beyond `max_results` were dropped.
    pub truncated: bool,
}

/// Read-only query engine over an [`IndexReader`].
///
/// # Read Path
///
/// 1. Hash the plate and read the bucket head from the hash table.
/// 2. Walk the bucket chain through the node store, comparing keys.
/// 3. Re-read each matching line from the record store.
/// 4. Keep records passing [`matches`], up to `max_results`.
///
/// The engine holds no open files and no state between requests.
pub struct SearchEngine {
    reader: IndexReader,
    /// Hard cap on fines returned for one request.
    pub max_results: usize,
}

impl SearchEngine {
    pub fn new(reader: IndexReader, max_results: usize) -> Self {
        Self {
            reader,
            max_results,
        }
    }

    /// Opens the index files and record store.
    ///
    /// # Arguments
    ///
    /// * `index`: hash table file.
    /// * `nodes`: node store file.
    /// * `dataset`: record store the index was built from.
    /// * `max_results`: cap on fines per response.
    pub fn open(index: &Path, nodes: &Path, dataset: &Path, max_results: usize) -> Result<Self> {
        let reader = IndexReader::open(index, nodes, dataset)?;
        tracing::info!(
            table_size = reader.table_size(),
            nodes = reader.node_count(),
            max_results,
            "index opened"
        );
        Ok(Self::new(reader, max_results))
    }

    /// Runs one search. A plate with no matches yields an empty outcome.
    pub fn search(&self, criteria: &SearchCriteria) -> Result<SearchOutcome> {
        if criteria.plate.is_empty() {
            tracing::debug!("empty plate, nothing to search");
            return Ok(SearchOutcome {
                complete: true,
                ..Default::default()
            });
        }

        let lookup = self
            .reader
            .lookup_where(&criteria.plate, self.max_results, |f| matches(criteria, f))?;

        if lookup.truncated {
            tracing::warn!(
                plate = %criteria.plate,
                max_results = self.max_results,
                "more matches than the result cap, truncating"
            );
        }
        tracing::debug!(
            plate = %criteria.plate,
            city = %criteria.city,
            year = criteria.year,
            found = lookup.hits.len(),
            "search done"
        );

        Ok(SearchOutcome {
            complete: lookup.complete,
            truncated: lookup.truncated,
            fines: lookup.into_fines(),
        })
    }
}
