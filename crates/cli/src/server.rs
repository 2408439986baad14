//! Search server loop: one client, one request, one response, repeat.

use anyhow::{Context, Result};
use record::Fine;
use wire::{FifoChannel, SearchCriteria};

use crate::engine::SearchEngine;

/// Serves requests until the channel fails.
///
/// Every exchange is handled to completion before the next request is read.
/// Only channel failures end the loop; they are returned to the caller.
pub fn serve(engine: &SearchEngine, channel: &FifoChannel) -> Result<()> {
    channel.create().context("preparing fifos")?;
    tracing::info!(
        request = %channel.request_path().display(),
        response = %channel.response_path().display(),
        "search engine active"
    );
    loop {
        serve_one(engine, channel)?;
    }
}

/// Handles one exchange, returning the number of fines sent.
pub fn serve_one(engine: &SearchEngine, channel: &FifoChannel) -> Result<usize> {
    let fines = match channel.receive() {
        Ok(criteria) => answer(engine, &criteria),
        Err(e) if !e.is_channel_failure() => {
            tracing::warn!(error = %e, "malformed request, answering with no results");
            Vec::new()
        }
        Err(e) => return Err(e).context("reading request"),
    };

    channel.respond(&fines).context("sending response")?;
    tracing::info!(found = fines.len(), "request served");
    Ok(fines.len())
}

/// Runs the search; failures are logged and answered with no results, since
/// the response format has no way to carry an error.
pub fn answer(engine: &SearchEngine, criteria: &SearchCriteria) -> Vec<Fine> {
    match engine.search(criteria) {
        Ok(outcome) => {
            tracing::debug!(
                complete = outcome.complete,
                truncated = outcome.truncated,
                "search outcome"
            );
            if !outcome.complete {
                tracing::warn!(plate = %criteria.plate, "index walk incomplete, sending partial results");
            }
            outcome.fines
        }
        Err(e) => {
            let chain = format!("{:#}", e);
            tracing::error!(plate = %criteria.plate, error = %chain, "search failed");
            Vec::new()
        }
    }
}
