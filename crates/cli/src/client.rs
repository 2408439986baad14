//! One-shot query client: validates criteria, runs a single exchange and
//! prints the results.

use anyhow::{bail, Context, Result};
use record::{Fine, FixedStr, Plate};
use std::io::{self, Write};
use wire::{FifoChannel, SearchCriteria};

/// Accepted plate lengths, in characters.
pub const PLATE_LEN: std::ops::RangeInclusive<usize> = 5..=6;

/// Accepted validity years.
pub const MIN_YEAR: i32 = 2006;
pub const MAX_YEAR: i32 = 2020;

/// Builds criteria from user input, rejecting anything the server should
/// never see.
///
/// The plate is uppercased. An explicit empty city is rejected; leave it out
/// to search every city.
pub fn criteria_from(plate: &str, city: Option<&str>, year: Option<i32>) -> Result<SearchCriteria> {
    let len = plate.chars().count();
    if !PLATE_LEN.contains(&len) {
        bail!(
            "plate must be between {} and {} characters, got {}",
            PLATE_LEN.start(),
            PLATE_LEN.end(),
            len
        );
    }
    let plate = Plate::new(&plate.to_uppercase()).context("plate")?;

    let city = match city {
        Some("") => bail!("city cannot be empty"),
        Some(c) => FixedStr::new(c).context("city")?,
        None => FixedStr::default(),
    };

    let year = match year {
        Some(y) if !(MIN_YEAR..=MAX_YEAR).contains(&y) => {
            bail!("invalid year {}, must be between {} and {}", y, MIN_YEAR, MAX_YEAR)
        }
        Some(y) => y,
        None => 0,
    };

    Ok(SearchCriteria { plate, city, year })
}

/// Sends `criteria` and waits for the answer.
pub fn query(channel: &FifoChannel, criteria: &SearchCriteria) -> Result<Vec<Fine>> {
    tracing::debug!(
        request = %channel.request_path().display(),
        response = %channel.response_path().display(),
        "sending request"
    );
    channel.call(criteria).context("search exchange failed")
}

pub fn print_results<W: Write>(out: &mut W, fines: &[Fine]) -> io::Result<()> {
    const RULE: &str = "==========================";
    if fines.is_empty() {
        writeln!(out, "{RULE}")?;
        writeln!(out, "No records found.")?;
        writeln!(out, "{RULE}")?;
        return Ok(());
    }

    writeln!(out, "Found {} records", fines.len())?;
    for f in fines {
        writeln!(out, "{RULE}")?;
        writeln!(out, "Year: {}", f.year)?;
        writeln!(out, "Plate: {}", f.plate)?;
        writeln!(out, "Fine Date: {}", f.date)?;
        writeln!(out, "Amount: {}", f.amount)?;
        writeln!(out, "City: {}", f.city)?;
        writeln!(out, "Paid: {}", f.paid)?;
    }
    writeln!(out, "{RULE}")
}
