//! `finefinder`: build a plate index over a fines CSV, serve searches over
//! named pipes, and query a running server.
//!
//! ```sh
//! finefinder --dataset dataset.csv build
//! finefinder serve &
//! finefinder query --plate abc123 --city Springfield
//! ```

mod client;
mod config;
mod engine;
mod server;

use std::io;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use hashindex::{IndexBuilder, IndexReader};
use tracing_subscriber::EnvFilter;
use wire::FifoChannel;

use crate::config::{Cli, Command, DataFiles};
use crate::engine::SearchEngine;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let chain = format!("{:#}", e);
            tracing::error!(error = %chain, "fatal");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|e| {
        eprintln!("invalid log filter {:?} ({}), using info", filter, e);
        EnvFilter::new("info")
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let DataFiles {
        dataset,
        index,
        nodes,
    } = cli.files;

    match cli.command {
        Command::Build { table_size } => {
            let builder = IndexBuilder::new(table_size)?;
            tracing::info!(
                dataset = %dataset.display(),
                table_size = builder.table_size(),
                "building index"
            );
            let stats = builder.build(&dataset, &index, &nodes)?;
            println!(
                "indexed {} records, skipped {}, {} buckets",
                stats.indexed, stats.skipped, stats.table_size
            );
        }
        Command::Serve { fifos, max_results } => {
            let engine = SearchEngine::open(&index, &nodes, &dataset, max_results)?;
            let channel = FifoChannel::new(fifos.request_fifo, fifos.response_fifo);
            server::serve(&engine, &channel)?;
        }
        Command::Query {
            plate,
            city,
            year,
            fifos,
        } => {
            let criteria = client::criteria_from(&plate, city.as_deref(), year)?;
            let channel = FifoChannel::new(fifos.request_fifo, fifos.response_fifo);
            let fines = client::query(&channel, &criteria)?;
            client::print_results(&mut io::stdout().lock(), &fines)?;
        }
        Command::Stats => {
            let stats = IndexReader::open(&index, &nodes, &dataset)?.stats()?;
            println!("buckets:  {}", stats.table_size);
            println!("nodes:    {}", stats.nodes);
            println!("occupied: {}", stats.occupied_buckets);
            if stats.occupied_buckets > 0 {
                println!(
                    "avg chain: {:.2}",
                    stats.nodes as f64 / stats.occupied_buckets as f64
                );
            }
        }
    }
    Ok(())
}
