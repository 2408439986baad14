use std::path::PathBuf;

use clap::builder::RangedU64ValueParser;
use clap::{Args, Parser, Subcommand};
use hashindex::DEFAULT_TABLE_SIZE;
use wire::{DEFAULT_REQUEST_FIFO, DEFAULT_RESPONSE_FIFO};

use crate::engine::DEFAULT_MAX_RESULTS;

/// Command-line arguments accepted by the `finefinder` binary.
#[derive(Parser, Debug)]
#[command(
    name = "finefinder",
    version,
    about = "Look up traffic fines by plate through an on-disk hash index"
)]
pub(crate) struct Cli {
    #[arg(
        long,
        global = true,
        value_name = "FILTER",
        env = "FINEFINDER_LOG",
        default_value = "info",
        help = "Log filter, e.g. `debug` or `hashindex=trace` (default: info)"
    )]
    pub(crate) log_level: String,
    #[command(flatten)]
    pub(crate) files: DataFiles,
    #[command(subcommand)]
    pub(crate) command: Command,
}

/// Locations of the record store and the two index files.
#[derive(Args, Debug, Clone)]
pub(crate) struct DataFiles {
    #[arg(
        long,
        global = true,
        value_name = "FILE",
        env = "FINEFINDER_DATASET",
        default_value = "dataset.csv",
        help = "Record store CSV"
    )]
    pub(crate) dataset: PathBuf,
    #[arg(
        long,
        global = true,
        value_name = "FILE",
        env = "FINEFINDER_INDEX",
        default_value = "hash_index.bin",
        help = "Hash table file"
    )]
    pub(crate) index: PathBuf,
    #[arg(
        long,
        global = true,
        value_name = "FILE",
        env = "FINEFINDER_NODES",
        default_value = "index_nodes.bin",
        help = "Node store file"
    )]
    pub(crate) nodes: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct Fifos {
    #[arg(
        long,
        value_name = "PATH",
        env = "FINEFINDER_REQUEST_FIFO",
        default_value = DEFAULT_REQUEST_FIFO,
        help = "Client-to-server named pipe"
    )]
    pub(crate) request_fifo: PathBuf,
    #[arg(
        long,
        value_name = "PATH",
        env = "FINEFINDER_RESPONSE_FIFO",
        default_value = DEFAULT_RESPONSE_FIFO,
        help = "Server-to-client named pipe"
    )]
    pub(crate) response_fifo: PathBuf,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Rebuild both index files from the dataset.
    Build {
        #[arg(long, value_name = "N", default_value_t = DEFAULT_TABLE_SIZE)]
        table_size: u64,
    },
    /// Answer search requests until the pipes fail.
    Serve {
        #[command(flatten)]
        fifos: Fifos,
        #[arg(
            long,
            value_name = "N",
            default_value_t = DEFAULT_MAX_RESULTS,
            value_parser = RangedU64ValueParser::<usize>::new().range(1..)
        )]
        max_results: usize,
    },
    /// Send one search to a running server and print the results.
    Query {
        #[arg(long, short)]
        plate: String,
        #[arg(long, short)]
        city: Option<String>,
        #[arg(long, short)]
        year: Option<i32>,
        #[command(flatten)]
        fifos: Fifos,
    },
    /// Print index occupancy.
    Stats,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn build_defaults() {
        let cli = Cli::try_parse_from(["finefinder", "build"]).unwrap();
        assert_eq!(cli.files.dataset, PathBuf::from("dataset.csv"));
        assert_eq!(cli.files.index, PathBuf::from("hash_index.bin"));
        assert_eq!(cli.files.nodes, PathBuf::from("index_nodes.bin"));
        assert!(matches!(
            cli.command,
            Command::Build {
                table_size: DEFAULT_TABLE_SIZE
            }
        ));
    }

    #[test]
    fn global_file_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "finefinder",
            "serve",
            "--dataset",
            "/data/fines.csv",
            "--max-results",
            "10",
            "--request-fifo",
            "/run/req",
        ])
        .unwrap();
        assert_eq!(cli.files.dataset, PathBuf::from("/data/fines.csv"));
        match cli.command {
            Command::Serve { fifos, max_results } => {
                assert_eq!(max_results, 10);
                assert_eq!(fifos.request_fifo, PathBuf::from("/run/req"));
                assert_eq!(fifos.response_fifo, PathBuf::from(DEFAULT_RESPONSE_FIFO));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn query_requires_plate() {
        assert!(Cli::try_parse_from(["finefinder", "query"]).is_err());
        let cli =
            Cli::try_parse_from(["finefinder", "query", "-p", "abc123", "-y", "2015"]).unwrap();
        match cli.command {
            Command::Query {
                plate, city, year, ..
            } => {
                assert_eq!(plate, "abc123");
                assert_eq!(city, None);
                assert_eq!(year, Some(2015));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn max_results_must_be_positive() {
        assert!(Cli::try_parse_from(["finefinder", "serve", "--max-results", "0"]).is_err());
        assert!(Cli::try_parse_from(["finefinder", "serve", "--max-results", "-3"]).is_err());
        let cli = Cli::try_parse_from(["finefinder", "serve", "--max-results", "1"]).unwrap();
        assert!(matches!(cli.command, Command::Serve { max_results: 1, .. }));
        let cli = Cli::try_parse_from(["finefinder", "serve"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Serve {
                max_results: DEFAULT_MAX_RESULTS,
                ..
            }
        ));
    }
}
