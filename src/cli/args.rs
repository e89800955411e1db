use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "climate-anomaly")]
#[command(about = "Flags implausible temperature readings in climate observation CSV files")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        help = "Configuration file [default: climate-anomaly.toml if present]"
    )]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the upload bucket and the anomaly store if they are missing
    Setup,

    /// Filter a CSV file to Wisconsin rows and upload it
    Upload {
        #[arg(help = "Local CSV file")]
        file: PathBuf,

        #[arg(short, long, help = "Object key [default: file name]")]
        key: Option<String>,
    },

    /// Scan an uploaded object and persist its anomalies
    Process {
        #[arg(
            short,
            long,
            conflicts_with_all = ["key", "bucket"],
            help = "Bucket notification JSON file"
        )]
        event: Option<PathBuf>,

        #[arg(short, long, help = "Object key to scan")]
        key: Option<String>,

        #[arg(short, long, help = "Bucket name [default: from configuration]")]
        bucket: Option<String>,
    },

    /// Scan a local CSV file without persisting anything
    Scan {
        #[arg(help = "Local CSV file")]
        file: PathBuf,

        #[arg(short, long, default_value = "10", help = "Anomalies to print")]
        sample: usize,
    },

    /// Display stored anomaly entries
    Inspect {
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Export stored anomaly entries to a Parquet file
    Export {
        #[arg(short, long, help = "Output Parquet file path")]
        output_file: PathBuf,

        #[arg(short, long, default_value = "snappy")]
        compression: String,

        #[arg(long, default_value = "1000")]
        chunk_size: usize,
    },
}
