use clap::Parser;
use climate_anomaly::cli::{run, Cli};
use climate_anomaly::error::Result;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    run(cli).await
}
