use crate::cli::args::{Cli, Commands};
use crate::cli::logging::init_logging;
use crate::config::AppConfig;
use crate::error::{ProcessingError, Result};
use crate::handler::EventHandler;
use crate::models::StorageEvent;
use crate::processors::{AnomalyScanner, TracingSink};
use crate::readers::CsvTableReader;
use crate::storage::{AnomalyStore, BatchWriter, BucketStore, JsonLinesStore, LocalBucketStore};
use crate::uploader::Uploader;
use crate::utils::progress::ProgressReporter;
use crate::writers::ParquetWriter;
use std::process::ExitCode;
use std::sync::Arc;

pub async fn run(cli: Cli) -> Result<ExitCode> {
    init_logging(cli.verbose, cli.log_file.as_deref())?;

    let config = AppConfig::load(cli.config.as_deref())?;
    let buckets = Arc::new(LocalBucketStore::new(&config.bucket_root));
    let store = Arc::new(JsonLinesStore::new(&config.store_path));

    match cli.command {
        Commands::Setup => {
            if buckets.ensure_bucket(&config.bucket_name).await? {
                println!("Created bucket {}", config.bucket_name);
            } else {
                println!("Bucket {} already exists", config.bucket_name);
            }

            if store.ensure().await? {
                println!("Created anomaly store {}", store.path().display());
            } else {
                println!("Anomaly store {} already exists", store.path().display());
            }
            println!("Setup complete");
        }

        Commands::Upload { file, key } => {
            let progress = ProgressReporter::new_spinner("Filtering and uploading...", cli.verbose);

            let uploader = Uploader::new(buckets, config.bucket_name.clone());
            match uploader.upload_file(&file, key.as_deref()).await {
                Ok(report) => progress.finish_with_message(&report.summary()),
                Err(e) => {
                    progress.abandon();
                    return Err(e);
                }
            }
        }

        Commands::Process { event, key, bucket } => {
            let event = match (event, key) {
                (Some(path), _) => {
                    let json = tokio::fs::read_to_string(&path).await?;
                    StorageEvent::from_notification_json(&json)?
                }
                (None, Some(key)) => {
                    StorageEvent::new(bucket.unwrap_or_else(|| config.bucket_name.clone()), key)
                }
                (None, None) => {
                    return Err(ProcessingError::Config(
                        "either --event or --key is required".to_string(),
                    ))
                }
            };

            let writer = BatchWriter::new(store)
                .with_batch_size(config.batch_size)
                .with_max_retries(config.max_retries)
                .with_backoff(config.retry_backoff());
            let handler = EventHandler::new(buckets, writer);

            let outcome = handler.handle(&event).await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);

            if !outcome.is_success() {
                return Ok(ExitCode::FAILURE);
            }
        }

        Commands::Scan { file, sample } => {
            let table = CsvTableReader::new().read_path(&file)?;
            let source = file.display().to_string();
            let outcome = AnomalyScanner::new().scan(&table, &source, &TracingSink)?;

            println!("{}", outcome.summary.summary());
            for record in outcome.anomalies.iter().take(sample) {
                println!(
                    "  Row {}: {} [{}]",
                    record.row_number().unwrap_or_default(),
                    record.description(),
                    record.location().unwrap_or_default()
                );
            }
            if outcome.anomalies.len() > sample {
                println!("  ... and {} more", outcome.anomalies.len() - sample);
            }
        }

        Commands::Inspect { limit } => {
            let entries = store.scan(Some(limit)).await?;
            if entries.is_empty() {
                println!("No entries found in {}", store.path().display());
            } else {
                println!("Found {} entries in {}:", entries.len(), store.path().display());
                for entry in &entries {
                    println!("{}", serde_json::to_string_pretty(entry)?);
                    println!("{}", "-".repeat(40));
                }
            }
        }

        Commands::Export {
            output_file,
            compression,
            chunk_size,
        } => {
            let entries = store.scan(None).await?;
            if entries.is_empty() {
                println!("No entries to export");
                return Ok(ExitCode::SUCCESS);
            }

            let writer = ParquetWriter::new().with_compression(&compression)?;
            if let Some(parent) = output_file.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let written = writer.write_anomalies(&entries, &output_file, chunk_size)?;
            println!("Exported {} entries to {}", written, output_file.display());
            println!("\n{}", writer.get_file_info(&output_file)?.summary());
        }
    }

    Ok(ExitCode::SUCCESS)
}
