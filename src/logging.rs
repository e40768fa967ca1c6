use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

pub type OutputWriter = Box<dyn Write + Send>;

/// Installs the stderr subscriber. `RUST_LOG` wins over `verbose`.
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn create_file_writer(path: &PathBuf) -> Result<OutputWriter> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open output file: {}", path.display()))?;

    println!("Writing output to: {}", path.display());
    Ok(Box::new(BufWriter::new(file)))
}

pub fn create_output_writer(path: Option<&PathBuf>) -> Result<OutputWriter> {
    match path {
        Some(path) => create_file_writer(path),
        None => Ok(Box::new(BufWriter::new(std::io::stdout()))),
    }
}
