//! Salina CLI
//!
//! Operational tooling around the library: chunking large artifacts for
//! size-limited hosting, reassembling them, and encoding submission masks.
//!
//! # Usage
//!
//! ```bash
//! # Split a checkpoint into 40 MB chunks
//! salina split model.ckp saltnet --out-dir ./chunks
//!
//! # Reassemble chunks
//! salina join saltnet model.ckp --dir ./chunks --delete-chunks
//!
//! # Run-length encode a CSV mask
//! salina rle mask.csv
//! ```

use clap::{Parser, Subcommand};
use ndarray::Array2;
use salina::checkpoint::{join_chunks_to_file, split_to_chunks, DEFAULT_CHUNK_SIZE};
use salina::rle::rle_encode_mask;
use salina::{Error, Result};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "salina", about = "Checkpoint chunk tools and submission encoding")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Split a file into bounded-size chunks
    Split {
        /// File to split
        input: PathBuf,
        /// Chunk name prefix
        prefix: String,
        /// Directory receiving the chunks
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
        /// Per-chunk size ceiling in bytes
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
    },
    /// Reassemble chunks into a file
    Join {
        /// Chunk name prefix
        prefix: String,
        /// Output file
        output: PathBuf,
        /// Directory holding the chunks
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        /// Remove chunk files after reassembly
        #[arg(long)]
        delete_chunks: bool,
    },
    /// Run-length encode a mask stored as CSV rows of pixel values
    Rle {
        /// CSV file, one mask row per line
        input: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Split {
            input,
            prefix,
            out_dir,
            chunk_size,
        } => {
            let data = std::fs::read(&input)?;
            let names = split_to_chunks(&data, &prefix, &out_dir, chunk_size)?;
            println!("Wrote {} chunk(s) to {}", names.len(), out_dir.display());
            for name in names {
                println!("  {name}");
            }
            Ok(())
        }
        Command::Join {
            prefix,
            output,
            dir,
            delete_chunks,
        } => {
            join_chunks_to_file(&prefix, &dir, &output, delete_chunks)?;
            println!("File parts merged to {}", output.display());
            Ok(())
        }
        Command::Rle { input } => {
            let mask = read_mask_csv(&input)?;
            println!("{}", rle_encode_mask(mask.view()));
            Ok(())
        }
    }
}

fn read_mask_csv(path: &std::path::Path) -> Result<Array2<f32>> {
    let content = std::fs::read_to_string(path)?;
    let mut rows: Vec<Vec<f32>> = Vec::new();
    for (lineno, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let row: std::result::Result<Vec<f32>, _> =
            line.split(',').map(|cell| cell.trim().parse::<f32>()).collect();
        rows.push(row.map_err(|e| {
            Error::Serialization(format!("mask csv line {}: {e}", lineno + 1))
        })?);
    }

    let height = rows.len();
    let width = rows.first().map(Vec::len).unwrap_or(0);
    if rows.iter().any(|r| r.len() != width) {
        return Err(Error::Serialization("mask csv rows differ in length".into()));
    }
    Array2::from_shape_vec((height, width), rows.into_iter().flatten().collect())
        .map_err(|e| Error::Serialization(format!("mask csv: {e}")))
}
