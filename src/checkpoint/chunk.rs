//! Bounded-size chunk codec
//!
//! Splits an arbitrary byte stream into consecutive chunks of at most
//! `chunk_size` bytes so individual persisted artifacts stay under an
//! external size ceiling, and reassembles them by concatenation in index
//! order. The codec knows nothing about what the bytes mean.
//!
//! Chunk files are named `{prefix}-chunk-{i}-Of-{n}` with 1-based `i`;
//! `n` is recoverable from any one filename, so joining needs no external
//! metadata.

use crate::{Error, Result};
use std::fs;
use std::path::Path;

/// Deterministic chunk file name
pub fn chunk_name(prefix: &str, index: usize, total: usize) -> String {
    format!("{prefix}-chunk-{index}-Of-{total}")
}

/// Split `data` into chunk files under `dir`, returning the names written.
///
/// The final chunk may be shorter than `chunk_size`. A zero-byte stream
/// yields zero chunks; an exact multiple of `chunk_size` yields exactly
/// `len / chunk_size` chunks, never a trailing empty one.
pub fn split_to_chunks(
    data: &[u8],
    prefix: &str,
    dir: &Path,
    chunk_size: usize,
) -> Result<Vec<String>> {
    if chunk_size == 0 {
        return Err(Error::ConfigError("chunk_size must be positive".into()));
    }
    if data.is_empty() {
        return Ok(Vec::new());
    }

    let mut total = data.len() / chunk_size;
    if data.len() % chunk_size != 0 {
        total += 1;
    }

    let mut names = Vec::with_capacity(total);
    for (i, block) in data.chunks(chunk_size).enumerate() {
        let name = chunk_name(prefix, i + 1, total);
        fs::write(dir.join(&name), block)?;
        names.push(name);
    }
    Ok(names)
}

/// Reassemble the payload for `prefix` from chunk files in `dir`.
///
/// The total chunk count is parsed from the first matching filename;
/// chunks are then read strictly in ascending index order. With
/// `delete_chunks` each source file is removed after a successful read.
pub fn join_chunks(prefix: &str, dir: &Path, delete_chunks: bool) -> Result<Vec<u8>> {
    let total = discover_total(prefix, dir)?;

    let mut out = Vec::new();
    for i in 1..=total {
        let path = dir.join(chunk_name(prefix, i, total));
        let block = fs::read(&path)?;
        out.extend_from_slice(&block);
        if delete_chunks {
            fs::remove_file(&path)?;
        }
    }
    Ok(out)
}

/// [`join_chunks`] variant writing the payload to `output`.
pub fn join_chunks_to_file(
    prefix: &str,
    dir: &Path,
    output: &Path,
    delete_chunks: bool,
) -> Result<()> {
    let data = join_chunks(prefix, dir, delete_chunks)?;
    fs::write(output, data)?;
    Ok(())
}

/// Total chunk count embedded in the first filename matching `prefix`.
fn discover_total(prefix: &str, dir: &Path) -> Result<usize> {
    let marker = format!("{prefix}-chunk-");
    for entry in fs::read_dir(dir)? {
        let name = entry?.file_name().to_string_lossy().into_owned();
        if name.starts_with(&marker) {
            let total = name.rsplit('-').next().and_then(|s| s.parse::<usize>().ok());
            return match total {
                Some(n) => Ok(n),
                None => Err(Error::MalformedChunkName(name)),
            };
        }
    }
    Err(Error::ChunkNotFound {
        prefix: prefix.to_string(),
        dir: dir.to_path_buf(),
    })
}
