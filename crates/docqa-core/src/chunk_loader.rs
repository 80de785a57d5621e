//! Reads pre-chunked ingestion output (JSON Lines, one `Chunk` per line).
//!
//! Chunking itself happens upstream; this is only the hand-off point into the
//! index builders.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::Chunk;

/// Load chunks from a `.jsonl` file, or from every `.jsonl` file under a
/// directory (sorted by path so positions are reproducible across rebuilds).
pub fn load_chunks(path: &Path) -> Result<Vec<Chunk>> {
    if !path.exists() {
        return Err(Error::NotFound(format!("chunk source {}", path.display())));
    }
    let files = if path.is_dir() { list_jsonl_files(path) } else { vec![path.to_path_buf()] };
    let mut chunks = Vec::new();
    for file in &files {
        let parsed = parse_jsonl(file)?;
        tracing::debug!(file = %file.display(), count = parsed.len(), "loaded chunks");
        chunks.extend(parsed);
    }
    tracing::info!(files = files.len(), chunks = chunks.len(), "chunk source loaded");
    Ok(chunks)
}

fn parse_jsonl(file: &Path) -> Result<Vec<Chunk>> {
    let content = fs::read_to_string(file)?;
    let mut out = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() { continue; }
        let chunk: Chunk = serde_json::from_str(line)
            .map_err(|e| Error::Operation(format!("{}:{}: {}", file.display(), line_no + 1, e)))?;
        out.push(chunk);
    }
    Ok(out)
}

fn list_jsonl_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("jsonl"))
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();
    files
}

/// Write chunks as JSON Lines; the inverse of [`load_chunks`] for a single file.
pub fn write_chunks(path: &Path, chunks: &[Chunk]) -> Result<()> {
    let mut buf = String::new();
    for c in chunks {
        buf.push_str(&serde_json::to_string(c)?);
        buf.push('\n');
    }
    fs::write(path, buf)?;
    Ok(())
}
