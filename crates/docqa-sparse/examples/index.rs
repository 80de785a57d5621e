use std::env;
use std::path::{Path, PathBuf};

// Rebuild the BM25 index from pre-chunked JSON Lines without touching other crates.
// Usage:
//   cargo run -p docqa-sparse --example index -- [--chunks ../data/chunks.jsonl] [--index ../bm25_index]
// Notes:
//   - The previous index is replaced as a whole once the new one is persisted.
//   - Defaults resolve relative to the workspace root so you can run from anywhere.

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let mut chunks_path: Option<PathBuf> = None;
    let mut index_dir: Option<PathBuf> = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--chunks" => {
                if i + 1 >= args.len() { eprintln!("--chunks requires a path"); std::process::exit(2); }
                chunks_path = Some(PathBuf::from(&args[i + 1]));
                i += 2; continue;
            }
            "--index" => {
                if i + 1 >= args.len() { eprintln!("--index requires a path"); std::process::exit(2); }
                index_dir = Some(PathBuf::from(&args[i + 1]));
                i += 2; continue;
            }
            s if s.starts_with('-') => {
                eprintln!("Unknown flag: {}", s); std::process::exit(2);
            }
            _ => { i += 1; }
        }
    }

    let ws_root = Path::new(env!("CARGO_MANIFEST_DIR")).ancestors().nth(2).unwrap_or(Path::new("."));

    // Resolve paths with precedence: flag > env var > workspace defaults
    let chunks_path = chunks_path
        .or_else(|| env::var("CHUNKS_FILE").ok().map(PathBuf::from))
        .unwrap_or_else(|| ws_root.join("data/chunks.jsonl"));
    let index_dir = index_dir
        .or_else(|| env::var("SPARSE_INDEX_DIR").ok().map(PathBuf::from))
        .unwrap_or_else(|| ws_root.join("bm25_index"));

    println!("BM25 re-index\n=============");
    println!("Chunks   : {}", chunks_path.display());
    println!("Index dir: {}", index_dir.display());

    let chunks = docqa_core::chunk_loader::load_chunks(&chunks_path)?;
    let index = docqa_sparse::SparseIndex::open(index_dir, docqa_sparse::Bm25Params::default())?;
    index.build(&chunks)?;
    println!("Done. Indexed {} chunks.", index.len());
    Ok(())
}
