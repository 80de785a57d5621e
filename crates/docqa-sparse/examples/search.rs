use std::env;
use std::path::{Path, PathBuf};

// Query an existing BM25 index and print results.
// Usage:
//   cargo run -p docqa-sparse --example search -- "your query" [--index ../bm25_index] [--limit 10]

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("Usage: cargo run -p docqa-sparse --example search -- <query> [--index DIR] [--limit N]");
        std::process::exit(1);
    }
    let mut query = String::new();
    let mut index_dir: Option<PathBuf> = None;
    let mut limit: usize = 10;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--index" => {
                if i + 1 >= args.len() { eprintln!("--index requires a path"); std::process::exit(2); }
                index_dir = Some(PathBuf::from(&args[i + 1]));
                i += 2; continue;
            }
            "--limit" => {
                if i + 1 >= args.len() { eprintln!("--limit requires a number"); std::process::exit(2); }
                limit = args[i + 1].parse().unwrap_or(limit);
                i += 2; continue;
            }
            s if s.starts_with('-') => {
                eprintln!("Unknown flag: {}", s); std::process::exit(2);
            }
            s => {
                if query.is_empty() { query = s.to_string(); }
                i += 1; continue;
            }
        }
    }

    if query.is_empty() {
        eprintln!("Missing <query> argument");
        std::process::exit(1);
    }

    let index_dir = if let Some(id) = index_dir {
        id
    } else if let Ok(env_path) = env::var("SPARSE_INDEX_DIR") {
        PathBuf::from(env_path)
    } else {
        let base = Path::new(env!("CARGO_MANIFEST_DIR")).ancestors().nth(2).unwrap_or(Path::new("."));
        base.join("bm25_index")
    };

    println!("BM25 search\n===========");
    println!("Index: {}", index_dir.display());
    println!("Query: {} (limit {})\n", query, limit);

    let index = docqa_sparse::SparseIndex::open(index_dir, docqa_sparse::Bm25Params::default())?;
    let hits = index.search(&query, limit)?;
    let positions: Vec<usize> = hits.iter().map(|h| h.0).collect();
    for (rank, ((_, score), doc)) in hits.iter().zip(index.resolve(&positions)?).enumerate() {
        let source = doc.metadata.get("source_file").map(|v| v.to_string()).unwrap_or_default();
        println!("{:>2}. score={:.3} pos={} source={}\n    {}", rank + 1, score, doc.position, source, doc.text);
    }
    Ok(())
}
