use std::env;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use docqa_core::chunk_loader::load_chunks;
use docqa_core::config::{expand_path, Config, Settings};
use docqa_core::traits::{DenseIndexer, Embedder};
use docqa_core::types::Candidate;
use docqa_embed::{get_default_embedder, get_default_reranker};
use docqa_hybrid::{format_context, ConversationMemory, QueryEnhancer, Retriever, RetrieveOptions};
use docqa_sparse::SparseIndex;

#[cfg(feature = "lance")]
type DenseStore = docqa_vector::LanceDenseStore;
#[cfg(not(feature = "lance"))]
type DenseStore = docqa_vector::MemoryDenseStore;

const EMBED_BATCH: usize = 32;

fn usage(prog: &str) -> ! {
    eprintln!("Usage: {prog} <ingest|query|chat|status|clear> [args...]");
    eprintln!("  ingest <chunks.jsonl|dir>");
    eprintln!("  query \"<q>\" [--top-n N] [--alpha A] [--threshold T] [--no-rerank] [--dense-only] [--enhance]");
    std::process::exit(1)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

fn open_dense(settings: &Settings) -> anyhow::Result<Arc<DenseStore>> {
    let dir = expand_path(&settings.data.lancedb_dir);
    #[cfg(feature = "lance")]
    let store = DenseStore::open(&dir, &settings.data.table_name)?;
    #[cfg(not(feature = "lance"))]
    let store = DenseStore::open(&dir)?;
    Ok(Arc::new(store))
}

fn open_sparse(settings: &Settings) -> anyhow::Result<Arc<SparseIndex>> {
    Ok(Arc::new(SparseIndex::open(expand_path(&settings.data.sparse_index_dir), settings.sparse.into())?))
}

#[derive(Debug, Default)]
struct QueryFlags { no_rerank: bool, dense_only: bool, enhance: bool }

fn parse_query_args(args: &[String], opts: &mut RetrieveOptions) -> anyhow::Result<(String, QueryFlags)> {
    let mut flags = QueryFlags::default();
    let mut words = Vec::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--top-n" => { i += 1; opts.final_top_n = args.get(i).context("--top-n requires a number")?.parse().context("--top-n requires a number")?; }
            "--alpha" => { i += 1; opts.hybrid_alpha = args.get(i).context("--alpha requires a number")?.parse().context("--alpha requires a number")?; }
            "--threshold" => { i += 1; opts.similarity_threshold = args.get(i).context("--threshold requires a number")?.parse().context("--threshold requires a number")?; }
            "--no-rerank" => flags.no_rerank = true,
            "--dense-only" => flags.dense_only = true,
            "--enhance" => flags.enhance = true,
            other if other.starts_with("--") => anyhow::bail!("unknown flag {other}"),
            other => words.push(other.to_string()),
        }
        i += 1;
    }
    if words.is_empty() { anyhow::bail!("query text is required"); }
    Ok((words.join(" "), flags))
}

fn build_retriever(settings: &Settings, flags: &QueryFlags) -> anyhow::Result<Retriever> {
    let embedder: Arc<dyn Embedder> = Arc::from(get_default_embedder(&settings.models)?);
    let dense = open_dense(settings)?;
    let use_hybrid = settings.retrieval.use_hybrid_search && !flags.dense_only;
    let use_rerank = settings.retrieval.use_reranking && !flags.no_rerank;
    let mut retriever = Retriever::new(embedder, dense).hybrid_search(use_hybrid).reranking(use_rerank);
    if use_hybrid { retriever = retriever.with_sparse(open_sparse(settings)?); }
    if use_rerank { retriever = retriever.with_reranker(Arc::from(get_default_reranker(&settings.models)?)); }
    Ok(retriever)
}

fn print_results(results: &[Candidate]) {
    if results.is_empty() { println!("No results."); return; }
    for (i, c) in results.iter().enumerate() {
        let fmt = |v: Option<f32>| v.map_or_else(|| "-".to_string(), |s| format!("{s:.4}"));
        println!(
            "{:>2}. [{}] {} p.{}  sim={} bm25={} fused={} rerank={}",
            i + 1,
            c.retrieval_method,
            c.meta_or_unknown("source_file"),
            c.meta_or_unknown("page_num"),
            fmt(c.similarity),
            fmt(c.bm25_score),
            fmt(c.fusion_score),
            fmt(c.rerank_score),
        );
        let preview: String = c.text.chars().take(160).collect();
        println!("    {}", preview.replace('\n', " "));
    }
}

fn cmd_ingest(settings: &Settings, args: &[String]) -> anyhow::Result<()> {
    let source = args.first().map(PathBuf::from).unwrap_or_else(|| expand_path(&settings.data.chunks_file));
    println!("Ingesting chunks from {}", source.display());
    let chunks = load_chunks(&source)?;
    if chunks.is_empty() { anyhow::bail!("no chunks found in {}", source.display()); }

    let embedder = get_default_embedder(&settings.models)?;
    let pb = ProgressBar::new(chunks.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")?
            .progress_chars("#>-"),
    );
    let mut embeddings = Vec::with_capacity(chunks.len());
    for batch in chunks.chunks(EMBED_BATCH) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        embeddings.extend(embedder.embed_batch(&texts)?);
        pb.inc(batch.len() as u64);
    }
    pb.finish_with_message("embedded");

    open_dense(settings)?.index(&chunks, &embeddings)?;
    println!("📦 Dense store: {} chunks", chunks.len());
    open_sparse(settings)?.build(&chunks)?;
    println!("📦 BM25 index: {} chunks", chunks.len());
    println!("✅ Ingest complete");
    Ok(())
}

fn cmd_query(settings: &Settings, args: &[String]) -> anyhow::Result<()> {
    let mut opts = RetrieveOptions::from(&settings.retrieval);
    let (query, flags) = parse_query_args(args, &mut opts)?;
    let retriever = build_retriever(settings, &flags)?;
    let query = if flags.enhance || settings.retrieval.use_query_enhancement {
        let enhanced = QueryEnhancer::new().enhance(&query);
        if enhanced != query { println!("🔎 Enhanced query: {enhanced}"); }
        enhanced
    } else {
        query
    };
    let results = retriever.retrieve(&query, &opts)?;
    print_results(&results);
    Ok(())
}

fn cmd_chat(settings: &Settings) -> anyhow::Result<()> {
    let retriever = build_retriever(settings, &QueryFlags::default())?;
    let opts = RetrieveOptions::from(&settings.retrieval);
    let enhancer = QueryEnhancer::new();
    let mut memory = ConversationMemory::new(settings.memory.max_turns);
    println!("💬 docqa chat. Type 'clear' to reset memory, 'exit' to quit.");
    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 { break; }
        let input = line.trim();
        match input {
            "" => continue,
            "exit" | "quit" => break,
            "clear" => { memory.clear(); println!("🧹 Memory cleared"); continue; }
            _ => {}
        }
        let query = if settings.retrieval.use_query_enhancement { enhancer.enhance(input) } else { input.to_string() };
        match retriever.retrieve_with_context(&query, &memory.user_turns(), &opts) {
            Ok(results) => {
                println!("{}", format_context(&results));
                memory.add_user(input);
                memory.add_assistant(match results.first() {
                    Some(top) => format!("Found {} passages, top source {}", results.len(), top.meta_or_unknown("source_file")),
                    None => "No relevant context found.".to_string(),
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "retrieval failed");
                println!("⚠️  Retrieval is unavailable right now ({e}). Try again or run `docqa status`.");
            }
        }
    }
    let summary = memory.summary();
    println!("👋 {} messages, {} turns", summary.total_messages, summary.turns);
    Ok(())
}

fn cmd_status(settings: &Settings) -> anyhow::Result<()> {
    let dense = open_dense(settings)?;
    let sparse = open_sparse(settings)?;
    let p = sparse.params();
    println!("Dense store:  {} rows ({})", dense.count()?, Path::new(&settings.data.lancedb_dir).display());
    println!("BM25 index:   {} documents ({})", sparse.len(), sparse.index_path().display());
    println!("BM25 params:  k1={} b={} epsilon={}", p.k1, p.b, p.epsilon);
    let r = &settings.retrieval;
    println!(
        "Retrieval:    top_k={} top_n={} threshold={} alpha={} hybrid={} rerank={} enhance={}",
        r.initial_top_k, r.final_top_n, r.similarity_threshold, r.hybrid_alpha, r.use_hybrid_search, r.use_reranking, r.use_query_enhancement
    );
    Ok(())
}

fn cmd_clear(settings: &Settings) -> anyhow::Result<()> {
    open_dense(settings)?.clear()?;
    open_sparse(settings)?.clear()?;
    println!("🧹 Cleared dense store and BM25 index");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let settings = config.settings()?;
    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);
    if args.is_empty() { usage(&prog); }
    let cmd = args.remove(0);
    match cmd.as_str() {
        "ingest" => cmd_ingest(&settings, &args),
        "query" => cmd_query(&settings, &args),
        "chat" => cmd_chat(&settings),
        "status" => cmd_status(&settings),
        "clear" => cmd_clear(&settings),
        _ => { eprintln!("Unknown command: {}", cmd); usage(&prog) }
    }
}
