use docqa_core::config::Config;
use docqa_embed::get_default_embedder;

fn main() -> anyhow::Result<()> {
    let settings = Config::load()?.settings()?;
    let embedder = get_default_embedder(&settings.models)?;
    let texts = vec!["The backlot tour starts at gate 2".to_string(), "Sound stage 7 hosts the finale".to_string()];
    let embs = embedder.embed_batch(&texts)?;
    println!("B={} dim={}", embs.len(), embedder.dim());
    let cos: f32 = embs[0].iter().zip(&embs[1]).map(|(a, b)| a * b).sum();
    println!("cosine(0,1)={cos:.4}");
    Ok(())
}
