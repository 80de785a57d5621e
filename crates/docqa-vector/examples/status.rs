use docqa_core::config::Config;
use docqa_core::traits::DenseIndexer;

fn main() -> anyhow::Result<()> {
    let settings = Config::load()?.settings()?;
    #[cfg(feature = "lance")]
    let store = docqa_vector::LanceDenseStore::open(std::path::Path::new(&settings.data.lancedb_dir), &settings.data.table_name)?;
    #[cfg(not(feature = "lance"))]
    let store = docqa_vector::MemoryDenseStore::open(&settings.data.lancedb_dir)?;
    println!("dense rows: {}", store.count()?);
    Ok(())
}
