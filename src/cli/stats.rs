use anyhow::Result;
use std::path::Path;

use super::Project;
use repoqa::index::db::MetadataDatabase;
use repoqa::indexer::changes::{FingerprintTable, FINGERPRINTS_FILE};

pub async fn show_stats(project: String, verbose: bool) -> Result<()> {
    let project = Project::open(&project)?;

    println!("repoqa statistics v{}", env!("CARGO_PKG_VERSION"));
    println!("Project: {}", project.root.display());
    println!("Config: {}", project.config_label());

    let metadata_path = project.store.metadata_path();
    if !metadata_path.exists() {
        println!("\nNo index found. Run 'repoqa index' first.");
        return Ok(());
    }

    let db = MetadataDatabase::open(&metadata_path)?;
    let stats = db.get_stats()?;

    println!("\nIndex Statistics:");
    println!("  Total files: {}", stats.total_files);
    println!("  Total chunks: {}", stats.total_chunks);

    let size = file_size_mb(&metadata_path) + file_size_mb(&project.store.vectors_path());
    println!("  Index size: {:.2} MB", size);

    if let Some(info) = db.index_info()? {
        println!("  Dimension: {}", info.dimension);
        println!("  Created: {}", info.created_at);
    }

    if verbose {
        println!("\nDetailed Statistics:");

        let languages = db.languages_breakdown()?;
        if !languages.is_empty() {
            println!("  Languages:");
            for (language, count) in languages {
                println!("    {}: {} files", language, count);
            }
        }

        let fingerprints = FingerprintTable::load(project.store.index_dir().join(FINGERPRINTS_FILE));
        println!("  Tracked fingerprints: {}", fingerprints.len());
    }

    Ok(())
}

fn file_size_mb(path: &Path) -> f64 {
    std::fs::metadata(path)
        .map(|m| m.len() as f64 / (1024.0 * 1024.0))
        .unwrap_or(0.0)
}
