use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use tracing::info;

use super::Project;
use repoqa::index::db::MetadataDatabase;
use repoqa::indexer::discovery::discover_files;
use repoqa::indexer::watcher::FileWatcher;
use repoqa::indexer::{SyncOutcome, UpdateOutcome};

pub async fn index_project(project: String, watch: bool, rebuild: bool) -> Result<()> {
    info!("Indexing project: {}", project);
    let project = Project::open(&project)?;

    println!("repoqa indexer v{}", env!("CARGO_PKG_VERSION"));
    println!("Project: {}", project.root.display());
    println!("Config: {}", project.config_label());
    println!("Index: {}", project.store.index_dir().display());
    println!("Rebuild: {}", rebuild);

    println!("\nScanning project files...");
    let files = discover_files(&project.root, &project.config);
    println!("Found {} files", files.len());

    let indexer = Arc::new(project.indexer()?);
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{msg:30} [{bar:40}] {pos}%")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let task_indexer = Arc::clone(&indexer);
    let task_bar = bar.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        if rebuild {
            task_indexer
                .rebuild(&files, &task_bar)
                .map(|total_chunks| SyncOutcome::Rebuilt { total_chunks })
        } else {
            task_indexer.sync(&files, &task_bar)
        }
    })
    .await??;
    bar.finish_and_clear();

    match outcome {
        SyncOutcome::Rebuilt { total_chunks } => {
            println!("\nFull rebuild complete: {} chunks", total_chunks);
        }
        SyncOutcome::Incremental(UpdateOutcome::Updated {
            added_chunks,
            removed_chunks,
            total_chunks,
        }) => {
            println!(
                "\nIncremental update complete: +{} / -{} chunks ({} total)",
                added_chunks, removed_chunks, total_chunks
            );
        }
        SyncOutcome::Incremental(_) => println!("\nIndex is up to date"),
    }

    let stats = MetadataDatabase::open(project.store.metadata_path())?.get_stats()?;
    println!("Total files: {}", stats.total_files);
    println!("Total chunks: {}", stats.total_chunks);

    if watch {
        println!("\nStarting file watcher...");
        println!("Monitoring for file changes. Press Ctrl+C to stop.");

        let watcher = FileWatcher::new(indexer, project.root.clone(), project.config.clone());
        watcher.watch().await?;
    } else {
        println!("\nRun with --watch to monitor for changes.");
    }

    Ok(())
}
