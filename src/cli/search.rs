use anyhow::{bail, Result};
use tracing::info;

use super::{resolve_weight, Project};
use repoqa::index::SearchResult;

pub async fn search_index(
    query: String,
    project: String,
    top_k: Option<usize>,
    weight: Option<f32>,
    mode: String,
    format: String,
) -> Result<()> {
    let project = Project::open(&project)?;
    let k = top_k.unwrap_or(project.config.search.top_k);
    let weight = resolve_weight(weight, project.config.search.semantic_weight)?;
    info!("Searching '{}' (k={}, weight={}, mode={})", query, k, weight, mode);

    let search = project.search();
    let query_for_task = query.clone();
    let results = tokio::task::spawn_blocking(move || -> Result<Vec<SearchResult>> {
        match mode.as_str() {
            "hybrid" => Ok(search.search(&query_for_task, k, weight)?),
            "semantic" => Ok(search.semantic_search(&query_for_task, k)?),
            other => bail!("Unknown search mode: {} (expected hybrid or semantic)", other),
        }
    })
    .await??;

    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&results)?),
        "text" => print_results(&query, &results),
        _ => bail!("Unknown format: {}", format),
    }

    Ok(())
}

fn print_results(query: &str, results: &[SearchResult]) {
    if results.is_empty() {
        println!("No results found for '{}'", query);
        return;
    }

    println!("Found {} results for '{}':\n", results.len(), query);
    for (i, result) in results.iter().enumerate() {
        println!(
            "{}. {}:{}-{} [{}] score {:.3}",
            i + 1,
            result.path,
            result.start_line,
            result.end_line,
            result.metadata.language,
            result.score
        );
        if let (Some(semantic), Some(keyword)) = (result.semantic_score, result.keyword_score) {
            println!("   semantic {:.3}, keyword {:.3}", semantic, keyword);
        }
        for line in result.content.lines().take(3) {
            println!("   | {}", line);
        }
        println!();
    }
}
