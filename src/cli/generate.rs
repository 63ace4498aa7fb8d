use anyhow::{bail, Context, Result};
use std::path::Path;
use tracing::info;

use super::{print_generation, run_generation, Project};
use repoqa::indexer::chunker::{language_for_extension, UNKNOWN_LANGUAGE};
use repoqa::indexer::discovery::relative_path;
use repoqa::query::FileTask;

/// Explain, test or document one file of the project
pub async fn generate_for_file(task: FileTask, file: String, project: String) -> Result<()> {
    let project = Project::open(&project)?;
    let path = project.root.join(&file);
    if !path.is_file() {
        bail!("File not found: {}", path.display());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let display_path = relative_path(&project.root, &path).unwrap_or(file);
    let language = Path::new(&display_path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(language_for_extension)
        .unwrap_or(UNKNOWN_LANGUAGE);
    info!("Generating {} for {} ({})", task.label(), display_path, language);

    let prompt = task.prompt(&display_path, language, &content);
    let command = project.config.generation.command.clone();
    let (prompt, output) = tokio::task::spawn_blocking(move || -> Result<(String, Option<String>)> {
        let output = run_generation(command.as_deref(), &prompt)?;
        Ok((prompt, output))
    })
    .await??;

    print_generation(output, &prompt);
    Ok(())
}
