use anyhow::Result;
use tracing::info;

use super::{print_generation, resolve_weight, run_generation, Project};
use repoqa::query::build_prompt;

pub async fn ask_question(
    question: String,
    project: String,
    top_k: Option<usize>,
    weight: Option<f32>,
) -> Result<()> {
    let project = Project::open(&project)?;
    let k = top_k.unwrap_or(project.config.search.top_k);
    let weight = resolve_weight(weight, project.config.search.semantic_weight)?;
    let command = project.config.generation.command.clone();
    info!("Answering '{}' from {} context chunks", question, k);

    let search = project.search();
    let (prompt, answer) = tokio::task::spawn_blocking(move || -> Result<(String, Option<String>)> {
        let context = search.search(&question, k, weight)?;
        let prompt = build_prompt(&question, &context);
        let answer = run_generation(command.as_deref(), &prompt)?;
        Ok((prompt, answer))
    })
    .await??;

    print_generation(answer, &prompt);
    Ok(())
}
