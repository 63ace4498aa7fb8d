// Repository walk producing the file snapshot handed to the indexer

use std::path::Path;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::index::CodeFile;

/// Repository-relative path with `/` separators
pub fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Every indexable text file under `root`, sorted by path
///
/// The index directory is never entered. Files that are not valid UTF-8
/// are skipped with a warning.
pub fn discover_files(root: &Path, config: &Config) -> Vec<CodeFile> {
    let index_dir = config.index_dir(root);
    let mut files = Vec::new();
    let mut skipped = 0;

    let walker = WalkDir::new(root)
        .into_iter()
        .filter_entry(|entry| entry.path() != index_dir);

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let Some(path) = relative_path(root, entry.path()) else {
            continue;
        };
        if !config.should_index_file(&path) {
            skipped += 1;
            continue;
        }

        match std::fs::read_to_string(entry.path()) {
            Ok(content) => {
                debug!("Discovered {}", path);
                files.push(CodeFile::new(path, content));
            }
            Err(e) => warn!("Skipping {}: {}", path, e),
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    info!("Discovered {} files ({} filtered out)", files.len(), skipped);
    files
}
