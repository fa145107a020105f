use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Files under `dir` (recursively) whose extension is one of `exts`, sorted
/// so rewrites and reports are deterministic. A missing directory yields none.
pub fn content_files(dir: &Path, exts: &[&str]) -> Vec<PathBuf> {
    if !dir.exists() {
        return Vec::new();
    }
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(ent) => Some(ent),
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable entry");
                None
            }
        })
        .filter(|ent| ent.file_type().is_file())
        .filter(|ent| {
            ent.path()
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| exts.contains(&e))
        })
        .map(|ent| ent.into_path())
        .collect();
    files.sort();
    files
}

/// `<dir>/<stem>.md`
pub fn markdown_path(dir: &Path, stem: &str) -> PathBuf {
    dir.join(format!("{stem}.md"))
}
