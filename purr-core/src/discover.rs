//! Recursive, deterministic enumeration of the documents under an input root.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::contract::{AggregateError, DocumentFailure, FailureKind};

/// Result of walking an input tree.
#[derive(Debug, Default)]
pub struct Discovery {
    /// Matching files in lexical path order.
    pub documents: Vec<PathBuf>,
    /// Subdirectories that could not be listed.
    pub failures: Vec<DocumentFailure>,
}

/// Collect every file under `root` whose name ends with `suffix` (e.g. `".html"`).
///
/// The result is sorted with `Path` ordering, so the same tree always yields
/// the same sequence regardless of the platform's directory listing order.
/// Symlinked directories are not descended into.
pub fn discover(root: &Path, suffix: &str) -> Result<Discovery, AggregateError> {
    if !root.is_dir() {
        warn!(path = %root.display(), "Input directory does not exist");
        return Err(AggregateError::NotFound {
            path: root.to_path_buf(),
        });
    }
    info!(path = %root.display(), suffix, "Scanning input directory");

    fn visit_dir(dir: &Path, suffix: &str, found: &mut Discovery) {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = ?e, path = %dir.display(), "Failed to list directory, skipping");
                found.failures.push(DocumentFailure {
                    path: dir.to_path_buf(),
                    kind: FailureKind::Read,
                    message: e.to_string(),
                });
                return;
            }
        };
        for entry_res in entries {
            let entry = match entry_res {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = ?e, path = %dir.display(), "Failed to read directory entry");
                    found.failures.push(DocumentFailure {
                        path: dir.to_path_buf(),
                        kind: FailureKind::Read,
                        message: e.to_string(),
                    });
                    continue;
                }
            };
            let path = entry.path();
            let is_dir = entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false);
            if is_dir {
                visit_dir(&path, suffix, found);
            } else if path.is_file() {
                let matches = path
                    .file_name()
                    .is_some_and(|n| n.as_encoded_bytes().ends_with(suffix.as_bytes()));
                if matches {
                    debug!(path = %path.display(), "Matched document");
                    found.documents.push(path);
                }
            }
        }
    }

    let mut found = Discovery::default();
    visit_dir(root, suffix, &mut found);
    found.documents.sort();

    info!(
        count = found.documents.len(),
        unreadable = found.failures.len(),
        "Completed scanning input directory"
    );
    Ok(found)
}
