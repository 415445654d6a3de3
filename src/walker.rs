use crate::file_types::ContentClassifier;
use crate::filter::{GlobList, is_excluded};
use log::debug;
use std::cell::Cell;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// A file that passed every walk-time filter.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub path: PathBuf,
    /// Relative to the walk root.
    pub relative: PathBuf,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WalkStats {
    pub entries_pruned: usize,
    pub files_skipped: usize,
    pub files_accepted: usize,
}

pub struct TreeWalker<'a> {
    pub includes: &'a GlobList,
    pub excludes: &'a GlobList,
    pub classifier: &'a ContentClassifier,
    pub show_hidden: bool,
    /// A directory never entered, e.g. the backup directory during a replace.
    pub skip_dir: Option<&'a Path>,
}

impl TreeWalker<'_> {
    /// Depth-first, pre-order walk. Hidden entries and excluded directories
    /// are cut before descent, so nothing inside them is ever stat'ed or read.
    /// The visitor may stop the walk early with `ControlFlow::Break`.
    pub fn walk<F>(&self, root: &Path, mut visit: F) -> WalkStats
    where
        F: FnMut(Candidate) -> ControlFlow<()>,
    {
        let mut stats = WalkStats::default();
        let pruned = Cell::new(0usize);
        let skip_dir = self
            .skip_dir
            .map(|dir| dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf()));

        let entries = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                let keep = self.keep_entry(root, entry, skip_dir.as_deref());
                if !keep {
                    pruned.set(pruned.get() + 1);
                }
                keep
            });

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Skipping unreadable entry: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = relative_to(root, entry.path());
            if !self.includes.matches_path_or_name(&relative) {
                debug!("Skipping file not matching includes: {}", relative.display());
                stats.files_skipped += 1;
                continue;
            }
            if is_excluded(&relative, self.excludes) {
                debug!("Skipping excluded file: {}", relative.display());
                stats.files_skipped += 1;
                continue;
            }
            if !self.classifier.is_text(entry.path()) {
                debug!("Skipping binary file: {}", relative.display());
                stats.files_skipped += 1;
                continue;
            }

            stats.files_accepted += 1;
            let candidate = Candidate {
                path: entry.into_path(),
                relative,
            };
            if visit(candidate).is_break() {
                break;
            }
        }

        stats.entries_pruned = pruned.get();
        stats
    }

    fn keep_entry(&self, root: &Path, entry: &DirEntry, skip_dir: Option<&Path>) -> bool {
        if entry.depth() == 0 {
            return true;
        }
        if !self.show_hidden && entry.file_name().to_string_lossy().starts_with('.') {
            debug!("Pruning hidden entry: {}", entry.path().display());
            return false;
        }
        // Directories are tested once here; files are tested by the caller.
        if entry.file_type().is_dir() {
            if skip_dir.is_some_and(|skip| entry.path() == skip) {
                debug!("Pruning skipped directory: {}", entry.path().display());
                return false;
            }
            let relative = relative_to(root, entry.path());
            if self.excludes.matches_path_or_name(&relative)
                || self.excludes.matches_path_or_name(entry.path())
            {
                debug!("Pruning excluded directory: {}", relative.display());
                return false;
            }
        }
        true
    }
}

fn relative_to(root: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(root).unwrap_or(path).to_path_buf()
}
