use crate::context::ToolContext;
use crate::error::Result;
use crate::filter::{GlobList, resolve_excludes, resolve_includes};
use crate::history::EditAction;
use crate::paths::resolve_root;
use crate::pattern::{PatternOptions, compile};
use crate::search::{default_file_types, default_path};
use crate::walker::{Candidate, TreeWalker};
use log::{info, warn};
use regex::{NoExpand, Regex};
use serde::Deserialize;
use serde_json::{Map, json};
use std::borrow::Cow;
use std::fmt::Write as _;
use std::fs;
use std::ops::ControlFlow;
use std::path::PathBuf;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplaceParams {
    pub term: String,
    pub replacement: String,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default)]
    pub whole_word: bool,
    #[serde(default)]
    pub use_regex: bool,
    #[serde(default)]
    pub include: Option<String>,
    #[serde(default)]
    pub exclude: Option<String>,
    #[serde(default = "default_file_types")]
    pub file_types: String,
    #[serde(default = "default_true")]
    pub dry_run: bool,
    #[serde(default = "default_true")]
    pub backup: bool,
    #[serde(default)]
    pub show_hidden: bool,
}

impl ReplaceParams {
    pub fn new(
        term: impl Into<String>,
        replacement: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            term: term.into(),
            replacement: replacement.into(),
            path: path.into(),
            case_sensitive: false,
            whole_word: false,
            use_regex: false,
            include: None,
            exclude: None,
            file_types: default_file_types(),
            dry_run: true,
            backup: true,
            show_hidden: false,
        }
    }
}

/// Per-file result. Exactly one of success data or an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeOutcome {
    Replaced {
        count: usize,
        original_size: usize,
        new_size: usize,
        backup: Option<PathBuf>,
        /// False in dry-run mode and when the content came out unchanged.
        written: bool,
    },
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct ReplaceChange {
    pub file: PathBuf,
    pub outcome: ChangeOutcome,
}

#[derive(Debug)]
pub struct ReplaceOutcome {
    pub root: PathBuf,
    pub dry_run: bool,
    pub files_examined: usize,
    pub changes: Vec<ReplaceChange>,
}

impl ReplaceOutcome {
    pub fn total_replacements(&self) -> usize {
        self.changes
            .iter()
            .map(|c| match c.outcome {
                ChangeOutcome::Replaced { count, .. } => count,
                ChangeOutcome::Failed(_) => 0,
            })
            .sum()
    }

    pub fn errors(&self) -> impl Iterator<Item = (&PathBuf, &str)> {
        self.changes.iter().filter_map(|c| match &c.outcome {
            ChangeOutcome::Failed(e) => Some((&c.file, e.as_str())),
            ChangeOutcome::Replaced { .. } => None,
        })
    }
}

/// Same pipeline as search. Each file is independent: a failure on one is
/// recorded and the walk continues.
pub fn replace(ctx: &ToolContext, params: &ReplaceParams) -> Result<ReplaceOutcome> {
    let pattern = compile(
        &params.term,
        PatternOptions {
            use_regex: params.use_regex,
            whole_word: params.whole_word,
            case_sensitive: params.case_sensitive,
            multi_line: true,
        },
    )?;
    let root = resolve_root(&params.path)?;
    let includes = GlobList::new(&resolve_includes(
        params.include.as_deref(),
        &params.file_types,
    ))?;
    let excludes = GlobList::new(&resolve_excludes(params.exclude.as_deref()))?;

    let walker = TreeWalker {
        includes: &includes,
        excludes: &excludes,
        classifier: &ctx.classifier,
        show_hidden: params.show_hidden,
        // Backups written during this walk must not be rewritten by it.
        skip_dir: Some(ctx.backups.directory()),
    };

    let mut files_examined = 0;
    let mut changes = Vec::new();
    walker.walk(&root, |candidate| {
        files_examined += 1;
        if let Some(outcome) = replace_in_file(ctx, &candidate, &pattern, params) {
            if let ChangeOutcome::Failed(e) = &outcome {
                warn!("Replace failed for {}: {e}", candidate.relative.display());
            }
            changes.push(ReplaceChange {
                file: candidate.relative,
                outcome,
            });
        }
        ControlFlow::Continue(())
    });

    let outcome = ReplaceOutcome {
        root,
        dry_run: params.dry_run,
        files_examined,
        changes,
    };
    info!(
        "Replace '{}' in {} ({}): {} replacements in {} files, {} errors",
        params.term,
        outcome.root.display(),
        if params.dry_run { "dry run" } else { "applied" },
        outcome.total_replacements(),
        outcome.changes.len(),
        outcome.errors().count()
    );
    Ok(outcome)
}

/// `None` when the file has no occurrence.
fn replace_in_file(
    ctx: &ToolContext,
    candidate: &Candidate,
    pattern: &Regex,
    params: &ReplaceParams,
) -> Option<ChangeOutcome> {
    let bytes = match fs::read(&candidate.path) {
        Ok(bytes) => bytes,
        Err(e) => return Some(ChangeOutcome::Failed(format!("read failed: {e}"))),
    };
    // Lossy decoding would corrupt the rewrite, so only UTF-8 is accepted.
    let original = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            if pattern.is_match(&String::from_utf8_lossy(e.as_bytes())) {
                return Some(ChangeOutcome::Failed(
                    "file is not valid UTF-8, left untouched".to_string(),
                ));
            }
            return None;
        }
    };

    let count = pattern.find_iter(&original).count();
    if count == 0 {
        return None;
    }

    let updated: Cow<'_, str> = if params.use_regex {
        pattern.replace_all(&original, params.replacement.as_str())
    } else {
        pattern.replace_all(&original, NoExpand(&params.replacement))
    };
    let original_size = original.len();
    let new_size = updated.len();

    if params.dry_run || updated == original {
        return Some(ChangeOutcome::Replaced {
            count,
            original_size,
            new_size,
            backup: None,
            written: false,
        });
    }

    let backup = if params.backup {
        let backup = ctx.backups.backup(&candidate.path);
        if backup.is_none() {
            warn!("No backup was made for {}", candidate.path.display());
        }
        backup
    } else {
        None
    };

    if let Err(e) = fs::write(&candidate.path, updated.as_bytes()) {
        return Some(ChangeOutcome::Failed(format!("write failed: {e}")));
    }

    let mut details = Map::new();
    details.insert("term".to_string(), json!(params.term));
    details.insert("replacement".to_string(), json!(params.replacement));
    details.insert("count".to_string(), json!(count));
    details.insert(
        "backup".to_string(),
        json!(backup.as_ref().map(|b| b.display().to_string())),
    );
    ctx.record_edit(EditAction::Replace, candidate.path.clone(), details);

    Some(ChangeOutcome::Replaced {
        count,
        original_size,
        new_size,
        backup,
        written: true,
    })
}

pub fn run_replace(ctx: &ToolContext, params: &ReplaceParams) -> Result<String> {
    let outcome = replace(ctx, params)?;
    Ok(format_report(
        &outcome,
        params,
        ctx.config.replace.max_files_shown,
    ))
}

pub fn format_report(outcome: &ReplaceOutcome, params: &ReplaceParams, max_files_shown: usize) -> String {
    let mut out = String::new();
    let changed: Vec<&ReplaceChange> = outcome
        .changes
        .iter()
        .filter(|c| matches!(c.outcome, ChangeOutcome::Replaced { .. }))
        .collect();

    if outcome.dry_run {
        let _ = writeln!(out, "DRY RUN - no files were modified");
    }
    let _ = writeln!(
        out,
        "Replace '{}' with '{}' in '{}'",
        params.term,
        params.replacement,
        outcome.root.display()
    );

    if outcome.changes.is_empty() {
        let _ = write!(
            out,
            "No occurrences found ({} files searched)",
            outcome.files_examined
        );
        return out;
    }

    let verb = if outcome.dry_run { "Would make" } else { "Made" };
    let _ = writeln!(
        out,
        "{} {} replacements in {} files ({} files searched)",
        verb,
        outcome.total_replacements(),
        changed.len(),
        outcome.files_examined
    );

    if !changed.is_empty() {
        let _ = writeln!(out);
    }
    for change in changed.iter().take(max_files_shown) {
        if let ChangeOutcome::Replaced {
            count,
            original_size,
            new_size,
            backup,
            written,
        } = &change.outcome
        {
            let _ = write!(
                out,
                "  {}: {} replacements ({} -> {} bytes)",
                change.file.display(),
                count,
                original_size,
                new_size
            );
            if !outcome.dry_run && !written {
                let _ = write!(out, " [content unchanged, not rewritten]");
            }
            if let Some(backup) = backup {
                let _ = write!(out, " [backup: {}]", backup.display());
            } else if !outcome.dry_run && *written && params.backup {
                let _ = write!(out, " [no backup was made]");
            }
            let _ = writeln!(out);
        }
    }
    if changed.len() > max_files_shown {
        let _ = writeln!(out, "  ... and {} more files", changed.len() - max_files_shown);
    }

    let errors: Vec<_> = outcome.errors().collect();
    if !errors.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Errors ({}):", errors.len());
        for (file, error) in errors {
            let _ = writeln!(out, "  {}: {}", file.display(), error);
        }
    }

    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::path::Path;
    use tempfile::{TempDir, tempdir};

    fn context(backups: &Path) -> ToolContext {
        let mut config = Config::default();
        config.backup.directory = Some(backups.to_path_buf());
        ToolContext::new(config)
    }

    fn fixture() -> TempDir {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("tree")).unwrap();
        fs::write(dir.path().join("tree/a.py"), "old = 1\nold()\n").unwrap();
        fs::write(dir.path().join("tree/b.txt"), "nothing\n").unwrap();
        dir
    }

    #[test]
    fn test_dry_run_counts_without_writing() {
        let dir = fixture();
        let ctx = context(&dir.path().join("backups"));
        let p = ReplaceParams::new("old", "newer", dir.path().join("tree").to_string_lossy());

        let outcome = replace(&ctx, &p).unwrap();
        assert_eq!(outcome.changes.len(), 1);
        assert_eq!(
            outcome.changes[0].outcome,
            ChangeOutcome::Replaced {
                count: 2,
                original_size: 14,
                new_size: 18,
                backup: None,
                written: false,
            }
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("tree/a.py")).unwrap(),
            "old = 1\nold()\n"
        );
        assert!(ctx.history().is_empty());
        assert!(!dir.path().join("backups").exists());
    }

    #[test]
    fn test_apply_backs_up_and_records_history() {
        let dir = fixture();
        let ctx = context(&dir.path().join("backups"));
        let mut p = ReplaceParams::new("old", "newer", dir.path().join("tree").to_string_lossy());
        p.dry_run = false;

        let outcome = replace(&ctx, &p).unwrap();
        let ChangeOutcome::Replaced { backup, written, .. } = &outcome.changes[0].outcome else {
            panic!("expected a replacement");
        };
        assert!(written);
        let backup = backup.as_ref().unwrap();
        assert_eq!(fs::read_to_string(backup).unwrap(), "old = 1\nold()\n");
        assert_eq!(
            fs::read_to_string(dir.path().join("tree/a.py")).unwrap(),
            "newer = 1\nnewer()\n"
        );

        let history = ctx.history().recent(10);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].action, EditAction::Replace);
        assert_eq!(history[0].details["count"], json!(2));
    }

    #[test]
    fn test_literal_replacement_is_not_expanded() {
        let dir = fixture();
        let ctx = context(&dir.path().join("backups"));
        let mut p = ReplaceParams::new("old", "$1", dir.path().join("tree").to_string_lossy());
        p.dry_run = false;
        p.backup = false;
        replace(&ctx, &p).unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("tree/a.py")).unwrap(),
            "$1 = 1\n$1()\n"
        );
    }

    #[test]
    fn test_regex_groups_expand() {
        let dir = fixture();
        let ctx = context(&dir.path().join("backups"));
        let mut p = ReplaceParams::new(
            r"(\w+) = (\d)",
            "$2 = $1",
            dir.path().join("tree").to_string_lossy(),
        );
        p.use_regex = true;
        p.dry_run = false;
        p.backup = false;
        replace(&ctx, &p).unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("tree/a.py")).unwrap(),
            "1 = old\nold()\n"
        );
    }

    #[test]
    fn test_undecodable_file_is_a_per_file_error() {
        let dir = fixture();
        fs::write(dir.path().join("tree/c.txt"), b"old \xff\n").unwrap();
        let ctx = context(&dir.path().join("backups"));
        let mut p = ReplaceParams::new("old", "newer", dir.path().join("tree").to_string_lossy());
        p.dry_run = false;

        let outcome = replace(&ctx, &p).unwrap();
        let errors: Vec<_> = outcome.errors().collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, &PathBuf::from("c.txt"));
        assert_eq!(fs::read(dir.path().join("tree/c.txt")).unwrap(), b"old \xff\n");
        // The other file was still processed
        assert_eq!(outcome.total_replacements(), 2);
    }

    #[test]
    fn test_backup_dir_inside_tree_is_left_alone() {
        let dir = fixture();
        let backups = dir.path().join("tree/zbackups");
        fs::create_dir_all(&backups).unwrap();
        let ctx = context(&backups);
        let mut p = ReplaceParams::new("old", "newer", dir.path().join("tree").to_string_lossy());
        p.dry_run = false;

        let outcome = replace(&ctx, &p).unwrap();
        assert_eq!(outcome.changes.len(), 1);
        assert_eq!(outcome.changes[0].file, PathBuf::from("a.py"));
        let ChangeOutcome::Replaced {
            backup: Some(backup),
            ..
        } = &outcome.changes[0].outcome
        else {
            panic!("expected a backed-up replacement");
        };
        assert_eq!(fs::read_to_string(backup).unwrap(), "old = 1\nold()\n");
        assert_eq!(fs::read_dir(&backups).unwrap().count(), 1);
        assert_eq!(ctx.history().len(), 1);
    }

    #[test]
    fn test_write_failure_is_isolated_to_its_file() {
        let dir = fixture();
        let locked = dir.path().join("tree/locked.txt");
        fs::write(&locked, "old\n").unwrap();
        let mut perms = fs::metadata(&locked).unwrap().permissions();
        perms.set_readonly(true);
        fs::set_permissions(&locked, perms).unwrap();
        if fs::OpenOptions::new().write(true).open(&locked).is_ok() {
            // Permissions are not enforced for this user (e.g. root)
            return;
        }

        let ctx = context(&dir.path().join("backups"));
        let mut p = ReplaceParams::new("old", "newer", dir.path().join("tree").to_string_lossy());
        p.dry_run = false;
        p.backup = false;

        let outcome = replace(&ctx, &p).unwrap();
        let errors: Vec<_> = outcome.errors().collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, &PathBuf::from("locked.txt"));
        assert!(errors[0].1.starts_with("write failed: "));
        assert_eq!(fs::read_to_string(&locked).unwrap(), "old\n");
        assert_eq!(
            fs::read_to_string(dir.path().join("tree/a.py")).unwrap(),
            "newer = 1\nnewer()\n"
        );
        let history = ctx.history().recent(10);
        assert_eq!(history.len(), 1);
        assert!(history[0].file.ends_with("a.py"));
    }

    #[test]
    fn test_failed_backup_does_not_block_the_write() {
        let dir = fixture();
        // A plain file where the backup directory should be
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "").unwrap();
        let ctx = context(&blocker);
        let mut p = ReplaceParams::new("old", "newer", dir.path().join("tree").to_string_lossy());
        p.dry_run = false;

        let outcome = replace(&ctx, &p).unwrap();
        assert!(matches!(
            outcome.changes[0].outcome,
            ChangeOutcome::Replaced {
                backup: None,
                written: true,
                ..
            }
        ));
        assert_eq!(
            fs::read_to_string(dir.path().join("tree/a.py")).unwrap(),
            "newer = 1\nnewer()\n"
        );
        let report = format_report(&outcome, &p, 100);
        assert!(report.contains("a.py: 2 replacements (14 -> 18 bytes) [no backup was made]"));
    }

    #[test]
    fn test_report_format() {
        let dir = fixture();
        let ctx = context(&dir.path().join("backups"));
        let p = ReplaceParams::new("old", "newer", dir.path().join("tree").to_string_lossy());
        let report = run_replace(&ctx, &p).unwrap();
        assert!(report.starts_with("DRY RUN"));
        assert!(report.contains("Would make 2 replacements in 1 files (2 files searched)"));
        assert!(report.contains("a.py: 2 replacements (14 -> 18 bytes)"));
    }
}
