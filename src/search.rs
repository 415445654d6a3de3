use crate::context::ToolContext;
use crate::error::Result;
use crate::filter::{GlobList, resolve_excludes, resolve_includes};
use crate::paths::resolve_root;
use crate::pattern::{PatternOptions, compile};
use crate::processor::{MatchRecord, extract_matches};
use crate::walker::{TreeWalker, WalkStats};
use log::info;
use serde::Deserialize;
use std::fmt::Write as _;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::time::Instant;

pub(crate) fn default_path() -> String {
    ".".to_string()
}

pub(crate) fn default_file_types() -> String {
    "all".to_string()
}

/// Caller-facing search parameters. Unset limits fall back to `[search]`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchParams {
    pub term: String,
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
    #[serde(default)]
    pub max_results: Option<usize>,
    #[serde(default)]
    pub context_lines: Option<usize>,
    #[serde(default)]
    pub show_hidden: bool,
}

impl SearchParams {
    pub fn new(term: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            path: path.into(),
            case_sensitive: false,
            whole_word: false,
            use_regex: false,
            include: None,
            exclude: None,
            file_types: default_file_types(),
            max_results: None,
            context_lines: None,
            show_hidden: false,
        }
    }

    pub(crate) fn pattern_options(&self) -> PatternOptions {
        PatternOptions {
            use_regex: self.use_regex,
            whole_word: self.whole_word,
            case_sensitive: self.case_sensitive,
            multi_line: false,
        }
    }
}

#[derive(Debug)]
pub struct SearchOutcome {
    pub root: PathBuf,
    pub matches: Vec<MatchRecord>,
    pub files_examined: usize,
    pub files_with_matches: usize,
    pub max_results: usize,
    /// At least one match was dropped because `max_results` was reached.
    pub capped: bool,
    pub walk: WalkStats,
}

/// Read-only. Pattern and root are validated before the walk starts.
pub fn search(ctx: &ToolContext, params: &SearchParams) -> Result<SearchOutcome> {
    let pattern = compile(&params.term, params.pattern_options())?;
    let root = resolve_root(&params.path)?;
    let includes = GlobList::new(&resolve_includes(
        params.include.as_deref(),
        &params.file_types,
    ))?;
    let excludes = GlobList::new(&resolve_excludes(params.exclude.as_deref()))?;

    let max_results = params.max_results.unwrap_or(ctx.config.search.max_results);
    let context_lines = params
        .context_lines
        .unwrap_or(ctx.config.search.context_lines);

    let walker = TreeWalker {
        includes: &includes,
        excludes: &excludes,
        classifier: &ctx.classifier,
        show_hidden: params.show_hidden,
        skip_dir: None,
    };

    let start = Instant::now();
    let mut matches: Vec<MatchRecord> = Vec::new();
    let mut files_examined = 0;
    let mut files_with_matches = 0;
    let mut capped = false;

    let walk = walker.walk(&root, |candidate| {
        files_examined += 1;
        let records = extract_matches(
            &candidate.path,
            &candidate.relative,
            &pattern,
            context_lines,
        );
        if records.is_empty() {
            return ControlFlow::Continue(());
        }
        let room = max_results - matches.len();
        if room == 0 {
            // A full result set only counts as capped once a match is dropped.
            capped = true;
            return ControlFlow::Break(());
        }
        files_with_matches += 1;
        if records.len() > room {
            capped = true;
        }
        matches.extend(records.into_iter().take(room));
        if capped {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });

    info!(
        "Search for '{}' in {}: {} matches in {} files ({} examined) in {:.2?}",
        params.term,
        root.display(),
        matches.len(),
        files_with_matches,
        files_examined,
        start.elapsed()
    );

    Ok(SearchOutcome {
        root,
        matches,
        files_examined,
        files_with_matches,
        max_results,
        capped,
        walk,
    })
}

/// Runs the search and renders the report.
pub fn run_search(ctx: &ToolContext, params: &SearchParams) -> Result<String> {
    let outcome = search(ctx, params)?;
    Ok(format_report(
        &outcome,
        &params.term,
        ctx.config.search.max_files_shown,
        ctx.config.search.max_matches_per_file,
    ))
}

fn cap_notice(max_results: usize) -> String {
    format!("Results capped at {max_results} matches; narrow the search to see more")
}

/// Groups matches by file in walk order. The display caps are independent
/// of `max_results`.
pub fn format_report(
    outcome: &SearchOutcome,
    term: &str,
    max_files_shown: usize,
    max_matches_per_file: usize,
) -> String {
    let mut out = String::new();

    if outcome.matches.is_empty() {
        let _ = write!(
            out,
            "No matches found for '{}' in '{}' ({} files searched)",
            term,
            outcome.root.display(),
            outcome.files_examined
        );
        if outcome.capped {
            let _ = write!(out, "\n{}", cap_notice(outcome.max_results));
        }
        return out;
    }

    let groups = group_by_file(&outcome.matches);

    let _ = writeln!(
        out,
        "Search results for '{}' in '{}'",
        term,
        outcome.root.display()
    );
    let _ = writeln!(
        out,
        "Found {} matches in {} files ({} files searched)",
        outcome.matches.len(),
        outcome.files_with_matches,
        outcome.files_examined
    );
    if outcome.capped {
        let _ = writeln!(out, "{}", cap_notice(outcome.max_results));
    }

    for (file, records) in groups.iter().take(max_files_shown) {
        let _ = writeln!(out);
        let _ = writeln!(out, "{} ({} matches)", file.display(), records.len());
        for record in records.iter().take(max_matches_per_file) {
            let _ = writeln!(out, "  Line {}, column {}:", record.line_number, record.column);
            for line in &record.context {
                let marker = if line.is_match { "→" } else { " " };
                let _ = writeln!(out, "  {marker} {:>5} │ {}", line.line_number, line.text);
            }
        }
        if records.len() > max_matches_per_file {
            let _ = writeln!(
                out,
                "  ... and {} more matches in this file",
                records.len() - max_matches_per_file
            );
        }
    }
    if groups.len() > max_files_shown {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "... and {} more files with matches",
            groups.len() - max_files_shown
        );
    }

    out.trim_end().to_string()
}

fn group_by_file(matches: &[MatchRecord]) -> Vec<(&Path, Vec<&MatchRecord>)> {
    let mut groups: Vec<(&Path, Vec<&MatchRecord>)> = Vec::new();
    for record in matches {
        match groups.last_mut() {
            Some((file, records)) if *file == record.file.as_path() => records.push(record),
            _ => groups.push((record.file.as_path(), vec![record])),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolError;
    use std::fs;
    use tempfile::tempdir;

    fn params(term: &str, root: &Path) -> SearchParams {
        SearchParams::new(term, root.to_string_lossy())
    }

    #[test]
    fn test_invalid_regex_fails_before_walk() {
        let ctx = ToolContext::default();
        let mut p = SearchParams::new("(oops", "/definitely/not/here");
        p.use_regex = true;
        // Pattern errors win over the missing root
        assert!(matches!(search(&ctx, &p), Err(ToolError::InvalidPattern { .. })));
    }

    #[test]
    fn test_missing_root() {
        let ctx = ToolContext::default();
        let p = SearchParams::new("x", "/definitely/not/here");
        assert!(matches!(search(&ctx, &p), Err(ToolError::PathNotFound(_))));
    }

    #[test]
    fn test_group_and_display_caps() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "hit\nhit\nhit\n").unwrap();
        fs::write(dir.path().join("b.txt"), "hit\n").unwrap();
        fs::write(dir.path().join("c.txt"), "hit\n").unwrap();

        let ctx = ToolContext::default();
        let mut p = params("hit", dir.path());
        p.context_lines = Some(0);
        let outcome = search(&ctx, &p).unwrap();
        assert_eq!(outcome.matches.len(), 5);
        assert_eq!(outcome.files_with_matches, 3);
        assert!(!outcome.capped);

        let report = format_report(&outcome, "hit", 2, 1);
        assert!(report.contains("Found 5 matches in 3 files"));
        assert!(report.contains("a.txt (3 matches)"));
        assert!(report.contains("... and 2 more matches in this file"));
        assert!(report.contains("... and 1 more files with matches"));
        assert!(!report.contains("c.txt"));
    }

    #[test]
    fn test_hard_cap_is_global() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "hit\nhit\n").unwrap();
        fs::write(dir.path().join("b.txt"), "hit\nhit\n").unwrap();

        let ctx = ToolContext::default();
        let mut p = params("hit", dir.path());
        p.max_results = Some(3);
        let outcome = search(&ctx, &p).unwrap();
        assert_eq!(outcome.matches.len(), 3);
        assert!(outcome.capped);
        // b.txt was only partially included
        let from_b = outcome
            .matches
            .iter()
            .filter(|m| m.file == Path::new("b.txt"))
            .count();
        assert_eq!(from_b, 1);
    }

    #[test]
    fn test_exactly_full_is_not_capped() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "hit\n").unwrap();
        fs::write(dir.path().join("b.txt"), "hit\n").unwrap();
        fs::write(dir.path().join("c.txt"), "miss\n").unwrap();

        let ctx = ToolContext::default();
        let mut p = params("hit", dir.path());
        p.max_results = Some(2);
        let outcome = search(&ctx, &p).unwrap();
        assert_eq!(outcome.matches.len(), 2);
        assert!(!outcome.capped);
        assert!(!run_search(&ctx, &p).unwrap().contains("Results capped"));
    }

    #[test]
    fn test_zero_max_results_reports_cap() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "hit\n").unwrap();

        let ctx = ToolContext::default();
        let mut p = params("hit", dir.path());
        p.max_results = Some(0);
        let outcome = search(&ctx, &p).unwrap();
        assert!(outcome.matches.is_empty());
        assert!(outcome.capped);

        let report = format_report(&outcome, "hit", 50, 10);
        assert!(report.starts_with("No matches found for 'hit'"));
        assert!(report.ends_with("Results capped at 0 matches; narrow the search to see more"));
    }

    #[test]
    fn test_no_matches_report() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "nothing here\n").unwrap();
        let ctx = ToolContext::default();
        let report = run_search(&ctx, &params("absent", dir.path())).unwrap();
        assert!(report.starts_with("No matches found for 'absent'"));
        assert!(report.contains("(1 files searched)"));
    }
}
