use log::debug;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextLine {
    pub line_number: usize,
    pub text: String,
    /// The line the record is about, as opposed to a neighbour.
    pub is_match: bool,
}

/// One matching line.
#[derive(Debug, Clone)]
pub struct MatchRecord {
    pub file: PathBuf,
    pub line_number: usize,
    /// 1-indexed character offset of the first occurrence.
    pub column: usize,
    pub raw_line: String,
    pub context: Vec<ContextLine>,
}

/// Reads `path` lossily and extracts every matching line. A file that cannot
/// be read contributes nothing.
pub fn extract_matches(
    path: &Path,
    relative: &Path,
    pattern: &Regex,
    context_lines: usize,
) -> Vec<MatchRecord> {
    match fs::read(path) {
        Ok(bytes) => {
            let text = String::from_utf8_lossy(&bytes);
            extract_from_text(relative, &text, pattern, context_lines)
        }
        Err(e) => {
            debug!("Skipping unreadable file {}: {e}", path.display());
            Vec::new()
        }
    }
}

pub fn extract_from_text(
    file: &Path,
    text: &str,
    pattern: &Regex,
    context_lines: usize,
) -> Vec<MatchRecord> {
    let lines: Vec<&str> = text.lines().collect();
    let mut records = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        let Some(m) = pattern.find(line) else {
            continue;
        };

        let start_idx = i.saturating_sub(context_lines);
        let end_idx = (i + context_lines + 1).min(lines.len());
        let context = (start_idx..end_idx)
            .map(|idx| ContextLine {
                line_number: idx + 1,
                text: lines[idx].to_string(),
                is_match: idx == i,
            })
            .collect();

        records.push(MatchRecord {
            file: file.to_path_buf(),
            line_number: i + 1,
            column: line[..m.start()].chars().count() + 1,
            raw_line: line.to_string(),
            context,
        });
    }

    records
}
