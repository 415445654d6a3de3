//! Single-file helpers: listing, reading, writing, line edits and name search.
use crate::context::ToolContext;
use crate::error::{Result, ToolError};
use crate::history::EditAction;
use crate::paths::resolve_path;
use crate::search::default_path;
use byte_unit::Byte;
use globset::Glob;
use log::{debug, warn};
use serde::Deserialize;
use serde_json::{Map, json};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

fn default_true() -> bool {
    true
}

fn default_find_limit() -> usize {
    50
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListFilesParams {
    #[serde(default = "default_path")]
    pub directory: String,
    #[serde(default)]
    pub show_hidden: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReadFileParams {
    pub file_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WriteFileParams {
    pub file_path: String,
    pub content: String,
    #[serde(default = "default_true")]
    pub backup: bool,
}

/// Inclusive, 1-indexed line edits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum LineEdit {
    /// Inserts before `line`; `line_count + 1` appends.
    Insert { line: usize, text: String },
    Delete { start: usize, end: usize },
    Replace { start: usize, end: usize, text: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct EditLinesParams {
    pub file_path: String,
    #[serde(flatten)]
    pub edit: LineEdit,
    #[serde(default = "default_true")]
    pub backup: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FindFilesParams {
    pub pattern: String,
    #[serde(default = "default_path")]
    pub directory: String,
    #[serde(default = "default_find_limit")]
    pub max_results: usize,
}

pub fn list_files(params: &ListFilesParams) -> Result<String> {
    let path = resolve_path(&params.directory);
    if !path.exists() {
        return Err(ToolError::PathNotFound(PathBuf::from(&params.directory)));
    }
    if !path.is_dir() {
        return Err(ToolError::NotADirectory(PathBuf::from(&params.directory)));
    }

    let mut items = Vec::new();
    let mut total_size = 0u64;
    for entry in fs::read_dir(&path).map_err(|e| ToolError::file_io(&path, e))? {
        let entry = entry.map_err(|e| ToolError::file_io(&path, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !params.show_hidden && name.starts_with('.') {
            continue;
        }
        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(e) => {
                debug!("Cannot stat {}: {e}", entry.path().display());
                continue;
            }
        };
        if metadata.is_dir() {
            items.push((name, format!("📁 {}", entry.file_name().to_string_lossy())));
        } else {
            total_size += metadata.len();
            items.push((name.clone(), format!("📄 {name} ({} bytes)", metadata.len())));
        }
    }
    items.sort();

    let mut out = format!("Contents of '{}':\n", path.display());
    for (_, line) in &items {
        let _ = writeln!(out, "{line}");
    }
    let adjusted = Byte::from_u64(total_size).get_appropriate_unit(byte_unit::UnitType::Binary);
    let _ = write!(
        out,
        "\n{} entries, {:.2} {} in files",
        items.len(),
        adjusted.get_value(),
        adjusted.get_unit()
    );
    Ok(out)
}

pub fn read_file(ctx: &ToolContext, params: &ReadFileParams) -> Result<String> {
    let path = resolve_path(&params.file_path);
    if !path.is_file() {
        return Err(ToolError::PathNotFound(PathBuf::from(&params.file_path)));
    }
    let size = path
        .metadata()
        .map_err(|e| ToolError::file_io(&path, e))?
        .len();
    let limit = ctx.config.files.max_read_bytes;
    if size > limit {
        return Err(ToolError::FileTooLarge { path, size, limit });
    }
    let bytes = fs::read(&path).map_err(|e| ToolError::file_io(&path, e))?;
    Ok(format!(
        "Contents of '{}':\n\n{}",
        path.display(),
        String::from_utf8_lossy(&bytes)
    ))
}

pub fn write_file(ctx: &ToolContext, params: &WriteFileParams) -> Result<String> {
    let path = resolve_path(&params.file_path);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ToolError::file_io(parent, e))?;
    }
    let backup = backup_if_requested(ctx, &path, params.backup);
    fs::write(&path, &params.content).map_err(|e| ToolError::file_io(&path, e))?;

    let chars = params.content.chars().count();
    let mut details = Map::new();
    details.insert("chars".to_string(), json!(chars));
    details.insert("backup".to_string(), backup_json(&backup));
    ctx.record_edit(EditAction::Write, path.clone(), details);

    let mut out = format!("Successfully wrote {chars} characters to '{}'", path.display());
    append_backup_note(&mut out, &backup);
    Ok(out)
}

pub fn edit_lines(ctx: &ToolContext, params: &EditLinesParams) -> Result<String> {
    let path = resolve_path(&params.file_path);
    if !path.is_file() {
        return Err(ToolError::PathNotFound(PathBuf::from(&params.file_path)));
    }
    let content = fs::read_to_string(&path).map_err(|e| ToolError::file_io(&path, e))?;
    let (updated, summary) = apply_line_edit(&content, &params.edit)?;

    let backup = backup_if_requested(ctx, &path, params.backup);
    fs::write(&path, &updated).map_err(|e| ToolError::file_io(&path, e))?;

    let mut details = Map::new();
    details.insert("change".to_string(), json!(summary));
    details.insert("backup".to_string(), backup_json(&backup));
    ctx.record_edit(EditAction::EditLines, path.clone(), details);

    let mut out = format!("{summary} in '{}'", path.display());
    append_backup_note(&mut out, &backup);
    Ok(out)
}

/// Returns the new content and a one-line description of the change. The
/// file's trailing-newline convention is preserved.
pub fn apply_line_edit(content: &str, edit: &LineEdit) -> Result<(String, String)> {
    let had_trailing_newline = content.is_empty() || content.ends_with('\n');
    let mut lines: Vec<String> = content.split_inclusive('\n').map(terminated).collect();
    let line_count = lines.len();

    let summary = match edit {
        LineEdit::Insert { line, text } => {
            if *line == 0 || *line > line_count + 1 {
                return Err(ToolError::InvalidLineRange {
                    start: *line,
                    end: *line,
                    line_count,
                });
            }
            let new_lines = text_lines(text);
            let inserted = new_lines.len();
            lines.splice(line - 1..line - 1, new_lines);
            format!("Inserted {inserted} lines before line {line}")
        }
        LineEdit::Delete { start, end } => {
            check_range(*start, *end, line_count)?;
            lines.drain(start - 1..*end);
            format!("Deleted lines {start}-{end}")
        }
        LineEdit::Replace { start, end, text } => {
            check_range(*start, *end, line_count)?;
            let new_lines = text_lines(text);
            let inserted = new_lines.len();
            lines.splice(start - 1..*end, new_lines);
            format!("Replaced lines {start}-{end} with {inserted} lines")
        }
    };

    let mut updated = lines.concat();
    if !had_trailing_newline && updated.ends_with('\n') {
        updated.pop();
        if updated.ends_with('\r') {
            updated.pop();
        }
    }
    Ok((updated, summary))
}

fn check_range(start: usize, end: usize, line_count: usize) -> Result<()> {
    if start == 0 || start > end || end > line_count {
        return Err(ToolError::InvalidLineRange {
            start,
            end,
            line_count,
        });
    }
    Ok(())
}

fn terminated(line: &str) -> String {
    if line.ends_with('\n') {
        line.to_string()
    } else {
        format!("{line}\n")
    }
}

fn text_lines(text: &str) -> Vec<String> {
    text.split_inclusive('\n').map(terminated).collect()
}

pub fn find_files(params: &FindFilesParams) -> Result<String> {
    let root = resolve_path(&params.directory);
    if !root.exists() {
        return Err(ToolError::PathNotFound(PathBuf::from(&params.directory)));
    }
    let matcher = Glob::new(&params.pattern)
        .map_err(|source| ToolError::InvalidGlob {
            pattern: params.pattern.clone(),
            source,
        })?
        .compile_matcher();

    let mut matches = Vec::new();
    for entry in WalkDir::new(&root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if matches.len() >= params.max_results {
            break;
        }
        if matcher.is_match(Path::new(entry.file_name())) {
            let relative = entry.path().strip_prefix(&root).unwrap_or(entry.path());
            matches.push(relative.display().to_string());
        }
    }

    if matches.is_empty() {
        return Ok(format!(
            "No files found matching pattern '{}' in '{}'",
            params.pattern, params.directory
        ));
    }

    let mut out = format!(
        "Found {} files matching '{}':\n{}",
        matches.len(),
        params.pattern,
        matches.join("\n")
    );
    if matches.len() >= params.max_results {
        let _ = write!(out, "\n\n(Limited to {} results)", params.max_results);
    }
    Ok(out)
}

fn backup_if_requested(ctx: &ToolContext, path: &Path, requested: bool) -> Option<PathBuf> {
    if !requested || !path.exists() {
        return None;
    }
    let backup = ctx.backups.backup(path);
    if backup.is_none() {
        warn!("No backup was made for {}", path.display());
    }
    backup
}

fn backup_json(backup: &Option<PathBuf>) -> serde_json::Value {
    json!(backup.as_ref().map(|b| b.display().to_string()))
}

fn append_backup_note(out: &mut String, backup: &Option<PathBuf>) {
    if let Some(backup) = backup {
        let _ = write!(out, " (backup: {})", backup.display());
    }
}
