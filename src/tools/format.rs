//! Language detection and pluggable external formatters.
use crate::context::ToolContext;
use crate::error::{Result, ToolError};
use crate::history::EditAction;
use crate::paths::resolve_path;
use crate::tools::shell::run_with_timeout;
use log::{info, warn};
use serde::Deserialize;
use serde_json::{Map, json};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::process::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Rust,
    Python,
    JavaScript,
    TypeScript,
    Go,
    C,
    Cpp,
    Java,
    Ruby,
    Shell,
    Json,
    Yaml,
    Toml,
    Html,
    Css,
    Markdown,
}

impl Language {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        let language = match ext.as_str() {
            "rs" => Self::Rust,
            "py" | "pyi" => Self::Python,
            "js" | "jsx" | "mjs" | "cjs" => Self::JavaScript,
            "ts" | "tsx" => Self::TypeScript,
            "go" => Self::Go,
            "c" | "h" => Self::C,
            "cc" | "cpp" | "cxx" | "hpp" => Self::Cpp,
            "java" => Self::Java,
            "rb" => Self::Ruby,
            "sh" | "bash" | "zsh" => Self::Shell,
            "json" => Self::Json,
            "yaml" | "yml" => Self::Yaml,
            "toml" => Self::Toml,
            "html" | "htm" => Self::Html,
            "css" | "scss" => Self::Css,
            "md" | "markdown" => Self::Markdown,
            _ => return None,
        };
        Some(language)
    }

    /// Key used in the `[formatters]` config table.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Rust => "rust",
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
            Self::Go => "go",
            Self::C => "c",
            Self::Cpp => "cpp",
            Self::Java => "java",
            Self::Ruby => "ruby",
            Self::Shell => "shell",
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Toml => "toml",
            Self::Html => "html",
            Self::Css => "css",
            Self::Markdown => "markdown",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.tag())
    }
}

/// Rewrites a file in place.
pub trait Formatter {
    fn format(&self, path: &Path) -> Result<()>;
}

/// Runs `program args... <path>` and treats a non-zero exit as failure.
#[derive(Debug, Clone)]
pub struct ExternalFormatter {
    pub program: String,
    pub args: Vec<String>,
    pub timeout_secs: u64,
}

impl ExternalFormatter {
    /// `None` for an empty command line.
    pub fn from_command_line(command: &[String], timeout_secs: u64) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            timeout_secs,
        })
    }
}

impl Formatter for ExternalFormatter {
    fn format(&self, path: &Path) -> Result<()> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).arg(path);
        let output = run_with_timeout(cmd, self.timeout_secs, &self.program)?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(ToolError::Anyhow(anyhow::anyhow!(
            "{} exited with {}: {}",
            self.program,
            output.status,
            stderr.trim()
        )))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FormatFileParams {
    pub file_path: String,
    #[serde(default = "default_true")]
    pub backup: bool,
}

fn default_true() -> bool {
    true
}

pub fn format_file(ctx: &ToolContext, params: &FormatFileParams) -> Result<String> {
    let path = resolve_path(&params.file_path);
    if !path.is_file() {
        return Err(ToolError::PathNotFound(PathBuf::from(&params.file_path)));
    }
    let language = Language::from_path(&path)
        .ok_or_else(|| ToolError::NoFormatter(path.display().to_string()))?;
    let formatter = ctx
        .config
        .formatters
        .get(language.tag())
        .and_then(|command| {
            ExternalFormatter::from_command_line(command, ctx.config.shell.timeout_secs)
        })
        .ok_or_else(|| ToolError::NoFormatter(language.to_string()))?;

    format_with(ctx, &path, language, &formatter, params.backup)
}

pub fn format_with(
    ctx: &ToolContext,
    path: &Path,
    language: Language,
    formatter: &dyn Formatter,
    backup: bool,
) -> Result<String> {
    let backup = if backup {
        let backup = ctx.backups.backup(path);
        if backup.is_none() {
            warn!("No backup was made for {}", path.display());
        }
        backup
    } else {
        None
    };

    formatter.format(path)?;
    info!("Formatted {} as {language}", path.display());

    let mut details = Map::new();
    details.insert("language".to_string(), json!(language.tag()));
    details.insert(
        "backup".to_string(),
        json!(backup.as_ref().map(|b| b.display().to_string())),
    );
    ctx.record_edit(EditAction::Format, path.to_path_buf(), details);

    let mut out = format!("Formatted '{}' as {language}", path.display());
    if let Some(backup) = backup {
        out.push_str(&format!(" (backup: {})", backup.display()));
    }
    Ok(out)
}
