use crate::error::{Result, ToolError};
use std::path::{Path, PathBuf};

/// Expands a leading `~` and makes the path absolute. Existing paths are
/// canonicalized; missing ones are only made absolute.
pub fn resolve_path(raw: &str) -> PathBuf {
    let expanded = expand_home(raw);
    if let Ok(canonical) = expanded.canonicalize() {
        return canonical;
    }
    std::path::absolute(&expanded).unwrap_or(expanded)
}

/// Resolves a search/replace root, failing on a missing path.
pub fn resolve_root(raw: &str) -> Result<PathBuf> {
    let path = resolve_path(raw);
    if !path.exists() {
        return Err(ToolError::PathNotFound(PathBuf::from(raw)));
    }
    if !path.is_dir() {
        return Err(ToolError::NotADirectory(PathBuf::from(raw)));
    }
    Ok(path)
}

fn expand_home(raw: &str) -> PathBuf {
    if raw == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = raw.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    Path::new(raw).to_path_buf()
}
