//! Include/exclude glob rules and the named file-type groups.
use crate::error::{Result, ToolError};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;

/// Always applied; caller-supplied excludes are added on top of these.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    // Version control
    ".git",
    ".svn",
    ".hg",
    // Dependencies
    "node_modules",
    "vendor",
    ".venv",
    "venv",
    // Bytecode caches
    "__pycache__",
    "*.pyc",
    "*.pyo",
    // OS metadata
    ".DS_Store",
    "Thumbs.db",
    // Logs and environment files
    "*.log",
    ".env",
    ".env.*",
    // Editor settings
    ".vscode",
    ".idea",
    // Build output
    "dist",
    "build",
    "target",
    // Packaging metadata
    "*.egg-info",
    // Test caches and coverage
    ".pytest_cache",
    ".tox",
    ".coverage",
    "coverage",
    "htmlcov",
    // Minified assets
    "*.min.js",
    "*.min.css",
];

/// Shorthand groups accepted as `file_types`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileTypeGroup {
    Code,
    Web,
    Config,
    Docs,
    Data,
    All,
}

impl FileTypeGroup {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "code" => Some(Self::Code),
            "web" => Some(Self::Web),
            "config" => Some(Self::Config),
            "docs" => Some(Self::Docs),
            "data" => Some(Self::Data),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    pub fn globs(self) -> &'static [&'static str] {
        match self {
            Self::Code => &[
                "*.py", "*.js", "*.ts", "*.jsx", "*.tsx", "*.java", "*.c", "*.cpp", "*.cc",
                "*.h", "*.hpp", "*.cs", "*.go", "*.rs", "*.rb", "*.php", "*.swift", "*.kt",
                "*.scala", "*.dart", "*.lua", "*.r", "*.sh", "*.bash", "*.zsh", "*.ps1",
                "*.sql",
            ],
            Self::Web => &[
                "*.html", "*.htm", "*.css", "*.scss", "*.sass", "*.less", "*.vue",
                "*.svelte", "*.jinja", "*.jinja2", "*.j2", "*.hbs", "*.ejs", "*.twig",
            ],
            Self::Config => &[
                "*.json", "*.yaml", "*.yml", "*.toml", "*.ini", "*.cfg", "*.conf",
                "*.config", "*.xml", "*.properties", "Dockerfile", "Makefile",
            ],
            Self::Docs => &[
                "*.md", "*.markdown", "*.txt", "*.rst", "*.adoc", "*.org", "*.tex",
            ],
            Self::Data => &[
                "*.csv", "*.tsv", "*.json", "*.jsonl", "*.ndjson", "*.xml", "*.yaml",
                "*.yml", "*.parquet", "*.sql",
            ],
            Self::All => &["*"],
        }
    }
}

/// Resolves the include list: explicit `include` wins, then a named
/// `file_types` group, else `file_types` is read as a comma-separated glob list.
pub fn resolve_includes(include: Option<&str>, file_types: &str) -> Vec<String> {
    if let Some(include) = include {
        let patterns = split_patterns(include);
        if !patterns.is_empty() {
            return patterns;
        }
    }
    match FileTypeGroup::from_name(file_types) {
        Some(group) => group.globs().iter().map(|g| g.to_string()).collect(),
        None => {
            let patterns = split_patterns(file_types);
            if patterns.is_empty() {
                vec!["*".to_string()]
            } else {
                patterns
            }
        }
    }
}

/// The fixed default set followed by any caller additions.
pub fn resolve_excludes(exclude: Option<&str>) -> Vec<String> {
    let mut patterns: Vec<String> = DEFAULT_EXCLUDES.iter().map(|p| p.to_string()).collect();
    if let Some(extra) = exclude {
        patterns.extend(split_patterns(extra));
    }
    patterns
}

fn split_patterns(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// An ordered glob list compiled into one matcher.
#[derive(Debug, Clone)]
pub struct GlobList {
    patterns: Vec<String>,
    set: GlobSet,
}

impl GlobList {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern).map_err(|source| ToolError::InvalidGlob {
                pattern: pattern.clone(),
                source,
            })?;
            builder.add(glob);
        }
        let set = builder.build().map_err(|source| ToolError::InvalidGlob {
            pattern: patterns.join(","),
            source,
        })?;
        Ok(Self {
            patterns: patterns.to_vec(),
            set,
        })
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// True if the path string or its bare file name matches.
    pub fn matches_path_or_name(&self, path: &Path) -> bool {
        if self.set.is_match(path) {
            return true;
        }
        path.file_name()
            .map(|name| self.set.is_match(Path::new(name)))
            .unwrap_or(false)
    }
}

/// A path is excluded when it, its file name, or any ancestor (path or name)
/// matches. Pass root-relative paths; absolute prefixes would be tested too.
pub fn is_excluded(path: &Path, excludes: &GlobList) -> bool {
    path.ancestors()
        .filter(|p| !p.as_os_str().is_empty())
        .any(|p| excludes.matches_path_or_name(p))
}
