use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Files larger than this are never sniffed and count as non-text.
pub const MAX_SNIFF_FILE_SIZE: u64 = 1024 * 1024;
const SNIFF_BYTES: usize = 1024;

/// Decides whether a file is searchable text or skipped as binary.
pub struct ContentClassifier {
    text_extensions: HashSet<&'static str>,
}

impl ContentClassifier {
    pub fn new() -> Self {
        Self {
            text_extensions: [
                // Plain text
                "txt", "md", "markdown", "rst", "org", "tex", "adoc", "asciidoc",
                // Source code
                "rs", "py", "pyi", "js", "mjs", "cjs", "ts", "jsx", "tsx", "go", "java", "c",
                "cc", "cpp", "h", "hpp", "cs", "php", "rb", "swift", "kt", "kts", "scala",
                "dart", "r", "lua", "pl", "sh", "bash", "zsh", "fish", "ps1", "bat", "cmd",
                "sql", "graphql", "gql", "proto",
                // Web technologies
                "html", "htm", "css", "scss", "sass", "less", "vue", "svelte", "jinja",
                "jinja2", "j2", "hbs", "ejs", "twig",
                // Configuration
                "json", "jsonl", "ndjson", "yaml", "yml", "toml", "ini", "cfg", "conf",
                "config", "xml", "svg", "properties", "env", "lock", "gitignore",
                "dockerignore", "editorconfig",
                // Data
                "csv", "tsv",
            ]
            .into_iter()
            .collect(),
        }
    }

    pub fn is_text(&self, path: &Path) -> bool {
        if is_text_mime(path) {
            return true;
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_ascii_lowercase())
            .unwrap_or_default();
        if self.text_extensions.contains(ext.as_str()) {
            return true;
        }

        match path.metadata() {
            Ok(metadata) if metadata.len() > MAX_SNIFF_FILE_SIZE => false,
            Ok(_) => sniff_is_text(path),
            Err(_) => false,
        }
    }
}

impl Default for ContentClassifier {
    fn default() -> Self {
        Self::new()
    }
}

fn is_text_mime(path: &Path) -> bool {
    mime_guess::from_path(path)
        .first()
        .map(|mime| mime.type_() == mime_guess::mime::TEXT)
        .unwrap_or(false)
}

/// NUL in the first kilobyte means binary. Unreadable means binary too.
fn sniff_is_text(path: &Path) -> bool {
    let Ok(file) = File::open(path) else {
        return false;
    };
    let mut buffer = Vec::with_capacity(SNIFF_BYTES);
    match file.take(SNIFF_BYTES as u64).read_to_end(&mut buffer) {
        Ok(_) => !buffer.contains(&0),
        Err(_) => false,
    }
}
