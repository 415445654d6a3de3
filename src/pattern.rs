use crate::error::{Result, ToolError};
use regex::{Regex, RegexBuilder};

/// How a search term is turned into a matcher.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternOptions {
    pub use_regex: bool,
    pub whole_word: bool,
    pub case_sensitive: bool,
    /// `^`/`$` match at line boundaries (whole-file replacement).
    pub multi_line: bool,
}

/// Compiles the term into a single regex. Literal terms are escaped before
/// the whole-word anchors are added.
pub fn compile(term: &str, options: PatternOptions) -> Result<Regex> {
    let body = if options.use_regex {
        term.to_string()
    } else {
        regex::escape(term)
    };
    let pattern = if options.whole_word {
        format!(r"\b(?:{body})\b")
    } else {
        body
    };

    RegexBuilder::new(&pattern)
        .case_insensitive(!options.case_sensitive)
        .multi_line(options.multi_line)
        .crlf(options.multi_line)
        .build()
        .map_err(|source| ToolError::InvalidPattern {
            pattern: term.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(use_regex: bool, whole_word: bool, case_sensitive: bool) -> PatternOptions {
        PatternOptions {
            use_regex,
            whole_word,
            case_sensitive,
            multi_line: false,
        }
    }

    #[test]
    fn test_literal_is_escaped() {
        let re = compile("a.b(c", opts(false, false, true)).unwrap();
        assert!(re.is_match("xx a.b(c yy"));
        assert!(!re.is_match("axb(c"));
    }

    #[test]
    fn test_whole_word() {
        let re = compile("cat", opts(false, true, false)).unwrap();
        assert_eq!(re.find_iter("concatenate cat category").count(), 1);
    }

    #[test]
    fn test_whole_word_wraps_alternation() {
        let re = compile("cat|dog", opts(true, true, true)).unwrap();
        assert!(!re.is_match("catalog"));
        assert!(re.is_match("hot dog"));
    }

    #[test]
    fn test_case_sensitivity() {
        let sensitive = compile("Foo", opts(false, false, true)).unwrap();
        assert!(!sensitive.is_match("foo"));
        let insensitive = compile("Foo", opts(false, false, false)).unwrap();
        assert!(insensitive.is_match("foo"));
    }

    #[test]
    fn test_multi_line_anchors() {
        let options = PatternOptions {
            use_regex: true,
            multi_line: true,
            ..PatternOptions::default()
        };
        let re = compile("^x$", options).unwrap();
        assert_eq!(re.find_iter("x\r\ny\nx\n").count(), 2);
    }

    #[test]
    fn test_invalid_regex() {
        let err = compile("(unbalanced", opts(true, false, false)).unwrap_err();
        assert!(matches!(err, ToolError::InvalidPattern { ref pattern, .. } if pattern == "(unbalanced"));
        // The same text is fine as a literal
        assert!(compile("(unbalanced", opts(false, false, false)).is_ok());
    }
}
