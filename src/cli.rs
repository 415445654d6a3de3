use crate::replace::ReplaceParams;
use crate::search::SearchParams;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    #[clap(long, global = true, value_parser, default_value_t = false)]
    pub verbose: bool,

    #[clap(long, global = true, value_parser)]
    pub log: Option<PathBuf>,

    /// Config file to use instead of the default search locations
    #[clap(long, global = true, value_parser)]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Commands,
}

/// Matching and filtering flags shared by `search` and `replace`.
#[derive(Args, Debug, Clone)]
pub struct FilterArgs {
    #[clap(long, value_parser, default_value_t = false)]
    pub case_sensitive: bool,

    #[clap(short = 'w', long, value_parser, default_value_t = false)]
    pub whole_word: bool,

    #[clap(short = 'e', long = "regex", value_parser, default_value_t = false)]
    pub use_regex: bool,

    /// Comma-separated include globs; overrides --file-types
    #[clap(long, value_parser)]
    pub include: Option<String>,

    /// Comma-separated globs excluded on top of the defaults
    #[clap(long, value_parser)]
    pub exclude: Option<String>,

    /// code, web, config, docs, data, all, or a comma-separated glob list
    #[clap(long, value_parser, default_value = "all")]
    pub file_types: String,

    #[clap(long, value_parser, default_value_t = false)]
    pub show_hidden: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search file contents under a directory
    Search {
        term: String,

        #[clap(default_value = ".")]
        path: String,

        #[clap(flatten)]
        filters: FilterArgs,

        #[clap(long, value_parser)]
        max_results: Option<usize>,

        #[clap(short = 'C', long, value_parser)]
        context_lines: Option<usize>,
    },
    /// Find and replace across a directory (dry run unless --apply)
    Replace {
        term: String,

        replacement: String,

        #[clap(default_value = ".")]
        path: String,

        #[clap(flatten)]
        filters: FilterArgs,

        #[clap(long, value_parser, default_value_t = false)]
        apply: bool,

        #[clap(long, value_parser, default_value_t = false)]
        no_backup: bool,
    },
    /// Answer JSON requests on stdin, one per line
    Serve,
    /// Show the effective configuration, or write it with --init
    Config {
        #[clap(long, value_parser, default_value_t = false)]
        init: bool,

        /// Destination for --init
        path: Option<PathBuf>,
    },
}

impl Commands {
    pub fn search_params(
        term: &str,
        path: &str,
        filters: &FilterArgs,
        max_results: Option<usize>,
        context_lines: Option<usize>,
    ) -> SearchParams {
        SearchParams {
            term: term.to_string(),
            path: path.to_string(),
            case_sensitive: filters.case_sensitive,
            whole_word: filters.whole_word,
            use_regex: filters.use_regex,
            include: filters.include.clone(),
            exclude: filters.exclude.clone(),
            file_types: filters.file_types.clone(),
            max_results,
            context_lines,
            show_hidden: filters.show_hidden,
        }
    }

    pub fn replace_params(
        term: &str,
        replacement: &str,
        path: &str,
        filters: &FilterArgs,
        apply: bool,
        no_backup: bool,
    ) -> ReplaceParams {
        ReplaceParams {
            term: term.to_string(),
            replacement: replacement.to_string(),
            path: path.to_string(),
            case_sensitive: filters.case_sensitive,
            whole_word: filters.whole_word,
            use_regex: filters.use_regex,
            include: filters.include.clone(),
            exclude: filters.exclude.clone(),
            file_types: filters.file_types.clone(),
            dry_run: !apply,
            backup: !no_backup,
            show_hidden: filters.show_hidden,
        }
    }
}
