pub mod backup;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod file_types;
pub mod filter;
pub mod history;
pub mod paths;
pub mod pattern;
pub mod processor;
pub mod replace;
pub mod search;
pub mod tools;
pub mod walker;

pub use crate::config::Config;
pub use crate::context::ToolContext;
pub use crate::error::{Result, ToolError};
pub use processor::{ContextLine, MatchRecord};
pub use replace::{ChangeOutcome, ReplaceChange, ReplaceOutcome, ReplaceParams, replace, run_replace};
pub use search::{SearchOutcome, SearchParams, run_search, search};
pub use tools::{Request, Response, dispatch, serve};
pub use walker::{TreeWalker, WalkStats};
