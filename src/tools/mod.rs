//! Request routing and the line-delimited JSON request loop.
pub mod files;
pub mod format;
pub mod shell;
pub mod system;

use crate::context::ToolContext;
use crate::error::{Result, ToolError};
use crate::replace::{ReplaceParams, run_replace};
use crate::search::{SearchParams, run_search};
use files::{EditLinesParams, FindFilesParams, ListFilesParams, ReadFileParams, WriteFileParams};
use format::FormatFileParams;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shell::RunCommandParams;
use std::fmt::Write as _;
use std::io::{BufRead, Write};

fn default_history_limit() -> usize {
    20
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryParams {
    #[serde(default = "default_history_limit")]
    pub limit: usize,
}

/// One callable operation, e.g. `{"tool": "search", "params": {"term": "x"}}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "tool", content = "params", rename_all = "snake_case")]
pub enum Request {
    Search(SearchParams),
    Replace(ReplaceParams),
    ListFiles(ListFilesParams),
    ReadFile(ReadFileParams),
    WriteFile(WriteFileParams),
    EditLines(EditLinesParams),
    FindFiles(FindFilesParams),
    FormatFile(FormatFileParams),
    RunCommand(RunCommandParams),
    SystemInfo,
    RunningProcesses,
    History(HistoryParams),
}

impl Request {
    pub fn name(&self) -> &'static str {
        match self {
            Request::Search(_) => "search",
            Request::Replace(_) => "replace",
            Request::ListFiles(_) => "list_files",
            Request::ReadFile(_) => "read_file",
            Request::WriteFile(_) => "write_file",
            Request::EditLines(_) => "edit_lines",
            Request::FindFiles(_) => "find_files",
            Request::FormatFile(_) => "format_file",
            Request::RunCommand(_) => "run_command",
            Request::SystemInfo => "system_info",
            Request::RunningProcesses => "running_processes",
            Request::History(_) => "history",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Response {
    pub id: Value,
    pub ok: bool,
    pub output: String,
}

pub fn dispatch(ctx: &ToolContext, request: &Request) -> Result<String> {
    debug!("Dispatching {}", request.name());
    match request {
        Request::Search(p) => run_search(ctx, p),
        Request::Replace(p) => run_replace(ctx, p),
        Request::ListFiles(p) => files::list_files(p),
        Request::ReadFile(p) => files::read_file(ctx, p),
        Request::WriteFile(p) => files::write_file(ctx, p),
        Request::EditLines(p) => files::edit_lines(ctx, p),
        Request::FindFiles(p) => files::find_files(p),
        Request::FormatFile(p) => format::format_file(ctx, p),
        Request::RunCommand(p) => shell::run_command(&ctx.config.shell, p),
        Request::SystemInfo => system::system_info(),
        Request::RunningProcesses => system::running_processes(),
        Request::History(p) => Ok(format_history(ctx, p.limit)),
    }
}

fn format_history(ctx: &ToolContext, limit: usize) -> String {
    let entries = ctx.history().recent(limit);
    if entries.is_empty() {
        return "No edits recorded".to_string();
    }
    let mut out = format!("Last {} edits (newest first):\n", entries.len());
    for entry in entries {
        let _ = writeln!(
            out,
            "{}  {:<10}  {}  {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.action,
            entry.file.display(),
            Value::Object(entry.details)
        );
    }
    out.trim_end().to_string()
}

/// Handles one request line. Parse failures become error responses.
pub fn handle_line(ctx: &ToolContext, line: &str) -> Response {
    let mut value: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => {
            return Response {
                id: Value::Null,
                ok: false,
                output: ToolError::Json(e).to_string(),
            };
        }
    };
    let id = value
        .as_object_mut()
        .and_then(|obj| obj.remove("id"))
        .unwrap_or(Value::Null);

    let result = serde_json::from_value::<Request>(value)
        .map_err(ToolError::Json)
        .and_then(|request| {
            info!("Request {id}: {}", request.name());
            dispatch(ctx, &request)
        });

    match result {
        Ok(output) => Response {
            id,
            ok: true,
            output,
        },
        Err(e) => {
            warn!("Request {id} failed: {e}");
            Response {
                id,
                ok: false,
                output: format!("Error: {e}"),
            }
        }
    }
}

/// Reads one JSON request per line and writes one JSON response per line.
/// Requests run to completion in arrival order.
pub fn serve<R: BufRead, W: Write>(ctx: &ToolContext, reader: R, mut writer: W) -> Result<()> {
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let response = handle_line(ctx, &line);
        serde_json::to_writer(&mut writer, &response)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
    }
    info!("Input closed, shutting down");
    Ok(())
}
