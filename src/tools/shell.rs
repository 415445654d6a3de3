use crate::config::ShellConfig;
use crate::error::{Result, ToolError};
use log::{info, warn};
use serde::Deserialize;
use std::fmt::Write as _;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;

#[derive(Debug, Clone, Deserialize)]
pub struct RunCommandParams {
    pub command: String,
}

/// Rejects any command containing a blocked word, case-insensitively.
pub fn check_command(config: &ShellConfig, command: &str) -> Result<()> {
    let lowered = command.to_lowercase();
    if let Some(pattern) = config
        .blocked
        .iter()
        .find(|blocked| lowered.contains(&blocked.to_lowercase()))
    {
        warn!("Blocked command '{command}' (matched '{pattern}')");
        return Err(ToolError::CommandBlocked {
            command: command.to_string(),
            pattern: pattern.clone(),
        });
    }
    Ok(())
}

pub fn run_command(config: &ShellConfig, params: &RunCommandParams) -> Result<String> {
    check_command(config, &params.command)?;
    info!("Running command: {}", params.command);

    let output = run_with_timeout(
        shell_command(&params.command),
        config.timeout_secs,
        &params.command,
    )?;

    let mut out = format!("Exit code: {}\n", output.status.code().unwrap_or(-1));
    if !output.stdout.is_empty() {
        let _ = writeln!(out, "Output:\n{}", String::from_utf8_lossy(&output.stdout));
    }
    if !output.stderr.is_empty() {
        let _ = writeln!(out, "Error:\n{}", String::from_utf8_lossy(&output.stderr));
    }
    Ok(out)
}

fn shell_command(command: &str) -> Command {
    if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(command);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        cmd
    }
}

/// Runs a child to completion on a private runtime, killing it once
/// `timeout_secs` elapse. Stdin is closed so the child cannot consume
/// request input.
pub(crate) fn run_with_timeout(mut cmd: Command, timeout_secs: u64, label: &str) -> Result<Output> {
    cmd.stdin(Stdio::null()).kill_on_drop(true);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let result = tokio::time::timeout(Duration::from_secs(timeout_secs), cmd.output()).await;
        match result {
            Ok(output) => output.map_err(ToolError::from),
            Err(_) => Err(ToolError::CommandTimeout {
                command: label.to_string(),
                secs: timeout_secs,
            }),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocked_words() {
        let config = ShellConfig::default();
        assert!(matches!(
            check_command(&config, "SUDO ls"),
            Err(ToolError::CommandBlocked { ref pattern, .. }) if pattern == "sudo"
        ));
        assert!(check_command(&config, "echo hi").is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_runs_and_reports_streams() {
        let config = ShellConfig::default();
        let report = run_command(
            &config,
            &RunCommandParams {
                command: "echo out; echo err 1>&2; exit 3".to_string(),
            },
        )
        .unwrap();
        assert!(report.starts_with("Exit code: 3"));
        assert!(report.contains("Output:\nout"));
        assert!(report.contains("Error:\nerr"));
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout() {
        let config = ShellConfig {
            timeout_secs: 1,
            blocked: Vec::new(),
        };
        let err = run_command(
            &config,
            &RunCommandParams {
                command: "sleep 5".to_string(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, ToolError::CommandTimeout { secs: 1, ref command } if command == "sleep 5"));
    }
}
