use clap::Parser;
use colored::*;
use env_logger::{Builder, Env, Target};
use localtools::cli::{Cli, Commands};
use localtools::{Config, Result, ToolContext, ToolError, run_replace, run_search, serve};
use log::{debug, info};
use std::fs;
use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = setup_logging(&cli) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    debug!("Loaded configuration: {config:?}");

    match cli.command {
        Commands::Search {
            term,
            path,
            filters,
            max_results,
            context_lines,
        } => {
            let ctx = ToolContext::new(config);
            let params = Commands::search_params(&term, &path, &filters, max_results, context_lines);
            println!("{}", run_search(&ctx, &params)?);
        }
        Commands::Replace {
            term,
            replacement,
            path,
            filters,
            apply,
            no_backup,
        } => {
            let ctx = ToolContext::new(config);
            let params =
                Commands::replace_params(&term, &replacement, &path, &filters, apply, no_backup);
            println!("{}", run_replace(&ctx, &params)?);
            if params.dry_run {
                eprintln!("{}", "Re-run with --apply to write these changes.".yellow());
            }
        }
        Commands::Serve => {
            let ctx = ToolContext::new(config);
            info!("Serving requests on stdin");
            let stdin = io::stdin();
            let stdout = io::stdout();
            serve(&ctx, stdin.lock(), stdout.lock())?;
        }
        Commands::Config { init, path } => {
            if init {
                let path = path.unwrap_or_else(Config::default_path);
                if path.exists() {
                    return Err(ToolError::Config(format!(
                        "'{}' already exists",
                        path.display()
                    )));
                }
                Config::default().save(&path)?;
                eprintln!("{} {}", "Wrote".green(), path.display());
            } else {
                let rendered = toml::to_string_pretty(&config)
                    .map_err(|e| ToolError::Config(e.to_string()))?;
                print!("{rendered}");
            }
        }
    }
    Ok(())
}

fn setup_logging(cli: &Cli) -> Result<()> {
    let default_level = if cli.verbose { "debug" } else { "info" };
    let mut builder = Builder::from_env(Env::default().default_filter_or(default_level));

    builder.format(|buf, record| {
        use std::io::Write;
        writeln!(
            buf,
            "{} [{}] [{}] {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            record.level(),
            record.module_path().unwrap_or("unknown"),
            record.args()
        )
    });

    // stdout carries reports and serve responses, so logs never go there
    if let Some(log_path) = &cli.log {
        if let Some(parent_dir) = log_path.parent()
            && !parent_dir.as_os_str().is_empty()
            && !parent_dir.exists()
        {
            fs::create_dir_all(parent_dir)?;
        }
        let log_file = fs::File::create(log_path)?;
        builder.target(Target::Pipe(Box::new(log_file)));
    } else {
        builder.target(Target::Stderr);
    }

    builder
        .try_init()
        .map_err(|e| ToolError::Config(format!("logger: {e}")))?;
    Ok(())
}
