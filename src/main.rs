use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use jotter::build::{build_site, Mode};
use jotter::config::{FailurePolicy, Project};

#[derive(Parser)]
#[command(name = "jotter", version)]
#[command(about = "Builds a static blog from Markdown documents with front matter")]
struct Cli {
    /// The project directory or its `jotter.yaml`. Defaults to the nearest
    /// directory (from the current one upwards) with a `jotter.yaml`
    #[arg(long, global = true)]
    project: Option<PathBuf>,

    /// Log more: -v for debug, -vv for trace. Otherwise RUST_LOG applies
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the site and write it to the output directory
    Build {
        /// Write to this directory instead of the configured one
        #[arg(long)]
        output: Option<PathBuf>,

        /// Stop at the first document that fails
        #[arg(long)]
        fail_fast: bool,
    },
    /// Build the site without writing anything
    Check {
        /// Stop at the first document that fails
        #[arg(long)]
        fail_fast: bool,
    },
    /// Print the route of every output and where it comes from
    Routes,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

// Returns whether every document built.
fn run(cli: Cli) -> Result<bool> {
    let mut project = load_project(cli.project.as_deref())?;
    match cli.command {
        Command::Build { output, fail_fast } => {
            if let Some(output) = output {
                project.site.output_directory = std::env::current_dir()
                    .context("resolving the output directory")?
                    .join(output);
            }
            if fail_fast {
                project.site.failure_policy = FailurePolicy::FailFast;
            }
            let build = build_site(&project, Mode::Write).with_context(|| {
                format!("building site in `{}`", project.root.display())
            })?;
            print!("{}", build.report);
            Ok(build.report.is_success())
        }
        Command::Check { fail_fast } => {
            if fail_fast {
                project.site.failure_policy = FailurePolicy::FailFast;
            }
            let build = build_site(&project, Mode::Check).with_context(|| {
                format!("checking site in `{}`", project.root.display())
            })?;
            print!("{}", build.report);
            Ok(build.report.is_success())
        }
        Command::Routes => {
            let build = build_site(&project, Mode::Check).with_context(|| {
                format!("resolving routes in `{}`", project.root.display())
            })?;
            for (route, owner) in &build.report.routes {
                println!("{}\t{}", route, owner);
            }
            for failure in &build.report.failures {
                eprintln!("{}", failure);
            }
            Ok(build.report.is_success())
        }
    }
}

fn load_project(path: Option<&Path>) -> Result<Project> {
    let project = match path {
        Some(path) if path.is_file() => Project::from_file(path)?,
        Some(dir) => Project::find(dir)?,
        None => {
            let cwd = std::env::current_dir().context("finding the current directory")?;
            Project::find(&cwd)?
        }
    };
    Ok(project)
}
