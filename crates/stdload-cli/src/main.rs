mod config;
mod service;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::Config;
use service::{ListFormat, OutputFormat, Workspace};
use std::path::PathBuf;
use std::process::ExitCode;
use stdload_resolver::LoadError;

/// Resolve and load coding standards within a token budget
#[derive(Debug, Parser)]
#[command(name = "stdload", version, about)]
struct Cli {
    /// Configuration file layered over the global and local ones
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Content root holding MANIFEST.yaml and the documents
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Log level (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve a request and print the selected content
    Load {
        /// `@load [A + B]`, `A,B`, `CODE:section`, `product:NAME`, or several atoms
        #[arg(required = true)]
        request: Vec<String>,
        /// Token budget
        #[arg(long)]
        budget: Option<u64>,
        /// Strategy or profile name
        #[arg(long)]
        strategy: Option<String>,
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },
    /// List standards grouped by category
    List {
        #[arg(long)]
        category: Option<String>,
        /// `prompt` prints a list ready to paste into an assistant prompt
        #[arg(long, value_enum, default_value_t)]
        format: ListFormat,
    },
    /// Show sections and dependencies of one standard
    Info { code: String },
    /// Search standards by keyword
    Discover {
        #[arg(long)]
        keyword: String,
    },
    /// List products, stack presets and profiles
    Products,
    /// Show what a product loads
    Recommend { product: String },
    /// Load the catalog and product table and report problems
    Validate,
    /// Check section content and token estimates
    Audit {
        /// Report estimates further off than this percentage
        #[arg(long)]
        drift_percent: Option<u64>,
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },
    /// Print the effective configuration
    Config,
    /// Write the default global configuration
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("Error: {err:#}");
            // Bad requests exit 2, broken catalogs and I/O exit 1
            if err.downcast_ref::<LoadError>().is_some() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn run(cli: Cli) -> Result<bool> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(root) = cli.root {
        config.catalog.root = root;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    stdload_logging::init_logging(&config.logging.level, config.logging.format)?;

    // Commands that do not need a catalog
    match &cli.command {
        Command::Config => {
            print!("{}", config.to_toml()?);
            return Ok(true);
        }
        Command::Init { force } => {
            let (path, written) = Config::init_global(*force)?;
            if written {
                println!("Wrote {}", path.display());
            } else {
                println!("{} already exists (use --force to overwrite)", path.display());
            }
            return Ok(true);
        }
        _ => {}
    }

    let workspace = Workspace::open(config)?;
    let ok = match cli.command {
        Command::Load {
            request,
            budget,
            strategy,
            format,
        } => {
            println!(
                "{}",
                workspace.load(&request, budget, strategy.as_deref(), format)?
            );
            true
        }
        Command::List { category, format } => {
            println!("{}", workspace.list(category.as_deref(), format)?);
            true
        }
        Command::Info { code } => {
            println!("{}", workspace.info(&code)?);
            true
        }
        Command::Discover { keyword } => {
            println!("{}", workspace.discover(&keyword));
            true
        }
        Command::Products => {
            println!("{}", workspace.products());
            true
        }
        Command::Recommend { product } => {
            println!("{}", workspace.recommend(&product)?);
            true
        }
        Command::Validate => {
            println!("{}", workspace.validate());
            true
        }
        Command::Audit {
            drift_percent,
            format,
        } => {
            let outcome = workspace.audit(drift_percent, format)?;
            println!("{}", outcome.text);
            outcome.ok
        }
        Command::Config | Command::Init { .. } => true,
    };
    Ok(ok)
}
