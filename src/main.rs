use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};

use protype::notation::Document;
use protype::ptype::{ColumnPolicy, PtypeOptions, DEFAULT_MAX_DEPTH};
use protype::session::Session;

#[derive(Parser)]
#[command(name = "protype")]
#[command(author, version, about = "Resolve vector prototypes of values", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the prototype of every binding in a file
    Show {
        /// The notation file to read
        input: PathBuf,

        /// Use abbreviated type descriptions
        #[arg(long)]
        abbr: bool,

        /// Print the prototypes as JSON
        #[arg(long)]
        json: bool,
    },

    /// Find the common prototype of all bindings in a file
    Common {
        /// The notation file to read
        input: PathBuf,

        /// Take the union of data frame columns instead of failing
        #[arg(long)]
        lenient: bool,

        /// Maximum nesting depth of data frames and records
        #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
        max_depth: usize,

        /// Print each step of the reduction
        #[arg(long)]
        trace: bool,
    },

    /// Check a notation file for errors
    Check {
        /// The notation file to check
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    // Initialize logger before parsing CLI args
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbose flag
    if cli.verbose {
        log::set_max_level(log::LevelFilter::Debug);
    }

    let result = match cli.command {
        Commands::Show { input, abbr, json } => show(input, abbr, json),
        Commands::Common {
            input,
            lenient,
            max_depth,
            trace,
        } => {
            let columns = if lenient {
                ColumnPolicy::Union
            } else {
                ColumnPolicy::Strict
            };
            let options = PtypeOptions::default()
                .with_max_depth(max_depth)
                .with_columns(columns);
            common(input, options, trace)
        }
        Commands::Check { input } => check(input),
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}

/// Read and parse a file, reporting diagnostics on failure
fn load(input: &Path, options: PtypeOptions) -> Result<(Session, Document)> {
    log::info!("Reading {:?}", input);
    let mut session = Session::new(input)
        .with_context(|| format!("Failed to load notation file: {:?}", input))?
        .with_options(options);

    match session.load() {
        Some(document) => Ok((session, document)),
        None => {
            session.report_errors()?;
            anyhow::bail!("Parsing failed");
        }
    }
}

fn show(input: PathBuf, abbr: bool, json: bool) -> Result<()> {
    let (mut session, document) = load(&input, PtypeOptions::default())?;
    let reports = session.show(&document);

    if session.has_errors() {
        session.report_errors()?;
        anyhow::bail!("Prototype resolution failed");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    for report in &reports {
        let description = if abbr { &report.abbr } else { &report.full };
        println!("{}: {}", report.name.cyan().bold(), description);
    }
    Ok(())
}

fn common(input: PathBuf, options: PtypeOptions, trace: bool) -> Result<()> {
    let (mut session, document) = load(&input, options)?;
    log::debug!("Combining {} bindings with {:?}", document.bindings.len(), options);

    let output = if trace {
        session.common_traced(&document).map(|trace| trace.to_string())
    } else {
        session.common(&document).map(|ptype| ptype.ptype_full())
    };

    match output {
        Some(output) => {
            println!("{}", output);
            Ok(())
        }
        None => {
            session.report_errors()?;
            anyhow::bail!("No common prototype");
        }
    }
}

fn check(input: PathBuf) -> Result<()> {
    let (mut session, document) = load(&input, PtypeOptions::default())?;

    if !session.check(&document) {
        session.report_errors()?;
        anyhow::bail!("Check failed");
    }

    println!("{}: No errors found", "success".green().bold());
    Ok(())
}
