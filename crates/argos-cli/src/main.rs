//! Argos CLI
//!
//! Thin integration shim over `argos-engine`:
//! - `analyze` prints a program's transformation order and any warnings
//! - `explain` replays a program against its models and emits the
//!   explanation graph as JSON

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

use argos_dsl::parser::parse_model;
use argos_dsl::symbol::Symbol;
use argos_engine::{build_explanation, AnalyzeOptions, BuildOptions, ProgramAnalyzer};

#[derive(Parser)]
#[command(name = "argos")]
#[command(
    author,
    version,
    about = "Argos: explanation graphs for answer set programs"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the transformation order of a program, plus any warnings about
    /// constructs that cannot be explained.
    Analyze {
        /// Program file (ASP surface syntax).
        program: PathBuf,
    },

    /// Build the explanation graph for a program and its models.
    Explain {
        /// Program file (ASP surface syntax).
        program: PathBuf,
        /// Model file, one per model: the model's atoms as facts.
        #[arg(short, long, required = true)]
        model: Vec<PathBuf>,
        /// Output file; stdout when omitted.
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Pretty-print the JSON.
        #[arg(long)]
        pretty: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Analyze { program } => {
            let report = analyze_report(&program)?;
            print!("{report}");
            Ok(())
        }
        Commands::Explain {
            program,
            model,
            out,
            pretty,
        } => explain(&program, &model, out.as_deref(), pretty),
    }
}

fn analyze_report(program: &Path) -> Result<String> {
    let source = fs::read_to_string(program)
        .with_context(|| format!("reading program {}", program.display()))?;
    let analyzed = ProgramAnalyzer::new(AnalyzeOptions::default()).analyze(&source)?;

    let mut report = String::new();
    for issue in &analyzed.issues {
        report.push_str(&format!(
            "{} {}: {}\n",
            "warning:".yellow().bold(),
            issue.message,
            issue.rule
        ));
    }
    report.push_str(&format!("facts: {}\n", analyzed.facts.len()));
    for t in &analyzed.transformations {
        let recursive = if analyzed.recursive_hashes.contains(&t.hash) {
            " (recursive)"
        } else {
            ""
        };
        report.push_str(&format!("{:>3}  {}{}\n", t.id, t.hash, recursive));
        for rule in t.rules.rules() {
            report.push_str(&format!("       {}\n", rule.text));
        }
    }
    Ok(report)
}

fn explain(program: &Path, models: &[PathBuf], out: Option<&Path>, pretty: bool) -> Result<()> {
    let source = fs::read_to_string(program)
        .with_context(|| format!("reading program {}", program.display()))?;
    let models: Vec<Vec<Symbol>> = models
        .iter()
        .map(|path| {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading model {}", path.display()))?;
            parse_model(&text).with_context(|| format!("parsing model {}", path.display()))
        })
        .collect::<Result<_>>()?;

    let explanation = build_explanation(&source, &models, &BuildOptions::default())?;
    for issue in &explanation.issues {
        eprintln!(
            "{} {}: {}",
            "warning:".yellow().bold(),
            issue.message,
            issue.rule
        );
    }

    let json = if pretty {
        serde_json::to_string_pretty(&explanation)?
    } else {
        serde_json::to_string(&explanation)?
    };
    match out {
        Some(path) => fs::write(path, json)
            .with_context(|| format!("writing output {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}
