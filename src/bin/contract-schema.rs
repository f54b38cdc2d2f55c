//! Contract Schema CLI
//!
//! Command-line interface for resolving definition documents into schema
//! graphs.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use contract_schema::{load_definitions, BuildContext, Builder, HandlerRegistry};

#[derive(Parser)]
#[command(name = "contract-schema")]
#[command(about = "Resolve type and contract definitions into schema graphs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a definition document into a named schema graph
    Describe {
        /// Definition document (JSON file)
        defs: PathBuf,

        /// Resolve only these roots (repeatable; default: all definitions)
        #[arg(long)]
        root: Vec<String>,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// List the definitions in a document
    List {
        /// Definition document (JSON file)
        defs: PathBuf,
    },

    /// Build every definition and report failures
    Check {
        /// Definition document (JSON file)
        defs: PathBuf,

        /// Suppress per-definition output, only show errors
        #[arg(long, short)]
        quiet: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Describe {
            defs,
            root,
            output,
            pretty,
        } => run_describe(&defs, &root, output, pretty),
        Commands::List { defs } => run_list(&defs),
        Commands::Check { defs, quiet } => run_check(&defs, quiet),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn load(path: &PathBuf) -> Result<contract_schema::Definitions, u8> {
    load_definitions(path).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })
}

fn run_describe(
    defs_path: &PathBuf,
    roots: &[String],
    output: Option<PathBuf>,
    pretty: bool,
) -> Result<(), u8> {
    let defs = load(defs_path)?;
    let registry = HandlerRegistry::standard();
    let builder = Builder::new(&defs, &registry);
    let mut cx = BuildContext::new();

    let result = if roots.is_empty() {
        builder.build_all(&mut cx)
    } else {
        roots
            .iter()
            .try_for_each(|root| builder.build(root, &mut cx).map(|_| ()))
    };
    result.map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let document = serde_json::json!({ "schemas": cx.schemas() });
    let json_output = if pretty {
        serde_json::to_string_pretty(&document)
    } else {
        serde_json::to_string(&document)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match output {
        Some(path) => {
            std::fs::write(&path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", json_output);
        }
    }

    Ok(())
}

fn run_list(defs_path: &PathBuf) -> Result<(), u8> {
    let defs = load(defs_path)?;
    for (name, def) in defs.iter() {
        println!("{:<10} {}", def.kind_name(), name);
    }
    Ok(())
}

fn run_check(defs_path: &PathBuf, quiet: bool) -> Result<(), u8> {
    let defs = load(defs_path)?;
    let registry = HandlerRegistry::standard();
    let builder = Builder::new(&defs, &registry);

    let mut failures = 0usize;
    for name in defs.names() {
        let mut cx = BuildContext::new();
        match builder.build(name, &mut cx) {
            Ok(Some(_)) => {
                if !quiet {
                    println!("  ok {}", name);
                }
            }
            Ok(None) => {
                failures += 1;
                eprintln!("  unhandled {}: no handler accepts this definition", name);
            }
            Err(e) => {
                failures += 1;
                eprintln!("  error {}: {}", name, e);
            }
        }
    }

    if failures == 0 {
        if !quiet {
            println!("{} definitions checked, all passed", defs.len());
        }
        Ok(())
    } else {
        eprintln!("{} definitions checked, {} failed", defs.len(), failures);
        Err(1)
    }
}
