use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kestrel_core::bytecode::Ast;
use kestrel_core::{KestrelRuntime, RuntimeConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Kestrel bytecode compiler and virtual machine", long_about = None)]
struct Cli {
    /// Runtime configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a JSON syntax tree and execute it
    Run {
        /// Syntax tree produced by the parser, serialized as JSON
        tree: PathBuf,
    },
    /// Compile a JSON syntax tree and print the instruction stream
    Compile {
        /// Syntax tree produced by the parser, serialized as JSON
        tree: PathBuf,
        /// Print a disassembly listing instead of a hex dump
        #[arg(short, long)]
        disassemble: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match cli.config.as_deref() {
        Some(path) => RuntimeConfig::load(path)?,
        None => RuntimeConfig::default(),
    };
    let runtime = KestrelRuntime::with_config(config)?;

    match cli.command {
        Command::Run { tree } => {
            let ast = read_tree(&tree)?;
            let value = runtime.evaluate(&ast)?;
            info!(kind = value.type_name(), "program finished");
            println!("{value}");
        }
        Command::Compile { tree, disassemble } => {
            let ast = read_tree(&tree)?;
            let program = runtime.compile(&ast)?;
            if disassemble {
                print!("{}", program.disassemble()?);
            } else {
                print!("{}", program.hex_dump());
            }
        }
    }

    Ok(())
}

fn read_tree(path: &Path) -> Result<Ast> {
    let source =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&source)
        .with_context(|| format!("failed to parse syntax tree {}", path.display()))
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
