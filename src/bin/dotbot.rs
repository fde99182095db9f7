//! CLI entry point for the `dotbot` command-line tool.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use dotbot::cli::commands;
use dotbot::{load_config, DotbotError};

#[derive(Parser)]
#[command(
    name = "dotbot",
    about = "Dotbot CLI: build diagrams from chat commands and render them with Graphviz"
)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format: "text" (default) or "json"
    #[arg(long, default_value = "text")]
    format: String,

    /// Enable debug logging
    #[arg(long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a command script and print the resulting DOT text
    Compile {
        /// Script with one command per line
        script: PathBuf,
    },
    /// Answer `<session>\t<command>` lines read from stdin
    Serve {
        /// Directory rendered images are written to
        #[arg(long, default_value = "renders")]
        out_dir: PathBuf,
    },
    /// Interactive prompt bound to one session
    Repl {
        /// Session id to use
        #[arg(long, default_value = "local")]
        session: String,
        /// Directory rendered images are written to
        #[arg(long, default_value = "renders")]
        out_dir: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    let json = match cli.format.as_str() {
        "text" => false,
        "json" => true,
        other => {
            eprintln!("Error: unknown output format '{other}'. Use text or json");
            process::exit(2);
        }
    };

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => exit_with(e),
    };

    let mut logger = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log_level.as_str()),
    );
    if cli.verbose {
        // --verbose wins over RUST_LOG.
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.format_timestamp_millis().init();

    let result = match cli.command {
        Commands::Compile { script } => commands::cmd_compile(&script, json),
        Commands::Serve { out_dir } => commands::cmd_serve(&config, &out_dir, json),
        Commands::Repl { session, out_dir } => {
            commands::cmd_repl(&config, &session, &out_dir, json)
        }
    };

    if let Err(e) = result {
        exit_with(e);
    }
}

fn exit_with(e: DotbotError) -> ! {
    eprintln!("Error: {e}");
    let code = match &e {
        DotbotError::Io(_) => 1,
        DotbotError::Config(_) => 2,
        DotbotError::Parse(_)
        | DotbotError::InvalidIdentifier(_)
        | DotbotError::InvalidAttribute { .. } => 3,
        e if e.is_referential() => 4,
        _ => 5,
    };
    process::exit(code);
}
