//! protoc-gen-twirp
//!
//! Generates Twirp clients and servers in Rust. Invoked by protoc as a
//! plugin, or directly against a descriptor set.

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;
use twirp_gen::config::GeneratorConfig;
use twirp_gen::errors::GeneratorError;
use twirp_gen::plugin::{generate_from_descriptor_set, run, write_files};

/// Environment variable holding the log filter.
const LOG_ENV: &str = "PROTOC_GEN_TWIRP_LOG";

/// protoc plugin that generates Twirp RPC clients and servers.
///
/// Without `--descriptor-set` a `CodeGeneratorRequest` is read from stdin and
/// the response is written to stdout.
#[derive(Parser, Debug)]
#[command(name = "protoc-gen-twirp")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Read a FileDescriptorSet instead of a plugin request
    #[arg(long, value_name = "FILE")]
    descriptor_set: Option<PathBuf>,

    /// Proto file to generate for (repeatable; default: every file in the set)
    #[arg(long = "file", value_name = "PROTO", requires = "descriptor_set")]
    files: Vec<String>,

    /// Output directory for generated files
    #[arg(short, long, default_value = ".", requires = "descriptor_set")]
    out_dir: PathBuf,

    /// Print generated code without writing files
    #[arg(long, requires = "descriptor_set")]
    dry_run: bool,

    /// Parameter string, as protoc would pass it (e.g. "validate_enable=true")
    #[arg(long, requires = "descriptor_set")]
    param: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    // stdout carries the plugin response, so logs go to stderr
    let base_filter = match std::env::var(LOG_ENV) {
        Ok(filter) => filter,
        Err(_) => match verbose {
            0 => "warn".to_string(),
            1 => "info".to_string(),
            2 => "debug".to_string(),
            _ => "trace".to_string(),
        },
    };

    let filter = EnvFilter::try_new(&base_filter).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(verbose >= 2)
        .compact()
        .init();
}

fn offline(cli: &Cli, path: &Path) -> Result<(), GeneratorError> {
    let bytes = std::fs::read(path)?;
    let config = GeneratorConfig::from_parameter(cli.param.as_deref())?;
    let files = generate_from_descriptor_set(&bytes, &cli.files, config)?;

    if cli.dry_run {
        for file in &files {
            println!("// ===== {} =====", file.name);
            print!("{}", file.content);
        }
        return Ok(());
    }

    write_files(&cli.out_dir, &files)?;
    if cli.verbose > 0 {
        eprintln!(
            "Generated {} file(s) in {}",
            files.len(),
            cli.out_dir.display()
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match &cli.descriptor_set {
        Some(path) => offline(&cli, path),
        None => run(io::stdin().lock(), io::stdout().lock()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {}", "protoc-gen-twirp:".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}
