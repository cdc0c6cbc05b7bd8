//! arrayvault Inspector Binary
//!
//! Lists the arrays of a container file with their stored types.

use std::path::PathBuf;
use std::process::ExitCode;

use arrayvault::{Archive, Config, TypeDescriptor};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

/// arrayvault container inspector
#[derive(Parser, Debug)]
#[command(name = "arrayvault-inspect")]
#[command(about = "List the arrays of an arrayvault container")]
#[command(version)]
struct Args {
    /// Container file
    path: PathBuf,

    /// Show only this array
    #[arg(short, long)]
    name: Option<String>,

    /// Skip body checksum verification
    #[arg(long)]
    no_verify: bool,
}

fn main() -> ExitCode {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,arrayvault=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    tracing::info!("arrayvault-inspect v{}", arrayvault::VERSION);

    let config = Config::builder()
        .path(&args.path)
        .verify_checksum(!args.no_verify)
        .build();

    let archive = match Archive::with_config(config) {
        Ok(a) => a,
        Err(e) => {
            tracing::error!("Failed to open {}: {}", args.path.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let names = match &args.name {
        Some(name) => vec![name.clone()],
        None => archive.names(),
    };

    for name in names {
        match archive.describe(&name) {
            Ok(ty) => println!("{}", describe_line(&name, &ty)),
            Err(e) => {
                tracing::error!("{}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}

fn describe_line(name: &str, ty: &TypeDescriptor) -> String {
    format!("{:<24} {:<16} {}", name, ty.class(), ty)
}
