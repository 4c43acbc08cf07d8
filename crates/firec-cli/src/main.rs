use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use firec_cli::{
    CliArgs, FIRESCRIPT_RELEASE_DATE, FIRESCRIPT_RELEASE_NAME, FIRESCRIPT_VERSION, compile_file,
};

fn setup_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

fn main() -> ExitCode {
    let args = CliArgs::parse();

    if args.version {
        println!("firescript {FIRESCRIPT_VERSION} - {FIRESCRIPT_RELEASE_NAME}");
        println!("Released {FIRESCRIPT_RELEASE_DATE}");
        return ExitCode::SUCCESS;
    }

    setup_logging(args.debug);

    if args.file.is_none() && args.dir.is_none() {
        eprintln!("error: no input file or directory specified");
        return ExitCode::FAILURE;
    }
    if args.dir.is_some() && args.output.is_some() {
        eprintln!("error: cannot specify output file when compiling a directory");
        return ExitCode::FAILURE;
    }

    let mut failed = false;

    if let Some(file) = &args.file {
        if let Err(error) = compile_file(file, &args) {
            eprintln!("error: {error:#}");
            failed = true;
        }
    }

    if let Some(dir) = &args.dir {
        match compile_directory(dir, &args) {
            Ok((successful, failures)) => {
                tracing::info!(successful, failed = failures, "directory compilation complete");
                if failures > 0 {
                    failed = true;
                }
            }
            Err(error) => {
                eprintln!("error: {error:#}");
                failed = true;
            }
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Compile every `.fire` file directly inside `dir`.
fn compile_directory(dir: &PathBuf, args: &CliArgs) -> Result<(u32, u32)> {
    if !dir.is_dir() {
        anyhow::bail!("Directory not found: {}", dir.display());
    }
    let mut fire_files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "fire"))
        .collect();
    fire_files.sort();

    if fire_files.is_empty() {
        tracing::warn!(dir = %dir.display(), "no .fire files found");
    }

    let mut successful = 0u32;
    let mut failed = 0u32;
    for file in fire_files {
        match compile_file(&file, args) {
            Ok(_) => successful += 1,
            Err(error) => {
                eprintln!("error: {error:#}");
                failed += 1;
            }
        }
    }
    Ok((successful, failed))
}
