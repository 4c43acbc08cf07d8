use clap::Parser;
use std::path::PathBuf;

/// CLI arguments for the firec binary.
#[derive(Parser, Debug)]
#[command(name = "firec", about = "firescript compiler", disable_version_flag = true)]
pub struct CliArgs {
    /// Input file.
    pub file: Option<PathBuf>,

    /// Compile all .fire files in a directory.
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Output file for the produced binary.
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Target language for compilation.
    #[arg(short = 't', long, value_enum, default_value = "native")]
    pub target: Target,

    /// C compiler to use (default: auto-detect).
    #[arg(long)]
    pub cc: Option<String>,

    /// Stop after writing the generated C file.
    #[arg(long = "emit-c")]
    pub emit_c: bool,

    /// Debug mode (verbose pass logging).
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Show version information and exit.
    #[arg(short = 'v', long)]
    pub version: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Target {
    Native,
}
