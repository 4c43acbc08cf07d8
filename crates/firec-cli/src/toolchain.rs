//! Host C toolchain detection and invocation.

use anyhow::{Context, Result, bail};
use std::path::Path;
use std::process::Command;

/// Pick a C compiler: `$CC`, then the first of gcc/clang/cc on PATH.
#[must_use]
pub fn detect_c_compiler() -> Option<String> {
    if let Ok(cc) = std::env::var("CC") {
        if !cc.is_empty() {
            return Some(cc);
        }
    }
    ["gcc", "clang", "cc"]
        .into_iter()
        .find(|candidate| {
            Command::new(candidate)
                .arg("--version")
                .output()
                .is_ok_and(|out| out.status.success())
        })
        .map(str::to_string)
}

/// Compile one generated C file into a native binary.
pub fn compile_c(compiler: &str, c_file: &Path, output: &Path) -> Result<()> {
    let status = Command::new(compiler)
        .arg("-O2")
        .arg("-std=c11")
        .arg(c_file)
        .arg("-o")
        .arg(output)
        .output()
        .with_context(|| format!("Failed to execute compiler '{compiler}'"))?;

    if !status.status.success() {
        let stderr = String::from_utf8_lossy(&status.stderr);
        bail!(
            "C Compilation failed with error:\n{stderr}\nThis is not an error in your firescript code, but an issue in the compiler."
        );
    }
    Ok(())
}
