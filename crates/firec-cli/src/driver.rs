//! Pipeline assembly: one `.fire` entry file in, a native binary out.

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use std::time::Instant;

use firec_analyzer::SemanticAnalyzer;
use firec_common::Diagnostic;
use firec_emitter::CEmitter;
use firec_parser::{NodeKind, ParserState};
use firec_preprocessor::enable_and_insert_drops;
use firec_resolver::{MergedProgram, ModuleResolver, build_merged_program, collect_imports};

use crate::args::CliArgs;
use crate::reporter;
use crate::toolchain;

/// What one compilation produced.
#[derive(Debug)]
pub enum CompileOutcome {
    /// Path of the produced native binary.
    Binary(PathBuf),
    /// Path of the generated C file (`--emit-c`).
    CSource(PathBuf),
}

/// Compile a single firescript file end to end.
pub fn compile_file(file_path: &Path, args: &CliArgs) -> Result<CompileOutcome> {
    tracing::info!(file = %file_path.display(), "starting compilation");
    let start = Instant::now();

    let source = std::fs::read_to_string(file_path)
        .with_context(|| format!("File not found: {}", file_path.display()))?;
    let filename = file_path.display().to_string();

    // Lex + parse (identifier resolution and type check run inside parse).
    let mut parser = ParserState::new(filename.clone(), source.clone());
    parser.parse();

    let has_imports = parser
        .arena
        .node(parser.root)
        .children
        .iter()
        .any(|&c| parser.arena.node(c).kind == NodeKind::ImportStatement);

    let mut program = if has_imports {
        resolve_and_merge(file_path, &source, &filename, &parser)?
    } else {
        if !parser.errors.is_empty() {
            reporter::report_all(&parser.errors, &source, &filename);
            bail!("Parsing failed with {} errors", parser.errors.len());
        }
        MergedProgram::from_parser(parser)
    };

    // Ownership preprocessing: deterministic drop insertion.
    enable_and_insert_drops(&mut program.arena, program.root, &program.registries.catalog);
    tracing::debug!("preprocessing (drop insertion) completed");

    // Ownership / move / borrow validation.
    let mut analyzer = SemanticAnalyzer::new(
        &program.arena,
        &program.registries.catalog,
        &program.registries,
        &source,
    );
    if !analyzer.analyze(program.root) {
        reporter::report_all(&analyzer.errors, &source, &filename);
        bail!(
            "Semantic analysis failed with {} errors",
            analyzer.errors.len()
        );
    }
    tracing::debug!("semantic analysis completed");

    // Lower to C.
    let c_source = CEmitter::new(&program.arena, program.root, &program.registries).generate();

    let base_name = file_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("out");
    let temp_dir = Path::new("build").join("temp");
    std::fs::create_dir_all(&temp_dir)
        .with_context(|| format!("Failed to create {}", temp_dir.display()))?;
    let c_file = temp_dir.join(format!("{base_name}.c"));
    std::fs::write(&c_file, &c_source)
        .with_context(|| format!("Failed to write C code to {}", c_file.display()))?;
    tracing::debug!(path = %c_file.display(), "transpiled code written");

    if args.emit_c {
        return Ok(CompileOutcome::CSource(c_file));
    }

    // Invoke the host C toolchain.
    let compiler = match &args.cc {
        Some(cc) => cc.clone(),
        None => toolchain::detect_c_compiler()
            .context("No C compiler found. Install gcc/clang or specify with --cc")?,
    };
    tracing::debug!(compiler, "using C compiler");

    let output_path = match &args.output {
        Some(output) => output.clone(),
        None => Path::new("build").join(base_name),
    };
    toolchain::compile_c(&compiler, &c_file, &output_path)?;

    tracing::info!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        binary = %output_path.display(),
        "compilation completed"
    );
    Ok(CompileOutcome::Binary(output_path))
}

/// Resolve the import graph, merge exports, and discharge the deferred
/// undefined-identifier diagnostics against the merged symbol table.
fn resolve_and_merge(
    file_path: &Path,
    source: &str,
    filename: &str,
    parser: &ParserState,
) -> Result<MergedProgram> {
    // The import root defaults to the directory containing the entry file.
    let import_root = file_path
        .canonicalize()
        .unwrap_or_else(|_| file_path.to_path_buf())
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let mut resolver = ModuleResolver::new(import_root);
    let entry_abs = file_path
        .canonicalize()
        .unwrap_or_else(|_| file_path.to_path_buf());
    let entry_dotted = resolver.path_to_dotted(&entry_abs);
    let entry_imports = collect_imports(&parser.arena, parser.root);

    let topo = resolver
        .load_dependencies(&entry_dotted, &entry_imports)
        .map_err(|e| anyhow::anyhow!("Import resolution failed: {e}"))?;
    tracing::debug!("import resolution completed");

    let mut program = build_merged_program(&resolver, parser, &topo);
    tracing::debug!("import merge completed");

    // Deferred undefined names are valid if the merge provided them.
    let mut errors: Vec<Diagnostic> = parser.errors.clone();
    errors.append(&mut program.errors);
    for (name, token) in &parser.deferred_undefined {
        if program.merged_symbols.contains_key(name) || program.has_top_level_class(name) {
            continue;
        }
        let message = format!("Variable '{name}' not defined");
        errors.push(match token {
            Some(token) => Diagnostic::at_offset(message, source, token.index),
            None => Diagnostic::unpositioned(message),
        });
    }

    if !errors.is_empty() {
        reporter::report_all(&errors, source, filename);
        bail!("Parsing failed with {} errors", errors.len());
    }
    Ok(program)
}
