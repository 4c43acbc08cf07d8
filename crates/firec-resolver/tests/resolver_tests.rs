//! Integration tests for module loading, cycle detection, and merging,
//! built on real `.fire` trees in temp directories.

use std::fs;
use std::path::Path;

use firec_parser::{NodeKind, ParserState};
use firec_resolver::{
    MergedProgram, ModuleResolver, ResolveError, build_merged_program, collect_imports,
};

fn write_module(dir: &Path, name: &str, source: &str) {
    fs::write(dir.join(name), source).expect("write module");
}

fn parse_entry(dir: &Path, name: &str) -> ParserState {
    let path = dir.join(name);
    let source = fs::read_to_string(&path).expect("read entry");
    let mut parser = ParserState::new(path.display().to_string(), source);
    parser.parse();
    parser
}

fn resolve(dir: &Path, entry: &str) -> Result<(ParserState, MergedProgram), ResolveError> {
    let parser = parse_entry(dir, entry);
    let mut resolver = ModuleResolver::new(dir);
    let entry_dotted = entry.trim_end_matches(".fire").to_string();
    let imports = collect_imports(&parser.arena, parser.root);
    let topo = resolver.load_dependencies(&entry_dotted, &imports)?;
    let merged = build_merged_program(&resolver, &parser, &topo);
    Ok((parser, merged))
}

const MODULE_A: &str = "int32 add(int32 x, int32 y) {\n    return x + y;\n}\n\
                        string greet() {\n    return \"hello\";\n}\n\
                        int32 TEN = 10;\n";

#[test]
fn wildcard_import_merges_exports_before_entry_statements() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_module(dir.path(), "a.fire", MODULE_A);
    write_module(
        dir.path(),
        "b.fire",
        "import a.*\n\nprint(add(2, TEN));\nprint(greet());\n",
    );

    let (parser, merged) = resolve(dir.path(), "b.fire").expect("resolve");
    assert!(parser.errors.is_empty(), "errors: {:?}", parser.errors);
    assert!(merged.errors.is_empty(), "merge errors: {:?}", merged.errors);

    // Merged root order: add, greet, TEN, then the two print calls.
    let names: Vec<(NodeKind, String)> = merged
        .arena
        .node(merged.root)
        .children
        .iter()
        .map(|&c| {
            let node = merged.arena.node(c);
            (node.kind, node.name.clone())
        })
        .collect();
    assert_eq!(names[0], (NodeKind::FunctionDefinition, "add".to_string()));
    assert_eq!(names[1], (NodeKind::FunctionDefinition, "greet".to_string()));
    assert_eq!(names[2], (NodeKind::VariableDeclaration, "TEN".to_string()));
    assert_eq!(names[3].0, NodeKind::FunctionCall);
    assert_eq!(names[4].0, NodeKind::FunctionCall);

    // The merged symbol table discharges the deferred names.
    assert!(merged.merged_symbols.contains_key("add"));
    assert!(merged.merged_symbols.contains_key("greet"));
    assert_eq!(
        merged.merged_symbols["TEN"],
        (Some("int32".to_string()), false)
    );
    for (name, _) in &parser.deferred_undefined {
        assert!(
            merged.merged_symbols.contains_key(name),
            "deferred name {name} not discharged"
        );
    }

    // Registries from the dependency are visible downstream.
    assert!(merged.registries.user_functions.contains_key("add"));
}

#[test]
fn cyclic_imports_are_detected_with_the_cycle_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_module(dir.path(), "x.fire", "import y.*\nint32 X = 1;\n");
    write_module(dir.path(), "y.fire", "import x.*\nint32 Y = 2;\n");

    let error = resolve(dir.path(), "x.fire").expect_err("cycle must fail");
    assert_eq!(error.to_string(), "Cyclic import detected: x -> y -> x");
}

#[test]
fn missing_modules_abort_with_the_module_name() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_module(dir.path(), "main.fire", "import missing.*\nprint(1);\n");

    let error = resolve(dir.path(), "main.fire").expect_err("must fail");
    assert!(
        error.to_string().starts_with("Module not found: missing"),
        "got: {error}"
    );
}

#[test]
fn conflicting_exports_first_wins_and_is_reported() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_module(dir.path(), "m1.fire", "int32 shared() { return 1; }\n");
    write_module(dir.path(), "m2.fire", "int32 shared() { return 2; }\n");
    write_module(
        dir.path(),
        "main.fire",
        "import m1.*\nimport m2.*\nprint(shared());\n",
    );

    let (_, merged) = resolve(dir.path(), "main.fire").expect("resolve");
    assert!(
        merged
            .errors
            .iter()
            .any(|e| e.message.contains("Conflicting top-level symbol 'shared'")),
        "merge errors: {:?}",
        merged.errors
    );
    let shared_count = merged
        .arena
        .node(merged.root)
        .children
        .iter()
        .filter(|&&c| merged.arena.node(c).name == "shared")
        .count();
    assert_eq!(shared_count, 1);
}

#[test]
fn entry_definitions_replace_imported_ones_in_place() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_module(dir.path(), "a.fire", MODULE_A);
    write_module(
        dir.path(),
        "main.fire",
        "import a.*\nint32 TEN = 99;\nprint(TEN);\n",
    );

    let (_, merged) = resolve(dir.path(), "main.fire").expect("resolve");
    assert!(
        merged
            .errors
            .iter()
            .any(|e| e.message.contains("Top-level symbol 'TEN' in entry conflicts")),
        "merge errors: {:?}",
        merged.errors
    );

    // Exactly one TEN, still in the imported-symbol position (before the
    // print call), holding the entry's initializer.
    let children = merged.arena.node(merged.root).children.clone();
    let tens: Vec<usize> = children
        .iter()
        .enumerate()
        .filter(|&(_, &c)| merged.arena.node(c).name == "TEN")
        .map(|(i, _)| i)
        .collect();
    assert_eq!(tens.len(), 1);
    let ten = children[tens[0]];
    let init = merged.arena.node(ten).children[0];
    assert_eq!(merged.arena.node(init).name, "99");
}

#[test]
fn external_packages_are_rejected_at_parse_time() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_module(dir.path(), "main.fire", "import @vendor/pkg\nprint(1);\n");

    let parser = parse_entry(dir.path(), "main.fire");
    assert!(
        parser
            .errors
            .iter()
            .any(|e| e.message.contains("External packages are not supported")),
        "errors: {:?}",
        parser.errors
    );
}

#[test]
fn firescript_prefix_rewrites_to_a_dotted_path() {
    let mut parser = ParserState::new(
        "test.fire".to_string(),
        "import @firescript/std.math\nprint(1);\n".to_string(),
    );
    parser.parse();
    let imports = collect_imports(&parser.arena, parser.root);
    assert_eq!(imports.len(), 1);
    assert_eq!(imports[0].module_path, "firescript.std.math");
}

#[test]
fn dotted_paths_map_to_nested_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let resolver = ModuleResolver::new(dir.path());
    let path = resolver.dotted_to_path("a.b.c");
    assert_eq!(path, dir.path().join("a").join("b").join("c.fire"));
    assert_eq!(resolver.path_to_dotted(&path), "a.b.c");
}

#[test]
fn transitive_dependencies_come_first_in_topological_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_module(dir.path(), "base.fire", "int32 BASE = 1;\n");
    write_module(dir.path(), "mid.fire", "import base.*\nint32 MID = 2;\n");
    write_module(dir.path(), "main.fire", "import mid.*\nprint(MID);\n");

    let parser = parse_entry(dir.path(), "main.fire");
    let mut resolver = ModuleResolver::new(dir.path());
    let imports = collect_imports(&parser.arena, parser.root);
    let topo = resolver.load_dependencies("main", &imports).expect("load");
    assert_eq!(topo, vec!["base".to_string(), "mid".to_string()]);
}

#[test]
fn parse_errors_in_imported_modules_abort_resolution() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_module(dir.path(), "bad.fire", "int32 broken = ;\n");
    write_module(dir.path(), "main.fire", "import bad.*\nprint(1);\n");

    let error = resolve(dir.path(), "main.fire").expect_err("must fail");
    assert!(
        error.to_string().starts_with("Parse error in"),
        "got: {error}"
    );
}
