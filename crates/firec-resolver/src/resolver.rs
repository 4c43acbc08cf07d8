//! Depth-first module loader with cycle detection and topological ordering.

use std::path::{Path, PathBuf};

use firec_parser::ParserState;
use indexmap::IndexMap;
use rustc_hash::FxHashSet;

use crate::module::{Module, ResolveError, collect_exports, collect_imports, is_loadable};

pub struct ModuleResolver {
    import_root: PathBuf,
    /// Loaded modules cached by dotted name, in load order.
    pub modules: IndexMap<String, Module>,
}

impl ModuleResolver {
    /// `import_root` is the directory dotted paths resolve against; it
    /// defaults to the entry file's directory at the call site.
    #[must_use]
    pub fn new(import_root: impl Into<PathBuf>) -> Self {
        Self {
            import_root: import_root.into(),
            modules: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn import_root(&self) -> &Path {
        &self.import_root
    }

    /// `a.b.c` -> `<root>/a/b/c.fire`
    #[must_use]
    pub fn dotted_to_path(&self, dotted: &str) -> PathBuf {
        let mut path = self.import_root.clone();
        for segment in dotted.split('.') {
            path.push(segment);
        }
        path.set_extension("fire");
        path
    }

    /// Reverse map: strip the extension, relativize against the root, and
    /// join with dots. Files outside the root fall back to their stem.
    #[must_use]
    pub fn path_to_dotted(&self, path: &Path) -> String {
        let stripped = path.strip_prefix(&self.import_root).unwrap_or(path);
        let no_ext = stripped.with_extension("");
        let dotted: Vec<String> = no_ext
            .components()
            .filter_map(|c| c.as_os_str().to_str().map(str::to_string))
            .collect();
        if stripped == path && path.is_absolute() {
            // Outside the import root: best-effort dotted name from the stem.
            return path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
        }
        dotted.join(".")
    }

    /// Load every dependency reachable from the entry module's imports, then
    /// return the topological order (dependencies before dependents). The
    /// entry itself is not cached; its dotted name anchors cycle detection.
    pub fn load_dependencies(
        &mut self,
        entry_dotted: &str,
        entry_imports: &[firec_parser::ImportData],
    ) -> Result<Vec<String>, ResolveError> {
        let mut stack = vec![entry_dotted.to_string()];
        for import in entry_imports {
            if !is_loadable(import) {
                continue;
            }
            check_module_path(&import.module_path)?;
            self.load_module(&import.module_path, &mut stack)?;
        }
        Ok(self.topological_order())
    }

    fn load_module(&mut self, dotted: &str, stack: &mut Vec<String>) -> Result<(), ResolveError> {
        if self.modules.contains_key(dotted) {
            return Ok(());
        }
        // Cycle detection: a dotted name already on the active load stack.
        if stack.iter().any(|d| d == dotted) {
            let mut cycle = stack.clone();
            cycle.push(dotted.to_string());
            return Err(ResolveError::CyclicImport { cycle });
        }

        let path = self.dotted_to_path(dotted);
        if !path.is_file() {
            return Err(ResolveError::ModuleNotFound {
                dotted: dotted.to_string(),
                path,
            });
        }

        tracing::debug!(target: "firec_resolver", module = dotted, "loading module");
        let parser = parse_file(&path)?;
        let imports = collect_imports(&parser.arena, parser.root);
        let module = Module {
            dotted: dotted.to_string(),
            path,
            parser,
            imports: imports.clone(),
            exports: IndexMap::new(),
        };
        self.modules.insert(dotted.to_string(), module);

        stack.push(dotted.to_string());
        for import in &imports {
            if import.kind == firec_parser::ImportKind::External {
                return Err(ResolveError::ExternalPackage {
                    module_path: import.module_path.clone(),
                });
            }
            check_module_path(&import.module_path)?;
            self.load_module(&import.module_path, stack)?;
        }
        stack.pop();

        // Exports are collected after dependencies are in place.
        let module = self
            .modules
            .get_mut(dotted)
            .expect("module inserted above");
        module.exports = collect_exports(&module.parser.arena, module.parser.root);
        Ok(())
    }

    /// DFS post-order over the module cache: dependencies precede
    /// dependents.
    #[must_use]
    pub fn topological_order(&self) -> Vec<String> {
        let mut visited: FxHashSet<String> = FxHashSet::default();
        let mut order: Vec<String> = Vec::new();
        let names: Vec<String> = self.modules.keys().cloned().collect();
        for name in &names {
            self.visit(name, &mut visited, &mut order);
        }
        order
    }

    fn visit(&self, dotted: &str, visited: &mut FxHashSet<String>, order: &mut Vec<String>) {
        if !visited.insert(dotted.to_string()) {
            return;
        }
        if let Some(module) = self.modules.get(dotted) {
            for import in &module.imports {
                if is_loadable(import) && self.modules.contains_key(&import.module_path) {
                    self.visit(&import.module_path, visited, order);
                }
            }
        }
        order.push(dotted.to_string());
    }
}

fn check_module_path(module_path: &str) -> Result<(), ResolveError> {
    if module_path.is_empty() || module_path.starts_with('.') {
        return Err(ResolveError::RelativeImport {
            module_path: module_path.to_string(),
        });
    }
    Ok(())
}

/// Read, lex, and parse one module file. The first accumulated parser error
/// aborts resolution.
fn parse_file(path: &Path) -> Result<ParserState, ResolveError> {
    let content = std::fs::read_to_string(path).map_err(|source| ResolveError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut parser = ParserState::new(path.display().to_string(), content);
    parser.parse();
    if let Some(first) = parser.errors.first() {
        return Err(ResolveError::Parse {
            path: path.to_path_buf(),
            message: first.message.clone(),
            line: first.line,
            column: first.column,
        });
    }
    Ok(parser)
}
