//! Module-wide registries built during parsing.
//!
//! The parser fills these while constructing the tree; the module resolver
//! merges them across files so downstream passes see every imported class
//! and function.

use firec_common::OwnershipCatalog;
use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};

/// Signature of one function/method parameter as declared.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParamSig {
    pub name: String,
    /// Declared base type; may be a generic parameter name like `T`.
    pub param_type: String,
    pub is_array: bool,
    pub is_borrowed: bool,
}

/// External signature of a class method (receiver excluded).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodSig {
    pub return_type: Option<String>,
    pub param_types: Vec<String>,
}

/// Return type of a builtin function, if `name` is one.
#[must_use]
pub fn builtin_return_type(name: &str) -> Option<&'static str> {
    Some(match name {
        "print" | "stdout" | "drop" => "void",
        "input" => "string",
        "typeof" => "string",
        // Type constructor builtins map to canonical firescript types.
        "int" | "int32" => "int32",
        "float32" => "float32",
        "float64" => "float64",
        "float128" => "float128",
        "bool" => "bool",
        "string" => "string",
        "char" => "char",
        _ => return None,
    })
}

/// All registries the parser populates for one file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Registries {
    /// Function name -> return type in display form (`int32`, `int32[]`).
    pub user_functions: FxHashMap<String, Option<String>>,
    /// Function name -> declared parameter signatures, in order.
    pub user_function_params: FxHashMap<String, Vec<ParamSig>>,
    /// Generic function name -> type parameter names, in order.
    pub generic_functions: FxHashMap<String, Vec<String>>,
    /// Generic function name -> (type parameter -> constraint string).
    pub generic_constraints: FxHashMap<String, FxHashMap<String, String>>,
    /// All user-defined class names.
    pub user_types: FxHashSet<String>,
    /// Class -> ordered field map (insertion order drives positional
    /// constructor calls).
    pub user_classes: FxHashMap<String, IndexMap<String, String>>,
    /// Class -> base class (single inheritance).
    pub user_class_bases: FxHashMap<String, Option<String>>,
    /// Class -> method -> external signature.
    pub user_methods: FxHashMap<String, FxHashMap<String, MethodSig>>,
    /// Constraint alias -> expanded type-union string.
    pub constraint_aliases: FxHashMap<String, String>,
    /// Ownership classification of user classes.
    pub catalog: OwnershipCatalog,
}

impl Registries {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `other` into `self`. Existing entries win, so merging module
    /// registries into the entry module's keeps the entry's definitions.
    pub fn merge(&mut self, other: &Registries) {
        for (k, v) in &other.user_functions {
            self.user_functions.entry(k.clone()).or_insert_with(|| v.clone());
        }
        for (k, v) in &other.user_function_params {
            self.user_function_params.entry(k.clone()).or_insert_with(|| v.clone());
        }
        for (k, v) in &other.generic_functions {
            self.generic_functions.entry(k.clone()).or_insert_with(|| v.clone());
        }
        for (k, v) in &other.generic_constraints {
            self.generic_constraints.entry(k.clone()).or_insert_with(|| v.clone());
        }
        for k in &other.user_types {
            self.user_types.insert(k.clone());
        }
        for (k, v) in &other.user_classes {
            self.user_classes.entry(k.clone()).or_insert_with(|| v.clone());
        }
        for (k, v) in &other.user_class_bases {
            self.user_class_bases.entry(k.clone()).or_insert_with(|| v.clone());
        }
        for (k, v) in &other.user_methods {
            self.user_methods.entry(k.clone()).or_insert_with(|| v.clone());
        }
        for (k, v) in &other.constraint_aliases {
            self.constraint_aliases.entry(k.clone()).or_insert_with(|| v.clone());
        }
        self.catalog.merge(&other.catalog);
    }
}
