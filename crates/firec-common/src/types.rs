//! The canonical firescript type model and value categories.
//!
//! Types are canonical strings (`int32`, `float64`, `string`, a class name,
//! or a single-uppercase-letter generic parameter). Arrays are a base type
//! plus an `is_array` flag; the display form is `T[]`.
//!
//! Value categories:
//! - Copyable: all numeric scalars, `bool`, `char`, `string`, and classes
//!   explicitly registered as copyable.
//! - Owned: arrays (always), user classes by default, future closures.

use serde::{Deserialize, Serialize};

/// The fixed-width integer family.
pub const INTEGER_TYPES: [&str; 8] = [
    "int8", "int16", "int32", "int64", "uint8", "uint16", "uint32", "uint64",
];

/// The float family.
pub const FLOAT_TYPES: [&str; 3] = ["float32", "float64", "float128"];

#[must_use]
pub fn is_integer_type(name: &str) -> bool {
    INTEGER_TYPES.contains(&name)
}

#[must_use]
pub fn is_float_type(name: &str) -> bool {
    FLOAT_TYPES.contains(&name)
}

#[must_use]
pub fn is_numeric_type(name: &str) -> bool {
    is_integer_type(name) || is_float_type(name)
}

/// Copyable scalar primitives (numerics plus `bool`, `char`, `string`).
#[must_use]
pub fn is_copyable_primitive(name: &str) -> bool {
    is_numeric_type(name) || matches!(name, "bool" | "char" | "string")
}

/// A single-uppercase-letter generic type parameter (`T`, `U`, ...).
///
/// These are treated as "maybe-Owned" by borrow validation.
#[must_use]
pub fn is_generic_param_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if c.is_ascii_uppercase())
}

/// Display form of a type: `base` or `base[]`.
#[must_use]
pub fn display_type(base: &str, is_array: bool) -> String {
    if is_array {
        format!("{base}[]")
    } else {
        base.to_string()
    }
}

/// Split a display form back into `(base, is_array)`.
#[must_use]
pub fn split_array_type(name: &str) -> (&str, bool) {
    match name.strip_suffix("[]") {
        Some(base) => (base, true),
        None => (name, false),
    }
}

/// Ownership classification of a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueCategory {
    Owned,
    Copyable,
}

/// The set of user-defined classes and which of them are copyable.
///
/// Populated by the parser as class definitions are seen, merged across
/// modules by the resolver, and consulted by the ownership passes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OwnershipCatalog {
    user_classes: Vec<String>,
    copyable_classes: Vec<String>,
}

impl OwnershipCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user-defined class and its ownership category.
    pub fn register_class(&mut self, name: &str, copyable: bool) {
        if !self.user_classes.iter().any(|c| c == name) {
            self.user_classes.push(name.to_string());
        }
        let marked = self.copyable_classes.iter().position(|c| c == name);
        match (copyable, marked) {
            (true, None) => self.copyable_classes.push(name.to_string()),
            (false, Some(i)) => {
                self.copyable_classes.remove(i);
            }
            _ => {}
        }
    }

    /// Merge another catalog into this one (union of both sets).
    pub fn merge(&mut self, other: &OwnershipCatalog) {
        for class in &other.user_classes {
            let copyable = other.copyable_classes.iter().any(|c| c == class);
            if !self.user_classes.iter().any(|c| c == class) {
                self.register_class(class, copyable);
            }
        }
    }

    #[must_use]
    pub fn is_user_class(&self, name: &str) -> bool {
        self.user_classes.iter().any(|c| c == name)
    }

    /// Arrays are always Owned; user classes are Owned unless marked
    /// copyable; primitives are never Owned.
    #[must_use]
    pub fn is_owned(&self, base_type: Option<&str>, is_array: bool) -> bool {
        let Some(base) = base_type else {
            return false;
        };
        if is_array {
            return true;
        }
        if self.is_user_class(base) {
            return !self.copyable_classes.iter().any(|c| c == base);
        }
        false
    }

    #[must_use]
    pub fn is_copyable(&self, base_type: Option<&str>, is_array: bool) -> bool {
        let Some(base) = base_type else {
            return false;
        };
        if is_array {
            return false;
        }
        is_copyable_primitive(base) || self.copyable_classes.iter().any(|c| c == base)
    }

    /// Classify a typed value, if it falls into either category.
    #[must_use]
    pub fn value_category(&self, base_type: Option<&str>, is_array: bool) -> Option<ValueCategory> {
        if self.is_owned(base_type, is_array) {
            Some(ValueCategory::Owned)
        } else if self.is_copyable(base_type, is_array) {
            Some(ValueCategory::Copyable)
        } else {
            None
        }
    }
}
