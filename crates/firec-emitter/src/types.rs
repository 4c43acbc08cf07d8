//! firescript type -> C type mapping.

use firec_parser::Registries;

/// C type for a canonical firescript base type. Arrays map to `fs_array *`
/// regardless of element type; classes map to struct pointers.
#[must_use]
pub fn c_type(base: &str, is_array: bool, registries: &Registries) -> String {
    if is_array {
        return "fs_array *".to_string();
    }
    match base {
        "int8" => "int8_t".to_string(),
        "int16" => "int16_t".to_string(),
        "int32" => "int32_t".to_string(),
        "int64" => "int64_t".to_string(),
        "uint8" => "uint8_t".to_string(),
        "uint16" => "uint16_t".to_string(),
        "uint32" => "uint32_t".to_string(),
        "uint64" => "uint64_t".to_string(),
        "float32" => "float".to_string(),
        "float64" => "double".to_string(),
        "float128" => "long double".to_string(),
        "bool" => "bool".to_string(),
        "char" => "char".to_string(),
        "string" => "char *".to_string(),
        "void" => "void".to_string(),
        name if registries.user_types.contains(name) => format!("struct {name} *"),
        other => format!("/* {other} */ void *"),
    }
}

#[must_use]
pub fn is_signed_int(base: &str) -> bool {
    matches!(base, "int8" | "int16" | "int32" | "int64")
}

#[must_use]
pub fn is_unsigned_int(base: &str) -> bool {
    matches!(base, "uint8" | "uint16" | "uint32" | "uint64")
}

#[must_use]
pub fn is_float(base: &str) -> bool {
    matches!(base, "float32" | "float64" | "float128")
}

/// Mangled name for a monomorphised generic instance: `name__t1_t2`.
#[must_use]
pub fn mangle_generic(name: &str, type_args: &[String]) -> String {
    let mut out = String::from(name);
    out.push_str("__");
    out.push_str(&type_args.join("_"));
    out
}
