//! Tests for generic functions: parameters, constraints, inference.

use firec_parser::{NodeId, NodeKind, ParserState};

fn parse_source(source: &str) -> ParserState {
    let mut parser = ParserState::new("test.fire".to_string(), source.to_string());
    parser.parse();
    parser
}

const MAX_FN: &str = "T max<T: int32 | float64>(T a, T b) {\n\
                      if (a > b) { return a; }\n\
                      return b;\n\
                      }\n";

fn find_call(parser: &ParserState, name: &str) -> NodeId {
    fn walk(parser: &ParserState, id: NodeId, name: &str) -> Option<NodeId> {
        let node = parser.arena.node(id);
        if node.kind == NodeKind::FunctionCall && node.name == name {
            return Some(id);
        }
        for &child in &node.children {
            if let Some(found) = walk(parser, child, name) {
                return Some(found);
            }
        }
        None
    }
    walk(parser, parser.root, name).unwrap_or_else(|| panic!("no call to {name}"))
}

#[test]
fn generic_definition_registers_params_and_constraints() {
    let parser = parse_source(MAX_FN);
    assert!(parser.errors.is_empty(), "errors: {:?}", parser.errors);
    assert_eq!(parser.registries.generic_functions["max"], vec!["T".to_string()]);
    assert_eq!(
        parser.registries.generic_constraints["max"]["T"],
        "int32 | float64"
    );
}

#[test]
fn call_site_inference_resolves_concrete_types() {
    let source = format!("{MAX_FN}float64 m = max(1.5, 2.5);");
    let parser = parse_source(&source);
    assert!(parser.errors.is_empty(), "errors: {:?}", parser.errors);
    let call = find_call(&parser, "max");
    let node = parser.arena.node(call);
    assert_eq!(node.type_args, vec!["float64".to_string()]);
    assert_eq!(node.return_type.as_deref(), Some("float64"));
}

#[test]
fn conflicting_inference_is_reported_and_leaves_type_args_empty() {
    let source = format!("{MAX_FN}float64 m = max(1, 2.5);");
    let parser = parse_source(&source);
    assert!(
        parser.errors.iter().any(|e| e
            .message
            .contains("Could not infer type arguments for generic function 'max'")),
        "errors: {:?}",
        parser.errors
    );
    let call = find_call(&parser, "max");
    assert!(parser.arena.node(call).type_args.is_empty());
}

#[test]
fn explicit_type_arguments_are_accepted() {
    let source = format!("{MAX_FN}int32 m = max<int32>(1, 2);");
    let parser = parse_source(&source);
    assert!(parser.errors.is_empty(), "errors: {:?}", parser.errors);
    let call = find_call(&parser, "max");
    assert_eq!(parser.arena.node(call).type_args, vec!["int32".to_string()]);
}

#[test]
fn constraint_violation_is_reported() {
    let source = format!("{MAX_FN}string m = max(\"a\", \"b\");");
    let parser = parse_source(&source);
    assert!(
        parser.errors.iter().any(|e| e.message.contains(
            "Type 'string' does not satisfy constraint 'int32 | float64' for type parameter 'T'"
        )),
        "errors: {:?}",
        parser.errors
    );
}

#[test]
fn wrong_explicit_type_argument_count_is_reported() {
    let source = format!("{MAX_FN}int32 m = max<int32, int32>(1, 2);");
    let parser = parse_source(&source);
    assert!(
        parser.errors.iter().any(|e| e
            .message
            .contains("Generic function 'max' expects 1 type arguments, got 2")),
        "errors: {:?}",
        parser.errors
    );
}

#[test]
fn constraint_aliases_expand_inline() {
    let source = "constraint Num = int32 | float64;\n\
                  T pick<T: Num>(T a, T b) { return a; }\n";
    let parser = parse_source(source);
    assert!(parser.errors.is_empty(), "errors: {:?}", parser.errors);
    assert_eq!(parser.registries.constraint_aliases["Num"], "int32 | float64");
    assert_eq!(parser.registries.generic_constraints["pick"]["T"], "int32 | float64");
}

#[test]
fn constraint_aliases_expand_recursively() {
    let source = "constraint Ints = int32 | int64;\n\
                  constraint Nums = Ints | float64;\n";
    let parser = parse_source(source);
    assert!(parser.errors.is_empty(), "errors: {:?}", parser.errors);
    assert_eq!(
        parser.registries.constraint_aliases["Nums"],
        "int32 | int64 | float64"
    );
}

#[test]
fn less_than_on_non_generic_name_is_a_comparison() {
    let parser = parse_source("int32 a = 1;\nbool b = a < 2;");
    assert!(parser.errors.is_empty(), "errors: {:?}", parser.errors);
}

#[test]
fn interface_style_constraints_accept_any_type_argument() {
    let source = "T id<T: Comparable>(T a) { return a; }\nint32 x = id(5);";
    let parser = parse_source(source);
    assert!(parser.errors.is_empty(), "errors: {:?}", parser.errors);
}
