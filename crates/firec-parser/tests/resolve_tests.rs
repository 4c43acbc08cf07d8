//! Tests for identifier resolution: scope chain, shadowing, deferral.

use firec_common::ValueCategory;
use firec_parser::{NodeId, NodeKind, ParserState};

fn parse_source(source: &str) -> ParserState {
    let mut parser = ParserState::new("test.fire".to_string(), source.to_string());
    parser.parse();
    parser
}

fn find_identifier(parser: &ParserState, name: &str) -> NodeId {
    fn walk(parser: &ParserState, id: NodeId, name: &str) -> Option<NodeId> {
        let node = parser.arena.node(id);
        if node.kind == NodeKind::Identifier && node.name == name {
            return Some(id);
        }
        for &child in &node.children {
            if let Some(found) = walk(parser, child, name) {
                return Some(found);
            }
        }
        None
    }
    walk(parser, parser.root, name).unwrap_or_else(|| panic!("no identifier {name}"))
}

#[test]
fn shadowing_an_outer_binding_is_an_error() {
    let parser = parse_source("int32 a = 1;\n{\n    int32 a = 2;\n}");
    assert!(
        parser.errors.iter().any(|e| e
            .message
            .contains("Variable 'a' already declared in an outer scope; shadowing not allowed")),
        "errors: {:?}",
        parser.errors
    );
}

#[test]
fn parameter_shadowing_is_an_error() {
    let parser = parse_source("int32 a = 1;\nint32 f(int32 a) { return a; }");
    assert!(
        parser
            .errors
            .iter()
            .any(|e| e.message.contains("Parameter 'a' already declared in an outer scope")),
        "errors: {:?}",
        parser.errors
    );
}

#[test]
fn undefined_identifier_is_reported_immediately_without_imports() {
    let parser = parse_source("print(xyz);");
    assert!(
        parser
            .errors
            .iter()
            .any(|e| e.message.contains("Variable 'xyz' not defined")),
        "errors: {:?}",
        parser.errors
    );
}

#[test]
fn undefined_names_are_deferred_when_imports_are_present() {
    let parser = parse_source("import util.*\nprint(helper(SHARED));");
    assert!(
        !parser
            .errors
            .iter()
            .any(|e| e.message.contains("not defined")),
        "errors: {:?}",
        parser.errors
    );
    let deferred: Vec<&String> = parser.deferred_undefined.iter().map(|(n, _)| n).collect();
    assert!(deferred.contains(&&"SHARED".to_string()));
    assert!(deferred.contains(&&"helper".to_string()));
}

#[test]
fn identifiers_are_annotated_with_type_and_array_flag() {
    let parser = parse_source("int32[] xs = [1, 2];\nint32 n = xs.length();");
    assert!(parser.errors.is_empty(), "errors: {:?}", parser.errors);
    let xs_use = find_identifier(&parser, "xs");
    let node = parser.arena.node(xs_use);
    assert_eq!(node.var_type.as_deref(), Some("int32"));
    assert!(node.is_array);
    assert_eq!(node.value_category, Some(ValueCategory::Owned));
}

#[test]
fn value_categories_follow_the_type_model() {
    let parser = parse_source(
        "class Box { int32 v; }\n\
         int32 a = 1;\n\
         int32[] xs = [1];\n\
         Box b = Box(1);",
    );
    assert!(parser.errors.is_empty(), "errors: {:?}", parser.errors);
    let children = parser.arena.node(parser.root).children.clone();
    let scalar = parser.arena.node(children[1]);
    assert_eq!(scalar.value_category, Some(ValueCategory::Copyable));
    let array = parser.arena.node(children[2]);
    assert_eq!(array.value_category, Some(ValueCategory::Owned));
    let boxed = parser.arena.node(children[3]);
    assert_eq!(boxed.value_category, Some(ValueCategory::Owned));
}

#[test]
fn inner_scope_bindings_do_not_leak_to_siblings() {
    let parser = parse_source("{\n    int32 inner = 1;\n}\nprint(inner);");
    assert!(
        parser
            .errors
            .iter()
            .any(|e| e.message.contains("Variable 'inner' not defined")),
        "errors: {:?}",
        parser.errors
    );
}

#[test]
fn this_resolves_inside_method_bodies() {
    let source = "class Counter {\n\
                  int32 value;\n\
                  int32 get() { return this.value; }\n\
                  }";
    let parser = parse_source(source);
    assert!(parser.errors.is_empty(), "errors: {:?}", parser.errors);
    let this_use = find_identifier(&parser, "this");
    assert_eq!(parser.arena.node(this_use).var_type.as_deref(), Some("Counter"));
}
