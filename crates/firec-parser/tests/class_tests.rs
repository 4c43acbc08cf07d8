//! Tests for class parsing and inheritance materialization.

use firec_parser::{NodeId, NodeKind, ParserState};

fn parse_source(source: &str) -> ParserState {
    let mut parser = ParserState::new("test.fire".to_string(), source.to_string());
    parser.parse();
    parser
}

fn class_named(parser: &ParserState, name: &str) -> NodeId {
    parser
        .arena
        .node(parser.root)
        .children
        .iter()
        .copied()
        .find(|&c| {
            let node = parser.arena.node(c);
            node.kind == NodeKind::ClassDefinition && node.name == name
        })
        .unwrap_or_else(|| panic!("no class named {name}"))
}

#[test]
fn fields_register_in_declaration_order() {
    let parser = parse_source("class Point { int32 x; int32 y; string label; }");
    assert!(parser.errors.is_empty(), "errors: {:?}", parser.errors);
    let fields = &parser.registries.user_classes["Point"];
    let names: Vec<&String> = fields.keys().collect();
    assert_eq!(names, vec!["x", "y", "label"]);
    assert!(parser.registries.user_types.contains("Point"));
    assert!(parser.registries.catalog.is_owned(Some("Point"), false));
}

#[test]
fn methods_get_a_synthetic_receiver_and_register_signatures() {
    let source = "class Counter {\n\
                  int32 value;\n\
                  int32 bump(int32 by) { return by; }\n\
                  }";
    let parser = parse_source(source);
    assert!(parser.errors.is_empty(), "errors: {:?}", parser.errors);

    let class = class_named(&parser, "Counter");
    let method = parser
        .arena
        .node(class)
        .children
        .iter()
        .copied()
        .find(|&c| parser.arena.node(c).kind == NodeKind::ClassMethodDefinition)
        .expect("method node");
    let receiver = parser.arena.node(method).children[0];
    let receiver_node = parser.arena.node(receiver);
    assert_eq!(receiver_node.kind, NodeKind::Parameter);
    assert_eq!(receiver_node.name, "this");
    assert!(receiver_node.is_receiver);
    assert_eq!(receiver_node.var_type.as_deref(), Some("Counter"));

    // The external signature excludes the receiver.
    let sig = &parser.registries.user_methods["Counter"]["bump"];
    assert_eq!(sig.param_types, vec!["int32".to_string()]);
    assert_eq!(sig.return_type.as_deref(), Some("int32"));
}

#[test]
fn constructor_without_return_type_returns_the_class() {
    let source = "class Point {\n\
                  int32 x;\n\
                  Point(int32 x) { this.x = x; }\n\
                  }";
    let parser = parse_source(source);
    assert!(parser.errors.is_empty(), "errors: {:?}", parser.errors);
    let sig = &parser.registries.user_methods["Point"]["Point"];
    assert_eq!(sig.return_type.as_deref(), Some("Point"));
    assert_eq!(sig.param_types, vec!["int32".to_string()]);
}

#[test]
fn inherited_methods_are_copied_with_receiver_rebound() {
    let source = "class Animal {\n\
                  string name;\n\
                  string describe() { return this.name; }\n\
                  }\n\
                  class Dog from Animal {\n\
                  int32 legs;\n\
                  }";
    let parser = parse_source(source);
    assert!(parser.errors.is_empty(), "errors: {:?}", parser.errors);

    let dog = class_named(&parser, "Dog");
    let inherited = parser
        .arena
        .node(dog)
        .children
        .iter()
        .copied()
        .find(|&c| {
            let node = parser.arena.node(c);
            node.kind == NodeKind::ClassMethodDefinition && node.name == "describe"
        })
        .expect("inherited method present under its original name");
    let node = parser.arena.node(inherited);
    assert_eq!(node.class_name.as_deref(), Some("Dog"));
    assert!(!node.is_constructor);
    let receiver = parser.arena.node(inherited).children[0];
    assert_eq!(parser.arena.node(receiver).var_type.as_deref(), Some("Dog"));

    // Inherited fields are prepended, so the ordered field map starts with
    // the base's fields.
    let fields = &parser.registries.user_classes["Dog"];
    let names: Vec<&String> = fields.keys().collect();
    assert_eq!(names, vec!["name", "legs"]);
}

#[test]
fn derived_methods_override_inherited_ones() {
    let source = "class Animal {\n\
                  string name;\n\
                  string describe() { return this.name; }\n\
                  }\n\
                  class Dog from Animal {\n\
                  string describe() { return \"dog\"; }\n\
                  }";
    let parser = parse_source(source);
    assert!(parser.errors.is_empty(), "errors: {:?}", parser.errors);

    let dog = class_named(&parser, "Dog");
    let describes: Vec<NodeId> = parser
        .arena
        .node(dog)
        .children
        .iter()
        .copied()
        .filter(|&c| {
            let node = parser.arena.node(c);
            node.kind == NodeKind::ClassMethodDefinition && node.name == "describe"
        })
        .collect();
    assert_eq!(describes.len(), 1, "override must not duplicate the method");
}

#[test]
fn inherited_field_conflict_is_an_error() {
    let source = "class Base { int32 id; }\nclass Derived from Base { int32 id; }";
    let parser = parse_source(source);
    assert!(
        parser.errors.iter().any(|e| e
            .message
            .contains("conflicts with inherited field from 'Base'")),
        "errors: {:?}",
        parser.errors
    );
}

#[test]
fn self_inheritance_is_an_error() {
    let parser = parse_source("class Snake from Snake { int32 x; }");
    assert!(
        parser
            .errors
            .iter()
            .any(|e| e.message.contains("cannot inherit from itself")),
        "errors: {:?}",
        parser.errors
    );
}

#[test]
fn super_call_lowers_inside_constructors() {
    let source = "class Base {\n\
                  int32 id;\n\
                  Base(int32 id) { this.id = id; }\n\
                  }\n\
                  class Derived from Base {\n\
                  Derived(int32 id) { this.super(id); }\n\
                  }";
    let parser = parse_source(source);
    assert!(parser.errors.is_empty(), "errors: {:?}", parser.errors);

    let derived = class_named(&parser, "Derived");
    let ctor = parser
        .arena
        .node(derived)
        .children
        .iter()
        .copied()
        .find(|&c| parser.arena.node(c).is_constructor)
        .expect("constructor");
    let body = *parser.arena.node(ctor).children.last().expect("body");
    let super_call = parser.arena.node(body).children[0];
    let node = parser.arena.node(super_call);
    assert_eq!(node.kind, NodeKind::SuperCall);
    assert_eq!(node.base_class.as_deref(), Some("Base"));
}

#[test]
fn super_arity_mismatch_is_reported() {
    let source = "class Base {\n\
                  int32 id;\n\
                  Base(int32 id) { this.id = id; }\n\
                  }\n\
                  class Derived from Base {\n\
                  Derived() { this.super(1, 2); }\n\
                  }";
    let parser = parse_source(source);
    assert!(
        parser
            .errors
            .iter()
            .any(|e| e.message.contains("Super constructor 'Base' expected 1 args, got 2")),
        "errors: {:?}",
        parser.errors
    );
}

#[test]
fn borrowed_receiver_is_accepted_as_first_parameter() {
    let source = "class Counter {\n\
                  int32 value;\n\
                  int32 get(&this) { return this.value; }\n\
                  }";
    let parser = parse_source(source);
    assert!(parser.errors.is_empty(), "errors: {:?}", parser.errors);
    let class = class_named(&parser, "Counter");
    let method = parser
        .arena
        .node(class)
        .children
        .iter()
        .copied()
        .find(|&c| parser.arena.node(c).kind == NodeKind::ClassMethodDefinition)
        .expect("method");
    let receiver = parser.arena.node(method).children[0];
    assert!(parser.arena.node(receiver).is_borrowed);
}
