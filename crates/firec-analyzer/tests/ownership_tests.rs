//! Tests for move/borrow validation over the drop-annotated tree.

use firec_analyzer::SemanticAnalyzer;
use firec_parser::ParserState;
use firec_preprocessor::enable_and_insert_drops;

/// Parse, insert drops, and analyze, mirroring the driver's pass order.
fn analyze(source: &str) -> (bool, Vec<String>) {
    let mut parser = ParserState::new("test.fire".to_string(), source.to_string());
    parser.parse();
    assert!(parser.errors.is_empty(), "parse errors: {:?}", parser.errors);
    let root = parser.root;
    let catalog = parser.registries.catalog.clone();
    enable_and_insert_drops(&mut parser.arena, root, &catalog);

    let mut analyzer = SemanticAnalyzer::new(&parser.arena, &catalog, &parser.registries, source);
    let ok = analyzer.analyze(root);
    let messages = analyzer.errors.iter().map(|e| e.message.clone()).collect();
    (ok, messages)
}

fn contains(messages: &[String], needle: &str) -> bool {
    messages.iter().any(|m| m.contains(needle))
}

#[test]
fn moving_an_array_invalidates_the_source_binding() {
    let (ok, messages) = analyze(
        "int32[] xs = [1, 2, 3];\n\
         int32[] ys = xs;\n\
         print(xs.length());",
    );
    assert!(!ok);
    assert!(
        contains(&messages, "variable 'xs' was moved, cannot use it here"),
        "messages: {messages:?}"
    );
}

#[test]
fn copyable_initializers_copy_instead_of_moving() {
    let (ok, messages) = analyze(
        "int32 a = 1;\n\
         int32 b = a;\n\
         print(a);",
    );
    assert!(ok, "messages: {messages:?}");
}

#[test]
fn borrowing_a_copyable_primitive_is_an_error() {
    let (ok, messages) = analyze("void f(&int32 n) {\n    print(n);\n}");
    assert!(!ok);
    assert!(
        contains(&messages, "Cannot borrow Copyable type 'int32'"),
        "messages: {messages:?}"
    );
}

#[test]
fn borrowing_an_owned_array_is_allowed() {
    let (ok, messages) = analyze("void f(&int32[] xs) {\n    print(xs.length());\n}");
    assert!(ok, "messages: {messages:?}");
}

#[test]
fn borrowing_a_generic_parameter_is_allowed() {
    let (ok, messages) = analyze("void f<T: int32 | float64>(&T value) {\n    print(1);\n}");
    assert!(ok, "messages: {messages:?}");
}

#[test]
fn passing_owned_values_to_non_borrowed_parameters_moves_them() {
    let (ok, messages) = analyze(
        "void consume(int32[] xs) {\n    print(xs.length());\n}\n\
         int32[] data = [1];\n\
         consume(data);\n\
         print(data.length());",
    );
    assert!(!ok);
    assert!(
        contains(&messages, "variable 'data' was moved, cannot use it here"),
        "messages: {messages:?}"
    );
}

#[test]
fn passing_owned_values_to_borrowed_parameters_does_not_move() {
    let (ok, messages) = analyze(
        "void peek(&int32[] xs) {\n    print(xs.length());\n}\n\
         int32[] data = [1];\n\
         peek(data);\n\
         print(data.length());",
    );
    assert!(ok, "messages: {messages:?}");
}

#[test]
fn preprocessor_drops_do_not_trip_use_after_move() {
    // The trailing drop(xs) after the move would be a use-after-move if the
    // analyzer recursed into drop arguments.
    let (ok, messages) = analyze(
        "int32[] xs = [1];\n\
         int32[] ys = xs;\n\
         print(ys.length());",
    );
    assert!(ok, "messages: {messages:?}");
}

#[test]
fn assignment_to_a_moved_binding_is_reported() {
    let (ok, messages) = analyze(
        "int32[] xs = [1];\n\
         int32[] ys = xs;\n\
         xs = [2];",
    );
    assert!(!ok);
    assert!(
        contains(&messages, "variable 'xs' was moved"),
        "messages: {messages:?}"
    );
}

#[test]
fn moves_inside_branches_poison_the_binding_conservatively() {
    let (ok, messages) = analyze(
        "int32[] xs = [1];\n\
         if (true) {\n    int32[] ys = xs;\n    print(ys.length());\n}\n\
         print(xs.length());",
    );
    assert!(!ok);
    assert!(
        contains(&messages, "variable 'xs' was moved"),
        "messages: {messages:?}"
    );
}

#[test]
fn super_without_a_base_constructor_is_reported() {
    let (ok, messages) = analyze(
        "class Base {\n    int32 id;\n}\n\
         class Derived from Base {\n\
         Derived() { this.super(); }\n\
         }",
    );
    assert!(!ok);
    assert!(
        contains(&messages, "No constructor defined for base type 'Base'"),
        "messages: {messages:?}"
    );
}

#[test]
fn super_with_a_base_constructor_is_clean() {
    let (ok, messages) = analyze(
        "class Base {\n    int32 id;\n    Base(int32 id) { this.id = id; }\n}\n\
         class Derived from Base {\n\
         Derived(int32 id) { this.super(id); }\n\
         }",
    );
    assert!(ok, "messages: {messages:?}");
}
