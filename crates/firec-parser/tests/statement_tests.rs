//! Tests for statement parsing and error recovery.

use firec_parser::{NodeKind, ParserState};

fn parse_source(source: &str) -> ParserState {
    let mut parser = ParserState::new("test.fire".to_string(), source.to_string());
    parser.parse();
    parser
}

fn top_level_kinds(parser: &ParserState) -> Vec<NodeKind> {
    parser
        .arena
        .node(parser.root)
        .children
        .iter()
        .map(|&c| parser.arena.node(c).kind)
        .collect()
}

#[test]
fn declarations_assignments_and_calls_parse_cleanly() {
    let parser = parse_source("int32 x = 1;\nx = 2;\nprint(x);");
    assert!(parser.errors.is_empty(), "errors: {:?}", parser.errors);
    assert_eq!(
        top_level_kinds(&parser),
        vec![
            NodeKind::VariableDeclaration,
            NodeKind::VariableAssignment,
            NodeKind::FunctionCall,
        ]
    );
}

#[test]
fn missing_semicolon_is_reported_and_parsing_continues() {
    let parser = parse_source("int32 x = 1\nprint(x);");
    assert!(
        parser
            .errors
            .iter()
            .any(|e| e.message.contains("Expected semicolon")),
        "errors: {:?}",
        parser.errors
    );
    // The declaration itself still made it into the tree.
    assert_eq!(top_level_kinds(&parser)[0], NodeKind::VariableDeclaration);
}

#[test]
fn unknown_byte_reports_once_and_does_not_derail_following_tokens() {
    let parser = parse_source("int32 x = 1;\n$\nint32 y = 2;");
    let unknown_errors: Vec<_> = parser
        .errors
        .iter()
        .filter(|e| e.message.contains("Unexpected character"))
        .collect();
    assert_eq!(unknown_errors.len(), 1);
    // Both declarations survived.
    let declarations = top_level_kinds(&parser)
        .into_iter()
        .filter(|k| *k == NodeKind::VariableDeclaration)
        .count();
    assert_eq!(declarations, 2);
}

#[test]
fn if_else_builds_condition_and_scope_branches() {
    let parser = parse_source("bool flag = true;\nif (flag) { print(1); } else { print(2); }");
    assert!(parser.errors.is_empty(), "errors: {:?}", parser.errors);
    let if_node = parser.arena.node(parser.root).children[1];
    let node = parser.arena.node(if_node);
    assert_eq!(node.kind, NodeKind::IfStatement);
    assert_eq!(node.children.len(), 3);
    assert_eq!(parser.arena.node(node.children[1]).kind, NodeKind::Scope);
    assert_eq!(parser.arena.node(node.children[2]).kind, NodeKind::Scope);
}

#[test]
fn single_statement_branches_are_wrapped_in_scopes() {
    let parser = parse_source("bool flag = true;\nif (flag) print(1);\nwhile (flag) print(2);");
    assert!(parser.errors.is_empty(), "errors: {:?}", parser.errors);
    let if_node = parser.arena.node(parser.root).children[1];
    let then_branch = parser.arena.node(if_node).children[1];
    assert_eq!(parser.arena.node(then_branch).kind, NodeKind::Scope);
    let while_node = parser.arena.node(parser.root).children[2];
    let body = parser.arena.node(while_node).children[1];
    assert_eq!(parser.arena.node(body).kind, NodeKind::Scope);
}

#[test]
fn dangling_else_is_an_error_but_parsing_recovers() {
    let parser = parse_source("else { print(1); }\nint32 x = 1;");
    assert!(
        parser
            .errors
            .iter()
            .any(|e| e.message.contains("Unexpected 'else'")),
        "errors: {:?}",
        parser.errors
    );
    assert!(top_level_kinds(&parser).contains(&NodeKind::VariableDeclaration));
}

#[test]
fn import_inside_scope_is_an_error() {
    let parser = parse_source("{\n    import something\n}");
    assert!(
        parser
            .errors
            .iter()
            .any(|e| e.message.contains("Imports must appear at top level")),
        "errors: {:?}",
        parser.errors
    );
}

#[test]
fn unknown_directive_is_reported_but_kept() {
    let parser = parse_source("directive shiny_new_thing;");
    assert!(
        parser
            .errors
            .iter()
            .any(|e| e.message.contains("Unknown directive 'shiny_new_thing'"))
    );
    assert_eq!(top_level_kinds(&parser), vec![NodeKind::Directive]);
}

#[test]
fn known_directive_is_recorded() {
    let parser = parse_source("directive enable_drops;");
    assert!(parser.errors.is_empty(), "errors: {:?}", parser.errors);
    assert!(parser.directives.contains("enable_drops"));
}

#[test]
fn compound_assignment_and_increment_parse() {
    let parser = parse_source("int32 x = 1;\nx += 2;\nx++;");
    assert!(parser.errors.is_empty(), "errors: {:?}", parser.errors);
    let kinds = top_level_kinds(&parser);
    assert_eq!(kinds[1], NodeKind::CompoundAssignment);
    assert_eq!(kinds[2], NodeKind::UnaryExpression);
    let increment = parser.arena.node(parser.root).children[2];
    assert_eq!(parser.arena.node(increment).name, "++");
}

#[test]
fn comments_are_skipped_everywhere() {
    let parser = parse_source("// leading\nint32 x = 1; /* between */ print(x); // trailing");
    assert!(parser.errors.is_empty(), "errors: {:?}", parser.errors);
    assert_eq!(
        top_level_kinds(&parser),
        vec![NodeKind::VariableDeclaration, NodeKind::FunctionCall]
    );
}

#[test]
fn parsing_twice_is_structurally_and_registry_equal() {
    let source = "int32 add(int32 x, int32 y) { return x + y; }\n\
                  class Point { int32 x; int32 y; }\n\
                  int32 n = add(1, 2);\n\
                  print(n);";
    let first = parse_source(source);
    let second = parse_source(source);
    assert!(first.errors.is_empty(), "errors: {:?}", first.errors);
    assert_eq!(first.arena.tree(first.root), second.arena.tree(second.root));
    assert_eq!(first.registries, second.registries);
}

#[test]
fn parent_back_references_are_set_on_append() {
    let parser = parse_source("int32 x = 1;\nprint(x);");
    for &child in &parser.arena.node(parser.root).children {
        assert_eq!(parser.arena.node(child).parent, Some(parser.root));
    }
}
