//! Tests for destructor insertion at scope exits and early exits.

use firec_parser::{NodeId, NodeKind, ParserState};
use firec_preprocessor::{DROP_DIRECTIVE_NAME, enable_and_insert_drops};

fn preprocess(source: &str) -> ParserState {
    let mut parser = ParserState::new("test.fire".to_string(), source.to_string());
    parser.parse();
    assert!(parser.errors.is_empty(), "errors: {:?}", parser.errors);
    let root = parser.root;
    let catalog = parser.registries.catalog.clone();
    enable_and_insert_drops(&mut parser.arena, root, &catalog);
    parser
}

fn is_drop_of(parser: &ParserState, id: NodeId, variable: &str) -> bool {
    let node = parser.arena.node(id);
    node.kind == NodeKind::FunctionCall
        && node.name == "drop"
        && node
            .children
            .first()
            .is_some_and(|&arg| parser.arena.node(arg).name == variable)
}

#[test]
fn directive_is_inserted_at_the_head_of_the_root() {
    let parser = preprocess("int32 x = 1;");
    let first = parser.arena.node(parser.root).children[0];
    let node = parser.arena.node(first);
    assert_eq!(node.kind, NodeKind::Directive);
    assert_eq!(node.name, DROP_DIRECTIVE_NAME);
}

#[test]
fn owned_locals_are_dropped_at_scope_exit_in_declaration_order() {
    let parser = preprocess("{\n    int32[] xs = [1];\n    int32[] ys = [2];\n    print(1);\n}");
    let scope = parser.arena.node(parser.root).children[1];
    let children = parser.arena.node(scope).children.clone();
    let len = children.len();
    assert!(is_drop_of(&parser, children[len - 2], "xs"));
    assert!(is_drop_of(&parser, children[len - 1], "ys"));
}

#[test]
fn copyable_locals_are_not_dropped() {
    let parser = preprocess("{\n    int32 x = 1;\n    string s = \"hi\";\n}");
    let scope = parser.arena.node(parser.root).children[1];
    let drops = parser
        .arena
        .node(scope)
        .children
        .iter()
        .filter(|&&c| parser.arena.node(c).name == "drop")
        .count();
    assert_eq!(drops, 0);
}

#[test]
fn top_level_owned_locals_are_dropped_after_all_statements() {
    let parser = preprocess("int32[] xs = [1];\nprint(1);");
    let children = parser.arena.node(parser.root).children.clone();
    let last = *children.last().expect("children");
    assert!(is_drop_of(&parser, last, "xs"));
}

#[test]
fn returns_are_wrapped_with_drops_for_all_live_frames() {
    let source = "int32 f() {\n\
                  int32[] xs = [1];\n\
                  {\n        int32[] ys = [2];\n        return 1;\n    }\n\
                  }";
    let parser = preprocess(source);

    // Find the synthetic scope that wraps the return.
    fn find_return_wrapper(parser: &ParserState, id: NodeId) -> Option<NodeId> {
        let node = parser.arena.node(id);
        if node.kind == NodeKind::Scope
            && node
                .children
                .last()
                .is_some_and(|&c| parser.arena.node(c).kind == NodeKind::ReturnStatement)
            && node.children.len() > 1
        {
            return Some(id);
        }
        for &child in &node.children {
            if let Some(found) = find_return_wrapper(parser, child) {
                return Some(found);
            }
        }
        None
    }

    let wrapper = find_return_wrapper(&parser, parser.root).expect("wrapped return");
    let children = parser.arena.node(wrapper).children.clone();
    // Outer frame first, inner frame second, then the return itself.
    assert!(is_drop_of(&parser, children[0], "xs"));
    assert!(is_drop_of(&parser, children[1], "ys"));
    assert_eq!(
        parser.arena.node(*children.last().expect("return")).kind,
        NodeKind::ReturnStatement
    );
}

#[test]
fn break_and_continue_drop_the_innermost_frame_only() {
    let source = "while (true) {\n\
                  int32[] xs = [1];\n\
                  break;\n\
                  }";
    let parser = preprocess(source);

    fn find_break_wrapper(parser: &ParserState, id: NodeId) -> Option<NodeId> {
        let node = parser.arena.node(id);
        if node.kind == NodeKind::Scope
            && node
                .children
                .last()
                .is_some_and(|&c| parser.arena.node(c).kind == NodeKind::BreakStatement)
        {
            return Some(id);
        }
        for &child in &node.children {
            if let Some(found) = find_break_wrapper(parser, child) {
                return Some(found);
            }
        }
        None
    }

    let wrapper = find_break_wrapper(&parser, parser.root).expect("wrapped break");
    let children = parser.arena.node(wrapper).children.clone();
    assert_eq!(children.len(), 2);
    assert!(is_drop_of(&parser, children[0], "xs"));
}

#[test]
fn owned_reassignment_is_wrapped_with_a_preceding_drop() {
    let parser = preprocess("int32[] xs = [1];\nxs = [2];\nprint(1);");
    let children = parser.arena.node(parser.root).children.clone();
    // directive, declaration, wrapper scope, print, trailing drop.
    let wrapper = children[2];
    let node = parser.arena.node(wrapper);
    assert_eq!(node.kind, NodeKind::Scope);
    let inner = node.children.clone();
    assert_eq!(inner.len(), 2);
    assert!(is_drop_of(&parser, inner[0], "xs"));
    assert_eq!(
        parser.arena.node(inner[1]).kind,
        NodeKind::VariableAssignment
    );
}

#[test]
fn parameter_reassignment_is_not_wrapped() {
    let source = "void f(int32[] xs) {\n    xs = [2];\n}";
    let parser = preprocess(source);

    fn has_assignment_wrapper(parser: &ParserState, id: NodeId) -> bool {
        let node = parser.arena.node(id);
        if node.kind == NodeKind::Scope
            && node.children.len() == 2
            && parser.arena.node(node.children[0]).name == "drop"
            && parser.arena.node(node.children[1]).kind == NodeKind::VariableAssignment
        {
            return true;
        }
        node.children
            .iter()
            .any(|&child| has_assignment_wrapper(parser, child))
    }
    assert!(!has_assignment_wrapper(&parser, parser.root));
}

#[test]
fn running_the_preprocessor_twice_is_a_no_op() {
    let mut parser = ParserState::new(
        "test.fire".to_string(),
        "int32[] xs = [1];\n{\n    int32[] ys = [2];\n}\nprint(1);".to_string(),
    );
    parser.parse();
    let root = parser.root;
    let catalog = parser.registries.catalog.clone();

    enable_and_insert_drops(&mut parser.arena, root, &catalog);
    let after_first = parser.arena.tree(root);

    enable_and_insert_drops(&mut parser.arena, root, &catalog);
    let after_second = parser.arena.tree(root);

    assert_eq!(after_first, after_second);
}
