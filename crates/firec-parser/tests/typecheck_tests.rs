//! Tests for the in-place type check.

use firec_parser::ParserState;

fn parse_source(source: &str) -> ParserState {
    let mut parser = ParserState::new("test.fire".to_string(), source.to_string());
    parser.parse();
    parser
}

fn has_error(parser: &ParserState, needle: &str) -> bool {
    parser.errors.iter().any(|e| e.message.contains(needle))
}

#[test]
fn declaration_initializer_must_match_exactly() {
    let parser = parse_source("int32 x = \"hi\";");
    assert!(
        has_error(
            &parser,
            "Type mismatch for variable 'x'. Expected int32, got string"
        ),
        "errors: {:?}",
        parser.errors
    );
}

#[test]
fn no_implicit_numeric_coercions() {
    let parser = parse_source("int64 x = 1;");
    assert!(
        has_error(&parser, "Expected int64, got int32"),
        "errors: {:?}",
        parser.errors
    );
}

#[test]
fn null_requires_a_nullable_target() {
    let parser = parse_source("string s = null;");
    assert!(
        has_error(&parser, "Cannot initialize non-nullable variable 's' with null"),
        "errors: {:?}",
        parser.errors
    );
    let ok = parse_source("nullable string s = null;");
    assert!(ok.errors.is_empty(), "errors: {:?}", ok.errors);
}

#[test]
fn plus_with_a_string_operand_concatenates() {
    let parser = parse_source("string s = \"n = \" + 42;\nstring t = 1 + \"x\";");
    assert!(parser.errors.is_empty(), "errors: {:?}", parser.errors);
}

#[test]
fn arithmetic_requires_same_type_operands() {
    let parser = parse_source("float64 x = 1 + 2.5;");
    assert!(
        has_error(&parser, "Operator '+' not supported between types int32 and float64"),
        "errors: {:?}",
        parser.errors
    );
}

#[test]
fn modulo_requires_integers() {
    let parser = parse_source("float64 x = 1.5 % 2.5;");
    assert!(
        has_error(&parser, "Operator '%' requires integer operands"),
        "errors: {:?}",
        parser.errors
    );
}

#[test]
fn equality_allows_matching_types_and_null() {
    let parser = parse_source(
        "bool a = 1 == 2;\n\
         bool b = \"x\" == \"y\";\n\
         bool c = true == false;\n\
         nullable string s = null;\n\
         bool d = s == null;",
    );
    assert!(parser.errors.is_empty(), "errors: {:?}", parser.errors);

    let bad = parse_source("bool e = 1 == \"x\";");
    assert!(
        has_error(&bad, "Cannot compare types int32 and string with '=='"),
        "errors: {:?}",
        bad.errors
    );
}

#[test]
fn conditions_must_be_boolean() {
    let parser = parse_source("if (1) { print(1); }");
    assert!(
        has_error(&parser, "Condition for 'if' statement must be a boolean, got int32"),
        "errors: {:?}",
        parser.errors
    );
    let while_parser = parse_source("while (\"x\") { print(1); }");
    assert!(
        has_error(&while_parser, "Condition for 'while' statement must be a boolean"),
        "errors: {:?}",
        while_parser.errors
    );
}

#[test]
fn casts_follow_the_cast_matrix() {
    // numeric <-> numeric, anything-to-string, array-to-string.
    let ok = parse_source(
        "int32 a = 1;\n\
         float64 f = a as float64;\n\
         string s = a as string;\n\
         int32[] xs = [1, 2];\n\
         string t = xs as string;\n\
         int32 b = true as int32;",
    );
    assert!(ok.errors.is_empty(), "errors: {:?}", ok.errors);

    let bad = parse_source("class Box { int32 v; }\nBox b = Box(1);\nint32 n = b as int32;");
    assert!(
        has_error(&bad, "Cannot cast non-numeric type Box to int32"),
        "errors: {:?}",
        bad.errors
    );

    let bad_array = parse_source("int32[] xs = [1];\nint64 n = xs as int64;");
    assert!(
        has_error(&bad_array, "Cannot cast array type int32[] to int64"),
        "errors: {:?}",
        bad_array.errors
    );
}

#[test]
fn array_methods_are_length_and_size_only() {
    let ok = parse_source("int32[] xs = [1];\nint32 n = xs.length();\nint32 m = xs.size();");
    assert!(ok.errors.is_empty(), "errors: {:?}", ok.errors);

    let bad = parse_source("int32[] xs = [1];\nxs.append(4);");
    assert!(
        has_error(&bad, "Unsupported array method 'append' for fixed-size arrays"),
        "errors: {:?}",
        bad.errors
    );

    let unknown = parse_source("int32[] xs = [1];\nxs.reverse();");
    assert!(
        has_error(&unknown, "Unknown method 'reverse' for array type int32[]"),
        "errors: {:?}",
        unknown.errors
    );
}

#[test]
fn array_index_must_be_an_integer() {
    let parser = parse_source("int32[] xs = [1];\nint32 x = xs[1.5];");
    assert!(
        has_error(&parser, "Array index must be an integer type, got float64"),
        "errors: {:?}",
        parser.errors
    );
}

#[test]
fn user_function_calls_check_arity_and_types() {
    let source = "int32 f(int32 a) { return a; }\n";
    let arity = parse_source(&format!("{source}f(1, 2);"));
    assert!(
        has_error(&arity, "Function 'f' expected 1 arguments, got 2"),
        "errors: {:?}",
        arity.errors
    );
    let types = parse_source(&format!("{source}f(\"x\");"));
    assert!(
        has_error(&types, "Argument 1 for function 'f' expected type int32, got string"),
        "errors: {:?}",
        types.errors
    );
}

#[test]
fn positional_constructor_checks_the_field_list() {
    let source = "class Point { int32 x; int32 y; }\n";
    let arity = parse_source(&format!("{source}Point p = Point(1);"));
    assert!(
        has_error(&arity, "Constructor 'Point' expected 2 args, got 1"),
        "errors: {:?}",
        arity.errors
    );
    let types = parse_source(&format!("{source}Point p = Point(1, \"y\");"));
    assert!(
        has_error(&types, "Constructor 'Point' arg 2 expected int32, got string"),
        "errors: {:?}",
        types.errors
    );
}

#[test]
fn method_calls_check_against_registered_signatures() {
    let source = "class Counter {\n\
                  int32 value;\n\
                  int32 add(int32 by) { return by; }\n\
                  }\n\
                  Counter c = Counter(0);\n";
    let ok = parse_source(&format!("{source}int32 n = c.add(1);"));
    assert!(ok.errors.is_empty(), "errors: {:?}", ok.errors);

    let bad = parse_source(&format!("{source}int32 n = c.add(\"x\");"));
    assert!(
        has_error(&bad, "Argument 1 for method 'add' expected type int32, got string"),
        "errors: {:?}",
        bad.errors
    );
}

#[test]
fn break_and_continue_require_an_enclosing_loop() {
    let parser = parse_source("if (true) { break; }");
    assert!(
        has_error(&parser, "'break' statement not within a loop"),
        "errors: {:?}",
        parser.errors
    );

    let ok = parse_source("while (true) { if (true) { continue; } break; }");
    assert!(ok.errors.is_empty(), "errors: {:?}", ok.errors);
}

#[test]
fn increment_requires_an_integer_variable() {
    let parser = parse_source("float64 f = 1.5;\nf++;");
    assert!(
        has_error(&parser, "Operator '++' requires an integer variable, got float64"),
        "errors: {:?}",
        parser.errors
    );
}

#[test]
fn field_access_is_checked_against_the_class() {
    let source = "class Point { int32 x; }\nPoint p = Point(1);\n";
    let bad = parse_source(&format!("{source}int32 n = p.z;"));
    assert!(
        has_error(&bad, "Type 'Point' has no field 'z'"),
        "errors: {:?}",
        bad.errors
    );
    let non_class = parse_source("int32 a = 1;\nint32 b = a.x;");
    assert!(
        has_error(&non_class, "Field access on non-class type 'int32'"),
        "errors: {:?}",
        non_class.errors
    );
}
