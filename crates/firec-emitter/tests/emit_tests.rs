//! Tests for the generated C translation unit.

use firec_emitter::CEmitter;
use firec_parser::ParserState;
use firec_preprocessor::enable_and_insert_drops;

fn emit(source: &str) -> String {
    let mut parser = ParserState::new("test.fire".to_string(), source.to_string());
    parser.parse();
    assert!(parser.errors.is_empty(), "parse errors: {:?}", parser.errors);
    let root = parser.root;
    let catalog = parser.registries.catalog.clone();
    enable_and_insert_drops(&mut parser.arena, root, &catalog);
    CEmitter::new(&parser.arena, root, &parser.registries).generate()
}

#[test]
fn functions_globals_and_prints_lower_to_c() {
    let c = emit(
        "int32 add(int32 x, int32 y) {\n    return x + y;\n}\n\
         string greet() {\n    return \"hello\";\n}\n\
         int32 TEN = 10;\n\
         print(add(2, TEN));\n\
         print(greet());",
    );
    assert!(c.contains("static int32_t add(int32_t x, int32_t y)"), "{c}");
    assert!(c.contains("static char * greet(void)") || c.contains("static char *greet(void)"), "{c}");
    assert!(c.contains("static int32_t TEN;"), "{c}");
    assert!(c.contains("TEN = 10;"), "{c}");
    assert!(c.contains("printf(\"%d\\n\", (int)(add(2, TEN)));"), "{c}");
    assert!(c.contains("printf(\"%s\\n\", greet());"), "{c}");
    assert!(c.contains("int main(void) {"), "{c}");
    assert!(c.contains("return 0;"), "{c}");
}

#[test]
fn string_concatenation_uses_the_runtime_helper() {
    let c = emit("string s = \"n = \" + 42;\nprint(s);");
    assert!(c.contains("fs_str_concat(\"n = \", fs_int_to_str((long long)(42)))"), "{c}");
}

#[test]
fn arrays_lower_to_runtime_storage_and_drops_free_them() {
    let c = emit("int32[] xs = [1, 2, 3];\nprint(xs.length());");
    assert!(c.contains("fs_array_from((int32_t[]){1, 2, 3}, 3, sizeof(int32_t))"), "{c}");
    assert!(c.contains("(int32_t)((xs)->len)"), "{c}");
    // The preprocessor's trailing drop lowers to the array free helper.
    assert!(c.contains("fs_array_free(xs);"), "{c}");
}

#[test]
fn classes_become_structs_with_prefixed_method_functions() {
    let c = emit(
        "class Counter {\n\
         int32 value;\n\
         int32 bump(int32 by) { return this.value + by; }\n\
         }\n\
         Counter c = Counter(5);\n\
         print(c.bump(2));",
    );
    assert!(c.contains("struct Counter {"), "{c}");
    assert!(c.contains("int32_t value;"), "{c}");
    assert!(c.contains("static int32_t Counter_bump(struct Counter * this, int32_t by)")
        || c.contains("static int32_t Counter_bump(struct Counter *this, int32_t by)"), "{c}");
    assert!(c.contains("Counter_of(5)"), "{c}");
    assert!(c.contains("Counter_bump(c, 2)"), "{c}");
    assert!(c.contains("this->value"), "{c}");
}

#[test]
fn constructors_allocate_and_delegate() {
    let c = emit(
        "class Point {\n\
         int32 x;\n\
         Point(int32 x) { this.x = x; }\n\
         }\n\
         Point p = new Point(3);\n\
         print(p.x);",
    );
    assert!(c.contains("Point_new(3)"), "{c}");
    assert!(c.contains("Point_Point(this, x);"), "{c}");
    assert!(c.contains("p->x"), "{c}");
}

#[test]
fn generic_calls_are_monomorphised_by_recorded_type_args() {
    let c = emit(
        "T max<T: int32 | float64>(T a, T b) {\n\
         if (a > b) { return a; }\n\
         return b;\n\
         }\n\
         print(max(1.5, 2.5));\n\
         print(max(1, 2));",
    );
    assert!(c.contains("static double max__float64(double a, double b)"), "{c}");
    assert!(c.contains("static int32_t max__int32(int32_t a, int32_t b)"), "{c}");
    assert!(c.contains("max__float64(1.5, 2.5)"), "{c}");
    assert!(c.contains("max__int32(1, 2)"), "{c}");
}

#[test]
fn control_flow_lowers_structurally() {
    let c = emit(
        "int32 i = 0;\n\
         while (i < 3) {\n\
         if (i == 1) {\n    i += 2;\n    continue;\n}\n\
         i++;\n\
         }",
    );
    assert!(c.contains("while ((i < 3)) {"), "{c}");
    assert!(c.contains("if ((i == 1)) {"), "{c}");
    assert!(c.contains("i += 2;"), "{c}");
    assert!(c.contains("continue;"), "{c}");
    assert!(c.contains("i++;"), "{c}");
}

#[test]
fn string_equality_uses_the_runtime_comparison() {
    let c = emit("bool same = \"a\" == \"b\";\nprint(same);");
    assert!(c.contains("fs_str_eq(\"a\", \"b\")"), "{c}");
    assert!(c.contains("fs_bool_to_str(same)"), "{c}");
}

#[test]
fn casts_lower_to_c_casts_and_string_helpers() {
    let c = emit(
        "int32 a = 65;\n\
         float64 f = a as float64;\n\
         string s = a as string;\n\
         print(s);",
    );
    assert!(c.contains("(double)(a)"), "{c}");
    assert!(c.contains("fs_int_to_str((long long)(a))"), "{c}");
}

#[test]
fn runtime_preamble_is_embedded_once() {
    let c = emit("print(1);");
    assert_eq!(c.matches("static void firescript_free").count(), 1);
    assert!(c.starts_with("#include <stdio.h>"), "{c}");
}
