//! Error taxonomy and rendering: every failure class points at a byte and
//! renders in the `file:line:` caret format.

mod common;

use common::compile_err;
use ferrocc_compile::render;

// ----------------------------------------------------------------------
// Lexical
// ----------------------------------------------------------------------

#[test]
fn invalid_byte() {
    let err = compile_err("int main() { return 1 ` 2; }");
    assert_eq!(err.message, "invalid token");
}

#[test]
fn unterminated_string() {
    let err = compile_err("int main() { char *s = \"oops; }");
    assert_eq!(err.message, "unterminated string literal");
}

#[test]
fn bad_hex_escape() {
    let err = compile_err("int main() { char *s = \"\\xq\"; return 0; }");
    assert_eq!(err.message, "invalid hex escape sequence");
}

#[test]
fn unclosed_block_comment() {
    let err = compile_err("int main() { return 0; } /* trailing");
    assert_eq!(err.message, "unclosed block comment");
}

// ----------------------------------------------------------------------
// Syntactic
// ----------------------------------------------------------------------

#[test]
fn missing_close_paren() {
    let err = compile_err("int main() { return (1 + 2; }");
    assert_eq!(err.message, "expected ')'");
}

#[test]
fn missing_semicolon() {
    let err = compile_err("int main() { return 1 }");
    assert_eq!(err.message, "expected ';'");
}

#[test]
fn garbage_where_an_expression_belongs() {
    let err = compile_err("int main() { return ]; }");
    assert_eq!(err.message, "expected an expression");
}

#[test]
fn declarator_requires_a_name() {
    let err = compile_err("int *; int main() { return 0; }");
    assert_eq!(err.message, "expected a variable name");
}

// ----------------------------------------------------------------------
// Semantic
// ----------------------------------------------------------------------

#[test]
fn undefined_identifier() {
    let err = compile_err("int main() { return ghost; }");
    assert_eq!(err.message, "undefined variable");
}

#[test]
fn duplicate_type_specifiers() {
    let err = compile_err("int main() { int int x; return 0; }");
    assert_eq!(err.message, "invalid type");
}

#[test]
fn void_variable() {
    let err = compile_err("void g; int main() { return 0; }");
    assert_eq!(err.message, "variable declared void");
}

#[test]
fn arithmetic_on_two_pointers() {
    let err = compile_err("int main() { int *p; int *q; return p + q; }");
    assert_eq!(err.message, "invalid operands");
}

#[test]
fn deref_of_an_integer() {
    let err = compile_err("int main() { int x; return *x; }");
    assert_eq!(err.message, "invalid pointer dereference");
}

// ----------------------------------------------------------------------
// Rendering
// ----------------------------------------------------------------------

#[test]
fn rendered_diagnostic_points_at_the_column() {
    let source = "int main() {\n  return ghost;\n}\n";
    let err = compile_err(source);
    let rendered = render("bug.c", source, &err);

    let mut lines = rendered.lines();
    assert_eq!(lines.next().unwrap(), "bug.c:2:   return ghost;");
    let caret_line = lines.next().unwrap();
    let col_in_line = "  return ghost;".find("ghost").unwrap();
    assert_eq!(caret_line.find('^').unwrap(), "bug.c:2: ".len() + col_in_line);
    assert!(caret_line.ends_with("^ undefined variable"));
}

#[test]
fn first_error_wins() {
    // Both an undefined variable and a missing semicolon; the earlier one
    // aborts the compilation.
    let err = compile_err("int main() { return ghost; return also_ghost }");
    assert_eq!(err.message, "undefined variable");
}
