//! The compile pipeline: source text in, assembly text out.
//!
//! Owns the arenas for one compilation. Everything the parser allocates
//! (nodes, types, member and parameter lists) lives on this function's
//! stack frame and is released wholesale when compilation ends - no
//! per-node bookkeeping anywhere in the pipeline.

use ferrocc_base::{Arena, Interner, Result};
use ferrocc_language::{AstContext, Lexer, Parser};

use crate::codegen::codegen;

/// Compiles one translation unit to x86-64 assembly in AT&T syntax.
///
/// A trailing newline is appended to the source if missing, so diagnostics
/// and `.loc` lines always have a complete final line to point into.
pub fn compile(source: &str) -> Result<String> {
    let normalized;
    let source = if source.ends_with('\n') {
        source
    } else {
        normalized = format!("{}\n", source);
        normalized.as_str()
    };

    let mut interner = Interner::new();
    let tokens = Lexer::new(source, &mut interner).tokenize()?;

    let nodes = Arena::new();
    let node_lists = Arena::new();
    let types = Arena::new();
    let members = Arena::new();
    let params = Arena::new();
    let ctx = AstContext::new(&nodes, &node_lists, &types, &members, &params);

    let mut program = Parser::new(tokens, ctx, &mut interner).parse()?;
    codegen(&mut program, &interner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_program_emits_prologue_and_epilogue() {
        let asm = compile("int main() { return 0; }").expect("compile");
        assert!(asm.contains("  .global main"));
        assert!(asm.contains("main:"));
        assert!(asm.contains("  push %rbp"));
        assert!(asm.contains("  mov %rsp, %rbp"));
        assert!(asm.contains(".L.return.main:"));
        assert!(asm.contains("  ret"));
    }

    #[test]
    fn missing_trailing_newline_is_tolerated() {
        let asm = compile("int main() { return 0; }\n").expect("with newline");
        let asm2 = compile("int main() { return 0; }").expect("without newline");
        assert_eq!(asm, asm2);
    }

    #[test]
    fn globals_come_out_in_source_order() {
        let asm = compile("int a; int b; int main() { return 0; }").expect("compile");
        let a = asm.find("a:").expect("a label");
        let b = asm.find("b:").expect("b label");
        assert!(a < b);
    }

    #[test]
    fn string_literal_data_includes_the_nul() {
        let asm = compile("int main() { char *s; s = \"hi\"; return 0; }").expect("compile");
        assert!(asm.contains(".L..0:"));
        assert!(asm.contains("  .byte 104"));
        assert!(asm.contains("  .byte 105"));
        assert!(asm.contains("  .byte 0"));
    }

    #[test]
    fn recursive_call_emits_call_instruction() {
        let asm = compile(
            "int fib(int n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); } \
             int main() { return fib(10); }",
        )
        .expect("compile");
        assert!(asm.contains("  call fib"));
        assert!(asm.contains(".L.return.fib:"));
    }

    #[test]
    fn lexical_errors_surface_through_the_pipeline() {
        let err = compile("int main() { return `; }").expect_err("must fail");
        assert_eq!(err.message, "invalid token");
    }
}
