//! Structural audits over the emitted assembly: frame sizes, label
//! uniqueness, layout round trips, pointer scaling.

mod common;

use common::{compile, count, frame_sizes, labels, zero_size_of};
use std::collections::HashSet;

#[test]
fn every_frame_is_a_multiple_of_sixteen() {
    let asm = compile(
        "int f(int a, int b) { char c; long d; return a + b; } \
         int g() { int x[7]; x[0] = 1; return x[0]; } \
         int main() { return f(1, 2) + g(); }",
    );
    let frames = frame_sizes(&asm);
    assert_eq!(frames.len(), 3);
    for frame in frames {
        assert_eq!(frame % 16, 0, "frame {} not 16-byte aligned", frame);
    }
}

#[test]
fn empty_function_still_gets_an_aligned_frame() {
    let asm = compile("int main() { return 0; }");
    assert_eq!(frame_sizes(&asm), vec![0]);
}

#[test]
fn control_flow_labels_are_unique_across_the_program() {
    let asm = compile(
        "int f(int n) { \
           int i; int s; s = 0; \
           for (i = 0; i < n; i = i + 1) { if (i < 3) s = s + i; else s = s + 1; } \
           while (s > 100) s = s - 1; \
           return s; \
         } \
         int main() { if (f(5)) return 1; else return 0; }",
    );
    let defined = labels(&asm);
    let unique: HashSet<&&str> = defined.iter().collect();
    assert_eq!(defined.len(), unique.len(), "duplicate labels in {:?}", defined);
}

#[test]
fn every_jump_target_is_defined() {
    let asm = compile(
        "int main() { int i; int s; s = 0; \
           for (i = 0; i < 10; i = i + 1) if (i - 5) s = s + i; \
           return s; }",
    );
    let defined: HashSet<String> = labels(&asm)
        .iter()
        .map(|l| l.trim_end_matches(':').to_string())
        .collect();
    for line in asm.lines() {
        let line = line.trim();
        for prefix in ["jmp ", "je "] {
            if let Some(target) = line.strip_prefix(prefix) {
                assert!(defined.contains(target), "undefined jump target {}", target);
            }
        }
    }
}

#[test]
fn sizeof_matches_emitted_data_units() {
    // sizeof(g) as computed by the compiler must equal the .zero the data
    // emitter produces for the same object.
    for decl in [
        "int g;",
        "long g;",
        "char g[10];",
        "int g[3];",
        "struct S { char a; int b; char c; } g;",
        "union U { char a[13]; long b; } g;",
        "int *g[4];",
    ] {
        let src = format!("{} int main() {{ return sizeof(g); }}", decl);
        let asm = compile(&src);
        let zero = zero_size_of(&asm, "g");
        let sizeof_line = format!("mov ${}, %rax", zero);
        assert!(
            asm.contains(&sizeof_line),
            "{}: sizeof constant {} missing from\n{}",
            decl,
            zero,
            asm
        );
    }
}

#[test]
fn pointer_addition_multiplies_by_element_size() {
    let asm = compile("int main() { int a[4]; int *p; p = a; return *(p + 3); }");
    assert!(asm.contains("mov $4, %rax"), "scaling constant missing");
    assert!(asm.contains("imul"), "scaling multiplication missing");
}

#[test]
fn long_pointer_scaling_uses_pointee_size_eight() {
    let asm = compile("int main() { long a[4]; long *p; p = a; return *(p + 1); }");
    assert!(asm.contains("mov $8, %rax"));
}

#[test]
fn struct_member_access_adds_aligned_offsets() {
    let asm = compile(
        "struct P { int x; char y; int z; }; \
         int main() { struct P p; p.x = 3; p.y = 5; p.z = 7; return p.x + p.y + p.z; }",
    );
    // y sits after the int at offset 4; z is padded up to offset 8.
    assert!(asm.contains("add $4, %rax"));
    assert!(asm.contains("add $8, %rax"));
}

#[test]
fn arguments_pop_into_abi_registers_in_reverse() {
    let asm = compile(
        "int f(int a, int b, int c, int d, int e, int g) { return a; } \
         int main() { return f(1, 2, 3, 4, 5, 6); }",
    );
    for reg in ["%rdi", "%rsi", "%rdx", "%rcx", "%r8", "%r9"] {
        assert!(asm.contains(&format!("pop {}", reg)), "missing pop {}", reg);
    }
    // Reverse commit order: the last register is popped first.
    let r9 = asm.find("pop %r9").unwrap();
    let rdi = asm.find("pop %rdi").unwrap();
    assert!(r9 < rdi);
}

#[test]
fn data_section_precedes_text() {
    let asm = compile("int g; int main() { return g; }");
    let data = asm.find(".data").expect("data directive");
    let text = asm.find(".text").expect("text directive");
    assert!(data < text);
}

#[test]
fn calls_zero_rax_for_the_variadic_convention() {
    let asm = compile("int f(); int main() { return f(); }");
    let zero = asm.find("mov $0, %rax").expect("rax zeroing");
    let call = asm.find("call f").expect("call");
    assert!(zero < call);
}

#[test]
fn loc_directives_track_source_lines() {
    let asm = compile("int main()\n{\n  return 0;\n}\n");
    assert!(count(&asm, ".loc 1 3") >= 1);
}
