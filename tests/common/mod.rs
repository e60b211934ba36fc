//! Test harness: compile C source and inspect the emitted assembly.

#![allow(dead_code)]

use ferrocc_base::SpannedError;

/// Compiles `src`, panicking on failure.
pub fn compile(src: &str) -> String {
    ferrocc_compile::compile(src)
        .unwrap_or_else(|e| panic!("compile failed: {} at {:?}", e.message, e.span))
}

/// Compiles `src`, panicking on success.
pub fn compile_err(src: &str) -> SpannedError {
    ferrocc_compile::compile(src).expect_err("expected a compile failure")
}

/// Every label defined in the output (lines ending in `:`), in order.
pub fn labels(asm: &str) -> Vec<&str> {
    asm.lines()
        .map(str::trim)
        .filter(|l| l.ends_with(':'))
        .collect()
}

/// Frame sizes: the operand of every `sub $N, %rsp`.
pub fn frame_sizes(asm: &str) -> Vec<i64> {
    asm.lines()
        .filter_map(|l| {
            let l = l.trim();
            let rest = l.strip_prefix("sub $")?;
            let n = rest.strip_suffix(", %rsp")?;
            n.parse().ok()
        })
        .collect()
}

/// Occurrences of `needle` in the output.
pub fn count(asm: &str, needle: &str) -> usize {
    asm.matches(needle).count()
}

/// The `.zero N` directive emitted right after the label `name:`.
pub fn zero_size_of(asm: &str, name: &str) -> i64 {
    let mut lines = asm.lines().map(str::trim);
    let label = format!("{}:", name);
    for line in &mut lines {
        if line == label {
            break;
        }
    }
    let next = lines.next().expect("directive after label");
    next.strip_prefix(".zero ")
        .unwrap_or_else(|| panic!("expected .zero after {}, got {}", label, next))
        .parse()
        .expect("numeric .zero operand")
}
