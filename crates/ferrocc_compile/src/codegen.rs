//! Stack-machine code generation for x86-64, AT&T syntax.
//!
//! ## Evaluation model
//!
//! Every expression leaves its 64-bit result in RAX. Binary operators
//! evaluate the right operand first and push it, evaluate the left operand
//! into RAX, pop the right into RDI, and operate. A depth counter tracks
//! pushes against pops and must be zero at every statement boundary.
//!
//! ## Frame layout
//!
//! Offsets are assigned to locals in declaration order before any text is
//! emitted: add the slot size, round up to the slot alignment, negate for
//! the RBP-relative offset. The frame is rounded up to 16 bytes, which
//! keeps RSP aligned across calls.
//!
//! ## Registers
//!
//! | Purpose | Registers |
//! |---------|-----------|
//! | Result / scratch | RAX, RDI |
//! | Argument passing | RDI, RSI, RDX, RCX, R8, R9 (narrow aliases for 1/2/4-byte slots) |
//! | Aggregate copy | R8B |
//!
//! 32-bit register names are used for arithmetic whenever the left
//! operand is neither `long` nor pointer-backed.

use ferrocc_base::{Interner, Result, SpannedError};
use ferrocc_language::{
    align_to, BinaryOp, Node, NodeKind, Program, Type, TypeKind,
};

const ARGREG8: [&str; 6] = ["%dil", "%sil", "%dl", "%cl", "%r8b", "%r9b"];
const ARGREG16: [&str; 6] = ["%di", "%si", "%dx", "%cx", "%r8w", "%r9w"];
const ARGREG32: [&str; 6] = ["%edi", "%esi", "%edx", "%ecx", "%r8d", "%r9d"];
const ARGREG64: [&str; 6] = ["%rdi", "%rsi", "%rdx", "%rcx", "%r8", "%r9"];

// Minimal sign-extension sequences between the integer ranks
// {char, short, int, long}; row is the source, column the destination.
const I32I8: &str = "movsbl %al, %eax";
const I32I16: &str = "movswl %ax, %eax";
const I32I64: &str = "movsxd %eax, %rax";

const CAST_TABLE: [[Option<&str>; 4]; 4] = [
    [None, None, None, Some(I32I64)],
    [Some(I32I8), None, None, Some(I32I64)],
    [Some(I32I8), Some(I32I16), None, Some(I32I64)],
    [Some(I32I8), Some(I32I16), None, None],
];

macro_rules! emit {
    ($e:expr, $($arg:tt)*) => {{
        use std::fmt::Write as _;
        let _ = writeln!($e.out, $($arg)*);
    }};
}

/// Generates assembly for the whole program.
///
/// Mutates the program first to assign local stack offsets and frame
/// sizes, then emits the data section followed by the text section.
pub fn codegen<'a>(program: &mut Program<'a>, interner: &Interner) -> Result<String> {
    assign_lvar_offsets(program);

    let mut emitter = Emitter {
        out: String::new(),
        depth: 0,
        count: 0,
        program,
        interner,
        current_fn: String::new(),
    };
    emitter.emit_data();
    emitter.emit_text()?;
    Ok(emitter.out)
}

/// Assigns RBP-relative offsets to every local, in declaration order, and
/// rounds each frame up to 16 bytes.
fn assign_lvar_offsets(program: &mut Program<'_>) {
    for id in program.top_level.clone() {
        if !program.obj(id).is_function {
            continue;
        }
        let locals = program.obj(id).locals.clone();
        let mut offset = 0;
        for lid in locals {
            let var = program.obj(lid);
            let (size, align) = (var.ty.size, var.ty.align);
            offset += size;
            offset = align_to(offset, align);
            program.obj_mut(lid).offset = -offset;
        }
        program.obj_mut(id).stack_size = align_to(offset, 16);
    }
}

struct Emitter<'p, 'a, 'i> {
    out: String,
    /// Evaluation-stack depth: pushes minus pops. Zero at every statement
    /// boundary.
    depth: i32,
    /// Label counter; a fresh value per control-flow construct keeps
    /// `.L.begin`/`.L.else`/`.L.end` unique across the output.
    count: u32,
    program: &'p Program<'a>,
    interner: &'i Interner,
    current_fn: String,
}

impl<'p, 'a, 'i> Emitter<'p, 'a, 'i> {
    fn push(&mut self) {
        emit!(self, "  push %rax");
        self.depth += 1;
    }

    fn pop(&mut self, arg: &str) {
        emit!(self, "  pop {}", arg);
        self.depth -= 1;
    }

    fn next_count(&mut self) -> u32 {
        self.count += 1;
        self.count
    }

    /// Computes the address of an lvalue into RAX.
    fn gen_addr(&mut self, node: &'a Node<'a>) -> Result<()> {
        match node.kind {
            NodeKind::Var(id) => {
                let program = self.program;
                let interner = self.interner;
                let var = program.obj(id);
                if var.is_local {
                    emit!(self, "  lea {}(%rbp), %rax", var.offset);
                } else {
                    emit!(self, "  lea {}(%rip), %rax", interner.resolve(var.name));
                }
                Ok(())
            }
            NodeKind::Deref(expr) => self.gen_expr(expr),
            NodeKind::Comma { lhs, rhs } => {
                self.gen_expr(lhs)?;
                self.gen_addr(rhs)
            }
            NodeKind::Member { base, member } => {
                self.gen_addr(base)?;
                emit!(self, "  add ${}, %rax", member.offset);
                Ok(())
            }
            _ => Err(SpannedError::new("not an lvalue", node.span)),
        }
    }

    /// Loads the value RAX points at, sign-extended to 64 bits.
    ///
    /// Arrays and aggregates load nothing: the address is the value
    /// (array decay, pass-by-address).
    fn load(&mut self, ty: &Type<'_>) {
        match ty.kind {
            TypeKind::Array { .. } | TypeKind::Struct { .. } | TypeKind::Union { .. } => return,
            _ => {}
        }
        match ty.size {
            1 => emit!(self, "  movsbq (%rax), %rax"),
            2 => emit!(self, "  movswq (%rax), %rax"),
            4 => emit!(self, "  movsxd (%rax), %rax"),
            _ => emit!(self, "  mov (%rax), %rax"),
        }
    }

    /// Stores RAX to the address on the evaluation stack.
    ///
    /// Aggregates copy byte by byte through R8B.
    fn store(&mut self, ty: &Type<'_>) {
        self.pop("%rdi");

        if let TypeKind::Struct { .. } | TypeKind::Union { .. } = ty.kind {
            for i in 0..ty.size {
                emit!(self, "  mov {}(%rax), %r8b", i);
                emit!(self, "  mov %r8b, {}(%rdi)", i);
            }
            return;
        }
        match ty.size {
            1 => emit!(self, "  mov %al, (%rdi)"),
            2 => emit!(self, "  mov %ax, (%rdi)"),
            4 => emit!(self, "  mov %eax, (%rdi)"),
            _ => emit!(self, "  mov %rax, (%rdi)"),
        }
    }

    fn cast(&mut self, from: &Type<'_>, to: &Type<'_>) {
        if to.is_void() {
            return;
        }
        let t1 = type_rank(from);
        let t2 = type_rank(to);
        if let Some(insn) = CAST_TABLE[t1][t2] {
            emit!(self, "  {}", insn);
        }
    }

    fn gen_expr(&mut self, node: &'a Node<'a>) -> Result<()> {
        emit!(self, "  .loc 1 {}", node.line);
        match node.kind {
            NodeKind::Num(val) => {
                emit!(self, "  mov ${}, %rax", val);
                return Ok(());
            }
            NodeKind::Neg(expr) => {
                self.gen_expr(expr)?;
                emit!(self, "  neg %rax");
                return Ok(());
            }
            NodeKind::Var(_) | NodeKind::Member { .. } => {
                self.gen_addr(node)?;
                self.load(node.ty());
                return Ok(());
            }
            NodeKind::Deref(expr) => {
                self.gen_expr(expr)?;
                self.load(node.ty());
                return Ok(());
            }
            NodeKind::Addr(expr) => {
                return self.gen_addr(expr);
            }
            NodeKind::Assign { lhs, rhs } => {
                self.gen_addr(lhs)?;
                self.push();
                self.gen_expr(rhs)?;
                self.store(node.ty());
                return Ok(());
            }
            NodeKind::StmtExpr(body) => {
                for stmt in body {
                    self.gen_stmt(stmt)?;
                }
                return Ok(());
            }
            NodeKind::Comma { lhs, rhs } => {
                self.gen_expr(lhs)?;
                return self.gen_expr(rhs);
            }
            NodeKind::Cast(expr) => {
                self.gen_expr(expr)?;
                self.cast(expr.ty(), node.ty());
                return Ok(());
            }
            NodeKind::Funcall { name, args } => {
                for arg in args {
                    self.gen_expr(arg)?;
                    self.push();
                }
                for i in (0..args.len()).rev() {
                    self.pop(ARGREG64[i]);
                }
                // Variadic callers expect AL to hold the vector-register
                // count.
                let interner = self.interner;
                emit!(self, "  mov $0, %rax");
                emit!(self, "  call {}", interner.resolve(name));
                return Ok(());
            }
            NodeKind::Binary { .. } => {}
            _ => return Err(SpannedError::new("invalid expression", node.span)),
        }

        let NodeKind::Binary { op, lhs, rhs } = node.kind else {
            unreachable!()
        };
        self.gen_expr(rhs)?;
        self.push();
        self.gen_expr(lhs)?;
        self.pop("%rdi");

        // 64-bit register names when the left operand is long or
        // pointer-backed, 32-bit otherwise.
        let wide = matches!(lhs.ty().kind, TypeKind::Long) || lhs.ty().base().is_some();
        let (ax, di) = if wide {
            ("%rax", "%rdi")
        } else {
            ("%eax", "%edi")
        };

        match op {
            BinaryOp::Add => emit!(self, "  add {}, {}", di, ax),
            BinaryOp::Sub => emit!(self, "  sub {}, {}", di, ax),
            BinaryOp::Mul => emit!(self, "  imul {}, {}", di, ax),
            BinaryOp::Div => {
                if lhs.ty().size == 8 {
                    emit!(self, "  cqo");
                } else {
                    emit!(self, "  cdq");
                }
                emit!(self, "  idiv {}", di);
            }
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le => {
                emit!(self, "  cmp {}, {}", di, ax);
                match op {
                    BinaryOp::Eq => emit!(self, "  sete %al"),
                    BinaryOp::Ne => emit!(self, "  setne %al"),
                    BinaryOp::Lt => emit!(self, "  setl %al"),
                    _ => emit!(self, "  setle %al"),
                }
                emit!(self, "  movzb %al, %rax");
            }
        }
        Ok(())
    }

    /// Emits one statement. Statements never change the evaluation-stack
    /// depth; the wrapper checks that.
    fn gen_stmt(&mut self, node: &'a Node<'a>) -> Result<()> {
        let entry_depth = self.depth;
        self.gen_stmt_inner(node)?;
        debug_assert_eq!(self.depth, entry_depth);
        Ok(())
    }

    fn gen_stmt_inner(&mut self, node: &'a Node<'a>) -> Result<()> {
        emit!(self, "  .loc 1 {}", node.line);
        match node.kind {
            NodeKind::If { cond, then, els } => {
                let c = self.next_count();
                self.gen_expr(cond)?;
                emit!(self, "  cmp $0, %rax");
                emit!(self, "  je .L.else.{}", c);
                self.gen_stmt(then)?;
                emit!(self, "  jmp .L.end.{}", c);
                emit!(self, ".L.else.{}:", c);
                if let Some(els) = els {
                    self.gen_stmt(els)?;
                }
                emit!(self, ".L.end.{}:", c);
                Ok(())
            }
            NodeKind::For { init, cond, inc, body } => {
                let c = self.next_count();
                if let Some(init) = init {
                    self.gen_stmt(init)?;
                }
                emit!(self, ".L.begin.{}:", c);
                if let Some(cond) = cond {
                    self.gen_expr(cond)?;
                    emit!(self, "  cmp $0, %rax");
                    emit!(self, "  je .L.end.{}", c);
                }
                self.gen_stmt(body)?;
                if let Some(inc) = inc {
                    self.gen_expr(inc)?;
                }
                emit!(self, "  jmp .L.begin.{}", c);
                emit!(self, ".L.end.{}:", c);
                Ok(())
            }
            NodeKind::Block(body) => {
                for stmt in body {
                    self.gen_stmt(stmt)?;
                }
                Ok(())
            }
            NodeKind::Return(expr) => {
                self.gen_expr(expr)?;
                emit!(self, "  jmp .L.return.{}", self.current_fn);
                Ok(())
            }
            NodeKind::ExprStmt(expr) => self.gen_expr(expr),
            _ => Err(SpannedError::new("invalid statement", node.span)),
        }
    }

    /// Emits every non-function object: `.data`, `.global`, label, then
    /// either one `.byte` per initializer byte or a single `.zero`.
    fn emit_data(&mut self) {
        let program = self.program;
        let interner = self.interner;
        for &id in &program.top_level {
            let var = program.obj(id);
            if var.is_function {
                continue;
            }
            let name = interner.resolve(var.name);
            emit!(self, "  .data");
            emit!(self, "  .global {}", name);
            emit!(self, "{}:", name);
            match &var.init_data {
                Some(data) => {
                    for b in data {
                        emit!(self, "  .byte {}", b);
                    }
                }
                None => emit!(self, "  .zero {}", var.ty.size),
            }
        }
    }

    fn emit_text(&mut self) -> Result<()> {
        let program = self.program;
        for &id in &program.top_level {
            let func = program.obj(id);
            if !func.is_function || !func.is_definition {
                continue;
            }
            let name = self.interner.resolve(func.name).to_string();
            emit!(self, "  .global {}", name);
            emit!(self, "  .text");
            emit!(self, "{}:", name);
            self.current_fn = name.clone();

            // Prologue
            emit!(self, "  push %rbp");
            emit!(self, "  mov %rsp, %rbp");
            emit!(self, "  sub ${}, %rsp", func.stack_size);

            // Spill register arguments into their stack slots.
            for (i, &pid) in func.params.iter().enumerate() {
                let param = program.obj(pid);
                self.store_gp(i, param.offset, param.ty.size);
            }

            let body = func.body.expect("definition has a body");
            self.gen_stmt(body)?;
            assert_eq!(self.depth, 0);

            // Epilogue
            emit!(self, ".L.return.{}:", name);
            emit!(self, "  mov %rbp, %rsp");
            emit!(self, "  pop %rbp");
            emit!(self, "  ret");
        }
        Ok(())
    }

    fn store_gp(&mut self, r: usize, offset: i32, size: i32) {
        match size {
            1 => emit!(self, "  mov {}, {}(%rbp)", ARGREG8[r], offset),
            2 => emit!(self, "  mov {}, {}(%rbp)", ARGREG16[r], offset),
            4 => emit!(self, "  mov {}, {}(%rbp)", ARGREG32[r], offset),
            8 => emit!(self, "  mov {}, {}(%rbp)", ARGREG64[r], offset),
            _ => unreachable!("parameters are scalar or pointer"),
        }
    }
}

/// Index into [`CAST_TABLE`]: char, short, int, everything else 64-bit.
fn type_rank(ty: &Type<'_>) -> usize {
    match ty.kind {
        TypeKind::Char => 0,
        TypeKind::Short => 1,
        TypeKind::Int => 2,
        _ => 3,
    }
}
