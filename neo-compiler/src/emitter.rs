//! Walks a parsed [`neo_ast::AstPool`] and emits [`neo_bytecode::Bytecode`].
//!
//! Grounded on spec §2's data-flow line - "AST -> (bytecode emitter, stub in
//! source) -> bytecode" - and on [`crate::error::CompileError`]'s own doc
//! comment: the 33-opcode table `neo-bytecode` defines is a straight-line
//! integer/float arithmetic machine with constant pushes and a handful of
//! print syscalls. It has no call, jump, or variable-storage instructions,
//! so this emitter only ever succeeds on a module whose every top-level
//! statement is an expression built from literals, groups, unary operators
//! and the non-assigning arithmetic/bitwise binary operators. Anything else
//! - functions, classes, control flow, variables, assignment, comparisons,
//! logical operators, calls - is rejected as [`CompileError::UnsupportedNode`]
//! rather than silently dropped or lowered into some invented sequence no
//! syntax in the language actually produced.

use neo_ast::{AstNode, AstPool, AstRef, BinaryOpType, UnaryOpType};
use neo_bytecode::{Bytecode, Opcode};
use neo_types::Bool;

use crate::error::CompileError;

/// Emits bytecode for `root` (a Module node) into a fresh [`Bytecode`] unit,
/// returning the first [`CompileError`] encountered for any node the
/// instruction set can't represent.
///
/// The unit always opens with `NOP` (matching `bc_finalize`'s invariant
/// that's otherwise the caller's job to uphold) and is sealed with a
/// trailing `HLT` before being handed back, so a caller only ever needs to
/// run [`Bytecode::validate`] once before execution.
pub fn emit_module(pool: &AstPool<'_>, root: AstRef) -> Result<Bytecode, CompileError> {
    let mut bc = Bytecode::new();
    bc.emit(neo_bytecode::Instruction::pack_no_imm(Opcode::Nop));

    let module = match pool.resolve(root) {
        AstNode::Module(m) => m,
        other => {
            return Err(CompileError::UnsupportedNode {
                kind: other.kind_name(),
            })
        }
    };
    if let Some(body) = module.body {
        emit_block_statements(pool, body, &mut bc)?;
    }

    bc.seal();
    Ok(bc)
}

/// Emits every statement in a Module-scope block. Each statement is an
/// expression evaluated for its side-effect-free value and then discarded
/// (`pop`) - there is no other statement shape this instruction set can
/// represent, so anything that isn't an expression is rejected upstream by
/// [`neo_ast::BlockScope::permits`] already having excluded it from this
/// block's children, or is caught below as an explicit error.
fn emit_block_statements(pool: &AstPool<'_>, block: AstRef, bc: &mut Bytecode) -> Result<(), CompileError> {
    let children = match pool.resolve(block) {
        AstNode::Block(b) => b.children,
        other => {
            return Err(CompileError::UnsupportedNode {
                kind: other.kind_name(),
            })
        }
    };
    for stmt in pool.children(children) {
        emit_expr(pool, stmt, bc)?;
        bc.emit(neo_bytecode::Instruction::pack_no_imm(Opcode::Pop));
    }
    Ok(())
}

/// Emits the instructions that compute one expression's value onto the top
/// of the operand stack, leaving exactly one record there.
fn emit_expr(pool: &AstPool<'_>, node: AstRef, bc: &mut Bytecode) -> Result<(), CompileError> {
    match pool.resolve(node) {
        AstNode::IntLit(v) => {
            bc.emit_ipush(*v);
            Ok(())
        }
        AstNode::FloatLit(v) => {
            bc.emit_fpush(*v);
            Ok(())
        }
        AstNode::BoolLit(v) => {
            emit_bool_push(*v, bc);
            Ok(())
        }
        AstNode::CharLit(v) => {
            bc.emit_ipush(*v as i64);
            Ok(())
        }
        AstNode::Group(g) => emit_expr(pool, g.child, bc),
        AstNode::UnaryOp(u) => emit_unary(pool, u.op, u.expr, bc),
        AstNode::BinaryOp(b) => emit_binary(pool, b.op, b.left, b.right, bc),
        other => Err(CompileError::UnsupportedNode {
            kind: other.kind_name(),
        }),
    }
}

/// Bools have no dedicated push opcode; they're ints with the Bool tag
/// indistinguishable in the bytecode's own value model, so the emitter
/// pushes the record's bit value directly via `ipush`/`ipush0` and lets
/// the reader's tag (supplied at the syscall boundary, not by the value
/// itself) decide how to print it. `0`/`1` both have dedicated opcodes,
/// so no bool literal ever needs the constant pool.
fn emit_bool_push(v: Bool, bc: &mut Bytecode) {
    bc.emit_ipush(v.byte() as i64);
}

fn emit_unary(pool: &AstPool<'_>, op: UnaryOpType, expr: AstRef, bc: &mut Bytecode) -> Result<(), CompileError> {
    match op {
        UnaryOpType::Plus => emit_expr(pool, expr, bc),
        UnaryOpType::Minus => {
            bc.emit_ipush(0);
            emit_expr(pool, expr, bc)?;
            bc.emit(neo_bytecode::Instruction::pack_no_imm(Opcode::ISub));
            Ok(())
        }
        UnaryOpType::BitCompl => {
            emit_expr(pool, expr, bc)?;
            bc.emit_ipush(-1);
            bc.emit(neo_bytecode::Instruction::pack_no_imm(Opcode::IXor));
            Ok(())
        }
        UnaryOpType::Not | UnaryOpType::Inc | UnaryOpType::Dec => Err(CompileError::UnsupportedNode {
            kind: "UNARY OP",
        }),
    }
}

fn emit_binary(
    pool: &AstPool<'_>,
    op: BinaryOpType,
    left: AstRef,
    right: Option<AstRef>,
    bc: &mut Bytecode,
) -> Result<(), CompileError> {
    let opcode = arith_opcode(op).ok_or(CompileError::UnsupportedNode { kind: "BINARY OP" })?;
    let right = right.ok_or(CompileError::UnsupportedNode { kind: "BINARY OP" })?;
    emit_expr(pool, left, bc)?;
    emit_expr(pool, right, bc)?;
    bc.emit(neo_bytecode::Instruction::pack_no_imm(opcode));
    Ok(())
}

/// Maps the non-assigning arithmetic/bitwise binary operators onto their
/// bytecode opcode. `Dot`, `Call`, every `*Assign` variant, the comparison
/// family and the two logical operators have no opcode at all in this
/// instruction set and return `None`.
fn arith_opcode(op: BinaryOpType) -> Option<Opcode> {
    use BinaryOpType::*;
    Some(match op {
        Add => Opcode::IAdd,
        Sub => Opcode::ISub,
        Mul => Opcode::IMul,
        Pow => Opcode::IPow,
        AddNoOv => Opcode::IAddO,
        SubNoOv => Opcode::ISubO,
        MulNoOv => Opcode::IMulO,
        PowNoOv => Opcode::IPowO,
        Div => Opcode::IDiv,
        Mod => Opcode::IMod,
        BitAnd => Opcode::IAnd,
        BitOr => Opcode::IOr,
        BitXor => Opcode::IXor,
        BitAshl => Opcode::ISal,
        BitAshr => Opcode::ISar,
        BitLshr => Opcode::ISlr,
        BitRol => Opcode::IRol,
        BitRor => Opcode::IRor,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo_lexer::{Lexer, SourceFile};

    fn compile_ok(src: &str) -> Bytecode {
        let file = SourceFile::new("t.neo", src);
        let tokens = Lexer::new(file).drain();
        let outcome = neo_parser::parse(tokens);
        assert!(outcome.errors.is_empty(), "unexpected parse errors: {:?}", outcome.errors);
        emit_module(&outcome.pool, outcome.root).expect("emit should succeed")
    }

    #[test]
    fn emits_nop_and_hlt_for_an_empty_module() {
        let bc = compile_ok("\n");
        assert!(bc.validate().is_ok());
        assert_eq!(bc.finalize().first().unwrap().opcode(), Opcode::Nop);
        assert_eq!(bc.finalize().last().unwrap().opcode(), Opcode::Hlt);
    }

    #[test]
    fn emits_arithmetic_for_a_free_expression_statement() {
        let bc = compile_ok("(10 + 2) * 3\n");
        assert!(bc.validate().is_ok());
        let ops: Vec<Opcode> = bc.finalize().iter().map(|i| i.opcode()).collect();
        assert!(ops.contains(&Opcode::IAdd));
        assert!(ops.contains(&Opcode::IMul));
        assert!(ops.contains(&Opcode::Pop));
    }

    #[test]
    fn rejects_variable_declarations() {
        let file = SourceFile::new("t.neo", "let x:int = 1\n");
        let tokens = Lexer::new(file).drain();
        let outcome = neo_parser::parse(tokens);
        assert!(outcome.errors.is_empty());
        let err = emit_module(&outcome.pool, outcome.root).unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedNode { kind: "VARIABLE" }));
    }

    #[test]
    fn rejects_comparison_operators() {
        let file = SourceFile::new("t.neo", "1 < 2\n");
        let tokens = Lexer::new(file).drain();
        let outcome = neo_parser::parse(tokens);
        assert!(outcome.errors.is_empty());
        let err = emit_module(&outcome.pool, outcome.root).unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedNode { kind: "BINARY OP" }));
    }
}
