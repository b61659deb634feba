//! Human-readable instruction dumps, used by `Chunk::disassemble` and the
//! CLI's `--trace` flag to print each instruction as the VM executes it.
//!
//! `OP_CLOSURE`'s upvalue descriptor bytes are variable-length and sized by
//! the function's `upvalue_count`, which this module has no access to
//! (chunks don't carry a heap reference); disassembly of that instruction
//! stops at its leading constant and marks the rest with an ellipsis.

use super::chunk::Chunk;
use super::ops::OpCode;

fn simple(name: &str, offset: usize) -> (String, usize) {
    (format!("{name}"), offset + 1)
}

fn byte_operand(name: &str, chunk: &Chunk, offset: usize) -> (String, usize) {
    let slot = chunk.code[offset + 1];
    (format!("{name:<16} {slot:4}"), offset + 2)
}

fn render_constant(chunk: &Chunk, index: u8) -> String {
    chunk.get_constant(index).map(|v| format!("{v:?}")).unwrap_or_else(|_| "<invalid>".to_string())
}

fn constant_operand(name: &str, chunk: &Chunk, offset: usize) -> (String, usize) {
    let index = chunk.code[offset + 1];
    (format!("{name:<16} {index:4} '{}'", render_constant(chunk, index)), offset + 2)
}

fn jump_operand(name: &str, chunk: &Chunk, offset: usize, sign: i32) -> (String, usize) {
    let jump = chunk.read_u16(offset + 1) as i32;
    let target = offset as i32 + 3 + sign * jump;
    (format!("{name:<16} {offset:4} -> {target}"), offset + 3)
}

fn invoke_operand(name: &str, chunk: &Chunk, offset: usize) -> (String, usize) {
    let index = chunk.code[offset + 1];
    let arg_count = chunk.code[offset + 2];
    (format!("{name:<16} ({arg_count} args) {index:4} '{}'", render_constant(chunk, index)), offset + 3)
}

/// Disassembles the instruction at `offset`, returning its text and the
/// offset of the instruction that follows.
pub fn disassemble_instruction(chunk: &Chunk, offset: usize) -> (String, usize) {
    let line = chunk.lines.line_for_offset(offset);
    let line_prefix = if offset > 0 && chunk.lines.line_for_offset(offset - 1) == line {
        "   |".to_string()
    } else {
        format!("{line:4}")
    };

    let byte = chunk.code[offset];
    let op = match OpCode::try_from(byte) {
        Ok(op) => op,
        Err(_) => return (format!("{offset:04} {line_prefix} Unknown opcode {byte}"), offset + 1),
    };

    let (body, next) = match op {
        OpCode::Constant
        | OpCode::GetGlobal
        | OpCode::DefineGlobal
        | OpCode::SetGlobal
        | OpCode::GetProperty
        | OpCode::SetProperty
        | OpCode::GetSuper
        | OpCode::Class
        | OpCode::Method => constant_operand(op.mnemonic(), chunk, offset),
        OpCode::GetLocal | OpCode::SetLocal | OpCode::Call | OpCode::GetUpvalue | OpCode::SetUpvalue => {
            byte_operand(op.mnemonic(), chunk, offset)
        }
        OpCode::Jump | OpCode::JumpIfFalse => jump_operand(op.mnemonic(), chunk, offset, 1),
        OpCode::Loop => jump_operand(op.mnemonic(), chunk, offset, -1),
        OpCode::Invoke | OpCode::SuperInvoke => invoke_operand(op.mnemonic(), chunk, offset),
        OpCode::Closure => {
            let index = chunk.code[offset + 1];
            (format!("{:<16} {index:4} '{}' ...", op.mnemonic(), render_constant(chunk, index)), offset + 2)
        }
        _ => simple(op.mnemonic(), offset),
    };

    (format!("{offset:04} {line_prefix} {body}"), next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn disassembles_a_constant_load() {
        let mut chunk = Chunk::new();
        let idx = chunk.add_constant(Value::number(1.5)).unwrap();
        chunk.write_op(OpCode::Constant, 1);
        chunk.write_byte(idx, 1);
        let (text, next) = disassemble_instruction(&chunk, 0);
        assert!(text.contains("OP_CONSTANT"));
        assert_eq!(next, 2);
    }
}
