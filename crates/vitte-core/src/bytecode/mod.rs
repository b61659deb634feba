//! Bytecode format: the flat instruction stream (`chunk`), the opcode
//! table (`ops`), and a disassembler used by tests and the CLI's `--trace`
//! flag (`disasm`).

pub mod chunk;
pub mod disasm;
pub mod ops;

pub use chunk::{Chunk, LineTable};
pub use disasm::disassemble_instruction;
pub use ops::OpCode;
