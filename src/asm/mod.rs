pub mod assemble_error;
pub mod assembler;
pub mod disasm;
pub mod lexer;
pub mod op;

pub use assemble_error::AssembleError;
pub use assembler::{Assembled, Instruction, MEMORY_LIMIT, Operand, assemble, assemble_program};
pub use disasm::{disassemble, print_listing};
pub use lexer::{AsmToken, LexedLine, lex};
pub use op::Opcode;
