//! 6502 assembler and disassembler.
//!
//! Both tools share the opcode table in the `mos-6502` crate, so the
//! assembler, the disassembler and the CPU can never disagree about an
//! encoding.
//!
//! The assembler is intentionally small: one statement per line, `$`/`%`/
//! decimal literals, single symbols (no expressions), and the `.org`,
//! `.byte` and `.word` directives. See [`assemble`].
//!
//! The disassembler performs a strictly linear sweep over a read-only byte
//! source. See [`disassemble`] and [`disassemble_window`].

mod assembler;
mod disassembler;
mod error;
mod lexer;
mod parser;

pub use assembler::{assemble, Assembler, Symbol};
pub use disassembler::{disassemble, disassemble_window, Location};
pub use error::AsmError;
