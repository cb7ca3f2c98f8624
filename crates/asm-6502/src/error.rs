//! Assembler error types.
//!
//! Every failure names the offending source line. Any error aborts the
//! assembly; partial output is discarded.

use thiserror::Error;

/// A fatal assembly error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AsmError {
    /// A mnemonic that is not in the instruction set.
    #[error("line {line}: unknown instruction '{name}'")]
    UnknownInstruction { line: usize, name: String },

    /// An operand shape the mnemonic does not support.
    #[error("line {line}: {mnemonic} does not support addressing mode of operand '{operand}'")]
    UnsupportedAddressingMode {
        line: usize,
        mnemonic: String,
        operand: String,
    },

    /// A directive that is not `.org`, `.byte` or `.word`.
    #[error("line {line}: unknown directive '{name}'")]
    UnknownDirective { line: usize, name: String },

    /// A referenced label was never defined.
    #[error("line {line}: unknown symbol '{name}'")]
    UnknownSymbol { line: usize, name: String },

    /// A relative branch distance outside [-128, +127].
    #[error("line {line}: branch target out of range ({distance} bytes)")]
    BranchOutOfRange { line: usize, distance: i32 },

    /// An operand that is neither a literal nor a plausible symbol.
    #[error("line {line}: malformed operand '{text}'")]
    MalformedOperand { line: usize, text: String },

    /// An instruction written without its required operand.
    #[error("line {line}: {mnemonic} requires an operand")]
    MissingOperand { line: usize, mnemonic: String },

    /// An unterminated string literal in a `.byte` list.
    #[error("line {line}: unterminated string literal")]
    UnterminatedString { line: usize },
}
