//! Syntactic layer: tokens to per-line statements with detected
//! addressing modes.
//!
//! A line is: optional label, then an optional directive or instruction,
//! then a free-form operand. Addressing-mode detection is driven by the
//! operand's shape and the instruction's supported modes, with the
//! zero-page forms preferred when the value fits in 8 bits.

use std::collections::HashMap;

use mos_6502::{opcodes, AddressingMode, Mnemonic};

use crate::assembler::Symbol;
use crate::lexer::{tokenize, Token, TokenKind};
use crate::AsmError;

/// One parsed source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub number: usize,
    pub label: Option<String>,
    pub statement: Option<Statement>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Directive {
        name: String,
        operand: String,
    },
    Instruction {
        mnemonic: Mnemonic,
        mode: AddressingMode,
        /// Operand value as currently known; zero for an unresolved symbol.
        value: u16,
        /// Symbol reference to resolve on the emission pass.
        symbol: Option<String>,
        /// Raw operand text, for diagnostics.
        operand: String,
    },
}

/// Parse the whole source against the current symbol table.
///
/// The assembler calls this once per pass: on the first pass the symbol
/// table is still filling up, so symbol references resolve to zero; on the
/// second pass every defined label is visible.
pub fn parse_source(
    source: &str,
    symbols: &HashMap<String, Symbol>,
) -> Result<Vec<Line>, AsmError> {
    let tokens = tokenize(source)?;
    let mut lines = Vec::new();

    for group in split_lines(&tokens) {
        if let Some(line) = parse_line(group, symbols)? {
            lines.push(line);
        }
    }
    Ok(lines)
}

/// Group tokens by source line, dropping comments and EOL markers.
fn split_lines(tokens: &[Token]) -> Vec<&[Token]> {
    let mut groups = Vec::new();
    let mut start = 0;
    for (i, token) in tokens.iter().enumerate() {
        if token.kind == TokenKind::Eol {
            groups.push(&tokens[start..i]);
            start = i + 1;
        }
    }
    groups.push(&tokens[start..]);
    groups
}

fn parse_line(
    tokens: &[Token],
    symbols: &HashMap<String, Symbol>,
) -> Result<Option<Line>, AsmError> {
    let tokens: Vec<&Token> = tokens
        .iter()
        .filter(|t| t.kind != TokenKind::Comment)
        .collect();
    if tokens.is_empty() {
        return Ok(None);
    }

    let number = tokens[0].line;
    let mut position = 0;
    let mut label = None;

    if tokens[position].kind == TokenKind::Label {
        label = Some(tokens[position].text.clone());
        position += 1;
    }

    let statement = match tokens.get(position).map(|t| t.kind) {
        Some(TokenKind::Directive) => {
            let name = tokens[position].text.clone();
            let operand = join_operand(&tokens[position + 1..]);
            Some(Statement::Directive { name, operand })
        }
        Some(TokenKind::Mnemonic) => {
            let mnemonic_text = &tokens[position].text;
            let mnemonic = Mnemonic::parse(mnemonic_text).ok_or_else(|| {
                AsmError::UnknownInstruction {
                    line: number,
                    name: mnemonic_text.clone(),
                }
            })?;
            let operand = join_operand(&tokens[position + 1..]);
            let (mode, value, symbol) = detect_mode(mnemonic, &operand, symbols, number)?;
            Some(Statement::Instruction {
                mnemonic,
                mode,
                value,
                symbol,
                operand,
            })
        }
        Some(TokenKind::Operand) => {
            // An identifier in statement position that is not a mnemonic:
            // a misspelled instruction.
            return Err(AsmError::UnknownInstruction {
                line: number,
                name: tokens[position].text.clone(),
            });
        }
        _ => None,
    };

    Ok(Some(Line {
        number,
        label,
        statement,
    }))
}

/// Reassemble the operand from its tokens. Tokens were split on
/// whitespace, so joining without separators normalizes `( $20 , X )`
/// to `($20,X)`.
fn join_operand(tokens: &[&Token]) -> String {
    tokens.iter().map(|t| t.text.as_str()).collect()
}

/// Detect the addressing mode from the operand's shape, preferring
/// zero-page encodings for 8-bit values.
fn detect_mode(
    mnemonic: Mnemonic,
    operand: &str,
    symbols: &HashMap<String, Symbol>,
    line: usize,
) -> Result<(AddressingMode, u16, Option<String>), AsmError> {
    use AddressingMode as Mode;

    let unsupported = || AsmError::UnsupportedAddressingMode {
        line,
        mnemonic: mnemonic.as_str().to_string(),
        operand: operand.to_string(),
    };

    if operand.is_empty() {
        // Shift/rotate without an operand means the accumulator.
        if mnemonic.is_shift() && opcodes::supports(mnemonic, Mode::Accumulator) {
            return Ok((Mode::Accumulator, 0, None));
        }
        if opcodes::supports(mnemonic, Mode::Implicit) {
            return Ok((Mode::Implicit, 0, None));
        }
        return Err(AsmError::MissingOperand {
            line,
            mnemonic: mnemonic.as_str().to_string(),
        });
    }

    if operand.eq_ignore_ascii_case("A") {
        if opcodes::supports(mnemonic, Mode::Accumulator) {
            return Ok((Mode::Accumulator, 0, None));
        }
        return Err(unsupported());
    }

    if let Some(rest) = operand.strip_prefix('#') {
        if opcodes::supports(mnemonic, Mode::Immediate) {
            let (value, symbol) = parse_operand_value(rest, symbols, line)?;
            return Ok((Mode::Immediate, value, symbol));
        }
        return Err(unsupported());
    }

    if let Some(inner) = operand.strip_prefix('(') {
        if let Some(base) = inner.strip_suffix(",X)").or_else(|| inner.strip_suffix(",x)")) {
            if opcodes::supports(mnemonic, Mode::IndirectX) {
                let (value, symbol) = parse_operand_value(base, symbols, line)?;
                return Ok((Mode::IndirectX, value, symbol));
            }
            return Err(unsupported());
        }
        if let Some(base) = inner.strip_suffix("),Y").or_else(|| inner.strip_suffix("),y")) {
            if opcodes::supports(mnemonic, Mode::IndirectY) {
                let (value, symbol) = parse_operand_value(base, symbols, line)?;
                return Ok((Mode::IndirectY, value, symbol));
            }
            return Err(unsupported());
        }
        if let Some(base) = inner.strip_suffix(')') {
            if opcodes::supports(mnemonic, Mode::Indirect) {
                let (value, symbol) = parse_operand_value(base, symbols, line)?;
                return Ok((Mode::Indirect, value, symbol));
            }
            return Err(unsupported());
        }
    }

    if let Some(base) = operand.strip_suffix(",X").or_else(|| operand.strip_suffix(",x")) {
        let (value, symbol) = parse_operand_value(base, symbols, line)?;
        if value < 0x100 && opcodes::supports(mnemonic, Mode::ZeroPageX) {
            return Ok((Mode::ZeroPageX, value, symbol));
        }
        if opcodes::supports(mnemonic, Mode::AbsoluteX) {
            return Ok((Mode::AbsoluteX, value, symbol));
        }
        return Err(unsupported());
    }

    if let Some(base) = operand.strip_suffix(",Y").or_else(|| operand.strip_suffix(",y")) {
        let (value, symbol) = parse_operand_value(base, symbols, line)?;
        if value < 0x100 && opcodes::supports(mnemonic, Mode::ZeroPageY) {
            return Ok((Mode::ZeroPageY, value, symbol));
        }
        if opcodes::supports(mnemonic, Mode::AbsoluteY) {
            return Ok((Mode::AbsoluteY, value, symbol));
        }
        return Err(unsupported());
    }

    let (value, symbol) = parse_operand_value(operand, symbols, line)?;
    if value < 0x100 && opcodes::supports(mnemonic, Mode::ZeroPage) {
        return Ok((Mode::ZeroPage, value, symbol));
    }
    if opcodes::supports(mnemonic, Mode::Absolute) {
        return Ok((Mode::Absolute, value, symbol));
    }
    if opcodes::supports(mnemonic, Mode::Relative) {
        return Ok((Mode::Relative, value, symbol));
    }
    Err(unsupported())
}

/// Whether the text is a numeric literal (as opposed to a symbol).
pub fn is_numeric(text: &str) -> bool {
    text.starts_with('$') || text.starts_with('%') || text.parse::<u16>().is_ok()
}

/// Parse a number in `$hex`, `%binary` or decimal form.
pub fn parse_number(text: &str, line: usize) -> Result<u16, AsmError> {
    let text = text.trim();
    let malformed = || AsmError::MalformedOperand {
        line,
        text: text.to_string(),
    };
    if let Some(hex) = text.strip_prefix('$') {
        return u16::from_str_radix(hex, 16).map_err(|_| malformed());
    }
    if let Some(bin) = text.strip_prefix('%') {
        return u16::from_str_radix(bin, 2).map_err(|_| malformed());
    }
    text.parse::<u16>().map_err(|_| malformed())
}

/// Value of an operand base: a literal, or a symbol looked up against the
/// current table (zero, with the name recorded, when not yet defined).
fn parse_operand_value(
    text: &str,
    symbols: &HashMap<String, Symbol>,
    line: usize,
) -> Result<(u16, Option<String>), AsmError> {
    let text = text.trim();
    if is_numeric(text) {
        return Ok((parse_number(text, line)?, None));
    }
    if text.is_empty() || !text.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_') {
        return Err(AsmError::MalformedOperand {
            line,
            text: text.to_string(),
        });
    }
    let value = symbols.get(text).map_or(0, |s| s.value);
    Ok((value, Some(text.to_string())))
}
