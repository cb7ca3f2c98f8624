//! Two-pass assembler.
//!
//! Pass 1 walks every line recording label addresses and advancing the
//! program counter by each statement's encoded size. Pass 2 walks again,
//! resolving symbols against the completed table and emitting bytes.
//! Symbols that resolve below $100 downgrade Absolute addressing to the
//! zero-page form when the instruction supports it.

use std::collections::HashMap;

use mos_6502::{opcodes, AddressingMode, Mnemonic};

use crate::parser::{parse_number, parse_source, Statement};
use crate::AsmError;

/// A label with its resolved address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub value: u16,
    pub defined: bool,
}

/// Assembler state across the two passes.
pub struct Assembler {
    symbols: HashMap<String, Symbol>,
    pc: u16,
    output: Vec<u8>,
}

/// Assemble a source string to its output bytes.
///
/// # Errors
///
/// Any lexical, syntactic, addressing-mode, unresolved-symbol or
/// branch-range failure aborts the run; no partial output is returned.
pub fn assemble(source: &str) -> Result<Vec<u8>, AsmError> {
    Assembler::new().assemble(source)
}

impl Assembler {
    #[must_use]
    pub fn new() -> Self {
        Self {
            symbols: HashMap::new(),
            pc: 0,
            output: Vec::new(),
        }
    }

    /// Run both passes over the source and return the output bytes.
    ///
    /// # Errors
    ///
    /// As for [`assemble`].
    pub fn assemble(mut self, source: &str) -> Result<Vec<u8>, AsmError> {
        self.collect_symbols(source)?;
        log::debug!(
            "pass 1 complete: {} symbols, end pc ${:04X}",
            self.symbols.len(),
            self.pc
        );

        self.pc = 0;
        self.emit(source)?;
        log::debug!("pass 2 complete: {} output bytes", self.output.len());
        Ok(self.output)
    }

    /// Pass 1: record label addresses, track the program counter.
    fn collect_symbols(&mut self, source: &str) -> Result<(), AsmError> {
        let lines = parse_source(source, &self.symbols)?;
        for line in lines {
            if let Some(label) = line.label {
                self.symbols.insert(
                    label.clone(),
                    Symbol {
                        name: label,
                        value: self.pc,
                        defined: true,
                    },
                );
            }
            match line.statement {
                Some(Statement::Directive { name, operand }) => {
                    self.directive(&name, &operand, line.number, false)?;
                }
                Some(Statement::Instruction { mode, .. }) => {
                    self.pc = self.pc.wrapping_add(1 + u16::from(mode.operand_bytes()));
                }
                None => {}
            }
        }
        Ok(())
    }

    /// Pass 2: resolve symbols and emit code.
    fn emit(&mut self, source: &str) -> Result<(), AsmError> {
        // Re-parse with the full symbol table so operand values and
        // mode detection see every label.
        let lines = parse_source(source, &self.symbols)?;
        for line in lines {
            match line.statement {
                Some(Statement::Directive { name, operand }) => {
                    self.directive(&name, &operand, line.number, true)?;
                }
                Some(Statement::Instruction {
                    mnemonic,
                    mode,
                    value,
                    symbol,
                    operand,
                }) => {
                    self.emit_instruction(mnemonic, mode, value, symbol.as_deref(), &operand, line.number)?;
                }
                None => {}
            }
        }
        Ok(())
    }

    fn emit_instruction(
        &mut self,
        mnemonic: Mnemonic,
        mode: AddressingMode,
        value: u16,
        symbol: Option<&str>,
        operand: &str,
        line: usize,
    ) -> Result<(), AsmError> {
        let mut mode = mode;
        let mut value = value;

        if let Some(name) = symbol {
            let resolved = self
                .symbols
                .get(name)
                .ok_or_else(|| AsmError::UnknownSymbol {
                    line,
                    name: name.to_string(),
                })?;
            value = resolved.value;

            // Zero-page optimization: a symbol that landed below $100
            // downgrades the absolute form when the instruction has the
            // matching zero-page encoding.
            if value < 0x100 {
                let downgraded = match mode {
                    AddressingMode::Absolute => AddressingMode::ZeroPage,
                    AddressingMode::AbsoluteX => AddressingMode::ZeroPageX,
                    AddressingMode::AbsoluteY => AddressingMode::ZeroPageY,
                    other => other,
                };
                if downgraded != mode && opcodes::supports(mnemonic, downgraded) {
                    mode = downgraded;
                }
            }
        }

        let opcode =
            opcodes::encode(mnemonic, mode).ok_or_else(|| AsmError::UnsupportedAddressingMode {
                line,
                mnemonic: mnemonic.as_str().to_string(),
                operand: operand.to_string(),
            })?;
        self.output.push(opcode);

        if mode == AddressingMode::Relative {
            // The branch distance is measured from the next instruction.
            let next_pc = i32::from(self.pc) + 2;
            let distance = i32::from(value) - next_pc;
            if !(-128..=127).contains(&distance) {
                return Err(AsmError::BranchOutOfRange { line, distance });
            }
            self.output.push(distance as u8);
        } else {
            match mode.operand_bytes() {
                0 => {}
                1 => self.output.push(value as u8),
                _ => {
                    self.output.push(value as u8);
                    self.output.push((value >> 8) as u8);
                }
            }
        }

        self.pc = self.pc.wrapping_add(1 + u16::from(mode.operand_bytes()));
        Ok(())
    }

    fn directive(
        &mut self,
        name: &str,
        operand: &str,
        line: usize,
        emitting: bool,
    ) -> Result<(), AsmError> {
        match name {
            ".org" => {
                let target = parse_number(operand, line)?;
                // Pad with zeros to reach the target, but only once output
                // exists; a leading .org just sets the origin.
                if emitting && !self.output.is_empty() && target > self.pc {
                    let gap = target - self.pc;
                    self.output.extend(std::iter::repeat(0).take(usize::from(gap)));
                }
                self.pc = target;
            }
            ".byte" => {
                let values = parse_byte_list(operand, line)?;
                if emitting {
                    self.output.extend_from_slice(&values);
                }
                self.pc = self.pc.wrapping_add(values.len() as u16);
            }
            ".word" => {
                let values = parse_word_list(operand, line)?;
                if emitting {
                    for value in &values {
                        self.output.push(*value as u8);
                        self.output.push((value >> 8) as u8);
                    }
                }
                self.pc = self.pc.wrapping_add(values.len() as u16 * 2);
            }
            _ => {
                return Err(AsmError::UnknownDirective {
                    line,
                    name: name.to_string(),
                })
            }
        }
        Ok(())
    }
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}

/// Split a `.byte` operand list on commas, keeping quoted strings whole.
fn split_list(operand: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_string = false;
    for ch in operand.chars() {
        match ch {
            '"' => {
                in_string = !in_string;
                current.push(ch);
            }
            ',' if !in_string => {
                parts.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

/// `.byte` values: numbers, or string literals expanded to ASCII bytes.
fn parse_byte_list(operand: &str, line: usize) -> Result<Vec<u8>, AsmError> {
    let mut values = Vec::new();
    for part in split_list(operand) {
        if part.starts_with('"') && part.ends_with('"') && part.len() >= 2 {
            values.extend(part[1..part.len() - 1].bytes());
        } else {
            values.push(parse_number(&part, line)? as u8);
        }
    }
    Ok(values)
}

/// `.word` values, emitted little-endian by the caller.
fn parse_word_list(operand: &str, line: usize) -> Result<Vec<u16>, AsmError> {
    split_list(operand)
        .iter()
        .map(|part| parse_number(part, line))
        .collect()
}
