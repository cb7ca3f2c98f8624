//! Linear-sweep disassembler.
//!
//! Given a read-only byte source, a start address and a length, the sweep
//! decodes one instruction at a time and advances by its encoded size.
//! Invalid opcodes become single-byte locations; an instruction whose
//! operand bytes would run past the end of the window ends the sweep.

use std::fmt;

use emu_core::ByteSource;
use mos_6502::{opcodes, AddressingMode, Opcode};

/// One decoded instruction location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Address of the opcode byte.
    pub pc: u16,
    /// The opcode byte itself.
    pub opcode: u8,
    /// Operand bytes (0 to 2 of them).
    pub operands: Vec<u8>,
    /// Decoded instruction, or `None` for an invalid or truncated opcode.
    pub inst: Option<&'static Opcode>,
}

impl Location {
    /// Encoded size of this location in bytes.
    #[must_use]
    pub fn size(&self) -> u16 {
        match self.inst {
            Some(op) => u16::from(op.size()),
            None => 1,
        }
    }

    /// Operand in canonical assembly syntax (empty for implicit).
    #[must_use]
    pub fn operand_text(&self) -> String {
        let Some(op) = self.inst else {
            return String::new();
        };
        let b = &self.operands;
        match op.mode {
            AddressingMode::Implicit => String::new(),
            AddressingMode::Accumulator => "A".to_string(),
            AddressingMode::Immediate => format!("#${:02X}", b[0]),
            AddressingMode::ZeroPage => format!("${:02X}", b[0]),
            AddressingMode::ZeroPageX => format!("${:02X},X", b[0]),
            AddressingMode::ZeroPageY => format!("${:02X},Y", b[0]),
            AddressingMode::Absolute => format!("${:02X}{:02X}", b[1], b[0]),
            AddressingMode::AbsoluteX => format!("${:02X}{:02X},X", b[1], b[0]),
            AddressingMode::AbsoluteY => format!("${:02X}{:02X},Y", b[1], b[0]),
            AddressingMode::Indirect => format!("(${:02X}{:02X})", b[1], b[0]),
            AddressingMode::IndirectX => format!("(${:02X},X)", b[0]),
            AddressingMode::IndirectY => format!("(${:02X}),Y", b[0]),
            AddressingMode::Relative => {
                // The printed target is resolved against this PC, not the
                // raw offset.
                let offset = b[0] as i8;
                let target = self.pc.wrapping_add(2).wrapping_add(offset as i16 as u16);
                format!("${target:04X}")
            }
        }
    }

    /// Instruction column: `MNEM operand`, or `db $HH` for an invalid byte.
    fn instruction_text(&self) -> String {
        match self.inst {
            None => format!("db ${:02X}", self.opcode),
            Some(op) => {
                let operand = self.operand_text();
                if operand.is_empty() {
                    op.mnemonic.to_string()
                } else {
                    format!("{} {}", op.mnemonic, operand)
                }
            }
        }
    }

    /// Hex dump of the opcode and operand bytes.
    fn hex_dump(&self) -> String {
        let mut dump = format!("{:02X}", self.opcode);
        for byte in &self.operands {
            dump.push_str(&format!(" {byte:02X}"));
        }
        dump
    }
}

impl fmt::Display for Location {
    /// `$AAAA: HH HH HH  MNEM operand`, hex dump left-justified to 8.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "${:04X}: {:<8}  {}",
            self.pc,
            self.hex_dump(),
            self.instruction_text()
        )
    }
}

/// Disassemble a window into an ordered list of locations.
pub fn disassemble_window<S: ByteSource + ?Sized>(
    source: &S,
    start: u16,
    length: u16,
) -> Vec<Location> {
    let end = u32::from(start) + u32::from(length);
    let mut locations = Vec::new();
    let mut pc = u32::from(start);

    while pc < end {
        let addr = pc as u16;
        let opcode = source.read(addr);
        let mut location = Location {
            pc: addr,
            opcode,
            operands: Vec::new(),
            inst: None,
        };

        let Some(desc) = opcodes::decode(opcode) else {
            // Invalid opcode: single-byte location, keep sweeping.
            locations.push(location);
            pc += 1;
            continue;
        };

        let operand_count = u32::from(desc.mode.operand_bytes());
        if pc + 1 + operand_count > end {
            // Operands would run past the window: emit the bare byte and
            // stop without reading beyond the range.
            locations.push(location);
            break;
        }

        location.inst = Some(desc);
        for i in 0..operand_count {
            location.operands.push(source.read((pc + 1 + i) as u16));
        }
        pc += 1 + operand_count;
        locations.push(location);
    }

    locations
}

/// Disassemble a window to text, one location per line.
pub fn disassemble<S: ByteSource + ?Sized>(source: &S, start: u16, length: u16) -> String {
    let mut out = String::new();
    for location in disassemble_window(source, start, length) {
        out.push_str(&location.to_string());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_instruction_window() {
        let bytes: &[u8] = &[0xA9, 0x42, 0x8D, 0x34, 0x12, 0x60];
        let locations = disassemble_window(bytes, 0x0000, 6);

        assert_eq!(locations.len(), 3);
        assert_eq!(locations[0].pc, 0x0000);
        assert_eq!(locations[1].pc, 0x0002);
        assert_eq!(locations[2].pc, 0x0005);
        assert_eq!(locations[0].instruction_text(), "LDA #$42");
        assert_eq!(locations[1].instruction_text(), "STA $1234");
        assert_eq!(locations[2].instruction_text(), "RTS");
    }

    #[test]
    fn text_format() {
        let bytes: &[u8] = &[0xA9, 0x42, 0x60];
        let text = disassemble(bytes, 0x0000, 3);
        assert_eq!(text, "$0000: A9 42     LDA #$42\n$0002: 60        RTS\n");
    }

    #[test]
    fn invalid_opcode_is_one_byte() {
        let bytes: &[u8] = &[0x02, 0xEA];
        let locations = disassemble_window(bytes, 0x0000, 2);
        assert_eq!(locations.len(), 2);
        assert!(locations[0].inst.is_none());
        assert_eq!(locations[0].size(), 1);
        assert_eq!(locations[0].instruction_text(), "db $02");
        assert_eq!(locations[1].instruction_text(), "NOP");
    }

    #[test]
    fn truncated_operand_stops_the_sweep() {
        // LDA absolute needs two operand bytes but only one is inside the
        // window.
        let bytes: &[u8] = &[0xAD, 0x00];
        let locations = disassemble_window(bytes, 0x0000, 2);
        assert_eq!(locations.len(), 1);
        assert!(locations[0].inst.is_none());
    }

    #[test]
    fn relative_target_is_resolved() {
        // BEQ +$10 at $0200 prints the absolute target.
        let bytes: &[u8] = &[0xF0, 0x10];
        let mut bus = emu_core::SimpleBus::new();
        bus.load(0x0200, bytes);
        let locations = disassemble_window(&bus, 0x0200, 2);
        assert_eq!(locations[0].instruction_text(), "BEQ $0212");

        // Negative offset.
        let mut bus = emu_core::SimpleBus::new();
        bus.load(0x0200, &[0xF0, 0xFE]);
        let locations = disassemble_window(&bus, 0x0200, 2);
        assert_eq!(locations[0].instruction_text(), "BEQ $0200");
    }

    #[test]
    fn every_addressing_mode_formats() {
        let cases: &[(&[u8], &str)] = &[
            (&[0xEA], "NOP"),
            (&[0x0A], "ASL A"),
            (&[0xA9, 0x10], "LDA #$10"),
            (&[0xA5, 0x10], "LDA $10"),
            (&[0xB5, 0x10], "LDA $10,X"),
            (&[0xB6, 0x10], "LDX $10,Y"),
            (&[0xAD, 0x34, 0x12], "LDA $1234"),
            (&[0xBD, 0x34, 0x12], "LDA $1234,X"),
            (&[0xB9, 0x34, 0x12], "LDA $1234,Y"),
            (&[0x6C, 0x34, 0x12], "JMP ($1234)"),
            (&[0xA1, 0x10], "LDA ($10,X)"),
            (&[0xB1, 0x10], "LDA ($10),Y"),
        ];
        for (bytes, expected) in cases {
            let locations = disassemble_window(*bytes, 0x0000, bytes.len() as u16);
            assert_eq!(locations[0].instruction_text(), *expected);
        }
    }

    #[test]
    fn hex_dump_is_left_justified_to_eight() {
        let bytes: &[u8] = &[0x8D, 0x34, 0x12];
        let line = disassemble(bytes, 0x0000, 3);
        assert_eq!(line, "$0000: 8D 34 12  STA $1234\n");
    }
}
