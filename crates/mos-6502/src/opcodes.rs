//! The 6502 opcode and addressing-mode table.
//!
//! One entry per documented opcode byte, recording the mnemonic, addressing
//! mode, base cycle count, and whether a page-crossing indexed read costs an
//! extra cycle. The CPU decodes from this table, the assembler encodes
//! against it, and the disassembler formats from it.
//!
//! The undocumented NMOS opcodes are not implemented; their slots are `None`.

/// The 13 documented addressing modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    Implicit,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    IndirectX,
    IndirectY,
    Relative,
}

impl AddressingMode {
    /// Operand bytes following the opcode byte.
    #[must_use]
    pub const fn operand_bytes(self) -> u8 {
        match self {
            Self::Implicit | Self::Accumulator => 0,
            Self::Immediate
            | Self::ZeroPage
            | Self::ZeroPageX
            | Self::ZeroPageY
            | Self::IndirectX
            | Self::IndirectY
            | Self::Relative => 1,
            Self::Absolute | Self::AbsoluteX | Self::AbsoluteY | Self::Indirect => 2,
        }
    }
}

/// Instruction mnemonics, one per documented 6502 operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[rustfmt::skip]
pub enum Mnemonic {
    Adc, And, Asl, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Brk, Bvc, Bvs,
    Clc, Cld, Cli, Clv, Cmp, Cpx, Cpy, Dec, Dex, Dey, Eor, Inc, Inx,
    Iny, Jmp, Jsr, Lda, Ldx, Ldy, Lsr, Nop, Ora, Pha, Php, Pla, Plp,
    Rol, Ror, Rti, Rts, Sbc, Sec, Sed, Sei, Sta, Stx, Sty, Tax, Tay,
    Tsx, Txa, Txs, Tya,
}

impl Mnemonic {
    /// Canonical upper-case assembly spelling.
    #[must_use]
    #[rustfmt::skip]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Adc => "ADC", Self::And => "AND", Self::Asl => "ASL",
            Self::Bcc => "BCC", Self::Bcs => "BCS", Self::Beq => "BEQ",
            Self::Bit => "BIT", Self::Bmi => "BMI", Self::Bne => "BNE",
            Self::Bpl => "BPL", Self::Brk => "BRK", Self::Bvc => "BVC",
            Self::Bvs => "BVS", Self::Clc => "CLC", Self::Cld => "CLD",
            Self::Cli => "CLI", Self::Clv => "CLV", Self::Cmp => "CMP",
            Self::Cpx => "CPX", Self::Cpy => "CPY", Self::Dec => "DEC",
            Self::Dex => "DEX", Self::Dey => "DEY", Self::Eor => "EOR",
            Self::Inc => "INC", Self::Inx => "INX", Self::Iny => "INY",
            Self::Jmp => "JMP", Self::Jsr => "JSR", Self::Lda => "LDA",
            Self::Ldx => "LDX", Self::Ldy => "LDY", Self::Lsr => "LSR",
            Self::Nop => "NOP", Self::Ora => "ORA", Self::Pha => "PHA",
            Self::Php => "PHP", Self::Pla => "PLA", Self::Plp => "PLP",
            Self::Rol => "ROL", Self::Ror => "ROR", Self::Rti => "RTI",
            Self::Rts => "RTS", Self::Sbc => "SBC", Self::Sec => "SEC",
            Self::Sed => "SED", Self::Sei => "SEI", Self::Sta => "STA",
            Self::Stx => "STX", Self::Sty => "STY", Self::Tax => "TAX",
            Self::Tay => "TAY", Self::Tsx => "TSX", Self::Txa => "TXA",
            Self::Txs => "TXS", Self::Tya => "TYA",
        }
    }

    /// Parse a mnemonic, case-insensitively.
    #[must_use]
    #[rustfmt::skip]
    pub fn parse(text: &str) -> Option<Self> {
        let upper = text.to_ascii_uppercase();
        Some(match upper.as_str() {
            "ADC" => Self::Adc, "AND" => Self::And, "ASL" => Self::Asl,
            "BCC" => Self::Bcc, "BCS" => Self::Bcs, "BEQ" => Self::Beq,
            "BIT" => Self::Bit, "BMI" => Self::Bmi, "BNE" => Self::Bne,
            "BPL" => Self::Bpl, "BRK" => Self::Brk, "BVC" => Self::Bvc,
            "BVS" => Self::Bvs, "CLC" => Self::Clc, "CLD" => Self::Cld,
            "CLI" => Self::Cli, "CLV" => Self::Clv, "CMP" => Self::Cmp,
            "CPX" => Self::Cpx, "CPY" => Self::Cpy, "DEC" => Self::Dec,
            "DEX" => Self::Dex, "DEY" => Self::Dey, "EOR" => Self::Eor,
            "INC" => Self::Inc, "INX" => Self::Inx, "INY" => Self::Iny,
            "JMP" => Self::Jmp, "JSR" => Self::Jsr, "LDA" => Self::Lda,
            "LDX" => Self::Ldx, "LDY" => Self::Ldy, "LSR" => Self::Lsr,
            "NOP" => Self::Nop, "ORA" => Self::Ora, "PHA" => Self::Pha,
            "PHP" => Self::Php, "PLA" => Self::Pla, "PLP" => Self::Plp,
            "ROL" => Self::Rol, "ROR" => Self::Ror, "RTI" => Self::Rti,
            "RTS" => Self::Rts, "SBC" => Self::Sbc, "SEC" => Self::Sec,
            "SED" => Self::Sed, "SEI" => Self::Sei, "STA" => Self::Sta,
            "STX" => Self::Stx, "STY" => Self::Sty, "TAX" => Self::Tax,
            "TAY" => Self::Tay, "TSX" => Self::Tsx, "TXA" => Self::Txa,
            "TXS" => Self::Txs, "TYA" => Self::Tya,
            _ => return None,
        })
    }

    /// True for the eight conditional branch operations.
    #[must_use]
    pub const fn is_branch(self) -> bool {
        matches!(
            self,
            Self::Bcc
                | Self::Bcs
                | Self::Beq
                | Self::Bmi
                | Self::Bne
                | Self::Bpl
                | Self::Bvc
                | Self::Bvs
        )
    }

    /// True for shift/rotate operations, which default to accumulator mode
    /// when written without an operand.
    #[must_use]
    pub const fn is_shift(self) -> bool {
        matches!(self, Self::Asl | Self::Lsr | Self::Rol | Self::Ror)
    }
}

impl std::fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One instruction-table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode {
    /// Operation mnemonic.
    pub mnemonic: Mnemonic,
    /// Addressing mode; determines the operand byte count.
    pub mode: AddressingMode,
    /// Base cycle count.
    pub cycles: u8,
    /// Whether a page-crossing indexed read adds one cycle. Set on the
    /// read-style AbsoluteX/AbsoluteY/IndirectY variants only; stores and
    /// read-modify-writes always pay the maximum.
    pub page_penalty: bool,
}

impl Opcode {
    /// Total encoded size in bytes (opcode + operand).
    #[must_use]
    pub const fn size(&self) -> u8 {
        1 + self.mode.operand_bytes()
    }
}

const fn entry(mnemonic: Mnemonic, mode: AddressingMode, cycles: u8) -> Option<Opcode> {
    Some(Opcode {
        mnemonic,
        mode,
        cycles,
        page_penalty: false,
    })
}

/// Read-style indexed entry where a page cross costs one extra cycle.
const fn entry_px(mnemonic: Mnemonic, mode: AddressingMode, cycles: u8) -> Option<Opcode> {
    Some(Opcode {
        mnemonic,
        mode,
        cycles,
        page_penalty: true,
    })
}

#[rustfmt::skip]
const fn build_table() -> [Option<Opcode>; 256] {
    use AddressingMode::{
        Absolute, AbsoluteX, AbsoluteY, Accumulator, Immediate, Implicit, Indirect, IndirectX,
        IndirectY, Relative, ZeroPage, ZeroPageX, ZeroPageY,
    };
    use Mnemonic::{
        Adc, And, Asl, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Brk, Bvc, Bvs, Clc, Cld, Cli, Clv,
        Cmp, Cpx, Cpy, Dec, Dex, Dey, Eor, Inc, Inx, Iny, Jmp, Jsr, Lda, Ldx, Ldy, Lsr, Nop,
        Ora, Pha, Php, Pla, Plp, Rol, Ror, Rti, Rts, Sbc, Sec, Sed, Sei, Sta, Stx, Sty, Tax,
        Tay, Tsx, Txa, Txs, Tya,
    };

    let mut t: [Option<Opcode>; 256] = [None; 256];

    // Load / store
    t[0xA9] = entry(Lda, Immediate, 2);
    t[0xA5] = entry(Lda, ZeroPage, 3);
    t[0xB5] = entry(Lda, ZeroPageX, 4);
    t[0xAD] = entry(Lda, Absolute, 4);
    t[0xBD] = entry_px(Lda, AbsoluteX, 4);
    t[0xB9] = entry_px(Lda, AbsoluteY, 4);
    t[0xA1] = entry(Lda, IndirectX, 6);
    t[0xB1] = entry_px(Lda, IndirectY, 5);

    t[0xA2] = entry(Ldx, Immediate, 2);
    t[0xA6] = entry(Ldx, ZeroPage, 3);
    t[0xB6] = entry(Ldx, ZeroPageY, 4);
    t[0xAE] = entry(Ldx, Absolute, 4);
    t[0xBE] = entry_px(Ldx, AbsoluteY, 4);

    t[0xA0] = entry(Ldy, Immediate, 2);
    t[0xA4] = entry(Ldy, ZeroPage, 3);
    t[0xB4] = entry(Ldy, ZeroPageX, 4);
    t[0xAC] = entry(Ldy, Absolute, 4);
    t[0xBC] = entry_px(Ldy, AbsoluteX, 4);

    t[0x85] = entry(Sta, ZeroPage, 3);
    t[0x95] = entry(Sta, ZeroPageX, 4);
    t[0x8D] = entry(Sta, Absolute, 4);
    t[0x9D] = entry(Sta, AbsoluteX, 5);
    t[0x99] = entry(Sta, AbsoluteY, 5);
    t[0x81] = entry(Sta, IndirectX, 6);
    t[0x91] = entry(Sta, IndirectY, 6);

    t[0x86] = entry(Stx, ZeroPage, 3);
    t[0x96] = entry(Stx, ZeroPageY, 4);
    t[0x8E] = entry(Stx, Absolute, 4);

    t[0x84] = entry(Sty, ZeroPage, 3);
    t[0x94] = entry(Sty, ZeroPageX, 4);
    t[0x8C] = entry(Sty, Absolute, 4);

    // Register transfers
    t[0xAA] = entry(Tax, Implicit, 2);
    t[0xA8] = entry(Tay, Implicit, 2);
    t[0x8A] = entry(Txa, Implicit, 2);
    t[0x98] = entry(Tya, Implicit, 2);
    t[0xBA] = entry(Tsx, Implicit, 2);
    t[0x9A] = entry(Txs, Implicit, 2);

    // Stack
    t[0x48] = entry(Pha, Implicit, 3);
    t[0x08] = entry(Php, Implicit, 3);
    t[0x68] = entry(Pla, Implicit, 4);
    t[0x28] = entry(Plp, Implicit, 4);

    // Logical
    t[0x29] = entry(And, Immediate, 2);
    t[0x25] = entry(And, ZeroPage, 3);
    t[0x35] = entry(And, ZeroPageX, 4);
    t[0x2D] = entry(And, Absolute, 4);
    t[0x3D] = entry_px(And, AbsoluteX, 4);
    t[0x39] = entry_px(And, AbsoluteY, 4);
    t[0x21] = entry(And, IndirectX, 6);
    t[0x31] = entry_px(And, IndirectY, 5);

    t[0x49] = entry(Eor, Immediate, 2);
    t[0x45] = entry(Eor, ZeroPage, 3);
    t[0x55] = entry(Eor, ZeroPageX, 4);
    t[0x4D] = entry(Eor, Absolute, 4);
    t[0x5D] = entry_px(Eor, AbsoluteX, 4);
    t[0x59] = entry_px(Eor, AbsoluteY, 4);
    t[0x41] = entry(Eor, IndirectX, 6);
    t[0x51] = entry_px(Eor, IndirectY, 5);

    t[0x09] = entry(Ora, Immediate, 2);
    t[0x05] = entry(Ora, ZeroPage, 3);
    t[0x15] = entry(Ora, ZeroPageX, 4);
    t[0x0D] = entry(Ora, Absolute, 4);
    t[0x1D] = entry_px(Ora, AbsoluteX, 4);
    t[0x19] = entry_px(Ora, AbsoluteY, 4);
    t[0x01] = entry(Ora, IndirectX, 6);
    t[0x11] = entry_px(Ora, IndirectY, 5);

    t[0x24] = entry(Bit, ZeroPage, 3);
    t[0x2C] = entry(Bit, Absolute, 4);

    // Arithmetic
    t[0x69] = entry(Adc, Immediate, 2);
    t[0x65] = entry(Adc, ZeroPage, 3);
    t[0x75] = entry(Adc, ZeroPageX, 4);
    t[0x6D] = entry(Adc, Absolute, 4);
    t[0x7D] = entry_px(Adc, AbsoluteX, 4);
    t[0x79] = entry_px(Adc, AbsoluteY, 4);
    t[0x61] = entry(Adc, IndirectX, 6);
    t[0x71] = entry_px(Adc, IndirectY, 5);

    t[0xE9] = entry(Sbc, Immediate, 2);
    t[0xE5] = entry(Sbc, ZeroPage, 3);
    t[0xF5] = entry(Sbc, ZeroPageX, 4);
    t[0xED] = entry(Sbc, Absolute, 4);
    t[0xFD] = entry_px(Sbc, AbsoluteX, 4);
    t[0xF9] = entry_px(Sbc, AbsoluteY, 4);
    t[0xE1] = entry(Sbc, IndirectX, 6);
    t[0xF1] = entry_px(Sbc, IndirectY, 5);

    // Compare
    t[0xC9] = entry(Cmp, Immediate, 2);
    t[0xC5] = entry(Cmp, ZeroPage, 3);
    t[0xD5] = entry(Cmp, ZeroPageX, 4);
    t[0xCD] = entry(Cmp, Absolute, 4);
    t[0xDD] = entry_px(Cmp, AbsoluteX, 4);
    t[0xD9] = entry_px(Cmp, AbsoluteY, 4);
    t[0xC1] = entry(Cmp, IndirectX, 6);
    t[0xD1] = entry_px(Cmp, IndirectY, 5);

    t[0xE0] = entry(Cpx, Immediate, 2);
    t[0xE4] = entry(Cpx, ZeroPage, 3);
    t[0xEC] = entry(Cpx, Absolute, 4);

    t[0xC0] = entry(Cpy, Immediate, 2);
    t[0xC4] = entry(Cpy, ZeroPage, 3);
    t[0xCC] = entry(Cpy, Absolute, 4);

    // Increments / decrements
    t[0xE6] = entry(Inc, ZeroPage, 5);
    t[0xF6] = entry(Inc, ZeroPageX, 6);
    t[0xEE] = entry(Inc, Absolute, 6);
    t[0xFE] = entry(Inc, AbsoluteX, 7);

    t[0xC6] = entry(Dec, ZeroPage, 5);
    t[0xD6] = entry(Dec, ZeroPageX, 6);
    t[0xCE] = entry(Dec, Absolute, 6);
    t[0xDE] = entry(Dec, AbsoluteX, 7);

    t[0xE8] = entry(Inx, Implicit, 2);
    t[0xC8] = entry(Iny, Implicit, 2);
    t[0xCA] = entry(Dex, Implicit, 2);
    t[0x88] = entry(Dey, Implicit, 2);

    // Shifts and rotates
    t[0x0A] = entry(Asl, Accumulator, 2);
    t[0x06] = entry(Asl, ZeroPage, 5);
    t[0x16] = entry(Asl, ZeroPageX, 6);
    t[0x0E] = entry(Asl, Absolute, 6);
    t[0x1E] = entry(Asl, AbsoluteX, 7);

    t[0x4A] = entry(Lsr, Accumulator, 2);
    t[0x46] = entry(Lsr, ZeroPage, 5);
    t[0x56] = entry(Lsr, ZeroPageX, 6);
    t[0x4E] = entry(Lsr, Absolute, 6);
    t[0x5E] = entry(Lsr, AbsoluteX, 7);

    t[0x2A] = entry(Rol, Accumulator, 2);
    t[0x26] = entry(Rol, ZeroPage, 5);
    t[0x36] = entry(Rol, ZeroPageX, 6);
    t[0x2E] = entry(Rol, Absolute, 6);
    t[0x3E] = entry(Rol, AbsoluteX, 7);

    t[0x6A] = entry(Ror, Accumulator, 2);
    t[0x66] = entry(Ror, ZeroPage, 5);
    t[0x76] = entry(Ror, ZeroPageX, 6);
    t[0x6E] = entry(Ror, Absolute, 6);
    t[0x7E] = entry(Ror, AbsoluteX, 7);

    // Jumps and calls
    t[0x4C] = entry(Jmp, Absolute, 3);
    t[0x6C] = entry(Jmp, Indirect, 5);
    t[0x20] = entry(Jsr, Absolute, 6);
    t[0x60] = entry(Rts, Implicit, 6);

    // Branches: base 2 cycles, +1 taken, +2 taken across a page
    t[0x10] = entry(Bpl, Relative, 2);
    t[0x30] = entry(Bmi, Relative, 2);
    t[0x50] = entry(Bvc, Relative, 2);
    t[0x70] = entry(Bvs, Relative, 2);
    t[0x90] = entry(Bcc, Relative, 2);
    t[0xB0] = entry(Bcs, Relative, 2);
    t[0xD0] = entry(Bne, Relative, 2);
    t[0xF0] = entry(Beq, Relative, 2);

    // Flag changes
    t[0x18] = entry(Clc, Implicit, 2);
    t[0xD8] = entry(Cld, Implicit, 2);
    t[0x58] = entry(Cli, Implicit, 2);
    t[0xB8] = entry(Clv, Implicit, 2);
    t[0x38] = entry(Sec, Implicit, 2);
    t[0xF8] = entry(Sed, Implicit, 2);
    t[0x78] = entry(Sei, Implicit, 2);

    // System
    t[0x00] = entry(Brk, Implicit, 7);
    t[0xEA] = entry(Nop, Implicit, 2);
    t[0x40] = entry(Rti, Implicit, 6);

    t
}

/// The instruction table, indexed by opcode byte.
pub static OPCODES: [Option<Opcode>; 256] = build_table();

/// Look up the descriptor for an opcode byte.
#[must_use]
pub fn decode(opcode: u8) -> Option<&'static Opcode> {
    OPCODES[opcode as usize].as_ref()
}

/// Find the opcode byte for a mnemonic/mode pair, if that encoding exists.
#[must_use]
pub fn encode(mnemonic: Mnemonic, mode: AddressingMode) -> Option<u8> {
    OPCODES.iter().enumerate().find_map(|(byte, slot)| match slot {
        Some(op) if op.mnemonic == mnemonic && op.mode == mode => Some(byte as u8),
        _ => None,
    })
}

/// Whether the mnemonic supports the given addressing mode.
#[must_use]
pub fn supports(mnemonic: Mnemonic, mode: AddressingMode) -> bool {
    encode(mnemonic, mode).is_some()
}
