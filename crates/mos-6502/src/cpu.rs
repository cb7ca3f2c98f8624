//! 6502 CPU execution engine.
//!
//! Instruction-stepped: `step()` runs one complete instruction against the
//! bus and returns how many cycles it consumed. Cycle counts come from the
//! opcode table plus the page-cross and branch adjustments, so a host can
//! advance its peripherals by the returned amount after every instruction.
//!
//! Interrupts are delivered strictly between instructions: a pending NMI or
//! an asserted IRQ line (with I clear) is serviced at the start of `step()`
//! instead of an instruction fetch.

use emu_core::Bus;
use thiserror::Error;

use crate::flags::{C, D, I, V, Z};
use crate::opcodes::{self, AddressingMode, Mnemonic, Opcode};
use crate::{Registers, IRQ_VECTOR, NMI_VECTOR, RESET_VECTOR};

/// Decode failure: the fetched byte has no entry in the instruction table.
///
/// The CPU state is unchanged except for the PC increment that consumed the
/// opcode byte; callers should treat the machine as halted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid opcode ${opcode:02X} at ${pc:04X}")]
pub struct CpuError {
    /// The unmapped opcode byte.
    pub opcode: u8,
    /// Address the byte was fetched from.
    pub pc: u16,
}

/// The MOS 6502 CPU.
#[derive(Debug)]
pub struct Mos6502 {
    /// CPU registers.
    pub regs: Registers,

    /// NMI edge detector: latched until serviced.
    nmi_pending: bool,

    /// IRQ line level, as aggregated by the host.
    irq_line: bool,

    /// Total cycles executed, for hosts that track wall-clock pacing.
    total_cycles: u64,
}

impl Default for Mos6502 {
    fn default() -> Self {
        Self::new()
    }
}

impl Mos6502 {
    /// Create a CPU in reset-register state. PC is not loaded until
    /// [`Mos6502::reset`] runs against a bus carrying the vectors.
    #[must_use]
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            nmi_pending: false,
            irq_line: false,
            total_cycles: 0,
        }
    }

    /// Reset: SP=$FF, I set, PC loaded from the reset vector.
    pub fn reset<B1: Bus>(&mut self, bus: &mut B1) {
        self.regs = Registers::new();
        self.regs.pc = self.read_word(bus, RESET_VECTOR);
        self.nmi_pending = false;
    }

    /// Latch an NMI edge. Serviced before the next instruction.
    pub fn nmi(&mut self) {
        self.nmi_pending = true;
    }

    /// Drive the (level-sensitive) IRQ line.
    pub fn set_irq_line(&mut self, level: bool) {
        self.irq_line = level;
    }

    /// Total cycles executed since construction.
    #[must_use]
    pub fn total_cycles(&self) -> u64 {
        self.total_cycles
    }

    /// Execute one instruction (or service one pending interrupt) and
    /// return the cycle count.
    ///
    /// # Errors
    ///
    /// [`CpuError`] if the fetched opcode has no table entry.
    pub fn step<B1: Bus>(&mut self, bus: &mut B1) -> Result<u8, CpuError> {
        if self.nmi_pending {
            self.nmi_pending = false;
            let cycles = self.service_interrupt(bus, NMI_VECTOR);
            self.total_cycles += u64::from(cycles);
            return Ok(cycles);
        }
        if self.irq_line && !self.regs.p.is_set(I) {
            let cycles = self.service_interrupt(bus, IRQ_VECTOR);
            self.total_cycles += u64::from(cycles);
            return Ok(cycles);
        }

        let pc = self.regs.pc;
        let opcode = bus.read(pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);

        let desc = opcodes::decode(opcode).ok_or(CpuError { opcode, pc })?;
        let cycles = self.execute(bus, desc);
        self.total_cycles += u64::from(cycles);
        Ok(cycles)
    }

    /// Interrupt entry: push PC, push P with B clear, set I, load vector.
    fn service_interrupt<B1: Bus>(&mut self, bus: &mut B1, vector: u16) -> u8 {
        self.push_word(bus, self.regs.pc);
        let status = self.regs.p.to_byte_irq();
        self.push(bus, status);
        self.regs.p.set(I);
        self.regs.pc = self.read_word(bus, vector);
        7
    }

    fn execute<B1: Bus>(&mut self, bus: &mut B1, desc: &Opcode) -> u8 {
        let mode = desc.mode;
        match desc.mnemonic {
            // Loads
            Mnemonic::Lda => {
                let (value, crossed) = self.read_operand(bus, mode);
                self.regs.a = value;
                self.regs.p.update_nz(value);
                self.cycles_with_penalty(desc, crossed)
            }
            Mnemonic::Ldx => {
                let (value, crossed) = self.read_operand(bus, mode);
                self.regs.x = value;
                self.regs.p.update_nz(value);
                self.cycles_with_penalty(desc, crossed)
            }
            Mnemonic::Ldy => {
                let (value, crossed) = self.read_operand(bus, mode);
                self.regs.y = value;
                self.regs.p.update_nz(value);
                self.cycles_with_penalty(desc, crossed)
            }

            // Stores (no page-cross penalty; the table carries the maximum)
            Mnemonic::Sta => {
                let (addr, _) = self.operand_address(bus, mode);
                bus.write(addr, self.regs.a);
                desc.cycles
            }
            Mnemonic::Stx => {
                let (addr, _) = self.operand_address(bus, mode);
                bus.write(addr, self.regs.x);
                desc.cycles
            }
            Mnemonic::Sty => {
                let (addr, _) = self.operand_address(bus, mode);
                bus.write(addr, self.regs.y);
                desc.cycles
            }

            // Transfers
            Mnemonic::Tax => {
                self.regs.x = self.regs.a;
                self.regs.p.update_nz(self.regs.x);
                desc.cycles
            }
            Mnemonic::Tay => {
                self.regs.y = self.regs.a;
                self.regs.p.update_nz(self.regs.y);
                desc.cycles
            }
            Mnemonic::Txa => {
                self.regs.a = self.regs.x;
                self.regs.p.update_nz(self.regs.a);
                desc.cycles
            }
            Mnemonic::Tya => {
                self.regs.a = self.regs.y;
                self.regs.p.update_nz(self.regs.a);
                desc.cycles
            }
            Mnemonic::Tsx => {
                self.regs.x = self.regs.sp;
                self.regs.p.update_nz(self.regs.x);
                desc.cycles
            }
            // TXS does not touch the flags.
            Mnemonic::Txs => {
                self.regs.sp = self.regs.x;
                desc.cycles
            }

            // Stack
            Mnemonic::Pha => {
                self.push(bus, self.regs.a);
                desc.cycles
            }
            Mnemonic::Php => {
                let status = self.regs.p.to_byte_brk();
                self.push(bus, status);
                desc.cycles
            }
            Mnemonic::Pla => {
                self.regs.a = self.pull(bus);
                self.regs.p.update_nz(self.regs.a);
                desc.cycles
            }
            Mnemonic::Plp => {
                let value = self.pull(bus);
                self.regs.p.set_from_pull(value);
                desc.cycles
            }

            // Logical
            Mnemonic::And => {
                let (value, crossed) = self.read_operand(bus, mode);
                self.regs.a &= value;
                self.regs.p.update_nz(self.regs.a);
                self.cycles_with_penalty(desc, crossed)
            }
            Mnemonic::Eor => {
                let (value, crossed) = self.read_operand(bus, mode);
                self.regs.a ^= value;
                self.regs.p.update_nz(self.regs.a);
                self.cycles_with_penalty(desc, crossed)
            }
            Mnemonic::Ora => {
                let (value, crossed) = self.read_operand(bus, mode);
                self.regs.a |= value;
                self.regs.p.update_nz(self.regs.a);
                self.cycles_with_penalty(desc, crossed)
            }
            Mnemonic::Bit => {
                let (value, _) = self.read_operand(bus, mode);
                self.regs.p.set_if(Z, self.regs.a & value == 0);
                self.regs.p.set_if(crate::flags::N, value & 0x80 != 0);
                self.regs.p.set_if(V, value & 0x40 != 0);
                desc.cycles
            }

            // Arithmetic
            Mnemonic::Adc => {
                let (value, crossed) = self.read_operand(bus, mode);
                self.do_adc(value);
                self.cycles_with_penalty(desc, crossed)
            }
            Mnemonic::Sbc => {
                let (value, crossed) = self.read_operand(bus, mode);
                self.do_sbc(value);
                self.cycles_with_penalty(desc, crossed)
            }

            // Compares
            Mnemonic::Cmp => {
                let (value, crossed) = self.read_operand(bus, mode);
                self.compare(self.regs.a, value);
                self.cycles_with_penalty(desc, crossed)
            }
            Mnemonic::Cpx => {
                let (value, _) = self.read_operand(bus, mode);
                self.compare(self.regs.x, value);
                desc.cycles
            }
            Mnemonic::Cpy => {
                let (value, _) = self.read_operand(bus, mode);
                self.compare(self.regs.y, value);
                desc.cycles
            }

            // Memory increments / decrements
            Mnemonic::Inc => self.modify_memory(bus, desc, |_, v| v.wrapping_add(1)),
            Mnemonic::Dec => self.modify_memory(bus, desc, |_, v| v.wrapping_sub(1)),
            Mnemonic::Inx => {
                self.regs.x = self.regs.x.wrapping_add(1);
                self.regs.p.update_nz(self.regs.x);
                desc.cycles
            }
            Mnemonic::Iny => {
                self.regs.y = self.regs.y.wrapping_add(1);
                self.regs.p.update_nz(self.regs.y);
                desc.cycles
            }
            Mnemonic::Dex => {
                self.regs.x = self.regs.x.wrapping_sub(1);
                self.regs.p.update_nz(self.regs.x);
                desc.cycles
            }
            Mnemonic::Dey => {
                self.regs.y = self.regs.y.wrapping_sub(1);
                self.regs.p.update_nz(self.regs.y);
                desc.cycles
            }

            // Shifts and rotates
            Mnemonic::Asl => self.shift(bus, desc, Self::do_asl),
            Mnemonic::Lsr => self.shift(bus, desc, Self::do_lsr),
            Mnemonic::Rol => self.shift(bus, desc, Self::do_rol),
            Mnemonic::Ror => self.shift(bus, desc, Self::do_ror),

            // Jumps and calls
            Mnemonic::Jmp => {
                let target = self.fetch_word(bus);
                self.regs.pc = if mode == AddressingMode::Indirect {
                    self.read_word_page_wrapped(bus, target)
                } else {
                    target
                };
                desc.cycles
            }
            Mnemonic::Jsr => {
                let target = self.fetch_word(bus);
                let return_addr = self.regs.pc.wrapping_sub(1);
                self.push_word(bus, return_addr);
                self.regs.pc = target;
                desc.cycles
            }
            Mnemonic::Rts => {
                self.regs.pc = self.pull_word(bus).wrapping_add(1);
                desc.cycles
            }

            // Branches
            Mnemonic::Bcc => self.branch(bus, !self.regs.p.is_set(C)),
            Mnemonic::Bcs => self.branch(bus, self.regs.p.is_set(C)),
            Mnemonic::Beq => self.branch(bus, self.regs.p.is_set(Z)),
            Mnemonic::Bne => self.branch(bus, !self.regs.p.is_set(Z)),
            Mnemonic::Bmi => self.branch(bus, self.regs.p.is_set(crate::flags::N)),
            Mnemonic::Bpl => self.branch(bus, !self.regs.p.is_set(crate::flags::N)),
            Mnemonic::Bvc => self.branch(bus, !self.regs.p.is_set(V)),
            Mnemonic::Bvs => self.branch(bus, self.regs.p.is_set(V)),

            // Flag changes
            Mnemonic::Clc => {
                self.regs.p.clear(C);
                desc.cycles
            }
            Mnemonic::Cld => {
                self.regs.p.clear(D);
                desc.cycles
            }
            Mnemonic::Cli => {
                self.regs.p.clear(I);
                desc.cycles
            }
            Mnemonic::Clv => {
                self.regs.p.clear(V);
                desc.cycles
            }
            Mnemonic::Sec => {
                self.regs.p.set(C);
                desc.cycles
            }
            Mnemonic::Sed => {
                self.regs.p.set(D);
                desc.cycles
            }
            Mnemonic::Sei => {
                self.regs.p.set(I);
                desc.cycles
            }

            // System
            Mnemonic::Brk => {
                // Return address skips the padding byte after BRK.
                let return_addr = self.regs.pc.wrapping_add(1);
                self.push_word(bus, return_addr);
                let status = self.regs.p.to_byte_brk();
                self.push(bus, status);
                self.regs.p.set(I);
                self.regs.pc = self.read_word(bus, IRQ_VECTOR);
                desc.cycles
            }
            Mnemonic::Rti => {
                let status = self.pull(bus);
                self.regs.p.set_from_pull(status);
                self.regs.pc = self.pull_word(bus);
                desc.cycles
            }
            Mnemonic::Nop => desc.cycles,
        }
    }

    // ------------------------------------------------------------------
    // Addressing modes
    // ------------------------------------------------------------------

    fn fetch_byte<B1: Bus>(&mut self, bus: &mut B1) -> u8 {
        let value = bus.read(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        value
    }

    fn fetch_word<B1: Bus>(&mut self, bus: &mut B1) -> u16 {
        let lo = u16::from(self.fetch_byte(bus));
        let hi = u16::from(self.fetch_byte(bus));
        (hi << 8) | lo
    }

    fn read_word<B1: Bus>(&mut self, bus: &mut B1, addr: u16) -> u16 {
        let lo = u16::from(bus.read(addr));
        let hi = u16::from(bus.read(addr.wrapping_add(1)));
        (hi << 8) | lo
    }

    /// 16-bit read where the high byte wraps within the pointer's page.
    /// This is the historical `JMP ($xxFF)` behavior.
    fn read_word_page_wrapped<B1: Bus>(&mut self, bus: &mut B1, addr: u16) -> u16 {
        let lo = u16::from(bus.read(addr));
        let hi_addr = (addr & 0xFF00) | (addr.wrapping_add(1) & 0x00FF);
        let hi = u16::from(bus.read(hi_addr));
        (hi << 8) | lo
    }

    /// Effective address for a memory-operand mode, plus the page-cross
    /// flag for the indexed modes.
    fn operand_address<B1: Bus>(&mut self, bus: &mut B1, mode: AddressingMode) -> (u16, bool) {
        match mode {
            AddressingMode::ZeroPage => (u16::from(self.fetch_byte(bus)), false),
            AddressingMode::ZeroPageX => {
                let base = self.fetch_byte(bus);
                (u16::from(base.wrapping_add(self.regs.x)), false)
            }
            AddressingMode::ZeroPageY => {
                let base = self.fetch_byte(bus);
                (u16::from(base.wrapping_add(self.regs.y)), false)
            }
            AddressingMode::Absolute => (self.fetch_word(bus), false),
            AddressingMode::AbsoluteX => {
                let base = self.fetch_word(bus);
                let addr = base.wrapping_add(u16::from(self.regs.x));
                (addr, (base & 0xFF00) != (addr & 0xFF00))
            }
            AddressingMode::AbsoluteY => {
                let base = self.fetch_word(bus);
                let addr = base.wrapping_add(u16::from(self.regs.y));
                (addr, (base & 0xFF00) != (addr & 0xFF00))
            }
            AddressingMode::IndirectX => {
                let pointer = self.fetch_byte(bus).wrapping_add(self.regs.x);
                let lo = u16::from(bus.read(u16::from(pointer)));
                let hi = u16::from(bus.read(u16::from(pointer.wrapping_add(1))));
                ((hi << 8) | lo, false)
            }
            AddressingMode::IndirectY => {
                let pointer = self.fetch_byte(bus);
                let lo = u16::from(bus.read(u16::from(pointer)));
                let hi = u16::from(bus.read(u16::from(pointer.wrapping_add(1))));
                let base = (hi << 8) | lo;
                let addr = base.wrapping_add(u16::from(self.regs.y));
                (addr, (base & 0xFF00) != (addr & 0xFF00))
            }
            AddressingMode::Implicit
            | AddressingMode::Accumulator
            | AddressingMode::Immediate
            | AddressingMode::Indirect
            | AddressingMode::Relative => unreachable!("mode has no memory operand address"),
        }
    }

    /// Operand value for a read-style instruction.
    fn read_operand<B1: Bus>(&mut self, bus: &mut B1, mode: AddressingMode) -> (u8, bool) {
        if mode == AddressingMode::Immediate {
            return (self.fetch_byte(bus), false);
        }
        let (addr, crossed) = self.operand_address(bus, mode);
        (bus.read(addr), crossed)
    }

    fn cycles_with_penalty(&self, desc: &Opcode, crossed: bool) -> u8 {
        if desc.page_penalty && crossed {
            desc.cycles + 1
        } else {
            desc.cycles
        }
    }

    // ------------------------------------------------------------------
    // Operation helpers
    // ------------------------------------------------------------------

    fn do_adc(&mut self, value: u8) {
        let a = self.regs.a;
        let carry_in = u16::from(self.regs.p.is_set(C));
        let mut sum = u16::from(a) + u16::from(value) + carry_in;

        if self.regs.p.is_set(D) {
            // BCD correction: fix the low nibble past 9, then the byte
            // past $99.
            if (a & 0x0F) + (value & 0x0F) + carry_in as u8 > 9 {
                sum += 0x06;
            }
            if sum > 0x99 {
                sum += 0x60;
            }
        }

        let result = sum as u8;
        self.regs.p.set_if(C, sum > 0xFF);
        self.regs
            .p
            .set_if(V, (a ^ value) & 0x80 == 0 && (a ^ result) & 0x80 != 0);
        self.regs.a = result;
        self.regs.p.update_nz(result);
    }

    fn do_sbc(&mut self, value: u8) {
        if self.regs.p.is_set(D) {
            self.do_sbc_decimal(value);
        } else {
            // Binary SBC is ADC of the inverted operand.
            self.do_adc(!value);
        }
    }

    fn do_sbc_decimal(&mut self, value: u8) {
        let a = self.regs.a;
        let borrow = i16::from(!self.regs.p.is_set(C));

        // Flags come from the binary result.
        let bin = i16::from(a) - i16::from(value) - borrow;
        self.regs.p.set_if(C, bin >= 0);
        self.regs.p.set_if(Z, bin as u8 == 0);
        self.regs.p.set_if(crate::flags::N, bin & 0x80 != 0);
        self.regs.p.set_if(
            V,
            (i16::from(a) ^ bin) & (i16::from(a) ^ i16::from(value)) & 0x80 != 0,
        );

        let mut lo = i16::from(a & 0x0F) - i16::from(value & 0x0F) - borrow;
        let mut hi = i16::from(a >> 4) - i16::from(value >> 4);
        if lo < 0 {
            lo -= 6;
            hi -= 1;
        }
        if hi < 0 {
            hi -= 6;
        }
        self.regs.a = ((hi as u8) << 4) | (lo as u8 & 0x0F);
    }

    fn compare(&mut self, register: u8, value: u8) {
        let result = register.wrapping_sub(value);
        self.regs.p.set_if(C, register >= value);
        self.regs.p.update_nz(result);
    }

    fn do_asl(&mut self, value: u8) -> u8 {
        self.regs.p.set_if(C, value & 0x80 != 0);
        let result = value << 1;
        self.regs.p.update_nz(result);
        result
    }

    fn do_lsr(&mut self, value: u8) -> u8 {
        self.regs.p.set_if(C, value & 0x01 != 0);
        let result = value >> 1;
        self.regs.p.update_nz(result);
        result
    }

    fn do_rol(&mut self, value: u8) -> u8 {
        let carry_in = u8::from(self.regs.p.is_set(C));
        self.regs.p.set_if(C, value & 0x80 != 0);
        let result = (value << 1) | carry_in;
        self.regs.p.update_nz(result);
        result
    }

    fn do_ror(&mut self, value: u8) -> u8 {
        let carry_in = if self.regs.p.is_set(C) { 0x80 } else { 0 };
        self.regs.p.set_if(C, value & 0x01 != 0);
        let result = (value >> 1) | carry_in;
        self.regs.p.update_nz(result);
        result
    }

    /// Shift/rotate dispatch: accumulator mode or memory read-modify-write.
    fn shift<B1: Bus>(
        &mut self,
        bus: &mut B1,
        desc: &Opcode,
        op: fn(&mut Self, u8) -> u8,
    ) -> u8 {
        if desc.mode == AddressingMode::Accumulator {
            let value = self.regs.a;
            self.regs.a = op(self, value);
            desc.cycles
        } else {
            self.modify_memory(bus, desc, op)
        }
    }

    /// Memory read-modify-write. Indexed variants always pay the table
    /// cycle count regardless of page crossing.
    fn modify_memory<B1: Bus>(
        &mut self,
        bus: &mut B1,
        desc: &Opcode,
        op: fn(&mut Self, u8) -> u8,
    ) -> u8 {
        let (addr, _) = self.operand_address(bus, desc.mode);
        let value = bus.read(addr);
        let result = op(self, value);
        if desc.mnemonic == Mnemonic::Inc || desc.mnemonic == Mnemonic::Dec {
            self.regs.p.update_nz(result);
        }
        bus.write(addr, result);
        desc.cycles
    }

    /// Relative branch: 2 cycles not taken, 3 taken, 4 taken across a page.
    fn branch<B1: Bus>(&mut self, bus: &mut B1, taken: bool) -> u8 {
        let offset = self.fetch_byte(bus) as i8;
        if !taken {
            return 2;
        }
        let old_pc = self.regs.pc;
        self.regs.pc = old_pc.wrapping_add(offset as i16 as u16);
        if (old_pc ^ self.regs.pc) & 0xFF00 != 0 {
            4
        } else {
            3
        }
    }

    // ------------------------------------------------------------------
    // Stack
    // ------------------------------------------------------------------

    fn push<B1: Bus>(&mut self, bus: &mut B1, value: u8) {
        let addr = self.regs.push();
        bus.write(addr, value);
    }

    fn pull<B1: Bus>(&mut self, bus: &mut B1) -> u8 {
        let addr = self.regs.pull();
        bus.read(addr)
    }

    /// Push a 16-bit value, high byte first.
    fn push_word<B1: Bus>(&mut self, bus: &mut B1, value: u16) {
        self.push(bus, (value >> 8) as u8);
        self.push(bus, value as u8);
    }

    fn pull_word<B1: Bus>(&mut self, bus: &mut B1) -> u16 {
        let lo = u16::from(self.pull(bus));
        let hi = u16::from(self.pull(bus));
        (hi << 8) | lo
    }
}
