//! Shared harness for the instruction tests.

#![allow(dead_code)]

use emu_core::SimpleBus;
use mos_6502::Mos6502;

/// Default program origin for instruction tests.
pub const ORG: u16 = 0x0200;

/// Load a program at [`ORG`] and point the CPU at it.
pub fn setup(program: &[u8]) -> (Mos6502, SimpleBus) {
    let mut bus = SimpleBus::new();
    bus.load(ORG, program);
    let mut cpu = Mos6502::new();
    cpu.regs.pc = ORG;
    (cpu, bus)
}

/// Execute one instruction, panicking on an invalid opcode.
pub fn step(cpu: &mut Mos6502, bus: &mut SimpleBus) -> u8 {
    cpu.step(bus).expect("program contains only valid opcodes")
}

/// Execute `count` instructions.
pub fn run(cpu: &mut Mos6502, bus: &mut SimpleBus, count: usize) {
    for _ in 0..count {
        step(cpu, bus);
    }
}
