//! Top-level C64 system and its step loop.
//!
//! `step()` executes one CPU instruction, then advances the VIC-II and both
//! CIAs by the instruction's cycle count. CPU memory effects land before
//! the peripheral cycles of the same step. Each peripheral cycle reports
//! its interrupt events: a CIA2 event latches an NMI edge into the CPU on
//! the cycle it occurs, and the level-sensitive IRQ line is re-aggregated
//! once the cycles finish — so interrupts reach the CPU before the *next*
//! instruction, never mid-instruction.

use mos_6502::{CpuError, Mos6502};

use crate::bus::C64Bus;
use crate::cia::{Cia, CiaRole};
use crate::config::{C64Config, C64Model};
use crate::memory::{C64Memory, LoadError, RomSlot};
use crate::prg;
use crate::sid::Sid;
use crate::vic::{Vic, VicEvent};

/// Event emitted by one `step()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemEvent {
    /// The VIC-II finished a frame; the framebuffer holds a full picture.
    FrameComplete,
    /// The VIC-II raster interrupt fired.
    RasterIrq,
}

/// The C64 system: CPU, memory, VIC-II, SID and two CIAs under one clock.
pub struct C64 {
    cpu: Mos6502,
    memory: C64Memory,
    vic: Vic,
    sid: Sid,
    cia1: Cia,
    cia2: Cia,
    model: C64Model,
    /// Master clock in CPU cycles.
    master_clock: u64,
}

impl C64 {
    /// Build a system from the configuration and run a reset.
    ///
    /// # Errors
    ///
    /// [`LoadError::RomSizeMismatch`] for a wrongly sized ROM image.
    pub fn new(config: &C64Config) -> Result<Self, LoadError> {
        let mut memory = C64Memory::new();
        if let Some(rom) = &config.basic_rom {
            memory.load_rom(RomSlot::Basic, rom)?;
        }
        if let Some(rom) = &config.kernal_rom {
            memory.load_rom(RomSlot::Kernal, rom)?;
        }
        if let Some(rom) = &config.char_rom {
            memory.load_rom(RomSlot::Char, rom)?;
        }

        let mut system = Self {
            cpu: Mos6502::new(),
            memory,
            vic: Vic::new(config.model),
            sid: Sid::new(),
            cia1: Cia::new(CiaRole::Irq),
            cia2: Cia::new(CiaRole::Nmi),
            model: config.model,
            master_clock: 0,
        };
        system.reset();
        Ok(system)
    }

    /// Reset the CPU: SP=$FF, I set, PC from the vector at $FFFC.
    pub fn reset(&mut self) {
        let mut bus = C64Bus {
            memory: &mut self.memory,
            vic: &mut self.vic,
            sid: &mut self.sid,
            cia1: &mut self.cia1,
            cia2: &mut self.cia2,
        };
        self.cpu.reset(&mut bus);
    }

    /// Execute one instruction and advance the peripherals.
    ///
    /// # Errors
    ///
    /// [`CpuError`] when the CPU fetches an unmapped opcode; the machine
    /// should be treated as halted.
    pub fn step(&mut self) -> Result<Vec<SystemEvent>, CpuError> {
        let mut bus = C64Bus {
            memory: &mut self.memory,
            vic: &mut self.vic,
            sid: &mut self.sid,
            cia1: &mut self.cia1,
            cia2: &mut self.cia2,
        };
        let cycles = self.cpu.step(&mut bus)?;

        let mut events = Vec::new();
        let mut cia1_rose = false;
        for _ in 0..cycles {
            self.master_clock += 1;

            match self.vic.tick(&self.memory) {
                Some(VicEvent::FrameComplete) => events.push(SystemEvent::FrameComplete),
                Some(VicEvent::RasterIrq) => events.push(SystemEvent::RasterIrq),
                None => {}
            }
            cia1_rose |= self.cia1.tick().irq;
            if self.cia2.tick().nmi {
                // Edge-triggered: latch the rise on the cycle it happens.
                // The line can fall and rise again within one instruction
                // (an ICR read followed by a fresh underflow), so the edge
                // must come from the cycle's event, not a level snapshot.
                self.cpu.nmi();
            }
        }

        // Aggregate the IRQ line for the next instruction: the VIC's and
        // CIA1's contributions, whether raised on a cycle above or still
        // pending from earlier.
        let irq = cia1_rose || self.cia1.irq_active() || self.vic.irq_active();
        self.cpu.set_irq_line(irq);

        Ok(events)
    }

    /// Load a ROM image into a slot.
    ///
    /// # Errors
    ///
    /// [`LoadError::RomSizeMismatch`] for a wrongly sized image.
    pub fn load_rom(&mut self, slot: RomSlot, data: &[u8]) -> Result<(), LoadError> {
        self.memory.load_rom(slot, data)
    }

    /// Load a raw binary at `base`, fix the reset vector to `base` and the
    /// IRQ vector to `irq_vector` (or `base`), and reset the CPU onto it.
    ///
    /// # Errors
    ///
    /// [`LoadError::BinaryTooLarge`] when the image runs past $FFFF.
    pub fn load_binary(
        &mut self,
        base: u16,
        data: &[u8],
        irq_vector: Option<u16>,
    ) -> Result<(), LoadError> {
        self.memory.load_binary(base, data, irq_vector)?;
        self.reset();
        // The RAM vector may be shadowed by a banked-in Kernal ROM, so
        // point the CPU at the binary directly.
        self.cpu.regs.pc = base;
        Ok(())
    }

    /// Load a PRG image (2-byte load-address header). Returns the load
    /// address; the CPU is not redirected.
    ///
    /// # Errors
    ///
    /// [`LoadError::PrgTooShort`] for a truncated image.
    pub fn load_prg(&mut self, data: &[u8]) -> Result<u16, LoadError> {
        prg::load_prg(&mut self.memory, data)
    }

    /// Reference to the CPU, for state inspection.
    #[must_use]
    pub fn cpu(&self) -> &Mos6502 {
        &self.cpu
    }

    /// Mutable reference to the CPU (debugger use: set PC, poke flags).
    pub fn cpu_mut(&mut self) -> &mut Mos6502 {
        &mut self.cpu
    }

    /// Reference to memory, for side-effect-free inspection.
    #[must_use]
    pub fn memory(&self) -> &C64Memory {
        &self.memory
    }

    /// Mutable reference to memory (loader/debugger use).
    pub fn memory_mut(&mut self) -> &mut C64Memory {
        &mut self.memory
    }

    /// Reference to the VIC-II.
    #[must_use]
    pub fn vic(&self) -> &Vic {
        &self.vic
    }

    /// References to the CIAs.
    #[must_use]
    pub fn cia1(&self) -> &Cia {
        &self.cia1
    }

    #[must_use]
    pub fn cia2(&self) -> &Cia {
        &self.cia2
    }

    /// The VIC-II's 320x200 colour-index framebuffer.
    #[must_use]
    pub fn framebuffer(&self) -> &[u8] {
        self.vic.framebuffer()
    }

    /// Master clock in CPU cycles since construction.
    #[must_use]
    pub fn master_clock(&self) -> u64 {
        self.master_clock
    }

    /// The configured model.
    #[must_use]
    pub fn model(&self) -> C64Model {
        self.model
    }
}
