//! C64 bus: memory and I/O routing.
//!
//! A borrowed view over the machine's components, constructed for the
//! duration of one CPU access sequence. The system owns memory and every
//! peripheral; the bus holds `&mut` references only, so there is no shared
//! or cyclic ownership.
//!
//! Address decoding for the I/O window (when CHAREN is set):
//!
//! | Range        | Device     | Register index |
//! |--------------|------------|----------------|
//! | $D000-$D3FF  | VIC-II     | `addr & $7F`   |
//! | $D400-$D7FF  | SID        | `addr & $1F`   |
//! | $D800-$DBFF  | Colour RAM | `addr - $D800` |
//! | $DC00-$DCFF  | CIA1       | `addr & $0F`   |
//! | $DD00-$DDFF  | CIA2       | `addr & $0F`   |
//! | $DE00-$DFFF  | unmapped   | reads $FF      |

use emu_core::Bus;

use crate::cia::Cia;
use crate::memory::C64Memory;
use crate::sid::Sid;
use crate::vic::Vic;

/// Borrowed bus view over the C64's components.
pub struct C64Bus<'a> {
    pub memory: &'a mut C64Memory,
    pub vic: &'a mut Vic,
    pub sid: &'a mut Sid,
    pub cia1: &'a mut Cia,
    pub cia2: &'a mut Cia,
}

impl Bus for C64Bus<'_> {
    fn read(&mut self, address: u16) -> u8 {
        if (0xD000..=0xDFFF).contains(&address) && self.memory.io_visible() {
            return match address {
                0xD000..=0xD3FF => self.vic.read((address & 0x7F) as u8),
                0xD400..=0xD7FF => self.sid.read((address & 0x1F) as u8),
                0xD800..=0xDBFF => self.memory.colour_ram_read(address - 0xD800),
                0xDC00..=0xDCFF => self.cia1.read((address & 0x0F) as u8),
                0xDD00..=0xDDFF => self.cia2.read((address & 0x0F) as u8),
                _ => 0xFF,
            };
        }
        self.memory.read(address)
    }

    fn write(&mut self, address: u16, value: u8) {
        if (0xD000..=0xDFFF).contains(&address) && self.memory.io_visible() {
            match address {
                0xD000..=0xD3FF => self.vic.write((address & 0x7F) as u8, value),
                0xD400..=0xD7FF => self.sid.write((address & 0x1F) as u8, value),
                0xD800..=0xDBFF => self.memory.colour_ram_write(address - 0xD800, value),
                0xDC00..=0xDCFF => self.cia1.write((address & 0x0F) as u8, value),
                0xDD00..=0xDDFF => self.cia2.write((address & 0x0F) as u8, value),
                // Expansion I/O: writes vanish, as on an unexpanded machine.
                _ => {}
            }
            return;
        }
        self.memory.write(address, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cia::CiaRole;
    use crate::config::C64Model;

    struct Machine {
        memory: C64Memory,
        vic: Vic,
        sid: Sid,
        cia1: Cia,
        cia2: Cia,
    }

    impl Machine {
        fn new() -> Self {
            Self {
                memory: C64Memory::new(),
                vic: Vic::new(C64Model::Pal),
                sid: Sid::new(),
                cia1: Cia::new(CiaRole::Irq),
                cia2: Cia::new(CiaRole::Nmi),
            }
        }

        fn bus(&mut self) -> C64Bus<'_> {
            C64Bus {
                memory: &mut self.memory,
                vic: &mut self.vic,
                sid: &mut self.sid,
                cia1: &mut self.cia1,
                cia2: &mut self.cia2,
            }
        }
    }

    #[test]
    fn ram_round_trip() {
        let mut machine = Machine::new();
        let mut bus = machine.bus();
        bus.write(0x8000, 0xAB);
        assert_eq!(bus.read(0x8000), 0xAB);
    }

    #[test]
    fn vic_colour_register_access() {
        let mut machine = Machine::new();
        let mut bus = machine.bus();
        bus.write(0xD020, 0x06);
        assert_eq!(bus.read(0xD020), 0x06);
    }

    #[test]
    fn sid_register_access() {
        let mut machine = Machine::new();
        let mut bus = machine.bus();
        bus.write(0xD400, 0x42);
        assert_eq!(bus.read(0xD400), 0x42);
    }

    #[test]
    fn colour_ram_access() {
        let mut machine = Machine::new();
        let mut bus = machine.bus();
        bus.write(0xD800, 0x05);
        assert_eq!(bus.read(0xD800), 0x05);
    }

    #[test]
    fn cia_register_access() {
        let mut machine = Machine::new();
        let mut bus = machine.bus();
        bus.write(0xDC02, 0xFF);
        assert_eq!(bus.read(0xDC02), 0xFF);
        bus.write(0xDD04, 0x34);
        bus.write(0xDD05, 0x12);
        assert_eq!(bus.read(0xDD04), 0x34);
        assert_eq!(bus.read(0xDD05), 0x12);
    }

    #[test]
    fn cia_pages_mirror_registers() {
        let mut machine = Machine::new();
        let mut bus = machine.bus();
        bus.write(0xDC12, 0xFF); // mirrors DDRA at $DC02
        assert_eq!(bus.read(0xDC02), 0xFF);
    }

    #[test]
    fn expansion_io_reads_ff() {
        let mut machine = Machine::new();
        let mut bus = machine.bus();
        assert_eq!(bus.read(0xDE00), 0xFF);
        assert_eq!(bus.read(0xDF80), 0xFF);
    }

    #[test]
    fn io_window_follows_charen() {
        let mut machine = Machine::new();
        machine
            .memory
            .load_rom(crate::RomSlot::Char, &vec![0xCC; 4096])
            .unwrap();
        let mut bus = machine.bus();

        bus.write(0xD020, 0x06);
        // CHAREN off: the same range reads char ROM, writes fall to RAM.
        bus.write(0x0001, 0x03);
        assert_eq!(bus.read(0xD020), 0xCC);
        bus.write(0xD020, 0x0F);
        assert_eq!(machine.memory.ram_read(0xD020), 0x0F);
        assert_eq!(machine.vic.peek(0x20), 0x06, "VIC register untouched");
    }
}
