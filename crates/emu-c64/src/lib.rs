//! Cycle-counted Commodore 64 core.
//!
//! The system executes one CPU instruction per `step()`, then advances the
//! VIC-II and both CIAs by the instruction's cycle count. One PAL frame is
//! 312 raster lines x 63 cycles = 19,656 CPU cycles; NTSC is 263 x 65.
//!
//! Peripheral interrupt levels are aggregated after every step: the VIC-II
//! and CIA1 drive the CPU's IRQ line, CIA2 drives NMI.

mod bus;
mod c64;
mod cia;
mod config;
mod memory;
pub mod prg;
mod sid;
mod vic;

pub use bus::C64Bus;
pub use c64::{C64, SystemEvent};
pub use cia::{Cia, CiaEvent, CiaRole};
pub use config::{C64Config, C64Model};
pub use memory::{C64Memory, LoadError, RomSlot};
pub use sid::Sid;
pub use vic::{Vic, VicEvent};
