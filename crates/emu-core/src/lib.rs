//! Core bus traits shared by the CPU, the C64 machine and the toolchain.
//!
//! Components never hold references to each other; everything crosses a
//! narrow bus boundary addressed by 16-bit addresses.

mod bus;
mod source;

pub use bus::{Bus, SimpleBus};
pub use source::ByteSource;
