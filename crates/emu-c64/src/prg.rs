//! PRG image loader.
//!
//! A PRG is the simplest C64 binary format: a 2-byte little-endian load
//! address followed by the payload, loaded straight into RAM.

use crate::memory::{C64Memory, LoadError};

/// Load a PRG image into RAM. Returns the load address.
///
/// # Errors
///
/// [`LoadError::PrgTooShort`] when the image has no payload after its
/// load-address header.
pub fn load_prg(memory: &mut C64Memory, data: &[u8]) -> Result<u16, LoadError> {
    let [lo, hi, payload @ ..] = data else {
        return Err(LoadError::PrgTooShort { len: data.len() });
    };
    if payload.is_empty() {
        return Err(LoadError::PrgTooShort { len: data.len() });
    }

    let base = u16::from_le_bytes([*lo, *hi]);
    let mut cursor = base;
    for &byte in payload {
        memory.ram_write(cursor, byte);
        cursor = cursor.wrapping_add(1);
    }
    log::debug!("loaded PRG: {} bytes at ${base:04X}", payload.len());
    Ok(base)
}
