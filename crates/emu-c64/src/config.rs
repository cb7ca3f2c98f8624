//! C64 configuration: model timing and ROM images.

/// C64 model variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum C64Model {
    /// PAL C64 (6569 VIC-II, 985,248 Hz CPU).
    Pal,
    /// NTSC C64 (6567 VIC-II, 1,022,727 Hz CPU).
    Ntsc,
}

impl C64Model {
    /// Raster lines per frame.
    #[must_use]
    pub const fn lines_per_frame(self) -> u16 {
        match self {
            Self::Pal => 312,
            Self::Ntsc => 263,
        }
    }

    /// CPU cycles per raster line.
    #[must_use]
    pub const fn cycles_per_line(self) -> u8 {
        match self {
            Self::Pal => 63,
            Self::Ntsc => 65,
        }
    }

    /// CPU clock frequency in Hz.
    #[must_use]
    pub const fn cpu_frequency(self) -> u32 {
        match self {
            Self::Pal => 985_248,
            Self::Ntsc => 1_022_727,
        }
    }
}

/// Configuration for constructing a [`crate::C64`].
///
/// ROM images are optional at construction; slots left empty read as zeroed
/// ROM until loaded through `C64::load_rom`.
pub struct C64Config {
    /// Model variant.
    pub model: C64Model,
    /// BASIC ROM (8,192 bytes).
    pub basic_rom: Option<Vec<u8>>,
    /// Kernal ROM (8,192 bytes).
    pub kernal_rom: Option<Vec<u8>>,
    /// Character ROM (4,096 bytes).
    pub char_rom: Option<Vec<u8>>,
}

impl C64Config {
    /// A configuration with no ROM images.
    #[must_use]
    pub fn new(model: C64Model) -> Self {
        Self {
            model,
            basic_rom: None,
            kernal_rom: None,
            char_rom: None,
        }
    }
}
