//! VIC-II raster engine.
//!
//! Advances one cycle per CPU cycle: 63 cycles per line and 312 lines per
//! PAL frame (65 x 263 NTSC). Tracks the beam position, the bad-line
//! condition, the raster-compare interrupt and the frame counter, and
//! emits an 8-pixel column of standard text mode into a 320x200 indexed
//! framebuffer while the beam is inside the display window.
//!
//! Sprite registers are stored and read back; sprite rasterization and
//! collision detection are not modelled (the collision registers exist
//! and clear on read, but nothing sets them).

use crate::config::C64Model;
use crate::memory::C64Memory;

// Register indices within the $D000 window.
const REG_SPRITE_X_MSB: u8 = 0x10;
const REG_CONTROL_1: u8 = 0x11;
const REG_RASTER: u8 = 0x12;
const REG_PEN_X: u8 = 0x13;
const REG_PEN_Y: u8 = 0x14;
const REG_SPRITE_ENABLE: u8 = 0x15;
const REG_CONTROL_2: u8 = 0x16;
const REG_SPRITE_Y_EXPAND: u8 = 0x17;
const REG_MEM_POINTERS: u8 = 0x18;
const REG_INTERRUPT: u8 = 0x19;
const REG_INTERRUPT_ENABLE: u8 = 0x1A;
const REG_SPRITE_PRIORITY: u8 = 0x1B;
const REG_SPRITE_MULTICOLOR: u8 = 0x1C;
const REG_SPRITE_X_EXPAND: u8 = 0x1D;
const REG_SPRITE_COLLISION: u8 = 0x1E;
const REG_SPRITE_BG_COLLISION: u8 = 0x1F;
const REG_BORDER_COLOR: u8 = 0x20;
const REG_SPRITE7_COLOR: u8 = 0x2E;

// Control register 1 bits.
const CTRL1_RASTER8: u8 = 0x80;
const CTRL1_DEN: u8 = 0x10;
const CTRL1_YSCROLL: u8 = 0x07;

/// Bad-line window in raster lines.
const FIRST_BADLINE: u16 = 0x30;
const LAST_BADLINE: u16 = 0xF7;

/// Display window: text rows cover raster lines 56-255, columns cover
/// cycles 13-52.
const DISPLAY_FIRST_LINE: u16 = 56;
const DISPLAY_LAST_LINE: u16 = 255;
const DISPLAY_FIRST_CYCLE: u8 = 13;
const DISPLAY_CYCLES: u8 = 40;

/// Framebuffer dimensions (colour indices, one byte per pixel).
pub const FB_WIDTH: usize = 320;
pub const FB_HEIGHT: usize = 200;

/// Event from one VIC cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VicEvent {
    /// The beam wrapped past the last line: one full frame generated.
    FrameComplete,
    /// The raster compare matched with the interrupt enabled.
    RasterIrq,
}

/// Stored per-sprite state (position and attribute bits).
#[derive(Debug, Clone, Copy, Default)]
struct Sprite {
    x: u16,
    y: u8,
    enabled: bool,
    expand_x: bool,
    expand_y: bool,
    multicolor: bool,
}

/// The VIC-II 6569/6567.
pub struct Vic {
    lines_per_frame: u16,
    cycles_per_line: u8,

    /// Beam position: line 0..lines_per_frame, cycle 0..cycles_per_line.
    raster_line: u16,
    raster_cycle: u8,
    frame_count: u64,

    /// Raster line that triggers the raster interrupt (9 bits).
    raster_compare: u16,

    sprites: [Sprite; 8],
    sprite_priority: u8,
    sprite_collision: u8,
    sprite_bg_collision: u8,

    /// $D020-$D02E.
    colors: [u8; 15],

    control_1: u8,
    control_2: u8,
    mem_pointers: u8,
    pen_x: u8,
    pen_y: u8,

    /// Interrupt enable mask ($D01A) and latched status ($D019).
    irq_enable: u8,
    irq_status: u8,

    bad_line: bool,

    framebuffer: Vec<u8>,
}

impl Vic {
    #[must_use]
    pub fn new(model: C64Model) -> Self {
        Self {
            lines_per_frame: model.lines_per_frame(),
            cycles_per_line: model.cycles_per_line(),
            raster_line: 0,
            raster_cycle: 0,
            frame_count: 0,
            raster_compare: 0,
            sprites: [Sprite::default(); 8],
            sprite_priority: 0,
            sprite_collision: 0,
            sprite_bg_collision: 0,
            colors: [0; 15],
            control_1: 0,
            control_2: 0,
            mem_pointers: 0,
            pen_x: 0,
            pen_y: 0,
            irq_enable: 0,
            irq_status: 0,
            bad_line: false,
            framebuffer: vec![0; FB_WIDTH * FB_HEIGHT],
        }
    }

    /// Advance the beam by one cycle.
    ///
    /// Renders the current 8-pixel column when inside the display window,
    /// re-evaluates the bad-line condition, and reports a frame or
    /// raster-interrupt event when one fires on this cycle.
    pub fn tick(&mut self, memory: &C64Memory) -> Option<VicEvent> {
        self.raster_cycle += 1;
        self.update_bad_line();
        self.render_column(memory);

        if self.raster_cycle >= self.cycles_per_line {
            self.raster_cycle = 0;
            self.raster_line += 1;

            if self.raster_line >= self.lines_per_frame {
                self.raster_line = 0;
                self.frame_count += 1;
                // The raster compare is still evaluated on the wrap line;
                // the status bit makes it visible on the IRQ line even
                // though the frame event takes precedence here.
                self.check_raster_compare();
                return Some(VicEvent::FrameComplete);
            }

            if self.check_raster_compare() {
                return Some(VicEvent::RasterIrq);
            }
        }
        None
    }

    /// Latch the raster interrupt if the compare matches and the source
    /// is enabled.
    fn check_raster_compare(&mut self) -> bool {
        if self.raster_line == self.raster_compare && self.irq_enable & 0x01 != 0 {
            self.irq_status |= 0x01;
            return true;
        }
        false
    }

    /// Bad line: raster in [$30, $F7], low bits matching Y-scroll, with
    /// the display enabled.
    fn update_bad_line(&mut self) {
        self.bad_line = (FIRST_BADLINE..=LAST_BADLINE).contains(&self.raster_line)
            && (self.raster_line & 0x07) as u8 == self.control_1 & CTRL1_YSCROLL
            && self.control_1 & CTRL1_DEN != 0;
    }

    /// Emit one 8-pixel column of standard text mode.
    ///
    /// Bitmap and multicolor selections still advance the buffer; only
    /// the standard text matrix is decoded to pixels.
    fn render_column(&mut self, memory: &C64Memory) {
        if !(DISPLAY_FIRST_LINE..=DISPLAY_LAST_LINE).contains(&self.raster_line) {
            return;
        }
        if !(DISPLAY_FIRST_CYCLE..DISPLAY_FIRST_CYCLE + DISPLAY_CYCLES)
            .contains(&self.raster_cycle)
        {
            return;
        }

        let text_row = (self.raster_line - DISPLAY_FIRST_LINE) / 8;
        let char_line = (self.raster_line - DISPLAY_FIRST_LINE) % 8;
        let column = u16::from(self.raster_cycle - DISPLAY_FIRST_CYCLE);
        let cell = text_row * 40 + column;

        let screen_code = memory.ram_read(self.video_matrix() + cell);
        let colour = memory.colour_ram_read(cell);
        let glyph = memory.char_rom_read(u16::from(screen_code) * 8 + char_line);

        let fb_index =
            (self.raster_line - DISPLAY_FIRST_LINE) as usize * FB_WIDTH + column as usize * 8;
        let background = self.colors[1] & 0x0F; // $D021

        for bit in 0..8 {
            let pixel = (glyph >> (7 - bit)) & 1;
            self.framebuffer[fb_index + bit] = if pixel == 1 { colour } else { background };
        }
    }

    /// Screen matrix base from $D018 bits 4-7 (within the first 16K bank).
    fn video_matrix(&self) -> u16 {
        u16::from(self.mem_pointers >> 4) * 0x0400
    }

    /// Read a register (index within the $D000 window).
    ///
    /// `&mut self` because the collision registers clear on read.
    #[must_use]
    pub fn read(&mut self, reg: u8) -> u8 {
        match reg & 0x7F {
            REG_SPRITE_COLLISION => {
                let value = self.sprite_collision;
                self.sprite_collision = 0;
                value
            }
            REG_SPRITE_BG_COLLISION => {
                let value = self.sprite_bg_collision;
                self.sprite_bg_collision = 0;
                value
            }
            other => self.peek(other),
        }
    }

    /// Read without side effects.
    #[must_use]
    pub fn peek(&self, reg: u8) -> u8 {
        let reg = reg & 0x7F;
        match reg {
            // Sprite X low bytes (even) and Y positions (odd).
            0x00..=0x0F => {
                let sprite = &self.sprites[(reg >> 1) as usize];
                if reg & 1 == 0 {
                    sprite.x as u8
                } else {
                    sprite.y
                }
            }
            REG_SPRITE_X_MSB => self
                .sprites
                .iter()
                .enumerate()
                .fold(0, |acc, (i, s)| acc | (u8::from(s.x > 0xFF) << i)),
            REG_CONTROL_1 => {
                (self.control_1 & 0x7F) | (((self.raster_line & 0x100) >> 1) as u8)
            }
            REG_RASTER => self.raster_line as u8,
            REG_PEN_X => self.pen_x,
            REG_PEN_Y => self.pen_y,
            REG_SPRITE_ENABLE => self.sprite_bits(|s| s.enabled),
            REG_CONTROL_2 => self.control_2,
            REG_SPRITE_Y_EXPAND => self.sprite_bits(|s| s.expand_y),
            REG_MEM_POINTERS => self.mem_pointers,
            REG_INTERRUPT => {
                let pending = if self.irq_status & self.irq_enable & 0x0F != 0 {
                    0x80
                } else {
                    0x00
                };
                self.irq_status | pending
            }
            REG_INTERRUPT_ENABLE => self.irq_enable & 0x0F,
            REG_SPRITE_PRIORITY => self.sprite_priority,
            REG_SPRITE_MULTICOLOR => self.sprite_bits(|s| s.multicolor),
            REG_SPRITE_X_EXPAND => self.sprite_bits(|s| s.expand_x),
            REG_SPRITE_COLLISION => self.sprite_collision,
            REG_SPRITE_BG_COLLISION => self.sprite_bg_collision,
            REG_BORDER_COLOR..=REG_SPRITE7_COLOR => {
                self.colors[(reg - REG_BORDER_COLOR) as usize]
            }
            _ => 0xFF,
        }
    }

    fn sprite_bits(&self, select: impl Fn(&Sprite) -> bool) -> u8 {
        self.sprites
            .iter()
            .enumerate()
            .fold(0, |acc, (i, s)| acc | (u8::from(select(s)) << i))
    }

    /// Write a register.
    ///
    /// The colour registers accept writes at any time. The rest of the
    /// window only accepts writes during vertical blank or the early part
    /// of a line; elsewhere the write is dropped, as on hardware.
    pub fn write(&mut self, reg: u8, value: u8) {
        let reg = reg & 0x7F;

        if (REG_BORDER_COLOR..=REG_SPRITE7_COLOR).contains(&reg) {
            self.colors[(reg - REG_BORDER_COLOR) as usize] = value;
            return;
        }

        if !self.write_window_open() {
            log::trace!(
                "dropped VIC write ${value:02X} to reg ${reg:02X} at line {} cycle {}",
                self.raster_line,
                self.raster_cycle
            );
            return;
        }

        match reg {
            0x00..=0x0F => {
                let sprite = &mut self.sprites[(reg >> 1) as usize];
                if reg & 1 == 0 {
                    sprite.x = (sprite.x & 0x100) | u16::from(value);
                } else {
                    sprite.y = value;
                }
            }
            REG_SPRITE_X_MSB => {
                for (i, sprite) in self.sprites.iter_mut().enumerate() {
                    if value & (1 << i) != 0 {
                        sprite.x |= 0x100;
                    } else {
                        sprite.x &= 0xFF;
                    }
                }
            }
            REG_CONTROL_1 => {
                // Bit 7 is the raster compare's ninth bit.
                self.raster_compare =
                    (self.raster_compare & 0x00FF) | (u16::from(value & CTRL1_RASTER8) << 1);
                self.control_1 = value;
            }
            REG_RASTER => {
                self.raster_compare = (self.raster_compare & 0x0100) | u16::from(value);
            }
            REG_PEN_X => self.pen_x = value,
            REG_PEN_Y => self.pen_y = value,
            REG_SPRITE_ENABLE => self.set_sprite_bits(value, |s, on| s.enabled = on),
            REG_CONTROL_2 => self.control_2 = value,
            REG_SPRITE_Y_EXPAND => self.set_sprite_bits(value, |s, on| s.expand_y = on),
            REG_MEM_POINTERS => self.mem_pointers = value,
            REG_INTERRUPT => {
                // Writing 1s acknowledges those sources; the IRQ line
                // falls once the status is clear.
                self.irq_status &= !value & 0x0F;
            }
            REG_INTERRUPT_ENABLE => self.irq_enable = value & 0x0F,
            REG_SPRITE_PRIORITY => self.sprite_priority = value,
            REG_SPRITE_MULTICOLOR => self.set_sprite_bits(value, |s, on| s.multicolor = on),
            REG_SPRITE_X_EXPAND => self.set_sprite_bits(value, |s, on| s.expand_x = on),
            // Collision registers are read-only.
            REG_SPRITE_COLLISION | REG_SPRITE_BG_COLLISION => {}
            _ => {}
        }
    }

    /// Sprite and control registers are writable only during vertical
    /// blank or before the display fetch portion of a line.
    fn write_window_open(&self) -> bool {
        self.raster_line < 51 || self.raster_line > 251 || self.raster_cycle < 58
    }

    fn set_sprite_bits(&mut self, value: u8, mut apply: impl FnMut(&mut Sprite, bool)) {
        for (i, sprite) in self.sprites.iter_mut().enumerate() {
            apply(sprite, value & (1 << i) != 0);
        }
    }

    /// Does the VIC currently pull the IRQ line?
    #[must_use]
    pub fn irq_active(&self) -> bool {
        self.irq_status & self.irq_enable & 0x0F != 0
    }

    /// Current raster line.
    #[must_use]
    pub fn raster_line(&self) -> u16 {
        self.raster_line
    }

    /// Current cycle within the line.
    #[must_use]
    pub fn raster_cycle(&self) -> u8 {
        self.raster_cycle
    }

    /// Completed frames.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Whether the current line is a bad line.
    #[must_use]
    pub fn is_bad_line(&self) -> bool {
        self.bad_line
    }

    /// The 320x200 colour-index framebuffer.
    #[must_use]
    pub fn framebuffer(&self) -> &[u8] {
        &self.framebuffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vic_and_memory() -> (Vic, C64Memory) {
        (Vic::new(C64Model::Pal), C64Memory::new())
    }

    fn run(vic: &mut Vic, memory: &C64Memory, cycles: u32) -> Vec<VicEvent> {
        let mut events = Vec::new();
        for _ in 0..cycles {
            if let Some(event) = vic.tick(memory) {
                events.push(event);
            }
        }
        events
    }

    #[test]
    fn raster_advances_line_by_line() {
        let (mut vic, memory) = vic_and_memory();
        run(&mut vic, &memory, 63);
        assert_eq!(vic.raster_line(), 1);
        assert_eq!(vic.raster_cycle(), 0);
    }

    #[test]
    fn one_frame_complete_event_per_frame() {
        let (mut vic, memory) = vic_and_memory();
        let events = run(&mut vic, &memory, 312 * 63);
        assert_eq!(events, vec![VicEvent::FrameComplete]);
        assert_eq!(vic.frame_count(), 1);
        assert_eq!(vic.raster_line(), 0);

        let events = run(&mut vic, &memory, 312 * 63);
        assert_eq!(events, vec![VicEvent::FrameComplete]);
        assert_eq!(vic.frame_count(), 2);
    }

    #[test]
    fn ntsc_frame_timing() {
        let mut vic = Vic::new(C64Model::Ntsc);
        let memory = C64Memory::new();
        let events = run(&mut vic, &memory, 263 * 65);
        assert_eq!(events, vec![VicEvent::FrameComplete]);
    }

    #[test]
    fn raster_irq_fires_when_enabled() {
        let (mut vic, memory) = vic_and_memory();
        vic.write(REG_RASTER, 0x30);
        vic.write(REG_INTERRUPT_ENABLE, 0x01);

        let events = run(&mut vic, &memory, 63 * 0x30);
        assert_eq!(events, vec![VicEvent::RasterIrq]);
        assert_eq!(vic.raster_line(), 0x30);
        assert!(vic.irq_active());

        // Acknowledge: the line falls.
        vic.write(REG_INTERRUPT, 0x01);
        assert!(!vic.irq_active());
    }

    #[test]
    fn raster_irq_needs_enable_bit() {
        let (mut vic, memory) = vic_and_memory();
        vic.write(REG_RASTER, 0x30);
        let events = run(&mut vic, &memory, 63 * 0x40);
        assert!(events.iter().all(|e| *e == VicEvent::FrameComplete));
        assert!(!vic.irq_active());
    }

    #[test]
    fn raster_compare_ninth_bit() {
        let (mut vic, memory) = vic_and_memory();
        // Line $130 = 304: raster register $30 plus control-1 bit 7.
        vic.write(REG_RASTER, 0x30);
        vic.write(REG_CONTROL_1, CTRL1_RASTER8);
        vic.write(REG_INTERRUPT_ENABLE, 0x01);

        let events = run(&mut vic, &memory, 63 * 0x130);
        assert_eq!(events, vec![VicEvent::RasterIrq]);
        assert_eq!(vic.raster_line(), 0x130);
    }

    #[test]
    fn control_1_read_carries_raster_bit_8() {
        let (mut vic, memory) = vic_and_memory();
        run(&mut vic, &memory, 63 * 300);
        assert_eq!(vic.raster_line(), 300);
        assert_eq!(vic.peek(REG_RASTER), (300u16 & 0xFF) as u8);
        assert_eq!(vic.peek(REG_CONTROL_1) & 0x80, 0x80);
    }

    #[test]
    fn colour_registers_always_writable() {
        let (mut vic, memory) = vic_and_memory();
        // Park the beam mid-display where other writes are dropped.
        run(&mut vic, &memory, 63 * 100 + 60);
        assert!(!vic.write_window_open());

        vic.write(REG_BORDER_COLOR, 0x06);
        assert_eq!(vic.peek(REG_BORDER_COLOR), 0x06);
    }

    #[test]
    fn sprite_writes_dropped_outside_window() {
        let (mut vic, memory) = vic_and_memory();
        vic.write(0x00, 0x42); // sprite 0 X at line 0: accepted
        assert_eq!(vic.peek(0x00), 0x42);

        run(&mut vic, &memory, 63 * 100 + 60);
        vic.write(0x00, 0x99);
        assert_eq!(vic.peek(0x00), 0x42, "mid-display write dropped");
    }

    #[test]
    fn sprite_x_msb() {
        let (mut vic, _memory) = vic_and_memory();
        vic.write(0x00, 0x10);
        vic.write(REG_SPRITE_X_MSB, 0x01);
        assert_eq!(vic.peek(0x00), 0x10);
        assert_eq!(vic.peek(REG_SPRITE_X_MSB), 0x01);
        vic.write(REG_SPRITE_X_MSB, 0x00);
        assert_eq!(vic.peek(REG_SPRITE_X_MSB), 0x00);
    }

    #[test]
    fn collision_registers_clear_on_read() {
        let (mut vic, _memory) = vic_and_memory();
        vic.sprite_collision = 0x03;
        vic.sprite_bg_collision = 0x05;
        assert_eq!(vic.read(REG_SPRITE_COLLISION), 0x03);
        assert_eq!(vic.read(REG_SPRITE_COLLISION), 0x00);
        assert_eq!(vic.read(REG_SPRITE_BG_COLLISION), 0x05);
        assert_eq!(vic.read(REG_SPRITE_BG_COLLISION), 0x00);
    }

    #[test]
    fn bad_line_condition() {
        let (mut vic, memory) = vic_and_memory();
        vic.write(REG_CONTROL_1, CTRL1_DEN | 0x03); // DEN, Y-scroll 3
        // Line $33 & 7 == 3 within the bad-line window.
        run(&mut vic, &memory, 63 * 0x33 + 1);
        assert_eq!(vic.raster_line(), 0x33);
        assert!(vic.is_bad_line());

        run(&mut vic, &memory, 63);
        assert!(!vic.is_bad_line(), "next line misses the Y-scroll match");
    }

    #[test]
    fn bad_line_needs_display_enable() {
        let (mut vic, memory) = vic_and_memory();
        vic.write(REG_CONTROL_1, 0x03);
        run(&mut vic, &memory, 63 * 0x33 + 1);
        assert!(!vic.is_bad_line());
    }

    #[test]
    fn text_mode_renders_into_framebuffer() {
        let (mut vic, mut memory) = vic_and_memory();
        // Character $01 has a solid top row in this synthetic charset.
        let mut charset = vec![0u8; 4096];
        charset[8] = 0xFF;
        memory.load_rom(crate::RomSlot::Char, &charset).unwrap();

        // Screen matrix at $0400 (mem pointers high nybble = 1).
        vic.write(REG_MEM_POINTERS, 0x10);
        memory.ram_write(0x0400, 0x01);
        memory.colour_ram_write(0, 0x07);

        // Run to the first display row.
        run(&mut vic, &memory, 63 * 57);
        let fb = vic.framebuffer();
        for pixel in 0..8 {
            assert_eq!(fb[pixel], 0x07, "glyph pixels take the cell colour");
        }
        assert_eq!(fb[8], 0x00, "next cell is background");
    }

    #[test]
    fn unmapped_registers_read_ff() {
        let (mut vic, _memory) = vic_and_memory();
        assert_eq!(vic.read(0x3F), 0xFF);
        assert_eq!(vic.read(0x7F), 0xFF);
    }
}
