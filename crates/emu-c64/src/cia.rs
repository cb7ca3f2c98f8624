//! CIA 6526 Complex Interface Adapter.
//!
//! Two identical chips in the C64, differing only in which CPU line they
//! drive: CIA1 ($DC00) raises IRQ, CIA2 ($DD00) raises NMI.
//!
//! # Registers
//!
//! | Reg | Purpose                                  |
//! |-----|------------------------------------------|
//! | $x0 | Port A data                              |
//! | $x1 | Port B data (timer outputs on bits 6/7)  |
//! | $x2 | Port A DDR                               |
//! | $x3 | Port B DDR                               |
//! | $x4 | Timer A low (read counter, write latch)  |
//! | $x5 | Timer A high                             |
//! | $x6 | Timer B low                              |
//! | $x7 | Timer B high                             |
//! | $x8 | TOD tenths (BCD)                         |
//! | $x9 | TOD seconds (BCD)                        |
//! | $xA | TOD minutes (BCD)                        |
//! | $xB | TOD hours (BCD, bit 7 = PM)              |
//! | $xC | Serial data register                     |
//! | $xD | ICR (read data+clear, write mask)        |
//! | $xE | Control register A                       |
//! | $xF | Control register B                       |

// Register offsets.
pub const PRA: u8 = 0x00;
pub const PRB: u8 = 0x01;
pub const DDRA: u8 = 0x02;
pub const DDRB: u8 = 0x03;
pub const TA_LO: u8 = 0x04;
pub const TA_HI: u8 = 0x05;
pub const TB_LO: u8 = 0x06;
pub const TB_HI: u8 = 0x07;
pub const TOD_10THS: u8 = 0x08;
pub const TOD_SEC: u8 = 0x09;
pub const TOD_MIN: u8 = 0x0A;
pub const TOD_HR: u8 = 0x0B;
pub const SDR: u8 = 0x0C;
pub const ICR: u8 = 0x0D;
pub const CRA: u8 = 0x0E;
pub const CRB: u8 = 0x0F;

// Control register A bits.
pub const CRA_START: u8 = 0x01;
pub const CRA_PBON: u8 = 0x02;
pub const CRA_OUTMODE: u8 = 0x04;
pub const CRA_RUNMODE: u8 = 0x08;
pub const CRA_FORCE: u8 = 0x10;
pub const CRA_INMODE: u8 = 0x20;
pub const CRA_TODIN: u8 = 0x80;

// Control register B bits. INMODE is two bits wide:
// 00 = system clock, 01 = CNT edge, 10 = timer A underflow,
// 11 = timer A underflow while CNT is high.
pub const CRB_START: u8 = 0x01;
pub const CRB_PBON: u8 = 0x02;
pub const CRB_OUTMODE: u8 = 0x04;
pub const CRB_RUNMODE: u8 = 0x08;
pub const CRB_FORCE: u8 = 0x10;
pub const CRB_INMODE: u8 = 0x60;
pub const CRB_ALARM: u8 = 0x80;

// Interrupt control bits.
pub const ICR_TA: u8 = 0x01;
pub const ICR_TB: u8 = 0x02;
pub const ICR_TOD: u8 = 0x04;
pub const ICR_SDR: u8 = 0x08;
pub const ICR_FLAG: u8 = 0x10;
pub const ICR_SET: u8 = 0x80;

/// Which CPU line the chip drives on a pending interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CiaRole {
    /// CIA1: the IRQ line.
    Irq,
    /// CIA2: the NMI line.
    Nmi,
}

/// Event from one CIA cycle: the chip's line went from idle to asserted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CiaEvent {
    pub irq: bool,
    pub nmi: bool,
}

/// One CIA 6526.
pub struct Cia {
    role: CiaRole,

    port_a: u8,
    port_b: u8,
    ddr_a: u8,
    ddr_b: u8,

    timer_a: u16,
    timer_a_latch: u16,
    timer_b: u16,
    timer_b_latch: u16,

    /// TOD clock digits: tenths, seconds, minutes, hours (BCD, PM in
    /// bit 7 of hours).
    tod_tenths: u8,
    tod_sec: u8,
    tod_min: u8,
    tod_hr: u8,
    /// Alarm digits in the same order.
    tod_alarm: [u8; 4],
    /// Cycles accumulated toward the next TOD tick.
    tod_cycles: u32,

    sdr: u8,

    /// Interrupt mask (write-only half of the ICR).
    icr_mask: u8,
    /// Interrupt data (read-and-clear half of the ICR).
    icr_data: u8,

    cra: u8,
    crb: u8,

    /// Underflow edge flags, visible for one cycle.
    timer_a_underflow: bool,
    timer_b_underflow: bool,

    /// CNT pin state and derived positive edge.
    cnt_previous: bool,
    cnt_current: bool,
    cnt_pos: bool,

    /// Line level, for edge-detecting the event.
    line_active: bool,
}

impl Cia {
    #[must_use]
    pub fn new(role: CiaRole) -> Self {
        Self {
            role,
            port_a: 0,
            port_b: 0,
            ddr_a: 0,
            ddr_b: 0,
            timer_a: 0xFFFF,
            timer_a_latch: 0xFFFF,
            timer_b: 0xFFFF,
            timer_b_latch: 0xFFFF,
            tod_tenths: 0,
            tod_sec: 0,
            tod_min: 0,
            tod_hr: 0,
            tod_alarm: [0; 4],
            tod_cycles: 0,
            sdr: 0,
            icr_mask: 0,
            icr_data: 0,
            cra: 0,
            crb: 0,
            timer_a_underflow: false,
            timer_b_underflow: false,
            cnt_previous: false,
            cnt_current: false,
            cnt_pos: false,
            line_active: false,
        }
    }

    /// Drive the CNT pin. A low-to-high transition arms the edge flag
    /// consumed by the timers on the next cycle.
    pub fn set_cnt(&mut self, level: bool) {
        self.cnt_previous = self.cnt_current;
        self.cnt_current = level;
        self.cnt_pos = !self.cnt_previous && self.cnt_current;
    }

    /// Advance the chip by one CPU cycle.
    ///
    /// Order within the cycle: timer A, timer B (which may consume timer
    /// A's underflow), clear the underflow edge flags, TOD, interrupt
    /// line aggregation.
    pub fn tick(&mut self) -> CiaEvent {
        if self.cra & CRA_START != 0 {
            let clocked = if self.cra & CRA_INMODE == 0 {
                true
            } else {
                self.cnt_pos
            };
            if clocked {
                self.step_timer_a();
            }
        }

        if self.crb & CRB_START != 0 {
            let clocked = match (self.crb & CRB_INMODE) >> 5 {
                0 => true,
                1 => self.cnt_pos,
                2 => self.timer_a_underflow,
                _ => self.timer_a_underflow && self.cnt_current,
            };
            if clocked {
                self.step_timer_b();
            }
        }

        // Edge flags live for exactly this cycle.
        self.timer_a_underflow = false;
        self.timer_b_underflow = false;
        self.cnt_pos = false;

        self.tod_cycles += 1;
        if self.tod_cycles >= self.tod_period() {
            self.tod_cycles = 0;
            self.advance_tod();
        }

        let mut event = CiaEvent::default();
        if self.irq_active() {
            if !self.line_active {
                self.line_active = true;
                match self.role {
                    CiaRole::Irq => event.irq = true,
                    CiaRole::Nmi => event.nmi = true,
                }
            }
        } else {
            self.line_active = false;
        }
        event
    }

    /// Any enabled interrupt pending?
    #[must_use]
    pub fn irq_active(&self) -> bool {
        self.icr_data & self.icr_mask & 0x1F != 0
    }

    fn step_timer_a(&mut self) {
        self.timer_a = self.timer_a.wrapping_sub(1);
        if self.timer_a == 0 {
            self.timer_a_underflow = true;
            if self.icr_mask & ICR_TA != 0 {
                self.icr_data |= ICR_TA;
            }
            if self.cra & CRA_PBON != 0 {
                if self.cra & CRA_OUTMODE != 0 {
                    self.port_b ^= 0x40;
                } else {
                    self.port_b |= 0x40;
                }
            }
            if self.cra & CRA_RUNMODE != 0 {
                self.cra &= !CRA_START;
            }
            self.timer_a = self.timer_a_latch;
        } else if self.cra & CRA_PBON != 0 && self.cra & CRA_OUTMODE == 0 {
            // Pulse mode: the output bit stays high for one cycle only.
            self.port_b &= !0x40;
        }
    }

    fn step_timer_b(&mut self) {
        self.timer_b = self.timer_b.wrapping_sub(1);
        if self.timer_b == 0 {
            self.timer_b_underflow = true;
            if self.icr_mask & ICR_TB != 0 {
                self.icr_data |= ICR_TB;
            }
            if self.crb & CRB_PBON != 0 {
                if self.crb & CRB_OUTMODE != 0 {
                    self.port_b ^= 0x80;
                } else {
                    self.port_b |= 0x80;
                }
            }
            if self.crb & CRB_RUNMODE != 0 {
                self.crb &= !CRB_START;
            }
            self.timer_b = self.timer_b_latch;
        } else if self.crb & CRB_PBON != 0 && self.crb & CRB_OUTMODE == 0 {
            self.port_b &= !0x80;
        }
    }

    /// Cycles per TOD tick: CRA bit 7 selects 50 Hz mains (20,000 cycles)
    /// over 60 Hz (16,667).
    fn tod_period(&self) -> u32 {
        if self.cra & CRA_TODIN != 0 {
            20_000
        } else {
            16_667
        }
    }

    /// Advance the TOD clock by one tenth of a second, in BCD.
    fn advance_tod(&mut self) {
        self.tod_tenths = (self.tod_tenths + 1) & 0x0F;
        if self.tod_tenths > 0x09 {
            self.tod_tenths = 0x00;

            self.tod_sec = bcd_increment(self.tod_sec);
            if self.tod_sec > 0x59 {
                self.tod_sec = 0x00;

                self.tod_min = bcd_increment(self.tod_min);
                if self.tod_min > 0x59 {
                    self.tod_min = 0x00;

                    // Hours run 1-12 with the PM flag toggling at 11->12.
                    let hours = self.tod_hr & 0x1F;
                    let mut pm = self.tod_hr & 0x80;
                    let next = match hours {
                        0x11 => {
                            pm ^= 0x80;
                            0x12
                        }
                        0x12 => 0x01,
                        h if h & 0x0F == 0x09 => 0x10,
                        h => h + 1,
                    };
                    self.tod_hr = next | pm;
                }
            }
        }

        if self.tod_tenths == self.tod_alarm[0]
            && self.tod_sec == self.tod_alarm[1]
            && self.tod_min == self.tod_alarm[2]
            && self.tod_hr == self.tod_alarm[3]
            && self.icr_mask & ICR_TOD != 0
        {
            self.icr_data |= ICR_TOD;
        }
    }

    /// Read a register. `&mut self` because the ICR clears on read.
    #[must_use]
    pub fn read(&mut self, reg: u8) -> u8 {
        match reg & 0x0F {
            ICR => self.read_icr(),
            other => self.peek(other),
        }
    }

    /// Read without side effects (debugging; the ICR data survives).
    #[must_use]
    pub fn peek(&self, reg: u8) -> u8 {
        match reg & 0x0F {
            PRA => self.read_port_a(),
            PRB => self.read_port_b(),
            DDRA => self.ddr_a,
            DDRB => self.ddr_b,
            TA_LO => self.timer_a as u8,
            TA_HI => (self.timer_a >> 8) as u8,
            TB_LO => self.timer_b as u8,
            TB_HI => (self.timer_b >> 8) as u8,
            TOD_10THS => self.tod_tenths,
            TOD_SEC => self.tod_sec,
            TOD_MIN => self.tod_min,
            TOD_HR => self.tod_hr,
            SDR => self.sdr,
            ICR => {
                let pending = if self.irq_active() { 0x80 } else { 0x00 };
                (self.icr_data & 0x1F) | pending
            }
            CRA => self.cra,
            _ => self.crb,
        }
    }

    /// ICR read: data plus bit 7 when an enabled interrupt is pending;
    /// the data register clears and the chip's line falls.
    fn read_icr(&mut self) -> u8 {
        let pending = if self.irq_active() { 0x80 } else { 0x00 };
        let value = (self.icr_data & 0x1F) | pending;
        self.icr_data = 0;
        self.line_active = false;
        value
    }

    fn read_port_a(&self) -> u8 {
        // Output bits from the register; input lines float high except
        // bits 0-1, which read back inverted (the VIC bank pins on CIA2).
        let input = 0xFC | (!self.port_a & 0x03);
        (self.port_a & self.ddr_a) | (input & !self.ddr_a)
    }

    fn read_port_b(&self) -> u8 {
        let mut value = (self.port_b & self.ddr_b) | !self.ddr_b;
        // Timer outputs override bits 6/7 when enabled.
        if self.cra & CRA_PBON != 0 {
            value = (value & !0x40) | (self.port_b & 0x40);
        }
        if self.crb & CRB_PBON != 0 {
            value = (value & !0x80) | (self.port_b & 0x80);
        }
        value
    }

    /// Write a register.
    pub fn write(&mut self, reg: u8, value: u8) {
        match reg & 0x0F {
            PRA => self.port_a = value,
            PRB => self.port_b = value,
            DDRA => self.ddr_a = value,
            DDRB => self.ddr_b = value,
            TA_LO => {
                self.timer_a_latch = (self.timer_a_latch & 0xFF00) | u16::from(value);
            }
            TA_HI => {
                self.timer_a_latch = (self.timer_a_latch & 0x00FF) | (u16::from(value) << 8);
                self.timer_a = self.timer_a_latch;
            }
            TB_LO => {
                self.timer_b_latch = (self.timer_b_latch & 0xFF00) | u16::from(value);
            }
            TB_HI => {
                self.timer_b_latch = (self.timer_b_latch & 0x00FF) | (u16::from(value) << 8);
                self.timer_b = self.timer_b_latch;
            }
            TOD_10THS => {
                if self.crb & CRB_ALARM != 0 {
                    self.tod_alarm[0] = value & 0x0F;
                } else {
                    self.tod_tenths = value & 0x0F;
                }
            }
            TOD_SEC => {
                if self.crb & CRB_ALARM != 0 {
                    self.tod_alarm[1] = value & 0x7F;
                } else {
                    self.tod_sec = value & 0x7F;
                }
            }
            TOD_MIN => {
                if self.crb & CRB_ALARM != 0 {
                    self.tod_alarm[2] = value & 0x7F;
                } else {
                    self.tod_min = value & 0x7F;
                }
            }
            TOD_HR => {
                // Hour 0 does not exist on a 12-hour clock; coerce to 12.
                let mut hours = value & 0x1F;
                if hours == 0 {
                    hours = 0x12;
                }
                let hours = hours | (value & 0x80);
                if self.crb & CRB_ALARM != 0 {
                    self.tod_alarm[3] = hours;
                } else {
                    self.tod_hr = hours;
                }
            }
            SDR => self.sdr = value,
            ICR => {
                // Bit 7 selects set (1) or clear (0) of the listed bits.
                if value & ICR_SET != 0 {
                    self.icr_mask |= value & 0x1F;
                } else {
                    self.icr_mask &= !(value & 0x1F);
                }
            }
            CRA => {
                let was_stopped = self.cra & CRA_START == 0;
                self.cra = value;
                if value & CRA_FORCE != 0 {
                    self.timer_a = self.timer_a_latch;
                    self.cra &= !CRA_FORCE;
                }
                if was_stopped && value & CRA_START != 0 && self.timer_a == 0 {
                    self.timer_a = self.timer_a_latch;
                }
            }
            _ => {
                let was_stopped = self.crb & CRB_START == 0;
                self.crb = value;
                if value & CRB_FORCE != 0 {
                    self.timer_b = self.timer_b_latch;
                    self.crb &= !CRB_FORCE;
                }
                if was_stopped && value & CRB_START != 0 && self.timer_b == 0 {
                    self.timer_b = self.timer_b_latch;
                }
            }
        }
    }

    /// Port A output value with undriven lines high (the VIC bank source
    /// on CIA2).
    #[must_use]
    pub fn port_a_output(&self) -> u8 {
        (self.port_a & self.ddr_a) | !self.ddr_a
    }

    /// Timer A counter, for debugging.
    #[must_use]
    pub fn timer_a(&self) -> u16 {
        self.timer_a
    }

    /// Timer B counter, for debugging.
    #[must_use]
    pub fn timer_b(&self) -> u16 {
        self.timer_b
    }
}

fn bcd_increment(value: u8) -> u8 {
    if value & 0x0F == 0x09 {
        (value & 0xF0) + 0x10
    } else {
        value + 1
    }
}
