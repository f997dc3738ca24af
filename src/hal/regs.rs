//! Register addressing and bit-field access.

use crate::hal::adc::{AdcChannel, AdcCore};
use crate::hal::gpio::{Port, RemappablePin};
use crate::hal::irq::Irq;
use crate::hal::pwm::{Block, GeneratorId, PgReg};
use crate::hal::uart::UartReg;
use defmt::Format;

/// Every register the bring-up reads or writes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Format)]
pub enum Reg {
    // PWM common
    Pclkcon,
    Fscl,
    Fsminper,
    Mphase,
    Mdc,
    Mper,
    Lfsr,
    Cmbtrig,
    Logcon(Block),
    Pwmevt(Block),
    Apwmevta,
    /// Per-generator register
    Pg(GeneratorId, PgReg),

    AdCon(AdcCore),
    AdChCon(AdcChannel),

    // One word per interrupt source
    IntPriority(Irq),
    IntFlag(Irq),
    IntEnable(Irq),

    T1Con,
    Tmr1,
    Pr1,

    Dac3Con,
    Dac3Dat,

    U1(UartReg),

    Tris(Port),
    Lat(Port),
    Ansel(Port),
    /// Output function of a remappable pin
    Rpor(RemappablePin),
}

const COMMON_BASE: usize = 0;
const LOGCON_BASE: usize = COMMON_BASE + 8;
const PWMEVT_BASE: usize = LOGCON_BASE + Block::COUNT;
const APWMEVTA: usize = PWMEVT_BASE + Block::COUNT;
const PG_BASE: usize = APWMEVTA + 1;
const ADCON_BASE: usize = PG_BASE + GeneratorId::COUNT * PgReg::COUNT;
const ADCHCON_BASE: usize = ADCON_BASE + AdcCore::COUNT;
const IPC_BASE: usize = ADCHCON_BASE + AdcChannel::COUNT;
const IFS_BASE: usize = IPC_BASE + Irq::COUNT;
const IEC_BASE: usize = IFS_BASE + Irq::COUNT;
const T1_BASE: usize = IEC_BASE + Irq::COUNT;
const DAC_BASE: usize = T1_BASE + 3;
const U1_BASE: usize = DAC_BASE + 2;
const TRIS_BASE: usize = U1_BASE + UartReg::COUNT;
const LAT_BASE: usize = TRIS_BASE + Port::COUNT;
const ANSEL_BASE: usize = LAT_BASE + Port::COUNT;
const RPOR_BASE: usize = ANSEL_BASE + Port::COUNT;

impl Reg {
    /// Number of distinct registers.
    pub const COUNT: usize = RPOR_BASE + RemappablePin::COUNT;

    /// Dense index, for array-backed register files.
    pub const fn index(self) -> usize {
        match self {
            Reg::Pclkcon => COMMON_BASE,
            Reg::Fscl => COMMON_BASE + 1,
            Reg::Fsminper => COMMON_BASE + 2,
            Reg::Mphase => COMMON_BASE + 3,
            Reg::Mdc => COMMON_BASE + 4,
            Reg::Mper => COMMON_BASE + 5,
            Reg::Lfsr => COMMON_BASE + 6,
            Reg::Cmbtrig => COMMON_BASE + 7,
            Reg::Logcon(b) => LOGCON_BASE + b.index(),
            Reg::Pwmevt(b) => PWMEVT_BASE + b.index(),
            Reg::Apwmevta => APWMEVTA,
            Reg::Pg(id, r) => PG_BASE + id.index() * PgReg::COUNT + r.index(),
            Reg::AdCon(core) => ADCON_BASE + core.index(),
            Reg::AdChCon(ch) => ADCHCON_BASE + ch.index(),
            Reg::IntPriority(irq) => IPC_BASE + irq.index(),
            Reg::IntFlag(irq) => IFS_BASE + irq.index(),
            Reg::IntEnable(irq) => IEC_BASE + irq.index(),
            Reg::T1Con => T1_BASE,
            Reg::Tmr1 => T1_BASE + 1,
            Reg::Pr1 => T1_BASE + 2,
            Reg::Dac3Con => DAC_BASE,
            Reg::Dac3Dat => DAC_BASE + 1,
            Reg::U1(r) => U1_BASE + r.index(),
            Reg::Tris(p) => TRIS_BASE + p.index(),
            Reg::Lat(p) => LAT_BASE + p.index(),
            Reg::Ansel(p) => ANSEL_BASE + p.index(),
            Reg::Rpor(pin) => RPOR_BASE + pin.index(),
        }
    }
}

/// Bit-field within a 32-bit register.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Field {
    pub offset: u8,
    pub width: u8,
}

impl Field {
    pub const fn new(offset: u8, width: u8) -> Self {
        assert!(width > 0 && offset as u32 + width as u32 <= 32);
        Self { offset, width }
    }

    pub const fn bit(offset: u8) -> Self {
        Self::new(offset, 1)
    }

    /// Largest value the field holds.
    pub const fn max(self) -> u32 {
        u32::MAX >> (32 - self.width as u32)
    }

    pub const fn mask(self) -> u32 {
        self.max() << self.offset
    }

    pub const fn fits(self, value: u32) -> bool {
        value <= self.max()
    }

    /// Replace the field in `word` with `value`; bits of `value` beyond the field are dropped.
    pub const fn insert(self, word: u32, value: u32) -> u32 {
        (word & !self.mask()) | ((value & self.max()) << self.offset)
    }

    pub const fn extract(self, word: u32) -> u32 {
        (word & self.mask()) >> self.offset
    }
}

/// Builds a register word one field at a time.
///
/// ```
/// # use mcboot::hal::regs::{Field, Word};
/// const ON: Field = Field::bit(15);
/// const MODE: Field = Field::new(0, 3);
/// assert_eq!(Word::new().with(ON, 1).with(MODE, 6).bits(), 0x8006);
/// ```
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Word(u32);

impl Word {
    pub const fn new() -> Self {
        Self(0)
    }

    pub const fn with(self, field: Field, value: u32) -> Self {
        Self(field.insert(self.0, value))
    }

    pub const fn with_flag(self, field: Field, set: bool) -> Self {
        self.with(field, set as u32)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }
}

/// Access to the device registers.
///
/// Reads take `&mut self`: status reads can have side effects on the device.
pub trait Registers {
    fn read(&mut self, reg: Reg) -> u32;

    fn write(&mut self, reg: Reg, value: u32);

    fn modify<F: FnOnce(u32) -> u32>(&mut self, reg: Reg, f: F) {
        let value = self.read(reg);
        self.write(reg, f(value));
    }

    fn read_field(&mut self, reg: Reg, field: Field) -> u32 {
        field.extract(self.read(reg))
    }

    fn write_field(&mut self, reg: Reg, field: Field, value: u32) {
        self.modify(reg, |w| field.insert(w, value));
    }

    fn set(&mut self, reg: Reg, field: Field) {
        self.write_field(reg, field, field.max());
    }

    fn clear(&mut self, reg: Reg, field: Field) {
        self.write_field(reg, field, 0);
    }

    fn is_set(&mut self, reg: Reg, field: Field) -> bool {
        self.read_field(reg, field) != 0
    }
}

impl<R: Registers + ?Sized> Registers for &mut R {
    fn read(&mut self, reg: Reg) -> u32 {
        (**self).read(reg)
    }

    fn write(&mut self, reg: Reg, value: u32) {
        (**self).write(reg, value)
    }
}

/// Plain register storage: every register resets to 0 and holds what was last written.
#[derive(Clone)]
pub struct RegisterFile {
    words: [u32; Reg::COUNT],
}

impl RegisterFile {
    pub const fn new() -> Self {
        Self {
            words: [0; Reg::COUNT],
        }
    }

    /// Read without side effects.
    pub fn peek(&self, reg: Reg) -> u32 {
        self.words[reg.index()]
    }

    pub fn peek_field(&self, reg: Reg, field: Field) -> u32 {
        field.extract(self.peek(reg))
    }
}

impl Registers for RegisterFile {
    fn read(&mut self, reg: Reg) -> u32 {
        self.peek(reg)
    }

    fn write(&mut self, reg: Reg, value: u32) {
        self.words[reg.index()] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::adc::ChannelIndex;

    #[test]
    fn field_insert_keeps_other_bits() {
        let f = Field::new(4, 3);
        assert_eq!(f.insert(0xffff_ffff, 0), 0xffff_ff8f);
        assert_eq!(f.insert(0, 5), 0x50);
        assert_eq!(f.extract(0xd5), 5);
    }

    #[test]
    fn field_insert_drops_excess_bits() {
        let f = Field::new(0, 2);
        assert_eq!(f.insert(0, 0b111), 0b11);
        assert!(!f.fits(4));
        assert!(f.fits(3));
    }

    #[test]
    fn full_width_field() {
        let f = Field::new(0, 32);
        assert_eq!(f.max(), u32::MAX);
        assert_eq!(f.insert(0x1234, 0xdead_beef), 0xdead_beef);
    }

    #[test]
    fn register_indices_are_unique() {
        let mut seen = [false; Reg::COUNT];
        let regs = [
            Reg::Pclkcon,
            Reg::Cmbtrig,
            Reg::Logcon(Block::F),
            Reg::Pwmevt(Block::A),
            Reg::Apwmevta,
            Reg::Pg(GeneratorId::Pg1, PgReg::Con),
            Reg::Pg(GeneratorId::Apg3, PgReg::Trigc),
            Reg::AdCon(AdcCore::Ad1),
            Reg::AdChCon(AdcChannel::new(AdcCore::Ad3, ChannelIndex::Ch3)),
            Reg::IntPriority(Irq::Timer1),
            Reg::IntEnable(Irq::Adc(AdcChannel::AD3CH2)),
            Reg::Pr1,
            Reg::Dac3Dat,
            Reg::U1(UartReg::Uir),
            Reg::Tris(Port::A),
            Reg::Ansel(Port::G),
            Reg::Rpor(RemappablePin::RP55),
        ];
        for reg in regs {
            let i = reg.index();
            assert!(i < Reg::COUNT, "{:?} out of range", reg);
            assert!(!seen[i], "{:?} collides", reg);
            seen[i] = true;
        }
    }

    #[test]
    fn generator_blocks_do_not_overlap() {
        let last_of_pg1 = Reg::Pg(GeneratorId::Pg1, PgReg::Trigc).index();
        let first_of_pg2 = Reg::Pg(GeneratorId::Pg2, PgReg::Con).index();
        assert_eq!(last_of_pg1 + 1, first_of_pg2);
    }

    #[test]
    fn register_file_round_trip() {
        let mut regs = RegisterFile::new();
        regs.write(Reg::Mper, 199_984);
        regs.write_field(Reg::Pclkcon, Field::new(0, 2), 1);
        assert_eq!(regs.read(Reg::Mper), 199_984);
        assert_eq!(regs.peek_field(Reg::Pclkcon, Field::new(0, 2)), 1);
        assert!(!regs.is_set(Reg::T1Con, Field::bit(15)));
    }
}
