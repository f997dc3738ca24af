//! Interrupt priority, flag and enable control.

use crate::hal::adc::AdcChannel;
use crate::hal::regs::{Field, Reg, Registers};
use defmt::Format;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Format)]
pub enum Irq {
    Timer1,
    /// Conversion complete on a channel
    Adc(AdcChannel),
}

impl Irq {
    pub const COUNT: usize = 1 + AdcChannel::COUNT;

    pub const fn index(self) -> usize {
        match self {
            Irq::Timer1 => 0,
            Irq::Adc(ch) => 1 + ch.index(),
        }
    }
}

/// CPU priority level, 0 (never taken) to 7.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Format)]
pub struct Priority(u8);

impl Priority {
    pub const DISABLED: Self = Self(0);
    pub const HIGHEST: Self = Self(7);

    /// Only the low three bits are kept.
    pub const fn new(level: u8) -> Self {
        Self(level & 0x7)
    }

    pub const fn level(self) -> u8 {
        self.0
    }
}

const PRIORITY: Field = Field::new(0, 3);
const BIT: Field = Field::bit(0);

pub fn set_priority<R: Registers>(regs: &mut R, irq: Irq, priority: Priority) {
    regs.write_field(Reg::IntPriority(irq), PRIORITY, u32::from(priority.level()));
}

pub fn priority<R: Registers>(regs: &mut R, irq: Irq) -> Priority {
    #[allow(clippy::cast_possible_truncation)]
    let level = regs.read_field(Reg::IntPriority(irq), PRIORITY) as u8;
    Priority::new(level)
}

pub fn clear_flag<R: Registers>(regs: &mut R, irq: Irq) {
    regs.clear(Reg::IntFlag(irq), BIT);
}

pub fn is_pending<R: Registers>(regs: &mut R, irq: Irq) -> bool {
    regs.is_set(Reg::IntFlag(irq), BIT)
}

pub fn enable<R: Registers>(regs: &mut R, irq: Irq) {
    regs.set(Reg::IntEnable(irq), BIT);
}

pub fn disable<R: Registers>(regs: &mut R, irq: Irq) {
    regs.clear(Reg::IntEnable(irq), BIT);
}

pub fn is_enabled<R: Registers>(regs: &mut R, irq: Irq) -> bool {
    regs.is_set(Reg::IntEnable(irq), BIT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::regs::RegisterFile;

    #[test]
    fn priority_masks_to_three_bits() {
        assert_eq!(Priority::new(15), Priority::HIGHEST);
        assert_eq!(Priority::new(9).level(), 1);
    }

    #[test]
    fn flag_and_enable_are_independent() {
        let mut regs = RegisterFile::new();
        let irq = Irq::Adc(AdcChannel::AD3CH1);
        regs.write(Reg::IntFlag(irq), 1);
        enable(&mut regs, irq);
        clear_flag(&mut regs, irq);
        assert!(!is_pending(&mut regs, irq));
        assert!(is_enabled(&mut regs, irq));
        assert!(!is_enabled(&mut regs, Irq::Timer1));
    }
}
