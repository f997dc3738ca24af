//! Timer1, the application's periodic tick.

use crate::config;
use crate::hal::irq::{self, Irq, Priority};
use crate::hal::regs::{Field, Reg, Registers, Word};
use crate::time::Timer1Duration;
use defmt::Format;

const ON: Field = Field::bit(15);
const TCKPS: Field = Field::new(4, 2);
const TSYNC: Field = Field::bit(2);
const TCS: Field = Field::bit(1);

/// Input clock prescaler (TCKPS)
#[derive(Copy, Clone, Debug, PartialEq, Eq, Format)]
pub enum Prescaler {
    Div1 = 0,
    Div8 = 1,
    Div64 = 2,
    Div256 = 3,
}

impl Prescaler {
    pub const fn ratio(self) -> u32 {
        match self {
            Prescaler::Div1 => 1,
            Prescaler::Div8 => 8,
            Prescaler::Div64 => 64,
            Prescaler::Div256 => 256,
        }
    }
}

/// Borrow of the register bus, scoped to Timer1.
pub struct Timer1<'a, R: Registers> {
    regs: &'a mut R,
}

impl<'a, R: Registers> Timer1<'a, R> {
    pub fn new(regs: &'a mut R) -> Self {
        Self { regs }
    }

    /// Stopped, clocked from the peripheral clock, period from config, interrupt off.
    pub fn init(&mut self) {
        self.regs.write(Reg::T1Con, 0);
        self.stop();
        self.set_input_clock(config::timer1::PRESCALER);
        self.set_period(Timer1Duration::from_ticks(config::timer1::PERIOD_COUNT + 1));
        self.clear_counter();
        self.clear_interrupt();
        self.disable_interrupt();
    }

    pub fn set_input_clock(&mut self, prescaler: Prescaler) {
        self.regs.modify(Reg::T1Con, |w| {
            Word::new()
                .with(TCKPS, prescaler as u32)
                // internal clock, no external sync
                .with_flag(TSYNC, false)
                .with_flag(TCS, false)
                .bits()
                | (w & !(TCKPS.mask() | TSYNC.mask() | TCS.mask()))
        });
    }

    /// Counter rolls over every `period`.
    pub fn set_period(&mut self, period: Timer1Duration) {
        self.regs.write(Reg::Pr1, period.ticks().saturating_sub(1));
    }

    pub fn period(&mut self) -> Timer1Duration {
        Timer1Duration::from_ticks(self.regs.read(Reg::Pr1) + 1)
    }

    pub fn start(&mut self) {
        self.regs.set(Reg::T1Con, ON);
    }

    pub fn stop(&mut self) {
        self.regs.clear(Reg::T1Con, ON);
    }

    pub fn is_running(&mut self) -> bool {
        self.regs.is_set(Reg::T1Con, ON)
    }

    pub fn counter(&mut self) -> u32 {
        self.regs.read(Reg::Tmr1)
    }

    pub fn clear_counter(&mut self) {
        self.regs.write(Reg::Tmr1, 0);
    }

    pub fn set_interrupt_priority(&mut self, priority: Priority) {
        irq::set_priority(self.regs, Irq::Timer1, priority);
    }

    pub fn clear_interrupt(&mut self) {
        irq::clear_flag(self.regs, Irq::Timer1);
    }

    pub fn enable_interrupt(&mut self) {
        irq::enable(self.regs, Irq::Timer1);
    }

    pub fn disable_interrupt(&mut self) {
        irq::disable(self.regs, Irq::Timer1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::regs::RegisterFile;

    #[test]
    fn init_programs_100us_period() {
        let mut regs = RegisterFile::new();
        let mut tim = Timer1::new(&mut regs);
        tim.init();
        assert!(!tim.is_running());
        assert_eq!(tim.period().to_micros(), 100);
        assert_eq!(regs.peek(Reg::Pr1), 1249);
        assert_eq!(regs.peek_field(Reg::T1Con, TCKPS), 1);
    }

    #[test]
    fn prescaler_ratios() {
        assert_eq!(Prescaler::Div1.ratio(), 1);
        assert_eq!(Prescaler::Div256.ratio(), 256);
        assert_eq!(config::timer1::PRESCALER.ratio(), config::timer1::PRESCALER_RATIO);
    }

    #[test]
    fn start_stop() {
        let mut regs = RegisterFile::new();
        let mut tim = Timer1::new(&mut regs);
        tim.init();
        tim.start();
        assert!(tim.is_running());
        tim.stop();
        assert!(!tim.is_running());
    }

    #[test]
    fn prescaler_keeps_on_bit() {
        let mut regs = RegisterFile::new();
        let mut tim = Timer1::new(&mut regs);
        tim.start();
        tim.set_input_clock(Prescaler::Div256);
        assert!(tim.is_running());
        assert_eq!(regs.peek_field(Reg::T1Con, TCKPS), 3);
    }
}
