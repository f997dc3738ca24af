//! Clock rates the oscillator setup hands over to bring-up.

use crate::config;
use crate::error::{Clock, ConfigurationError};
use crate::time::Hertz;
use defmt::Format;

/// Frozen clock configuration.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Format)]
pub struct Clocks {
    /// PWM master clock
    pub pwm: Hertz,
    /// Timer1 input clock
    pub timer1: Hertz,
}

impl Clocks {
    /// The rates every timing constant was derived for.
    pub const EXPECTED: Self = Self {
        pwm: config::clk::PWM_CLOCK,
        timer1: config::clk::TIMER1_CLOCK,
    };

    pub fn check(&self, expected: &Clocks) -> Result<(), ConfigurationError> {
        let check = |clock, found: Hertz, expected: Hertz| {
            if found == expected {
                Ok(())
            } else {
                Err(ConfigurationError::ClockMismatch {
                    clock,
                    expected: expected.to_Hz(),
                    found: found.to_Hz(),
                })
            }
        };
        check(Clock::Pwm, self.pwm, expected.pwm)?;
        check(Clock::Timer1, self.timer1, expected.timer1)
    }
}

/// Oscillator and PLL setup, supplied by the board.
pub trait ClockSource {
    /// Configure the oscillator and return the resulting rates.
    fn freeze(&mut self) -> Clocks;
}

/// Clock source that is already running at the expected rates.
pub struct Preconfigured(pub Clocks);

impl ClockSource for Preconfigured {
    fn freeze(&mut self) -> Clocks {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_clocks_pass() {
        assert_eq!(Clocks::EXPECTED.check(&Clocks::EXPECTED), Ok(()));
    }

    #[test]
    fn slow_pwm_clock_is_reported() {
        let clocks = Clocks {
            pwm: Hertz::MHz(200),
            ..Clocks::EXPECTED
        };
        assert_eq!(
            clocks.check(&Clocks::EXPECTED),
            Err(ConfigurationError::ClockMismatch {
                clock: Clock::Pwm,
                expected: 400_000_000,
                found: 200_000_000,
            })
        );
    }
}
