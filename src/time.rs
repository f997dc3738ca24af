use crate::config;

pub type Hertz = fugit::Rate<u32, 1, 1>;
pub type Nanos = fugit::NanosDurationU32;

/// Timer1 counts at its input clock divided by the prescaler.
pub type Timer1Duration = fugit::Duration<u32, 1, { config::timer1::TICK_HZ }>;

/// Counter ticks in one switching period, for a generator counting at `scale` times the PWM clock.
///
/// The counter needs 16 ticks to roll over, which are taken off the period.
#[allow(clippy::cast_possible_truncation)]
pub const fn period_ticks(clock: Hertz, switching: Hertz, scale: u32) -> u32 {
    let ticks = scale as u64 * clock.to_Hz() as u64 / switching.to_Hz() as u64;
    assert!(ticks > 16 && ticks - 16 <= u32::MAX as u64);
    (ticks - 16) as u32
}

/// Dead-time ticks for `dead_time`, with dead-time counters at `scale` times the PWM clock.
#[allow(clippy::cast_possible_truncation)]
pub const fn dead_time_ticks(clock: Hertz, dead_time: Nanos, scale: u32) -> u32 {
    let ticks = scale as u64 * dead_time.ticks() as u64 * clock.to_Hz() as u64 / 1_000_000_000;
    assert!(ticks <= u32::MAX as u64);
    ticks as u32
}

/// Inverse of [`period_ticks`], in whole hertz.
pub const fn switching_frequency(clock: Hertz, period: u32, scale: u32) -> Hertz {
    let ticks = period as u64 + 16;
    #[allow(clippy::cast_possible_truncation)]
    let hz = (scale as u64 * clock.to_Hz() as u64 / ticks) as u32;
    Hertz::from_raw(hz)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bridge_period_at_16khz() {
        assert_eq!(period_ticks(Hertz::MHz(400), Hertz::kHz(16), 8), 199_984);
    }

    #[test]
    fn aux_period_at_16khz() {
        assert_eq!(period_ticks(Hertz::MHz(400), Hertz::kHz(16), 2), 49_984);
    }

    #[test]
    fn one_microsecond_dead_time() {
        assert_eq!(
            dead_time_ticks(Hertz::MHz(400), Nanos::from_ticks(1_000), 16),
            6_400
        );
    }

    #[test]
    fn switching_frequency_inverts_period() {
        let period = period_ticks(Hertz::MHz(400), Hertz::kHz(20), 8);
        assert_eq!(switching_frequency(Hertz::MHz(400), period, 8), Hertz::kHz(20));
    }

    #[test]
    fn timer1_tick_rate() {
        let period = Timer1Duration::from_ticks(config::timer1::PERIOD_COUNT + 1);
        assert_eq!(period.to_micros(), 100);
    }
}
