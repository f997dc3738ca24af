pub fn dump_to_log() {
    defmt::info!(
        "\n\
        Topology: {}\n\
        Clocks:\n\
        - PWM_CLOCK:    {} Hz\n\
        - TIMER1_CLOCK: {} Hz\n\
        PWM:\n\
        - SWITCHING_FREQ:     {} Hz\n\
        - DEAD_TIME:          {} ns\n\
        - LOOPTIME_TCY:       {}\n\
        - AUX_LOOPTIME_TCY:   {}\n\
        - DEADTIME:           {}\n\
        - MIN_DUTY:           {}\n\
        - MAX_DUTY:           {}\n\
        - ADC_SAMPLING_POINT: {}\n\
        ADC:\n\
        - SAMPLE_TIME:        {}\n\
        - READY_POLL_LIMIT:   {} (every {} us)\n\
        Timer1:\n\
        - PRESCALER:    1:{}\n\
        - PERIOD:       {} us\n\
        - PERIOD_COUNT: {}\n\
        ",
        topology::SHUNT,
        clk::PWM_CLOCK.to_Hz(),
        clk::TIMER1_CLOCK.to_Hz(),
        pwm::SWITCHING_FREQ.to_Hz(),
        pwm::DEAD_TIME.ticks(),
        pwm::LOOPTIME_TCY,
        pwm::AUX_LOOPTIME_TCY,
        pwm::DEADTIME,
        pwm::MIN_DUTY,
        pwm::MAX_DUTY,
        pwm::ADC_SAMPLING_POINT,
        adc::SAMPLE_TIME,
        adc::READY_POLL_LIMIT,
        adc::READY_POLL_INTERVAL_US,
        timer1::PRESCALER_RATIO,
        timer1::PERIOD.ticks(),
        timer1::PERIOD_COUNT,
    );
}

/// Clock configuration
///
/// The oscillator setup is done before bring-up starts; these are the rates it must leave behind.
///
///   FRC / PLL -> AFVCO -> / 2 -> PWM master clock (MCLKSEL = AFVCO/2)
///                      |
///                      -> Clock Gen -> Timer1 input clock
///                                   -> UART1 baud clock (Clock Gen 8)
pub mod clk {
    use crate::time::Hertz;

    /// AFVCO / 2
    pub const PWM_CLOCK: Hertz = Hertz::MHz(400);
    pub const PWM_CLOCK_HZ: u32 = PWM_CLOCK.to_Hz();

    pub const TIMER1_CLOCK: Hertz = Hertz::MHz(100);
    pub const TIMER1_CLOCK_HZ: u32 = TIMER1_CLOCK.to_Hz();
}

/// Current-sense topology
pub mod topology {
    use crate::hal::pwm::WaveformMode;
    use defmt::Format;

    #[derive(Copy, Clone, Debug, PartialEq, Eq, Format)]
    pub enum Topology {
        /// One shunt in the DC link, sampled twice per PWM cycle
        SingleShunt,
        /// Shunts in two phase legs, sampled simultaneously
        DualShunt,
    }

    impl Topology {
        /// Waveform mode every bridge and auxiliary generator runs in.
        pub const fn waveform_mode(self) -> WaveformMode {
            match self {
                Topology::SingleShunt => WaveformMode::DualEdgeCenterAligned,
                Topology::DualShunt => WaveformMode::CenterAligned,
            }
        }
    }

    /// Selected at build time with the `single-shunt` feature.
    pub const SHUNT: Topology = if cfg!(feature = "single-shunt") {
        Topology::SingleShunt
    } else {
        Topology::DualShunt
    };
}

/// PWM configuration
pub mod pwm {
    use crate::config;
    use crate::hal::pwm::{ClockDivider, MasterClock};
    use crate::time::{self, Hertz, Nanos};

    pub const MASTER_CLOCK: MasterClock = MasterClock::AfvcoDiv2;
    pub const DIVIDER: ClockDivider = ClockDivider::Div2;

    pub const SWITCHING_FREQ: Hertz = Hertz::kHz(16);
    pub const DEAD_TIME: Nanos = Nanos::from_ticks(1_000);

    /// Bridge generators count at 8x the PWM clock.
    pub const HIGH_RES_SCALE: u32 = 8;
    /// Auxiliary generators count at 2x the PWM clock.
    pub const AUX_SCALE: u32 = 2;
    /// Dead time counters run at 16x the PWM clock.
    pub const DEAD_TIME_SCALE: u32 = 16;

    pub const LOOPTIME_TCY: u32 =
        time::period_ticks(config::clk::PWM_CLOCK, SWITCHING_FREQ, HIGH_RES_SCALE);
    pub const AUX_LOOPTIME_TCY: u32 =
        time::period_ticks(config::clk::PWM_CLOCK, SWITCHING_FREQ, AUX_SCALE);

    pub const DEADTIME: u32 = time::dead_time_ticks(config::clk::PWM_CLOCK, DEAD_TIME, DEAD_TIME_SCALE);

    pub const MIN_DUTY: u32 = DEADTIME;
    pub const MAX_DUTY: u32 = LOOPTIME_TCY - DEADTIME;

    /// Start of the PWM cycle
    pub const ADC_SAMPLING_POINT: u32 = 0;

    const _: () = assert!(LOOPTIME_TCY > 2 * DEADTIME, "dead time must fit twice in a cycle");
    const _: () = assert!(AUX_LOOPTIME_TCY > 2 * DEADTIME, "dead time must fit twice in an aux cycle");
    const _: () = assert!(MIN_DUTY < MAX_DUTY);
    const _: () = assert!(DEADTIME <= 0xffff, "dead time register is 16 bits");
    const _: () = assert!(ADC_SAMPLING_POINT < LOOPTIME_TCY);
}

/// ADC configuration
pub mod adc {
    /// Sample time, in ADC clock cycles
    pub const SAMPLE_TIME: u8 = 3;

    /// How often a core's ready bit is polled after power-up before giving up
    pub const READY_POLL_LIMIT: u32 = 1_000;
    pub const READY_POLL_INTERVAL_US: u32 = 10;

    /// Highest CPU priority, for the control-loop sampling interrupt
    pub const INTERRUPT_PRIORITY: u8 = 7;

    const _: () = assert!(SAMPLE_TIME <= 0x1f);
    const _: () = assert!(READY_POLL_LIMIT > 0);
    const _: () = assert!(INTERRUPT_PRIORITY <= 7);
}

/// Timer1 configuration
pub mod timer1 {
    use crate::config;
    use crate::hal::tim::Prescaler;
    use fugit::MicrosDurationU32;

    pub const PRESCALER_RATIO: u32 = 8;
    pub const PRESCALER: Prescaler = match PRESCALER_RATIO {
        1 => Prescaler::Div1,
        8 => Prescaler::Div8,
        64 => Prescaler::Div64,
        256 => Prescaler::Div256,
        _ => panic!("Invalid Timer1 prescaler"),
    };
    const _: () = assert!(PRESCALER.ratio() == PRESCALER_RATIO);

    pub const TICK_HZ: u32 = config::clk::TIMER1_CLOCK_HZ / PRESCALER_RATIO;
    const _: () = assert!(
        TICK_HZ * PRESCALER_RATIO == config::clk::TIMER1_CLOCK_HZ,
        "prescaler should evenly divide the timer clock"
    );

    pub const PERIOD: MicrosDurationU32 = MicrosDurationU32::from_ticks(100);

    /// Value for PR1: the counter runs from 0 to PR1 inclusive
    #[allow(clippy::cast_possible_truncation)]
    pub const PERIOD_COUNT: u32 = {
        let ticks = config::clk::TIMER1_CLOCK_HZ as u64 * PERIOD.ticks() as u64
            / (PRESCALER_RATIO as u64 * 1_000_000);
        assert!(ticks > 0 && ticks <= u32::MAX as u64);
        ticks as u32 - 1
    };
}

/// UART1 configuration
pub mod uart {
    use crate::hal::uart::{BaudClock, TxWatermark};

    pub const BAUD_CLOCK: BaudClock = BaudClock::ClockGen8;
    pub const BRG: u32 = 0;
    pub const TX_WATERMARK: TxWatermark = TxWatermark::ONE_SLOT_LEFT;
}

/// Comparator configuration
pub mod cmp {
    /// Full scale until the control loop programs a trip level
    pub const REFERENCE: u16 = 0x0fff;

    const _: () = assert!(REFERENCE <= 0x0fff, "DAC is 12 bits");
}
