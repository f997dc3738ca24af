//! Bring-up failures.
//!
//! Configuration errors are found before the first register write; timeouts and
//! invariant violations can happen part-way through, after which the outputs are
//! forced into the safe state.

use crate::hal::adc::{AdcChannel, AdcCore, ChannelRole, TriggerSource};
use crate::hal::pwm::{Compare, GeneratorId, WaveformMode};
use defmt::Format;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Format)]
pub enum Error {
    Configuration(ConfigurationError),
    PeripheralTimeout(PeripheralTimeout),
    InvariantViolation(InvariantViolation),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Format)]
pub enum ConfigurationError {
    /// Rising-edge and falling-edge dead times differ
    AsymmetricDeadTime {
        generator: GeneratorId,
        high: u32,
        low: u32,
    },
    /// Dead time on both edges does not fit in one period
    DeadTimeTooLong {
        generator: GeneratorId,
        dead_time: u32,
        period: u32,
    },
    /// Duty leaves less than one dead time of on-time or off-time
    DutyOutOfRange {
        generator: GeneratorId,
        duty: u32,
        min: u32,
        max: u32,
    },
    ZeroPeriod {
        generator: GeneratorId,
    },
    MasterPeriodOutOfRange {
        period: u32,
    },
    /// Trigger compare value never reached within the period
    TriggerOutOfRange {
        generator: GeneratorId,
        compare: Compare,
        value: u32,
        period: u32,
    },
    /// Value does not fit in its register field
    FieldOverflow {
        generator: GeneratorId,
        field: &'static str,
        value: u32,
    },
    /// Generator runs in a waveform mode other than the topology's
    ModeMismatch {
        generator: GeneratorId,
        expected: WaveformMode,
        found: WaveformMode,
    },
    DuplicateGenerator {
        generator: GeneratorId,
    },
    DuplicateChannel {
        channel: AdcChannel,
    },
    ChannelFieldOverflow {
        channel: AdcChannel,
        field: &'static str,
        value: u32,
    },
    /// Comparator DAC reference beyond 12 bits
    ReferenceOutOfRange {
        value: u16,
    },
    ClockMismatch {
        clock: Clock,
        expected: u32,
        found: u32,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Format)]
pub enum Clock {
    Pwm,
    Timer1,
}

/// A peripheral never reported ready.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Format)]
pub struct PeripheralTimeout {
    pub peripheral: Peripheral,
    /// Status reads made before giving up
    pub polls: u32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Format)]
pub enum Peripheral {
    Adc(AdcCore),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Format)]
pub enum InvariantViolation {
    /// More than one generator raises a CPU interrupt from its ADC trigger cycle
    MultipleInterruptGenerators {
        first: GeneratorId,
        second: GeneratorId,
    },
    /// Two channels converted on the same trigger both raise the sampling interrupt
    SharedSamplingInterrupt {
        trigger: TriggerSource,
        first: AdcChannel,
        second: AdcChannel,
    },
    /// Channel waits on a trigger that no configured generator produces
    TriggerNotGenerated {
        channel: AdcChannel,
        trigger: TriggerSource,
    },
    /// Channel the control loop reads has no trigger
    UntriggeredChannel {
        channel: AdcChannel,
    },
    /// Sampling interrupt on a channel other than the one the topology samples with
    MisplacedSamplingInterrupt {
        channel: AdcChannel,
        expected: ChannelRole,
    },
    /// No channel raises the sampling interrupt
    MissingSamplingInterrupt {
        expected: ChannelRole,
    },
    /// Configured generator appears in the enable order other than once
    EnableOrderMismatch {
        generator: GeneratorId,
        times: usize,
    },
    /// ADC trigger generator is switched on before other generators
    TriggerGeneratorNotLast {
        last: GeneratorId,
    },
    /// Enable requested for a generator that was never configured
    NotConfigured {
        generator: GeneratorId,
    },
}

impl From<ConfigurationError> for Error {
    fn from(e: ConfigurationError) -> Self {
        Error::Configuration(e)
    }
}

impl From<PeripheralTimeout> for Error {
    fn from(e: PeripheralTimeout) -> Self {
        Error::PeripheralTimeout(e)
    }
}

impl From<InvariantViolation> for Error {
    fn from(e: InvariantViolation) -> Self {
        Error::InvariantViolation(e)
    }
}
