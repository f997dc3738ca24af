//! ADC cores, channel inputs and trigger routing.

use crate::config;
use crate::error::{Peripheral, PeripheralTimeout};
use crate::hal::irq::{self, Irq, Priority};
use crate::hal::pwm::GeneratorId;
use crate::hal::regs::{Reg, Registers, Word};
use crate::num::Truncate;
use core::convert::Infallible;
use defmt::Format;
use embedded_hal::blocking::delay::DelayUs;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Format)]
pub enum AdcCore {
    Ad1,
    Ad2,
    Ad3,
}

impl AdcCore {
    pub const COUNT: usize = 3;
    pub const ALL: [AdcCore; Self::COUNT] = [AdcCore::Ad1, AdcCore::Ad2, AdcCore::Ad3];

    pub const fn index(self) -> usize {
        self as usize
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Format)]
pub enum ChannelIndex {
    Ch0,
    Ch1,
    Ch2,
    Ch3,
}

impl ChannelIndex {
    pub const COUNT: usize = 4;
}

/// A conversion channel of one core.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Format)]
pub struct AdcChannel {
    pub core: AdcCore,
    pub index: ChannelIndex,
}

impl AdcChannel {
    pub const COUNT: usize = AdcCore::COUNT * ChannelIndex::COUNT;

    pub const AD1CH0: Self = Self::new(AdcCore::Ad1, ChannelIndex::Ch0);
    pub const AD2CH0: Self = Self::new(AdcCore::Ad2, ChannelIndex::Ch0);
    pub const AD2CH1: Self = Self::new(AdcCore::Ad2, ChannelIndex::Ch1);
    pub const AD3CH0: Self = Self::new(AdcCore::Ad3, ChannelIndex::Ch0);
    pub const AD3CH1: Self = Self::new(AdcCore::Ad3, ChannelIndex::Ch1);
    pub const AD3CH2: Self = Self::new(AdcCore::Ad3, ChannelIndex::Ch2);

    pub const fn new(core: AdcCore, index: ChannelIndex) -> Self {
        Self { core, index }
    }

    pub const fn index(self) -> usize {
        self.core.index() * ChannelIndex::COUNT + self.index as usize
    }
}

pub mod fields {
    pub mod con {
        use crate::hal::regs::Field;

        pub const ON: Field = Field::bit(15);
        pub const ADRDY: Field = Field::bit(13);
    }

    pub mod chcon {
        use crate::hal::regs::Field;

        pub const TRG1SRC: Field = Field::new(24, 5);
        pub const SAMC: Field = Field::new(16, 5);
        pub const FRAC: Field = Field::bit(7);
        pub const DIFF: Field = Field::bit(6);
        pub const PINSEL: Field = Field::new(0, 6);
    }
}

use fields::{chcon, con};

/// Conversion trigger of a channel (TRG1SRC), as routed on this device.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Format)]
#[repr(u8)]
pub enum TriggerSource {
    None = 0,
    Pg1AdcTrigger1 = 4,
    Pg1AdcTrigger2 = 5,
    Pg5AdcTrigger1 = 6,
    Pg5AdcTrigger2 = 7,
}

/// One of the two ADC trigger outputs of a generator.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Format)]
pub enum TriggerOutput {
    One,
    Two,
}

impl TriggerSource {
    pub const fn code(self) -> u32 {
        self as u32
    }

    pub const fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(TriggerSource::None),
            4 => Some(TriggerSource::Pg1AdcTrigger1),
            5 => Some(TriggerSource::Pg1AdcTrigger2),
            6 => Some(TriggerSource::Pg5AdcTrigger1),
            7 => Some(TriggerSource::Pg5AdcTrigger2),
            _ => None,
        }
    }

    /// Generator output that produces this trigger.
    pub const fn generator(self) -> Option<(GeneratorId, TriggerOutput)> {
        match self {
            TriggerSource::None => None,
            TriggerSource::Pg1AdcTrigger1 => Some((GeneratorId::Pg1, TriggerOutput::One)),
            TriggerSource::Pg1AdcTrigger2 => Some((GeneratorId::Pg1, TriggerOutput::Two)),
            TriggerSource::Pg5AdcTrigger1 => Some((GeneratorId::Pg5, TriggerOutput::One)),
            TriggerSource::Pg5AdcTrigger2 => Some((GeneratorId::Pg5, TriggerOutput::Two)),
        }
    }
}

/// What the control loop uses a channel for.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Format)]
pub enum ChannelRole {
    PhaseCurrentA,
    PhaseCurrentB,
    /// DC-link current, first sample of the cycle
    BusCurrent1,
    /// DC-link current, second sample of the cycle
    BusCurrent2,
    Potentiometer,
    BusVoltage,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Format)]
pub enum DataFormat {
    Integer,
    Fractional,
}

/// Input selection, trigger and interrupt of one channel.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Format)]
pub struct ChannelConfig {
    pub channel: AdcChannel,
    pub role: ChannelRole,
    /// Analog input pin (PINSEL)
    pub input: u8,
    /// Sample time, in ADC clock cycles
    pub sample_time: u8,
    pub format: DataFormat,
    pub differential: bool,
    pub trigger: TriggerSource,
    /// Raise the sampling interrupt when this channel's conversion completes
    pub interrupt: Option<Priority>,
}

impl ChannelConfig {
    pub const fn new(channel: AdcChannel, role: ChannelRole, input: u8) -> Self {
        Self {
            channel,
            role,
            input,
            sample_time: config::adc::SAMPLE_TIME,
            format: DataFormat::Integer,
            differential: false,
            trigger: TriggerSource::None,
            interrupt: None,
        }
    }

    pub const fn trigger(mut self, trigger: TriggerSource) -> Self {
        self.trigger = trigger;
        self
    }

    pub const fn interrupt(mut self, priority: Priority) -> Self {
        self.interrupt = Some(priority);
        self
    }

    const fn input_word(&self) -> u32 {
        Word::new()
            .with(chcon::SAMC, self.sample_time as u32)
            .with_flag(chcon::FRAC, matches!(self.format, DataFormat::Fractional))
            .with_flag(chcon::DIFF, self.differential)
            .with(chcon::PINSEL, self.input as u32)
            .bits()
    }

    /// Decode a channel's registers; `role` is not stored in hardware.
    pub fn read_back<R: Registers>(regs: &mut R, channel: AdcChannel, role: ChannelRole) -> Option<Self> {
        let w = regs.read(Reg::AdChCon(channel));
        let priority = irq::priority(regs, Irq::Adc(channel));
        Some(Self {
            channel,
            role,
            input: chcon::PINSEL.extract(w).truncate(),
            sample_time: chcon::SAMC.extract(w).truncate(),
            format: if chcon::FRAC.extract(w) != 0 {
                DataFormat::Fractional
            } else {
                DataFormat::Integer
            },
            differential: chcon::DIFF.extract(w) != 0,
            trigger: TriggerSource::from_code(chcon::TRG1SRC.extract(w))?,
            interrupt: (priority != Priority::DISABLED).then_some(priority),
        })
    }
}

/// Proof that every ADC core reported ready.
///
/// Only [`init`] hands these out; generators that trigger conversions cannot be enabled without one.
#[derive(Debug)]
pub struct AdcReady {
    _private: (),
}

/// Input selection of every channel; trigger left untouched.
pub fn configure_inputs<R: Registers>(regs: &mut R, channels: &[ChannelConfig]) {
    for ch in channels {
        let reg = Reg::AdChCon(ch.channel);
        let trigger = regs.read_field(reg, chcon::TRG1SRC);
        regs.write(reg, chcon::TRG1SRC.insert(ch.input_word(), trigger));
    }
}

/// One look at the core's ready bit.
pub fn poll_ready<R: Registers>(regs: &mut R, core: AdcCore) -> nb::Result<(), Infallible> {
    if regs.is_set(Reg::AdCon(core), con::ADRDY) {
        Ok(())
    } else {
        Err(nb::Error::WouldBlock)
    }
}

/// Turn a core on and wait for it to report ready, up to `poll_limit` polls.
pub fn power_up<R, D>(
    regs: &mut R,
    delay: &mut D,
    core: AdcCore,
    poll_limit: u32,
) -> Result<(), PeripheralTimeout>
where
    R: Registers,
    D: DelayUs<u32>,
{
    regs.set(Reg::AdCon(core), con::ON);

    for polls in 1..=poll_limit {
        match poll_ready(regs, core) {
            Ok(()) => {
                defmt::trace!("{} ready after {} polls", core, polls);
                return Ok(());
            }
            Err(nb::Error::WouldBlock) => delay.delay_us(config::adc::READY_POLL_INTERVAL_US),
            Err(nb::Error::Other(e)) => match e {},
        }
    }

    defmt::error!("{} not ready after {} polls", core, poll_limit);
    Err(PeripheralTimeout {
        peripheral: Peripheral::Adc(core),
        polls: poll_limit,
    })
}

/// Sampling interrupt: priority set, flag cleared, left disabled for the application to enable.
pub fn configure_interrupts<R: Registers>(regs: &mut R, channels: &[ChannelConfig]) {
    for ch in channels {
        if let Some(priority) = ch.interrupt {
            let irq = Irq::Adc(ch.channel);
            irq::set_priority(regs, irq, priority);
            irq::clear_flag(regs, irq);
            irq::disable(regs, irq);
        }
    }
}

pub fn route_triggers<R: Registers>(regs: &mut R, channels: &[ChannelConfig]) {
    for ch in channels {
        regs.write_field(Reg::AdChCon(ch.channel), chcon::TRG1SRC, ch.trigger.code());
    }
}

/// Full ADC bring-up: inputs, cores on (each gated on ready), interrupts, then triggers.
pub fn init<R, D>(regs: &mut R, delay: &mut D, channels: &[ChannelConfig]) -> Result<AdcReady, PeripheralTimeout>
where
    R: Registers,
    D: DelayUs<u32>,
{
    configure_inputs(regs, channels);

    for core in AdcCore::ALL {
        power_up(regs, delay, core, config::adc::READY_POLL_LIMIT)?;
    }

    configure_interrupts(regs, channels);
    route_triggers(regs, channels);

    Ok(AdcReady { _private: () })
}

pub fn is_ready<R: Registers>(regs: &mut R, core: AdcCore) -> bool {
    poll_ready(regs, core).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::regs::RegisterFile;

    struct NoDelay;

    impl DelayUs<u32> for NoDelay {
        fn delay_us(&mut self, _us: u32) {}
    }

    #[test]
    fn channel_indices_are_dense() {
        assert_eq!(AdcChannel::AD1CH0.index(), 0);
        assert_eq!(AdcChannel::AD3CH2.index(), 10);
        assert_eq!(
            AdcChannel::new(AdcCore::Ad3, ChannelIndex::Ch3).index(),
            AdcChannel::COUNT - 1
        );
    }

    #[test]
    fn trigger_codes_round_trip() {
        for src in [
            TriggerSource::None,
            TriggerSource::Pg1AdcTrigger1,
            TriggerSource::Pg1AdcTrigger2,
            TriggerSource::Pg5AdcTrigger1,
            TriggerSource::Pg5AdcTrigger2,
        ] {
            assert_eq!(TriggerSource::from_code(src.code()), Some(src));
        }
        assert_eq!(TriggerSource::from_code(1), None);
    }

    #[test]
    fn inputs_keep_existing_trigger() {
        let mut regs = RegisterFile::new();
        let ch = ChannelConfig::new(AdcChannel::AD2CH1, ChannelRole::Potentiometer, 5)
            .trigger(TriggerSource::Pg1AdcTrigger1);
        route_triggers(&mut regs, &[ch]);
        configure_inputs(&mut regs, &[ch]);
        let w = regs.peek(Reg::AdChCon(AdcChannel::AD2CH1));
        assert_eq!(chcon::PINSEL.extract(w), 5);
        assert_eq!(chcon::SAMC.extract(w), 3);
        assert_eq!(chcon::TRG1SRC.extract(w), 4);
    }

    #[test]
    fn power_up_gives_up_when_never_ready() {
        let mut regs = RegisterFile::new();
        let err = power_up(&mut regs, &mut NoDelay, AdcCore::Ad2, 5).unwrap_err();
        assert_eq!(
            err,
            PeripheralTimeout {
                peripheral: Peripheral::Adc(AdcCore::Ad2),
                polls: 5
            }
        );
        assert!(regs.is_set(Reg::AdCon(AdcCore::Ad2), con::ON));
    }

    #[test]
    fn power_up_returns_once_ready() {
        let mut regs = RegisterFile::new();
        regs.set(Reg::AdCon(AdcCore::Ad1), con::ADRDY);
        assert_eq!(power_up(&mut regs, &mut NoDelay, AdcCore::Ad1, 1), Ok(()));
    }
}
