//! Inverter board tables: what each PWM generator drives, what each ADC channel samples.
//!
//! Both topologies are built here and checked at compile time; the build picks one
//! through [`config::topology::SHUNT`].

use crate::config;
use crate::config::topology::Topology;
use crate::hal::adc::{AdcChannel, ChannelConfig, ChannelRole, TriggerSource};
use crate::hal::gpio::{OutputFunction, Pin, Port, RemappablePin};
use crate::hal::irq::Priority;
use crate::hal::pwm::{
    ClockSelect, DeadTime, EventInterrupts, GeneratorConfig, GeneratorId, InterruptEvent,
    MasterTimebase, Source, StartOfCycle, TriggerCompares, TriggerMode, UpdateTrigger,
};
use crate::validate;

use config::pwm::{ADC_SAMPLING_POINT, AUX_LOOPTIME_TCY, DEADTIME, LOOPTIME_TCY, MIN_DUTY};

pub const TIMEBASE: MasterTimebase = MasterTimebase::for_switching_frequency(
    config::pwm::MASTER_CLOCK,
    config::pwm::DIVIDER,
    config::clk::PWM_CLOCK,
    config::pwm::SWITCHING_FREQ,
);
const _: () = assert!(TIMEBASE.period == LOOPTIME_TCY);

/// Order generators are written in.
pub const CONFIGURE_ORDER: [GeneratorId; GeneratorId::COUNT] = [
    GeneratorId::Pg5,
    GeneratorId::Apg1,
    GeneratorId::Apg2,
    GeneratorId::Apg3,
    GeneratorId::Pg1,
    GeneratorId::Pg2,
    GeneratorId::Pg3,
    GeneratorId::Pg6,
    GeneratorId::Pg7,
    GeneratorId::Pg8,
];

/// Order generators are turned on in; the ADC trigger generator goes last.
pub const ENABLE_ORDER: [GeneratorId; GeneratorId::COUNT] = [
    GeneratorId::Pg2,
    GeneratorId::Pg3,
    GeneratorId::Pg1,
    GeneratorId::Pg7,
    GeneratorId::Pg8,
    GeneratorId::Pg6,
    GeneratorId::Apg1,
    GeneratorId::Apg2,
    GeneratorId::Apg3,
    GeneratorId::Pg5,
];

/// Second sync PCI word of the PCI-synchronised generators
const SYNC2: u32 = 0x0080_0000;

/// Settings every generator shares.
const fn common(id: GeneratorId, topology: Topology) -> GeneratorConfig {
    GeneratorConfig::new(id)
        .clock(ClockSelect::Master)
        .mode(topology.waveform_mode())
        .complementary(true, true)
        .adc_trigger1(TriggerCompares::TRIGA)
        .update_trigger(UpdateTrigger::DutyWrite)
        .interrupts(EventInterrupts::FAULT)
        .interrupt_event(InterruptEvent::Disabled)
        .dead_time(DeadTime::symmetric(DEADTIME))
        .triggers(ADC_SAMPLING_POINT, 0, 0)
}

/// Bridge leg: master period, restarted on the sync PCI.
const fn bridge(id: GeneratorId, soc: StartOfCycle, topology: Topology) -> GeneratorConfig {
    common(id, topology)
        .period_source(Source::Master)
        .trigger_mode(TriggerMode::Retriggerable)
        .start_of_cycle(soc)
        .pci_select(4)
        .sync_pci(false, SYNC2)
        .timing(MIN_DUTY, LOOPTIME_TCY >> 1, 0)
}

pub const fn generator(id: GeneratorId, topology: Topology) -> GeneratorConfig {
    match id {
        // ADC trigger generator; high side only
        GeneratorId::Pg5 => {
            let pg5 = common(id, topology)
                .complementary(true, false)
                .timing(MIN_DUTY, LOOPTIME_TCY / 3, LOOPTIME_TCY);
            match topology {
                // second bus-current sample from TRIGB
                Topology::SingleShunt => pg5.adc_trigger2(TriggerCompares::TRIGB),
                Topology::DualShunt => pg5,
            }
        }
        GeneratorId::Pg1 | GeneratorId::Pg2 => bridge(id, StartOfCycle::PCI_SYNC, topology),
        GeneratorId::Pg3 => bridge(id, StartOfCycle(3), topology),
        GeneratorId::Pg6 => common(id, topology)
            .period_source(Source::Master)
            .trigger_mode(TriggerMode::Retriggerable)
            .start_of_cycle(StartOfCycle(5))
            .timing(0, LOOPTIME_TCY >> 1, LOOPTIME_TCY),
        GeneratorId::Pg7 | GeneratorId::Pg8 => common(id, topology)
            .start_of_cycle(StartOfCycle(5))
            .timing(MIN_DUTY, LOOPTIME_TCY >> 1, LOOPTIME_TCY),
        GeneratorId::Apg1 | GeneratorId::Apg2 | GeneratorId::Apg3 => common(id, topology)
            .trigger_mode(TriggerMode::Retriggerable)
            .start_of_cycle(StartOfCycle::PCI_SYNC)
            .pci_select(3)
            .sync_pci(true, SYNC2)
            .timing(MIN_DUTY, AUX_LOOPTIME_TCY >> 1, AUX_LOOPTIME_TCY),
    }
}

/// Every generator, in [`CONFIGURE_ORDER`].
pub const fn generators(topology: Topology) -> [GeneratorConfig; GeneratorId::COUNT] {
    let mut out = [GeneratorConfig::new(GeneratorId::Pg1); GeneratorId::COUNT];
    let mut i = 0;
    while i < GeneratorId::COUNT {
        out[i] = generator(CONFIGURE_ORDER[i], topology);
        i += 1;
    }
    out
}

pub const CHANNEL_COUNT: usize = 6;

const SAMPLING_IRQ: Priority = Priority::new(config::adc::INTERRUPT_PRIORITY);

/// ADC channels, in the order their inputs are configured.
pub const fn channels(topology: Topology) -> [ChannelConfig; CHANNEL_COUNT] {
    let ia = ChannelConfig::new(AdcChannel::AD1CH0, ChannelRole::PhaseCurrentA, 0);
    let ib = ChannelConfig::new(AdcChannel::AD2CH0, ChannelRole::PhaseCurrentB, 0);
    let ibus1 = ChannelConfig::new(AdcChannel::AD3CH0, ChannelRole::BusCurrent1, 0);
    let ibus2 = ChannelConfig::new(AdcChannel::AD3CH1, ChannelRole::BusCurrent2, 0);
    let pot = ChannelConfig::new(AdcChannel::AD2CH1, ChannelRole::Potentiometer, 5)
        .trigger(TriggerSource::Pg1AdcTrigger1);
    let vbus = ChannelConfig::new(AdcChannel::AD3CH2, ChannelRole::BusVoltage, 4)
        .trigger(TriggerSource::Pg1AdcTrigger1);

    match topology {
        Topology::SingleShunt => [
            ia,
            ib,
            ibus1.trigger(TriggerSource::Pg5AdcTrigger1),
            ibus2
                .trigger(TriggerSource::Pg5AdcTrigger2)
                .interrupt(SAMPLING_IRQ),
            pot,
            vbus,
        ],
        Topology::DualShunt => [
            ia.trigger(TriggerSource::Pg1AdcTrigger1),
            ib.trigger(TriggerSource::Pg1AdcTrigger1),
            ibus1,
            ibus2,
            pot.interrupt(SAMPLING_IRQ),
            vbus,
        ],
    }
}

/// Bridge and auxiliary PWM outputs.
pub const OUTPUT_PINS: [Pin; 19] = [
    Pin::new(Port::D, 3),
    Pin::new(Port::D, 2),
    Pin::new(Port::D, 1),
    Pin::new(Port::D, 0),
    Pin::new(Port::C, 4),
    Pin::new(Port::C, 3),
    Pin::new(Port::D, 10),
    Pin::new(Port::D, 9),
    Pin::new(Port::C, 11),
    Pin::new(Port::C, 10),
    Pin::new(Port::C, 13),
    Pin::new(Port::C, 12),
    Pin::new(Port::C, 8),
    Pin::new(Port::D, 11),
    Pin::new(Port::D, 15),
    Pin::new(Port::D, 14),
    Pin::new(Port::C, 15),
    Pin::new(Port::C, 14),
    Pin::new(Port::D, 5),
];

/// PWM event B brought out on RP55, for scoping the ADC trigger.
pub const REMAPS: [(RemappablePin, OutputFunction); 1] =
    [(RemappablePin::RP55, OutputFunction::PWM_EVENT_B)];

/// Everything bring-up writes, for one topology.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BoardConfig {
    pub topology: Topology,
    pub timebase: MasterTimebase,
    /// In configuration order
    pub generators: [GeneratorConfig; GeneratorId::COUNT],
    pub enable_order: [GeneratorId; GeneratorId::COUNT],
    pub channels: [ChannelConfig; CHANNEL_COUNT],
    pub outputs: &'static [Pin],
    pub remaps: &'static [(RemappablePin, OutputFunction)],
}

impl BoardConfig {
    pub const fn new(topology: Topology) -> Self {
        Self {
            topology,
            timebase: TIMEBASE,
            generators: generators(topology),
            enable_order: ENABLE_ORDER,
            channels: channels(topology),
            outputs: &OUTPUT_PINS,
            remaps: &REMAPS,
        }
    }

    pub fn generator(&self, id: GeneratorId) -> Option<&GeneratorConfig> {
        self.generators.iter().find(|g| g.id == id)
    }

    pub fn generator_mut(&mut self, id: GeneratorId) -> Option<&mut GeneratorConfig> {
        self.generators.iter_mut().find(|g| g.id == id)
    }

    pub fn channel(&self, channel: AdcChannel) -> Option<&ChannelConfig> {
        self.channels.iter().find(|c| c.channel == channel)
    }

    pub fn channel_mut(&mut self, channel: AdcChannel) -> Option<&mut ChannelConfig> {
        self.channels.iter_mut().find(|c| c.channel == channel)
    }

    pub const fn validate(&self) -> Result<(), crate::Error> {
        validate::all(
            &self.timebase,
            &self.generators,
            &self.enable_order,
            &self.channels,
            self.topology,
        )
    }
}

/// The board as built.
pub const BOARD: BoardConfig = BoardConfig::new(config::topology::SHUNT);

const _: () = assert!(
    BoardConfig::new(Topology::SingleShunt).validate().is_ok(),
    "single-shunt tables are inconsistent"
);
const _: () = assert!(
    BoardConfig::new(Topology::DualShunt).validate().is_ok(),
    "dual-shunt tables are inconsistent"
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InvariantViolation;

    #[test]
    fn every_generator_configured_and_enabled_once() {
        for id in GeneratorId::ALL {
            assert_eq!(CONFIGURE_ORDER.iter().filter(|g| **g == id).count(), 1);
            assert_eq!(ENABLE_ORDER.iter().filter(|g| **g == id).count(), 1);
        }
    }

    #[test]
    fn trigger_generator_enabled_last() {
        assert_eq!(ENABLE_ORDER.last(), Some(&GeneratorId::ADC_TRIGGER));
    }

    #[test]
    fn trigger_generator_enabled_early_rejected() {
        let mut board = BoardConfig::new(Topology::SingleShunt);
        board.enable_order.swap(0, GeneratorId::COUNT - 1);
        assert_eq!(
            board.validate(),
            Err(crate::Error::InvariantViolation(
                InvariantViolation::TriggerGeneratorNotLast {
                    last: GeneratorId::Pg2,
                }
            ))
        );
    }

    #[test]
    fn bridge_legs_follow_master_period() {
        let board = BoardConfig::new(Topology::DualShunt);
        for id in [GeneratorId::Pg1, GeneratorId::Pg2, GeneratorId::Pg3, GeneratorId::Pg6] {
            let g = board.generator(id).unwrap();
            assert_eq!(g.period_source, Source::Master);
            assert_eq!(g.effective_period(&board.timebase), LOOPTIME_TCY);
        }
    }

    #[test]
    fn aux_generators_run_their_own_period() {
        let board = BoardConfig::new(Topology::SingleShunt);
        let apg = board.generator(GeneratorId::Apg2).unwrap();
        assert_eq!(apg.period_source, Source::Own);
        assert_eq!(apg.period, AUX_LOOPTIME_TCY);
        assert_eq!(apg.duty, AUX_LOOPTIME_TCY / 2);
    }

    #[test]
    fn pg5_drives_high_side_only() {
        let pg5 = generator(GeneratorId::Pg5, Topology::DualShunt);
        assert!(pg5.output.high.enabled);
        assert!(!pg5.output.low.enabled);
    }

    #[test]
    fn one_sampling_interrupt_per_topology() {
        for (topology, expected) in [
            (Topology::SingleShunt, AdcChannel::AD3CH1),
            (Topology::DualShunt, AdcChannel::AD2CH1),
        ] {
            let with_irq: heapless::Vec<AdcChannel, CHANNEL_COUNT> = channels(topology)
                .iter()
                .filter(|c| c.interrupt.is_some())
                .map(|c| c.channel)
                .collect();
            assert_eq!(with_irq.as_slice(), &[expected]);
            let role = channels(topology)
                .iter()
                .find(|c| c.channel == expected)
                .map(|c| c.role);
            assert_eq!(role, Some(validate::sampling_role(topology)));
        }
    }

    #[test]
    fn dual_shunt_without_sampling_interrupt_rejected() {
        let mut board = BoardConfig::new(Topology::DualShunt);
        board.channel_mut(AdcChannel::AD2CH1).unwrap().interrupt = None;
        assert_eq!(
            board.validate(),
            Err(crate::Error::InvariantViolation(
                InvariantViolation::MissingSamplingInterrupt {
                    expected: ChannelRole::Potentiometer,
                }
            ))
        );
    }

    #[test]
    fn board_as_built_is_valid() {
        assert_eq!(BOARD.validate(), Ok(()));
    }
}
