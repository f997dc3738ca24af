//! Whole-configuration checks, run before the first register write.
//!
//! Everything here is `const fn` so the board tables can also be checked at build time.

use crate::config::topology::Topology;
use crate::error::{ConfigurationError, Error, InvariantViolation};
use crate::hal::adc::{ChannelConfig, ChannelRole, TriggerOutput, TriggerSource};
use crate::hal::pwm::fields::{con, dt, evt1, iocon1, iocon2, COUNTER, LEB};
use crate::hal::pwm::{Compare, GeneratorConfig, GeneratorId, MasterTimebase};
use crate::hal::regs::Field;

macro_rules! check {
    ($e:expr) => {
        match $e {
            Ok(()) => {}
            Err(e) => return Err(e),
        }
    };
}

pub const fn timebase(tb: &MasterTimebase) -> Result<(), ConfigurationError> {
    if tb.period == 0 || !COUNTER.fits(tb.period) {
        return Err(ConfigurationError::MasterPeriodOutOfRange { period: tb.period });
    }
    Ok(())
}

const fn field(
    config: &GeneratorConfig,
    field: Field,
    name: &'static str,
    value: u32,
) -> Result<(), ConfigurationError> {
    if field.fits(value) {
        Ok(())
    } else {
        Err(ConfigurationError::FieldOverflow {
            generator: config.id,
            field: name,
            value,
        })
    }
}

const fn fields(g: &GeneratorConfig) -> Result<(), ConfigurationError> {
    check!(field(g, con::TRGCNT, "TRGCNT", g.trigger_count as u32));
    check!(field(g, con::UPDMOD, "UPDMOD", g.update_mode as u32));
    check!(field(g, con::SOCS, "SOCS", g.start_of_cycle.0 as u32));
    check!(field(g, iocon1::CAPSRC, "CAPSRC", g.output.capture_source as u32));
    check!(field(g, iocon2::OVRDAT, "OVRDAT", g.overrides.override_data as u32));
    check!(field(g, iocon2::OSYNC, "OSYNC", g.overrides.override_sync as u32));
    check!(field(g, iocon2::FLTDAT, "FLTDAT", g.overrides.fault_data as u32));
    check!(field(g, iocon2::CLDAT, "CLDAT", g.overrides.current_limit_data as u32));
    check!(field(g, iocon2::FFDAT, "FFDAT", g.overrides.feed_forward_data as u32));
    check!(field(g, iocon2::DBDAT, "DBDAT", g.overrides.debug_data as u32));
    check!(field(g, evt1::ADTR1PS, "ADTR1PS", g.events.adc_trigger1.postscaler as u32));
    check!(field(g, evt1::ADTR1OFS, "ADTR1OFS", g.events.adc_trigger1.offset as u32));
    check!(field(g, evt1::PWMPCI, "PWMPCI", g.events.pci_select as u32));
    check!(field(g, evt1::PGTRGSEL, "PGTRGSEL", g.events.trigger_output as u32));
    check!(field(g, LEB, "LEB", g.leading_edge_blanking));
    check!(field(g, dt::DTH, "DTH", g.dead_time.high));
    check!(field(g, dt::DTL, "DTL", g.dead_time.low));
    check!(field(g, COUNTER, "PHASE", g.phase));
    check!(field(g, COUNTER, "DC", g.duty));
    check!(field(g, COUNTER, "DCA", g.duty_adjust));
    check!(field(g, COUNTER, "PER", g.period));
    Ok(())
}

const fn trigger(g: &GeneratorConfig, compare: Compare, value: u32, period: u32) -> Result<(), ConfigurationError> {
    if value < period {
        Ok(())
    } else {
        Err(ConfigurationError::TriggerOutOfRange {
            generator: g.id,
            compare,
            value,
            period,
        })
    }
}

/// Timing and field checks of one generator against the master timebase it may follow.
pub const fn generator(
    g: &GeneratorConfig,
    tb: &MasterTimebase,
    topology: Topology,
) -> Result<(), ConfigurationError> {
    let id = g.id;

    let expected = topology.waveform_mode();
    if g.mode.bits() != expected.bits() {
        return Err(ConfigurationError::ModeMismatch {
            generator: id,
            expected,
            found: g.mode,
        });
    }

    if g.dead_time.high != g.dead_time.low {
        return Err(ConfigurationError::AsymmetricDeadTime {
            generator: id,
            high: g.dead_time.high,
            low: g.dead_time.low,
        });
    }

    check!(fields(g));

    let period = g.effective_period(tb);
    if period == 0 {
        return Err(ConfigurationError::ZeroPeriod { generator: id });
    }

    let dead_time = g.dead_time.high;
    if 2 * dead_time as u64 > period as u64 {
        return Err(ConfigurationError::DeadTimeTooLong {
            generator: id,
            dead_time,
            period,
        });
    }

    // at least one dead time of on-time and of off-time
    let duty = g.effective_duty(tb);
    let (min, max) = (dead_time, period - dead_time);
    if duty < min || duty > max {
        return Err(ConfigurationError::DutyOutOfRange {
            generator: id,
            duty,
            min,
            max,
        });
    }

    check!(trigger(g, Compare::A, g.trigger_a, period));
    check!(trigger(g, Compare::B, g.trigger_b, period));
    check!(trigger(g, Compare::C, g.trigger_c, period));

    Ok(())
}

/// Every generator checked, no duplicates, at most one interrupting trigger generator.
pub const fn generators(
    gens: &[GeneratorConfig],
    tb: &MasterTimebase,
    topology: Topology,
) -> Result<(), Error> {
    let mut interrupting = None;
    let mut i = 0;
    while i < gens.len() {
        let g = &gens[i];
        if let Err(e) = generator(g, tb, topology) {
            return Err(Error::Configuration(e));
        }

        let mut j = i + 1;
        while j < gens.len() {
            if gens[j].id.index() == g.id.index() {
                return Err(Error::Configuration(ConfigurationError::DuplicateGenerator {
                    generator: g.id,
                }));
            }
            j += 1;
        }

        if g.interrupts_with_adc_trigger() {
            match interrupting {
                None => interrupting = Some(g.id),
                Some(first) => {
                    return Err(Error::InvariantViolation(
                        InvariantViolation::MultipleInterruptGenerators {
                            first,
                            second: g.id,
                        },
                    ))
                }
            }
        }
        i += 1;
    }
    Ok(())
}

/// Whether the control loop reads a channel of this role in `topology`.
pub const fn role_sampled(role: ChannelRole, topology: Topology) -> bool {
    match role {
        ChannelRole::PhaseCurrentA | ChannelRole::PhaseCurrentB => {
            matches!(topology, Topology::DualShunt)
        }
        ChannelRole::BusCurrent1 | ChannelRole::BusCurrent2 => {
            matches!(topology, Topology::SingleShunt)
        }
        ChannelRole::Potentiometer | ChannelRole::BusVoltage => true,
    }
}

const fn same_trigger(a: TriggerSource, b: TriggerSource) -> bool {
    a.code() == b.code()
}

/// Role of the channel whose conversion raises the sampling interrupt.
pub const fn sampling_role(topology: Topology) -> ChannelRole {
    match topology {
        Topology::SingleShunt => ChannelRole::BusCurrent2,
        Topology::DualShunt => ChannelRole::Potentiometer,
    }
}

/// Exactly one channel raises the sampling interrupt, and it has the topology's sampling role.
const fn sampling_interrupt(channels: &[ChannelConfig], topology: Topology) -> Result<(), InvariantViolation> {
    let expected = sampling_role(topology);
    let mut found = false;
    let mut i = 0;
    while i < channels.len() {
        let ch = &channels[i];
        if ch.interrupt.is_some() {
            if found || ch.role as u8 != expected as u8 {
                return Err(InvariantViolation::MisplacedSamplingInterrupt {
                    channel: ch.channel,
                    expected,
                });
            }
            found = true;
        }
        i += 1;
    }
    if found {
        Ok(())
    } else {
        Err(InvariantViolation::MissingSamplingInterrupt { expected })
    }
}

/// Field widths, duplicates, required triggers, then the single sampling interrupt.
pub const fn channels(channels: &[ChannelConfig], topology: Topology) -> Result<(), Error> {
    let mut i = 0;
    while i < channels.len() {
        let ch = &channels[i];

        if !crate::hal::adc::fields::chcon::PINSEL.fits(ch.input as u32) {
            return Err(Error::Configuration(ConfigurationError::ChannelFieldOverflow {
                channel: ch.channel,
                field: "PINSEL",
                value: ch.input as u32,
            }));
        }
        if !crate::hal::adc::fields::chcon::SAMC.fits(ch.sample_time as u32) {
            return Err(Error::Configuration(ConfigurationError::ChannelFieldOverflow {
                channel: ch.channel,
                field: "SAMC",
                value: ch.sample_time as u32,
            }));
        }

        if role_sampled(ch.role, topology) && matches!(ch.trigger, TriggerSource::None) {
            return Err(Error::InvariantViolation(InvariantViolation::UntriggeredChannel {
                channel: ch.channel,
            }));
        }

        let mut j = i + 1;
        while j < channels.len() {
            let other = &channels[j];
            if other.channel.index() == ch.channel.index() {
                return Err(Error::Configuration(ConfigurationError::DuplicateChannel {
                    channel: ch.channel,
                }));
            }
            if ch.interrupt.is_some()
                && other.interrupt.is_some()
                && !matches!(ch.trigger, TriggerSource::None)
                && same_trigger(ch.trigger, other.trigger)
            {
                return Err(Error::InvariantViolation(
                    InvariantViolation::SharedSamplingInterrupt {
                        trigger: ch.trigger,
                        first: ch.channel,
                        second: other.channel,
                    },
                ));
            }
            j += 1;
        }
        i += 1;
    }
    if let Err(e) = sampling_interrupt(channels, topology) {
        return Err(Error::InvariantViolation(e));
    }
    Ok(())
}

/// Every trigger a channel waits on is produced by a configured generator.
pub const fn routing(gens: &[GeneratorConfig], channels: &[ChannelConfig]) -> Result<(), Error> {
    let mut i = 0;
    while i < channels.len() {
        let ch = &channels[i];
        if let Some((id, output)) = ch.trigger.generator() {
            let mut produced = false;
            let mut j = 0;
            while j < gens.len() {
                let g = &gens[j];
                if g.id.index() == id.index() {
                    produced = match output {
                        TriggerOutput::One => !g.events.adc_trigger1.sources.is_empty(),
                        TriggerOutput::Two => !g.events.adc_trigger2.is_empty(),
                    };
                }
                j += 1;
            }
            if !produced {
                return Err(Error::InvariantViolation(
                    InvariantViolation::TriggerNotGenerated {
                        channel: ch.channel,
                        trigger: ch.trigger,
                    },
                ));
            }
        }
        i += 1;
    }
    Ok(())
}

const fn count(order: &[GeneratorId], id: GeneratorId) -> usize {
    let mut n = 0;
    let mut i = 0;
    while i < order.len() {
        if order[i].index() == id.index() {
            n += 1;
        }
        i += 1;
    }
    n
}

/// Enable order switches on every configured generator exactly once, the ADC trigger generator last.
pub const fn enable_order(gens: &[GeneratorConfig], order: &[GeneratorId]) -> Result<(), InvariantViolation> {
    let mut trigger_configured = false;
    let mut i = 0;
    while i < gens.len() {
        let id = gens[i].id;
        let times = count(order, id);
        if times != 1 {
            return Err(InvariantViolation::EnableOrderMismatch { generator: id, times });
        }
        if id.index() == GeneratorId::ADC_TRIGGER.index() {
            trigger_configured = true;
        }
        i += 1;
    }

    let mut i = 0;
    while i < order.len() {
        let id = order[i];
        let mut configured = false;
        let mut j = 0;
        while j < gens.len() {
            if gens[j].id.index() == id.index() {
                configured = true;
            }
            j += 1;
        }
        if !configured {
            return Err(InvariantViolation::NotConfigured { generator: id });
        }
        i += 1;
    }

    if trigger_configured {
        let last = order[order.len() - 1];
        if last.index() != GeneratorId::ADC_TRIGGER.index() {
            return Err(InvariantViolation::TriggerGeneratorNotLast { last });
        }
    }
    Ok(())
}

/// Everything bring-up is about to write.
pub const fn all(
    tb: &MasterTimebase,
    gens: &[GeneratorConfig],
    order: &[GeneratorId],
    adc_channels: &[ChannelConfig],
    topology: Topology,
) -> Result<(), Error> {
    if let Err(e) = timebase(tb) {
        return Err(Error::Configuration(e));
    }
    check!(generators(gens, tb, topology));
    if let Err(e) = enable_order(gens, order) {
        return Err(Error::InvariantViolation(e));
    }
    check!(channels(adc_channels, topology));
    check!(routing(gens, adc_channels));
    Ok(())
}
