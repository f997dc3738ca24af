//! PWM generators and the master timebase they share.
//!
//! Configuration is data: a [`MasterTimebase`] plus one [`GeneratorConfig`] per generator,
//! written by the same routine for every generator. Output enable is a separate step that
//! needs proof that configuration happened ([`Configured`]) and that the ADC is running
//! ([`AdcReady`]).

use crate::error::InvariantViolation;
use crate::hal::adc::AdcReady;
use crate::hal::regs::{Reg, Registers, Word};
use crate::time::{self, Hertz};
use bitflags::bitflags;
use defmt::Format;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Format)]
pub enum GeneratorId {
    Pg1,
    Pg2,
    Pg3,
    Pg5,
    Pg6,
    Pg7,
    Pg8,
    Apg1,
    Apg2,
    Apg3,
}

impl GeneratorId {
    pub const COUNT: usize = 10;

    pub const ALL: [GeneratorId; Self::COUNT] = [
        GeneratorId::Pg1,
        GeneratorId::Pg2,
        GeneratorId::Pg3,
        GeneratorId::Pg5,
        GeneratorId::Pg6,
        GeneratorId::Pg7,
        GeneratorId::Pg8,
        GeneratorId::Apg1,
        GeneratorId::Apg2,
        GeneratorId::Apg3,
    ];

    /// Paces ADC sampling; enabled after every other generator.
    pub const ADC_TRIGGER: GeneratorId = GeneratorId::Pg5;

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Auxiliary generators count at a lower resolution than the main ones.
    pub const fn is_auxiliary(self) -> bool {
        matches!(
            self,
            GeneratorId::Apg1 | GeneratorId::Apg2 | GeneratorId::Apg3
        )
    }

    const fn bit(self) -> u16 {
        1 << self as u16
    }
}

/// Combinational logic / event output block letter.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Format)]
pub enum Block {
    A,
    B,
    C,
    D,
    E,
    F,
}

impl Block {
    pub const COUNT: usize = 6;
    pub const ALL: [Block; Self::COUNT] = [Block::A, Block::B, Block::C, Block::D, Block::E, Block::F];

    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Registers each generator has.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Format)]
pub enum PgReg {
    Con,
    Stat,
    Iocon1,
    Iocon2,
    Evt1,
    Evt2,
    Clpci1,
    Ffpci1,
    Spci1,
    Spci2,
    Leb,
    Phase,
    Dc,
    Dca,
    Per,
    Dt,
    Triga,
    Trigb,
    Trigc,
}

impl PgReg {
    pub const COUNT: usize = 19;

    pub const fn index(self) -> usize {
        self as usize
    }
}

pub mod fields {
    use crate::hal::regs::Field;

    /// Period, duty, phase and trigger compare registers
    pub const COUNTER: Field = Field::new(0, 20);

    pub mod pclkcon {
        use super::Field;

        pub const LOCK: Field = Field::bit(8);
        pub const DIVSEL: Field = Field::new(4, 2);
        pub const MCLKSEL: Field = Field::new(0, 2);
    }

    pub mod con {
        use super::Field;

        pub const MDCSEL: Field = Field::bit(31);
        pub const MPERSEL: Field = Field::bit(30);
        pub const MPHSEL: Field = Field::bit(29);
        pub const MSTEN: Field = Field::bit(27);
        pub const UPDMOD: Field = Field::new(24, 3);
        pub const TRGMOD: Field = Field::bit(22);
        pub const SOCS: Field = Field::new(16, 4);
        pub const ON: Field = Field::bit(15);
        pub const TRGCNT: Field = Field::new(8, 3);
        pub const CLKSEL: Field = Field::new(3, 2);
        pub const MODSEL: Field = Field::new(0, 3);
    }

    pub mod iocon1 {
        use super::Field;

        pub const SWAP: Field = Field::bit(16);
        pub const CAPSRC: Field = Field::new(12, 3);
        pub const DTCMPSEL: Field = Field::bit(8);
        pub const PMOD: Field = Field::new(4, 2);
        pub const PENH: Field = Field::bit(3);
        pub const PENL: Field = Field::bit(2);
        pub const POLH: Field = Field::bit(1);
        pub const POLL: Field = Field::bit(0);
    }

    pub mod iocon2 {
        use super::Field;

        pub const CLMOD: Field = Field::bit(15);
        pub const OVRENH: Field = Field::bit(13);
        pub const OVRENL: Field = Field::bit(12);
        pub const OVRDAT: Field = Field::new(10, 2);
        pub const OSYNC: Field = Field::new(8, 2);
        pub const FLTDAT: Field = Field::new(6, 2);
        pub const CLDAT: Field = Field::new(4, 2);
        pub const FFDAT: Field = Field::new(2, 2);
        pub const DBDAT: Field = Field::new(0, 2);
    }

    pub mod evt1 {
        use super::Field;

        pub const ADTR1PS: Field = Field::new(27, 5);
        /// ADTR1EN3:ADTR1EN1
        pub const ADTR1EN: Field = Field::new(24, 3);
        pub const ADTR1OFS: Field = Field::new(16, 5);
        /// FLT1IEN:CLIEN:FFIEN:SIEN
        pub const INTERRUPTS: Field = Field::new(12, 4);
        pub const IEVTSEL: Field = Field::new(8, 2);
        pub const PWMPCI: Field = Field::new(5, 3);
        pub const UPDTRG: Field = Field::new(3, 2);
        pub const PGTRGSEL: Field = Field::new(0, 3);
    }

    pub mod evt2 {
        use super::Field;

        /// ADTR2EN3:ADTR2EN1
        pub const ADTR2EN: Field = Field::new(24, 3);
    }

    pub mod spci1 {
        use super::Field;

        /// PCI polarity
        pub const PPS: Field = Field::bit(7);
    }

    pub mod dt {
        use super::Field;

        pub const DTH: Field = Field::new(16, 16);
        pub const DTL: Field = Field::new(0, 16);
    }

    pub const LEB: Field = Field::new(0, 16);
}

use fields::{con, dt, evt1, evt2, iocon1, iocon2, pclkcon, spci1};

macro_rules! register_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $value:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Format)]
        pub enum $name {
            $($(#[$vmeta])* $variant = $value,)+
        }

        impl $name {
            pub const fn bits(self) -> u32 {
                self as u32
            }

            pub const fn from_bits(bits: u32) -> Option<Self> {
                match bits {
                    $($value => Some($name::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

register_enum! {
    /// Master clock source (MCLKSEL)
    pub enum MasterClock {
        Fosc = 0,
        AfvcoDiv2 = 1,
        Fpllo = 2,
        Afpllo = 3,
    }
}

register_enum! {
    /// Divider for the divided master clock (DIVSEL)
    pub enum ClockDivider {
        Div2 = 0,
        Div4 = 1,
        Div8 = 2,
        Div16 = 3,
    }
}

impl ClockDivider {
    pub const fn divisor(self) -> u32 {
        2 << self as u32
    }
}

register_enum! {
    /// Generator clock selection (CLKSEL)
    pub enum ClockSelect {
        NoClock = 0,
        Master = 1,
        MasterDivided = 2,
        MasterScaled = 3,
    }
}

register_enum! {
    /// Waveform mode (MODSEL)
    pub enum WaveformMode {
        IndependentEdge = 0,
        VariablePhase = 1,
        IndependentEdgeDualOutput = 2,
        CenterAligned = 4,
        DoubleUpdateCenterAligned = 5,
        DualEdgeCenterAligned = 6,
    }
}

register_enum! {
    /// Where period, duty or phase comes from (MPERSEL, MDCSEL, MPHSEL)
    pub enum Source {
        Own = 0,
        Master = 1,
    }
}

register_enum! {
    /// TRGMOD
    pub enum TriggerMode {
        Single = 0,
        Retriggerable = 1,
    }
}

register_enum! {
    /// PMOD
    pub enum OutputMode {
        Complementary = 0,
        Independent = 1,
        PushPull = 2,
    }
}

register_enum! {
    pub enum Polarity {
        ActiveHigh = 0,
        ActiveLow = 1,
    }
}

register_enum! {
    /// CPU interrupt event (IEVTSEL)
    pub enum InterruptEvent {
        PeriodEnd = 0,
        TriggerA = 1,
        AdcTrigger1 = 2,
        Disabled = 3,
    }
}

register_enum! {
    /// When buffered duty/period/phase take effect (UPDTRG)
    pub enum UpdateTrigger {
        Manual = 0,
        DutyWrite = 1,
        TriggerAWrite = 2,
    }
}

/// Start-of-cycle trigger selection (SOCS).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Format)]
pub struct StartOfCycle(pub u8);

impl StartOfCycle {
    /// Own end of cycle
    pub const LOCAL_EOC: Self = Self(0);
    /// TRIG bit or PCI sync only
    pub const PCI_SYNC: Self = Self(0xf);
}

/// One of a generator's trigger compare registers.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Format)]
pub enum Compare {
    A,
    B,
    C,
}

bitflags! {
    /// Compare events an ADC trigger output fires on.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct TriggerCompares: u8 {
        const TRIGA = 0b001;
        const TRIGB = 0b010;
        const TRIGC = 0b100;
    }
}

bitflags! {
    /// PCI interrupt enables.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct EventInterrupts: u8 {
        const SYNC = 0b0001;
        const FEED_FORWARD = 0b0010;
        const CURRENT_LIMIT = 0b0100;
        const FAULT = 0b1000;
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PinConfig {
    pub enabled: bool,
    pub polarity: Polarity,
}

impl PinConfig {
    pub const DISABLED: Self = Self {
        enabled: false,
        polarity: Polarity::ActiveHigh,
    };
    pub const ACTIVE_HIGH: Self = Self {
        enabled: true,
        polarity: Polarity::ActiveHigh,
    };
}

/// PGxIOCON1
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OutputConfig {
    pub mode: OutputMode,
    pub swap: bool,
    pub high: PinConfig,
    pub low: PinConfig,
    pub capture_source: u8,
    pub dead_time_compensation: bool,
}

impl OutputConfig {
    const fn word(&self) -> u32 {
        Word::new()
            .with_flag(iocon1::SWAP, self.swap)
            .with(iocon1::CAPSRC, self.capture_source as u32)
            .with_flag(iocon1::DTCMPSEL, self.dead_time_compensation)
            .with(iocon1::PMOD, self.mode.bits())
            .with_flag(iocon1::PENH, self.high.enabled)
            .with_flag(iocon1::PENL, self.low.enabled)
            .with(iocon1::POLH, self.high.polarity.bits())
            .with(iocon1::POLL, self.low.polarity.bits())
            .bits()
    }

    fn from_word(w: u32) -> Option<Self> {
        Some(Self {
            mode: OutputMode::from_bits(iocon1::PMOD.extract(w))?,
            swap: iocon1::SWAP.extract(w) != 0,
            high: PinConfig {
                enabled: iocon1::PENH.extract(w) != 0,
                polarity: Polarity::from_bits(iocon1::POLH.extract(w))?,
            },
            low: PinConfig {
                enabled: iocon1::PENL.extract(w) != 0,
                polarity: Polarity::from_bits(iocon1::POLL.extract(w))?,
            },
            capture_source: narrow(iocon1::CAPSRC.extract(w)),
            dead_time_compensation: iocon1::DTCMPSEL.extract(w) != 0,
        })
    }
}

/// PGxIOCON2: output overrides and the pin states forced by fault, current-limit,
/// feed-forward and debug events.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OverrideConfig {
    pub current_limit_mode: bool,
    pub override_high: bool,
    pub override_low: bool,
    pub override_data: u8,
    pub override_sync: u8,
    pub fault_data: u8,
    pub current_limit_data: u8,
    pub feed_forward_data: u8,
    pub debug_data: u8,
}

impl OverrideConfig {
    pub const NONE: Self = Self {
        current_limit_mode: false,
        override_high: false,
        override_low: false,
        override_data: 0,
        override_sync: 0,
        fault_data: 0,
        current_limit_data: 0,
        feed_forward_data: 0,
        debug_data: 0,
    };

    const fn word(&self) -> u32 {
        Word::new()
            .with_flag(iocon2::CLMOD, self.current_limit_mode)
            .with_flag(iocon2::OVRENH, self.override_high)
            .with_flag(iocon2::OVRENL, self.override_low)
            .with(iocon2::OVRDAT, self.override_data as u32)
            .with(iocon2::OSYNC, self.override_sync as u32)
            .with(iocon2::FLTDAT, self.fault_data as u32)
            .with(iocon2::CLDAT, self.current_limit_data as u32)
            .with(iocon2::FFDAT, self.feed_forward_data as u32)
            .with(iocon2::DBDAT, self.debug_data as u32)
            .bits()
    }

    fn from_word(w: u32) -> Self {
        Self {
            current_limit_mode: iocon2::CLMOD.extract(w) != 0,
            override_high: iocon2::OVRENH.extract(w) != 0,
            override_low: iocon2::OVRENL.extract(w) != 0,
            override_data: narrow(iocon2::OVRDAT.extract(w)),
            override_sync: narrow(iocon2::OSYNC.extract(w)),
            fault_data: narrow(iocon2::FLTDAT.extract(w)),
            current_limit_data: narrow(iocon2::CLDAT.extract(w)),
            feed_forward_data: narrow(iocon2::FFDAT.extract(w)),
            debug_data: narrow(iocon2::DBDAT.extract(w)),
        }
    }
}

/// ADC trigger 1 output: which compares fire it, and how often.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AdcTrigger {
    pub sources: TriggerCompares,
    /// Fire on every (postscaler + 1)th event
    pub postscaler: u8,
    /// Events to skip before the postscaler starts counting
    pub offset: u8,
}

/// PGxEVT1 / PGxEVT2
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EventConfig {
    pub adc_trigger1: AdcTrigger,
    pub adc_trigger2: TriggerCompares,
    pub interrupts: EventInterrupts,
    pub interrupt_event: InterruptEvent,
    /// PCI source for the sync event (PWMPCI)
    pub pci_select: u8,
    pub update_trigger: UpdateTrigger,
    /// PWM generator trigger output selection (PGTRGSEL)
    pub trigger_output: u8,
}

impl EventConfig {
    const fn evt1(&self) -> u32 {
        Word::new()
            .with(evt1::ADTR1PS, self.adc_trigger1.postscaler as u32)
            .with(evt1::ADTR1EN, self.adc_trigger1.sources.bits() as u32)
            .with(evt1::ADTR1OFS, self.adc_trigger1.offset as u32)
            .with(evt1::INTERRUPTS, self.interrupts.bits() as u32)
            .with(evt1::IEVTSEL, self.interrupt_event.bits())
            .with(evt1::PWMPCI, self.pci_select as u32)
            .with(evt1::UPDTRG, self.update_trigger.bits())
            .with(evt1::PGTRGSEL, self.trigger_output as u32)
            .bits()
    }

    const fn evt2(&self) -> u32 {
        Word::new()
            .with(evt2::ADTR2EN, self.adc_trigger2.bits() as u32)
            .bits()
    }

    fn from_words(evt1_word: u32, evt2_word: u32) -> Option<Self> {
        Some(Self {
            adc_trigger1: AdcTrigger {
                sources: TriggerCompares::from_bits_truncate(narrow(evt1::ADTR1EN.extract(evt1_word))),
                postscaler: narrow(evt1::ADTR1PS.extract(evt1_word)),
                offset: narrow(evt1::ADTR1OFS.extract(evt1_word)),
            },
            adc_trigger2: TriggerCompares::from_bits_truncate(narrow(evt2::ADTR2EN.extract(evt2_word))),
            interrupts: EventInterrupts::from_bits_truncate(narrow(evt1::INTERRUPTS.extract(evt1_word))),
            interrupt_event: InterruptEvent::from_bits(evt1::IEVTSEL.extract(evt1_word))?,
            pci_select: narrow(evt1::PWMPCI.extract(evt1_word)),
            update_trigger: UpdateTrigger::from_bits(evt1::UPDTRG.extract(evt1_word))?,
            trigger_output: narrow(evt1::PGTRGSEL.extract(evt1_word)),
        })
    }
}

/// PCI words: current limit, feed-forward, and the two sync words.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PciConfig {
    pub current_limit: u32,
    pub feed_forward: u32,
    pub sync1: u32,
    pub sync2: u32,
}

impl PciConfig {
    pub const NONE: Self = Self {
        current_limit: 0,
        feed_forward: 0,
        sync1: 0,
        sync2: 0,
    };
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DeadTime {
    /// Delay before the high-side output turns on
    pub high: u32,
    /// Delay before the low-side output turns on
    pub low: u32,
}

impl DeadTime {
    pub const fn symmetric(ticks: u32) -> Self {
        Self {
            high: ticks,
            low: ticks,
        }
    }
}

/// Everything written to one generator.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GeneratorConfig {
    pub id: GeneratorId,
    pub clock: ClockSelect,
    pub mode: WaveformMode,
    pub trigger_count: u8,
    pub period_source: Source,
    pub duty_source: Source,
    pub phase_source: Source,
    /// Broadcast master updates to other generators (MSTEN)
    pub master_update: bool,
    pub update_mode: u8,
    pub trigger_mode: TriggerMode,
    pub start_of_cycle: StartOfCycle,
    pub output: OutputConfig,
    pub overrides: OverrideConfig,
    pub events: EventConfig,
    pub pci: PciConfig,
    pub leading_edge_blanking: u32,
    pub phase: u32,
    pub duty: u32,
    pub duty_adjust: u32,
    pub period: u32,
    pub dead_time: DeadTime,
    pub trigger_a: u32,
    pub trigger_b: u32,
    pub trigger_c: u32,
}

impl GeneratorConfig {
    /// Reset state: every field zero.
    pub const fn new(id: GeneratorId) -> Self {
        Self {
            id,
            clock: ClockSelect::NoClock,
            mode: WaveformMode::IndependentEdge,
            trigger_count: 0,
            period_source: Source::Own,
            duty_source: Source::Own,
            phase_source: Source::Own,
            master_update: false,
            update_mode: 0,
            trigger_mode: TriggerMode::Single,
            start_of_cycle: StartOfCycle::LOCAL_EOC,
            output: OutputConfig {
                mode: OutputMode::Complementary,
                swap: false,
                high: PinConfig::DISABLED,
                low: PinConfig::DISABLED,
                capture_source: 0,
                dead_time_compensation: false,
            },
            overrides: OverrideConfig::NONE,
            events: EventConfig {
                adc_trigger1: AdcTrigger {
                    sources: TriggerCompares::empty(),
                    postscaler: 0,
                    offset: 0,
                },
                adc_trigger2: TriggerCompares::empty(),
                interrupts: EventInterrupts::empty(),
                interrupt_event: InterruptEvent::PeriodEnd,
                pci_select: 0,
                update_trigger: UpdateTrigger::Manual,
                trigger_output: 0,
            },
            pci: PciConfig::NONE,
            leading_edge_blanking: 0,
            phase: 0,
            duty: 0,
            duty_adjust: 0,
            period: 0,
            dead_time: DeadTime::symmetric(0),
            trigger_a: 0,
            trigger_b: 0,
            trigger_c: 0,
        }
    }

    pub const fn clock(mut self, clock: ClockSelect) -> Self {
        self.clock = clock;
        self
    }

    pub const fn mode(mut self, mode: WaveformMode) -> Self {
        self.mode = mode;
        self
    }

    pub const fn period_source(mut self, source: Source) -> Self {
        self.period_source = source;
        self
    }

    pub const fn duty_source(mut self, source: Source) -> Self {
        self.duty_source = source;
        self
    }

    pub const fn phase_source(mut self, source: Source) -> Self {
        self.phase_source = source;
        self
    }

    pub const fn trigger_mode(mut self, mode: TriggerMode) -> Self {
        self.trigger_mode = mode;
        self
    }

    pub const fn start_of_cycle(mut self, soc: StartOfCycle) -> Self {
        self.start_of_cycle = soc;
        self
    }

    /// Complementary pair, active high, with the given pins driven by the generator.
    pub const fn complementary(mut self, high: bool, low: bool) -> Self {
        self.output.mode = OutputMode::Complementary;
        self.output.high = if high {
            PinConfig::ACTIVE_HIGH
        } else {
            PinConfig::DISABLED
        };
        self.output.low = if low {
            PinConfig::ACTIVE_HIGH
        } else {
            PinConfig::DISABLED
        };
        self
    }

    pub const fn adc_trigger1(mut self, sources: TriggerCompares) -> Self {
        self.events.adc_trigger1.sources = sources;
        self
    }

    pub const fn adc_trigger2(mut self, sources: TriggerCompares) -> Self {
        self.events.adc_trigger2 = sources;
        self
    }

    pub const fn interrupts(mut self, interrupts: EventInterrupts) -> Self {
        self.events.interrupts = interrupts;
        self
    }

    pub const fn interrupt_event(mut self, event: InterruptEvent) -> Self {
        self.events.interrupt_event = event;
        self
    }

    pub const fn update_trigger(mut self, trigger: UpdateTrigger) -> Self {
        self.events.update_trigger = trigger;
        self
    }

    pub const fn pci_select(mut self, pci: u8) -> Self {
        self.events.pci_select = pci;
        self
    }

    /// Sync PCI: polarity and the second sync word.
    pub const fn sync_pci(mut self, inverted: bool, sync2: u32) -> Self {
        self.pci.sync1 = spci1::PPS.insert(self.pci.sync1, inverted as u32);
        self.pci.sync2 = sync2;
        self
    }

    pub const fn timing(mut self, phase: u32, duty: u32, period: u32) -> Self {
        self.phase = phase;
        self.duty = duty;
        self.period = period;
        self
    }

    pub const fn dead_time(mut self, dead_time: DeadTime) -> Self {
        self.dead_time = dead_time;
        self
    }

    pub const fn triggers(mut self, a: u32, b: u32, c: u32) -> Self {
        self.trigger_a = a;
        self.trigger_b = b;
        self.trigger_c = c;
        self
    }

    pub const fn effective_period(&self, master: &MasterTimebase) -> u32 {
        match self.period_source {
            Source::Own => self.period,
            Source::Master => master.period,
        }
    }

    pub const fn effective_duty(&self, master: &MasterTimebase) -> u32 {
        match self.duty_source {
            Source::Own => self.duty,
            Source::Master => master.duty,
        }
    }

    pub const fn effective_phase(&self, master: &MasterTimebase) -> u32 {
        match self.phase_source {
            Source::Own => self.phase,
            Source::Master => master.phase,
        }
    }

    /// Raises a CPU interrupt and fires at least one ADC trigger each cycle.
    pub const fn interrupts_with_adc_trigger(&self) -> bool {
        !matches!(self.events.interrupt_event, InterruptEvent::Disabled)
            && !(self.events.adc_trigger1.sources.is_empty() && self.events.adc_trigger2.is_empty())
    }

    /// Control word, with ON clear.
    const fn con(&self) -> u32 {
        Word::new()
            .with(con::MDCSEL, self.duty_source.bits())
            .with(con::MPERSEL, self.period_source.bits())
            .with(con::MPHSEL, self.phase_source.bits())
            .with_flag(con::MSTEN, self.master_update)
            .with(con::UPDMOD, self.update_mode as u32)
            .with(con::TRGMOD, self.trigger_mode.bits())
            .with(con::SOCS, self.start_of_cycle.0 as u32)
            .with(con::TRGCNT, self.trigger_count as u32)
            .with(con::CLKSEL, self.clock.bits())
            .with(con::MODSEL, self.mode.bits())
            .bits()
    }

    const fn dt(&self) -> u32 {
        Word::new()
            .with(dt::DTH, self.dead_time.high)
            .with(dt::DTL, self.dead_time.low)
            .bits()
    }

    /// Decode a generator's registers back into a record.
    ///
    /// Returns `None` if a field holds a reserved encoding.
    pub fn read_back<R: Registers>(regs: &mut R, id: GeneratorId) -> Option<Self> {
        let mut r = |reg| regs.read(Reg::Pg(id, reg));
        let con_word = r(PgReg::Con);
        let evt1_word = r(PgReg::Evt1);
        let evt2_word = r(PgReg::Evt2);
        let dt_word = r(PgReg::Dt);
        Some(Self {
            id,
            clock: ClockSelect::from_bits(con::CLKSEL.extract(con_word))?,
            mode: WaveformMode::from_bits(con::MODSEL.extract(con_word))?,
            trigger_count: narrow(con::TRGCNT.extract(con_word)),
            period_source: Source::from_bits(con::MPERSEL.extract(con_word))?,
            duty_source: Source::from_bits(con::MDCSEL.extract(con_word))?,
            phase_source: Source::from_bits(con::MPHSEL.extract(con_word))?,
            master_update: con::MSTEN.extract(con_word) != 0,
            update_mode: narrow(con::UPDMOD.extract(con_word)),
            trigger_mode: TriggerMode::from_bits(con::TRGMOD.extract(con_word))?,
            start_of_cycle: StartOfCycle(narrow(con::SOCS.extract(con_word))),
            output: OutputConfig::from_word(r(PgReg::Iocon1))?,
            overrides: OverrideConfig::from_word(r(PgReg::Iocon2)),
            events: EventConfig::from_words(evt1_word, evt2_word)?,
            pci: PciConfig {
                current_limit: r(PgReg::Clpci1),
                feed_forward: r(PgReg::Ffpci1),
                sync1: r(PgReg::Spci1),
                sync2: r(PgReg::Spci2),
            },
            leading_edge_blanking: r(PgReg::Leb),
            phase: r(PgReg::Phase),
            duty: r(PgReg::Dc),
            duty_adjust: r(PgReg::Dca),
            period: r(PgReg::Per),
            dead_time: DeadTime {
                high: dt::DTH.extract(dt_word),
                low: dt::DTL.extract(dt_word),
            },
            trigger_a: r(PgReg::Triga),
            trigger_b: r(PgReg::Trigb),
            trigger_c: r(PgReg::Trigc),
        })
    }
}

fn narrow(value: u32) -> u8 {
    use crate::num::Truncate;
    value.truncate()
}

/// Shared period/phase/duty and the PWM clock selection.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Format)]
pub struct MasterTimebase {
    pub clock: MasterClock,
    pub divider: ClockDivider,
    pub period: u32,
    pub phase: u32,
    pub duty: u32,
}

impl MasterTimebase {
    pub const fn new(clock: MasterClock, divider: ClockDivider, period: u32) -> Self {
        Self {
            clock,
            divider,
            period,
            phase: 0,
            duty: 0,
        }
    }

    /// Master period for `switching` when the PWM clock runs at `pwm_clock`.
    pub const fn for_switching_frequency(
        clock: MasterClock,
        divider: ClockDivider,
        pwm_clock: Hertz,
        switching: Hertz,
    ) -> Self {
        let period = time::period_ticks(pwm_clock, switching, crate::config::pwm::HIGH_RES_SCALE);
        Self::new(clock, divider, period)
    }

    pub const fn switching_frequency(&self, pwm_clock: Hertz) -> Hertz {
        time::switching_frequency(pwm_clock, self.period, crate::config::pwm::HIGH_RES_SCALE)
    }

    /// Clock select, master period/phase/duty, then the common blocks cleared.
    pub fn apply<R: Registers>(&self, regs: &mut R) {
        regs.write(Reg::Pclkcon, 0);
        regs.write(
            Reg::Pclkcon,
            Word::new()
                .with(pclkcon::DIVSEL, self.divider.bits())
                .with(pclkcon::MCLKSEL, self.clock.bits())
                .with_flag(pclkcon::LOCK, false)
                .bits(),
        );

        regs.write(Reg::Mphase, self.phase);
        regs.write(Reg::Mdc, self.duty);
        regs.write(Reg::Mper, self.period);

        // frequency scaling, LFSR and combinational logic/events unused
        regs.write(Reg::Fscl, 0);
        regs.write(Reg::Fsminper, 0);
        regs.write(Reg::Lfsr, 0);
        regs.write(Reg::Cmbtrig, 0);
        for block in Block::ALL {
            regs.write(Reg::Logcon(block), 0);
        }
        for block in Block::ALL {
            regs.write(Reg::Pwmevt(block), 0);
        }
        regs.write(Reg::Apwmevta, 0);
    }

    pub fn read_back<R: Registers>(regs: &mut R) -> Option<Self> {
        let pclkcon_word = regs.read(Reg::Pclkcon);
        Some(Self {
            clock: MasterClock::from_bits(pclkcon::MCLKSEL.extract(pclkcon_word))?,
            divider: ClockDivider::from_bits(pclkcon::DIVSEL.extract(pclkcon_word))?,
            period: regs.read(Reg::Mper),
            phase: regs.read(Reg::Mphase),
            duty: regs.read(Reg::Mdc),
        })
    }
}

/// Write one generator. The generator is stopped first and left stopped.
pub fn configure_generator<R: Registers>(regs: &mut R, config: &GeneratorConfig) {
    let id = config.id;
    let mut w = |reg, value| regs.write(Reg::Pg(id, reg), value);

    w(PgReg::Con, 0);
    w(PgReg::Con, config.con());
    w(PgReg::Stat, 0);

    w(PgReg::Iocon2, config.overrides.word());
    w(PgReg::Iocon1, config.output.word());

    w(PgReg::Evt1, config.events.evt1());
    w(PgReg::Evt2, config.events.evt2());

    w(PgReg::Clpci1, config.pci.current_limit);
    w(PgReg::Ffpci1, config.pci.feed_forward);
    w(PgReg::Spci1, config.pci.sync1);
    w(PgReg::Spci2, config.pci.sync2);
    w(PgReg::Leb, config.leading_edge_blanking);

    w(PgReg::Dca, config.duty_adjust);
    w(PgReg::Dt, config.dt());
    w(PgReg::Triga, config.trigger_a);
    w(PgReg::Trigb, config.trigger_b);
    w(PgReg::Trigc, config.trigger_c);

    w(PgReg::Phase, config.phase);
    w(PgReg::Dc, config.duty);
    w(PgReg::Per, config.period);

    defmt::debug!("{} configured", id);
}

/// Generators that have been written and may be enabled.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Format)]
pub struct Configured {
    mask: u16,
}

impl Configured {
    pub const fn contains(&self, id: GeneratorId) -> bool {
        self.mask & id.bit() != 0
    }

    pub const fn len(&self) -> u32 {
        self.mask.count_ones()
    }

    pub const fn is_empty(&self) -> bool {
        self.mask == 0
    }
}

/// Write every generator in table order.
pub fn configure_generators<R: Registers>(
    regs: &mut R,
    generators: &[GeneratorConfig],
) -> Configured {
    let mut mask = 0;
    for config in generators {
        configure_generator(regs, config);
        mask |= config.id.bit();
    }
    Configured { mask }
}

/// Turn generators on, in `order`.
///
/// Nothing is written unless every generator in `order` was configured.
pub fn enable_generators<R: Registers>(
    regs: &mut R,
    configured: &Configured,
    _adc: &AdcReady,
    order: &[GeneratorId],
) -> Result<(), InvariantViolation> {
    if let Some(&generator) = order.iter().find(|id| !configured.contains(**id)) {
        return Err(InvariantViolation::NotConfigured { generator });
    }
    for &id in order {
        regs.set(Reg::Pg(id, PgReg::Con), con::ON);
        defmt::debug!("{} enabled", id);
    }
    Ok(())
}

/// Safe state: every generator stopped and its pins released.
pub fn disable_all<R: Registers>(regs: &mut R) {
    for id in GeneratorId::ALL {
        regs.clear(Reg::Pg(id, PgReg::Con), con::ON);
        regs.modify(Reg::Pg(id, PgReg::Iocon1), |w| {
            w & !(iocon1::PENH.mask() | iocon1::PENL.mask())
        });
    }
}

pub fn is_enabled<R: Registers>(regs: &mut R, id: GeneratorId) -> bool {
    regs.is_set(Reg::Pg(id, PgReg::Con), con::ON)
}

/// Period the generator actually runs with, from its programmed registers.
pub fn programmed_period<R: Registers>(regs: &mut R, id: GeneratorId) -> u32 {
    if regs.is_set(Reg::Pg(id, PgReg::Con), con::MPERSEL) {
        regs.read(Reg::Mper)
    } else {
        regs.read(Reg::Pg(id, PgReg::Per))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::regs::RegisterFile;

    fn sample() -> GeneratorConfig {
        GeneratorConfig::new(GeneratorId::Pg2)
            .clock(ClockSelect::Master)
            .mode(WaveformMode::CenterAligned)
            .period_source(Source::Master)
            .trigger_mode(TriggerMode::Retriggerable)
            .start_of_cycle(StartOfCycle::PCI_SYNC)
            .complementary(true, true)
            .adc_trigger1(TriggerCompares::TRIGA)
            .interrupts(EventInterrupts::FAULT)
            .interrupt_event(InterruptEvent::Disabled)
            .update_trigger(UpdateTrigger::DutyWrite)
            .pci_select(4)
            .sync_pci(false, 0x80_0000)
            .timing(6_400, 99_992, 0)
            .dead_time(DeadTime::symmetric(6_400))
    }

    #[test]
    fn control_word_leaves_generator_off() {
        assert_eq!(con::ON.extract(sample().con()), 0);
    }

    #[test]
    fn control_word_fields() {
        let w = sample().con();
        assert_eq!(con::CLKSEL.extract(w), 1);
        assert_eq!(con::MODSEL.extract(w), 4);
        assert_eq!(con::MPERSEL.extract(w), 1);
        assert_eq!(con::MDCSEL.extract(w), 0);
        assert_eq!(con::TRGMOD.extract(w), 1);
        assert_eq!(con::SOCS.extract(w), 0xf);
    }

    #[test]
    fn event_word_fields() {
        let w = sample().events.evt1();
        assert_eq!(evt1::ADTR1EN.extract(w), 0b001);
        assert_eq!(evt1::IEVTSEL.extract(w), 3);
        assert_eq!(evt1::UPDTRG.extract(w), 1);
        assert_eq!(evt1::PWMPCI.extract(w), 4);
        assert_eq!(evt1::INTERRUPTS.extract(w), 0b1000);
    }

    #[test]
    fn read_back_matches_written() {
        let mut regs = RegisterFile::new();
        let config = sample();
        configure_generator(&mut regs, &config);
        assert_eq!(GeneratorConfig::read_back(&mut regs, config.id), Some(config));
    }

    #[test]
    fn reserved_mode_does_not_decode() {
        let mut regs = RegisterFile::new();
        regs.write(Reg::Pg(GeneratorId::Pg1, PgReg::Con), con::MODSEL.insert(0, 7));
        assert_eq!(GeneratorConfig::read_back(&mut regs, GeneratorId::Pg1), None);
    }

    #[test]
    fn effective_period_follows_source() {
        let master = MasterTimebase::new(MasterClock::AfvcoDiv2, ClockDivider::Div2, 199_984);
        let own = sample().period_source(Source::Own).timing(0, 100, 5_000);
        assert_eq!(sample().effective_period(&master), 199_984);
        assert_eq!(own.effective_period(&master), 5_000);
    }

    #[test]
    fn divider_values() {
        assert_eq!(ClockDivider::Div2.divisor(), 2);
        assert_eq!(ClockDivider::Div16.divisor(), 16);
    }

    #[test]
    fn timebase_for_16khz() {
        let tb = MasterTimebase::for_switching_frequency(
            MasterClock::AfvcoDiv2,
            ClockDivider::Div2,
            Hertz::MHz(400),
            Hertz::kHz(16),
        );
        assert_eq!(tb.period, 199_984);
        assert_eq!(tb.switching_frequency(Hertz::MHz(400)), Hertz::kHz(16));
    }

    #[test]
    fn disable_all_releases_pins() {
        let mut regs = RegisterFile::new();
        configure_generator(&mut regs, &sample());
        regs.set(Reg::Pg(GeneratorId::Pg2, PgReg::Con), con::ON);
        disable_all(&mut regs);
        assert!(!is_enabled(&mut regs, GeneratorId::Pg2));
        assert_eq!(regs.peek_field(Reg::Pg(GeneratorId::Pg2, PgReg::Iocon1), iocon1::PENH), 0);
        assert_eq!(regs.peek_field(Reg::Pg(GeneratorId::Pg2, PgReg::Iocon1), iocon1::PENL), 0);
    }
}
