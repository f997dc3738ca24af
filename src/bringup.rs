//! Power-on sequencing: clocks, pins, then every peripheral in dependency order.
//!
//! A failure at any step leaves the PWM outputs disabled and reports the step.

use crate::board::BoardConfig;
use crate::config;
use crate::error::Error;
use crate::hal::clock::{ClockSource, Clocks};
use crate::hal::cmp::Comparator3;
use crate::hal::pwm::{self, Configured};
use crate::hal::regs::Registers;
use crate::hal::tim::Timer1;
use crate::hal::uart::Uart1;
use crate::hal::{adc, gpio};
use defmt::Format;
use embedded_hal::blocking::delay::DelayUs;
use heapless::Vec;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Format)]
pub enum Phase {
    Clocks,
    Validation,
    Gpio,
    Adc,
    Comparator,
    Pwm,
    PwmEnable,
    Timer1,
    Uart,
}

impl Phase {
    pub const COUNT: usize = 9;
}

/// Phases that completed, in order.
pub type PhaseLog = Vec<Phase, { Phase::COUNT }>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Report {
    pub completed: PhaseLog,
    pub configured: Option<Configured>,
}

impl Report {
    fn new() -> Self {
        Self {
            completed: Vec::new(),
            configured: None,
        }
    }

    fn done(&mut self, phase: Phase) {
        // one entry per phase, so this cannot overflow
        let _ = self.completed.push(phase);
    }
}

/// Step that failed, why, and what had completed before it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Failure {
    pub phase: Phase,
    pub error: Error,
    pub completed: PhaseLog,
}

/// Run `f` as `phase`, recording it on success.
fn step<T>(
    report: &mut Report,
    phase: Phase,
    f: impl FnOnce() -> Result<T, Error>,
) -> Result<T, (Phase, Error)> {
    let value = f().map_err(|e| (phase, e))?;
    report.done(phase);
    Ok(value)
}

/// Enter the safe state and turn an error into a [`Failure`].
fn fail<R: Registers>(regs: &mut R, report: Report, phase: Phase, error: Error) -> Failure {
    defmt::error!("{} failed: {}", phase, error);
    pwm::disable_all(regs);
    defmt::warn!("PWM outputs disabled");
    Failure {
        phase,
        error,
        completed: report.completed,
    }
}

/// Validate the whole board, then ADC, comparator, PWM, Timer1 and UART1, in that order.
pub fn init_peripherals<R, D>(regs: &mut R, delay: &mut D, board: &BoardConfig) -> Result<Report, Failure>
where
    R: Registers,
    D: DelayUs<u32>,
{
    let mut report = Report::new();
    let result = validate(&mut report, board).and_then(|()| run_peripherals(regs, delay, board, &mut report));
    match result {
        Ok(()) => Ok(report),
        Err((phase, error)) => Err(fail(regs, report, phase, error)),
    }
}

fn validate(report: &mut Report, board: &BoardConfig) -> Result<(), (Phase, Error)> {
    defmt::info!("Validating configuration...");
    step(report, Phase::Validation, || board.validate())
}

/// ADC, comparator, PWM, Timer1 and UART1, on an already validated board.
fn run_peripherals<R, D>(
    regs: &mut R,
    delay: &mut D,
    board: &BoardConfig,
    report: &mut Report,
) -> Result<(), (Phase, Error)>
where
    R: Registers,
    D: DelayUs<u32>,
{
    defmt::info!("Configuring ADC...");
    let adc_ready = step(report, Phase::Adc, || {
        adc::init(regs, delay, &board.channels).map_err(Error::from)
    })?;

    defmt::info!("Configuring comparator...");
    step(report, Phase::Comparator, || {
        Comparator3::new(regs).init().map_err(Error::from)
    })?;

    defmt::info!("Configuring PWM...");
    let configured = step(report, Phase::Pwm, || {
        board.timebase.apply(regs);
        Ok(pwm::configure_generators(regs, &board.generators))
    })?;
    report.configured = Some(configured);

    defmt::info!("Enabling PWM...");
    step(report, Phase::PwmEnable, || {
        pwm::enable_generators(regs, &configured, &adc_ready, &board.enable_order).map_err(Error::from)
    })?;

    defmt::info!("Configuring Timer1...");
    step(report, Phase::Timer1, || {
        Timer1::new(regs).init();
        Ok(())
    })?;

    defmt::info!("Configuring UART1...");
    step(report, Phase::Uart, || {
        Uart1::new(regs).init();
        Ok(())
    })?;

    Ok(())
}

/// Everything `main` does before the idle loop.
pub fn boot<R, D, C>(regs: &mut R, delay: &mut D, clocks: &mut C, board: &BoardConfig) -> Result<Report, Failure>
where
    R: Registers,
    D: DelayUs<u32>,
    C: ClockSource,
{
    let mut report = Report::new();

    defmt::info!("Configuring clocks...");
    let frozen = clocks.freeze();
    if let Err((phase, error)) = step(&mut report, Phase::Clocks, || {
        frozen.check(&Clocks::EXPECTED).map_err(Error::from)
    }) {
        return Err(fail(regs, report, phase, error));
    }

    config::dump_to_log();

    // nothing past the clock check is written until the board is known good
    if let Err((phase, error)) = validate(&mut report, board) {
        return Err(fail(regs, report, phase, error));
    }

    defmt::info!("Configuring GPIO...");
    gpio::setup(regs, board.outputs, board.remaps);
    report.done(Phase::Gpio);

    match run_peripherals(regs, delay, board, &mut report) {
        Ok(()) => {
            defmt::info!("Bring-up complete");
            Ok(report)
        }
        Err((phase, error)) => Err(fail(regs, report, phase, error)),
    }
}

/// Nothing left to do outside interrupts.
pub fn idle() -> ! {
    loop {
        continue;
    }
}
