#![allow(dead_code)]

use embedded_hal::blocking::delay::DelayUs;
use mcboot::hal::pwm::{fields::con, GeneratorId, PgReg};
use mcboot::hal::regs::{Reg, Registers};
use mcboot::sim::SimulatedDevice;

pub struct NoDelay;

impl DelayUs<u32> for NoDelay {
    fn delay_us(&mut self, _us: u32) {}
}

/// Simulated device that remembers every write, in order.
pub struct Recorder {
    pub dev: SimulatedDevice,
    pub writes: Vec<(Reg, u32)>,
}

impl Recorder {
    pub fn new(dev: SimulatedDevice) -> Self {
        Self {
            dev,
            writes: Vec::new(),
        }
    }

    /// Positions of writes that switched a generator on, with the generator.
    pub fn enables(&self) -> Vec<(usize, GeneratorId)> {
        self.writes
            .iter()
            .enumerate()
            .filter_map(|(i, &(reg, value))| match reg {
                Reg::Pg(id, PgReg::Con) if con::ON.extract(value) != 0 => Some((i, id)),
                _ => None,
            })
            .collect()
    }

    /// Position of the last write to any register matching `f`.
    pub fn last_write(&self, f: impl Fn(Reg) -> bool) -> Option<usize> {
        self.writes.iter().rposition(|&(reg, _)| f(reg))
    }

    pub fn first_write(&self, f: impl Fn(Reg) -> bool) -> Option<usize> {
        self.writes.iter().position(|&(reg, _)| f(reg))
    }
}

impl Registers for Recorder {
    fn read(&mut self, reg: Reg) -> u32 {
        self.dev.read(reg)
    }

    fn write(&mut self, reg: Reg, value: u32) {
        self.writes.push((reg, value));
        self.dev.write(reg, value);
    }
}

/// Writes the safe state makes: generator control and pin ownership only.
pub fn is_safe_state_write(reg: Reg, value: u32) -> bool {
    match reg {
        Reg::Pg(_, PgReg::Con) => con::ON.extract(value) == 0,
        Reg::Pg(_, PgReg::Iocon1) => true,
        _ => false,
    }
}
