//! Host-side stand-in for the device.
//!
//! A [`RegisterFile`] plus the few status bits hardware sets on its own: each ADC
//! core raises ADRDY a number of status reads after it is switched on, or never.

use crate::hal::adc::{fields::con, AdcCore};
use crate::hal::regs::{Reg, RegisterFile, Registers};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReadyLatency {
    /// Ready on the n-th status read after power-up
    Reads(u32),
    Never,
}

#[derive(Clone)]
pub struct SimulatedDevice {
    regs: RegisterFile,
    latency: [ReadyLatency; AdcCore::COUNT],
    status_reads: [u32; AdcCore::COUNT],
}

impl SimulatedDevice {
    /// Every ADC core ready on the first poll.
    pub const fn new() -> Self {
        Self {
            regs: RegisterFile::new(),
            latency: [ReadyLatency::Reads(1); AdcCore::COUNT],
            status_reads: [0; AdcCore::COUNT],
        }
    }

    pub fn with_adc_latency(mut self, core: AdcCore, latency: ReadyLatency) -> Self {
        self.latency[core.index()] = latency;
        self
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.regs
    }

    pub fn peek(&self, reg: Reg) -> u32 {
        self.regs.peek(reg)
    }

    /// Status reads a core has seen since power-up.
    pub fn status_reads(&self, core: AdcCore) -> u32 {
        self.status_reads[core.index()]
    }

    fn advance_adc(&mut self, core: AdcCore) {
        let reg = Reg::AdCon(core);
        if con::ON.extract(self.regs.peek(reg)) == 0 {
            return;
        }
        let reads = &mut self.status_reads[core.index()];
        *reads += 1;
        if let ReadyLatency::Reads(n) = self.latency[core.index()] {
            if *reads >= n {
                self.regs.set(reg, con::ADRDY);
            }
        }
    }
}

impl Registers for SimulatedDevice {
    fn read(&mut self, reg: Reg) -> u32 {
        if let Reg::AdCon(core) = reg {
            self.advance_adc(core);
        }
        self.regs.read(reg)
    }

    fn write(&mut self, reg: Reg, value: u32) {
        if let Reg::AdCon(core) = reg {
            // switching a core off drops ready and restarts its power-up count
            if con::ON.extract(value) == 0 {
                self.status_reads[core.index()] = 0;
                self.regs.write(reg, con::ADRDY.insert(value, 0));
                return;
            }
        }
        self.regs.write(reg, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::adc;

    #[test]
    fn ready_after_configured_reads() {
        let mut dev = SimulatedDevice::new().with_adc_latency(AdcCore::Ad2, ReadyLatency::Reads(3));
        dev.set(Reg::AdCon(AdcCore::Ad2), con::ON);
        assert!(!adc::is_ready(&mut dev, AdcCore::Ad2));
        assert!(!adc::is_ready(&mut dev, AdcCore::Ad2));
        assert!(adc::is_ready(&mut dev, AdcCore::Ad2));
        assert_eq!(dev.status_reads(AdcCore::Ad2), 3);
    }

    #[test]
    fn never_ready_while_off() {
        let mut dev = SimulatedDevice::new();
        for _ in 0..10 {
            assert!(!adc::is_ready(&mut dev, AdcCore::Ad1));
        }
        assert_eq!(dev.status_reads(AdcCore::Ad1), 0);
    }

    #[test]
    fn never_ready_latency() {
        let mut dev = SimulatedDevice::new().with_adc_latency(AdcCore::Ad3, ReadyLatency::Never);
        dev.set(Reg::AdCon(AdcCore::Ad3), con::ON);
        for _ in 0..100 {
            assert!(!adc::is_ready(&mut dev, AdcCore::Ad3));
        }
    }
}
