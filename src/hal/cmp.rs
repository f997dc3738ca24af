//! Comparator 3 and its reference DAC, used for the over-current trip.

use crate::config;
use crate::error::ConfigurationError;
use crate::hal::regs::{Field, Reg, Registers};

const ON: Field = Field::bit(15);
const DACDAT: Field = Field::new(0, 12);

pub struct Comparator3<'a, R: Registers> {
    regs: &'a mut R,
}

impl<'a, R: Registers> Comparator3<'a, R> {
    pub fn new(regs: &'a mut R) -> Self {
        Self { regs }
    }

    /// Module off, reference at the configured level.
    pub fn init(&mut self) -> Result<(), ConfigurationError> {
        self.enable(false);
        self.set_reference(config::cmp::REFERENCE)
    }

    pub fn enable(&mut self, on: bool) {
        self.regs.write_field(Reg::Dac3Con, ON, u32::from(on));
    }

    pub fn is_enabled(&mut self) -> bool {
        self.regs.is_set(Reg::Dac3Con, ON)
    }

    /// 12-bit DAC code the comparator input is compared against.
    pub fn set_reference(&mut self, value: u16) -> Result<(), ConfigurationError> {
        if !DACDAT.fits(u32::from(value)) {
            return Err(ConfigurationError::ReferenceOutOfRange { value });
        }
        self.regs.write_field(Reg::Dac3Dat, DACDAT, u32::from(value));
        Ok(())
    }

    pub fn reference(&mut self) -> u16 {
        #[allow(clippy::cast_possible_truncation)]
        let value = self.regs.read_field(Reg::Dac3Dat, DACDAT) as u16;
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::regs::RegisterFile;

    #[test]
    fn init_leaves_comparator_off_at_full_scale() {
        let mut regs = RegisterFile::new();
        let mut cmp = Comparator3::new(&mut regs);
        cmp.enable(true);
        cmp.init().unwrap();
        assert!(!cmp.is_enabled());
        assert_eq!(cmp.reference(), 0x0fff);
    }

    #[test]
    fn reference_beyond_12_bits_is_rejected() {
        let mut regs = RegisterFile::new();
        let mut cmp = Comparator3::new(&mut regs);
        cmp.set_reference(0x0800).unwrap();
        assert_eq!(
            cmp.set_reference(0x1000),
            Err(ConfigurationError::ReferenceOutOfRange { value: 0x1000 })
        );
        assert_eq!(cmp.reference(), 0x0800);
    }
}
