//! Port direction, analog selection and remappable output functions.

use crate::hal::regs::{Field, Reg, Registers};
use defmt::Format;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Format)]
pub enum Port {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
}

impl Port {
    pub const COUNT: usize = 7;
    pub const ALL: [Port; Self::COUNT] = [Port::A, Port::B, Port::C, Port::D, Port::E, Port::F, Port::G];

    pub const fn index(self) -> usize {
        self as usize
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Format)]
pub struct Pin {
    pub port: Port,
    pub number: u8,
}

impl Pin {
    pub const fn new(port: Port, number: u8) -> Self {
        assert!(number < 16);
        Self { port, number }
    }

    const fn field(self) -> Field {
        Field::bit(self.number)
    }
}

/// RPn pin whose output function is selected through its RPOR register.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Format)]
pub struct RemappablePin(u8);

impl RemappablePin {
    pub const COUNT: usize = 128;

    pub const RP55: Self = Self(55);

    pub const fn new(n: u8) -> Option<Self> {
        if (n as usize) < Self::COUNT {
            Some(Self(n))
        } else {
            None
        }
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Peripheral output routed to a remappable pin.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Format)]
pub struct OutputFunction(pub u8);

impl OutputFunction {
    pub const PWM_EVENT_B: Self = Self(62);
}

const RPOR: Field = Field::new(0, 8);

/// Every pin an input, latch low, digital.
pub fn reset_ports<R: Registers>(regs: &mut R) {
    for port in Port::ALL {
        regs.write(Reg::Tris(port), 0xffff);
        regs.write(Reg::Lat(port), 0);
        regs.write(Reg::Ansel(port), 0);
    }
}

pub fn make_output<R: Registers>(regs: &mut R, pin: Pin) {
    regs.clear(Reg::Tris(pin.port), pin.field());
}

pub fn is_output<R: Registers>(regs: &mut R, pin: Pin) -> bool {
    !regs.is_set(Reg::Tris(pin.port), pin.field())
}

pub fn map_output<R: Registers>(regs: &mut R, pin: RemappablePin, function: OutputFunction) {
    regs.write_field(Reg::Rpor(pin), RPOR, u32::from(function.0));
}

pub fn mapped_output<R: Registers>(regs: &mut R, pin: RemappablePin) -> OutputFunction {
    #[allow(clippy::cast_possible_truncation)]
    let f = regs.read_field(Reg::Rpor(pin), RPOR) as u8;
    OutputFunction(f)
}

/// Ports reset, then `outputs` driven and the remappable outputs routed.
pub fn setup<R: Registers>(
    regs: &mut R,
    outputs: &[Pin],
    remaps: &[(RemappablePin, OutputFunction)],
) {
    reset_ports(regs);
    for &pin in outputs {
        make_output(regs, pin);
    }
    for &(pin, function) in remaps {
        map_output(regs, pin, function);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::regs::RegisterFile;

    #[test]
    fn reset_makes_everything_input() {
        let mut regs = RegisterFile::new();
        reset_ports(&mut regs);
        for port in Port::ALL {
            assert_eq!(regs.peek(Reg::Tris(port)), 0xffff);
            assert_eq!(regs.peek(Reg::Ansel(port)), 0);
        }
    }

    #[test]
    fn output_clears_only_its_bit() {
        let mut regs = RegisterFile::new();
        reset_ports(&mut regs);
        make_output(&mut regs, Pin::new(Port::D, 10));
        assert_eq!(regs.peek(Reg::Tris(Port::D)), 0xfbff);
        assert!(is_output(&mut regs, Pin::new(Port::D, 10)));
        assert!(!is_output(&mut regs, Pin::new(Port::D, 11)));
    }

    #[test]
    fn remappable_pin_range() {
        assert!(RemappablePin::new(127).is_some());
        assert!(RemappablePin::new(128).is_none());
    }
}
