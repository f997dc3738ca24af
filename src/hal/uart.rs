//! UART1, the debug/host link. Brought up configured but switched off.

use crate::config;
use crate::hal::regs::{Reg, Registers, Word};
use defmt::Format;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Format)]
pub enum UartReg {
    Con,
    Stat,
    Brg,
    Rxb,
    Txb,
    Pa,
    Pb,
    Chk,
    Sccon,
    Uir,
}

impl UartReg {
    pub const COUNT: usize = 10;

    pub const fn index(self) -> usize {
        self as usize
    }
}

mod con {
    use crate::hal::regs::Field;

    pub const SLPEN: Field = Field::bit(28);
    pub const CLKSEL: Field = Field::new(25, 2);
    pub const HALFDPLX: Field = Field::bit(24);
    pub const STP: Field = Field::new(20, 2);
    pub const FLO: Field = Field::new(16, 2);
    pub const ON: Field = Field::bit(15);
    pub const BRGS: Field = Field::bit(7);
    pub const TXEN: Field = Field::bit(5);
    pub const RXEN: Field = Field::bit(4);
    pub const MODE: Field = Field::new(0, 4);
}

mod stat {
    use crate::hal::regs::Field;

    pub const TXWM: Field = Field::new(24, 3);
    pub const RXWM: Field = Field::new(16, 3);
    pub const TXBE: Field = Field::bit(5);
    pub const RXBE: Field = Field::bit(1);
}

/// Baud clock source (CLKSEL)
#[derive(Copy, Clone, Debug, PartialEq, Eq, Format)]
pub enum BaudClock {
    SystemClock = 0,
    ClockGen8 = 1,
    Fcy2x = 2,
    Fcy4x = 3,
}

/// Frame format (MODE)
#[derive(Copy, Clone, Debug, PartialEq, Eq, Format)]
pub enum Mode {
    Async8Bit = 0,
    Async7Bit = 1,
    Async8BitOddParity = 2,
    Async8BitEvenParity = 3,
    Async9BitAddress = 4,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Format)]
pub enum StopBits {
    One = 0,
    OneAndHalf = 1,
    TwoCheckTwo = 2,
    TwoCheckOne = 3,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Format)]
pub enum FlowControl {
    Off = 0,
    XonXoff = 1,
    RtsCts = 2,
}

/// TX interrupt threshold, in empty buffer slots short of 8.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Format)]
pub struct TxWatermark(pub u8);

impl TxWatermark {
    pub const ONE_SLOT_LEFT: Self = Self(7);
}

pub struct Uart1<'a, R: Registers> {
    regs: &'a mut R,
}

impl<'a, R: Registers> Uart1<'a, R> {
    pub fn new(regs: &'a mut R) -> Self {
        Self { regs }
    }

    /// 8N1, no flow control, TX and RX enabled, module left off.
    pub fn init(&mut self) {
        self.regs.write(Reg::U1(UartReg::Con), 0);
        self.regs.write(
            Reg::U1(UartReg::Con),
            Word::new()
                .with_flag(con::SLPEN, false)
                .with(con::CLKSEL, config::uart::BAUD_CLOCK as u32)
                .with_flag(con::HALFDPLX, false)
                .with(con::STP, StopBits::One as u32)
                .with(con::FLO, FlowControl::Off as u32)
                .with_flag(con::BRGS, false)
                .with_flag(con::TXEN, true)
                .with_flag(con::RXEN, true)
                .with(con::MODE, Mode::Async8Bit as u32)
                .bits(),
        );

        // status flags cleared, both buffers marked empty
        self.regs.write(Reg::U1(UartReg::Stat), 0);
        self.regs.write(
            Reg::U1(UartReg::Stat),
            Word::new()
                .with(stat::TXWM, u32::from(config::uart::TX_WATERMARK.0))
                .with(stat::RXWM, 0)
                .with_flag(stat::TXBE, true)
                .with_flag(stat::RXBE, true)
                .bits(),
        );

        self.set_baud_divisor(config::uart::BRG);
        for reg in [
            UartReg::Rxb,
            UartReg::Txb,
            UartReg::Pa,
            UartReg::Pb,
            UartReg::Chk,
            UartReg::Sccon,
            UartReg::Uir,
        ] {
            self.regs.write(Reg::U1(reg), 0);
        }

        self.disable();
    }

    pub fn set_baud_divisor(&mut self, brg: u32) {
        self.regs.write(Reg::U1(UartReg::Brg), brg);
    }

    pub fn enable(&mut self) {
        self.regs.set(Reg::U1(UartReg::Con), con::ON);
    }

    pub fn disable(&mut self) {
        self.regs.clear(Reg::U1(UartReg::Con), con::ON);
    }

    pub fn is_enabled(&mut self) -> bool {
        self.regs.is_set(Reg::U1(UartReg::Con), con::ON)
    }

    pub fn tx_watermark(&mut self) -> TxWatermark {
        #[allow(clippy::cast_possible_truncation)]
        let wm = self.regs.read_field(Reg::U1(UartReg::Stat), stat::TXWM) as u8;
        TxWatermark(wm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::regs::RegisterFile;

    #[test]
    fn init_enables_tx_rx_but_leaves_module_off() {
        let mut regs = RegisterFile::new();
        let mut uart = Uart1::new(&mut regs);
        uart.init();
        assert!(!uart.is_enabled());
        assert_eq!(uart.tx_watermark(), TxWatermark::ONE_SLOT_LEFT);
        assert_eq!(regs.peek_field(Reg::U1(UartReg::Con), con::TXEN), 1);
        assert_eq!(regs.peek_field(Reg::U1(UartReg::Con), con::RXEN), 1);
        assert_eq!(regs.peek_field(Reg::U1(UartReg::Con), con::CLKSEL), 1);
        assert_eq!(regs.peek_field(Reg::U1(UartReg::Stat), stat::RXBE), 1);
        assert_eq!(regs.peek(Reg::U1(UartReg::Brg)), 0);
    }

    #[test]
    fn enable_after_init() {
        let mut regs = RegisterFile::new();
        let mut uart = Uart1::new(&mut regs);
        uart.init();
        uart.enable();
        assert!(uart.is_enabled());
    }
}
