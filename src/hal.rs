//! Register-level drivers for the peripherals the inverter board uses.
//!
//! Drivers never touch memory directly: every access goes through [`regs::Registers`],
//! which the target implements over its special function registers and the host
//! implements over [`crate::sim::SimulatedDevice`].

pub mod adc;
pub mod clock;
pub mod cmp;
pub mod gpio;
pub mod irq;
pub mod pwm;
pub mod regs;
pub mod tim;
pub mod uart;
