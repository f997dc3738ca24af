//! PWM/ADC bring-up for a three-phase motor-control inverter board.
//!
//! Everything the firmware does before handing over to the control loop lives here:
//! it programs the PWM generators, the ADC cores and the small collaborators
//! (comparator DAC, Timer1, UART1, GPIO) through a [`hal::regs::Registers`] bus,
//! so the same sequencing runs on the target and against [`sim::SimulatedDevice`] on a host.

#![cfg_attr(not(test), no_std)]
#![allow(
    clippy::assertions_on_constants,
    clippy::let_and_return,
    clippy::new_without_default,
    clippy::type_complexity
)]
#![warn(
    clippy::cast_lossless,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::ptr_as_ptr
)]

pub mod board;
pub mod bringup;
pub mod config;
pub mod error;
pub mod hal;
pub mod num;
pub mod sim;
pub mod time;
pub mod validate;

pub use error::Error;
