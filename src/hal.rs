//! Hardware boundary.
//!
//! The firmware implements these on embassy-stm32 peripherals; the [`mock`](crate::mock)
//! module implements them for host tests.

use crate::error::{HwError, PulseError};

/// Free-running 16-bit quadrature counter (timer in encoder mode).
pub trait TickCounter {
    fn count(&mut self) -> u16;
}

/// One PWM output channel.
pub trait PwmChannel {
    /// `percent` is in `[0, 100]`.
    fn set_percent(&mut self, percent: f32) -> Result<(), HwError>;
}

pub trait OutputPin {
    fn set_high(&mut self) -> Result<(), HwError>;
    fn set_low(&mut self) -> Result<(), HwError>;
}

pub trait DelayUs {
    fn delay_us(&mut self, us: u32);
}

/// Times how long an input stays high, giving up after `timeout_us`.
pub trait PulseInput {
    fn pulse_high_us(&mut self, timeout_us: u32) -> Result<u32, PulseError>;
}

/// Timed batch acquisition of the two analog channels of a reflectance head.
pub trait TimedAdcPair {
    fn read_timed(&mut self, right: &mut [u16], left: &mut [u16]) -> Result<(), HwError>;
}

impl<T: TimedAdcPair + ?Sized> TimedAdcPair for &mut T {
    fn read_timed(&mut self, right: &mut [u16], left: &mut [u16]) -> Result<(), HwError> {
        (**self).read_timed(right, left)
    }
}

pub trait SerialTx {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), HwError>;
}
