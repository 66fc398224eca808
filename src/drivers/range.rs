//! HC-SR04 ultrasonic ranger.
//!
//! Each distance call fires a fresh trigger pulse and times the echo; nothing
//! is cached. A missing echo is bounded by the timeout and surfaces as
//! [`RangeError::OutOfRange`].

use crate::config::RANGE_TIMEOUT_US;
use crate::error::RangeError;
use crate::hal::{DelayUs, OutputPin, PulseInput};

const TRIGGER_SETTLE_US: u32 = 5;
const TRIGGER_PULSE_US: u32 = 10;

/// Source of distance readings.
pub trait Ranging {
    fn distance_cm(&mut self) -> Result<f32, RangeError>;
}

pub struct RangeSensor<T: OutputPin, E: PulseInput, D: DelayUs> {
    trigger: T,
    echo: E,
    delay: D,
    timeout_us: u32,
}

impl<T: OutputPin, E: PulseInput, D: DelayUs> RangeSensor<T, E, D> {
    pub fn new(trigger: T, echo: E, delay: D) -> Self {
        Self {
            trigger,
            echo,
            delay,
            timeout_us: RANGE_TIMEOUT_US,
        }
    }

    /// Fire one trigger pulse and return the echo width in microseconds.
    pub fn measure(&mut self) -> Result<u32, RangeError> {
        self.trigger.set_low()?;
        self.delay.delay_us(TRIGGER_SETTLE_US);
        self.trigger.set_high()?;
        self.delay.delay_us(TRIGGER_PULSE_US);
        self.trigger.set_low()?;

        let width = self.echo.pulse_high_us(self.timeout_us)?;
        Ok(width)
    }

    pub fn distance_mm(&mut self) -> Result<u32, RangeError> {
        Ok(pulse_to_mm(self.measure()?))
    }

    #[cfg(test)]
    pub(crate) fn parts(&self) -> (&T, &E, &D) {
        (&self.trigger, &self.echo, &self.delay)
    }
}

impl<T: OutputPin, E: PulseInput, D: DelayUs> Ranging for RangeSensor<T, E, D> {
    fn distance_cm(&mut self) -> Result<f32, RangeError> {
        Ok(pulse_to_cm(self.measure()?))
    }
}

/// Integer millimetres from a round-trip echo width.
pub fn pulse_to_mm(pulse_us: u32) -> u32 {
    pulse_us * 100 / 582
}

/// Centimetres from a round-trip echo width (29.1 µs per cm one way).
pub fn pulse_to_cm(pulse_us: u32) -> f32 {
    (pulse_us as f32 / 2.0) / 29.1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{HwError, PulseError};
    use crate::mock::{MockPin, NullDelay, ScriptedEcho};

    fn sensor<const N: usize>(echo: ScriptedEcho<N>) -> RangeSensor<MockPin, ScriptedEcho<N>, NullDelay> {
        RangeSensor::new(MockPin::default(), echo, NullDelay::default())
    }

    #[test]
    fn trigger_sequence_is_low_high_low() {
        let mut s = sensor(ScriptedEcho::<2>::new(&[Ok(1_000)]));
        s.measure().unwrap();
        let (trigger, echo, delay) = s.parts();
        assert_eq!(trigger.history.as_slice(), &[false, true, false]);
        assert_eq!(delay.calls.as_slice(), &[5, 10]);
        assert_eq!(echo.timeouts_seen.as_slice(), &[RANGE_TIMEOUT_US]);
    }

    #[test]
    fn silent_echo_is_out_of_range() {
        let mut s = sensor(ScriptedEcho::<1>::silent());
        assert_eq!(s.measure(), Err(RangeError::OutOfRange));
        assert_eq!(s.distance_cm(), Err(RangeError::OutOfRange));
        assert_eq!(s.distance_mm(), Err(RangeError::OutOfRange));
    }

    #[test]
    fn io_fault_is_not_a_timeout() {
        let mut s = sensor(ScriptedEcho::<1>::new(&[Err(PulseError::Io(HwError::Timer))]));
        assert_eq!(s.measure(), Err(RangeError::Hw(HwError::Timer)));
    }

    #[test]
    fn trigger_fault_propagates() {
        let mut s = sensor(ScriptedEcho::<1>::new(&[Ok(100)]));
        s.trigger.fail = true;
        assert_eq!(s.measure(), Err(RangeError::Hw(HwError::Gpio)));
    }

    #[test]
    fn conversions() {
        assert_eq!(pulse_to_mm(5_820), 1_000);
        assert_eq!(pulse_to_mm(581), 99);
        assert!((pulse_to_cm(582) - 10.0).abs() < 0.01);
        assert!((pulse_to_cm(174) - 2.99).abs() < 0.01);
    }

    #[test]
    fn every_call_measures_again() {
        let mut s = sensor(ScriptedEcho::<3>::new(&[Ok(582), Ok(1_164), Err(PulseError::Timeout)]));
        assert!((s.distance_cm().unwrap() - 10.0).abs() < 0.01);
        assert!((s.distance_cm().unwrap() - 20.0).abs() < 0.01);
        assert_eq!(s.distance_cm(), Err(RangeError::OutOfRange));
    }
}
