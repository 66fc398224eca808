//! Error types shared by drivers and tasks.

use core::fmt;

/// Hardware I/O fault unrelated to a sensor timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "stm32", derive(defmt::Format))]
pub enum HwError {
    Gpio,
    Pwm,
    Adc,
    Timer,
    Serial,
}

impl fmt::Display for HwError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self {
            Self::Gpio => "gpio",
            Self::Pwm => "pwm",
            Self::Adc => "adc",
            Self::Timer => "timer",
            Self::Serial => "serial",
        };
        write!(f, "{} fault", what)
    }
}

/// Failure of the echo pulse-timing primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "stm32", derive(defmt::Format))]
pub enum PulseError {
    /// No complete pulse within the timeout.
    Timeout,
    Io(HwError),
}

impl From<HwError> for PulseError {
    fn from(e: HwError) -> Self {
        Self::Io(e)
    }
}

/// Ranging failure. `OutOfRange` is recoverable; `Hw` is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "stm32", derive(defmt::Format))]
pub enum RangeError {
    OutOfRange,
    Hw(HwError),
}

impl From<HwError> for RangeError {
    fn from(e: HwError) -> Self {
        Self::Hw(e)
    }
}

impl From<PulseError> for RangeError {
    fn from(e: PulseError) -> Self {
        match e {
            PulseError::Timeout => Self::OutOfRange,
            PulseError::Io(hw) => Self::Hw(hw),
        }
    }
}

impl fmt::Display for RangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange => f.write_str("out of range"),
            Self::Hw(e) => write!(f, "ranging {}", e),
        }
    }
}

/// Fault that ends a task. The executive disables motors before tearing down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "stm32", derive(defmt::Format))]
pub enum TaskFault {
    Hardware(HwError),
}

impl From<HwError> for TaskFault {
    fn from(e: HwError) -> Self {
        Self::Hardware(e)
    }
}

impl fmt::Display for TaskFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hardware(e) => write!(f, "hardware {}", e),
        }
    }
}
