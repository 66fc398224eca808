//! L6206-style brushed motor channel: PWM magnitude, direction pin, enable pin.
//!
//! | duty   | PWM      | DIR  |
//! |--------|----------|------|
//! | `>= 0` | `duty`   | low  |
//! | `< 0`  | `-duty`  | high |
//!
//! Magnitudes above 100 % saturate at the PWM and are reported once per
//! saturation episode.

use crate::error::HwError;
use crate::hal::{OutputPin, PwmChannel};
use crate::state::{MotionCommand, DUTY_LIMIT};

/// Anything that accepts a signed duty command.
pub trait DutyOutput {
    fn set_duty(&mut self, duty: f32) -> Result<(), HwError>;
    fn enable(&mut self) -> Result<(), HwError>;
    fn disable(&mut self) -> Result<(), HwError>;
}

pub struct MotorDriver<P: PwmChannel, D: OutputPin, E: OutputPin> {
    pwm: P,
    dir: D,
    en: E,
    duty: f32,
    saturated: bool,
}

impl<P: PwmChannel, D: OutputPin, E: OutputPin> MotorDriver<P, D, E> {
    /// Starts forward at zero duty, outputs disabled.
    pub fn new(mut pwm: P, mut dir: D, mut en: E) -> Result<Self, HwError> {
        en.set_low()?;
        dir.set_low()?;
        pwm.set_percent(0.0)?;
        Ok(Self {
            pwm,
            dir,
            en,
            duty: 0.0,
            saturated: false,
        })
    }

    /// Last duty requested, before saturation.
    pub fn duty(&self) -> f32 {
        self.duty
    }

    #[cfg(test)]
    pub(crate) fn parts(&self) -> (&P, &D, &E) {
        (&self.pwm, &self.dir, &self.en)
    }
}

impl<P: PwmChannel, D: OutputPin, E: OutputPin> DutyOutput for MotorDriver<P, D, E> {
    fn set_duty(&mut self, duty: f32) -> Result<(), HwError> {
        self.duty = duty;
        let magnitude = if duty < 0.0 { -duty } else { duty };

        if magnitude > DUTY_LIMIT {
            if !self.saturated {
                log_warn!("duty {} saturated at {}", duty, DUTY_LIMIT);
            }
            self.saturated = true;
        } else {
            self.saturated = false;
        }

        self.pwm.set_percent(magnitude.min(DUTY_LIMIT))?;
        if duty < 0.0 {
            self.dir.set_high()
        } else {
            self.dir.set_low()
        }
    }

    fn enable(&mut self) -> Result<(), HwError> {
        self.en.set_high()
    }

    fn disable(&mut self) -> Result<(), HwError> {
        self.en.set_low()
    }
}

/// Send a left/right command to a motor pair.
pub fn apply<L: DutyOutput, R: DutyOutput>(
    left: &mut L,
    right: &mut R,
    cmd: MotionCommand,
) -> Result<(), HwError> {
    left.set_duty(cmd.left_duty)?;
    right.set_duty(cmd.right_duty)
}
