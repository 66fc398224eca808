/// PI speed loop for one motor. The integral persists for the controller's
/// lifetime; gain and setpoint are supplied on every call so an operator can
/// retune between updates.
pub struct ClosedLoopSpeedController {
    integral_step: f32,
    integral: f32,
    last_error: f32,
}

impl ClosedLoopSpeedController {
    pub fn new() -> Self {
        Self {
            integral_step: 0.5,
            integral: 0.0,
            last_error: 0.0,
        }
    }

    /// One control step. Returns the raw controller output (rpm units).
    pub fn update(&mut self, measured: f32, gain: f32, setpoint: f32) -> f32 {
        let error = setpoint - measured;
        self.integral += self.integral_step * error;
        self.last_error = error;
        gain * error + self.integral
    }

    #[inline]
    pub fn integral(&self) -> f32 {
        self.integral
    }

    #[inline]
    pub fn last_error(&self) -> f32 {
        self.last_error
    }
}

impl Default for ClosedLoopSpeedController {
    fn default() -> Self {
        Self::new()
    }
}

/// Scale a controller output to a duty percentage, clamped on both sides.
pub fn output_to_duty(output: f32, scale: f32) -> f32 {
    (output * scale).clamp(-100.0, 100.0)
}
