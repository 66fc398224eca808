//! In-memory hardware for host tests and simulation.
//!
//! Always compiled (no_std, no allocation) so integration tests and
//! downstream simulations can reuse them.

use heapless::Vec;

use crate::error::{HwError, PulseError, RangeError};
use crate::hal::{DelayUs, OutputPin, PulseInput, PwmChannel, SerialTx, TickCounter, TimedAdcPair};
use crate::navigation::NavSensors;
use crate::state::{Head, LineCode, LineReading};

// ── PWM / GPIO ────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MockPwm {
    pub percent: f32,
    pub writes: u32,
    pub fail: bool,
}

impl PwmChannel for MockPwm {
    fn set_percent(&mut self, percent: f32) -> Result<(), HwError> {
        if self.fail {
            return Err(HwError::Pwm);
        }
        self.percent = percent;
        self.writes += 1;
        Ok(())
    }
}

/// Output pin that remembers its level and every level it was driven to.
#[derive(Debug, Default)]
pub struct MockPin {
    pub high: bool,
    pub history: Vec<bool, 32>,
    pub fail: bool,
}

impl MockPin {
    fn drive(&mut self, level: bool) -> Result<(), HwError> {
        if self.fail {
            return Err(HwError::Gpio);
        }
        self.high = level;
        let _ = self.history.push(level);
        Ok(())
    }
}

impl OutputPin for MockPin {
    fn set_high(&mut self) -> Result<(), HwError> {
        self.drive(true)
    }

    fn set_low(&mut self) -> Result<(), HwError> {
        self.drive(false)
    }
}

#[derive(Debug, Default)]
pub struct NullDelay {
    pub total_us: u64,
    pub calls: Vec<u32, 32>,
}

impl DelayUs for NullDelay {
    fn delay_us(&mut self, us: u32) {
        self.total_us += us as u64;
        let _ = self.calls.push(us);
    }
}

// ── Encoder counters ──────────────────────────────────────────────────────────

/// Returns the scripted values in order, then repeats the last one.
#[derive(Debug)]
pub struct ScriptedCounter<const N: usize> {
    values: Vec<u16, N>,
    next: usize,
}

impl<const N: usize> ScriptedCounter<N> {
    pub fn new(values: &[u16]) -> Self {
        let mut v = Vec::new();
        for &x in values.iter().take(N) {
            let _ = v.push(x);
        }
        Self { values: v, next: 0 }
    }
}

impl<const N: usize> TickCounter for ScriptedCounter<N> {
    fn count(&mut self) -> u16 {
        let i = self.next.min(self.values.len().saturating_sub(1));
        self.next += 1;
        self.values.get(i).copied().unwrap_or(0)
    }
}

/// Counter moving a fixed number of ticks between reads, wrapping like the
/// hardware timer.
#[derive(Debug)]
pub struct RampCounter {
    pub value: u16,
    pub step: i16,
}

impl RampCounter {
    pub fn new(start: u16, step: i16) -> Self {
        Self { value: start, step }
    }
}

impl TickCounter for RampCounter {
    fn count(&mut self) -> u16 {
        let now = self.value;
        self.value = self.value.wrapping_add_signed(self.step);
        now
    }
}

// ── Echo / ADC ────────────────────────────────────────────────────────────────

/// Replays scripted echo results, then repeats the last one.
#[derive(Debug)]
pub struct ScriptedEcho<const N: usize> {
    results: Vec<Result<u32, PulseError>, N>,
    next: usize,
    pub timeouts_seen: Vec<u32, 8>,
}

impl<const N: usize> ScriptedEcho<N> {
    pub fn new(results: &[Result<u32, PulseError>]) -> Self {
        let mut v = Vec::new();
        for &r in results.iter().take(N) {
            let _ = v.push(r);
        }
        Self {
            results: v,
            next: 0,
            timeouts_seen: Vec::new(),
        }
    }

    /// An echo line that never goes high.
    pub fn silent() -> Self {
        Self::new(&[Err(PulseError::Timeout)])
    }
}

impl<const N: usize> PulseInput for ScriptedEcho<N> {
    fn pulse_high_us(&mut self, timeout_us: u32) -> Result<u32, PulseError> {
        let _ = self.timeouts_seen.push(timeout_us);
        let i = self.next.min(self.results.len().saturating_sub(1));
        self.next += 1;
        self.results.get(i).copied().unwrap_or(Err(PulseError::Timeout))
    }
}

/// Fills both buffers with fixed channel values.
#[derive(Debug, Default)]
pub struct ScriptedAdc {
    pub right: u16,
    pub left: u16,
    pub fail: bool,
    pub batches: u32,
}

impl ScriptedAdc {
    pub fn new(right: u16, left: u16) -> Self {
        Self {
            right,
            left,
            ..Self::default()
        }
    }
}

impl TimedAdcPair for ScriptedAdc {
    fn read_timed(&mut self, right: &mut [u16], left: &mut [u16]) -> Result<(), HwError> {
        if self.fail {
            return Err(HwError::Adc);
        }
        right.fill(self.right);
        left.fill(self.left);
        self.batches += 1;
        Ok(())
    }
}

// ── Serial ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MockSerial {
    pub out: Vec<u8, 4096>,
    pub fail: bool,
}

impl MockSerial {
    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.out).unwrap_or("")
    }
}

impl SerialTx for MockSerial {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), HwError> {
        if self.fail {
            return Err(HwError::Serial);
        }
        self.out.extend_from_slice(bytes).map_err(|_| HwError::Serial)
    }
}

// ── Course ────────────────────────────────────────────────────────────────────

/// Scripted ranger plus three line heads for driving the navigation machine.
///
/// Ranges come from the script when one is set (last entry repeats),
/// otherwise every call returns `range_cm`.
#[derive(Debug)]
pub struct ScriptedCourse {
    pub range_cm: f32,
    pub reading: LineReading,
    pub line_fault: Option<HwError>,
    pub range_calls: u32,
    ranges: Vec<Result<f32, RangeError>, 16>,
    next_range: usize,
}

impl ScriptedCourse {
    pub fn new(range_cm: f32, reading: LineReading) -> Self {
        Self {
            range_cm,
            reading,
            line_fault: None,
            range_calls: 0,
            ranges: Vec::new(),
            next_range: 0,
        }
    }

    pub fn script_ranges(&mut self, ranges: &[Result<f32, RangeError>]) {
        self.ranges.clear();
        for &r in ranges.iter().take(16) {
            let _ = self.ranges.push(r);
        }
        self.next_range = 0;
    }

    /// Drop any script and return a fixed distance from now on.
    pub fn set_range(&mut self, range_cm: f32) {
        self.ranges.clear();
        self.range_cm = range_cm;
    }
}

impl NavSensors for ScriptedCourse {
    fn range_cm(&mut self) -> Result<f32, RangeError> {
        self.range_calls += 1;
        if self.ranges.is_empty() {
            return Ok(self.range_cm);
        }
        let i = self.next_range.min(self.ranges.len() - 1);
        self.next_range += 1;
        self.ranges[i]
    }

    fn line(&mut self, head: Head) -> Result<LineCode, HwError> {
        if let Some(e) = self.line_fault {
            return Err(e);
        }
        Ok(match head {
            Head::Left => self.reading.left,
            Head::Front => self.reading.front,
            Head::Right => self.reading.right,
        })
    }
}
