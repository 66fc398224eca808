//! Tunables for the course run and the speed bench.
//!
//! Sensor and task constants live here as `const`s; controller and
//! navigation tunables are `Default`-built structs handed to task
//! constructors, so a firmware build or a test can override a single field.

use crate::state::MotionCommand;

// ── Sensors ───────────────────────────────────────────────────────────────────

/// ADC count at or above which a reflectance channel reads black.
pub const LINE_THRESHOLD: u16 = 1500;
/// Samples captured per channel in one timed batch.
pub const LINE_SAMPLE_DEPTH: usize = 8;
/// Batch acquisition rate for the reflectance ADC timer.
pub const LINE_SAMPLE_HZ: u32 = 20_000;
/// Echo timeout: ~4 m round trip at the speed of sound.
pub const RANGE_TIMEOUT_US: u32 = 500_230;

// ── Encoder ───────────────────────────────────────────────────────────────────

pub const ENCODER_WRAP: i32 = 65_536;
pub const ENCODER_HALF: i32 = ENCODER_WRAP / 2;

// ── Task table ────────────────────────────────────────────────────────────────

pub const NAV_PERIOD_MS: u32 = 30;
pub const NAV_PRIORITY: u8 = 2;
pub const MOTOR_PERIOD_MS: u32 = 100;
pub const MOTOR_PRIORITY: u8 = 2;
pub const TELEMETRY_PERIOD_MS: u32 = 10;
pub const TELEMETRY_PRIORITY: u8 = 1;
/// Granularity of the executive loop on target.
pub const SCHEDULER_TICK_MS: u64 = 1;
/// Depth of the motor → telemetry sample queue.
pub const SAMPLE_QUEUE_DEPTH: usize = 32;
/// Records written by the telemetry task per tick.
pub const TELEMETRY_BATCH: usize = 8;

// ── Steering ──────────────────────────────────────────────────────────────────

/// Lifetime of the steering integral.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "stm32", derive(defmt::Format))]
pub enum IntegralMemory {
    /// Integral restarts every control cycle.
    PerCycle,
    /// Integral carries across cycles; cleared when line following resumes after a maneuver.
    Persistent,
}

#[derive(Clone, Copy, Debug)]
pub struct SteeringConfig {
    pub kp: f32,
    pub ki: f32,
    /// Derivative gain. Zero disables the term.
    pub kd: f32,
    /// Fraction of each error added to the integral.
    pub integral_step: f32,
    /// Decay applied to the previous error when the front head is lost.
    pub decay: f32,
    /// Forward speed target (m/s).
    pub v_target: f32,
    /// Yaw rate target (rad/s).
    pub omega_target: f32,
    pub wheel_radius_m: f32,
    pub axle_length_m: f32,
    pub integral_memory: IntegralMemory,
}

impl Default for SteeringConfig {
    fn default() -> Self {
        Self {
            kp: 1.25,
            ki: 0.2,
            kd: 0.0,
            integral_step: 0.5,
            decay: 0.8,
            v_target: 0.1,
            omega_target: 2.0,
            wheel_radius_m: 0.035,
            axle_length_m: 0.14,
            integral_memory: IntegralMemory::PerCycle,
        }
    }
}

// ── Navigation ────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug)]
pub struct NavConfig {
    /// Averaged range at or below which a wall is declared (cm).
    pub wall_threshold_cm: f32,
    /// Range readings averaged per Sense pass.
    pub range_samples: usize,
    /// Added to the left wheel output while line following. Deliberately asymmetric.
    pub left_base_duty: f32,
    /// Added to the right wheel output while line following.
    pub right_base_duty: f32,

    pub align_turn: MotionCommand,
    pub pivot_away_ms: u64,
    pub pivot_away: MotionCommand,
    pub bypass_ms: u64,
    pub bypass: MotionCommand,
    pub pivot_back_ms: u64,
    pub pivot_back: MotionCommand,
    pub reapproach_ms: u64,
    pub reapproach: MotionCommand,
    pub finish_dock_ms: u64,
    pub finish_dock: MotionCommand,
    pub box_confirm_ms: u64,
    pub box_confirm: MotionCommand,
    pub return_pivot_ms: u64,
    pub return_pivot: MotionCommand,
    pub final_drive_ms: u64,
    pub final_drive: MotionCommand,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            wall_threshold_cm: 3.0,
            range_samples: 3,
            left_base_duty: 15.0,
            right_base_duty: 8.0,

            align_turn: MotionCommand::new(-10.0, 10.0),
            pivot_away_ms: 2000,
            pivot_away: MotionCommand::new(10.0, -10.0),
            bypass_ms: 3000,
            bypass: MotionCommand::new(15.0, 15.0),
            pivot_back_ms: 1500,
            pivot_back: MotionCommand::new(-10.0, 10.0),
            reapproach_ms: 1750,
            reapproach: MotionCommand::new(25.0, 35.0),
            finish_dock_ms: 2000,
            finish_dock: MotionCommand::new(12.0, 12.0),
            box_confirm_ms: 4250,
            box_confirm: MotionCommand::new(-20.0, 20.0),
            return_pivot_ms: 1750,
            return_pivot: MotionCommand::new(-20.0, 20.0),
            final_drive_ms: 3500,
            final_drive: MotionCommand::new(20.0, 20.0),
        }
    }
}

// ── Speed loop ────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug)]
pub struct SpeedLoopConfig {
    /// Encoder counts per output shaft revolution.
    pub counts_per_rev: f32,
    /// Task period the encoder delta is measured over (ms).
    pub period_ms: u32,
    /// Controller output → duty percent.
    pub output_scale: f32,
    /// Open-loop data collection window (ms).
    pub collect_window_ms: u64,
    /// Closed-loop step response window (ms).
    pub step_response_ms: u64,
}

impl Default for SpeedLoopConfig {
    fn default() -> Self {
        Self {
            counts_per_rev: 16_384.0,
            period_ms: MOTOR_PERIOD_MS,
            output_scale: 100.0 / 250.0,
            collect_window_ms: 30_000,
            step_response_ms: 5_000,
        }
    }
}

impl SpeedLoopConfig {
    /// Encoder delta over one period → shaft speed in rpm.
    pub fn delta_to_rpm(&self, delta: i32) -> f32 {
        delta as f32 * 60_000.0 / self.counts_per_rev / self.period_ms as f32
    }
}
