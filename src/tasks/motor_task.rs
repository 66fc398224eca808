//! Per-motor point-speed task driven by operator registers.
//!
//! | mode         | command | effect                                          |
//! |--------------|---------|-------------------------------------------------|
//! | OpenLoop     | `m`     | apply the duty register (level-triggered)        |
//! |              | `z`     | zero the encoder position                        |
//! |              | `p d v` | log position / delta / speed                     |
//! |              | `g`     | stream `(position, delta)` for the collect window |
//! |              | `c`     | switch to ClosedLoop                             |
//! | ClosedLoop   | `k s`   | acknowledge new gain / setpoint                  |
//! |              | `r`     | run a step response, streaming `(position, rpm)` |
//! |              | `o`     | switch to OpenLoop                               |
//!
//! Every command except `m` is cleared from the register once acted on.
//! A capture only ends once its end marker is queued.

use crate::config::{SpeedLoopConfig, SAMPLE_QUEUE_DEPTH};
use crate::control::speed::{output_to_duty, ClosedLoopSpeedController};
use crate::drivers::encoder::QuadratureEncoder;
use crate::drivers::motor::DutyOutput;
use crate::error::{HwError, TaskFault};
use crate::hal::TickCounter;
use crate::scheduler::Task;
use crate::share::{Queue, Share};
use crate::state::TelemetryRecord;

pub const COLLECT_END: u8 = b'!';
pub const STEP_RESPONSE_END: u8 = b'$';

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "stm32", derive(defmt::Format))]
pub enum OperatorCommand {
    Duty,
    Zero,
    Position,
    Delta,
    Velocity,
    Collect,
    CloseLoop,
    Gain,
    Setpoint,
    StepResponse,
    OpenLoop,
}

impl OperatorCommand {
    pub fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            b'm' => Self::Duty,
            b'z' => Self::Zero,
            b'p' => Self::Position,
            b'd' => Self::Delta,
            b'v' => Self::Velocity,
            b'g' => Self::Collect,
            b'c' => Self::CloseLoop,
            b'k' => Self::Gain,
            b's' => Self::Setpoint,
            b'r' => Self::StepResponse,
            b'o' => Self::OpenLoop,
            _ => return None,
        })
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Self::Duty => b'm',
            Self::Zero => b'z',
            Self::Position => b'p',
            Self::Delta => b'd',
            Self::Velocity => b'v',
            Self::Collect => b'g',
            Self::CloseLoop => b'c',
            Self::Gain => b'k',
            Self::Setpoint => b's',
            Self::StepResponse => b'r',
            Self::OpenLoop => b'o',
        }
    }
}

/// Registers written by the operator console and read by one motor task.
pub struct OperatorLink {
    /// Command byte, 0 when idle.
    pub command: Share<u8>,
    /// Open-loop duty percent.
    pub duty: Share<i32>,
    pub gain: Share<f32>,
    /// Speed setpoint (rpm).
    pub setpoint: Share<i32>,
    /// Published by the task: 0 open loop, 1 closed loop.
    pub open_closed: Share<u8>,
}

impl OperatorLink {
    pub const fn new() -> Self {
        Self {
            command: Share::new(0),
            duty: Share::new(0),
            gain: Share::new(0.0),
            setpoint: Share::new(0),
            open_closed: Share::new(0),
        }
    }

    pub fn send(&self, cmd: OperatorCommand) {
        self.command.put(cmd.as_byte());
    }
}

impl Default for OperatorLink {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "stm32", derive(defmt::Format))]
pub enum MotorMode {
    OpenLoop,
    Collect,
    ClosedLoop,
    StepResponse,
}

impl MotorMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::OpenLoop => "open_loop",
            Self::Collect => "collect",
            Self::ClosedLoop => "closed_loop",
            Self::StepResponse => "step_response",
        }
    }
}

pub struct MotorTask<'a, C: TickCounter, M: DutyOutput> {
    name: &'static str,
    encoder: QuadratureEncoder<C>,
    motor: M,
    link: &'a OperatorLink,
    samples: &'a Queue<TelemetryRecord, SAMPLE_QUEUE_DEPTH>,
    controller: ClosedLoopSpeedController,
    config: SpeedLoopConfig,
    mode: MotorMode,
    phase_start_ms: u64,
    dropped: u32,
}

impl<'a, C: TickCounter, M: DutyOutput> MotorTask<'a, C, M> {
    /// Starts in open loop with the motor enabled at zero duty.
    pub fn new(
        name: &'static str,
        encoder: QuadratureEncoder<C>,
        mut motor: M,
        link: &'a OperatorLink,
        samples: &'a Queue<TelemetryRecord, SAMPLE_QUEUE_DEPTH>,
        config: SpeedLoopConfig,
    ) -> Result<Self, HwError> {
        motor.set_duty(0.0)?;
        motor.enable()?;
        link.open_closed.put(0);
        Ok(Self {
            name,
            encoder,
            motor,
            link,
            samples,
            controller: ClosedLoopSpeedController::new(),
            config,
            mode: MotorMode::OpenLoop,
            phase_start_ms: 0,
            dropped: 0,
        })
    }

    #[inline]
    pub fn mode(&self) -> MotorMode {
        self.mode
    }

    pub fn encoder(&self) -> &QuadratureEncoder<C> {
        &self.encoder
    }

    pub fn motor(&self) -> &M {
        &self.motor
    }

    /// Records lost to a full sample queue.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    /// Current shaft speed from the last encoder delta (rpm).
    pub fn speed_rpm(&self) -> f32 {
        self.config.delta_to_rpm(self.encoder.delta())
    }

    fn open_loop(&mut self, cmd: Option<OperatorCommand>, now_ms: u64) -> Result<(), HwError> {
        match cmd {
            Some(OperatorCommand::Duty) => self.motor.set_duty(self.link.duty.get() as f32)?,
            Some(OperatorCommand::Zero) => {
                self.encoder.zero();
                self.consume();
            }
            Some(OperatorCommand::Position) => {
                log_info!("{} position {}", self.name, self.encoder.position());
                self.consume();
            }
            Some(OperatorCommand::Delta) => {
                log_info!("{} delta {}", self.name, self.encoder.delta());
                self.consume();
            }
            Some(OperatorCommand::Velocity) => {
                log_info!("{} speed {} rpm", self.name, self.speed_rpm());
                self.consume();
            }
            Some(OperatorCommand::Collect) => {
                self.consume();
                self.enter(MotorMode::Collect, now_ms);
            }
            Some(OperatorCommand::CloseLoop) => {
                self.consume();
                self.enter(MotorMode::ClosedLoop, now_ms);
            }
            _ => {}
        }
        Ok(())
    }

    fn closed_loop(&mut self, cmd: Option<OperatorCommand>, now_ms: u64) {
        match cmd {
            Some(OperatorCommand::Gain) => {
                log_info!("{} gain {}", self.name, self.link.gain.get());
                self.consume();
            }
            Some(OperatorCommand::Setpoint) => {
                log_info!("{} setpoint {} rpm", self.name, self.link.setpoint.get());
                self.consume();
            }
            Some(OperatorCommand::StepResponse) => {
                self.consume();
                self.enter(MotorMode::StepResponse, now_ms);
            }
            Some(OperatorCommand::OpenLoop) => {
                self.consume();
                self.enter(MotorMode::OpenLoop, now_ms);
            }
            _ => {}
        }
    }

    fn consume(&self) {
        self.link.command.put(0);
    }

    fn record(&mut self, record: TelemetryRecord) {
        if self.samples.try_put(record).is_err() {
            if self.dropped == 0 {
                log_warn!("{} sample queue full", self.name);
            }
            self.dropped += 1;
        }
    }

    /// Queue the end marker of a capture. A full queue leaves the task in
    /// the capture mode so the marker is retried next tick.
    fn end_capture(&mut self, marker: u8) -> bool {
        if self.samples.try_put(TelemetryRecord::End(marker)).is_ok() {
            return true;
        }
        log_warn!("{} end marker waiting for queue space", self.name);
        false
    }

    fn enter(&mut self, mode: MotorMode, now_ms: u64) {
        log_info!("{} {} -> {}", self.name, self.mode.label(), mode.label());
        self.mode = mode;
        self.phase_start_ms = now_ms;
        let closed = matches!(mode, MotorMode::ClosedLoop | MotorMode::StepResponse);
        self.link.open_closed.put(closed as u8);
    }

    #[inline]
    fn elapsed(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.phase_start_ms)
    }
}

impl<'a, C: TickCounter, M: DutyOutput> Task for MotorTask<'a, C, M> {
    fn step(&mut self, now_ms: u64) -> Result<&'static str, TaskFault> {
        self.encoder.update();
        let cmd = OperatorCommand::from_byte(self.link.command.get());

        match self.mode {
            MotorMode::OpenLoop => self.open_loop(cmd, now_ms)?,
            MotorMode::Collect => {
                if self.elapsed(now_ms) < self.config.collect_window_ms {
                    self.record(TelemetryRecord::Sample {
                        position: self.encoder.position(),
                        value: self.encoder.delta() as f32,
                    });
                } else if self.end_capture(COLLECT_END) {
                    self.enter(MotorMode::OpenLoop, now_ms);
                }
            }
            MotorMode::ClosedLoop => self.closed_loop(cmd, now_ms),
            MotorMode::StepResponse => {
                let speed = self.speed_rpm();
                if self.elapsed(now_ms) < self.config.step_response_ms {
                    self.record(TelemetryRecord::Sample {
                        position: self.encoder.position(),
                        value: speed,
                    });
                    let output = self.controller.update(
                        speed,
                        self.link.gain.get(),
                        self.link.setpoint.get() as f32,
                    );
                    self.motor.set_duty(output_to_duty(output, self.config.output_scale))?;
                } else {
                    self.motor.set_duty(0.0)?;
                    if self.end_capture(STEP_RESPONSE_END) {
                        self.enter(MotorMode::ClosedLoop, now_ms);
                    }
                }
            }
        }
        Ok(self.mode.label())
    }

    fn shutdown(&mut self) {
        let _ = self.motor.set_duty(0.0);
        let _ = self.motor.disable();
        log_info!("{} stopped", self.name);
    }
}
