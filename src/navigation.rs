//! Course state machine.
//!
//! One call to [`NavigationFsm::step`] is one scheduler cycle: at most one
//! state transition and at most one motor action. The machine owns every
//! piece of memory it needs (phase timer, wall flag, line memory, steering
//! integral), so feeding it the same sensor values at the same times always
//! yields the same actions.
//!
//! | state        | leaves when                          | to                          |
//! |--------------|--------------------------------------|-----------------------------|
//! | Sense        | every cycle                          | WallAlign / ReturnPivot / FinishDock / LineFollow |
//! | LineFollow   | every cycle                          | Sense (FinishDock on finish after the obstacle) |
//! | WallAlign    | front head all black                 | PivotAway                   |
//! | PivotAway    | 2000 ms                              | Bypass                      |
//! | Bypass       | 3000 ms                              | PivotBack                   |
//! | PivotBack    | 1500 ms                              | Reapproach, wall passed     |
//! | Reapproach   | 1750 ms                              | Sense                       |
//! | FinishDock   | 2000 ms                              | BoxConfirm, docked          |
//! | BoxConfirm   | 4250 ms                              | Sense                       |
//! | ReturnPivot  | 1750 ms                              | Stopped                     |
//! | Stopped      | 3500 ms, then outputs disabled       | (terminal)                  |

use crate::config::{NavConfig, SteeringConfig};
use crate::control::steering::{line_error, LineEvent, LineMemory, SteeringController};
use crate::error::{HwError, RangeError, TaskFault};
use crate::state::{Head, LineCode, LineReading, MotionCommand};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "stm32", derive(defmt::Format))]
pub enum NavState {
    Sense,
    LineFollow,
    WallAlign,
    PivotAway,
    Bypass,
    PivotBack,
    Reapproach,
    FinishDock,
    BoxConfirm,
    ReturnPivot,
    Stopped,
}

impl NavState {
    pub fn label(self) -> &'static str {
        match self {
            Self::Sense => "sense",
            Self::LineFollow => "line_follow",
            Self::WallAlign => "wall_align",
            Self::PivotAway => "pivot_away",
            Self::Bypass => "bypass",
            Self::PivotBack => "pivot_back",
            Self::Reapproach => "reapproach",
            Self::FinishDock => "finish_dock",
            Self::BoxConfirm => "box_confirm",
            Self::ReturnPivot => "return_pivot",
            Self::Stopped => "stopped",
        }
    }

    /// Sense and LineFollow alternate every cycle; everything else is a maneuver.
    pub fn is_maneuver(self) -> bool {
        !matches!(self, Self::Sense | Self::LineFollow)
    }
}

/// How many times the course obstacle has been met.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "stm32", derive(defmt::Format))]
pub enum WallFlag {
    Clear = 0,
    PassedOnce = 1,
    Docked = 2,
}

/// What the motor owner should do after a step.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "stm32", derive(defmt::Format))]
pub enum MotorAction {
    /// Leave the motors on their last command.
    Hold,
    Drive(MotionCommand),
    /// Cut the motor outputs.
    Disable,
}

/// Sensor access needed by the state machine.
pub trait NavSensors {
    fn range_cm(&mut self) -> Result<f32, RangeError>;
    fn line(&mut self, head: Head) -> Result<LineCode, HwError>;
}

pub struct NavigationFsm {
    config: NavConfig,
    steering: SteeringController,
    decay: f32,
    memory: LineMemory,
    state: NavState,
    phase_start_ms: u64,
    wall: WallFlag,
    halted: bool,
}

impl NavigationFsm {
    pub fn new(config: NavConfig, steering: SteeringConfig) -> Self {
        Self {
            config,
            decay: steering.decay,
            steering: SteeringController::new(steering),
            memory: LineMemory::default(),
            state: NavState::Sense,
            phase_start_ms: 0,
            wall: WallFlag::Clear,
            halted: false,
        }
    }

    #[inline]
    pub fn state(&self) -> NavState {
        self.state
    }

    #[inline]
    pub fn wall(&self) -> WallFlag {
        self.wall
    }

    pub fn phase_start_ms(&self) -> u64 {
        self.phase_start_ms
    }

    pub fn line_memory(&self) -> LineMemory {
        self.memory
    }

    /// Outputs have been disabled at the end of the run.
    pub fn is_finished(&self) -> bool {
        self.halted
    }

    pub fn step<S: NavSensors>(&mut self, now_ms: u64, sensors: &mut S) -> Result<MotorAction, TaskFault> {
        let action = match self.state {
            NavState::Sense => self.sense(now_ms, sensors)?,
            NavState::LineFollow => self.line_follow(now_ms, sensors)?,
            NavState::WallAlign => {
                if sensors.line(Head::Front)? == LineCode::AllBlack {
                    self.enter(NavState::PivotAway, now_ms);
                    MotorAction::Hold
                } else {
                    MotorAction::Drive(self.config.align_turn)
                }
            }
            NavState::PivotAway => {
                self.timed(now_ms, self.config.pivot_away_ms, self.config.pivot_away, NavState::Bypass)
            }
            NavState::Bypass => {
                self.timed(now_ms, self.config.bypass_ms, self.config.bypass, NavState::PivotBack)
            }
            NavState::PivotBack => {
                let action =
                    self.timed(now_ms, self.config.pivot_back_ms, self.config.pivot_back, NavState::Reapproach);
                if self.state == NavState::Reapproach {
                    self.set_wall(WallFlag::PassedOnce);
                }
                action
            }
            NavState::Reapproach => {
                self.timed(now_ms, self.config.reapproach_ms, self.config.reapproach, NavState::Sense)
            }
            NavState::FinishDock => {
                if self.elapsed(now_ms) < self.config.finish_dock_ms {
                    MotorAction::Drive(self.config.finish_dock)
                } else {
                    self.set_wall(WallFlag::Docked);
                    self.enter(NavState::BoxConfirm, now_ms);
                    MotorAction::Drive(MotionCommand::STOP)
                }
            }
            NavState::BoxConfirm => {
                self.timed(now_ms, self.config.box_confirm_ms, self.config.box_confirm, NavState::Sense)
            }
            NavState::ReturnPivot => {
                self.timed(now_ms, self.config.return_pivot_ms, self.config.return_pivot, NavState::Stopped)
            }
            NavState::Stopped => {
                if self.halted {
                    MotorAction::Hold
                } else if self.elapsed(now_ms) < self.config.final_drive_ms {
                    MotorAction::Drive(self.config.final_drive)
                } else {
                    log_info!("course complete, motors disabled");
                    self.halted = true;
                    MotorAction::Disable
                }
            }
        };
        Ok(action)
    }

    fn sense<S: NavSensors>(&mut self, now_ms: u64, sensors: &mut S) -> Result<MotorAction, TaskFault> {
        let near = match self.average_range(sensors)? {
            Some(cm) => cm <= self.config.wall_threshold_cm,
            None => false,
        };

        let next = match (near, self.wall) {
            (true, WallFlag::Clear) => NavState::WallAlign,
            (true, WallFlag::Docked) => NavState::ReturnPivot,
            _ if self.memory.event == LineEvent::OnLine && self.wall == WallFlag::PassedOnce => {
                NavState::FinishDock
            }
            _ => NavState::LineFollow,
        };
        self.enter(next, now_ms);
        Ok(MotorAction::Hold)
    }

    fn line_follow<S: NavSensors>(&mut self, now_ms: u64, sensors: &mut S) -> Result<MotorAction, TaskFault> {
        let reading = LineReading::new(
            sensors.line(Head::Left)?,
            sensors.line(Head::Front)?,
            sensors.line(Head::Right)?,
        );
        let decision = line_error(reading, &mut self.memory, self.decay);

        if decision.finish {
            if self.wall == WallFlag::PassedOnce {
                log_info!("finish line after obstacle");
                self.enter(NavState::FinishDock, now_ms);
                return Ok(MotorAction::Hold);
            }
            log_debug!("finish candidate ignored, wall {:?}", self.wall);
        }

        let wheels = self.steering.update(decision.error);
        let cmd = MotionCommand::new(
            self.config.left_base_duty + wheels.omega_left,
            self.config.right_base_duty + wheels.omega_right,
        );
        self.enter(NavState::Sense, now_ms);
        Ok(MotorAction::Drive(cmd))
    }

    /// Mean of the configured number of readings. Timed-out readings are left
    /// out; `None` when every reading timed out.
    fn average_range<S: NavSensors>(&self, sensors: &mut S) -> Result<Option<f32>, TaskFault> {
        let mut sum = 0.0;
        let mut count = 0u32;
        for _ in 0..self.config.range_samples {
            match sensors.range_cm() {
                Ok(cm) => {
                    sum += cm;
                    count += 1;
                }
                Err(RangeError::OutOfRange) => log_debug!("range timeout"),
                Err(RangeError::Hw(e)) => return Err(e.into()),
            }
        }
        Ok(if count == 0 { None } else { Some(sum / count as f32) })
    }

    fn timed(&mut self, now_ms: u64, duration_ms: u64, cmd: MotionCommand, next: NavState) -> MotorAction {
        if self.elapsed(now_ms) < duration_ms {
            MotorAction::Drive(cmd)
        } else {
            self.enter(next, now_ms);
            MotorAction::Hold
        }
    }

    #[inline]
    fn elapsed(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.phase_start_ms)
    }

    fn enter(&mut self, next: NavState, now_ms: u64) {
        let prev = self.state;
        if prev == next {
            return;
        }
        // Line following resumes after a maneuver with a fresh integral.
        if prev.is_maneuver() && next == NavState::Sense {
            self.steering.reset();
        }
        if prev.is_maneuver() || next.is_maneuver() {
            log_info!("nav {} -> {} at {} ms", prev.label(), next.label(), now_ms);
        }
        self.state = next;
        self.phase_start_ms = now_ms;
    }

    fn set_wall(&mut self, wall: WallFlag) {
        if self.wall != wall {
            log_info!("wall flag {:?} -> {:?}", self.wall, wall);
            self.wall = wall;
        }
    }
}
