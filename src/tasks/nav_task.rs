use crate::drivers::line::LineHead;
use crate::drivers::motor::{apply, DutyOutput};
use crate::drivers::range::Ranging;
use crate::error::{HwError, RangeError, TaskFault};
use crate::navigation::{MotorAction, NavSensors, NavigationFsm};
use crate::scheduler::Task;
use crate::state::{Head, LineCode, MotionCommand};

/// Ranger plus the three reflectance heads around the chassis.
pub struct CourseSensors<R: Ranging, H: LineHead> {
    pub range: R,
    pub left: H,
    pub front: H,
    pub right: H,
}

impl<R: Ranging, H: LineHead> NavSensors for CourseSensors<R, H> {
    fn range_cm(&mut self) -> Result<f32, RangeError> {
        self.range.distance_cm()
    }

    fn line(&mut self, head: Head) -> Result<LineCode, HwError> {
        match head {
            Head::Left => self.left.read_line(),
            Head::Front => self.front.read_line(),
            Head::Right => self.right.read_line(),
        }
    }
}

/// Owns the course machine, its sensors and both drive motors.
pub struct NavTask<R: Ranging, H: LineHead, M: DutyOutput> {
    fsm: NavigationFsm,
    sensors: CourseSensors<R, H>,
    left: M,
    right: M,
    last_command: MotionCommand,
}

impl<R: Ranging, H: LineHead, M: DutyOutput> NavTask<R, H, M> {
    /// Motors are enabled at zero duty.
    pub fn new(fsm: NavigationFsm, sensors: CourseSensors<R, H>, mut left: M, mut right: M) -> Result<Self, HwError> {
        left.set_duty(0.0)?;
        right.set_duty(0.0)?;
        left.enable()?;
        right.enable()?;
        Ok(Self {
            fsm,
            sensors,
            left,
            right,
            last_command: MotionCommand::STOP,
        })
    }

    pub fn fsm(&self) -> &NavigationFsm {
        &self.fsm
    }

    /// Last command sent to the motors.
    pub fn last_command(&self) -> MotionCommand {
        self.last_command
    }

    pub fn sensors_mut(&mut self) -> &mut CourseSensors<R, H> {
        &mut self.sensors
    }

    pub fn motors(&self) -> (&M, &M) {
        (&self.left, &self.right)
    }
}

impl<R: Ranging, H: LineHead, M: DutyOutput> Task for NavTask<R, H, M> {
    fn step(&mut self, now_ms: u64) -> Result<&'static str, TaskFault> {
        match self.fsm.step(now_ms, &mut self.sensors)? {
            MotorAction::Hold => {}
            MotorAction::Drive(cmd) => {
                apply(&mut self.left, &mut self.right, cmd)?;
                self.last_command = cmd;
            }
            MotorAction::Disable => {
                self.left.disable()?;
                self.right.disable()?;
                self.last_command = MotionCommand::STOP;
            }
        }
        Ok(self.fsm.state().label())
    }

    fn shutdown(&mut self) {
        // Errors ignored so every channel is still attempted.
        let _ = self.left.set_duty(0.0);
        let _ = self.right.set_duty(0.0);
        let _ = self.left.disable();
        let _ = self.right.disable();
        self.last_command = MotionCommand::STOP;
        log_info!("nav task stopped in {}", self.fsm.state().label());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{NavConfig, SteeringConfig};
    use crate::drivers::line::LineSensorArray;
    use crate::drivers::motor::MotorDriver;
    use crate::drivers::range::RangeSensor;
    use crate::error::PulseError;
    use crate::mock::{MockPin, MockPwm, NullDelay, ScriptedAdc, ScriptedEcho};
    use crate::navigation::NavState;

    type Motor = MotorDriver<MockPwm, MockPin, MockPin>;
    type Ranger = RangeSensor<MockPin, ScriptedEcho<4>, NullDelay>;
    type Reflect = LineSensorArray<ScriptedAdc>;

    const BLACK: u16 = 3_000;

    fn motor() -> Motor {
        MotorDriver::new(MockPwm::default(), MockPin::default(), MockPin::default()).unwrap()
    }

    fn task(echo_us: Result<u32, PulseError>) -> NavTask<Ranger, Reflect, Motor> {
        let sensors = CourseSensors {
            range: RangeSensor::new(MockPin::default(), ScriptedEcho::new(&[echo_us]), NullDelay::default()),
            left: LineSensorArray::new(ScriptedAdc::new(BLACK, BLACK)),
            front: LineSensorArray::new(ScriptedAdc::new(BLACK, BLACK)),
            right: LineSensorArray::new(ScriptedAdc::new(BLACK, BLACK)),
        };
        let fsm = NavigationFsm::new(NavConfig::default(), SteeringConfig::default());
        NavTask::new(fsm, sensors, motor(), motor()).unwrap()
    }

    #[test]
    fn new_enables_motors_at_zero_duty() {
        let t = task(Ok(5_820));
        let (l, r) = t.motors();
        assert_eq!(l.duty(), 0.0);
        assert_eq!(r.duty(), 0.0);
        assert!(l.parts().2.high);
        assert!(r.parts().2.high);
    }

    #[test]
    fn follow_cycle_drives_both_wheels() {
        let mut t = task(Ok(5_820));
        assert_eq!(t.step(0).unwrap(), "line_follow");
        assert_eq!(t.step(30).unwrap(), "sense");

        let cmd = t.last_command();
        let (l, r) = t.motors();
        assert_eq!(l.duty(), cmd.left_duty);
        assert_eq!(r.duty(), cmd.right_duty);
        assert!(cmd.left_duty > 0.0 && cmd.right_duty > 0.0);
    }

    #[test]
    fn close_echo_starts_wall_alignment() {
        // 116 µs round trip is just under 2 cm.
        let mut t = task(Ok(116));
        assert_eq!(t.step(0).unwrap(), "wall_align");
        assert_eq!(t.fsm().state(), NavState::WallAlign);
    }

    #[test]
    fn shutdown_disables_outputs() {
        let mut t = task(Ok(5_820));
        t.step(0).unwrap();
        t.step(30).unwrap();
        t.shutdown();
        let (l, r) = t.motors();
        assert_eq!(l.duty(), 0.0);
        assert!(!l.parts().2.high);
        assert!(!r.parts().2.high);
    }

    #[test]
    fn adc_fault_surfaces_as_task_fault() {
        let mut t = task(Ok(5_820));
        t.step(0).unwrap();
        t.sensors_mut().front.adc_mut().fail = true;
        assert_eq!(t.step(30), Err(TaskFault::Hardware(HwError::Adc)));
    }
}
