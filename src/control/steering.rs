//! Line steering: three head codes → signed error → wheel angular-velocity targets.
//!
//! The error rules are evaluated in a fixed order, first match wins:
//!
//! | # | condition                                   | error        | event          |
//! |---|---------------------------------------------|--------------|----------------|
//! | 1 | all heads black                             | 0            | `OnLine`       |
//! | 2 | all heads white                             | 0            | `AllWhite` / finish |
//! | 3 | front left-white, right head right-white    | +5           | `SharpPending` |
//! | 4 | front right-white, left head left-white     | −5           | `SharpPending` |
//! | 5 | left head right-white                       | −8           | `Edge`         |
//! | 6 | right head left-white                       | +8           | `Edge`         |
//! | 7 | front right-white                           | −2           | unchanged      |
//! | 8 | front left-white                            | +2           | unchanged      |
//! | 9 | anything else                               | decay × prev | unchanged      |
//!
//! `prev` is the last rule-9 error, not the last error of any rule.
//!
//! Rule 2 raises a finish candidate instead of tagging `AllWhite` when the
//! last tagged event was `OnLine`.

use crate::config::{IntegralMemory, SteeringConfig};
use crate::state::{LineCode, LineReading};

/// Last classification tagged by the error rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "stm32", derive(defmt::Format))]
pub enum LineEvent {
    #[default]
    None,
    /// Solid line under every head.
    OnLine,
    /// Background under every head, not preceded by `OnLine`.
    AllWhite,
    SharpPending,
    Edge,
}

/// Memory the error rules carry between line-following cycles.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct LineMemory {
    pub event: LineEvent,
    /// Last error produced by rule 9; only rule 9 reads or writes it.
    pub previous_error: f32,
}

/// Result of one pass of the error rules.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineDecision {
    pub error: f32,
    /// Solid line followed by solid background: course end reached.
    pub finish: bool,
}

/// Evaluate the error rules for one reading, updating `memory`.
pub fn line_error(reading: LineReading, memory: &mut LineMemory, decay: f32) -> LineDecision {
    let LineReading { left, front, right } = reading;
    let mut finish = false;

    let error = if reading.all(LineCode::AllBlack) {
        memory.event = LineEvent::OnLine;
        0.0
    } else if reading.all(LineCode::AllWhite) {
        if memory.event == LineEvent::OnLine {
            finish = true;
        } else {
            memory.event = LineEvent::AllWhite;
        }
        0.0
    } else if front == LineCode::LeftWhite && right.right_white() {
        memory.event = LineEvent::SharpPending;
        5.0
    } else if front == LineCode::RightWhite && left.left_white() {
        memory.event = LineEvent::SharpPending;
        -5.0
    } else if left.right_white() {
        memory.event = LineEvent::Edge;
        -8.0
    } else if right.left_white() {
        memory.event = LineEvent::Edge;
        8.0
    } else if front == LineCode::RightWhite {
        -2.0
    } else if front == LineCode::LeftWhite {
        2.0
    } else {
        let decayed = decay * memory.previous_error;
        memory.previous_error = decayed;
        decayed
    };

    LineDecision { error, finish }
}

/// Left/right wheel angular-velocity targets (rad/s).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WheelTargets {
    pub omega_left: f32,
    pub omega_right: f32,
}

/// PI(D) law on the steering error plus the differential-drive feed-forward.
pub struct SteeringController {
    config: SteeringConfig,
    integral: f32,
    last_error: f32,
}

impl SteeringController {
    pub fn new(config: SteeringConfig) -> Self {
        Self {
            config,
            integral: 0.0,
            last_error: 0.0,
        }
    }

    pub fn update(&mut self, error: f32) -> WheelTargets {
        if self.config.integral_memory == IntegralMemory::PerCycle {
            self.reset();
        }
        let c = &self.config;

        self.integral += c.integral_step * error;
        let derivative = error - self.last_error;
        self.last_error = error;

        let output = c.kp * error + c.ki * self.integral + c.kd * derivative;
        let (base_left, base_right) = self.feed_forward();

        WheelTargets {
            omega_left: base_left - output,
            omega_right: base_right + output,
        }
    }

    /// Wheel speeds for the target forward speed and yaw rate with no error.
    pub fn feed_forward(&self) -> (f32, f32) {
        let c = &self.config;
        let half_track = c.axle_length_m * c.omega_target / 2.0;
        (
            (c.v_target - half_track) / c.wheel_radius_m,
            (c.v_target + half_track) / c.wheel_radius_m,
        )
    }

    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.last_error = 0.0;
    }

    #[inline]
    pub fn integral(&self) -> f32 {
        self.integral
    }

    pub fn config(&self) -> &SteeringConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::LineCode::*;

    const DECAY: f32 = 0.8;

    fn reading(left: LineCode, front: LineCode, right: LineCode) -> LineReading {
        LineReading::new(left, front, right)
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn all_black_is_on_line() {
        let mut mem = LineMemory::default();
        let d = line_error(reading(AllBlack, AllBlack, AllBlack), &mut mem, DECAY);
        assert_eq!(d.error, 0.0);
        assert!(!d.finish);
        assert_eq!(mem.event, LineEvent::OnLine);
    }

    #[test]
    fn all_white_after_all_black_is_a_finish_candidate() {
        let mut mem = LineMemory::default();
        line_error(reading(AllBlack, AllBlack, AllBlack), &mut mem, DECAY);
        let d = line_error(reading(AllWhite, AllWhite, AllWhite), &mut mem, DECAY);
        assert!(d.finish);
        assert_eq!(d.error, 0.0);
        assert_eq!(mem.event, LineEvent::OnLine);
    }

    #[test]
    fn all_white_without_line_memory_just_tags() {
        let mut mem = LineMemory::default();
        let d = line_error(reading(AllWhite, AllWhite, AllWhite), &mut mem, DECAY);
        assert!(!d.finish);
        assert_eq!(mem.event, LineEvent::AllWhite);

        // An edge in between breaks the black → white sequence.
        line_error(reading(AllBlack, AllBlack, AllBlack), &mut mem, DECAY);
        line_error(reading(RightWhite, AllBlack, AllBlack), &mut mem, DECAY);
        let d = line_error(reading(AllWhite, AllWhite, AllWhite), &mut mem, DECAY);
        assert!(!d.finish);
    }

    #[test]
    fn rule_table() {
        let cases = [
            (reading(AllBlack, LeftWhite, RightWhite), 5.0, LineEvent::SharpPending),
            (reading(AllBlack, LeftWhite, AllWhite), 5.0, LineEvent::SharpPending),
            (reading(LeftWhite, RightWhite, AllBlack), -5.0, LineEvent::SharpPending),
            (reading(AllWhite, RightWhite, AllBlack), -5.0, LineEvent::SharpPending),
            (reading(RightWhite, AllBlack, AllBlack), -8.0, LineEvent::Edge),
            (reading(AllWhite, AllBlack, AllBlack), -8.0, LineEvent::Edge),
            (reading(AllBlack, AllBlack, LeftWhite), 8.0, LineEvent::Edge),
            (reading(AllBlack, AllWhite, AllWhite), 8.0, LineEvent::Edge),
        ];
        for (r, error, event) in cases {
            let mut mem = LineMemory::default();
            let d = line_error(r, &mut mem, DECAY);
            assert_eq!(d.error, error, "{:?}", r);
            assert_eq!(mem.event, event, "{:?}", r);
        }
    }

    #[test]
    fn front_only_corrections_leave_event_alone() {
        let mut mem = LineMemory::default();
        line_error(reading(AllBlack, AllBlack, AllBlack), &mut mem, DECAY);

        let d = line_error(reading(AllBlack, RightWhite, AllBlack), &mut mem, DECAY);
        assert_eq!(d.error, -2.0);
        let d = line_error(reading(AllBlack, LeftWhite, AllBlack), &mut mem, DECAY);
        assert_eq!(d.error, 2.0);
        assert_eq!(mem.event, LineEvent::OnLine);
    }

    #[test]
    fn sharp_rules_outrank_edge_rules() {
        // Left head right-white would hit rule 5, but rule 3 matches first.
        let mut mem = LineMemory::default();
        let d = line_error(reading(RightWhite, LeftWhite, RightWhite), &mut mem, DECAY);
        assert_eq!(d.error, 5.0);
    }

    #[test]
    fn decay_only_remembers_its_own_output() {
        let mut mem = LineMemory::default();
        // Rule 6 does not seed the decay.
        let d = line_error(reading(AllBlack, AllBlack, LeftWhite), &mut mem, DECAY);
        assert_eq!(d.error, 8.0);
        assert_eq!(mem.previous_error, 0.0);

        // Front all-white, sides black: no rule 1–8 match.
        let lost = reading(AllBlack, AllWhite, AllBlack);
        let d = line_error(lost, &mut mem, DECAY);
        assert_eq!(d.error, 0.0);
        assert_eq!(mem.event, LineEvent::Edge);
    }

    #[test]
    fn repeated_decay_shrinks_geometrically() {
        let mut mem = LineMemory { previous_error: 5.0, ..LineMemory::default() };
        let lost = reading(AllBlack, AllWhite, AllBlack);

        let d = line_error(lost, &mut mem, DECAY);
        assert!(approx(d.error, 4.0));

        // A front correction in between leaves the decay chain alone.
        line_error(reading(AllBlack, RightWhite, AllBlack), &mut mem, DECAY);
        assert!(approx(mem.previous_error, 4.0));

        let d = line_error(lost, &mut mem, DECAY);
        assert!(approx(d.error, 3.2));
        assert!(approx(mem.previous_error, 3.2));
    }

    #[test]
    fn feed_forward_matches_geometry() {
        let ctrl = SteeringController::new(SteeringConfig::default());
        let (l, r) = ctrl.feed_forward();
        assert!(approx(l, (0.1 - 0.14) / 0.035));
        assert!(approx(r, (0.1 + 0.14) / 0.035));
    }

    #[test]
    fn per_cycle_integral_restarts_each_update() {
        let mut ctrl = SteeringController::new(SteeringConfig::default());
        let (l0, r0) = ctrl.feed_forward();

        // output = 1.25*5 + 0.2*(0.5*5) = 6.75
        let w = ctrl.update(5.0);
        assert!(approx(w.omega_right, r0 + 6.75));
        assert!(approx(w.omega_left, l0 - 6.75));

        let w = ctrl.update(5.0);
        assert!(approx(w.omega_right, r0 + 6.75));
        assert!(approx(ctrl.integral(), 2.5));
    }

    #[test]
    fn persistent_integral_accumulates() {
        let config = SteeringConfig {
            integral_memory: IntegralMemory::Persistent,
            ..SteeringConfig::default()
        };
        let mut ctrl = SteeringController::new(config);
        ctrl.update(4.0);
        ctrl.update(4.0);
        assert!(approx(ctrl.integral(), 4.0));

        ctrl.reset();
        assert_eq!(ctrl.integral(), 0.0);
    }

    #[test]
    fn derivative_term_only_when_enabled() {
        let config = SteeringConfig {
            kd: 1.0,
            integral_memory: IntegralMemory::Persistent,
            ..SteeringConfig::default()
        };
        let mut ctrl = SteeringController::new(config);
        let (_, r0) = ctrl.feed_forward();
        ctrl.update(2.0);
        // e=2, I=0.5*2+0.5*2=2, de=0 → 2.5 + 0.4
        let w = ctrl.update(2.0);
        assert!(approx(w.omega_right, r0 + 2.9));
        // e=0, I=2, de=-2 → 0 + 0.4 - 2
        let w = ctrl.update(0.0);
        assert!(approx(w.omega_right, r0 - 1.6));
    }
}
