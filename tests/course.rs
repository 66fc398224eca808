//! End-to-end course runs of the navigation machine on scripted sensors.

use romi_course::config::{NavConfig, SteeringConfig};
use romi_course::mock::ScriptedCourse;
use romi_course::navigation::{MotorAction, NavState, NavigationFsm, WallFlag};
use romi_course::{Clock, FakeClock, LineCode, LineReading};

const CYCLE_MS: u64 = 30;

fn fsm() -> NavigationFsm {
    NavigationFsm::new(NavConfig::default(), SteeringConfig::default())
}

/// Step until `done` holds or the step budget runs out, recording every
/// state entry with its time.
fn run_until(
    nav: &mut NavigationFsm,
    course: &mut ScriptedCourse,
    clock: &FakeClock,
    max_steps: usize,
    done: impl Fn(&NavigationFsm) -> bool,
) -> Vec<(NavState, u64, MotorAction)> {
    let mut trace = Vec::new();
    for _ in 0..max_steps {
        let before = nav.state();
        let action = nav.step(clock.now_ms(), course).unwrap();
        if nav.state() != before {
            trace.push((nav.state(), clock.now_ms(), action));
        }
        if done(nav) {
            break;
        }
        clock.advance(CYCLE_MS);
    }
    trace
}

fn entered_at(trace: &[(NavState, u64, MotorAction)], state: NavState) -> u64 {
    trace
        .iter()
        .find(|(s, _, _)| *s == state)
        .map(|(_, t, _)| *t)
        .unwrap_or_else(|| panic!("never entered {:?}", state))
}

/// Deterministic pseudo-random line codes.
struct Lcg(u32);

impl Lcg {
    fn code(&mut self) -> LineCode {
        self.0 = self.0.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        LineCode::try_from(((self.0 >> 16) & 0b11) as u8).unwrap()
    }

    fn reading(&mut self) -> LineReading {
        LineReading::new(self.code(), self.code(), self.code())
    }
}

#[test]
fn distant_obstacle_keeps_sense_follow_cycle() {
    let mut nav = fsm();
    let mut course = ScriptedCourse::new(40.0, LineReading::uniform(LineCode::AllBlack));
    let mut rng = Lcg(7);

    for cycle in 0..20_000u64 {
        course.reading = rng.reading();
        course.set_range(3.01 + (cycle % 50) as f32);
        nav.step(cycle * CYCLE_MS, &mut course).unwrap();
        assert!(
            matches!(nav.state(), NavState::Sense | NavState::LineFollow),
            "left the follow cycle at {:?}",
            nav.state()
        );
    }
    assert_eq!(nav.wall(), WallFlag::Clear);
}

#[test]
fn obstacle_bypass_sequence() {
    let cfg = NavConfig::default();
    let clock = FakeClock::new();
    let mut nav = fsm();
    // Front head off the line until the robot has turned a few cycles.
    let mut course = ScriptedCourse::new(2.0, LineReading::new(LineCode::AllBlack, LineCode::AllWhite, LineCode::AllBlack));

    let trace = run_until(&mut nav, &mut course, &clock, 4, |n| n.state() == NavState::WallAlign);
    assert_eq!(trace[0].0, NavState::WallAlign);
    let align = nav.step(clock.now_ms(), &mut course).unwrap();
    assert_eq!(align, MotorAction::Drive(cfg.align_turn));

    course.reading.front = LineCode::AllBlack;
    course.set_range(50.0);
    let trace = run_until(&mut nav, &mut course, &clock, 1_000, |n| n.state() == NavState::Sense);

    let states: Vec<NavState> = trace.iter().map(|(s, _, _)| *s).collect();
    assert_eq!(
        states,
        [
            NavState::PivotAway,
            NavState::Bypass,
            NavState::PivotBack,
            NavState::Reapproach,
            NavState::Sense,
        ]
    );
    assert_eq!(nav.wall(), WallFlag::PassedOnce);

    let pivot_away = entered_at(&trace, NavState::PivotAway);
    let bypass = entered_at(&trace, NavState::Bypass);
    let pivot_back = entered_at(&trace, NavState::PivotBack);
    let reapproach = entered_at(&trace, NavState::Reapproach);
    let sense = entered_at(&trace, NavState::Sense);
    assert!(bypass - pivot_away >= cfg.pivot_away_ms);
    assert!(pivot_back - bypass >= cfg.bypass_ms);
    assert!(reapproach - pivot_back >= cfg.pivot_back_ms);
    assert!(sense - reapproach >= cfg.reapproach_ms);
    // Never more than one cycle late.
    assert!(bypass - pivot_away < cfg.pivot_away_ms + CYCLE_MS);
}

#[test]
fn timed_phases_issue_fixed_commands() {
    let cfg = NavConfig::default();
    let clock = FakeClock::new();
    let mut nav = fsm();
    let mut course = ScriptedCourse::new(1.0, LineReading::uniform(LineCode::AllBlack));

    nav.step(clock.now_ms(), &mut course).unwrap();
    clock.advance(CYCLE_MS);
    nav.step(clock.now_ms(), &mut course).unwrap();
    assert_eq!(nav.state(), NavState::PivotAway);

    let mut seen = Vec::new();
    while nav.state() != NavState::Sense {
        clock.advance(CYCLE_MS);
        let state = nav.state();
        if let MotorAction::Drive(cmd) = nav.step(clock.now_ms(), &mut course).unwrap() {
            seen.push((state, cmd));
        }
    }
    for (state, cmd) in seen {
        let expected = match state {
            NavState::PivotAway => cfg.pivot_away,
            NavState::Bypass => cfg.bypass,
            NavState::PivotBack => cfg.pivot_back,
            NavState::Reapproach => cfg.reapproach,
            other => panic!("unexpected drive in {:?}", other),
        };
        assert_eq!(cmd, expected);
    }
}

#[test]
fn full_course_docks_returns_and_stops() {
    let cfg = NavConfig::default();
    let clock = FakeClock::new();
    let mut nav = fsm();
    let mut course = ScriptedCourse::new(2.0, LineReading::uniform(LineCode::AllBlack));

    // Obstacle.
    run_until(&mut nav, &mut course, &clock, 1_000, |n| n.wall() == WallFlag::PassedOnce);
    course.set_range(60.0);
    run_until(&mut nav, &mut course, &clock, 1_000, |n| n.state() == NavState::Sense);

    // Back on the line after the obstacle: docks.
    let trace = run_until(&mut nav, &mut course, &clock, 1_000, |n| n.state() == NavState::BoxConfirm);
    let dock = entered_at(&trace, NavState::FinishDock);
    let confirm = trace.last().unwrap();
    assert_eq!(confirm.0, NavState::BoxConfirm);
    assert_eq!(confirm.2, MotorAction::Drive(romi_course::MotionCommand::STOP));
    assert!(confirm.1 - dock >= cfg.finish_dock_ms);
    assert_eq!(nav.wall(), WallFlag::Docked);

    // Wall again: return pivot, final drive, outputs off.
    run_until(&mut nav, &mut course, &clock, 1_000, |n| n.state() == NavState::Sense);
    course.set_range(2.5);
    let trace = run_until(&mut nav, &mut course, &clock, 1_000, |n| n.is_finished());
    let pivot = entered_at(&trace, NavState::ReturnPivot);
    let stopped = entered_at(&trace, NavState::Stopped);
    assert!(stopped - pivot >= cfg.return_pivot_ms);
    assert!(clock.now_ms() - stopped >= cfg.final_drive_ms);

    // Terminal: nothing moves any more.
    for _ in 0..10 {
        clock.advance(CYCLE_MS);
        assert_eq!(nav.step(clock.now_ms(), &mut course).unwrap(), MotorAction::Hold);
        assert_eq!(nav.state(), NavState::Stopped);
    }
}

#[test]
fn identical_inputs_replay_identically() {
    fn replay(seed: u32) -> Vec<MotorAction> {
        let mut nav = fsm();
        let mut course = ScriptedCourse::new(50.0, LineReading::uniform(LineCode::AllBlack));
        let mut rng = Lcg(seed);
        let mut out = Vec::new();
        for cycle in 0..3_000u64 {
            course.reading = rng.reading();
            // An obstacle shows up for a while partway through.
            course.set_range(if (400..420).contains(&cycle) { 2.0 } else { 50.0 });
            out.push(nav.step(cycle * 17, &mut course).unwrap());
        }
        out
    }

    let a = replay(99);
    let b = replay(99);
    assert_eq!(a, b);
    assert!(a.iter().any(|m| matches!(m, MotorAction::Drive(_))));
}
