//! Motion-control core for a differential-drive Romi running a line course.
//!
//! Everything in this crate is hardware independent and runs on the host; the
//! firmware binaries (`stm32` feature) implement the [`hal`] traits on
//! embassy-stm32 peripherals and drive the tasks from an embassy executor.
//!
//! | Module | Purpose |
//! | ------ | ------- |
//! | [`drivers`] | Quadrature encoder, motor driver, ultrasonic ranger, reflectance heads |
//! | [`control`] | Line steering law and closed-loop speed controller |
//! | [`navigation`] | Course state machine (sense, follow, bypass, dock, return) |
//! | [`scheduler`] | Cooperative periodic task contract |
//! | [`share`] | Cross-task `Share` registers and `Queue` channels |
//! | [`tasks`] | Scheduler tasks wiring the above together |

#![cfg_attr(not(test), no_std)]

#[macro_use]
pub mod logging;

pub mod clock;
pub mod config;
pub mod control;
pub mod drivers;
pub mod error;
pub mod hal;
pub mod mock;
pub mod navigation;
pub mod scheduler;
pub mod share;
pub mod state;
pub mod tasks;

#[cfg(feature = "stm32")]
pub mod board;
#[cfg(feature = "stm32")]
pub mod hw;

pub use clock::{Clock, FakeClock};
pub use error::{HwError, PulseError, RangeError, TaskFault};
pub use share::{Queue, Share};
pub use state::{Head, LineCode, LineReading, MotionCommand};
