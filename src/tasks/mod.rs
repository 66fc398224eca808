pub mod motor_task;
pub mod nav_task;
pub mod telemetry;

pub use motor_task::{MotorMode, MotorTask, OperatorCommand, OperatorLink};
pub use nav_task::{CourseSensors, NavTask};
pub use telemetry::TelemetryTask;
