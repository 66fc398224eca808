pub mod speed;
pub mod steering;

pub use speed::{output_to_duty, ClosedLoopSpeedController};
pub use steering::{line_error, LineDecision, LineEvent, LineMemory, SteeringController, WheelTargets};
