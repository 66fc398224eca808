pub mod encoder;
pub mod line;
pub mod motor;
pub mod range;

pub use encoder::QuadratureEncoder;
pub use line::{LineHead, LineSensorArray};
pub use motor::{DutyOutput, MotorDriver};
pub use range::{RangeSensor, Ranging};
