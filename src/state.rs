//! Shared value types passed between drivers, controllers and tasks.
//!
//! All types are `Copy` so they can sit in a `Share` or travel through a `Queue`.

// ── Motion ────────────────────────────────────────────────────────────────────

pub const DUTY_LIMIT: f32 = 100.0;

/// Signed left/right duty percentages, each clamped to `[-100, 100]`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "stm32", derive(defmt::Format))]
pub struct MotionCommand {
    pub left_duty: f32,
    pub right_duty: f32,
}

impl MotionCommand {
    pub const STOP: Self = Self { left_duty: 0.0, right_duty: 0.0 };

    pub fn new(left_duty: f32, right_duty: f32) -> Self {
        Self {
            left_duty: left_duty.clamp(-DUTY_LIMIT, DUTY_LIMIT),
            right_duty: right_duty.clamp(-DUTY_LIMIT, DUTY_LIMIT),
        }
    }
}

// ── Line sensing ──────────────────────────────────────────────────────────────

/// Reduced reading of one reflectance head.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "stm32", derive(defmt::Format))]
#[repr(u8)]
pub enum LineCode {
    AllBlack = 0,
    RightWhite = 1,
    LeftWhite = 2,
    AllWhite = 3,
}

impl LineCode {
    /// Right channel sees white (alone or with the left).
    pub fn right_white(self) -> bool {
        matches!(self, Self::RightWhite | Self::AllWhite)
    }

    /// Left channel sees white (alone or with the right).
    pub fn left_white(self) -> bool {
        matches!(self, Self::LeftWhite | Self::AllWhite)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "stm32", derive(defmt::Format))]
pub struct InvalidLineCode(pub u8);

impl TryFrom<u8> for LineCode {
    type Error = InvalidLineCode;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(Self::AllBlack),
            1 => Ok(Self::RightWhite),
            2 => Ok(Self::LeftWhite),
            3 => Ok(Self::AllWhite),
            other => Err(InvalidLineCode(other)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "stm32", derive(defmt::Format))]
pub enum Head {
    Left,
    Front,
    Right,
}

/// One cycle's codes from the three heads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "stm32", derive(defmt::Format))]
pub struct LineReading {
    pub left: LineCode,
    pub front: LineCode,
    pub right: LineCode,
}

impl LineReading {
    pub const fn new(left: LineCode, front: LineCode, right: LineCode) -> Self {
        Self { left, front, right }
    }

    /// Same code under every head.
    pub const fn uniform(code: LineCode) -> Self {
        Self::new(code, code, code)
    }

    pub fn all(self, code: LineCode) -> bool {
        self.left == code && self.front == code && self.right == code
    }
}

// ── Telemetry ─────────────────────────────────────────────────────────────────

/// Record streamed from a motor task to the telemetry sink.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "stm32", derive(defmt::Format))]
pub enum TelemetryRecord {
    /// Encoder position and either the raw delta or the speed in rpm.
    Sample { position: i64, value: f32 },
    /// End of a capture window; the byte is written verbatim.
    End(u8),
}
