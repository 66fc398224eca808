//! Two-channel analog reflectance head (QTR-style).
//!
//! A timed batch fills a small buffer per channel; only the first sample of
//! each is used. Heads are independent, three of them ring the chassis.

use crate::config::{LINE_SAMPLE_DEPTH, LINE_THRESHOLD};
use crate::error::HwError;
use crate::hal::TimedAdcPair;
use crate::state::LineCode;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "stm32", derive(defmt::Format))]
pub enum Surface {
    White = 0,
    Black = 1,
}

/// Threshold is inclusive on the black side.
pub fn classify(value: u16, threshold: u16) -> Surface {
    if value >= threshold {
        Surface::Black
    } else {
        Surface::White
    }
}

/// Source of a head's line code.
pub trait LineHead {
    fn read_line(&mut self) -> Result<LineCode, HwError>;
}

pub struct LineSensorArray<A: TimedAdcPair> {
    adc: A,
    threshold: u16,
    right_buf: [u16; LINE_SAMPLE_DEPTH],
    left_buf: [u16; LINE_SAMPLE_DEPTH],
}

impl<A: TimedAdcPair> LineSensorArray<A> {
    pub fn new(adc: A) -> Self {
        Self {
            adc,
            threshold: LINE_THRESHOLD,
            right_buf: [0; LINE_SAMPLE_DEPTH],
            left_buf: [0; LINE_SAMPLE_DEPTH],
        }
    }

    /// Run one timed batch acquisition into the channel buffers.
    pub fn sample(&mut self) -> Result<(), HwError> {
        self.adc.read_timed(&mut self.right_buf, &mut self.left_buf)
    }

    /// First sample of (right, left) from the last batch.
    pub fn raw(&self) -> (u16, u16) {
        (self.right_buf[0], self.left_buf[0])
    }

    pub fn adc_mut(&mut self) -> &mut A {
        &mut self.adc
    }
}

impl<A: TimedAdcPair> LineHead for LineSensorArray<A> {
    fn read_line(&mut self) -> Result<LineCode, HwError> {
        self.sample()?;
        let (right, left) = self.raw();
        let right = classify(right, self.threshold);
        let left = classify(left, self.threshold);

        let code = match (left, right) {
            (Surface::White, Surface::White) => LineCode::AllWhite,
            (_, Surface::White) => LineCode::RightWhite,
            (Surface::White, _) => LineCode::LeftWhite,
            (Surface::Black, Surface::Black) => LineCode::AllBlack,
        };
        Ok(code)
    }
}
