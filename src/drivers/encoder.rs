//! Quadrature encoder on a wrapping 16-bit timer counter.
//!
//! `update()` must run often enough that the shaft never turns more than
//! half the counter range between calls; past that the wrap is aliased and
//! nothing can detect it.

use crate::config::{ENCODER_HALF, ENCODER_WRAP};
use crate::hal::TickCounter;

pub struct QuadratureEncoder<C: TickCounter> {
    counter: C,
    previous_raw: u16,
    delta: i32,
    position: i64,
}

impl<C: TickCounter> QuadratureEncoder<C> {
    /// Seeds the previous count from the counter so the first update reads
    /// zero motion.
    pub fn new(mut counter: C) -> Self {
        let previous_raw = counter.count();
        Self {
            counter,
            previous_raw,
            delta: 0,
            position: 0,
        }
    }

    /// Read the counter and fold the corrected delta into the position.
    pub fn update(&mut self) {
        let raw = self.counter.count();
        self.delta = unwrap_delta(raw, self.previous_raw);
        self.position += self.delta as i64;
        self.previous_raw = raw;
    }

    #[inline]
    pub fn position(&self) -> i64 {
        self.position
    }

    #[inline]
    pub fn delta(&self) -> i32 {
        self.delta
    }

    /// Zero the position. Counter history is kept so the next delta is still true.
    pub fn zero(&mut self) {
        self.position = 0;
    }
}

/// Signed motion between two counter readings, corrected into `(-half, half]`.
pub fn unwrap_delta(raw: u16, previous_raw: u16) -> i32 {
    let mut delta = raw as i32 - previous_raw as i32;
    if delta <= -ENCODER_HALF {
        delta += ENCODER_WRAP;
    } else if delta > ENCODER_HALF {
        delta -= ENCODER_WRAP;
    }
    delta
}
