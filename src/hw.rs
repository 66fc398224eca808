//! embassy-stm32 implementations of the [`hal`](crate::hal) traits.
//!
//! Pin map (Nucleo-L476RG on the Romi chassis):
//!
//! | Function            | Peripheral | Pins        |
//! |---------------------|------------|-------------|
//! | left encoder        | TIM3 QEI   | PB4, PB5    |
//! | right encoder       | TIM8 QEI   | PC6, PC7    |
//! | motor PWM L / R     | TIM4 CH1/2 | PB6, PB7    |
//! | motor direction L/R | GPIO       | PA8, PC2    |
//! | motor enable L/R    | GPIO       | PA9, PC3    |
//! | front line head     | ADC1       | PC4, PC5    |
//! | left line head      | ADC1       | PB0, PB1    |
//! | right line head     | ADC1       | PA0, PA1    |
//! | ultrasonic          | GPIO       | PA6 trig, PA7 echo |
//! | bench telemetry     | USART2 TX  | PA2         |
//! | heartbeat LED (LD2) | GPIO       | PA5         |

use core::cell::RefCell;

use embassy_stm32::adc::{Adc, AdcPin};
use embassy_stm32::dma::NoDma;
use embassy_stm32::gpio::{AnyPin, Input, Output};
use embassy_stm32::peripherals::ADC1;
use embassy_stm32::timer::qei::Qei;
use embassy_stm32::timer::simple_pwm::SimplePwm;
use embassy_stm32::timer::{CaptureCompare16bitInstance, Channel};
use embassy_stm32::usart::{BasicInstance, UartTx};
use embassy_time::{block_for, Delay, Duration, Instant, Timer};
use micromath::F32Ext;

use crate::clock::Clock;
use crate::config::LINE_SAMPLE_HZ;
use crate::error::{HwError, PulseError};
use crate::hal::{DelayUs, OutputPin, PulseInput, PwmChannel, SerialTx, TickCounter, TimedAdcPair};

// ── Time ──────────────────────────────────────────────────────────────────────

/// Milliseconds since boot from the embassy time driver.
#[derive(Clone, Copy, Default)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now_ms(&self) -> u64 {
        Instant::now().as_millis()
    }
}

impl DelayUs for Delay {
    fn delay_us(&mut self, us: u32) {
        block_for(Duration::from_micros(us as u64));
    }
}

// ── Encoders ──────────────────────────────────────────────────────────────────

impl<'d, T: CaptureCompare16bitInstance> TickCounter for Qei<'d, T> {
    fn count(&mut self) -> u16 {
        Qei::count(self)
    }
}

// ── Motor outputs ─────────────────────────────────────────────────────────────

/// One channel of a PWM timer whose other channels drive the other motor.
pub struct PwmOut<'a, 'd, T: CaptureCompare16bitInstance> {
    pwm: &'a RefCell<SimplePwm<'d, T>>,
    channel: Channel,
}

impl<'a, 'd, T: CaptureCompare16bitInstance> PwmOut<'a, 'd, T> {
    pub fn new(pwm: &'a RefCell<SimplePwm<'d, T>>, channel: Channel) -> Result<Self, HwError> {
        pwm.try_borrow_mut().map_err(|_| HwError::Pwm)?.enable(channel);
        Ok(Self { pwm, channel })
    }
}

impl<'a, 'd, T: CaptureCompare16bitInstance> PwmChannel for PwmOut<'a, 'd, T> {
    fn set_percent(&mut self, percent: f32) -> Result<(), HwError> {
        let mut pwm = self.pwm.try_borrow_mut().map_err(|_| HwError::Pwm)?;
        let max = pwm.get_max_duty() as f32;
        let compare = (percent.clamp(0.0, 100.0) * max / 100.0).round() as u16;
        pwm.set_duty(self.channel, compare);
        Ok(())
    }
}

impl<'d> OutputPin for Output<'d, AnyPin> {
    fn set_high(&mut self) -> Result<(), HwError> {
        Output::set_high(self);
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), HwError> {
        Output::set_low(self);
        Ok(())
    }
}

// ── Ultrasonic echo ───────────────────────────────────────────────────────────

/// Busy-wait pulse timer on the HC-SR04 echo line.
pub struct EchoPin<'d> {
    pin: Input<'d, AnyPin>,
}

impl<'d> EchoPin<'d> {
    pub fn new(pin: Input<'d, AnyPin>) -> Self {
        Self { pin }
    }
}

impl<'d> PulseInput for EchoPin<'d> {
    fn pulse_high_us(&mut self, timeout_us: u32) -> Result<u32, PulseError> {
        let start = Instant::now();
        let limit = Duration::from_micros(timeout_us as u64);

        while self.pin.is_low() {
            if start.elapsed() > limit {
                return Err(PulseError::Timeout);
            }
        }
        let rise = Instant::now();
        while self.pin.is_high() {
            if start.elapsed() > limit {
                return Err(PulseError::Timeout);
            }
        }
        Ok(rise.elapsed().as_micros() as u32)
    }
}

// ── Line heads ────────────────────────────────────────────────────────────────

/// Both channels of one reflectance head on the shared ADC, paced at
/// [`LINE_SAMPLE_HZ`].
pub struct LineAdc<'a, 'd, R: AdcPin<ADC1>, L: AdcPin<ADC1>> {
    adc: &'a RefCell<Adc<'d, ADC1>>,
    right: R,
    left: L,
    period: Duration,
}

impl<'a, 'd, R: AdcPin<ADC1>, L: AdcPin<ADC1>> LineAdc<'a, 'd, R, L> {
    pub fn new(adc: &'a RefCell<Adc<'d, ADC1>>, right: R, left: L) -> Self {
        Self {
            adc,
            right,
            left,
            period: Duration::from_hz(LINE_SAMPLE_HZ as u64),
        }
    }
}

impl<'a, 'd, R: AdcPin<ADC1>, L: AdcPin<ADC1>> TimedAdcPair for LineAdc<'a, 'd, R, L> {
    fn read_timed(&mut self, right: &mut [u16], left: &mut [u16]) -> Result<(), HwError> {
        let mut adc = self.adc.try_borrow_mut().map_err(|_| HwError::Adc)?;
        let mut next = Instant::now();
        for (r, l) in right.iter_mut().zip(left.iter_mut()) {
            *r = adc.read(&mut self.right);
            *l = adc.read(&mut self.left);
            next += self.period;
            while Instant::now() < next {}
        }
        Ok(())
    }
}

// ── Serial ────────────────────────────────────────────────────────────────────

impl<'d, T: BasicInstance> SerialTx for UartTx<'d, T, NoDma> {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), HwError> {
        self.blocking_write(bytes).map_err(|_| HwError::Serial)
    }
}

// ── Heartbeat ─────────────────────────────────────────────────────────────────

#[embassy_executor::task]
pub async fn heartbeat(mut led: Output<'static, AnyPin>) {
    loop {
        led.toggle();
        Timer::after(Duration::from_millis(500)).await;
    }
}
