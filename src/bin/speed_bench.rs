//! Wheel speed bench: both drive motors under the speed loop, samples streamed
//! on USART2. Boots straight into closed loop; each press of the user button
//! starts a step response on both wheels.

#![no_std]
#![no_main]

use core::cell::RefCell;

use embassy_executor::Spawner;
use embassy_futures::select::{select, Either};
use embassy_stm32::dma::NoDma;
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::{Input, Level, Output, OutputType, Pin, Pull, Speed};
use embassy_stm32::time::khz;
use embassy_stm32::timer::qei::{Qei, QeiPin};
use embassy_stm32::timer::simple_pwm::{PwmPin, SimplePwm};
use embassy_stm32::timer::{Channel, CountingMode};
use embassy_stm32::usart::{Config as UsartConfig, UartTx};
use embassy_time::{Duration, Ticker, Timer};
use {defmt_rtt as _, panic_probe as _};

use romi_course::board::Board;
use romi_course::config::{
    SpeedLoopConfig, MOTOR_PERIOD_MS, MOTOR_PRIORITY, SAMPLE_QUEUE_DEPTH, SCHEDULER_TICK_MS,
    TELEMETRY_PERIOD_MS, TELEMETRY_PRIORITY,
};
use romi_course::drivers::{MotorDriver, QuadratureEncoder};
use romi_course::hw::{heartbeat, EmbassyClock, PwmOut};
use romi_course::scheduler::{Scheduler, TaskSpec};
use romi_course::state::TelemetryRecord;
use romi_course::tasks::{MotorTask, OperatorCommand, OperatorLink, TelemetryTask};
use romi_course::{log_error, log_info, Clock, Queue};

const BENCH_GAIN: f32 = 0.5;
const BENCH_SETPOINT_RPM: i32 = 60;

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let board = Board::init();
    let p = board.p;
    let clock = EmbassyClock;

    spawner
        .spawn(heartbeat(Output::new(p.PA5.degrade(), Level::Low, Speed::Low)))
        .unwrap();

    // Encoders: TIM3 (PB4/PB5) left, TIM8 (PC6/PC7) right
    let left_encoder = QuadratureEncoder::new(Qei::new(p.TIM3, QeiPin::new_ch1(p.PB4), QeiPin::new_ch2(p.PB5)));
    let right_encoder = QuadratureEncoder::new(Qei::new(p.TIM8, QeiPin::new_ch1(p.PC6), QeiPin::new_ch2(p.PC7)));

    let pwm = RefCell::new(SimplePwm::new(
        p.TIM4,
        Some(PwmPin::new_ch1(p.PB6, OutputType::PushPull)),
        Some(PwmPin::new_ch2(p.PB7, OutputType::PushPull)),
        None,
        None,
        khz(20),
        CountingMode::EdgeAlignedUp,
    ));
    let left_motor = MotorDriver::new(
        PwmOut::new(&pwm, Channel::Ch1).unwrap(),
        Output::new(p.PA8.degrade(), Level::Low, Speed::Low),
        Output::new(p.PA9.degrade(), Level::Low, Speed::Low),
    )
    .unwrap();
    let right_motor = MotorDriver::new(
        PwmOut::new(&pwm, Channel::Ch2).unwrap(),
        Output::new(p.PC2.degrade(), Level::Low, Speed::Low),
        Output::new(p.PC3.degrade(), Level::Low, Speed::Low),
    )
    .unwrap();

    let mut uart_config = UsartConfig::default();
    uart_config.baudrate = 115_200;
    let serial = UartTx::new(p.USART2, p.PA2, NoDma, uart_config).unwrap();

    let mut button = ExtiInput::new(Input::new(p.PC13, Pull::None), p.EXTI13);

    // ── Shares and queue ──────────────────────────────────────────────────────
    let left_link = OperatorLink::new();
    let right_link = OperatorLink::new();
    for link in [&left_link, &right_link] {
        link.gain.put(BENCH_GAIN);
        link.setpoint.put(BENCH_SETPOINT_RPM);
    }
    let samples: Queue<TelemetryRecord, SAMPLE_QUEUE_DEPTH> = Queue::new();

    let config = SpeedLoopConfig::default();
    let mut motor_a = MotorTask::new("motor_a", left_encoder, left_motor, &left_link, &samples, config).unwrap();
    let mut motor_b = MotorTask::new("motor_b", right_encoder, right_motor, &right_link, &samples, config).unwrap();
    let mut telemetry = TelemetryTask::new(serial, &samples);

    let mut sched: Scheduler<'_> = Scheduler::new();
    sched
        .register(TaskSpec { name: "motor_a", priority: MOTOR_PRIORITY, period_ms: MOTOR_PERIOD_MS }, &mut motor_a)
        .unwrap();
    sched
        .register(TaskSpec { name: "motor_b", priority: MOTOR_PRIORITY, period_ms: MOTOR_PERIOD_MS }, &mut motor_b)
        .unwrap();
    sched
        .register(
            TaskSpec { name: "telemetry", priority: TELEMETRY_PRIORITY, period_ms: TELEMETRY_PERIOD_MS },
            &mut telemetry,
        )
        .unwrap();

    left_link.send(OperatorCommand::CloseLoop);
    right_link.send(OperatorCommand::CloseLoop);
    log_info!("speed bench ready, press the button for a step response");

    let mut ticker = Ticker::every(Duration::from_millis(SCHEDULER_TICK_MS));
    loop {
        match select(ticker.next(), button.wait_for_falling_edge()).await {
            Either::First(()) => {
                if let Err(failure) = sched.tick(clock.now_ms()) {
                    log_error!("halted by {}: {:?}", failure.task, failure.fault);
                    break;
                }
            }
            Either::Second(()) => {
                log_info!("step response");
                left_link.send(OperatorCommand::StepResponse);
                right_link.send(OperatorCommand::StepResponse);
            }
        }
    }

    loop {
        Timer::after(Duration::from_secs(1)).await;
    }
}
