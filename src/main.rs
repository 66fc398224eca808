#![no_std]
#![no_main]

use core::cell::RefCell;

use embassy_executor::Spawner;
use embassy_futures::select::{select, Either};
use embassy_stm32::adc::Adc;
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::{Input, Level, Output, OutputType, Pin, Pull, Speed};
use embassy_stm32::time::khz;
use embassy_stm32::timer::simple_pwm::{PwmPin, SimplePwm};
use embassy_stm32::timer::{Channel, CountingMode};
use embassy_time::{Delay, Duration, Ticker, Timer};
use {defmt_rtt as _, panic_probe as _};

use romi_course::board::Board;
use romi_course::config::{
    NavConfig, SteeringConfig, NAV_PERIOD_MS, NAV_PRIORITY, SCHEDULER_TICK_MS,
};
use romi_course::drivers::{LineSensorArray, MotorDriver, RangeSensor};
use romi_course::hal::TimedAdcPair;
use romi_course::hw::{heartbeat, EchoPin, EmbassyClock, LineAdc, PwmOut};
use romi_course::navigation::NavigationFsm;
use romi_course::scheduler::{Scheduler, TaskSpec};
use romi_course::tasks::{CourseSensors, NavTask};
use romi_course::{log_error, log_info, Clock};

// ── Main ──────────────────────────────────────────────────────────────────────
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    // 1. Board init (80 MHz PLL)
    let board = Board::init();
    let p = board.p;
    let clock = EmbassyClock;

    spawner
        .spawn(heartbeat(Output::new(p.PA5.degrade(), Level::Low, Speed::Low)))
        .unwrap();

    // 2. Drive motors: TIM4 CH1/CH2 @ 20 kHz, DIR PA8/PC2, nSLP PA9/PC3
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

    // 3. Line heads on ADC1
    let adc = RefCell::new(Adc::new(p.ADC1, &mut Delay));
    let mut front_adc = LineAdc::new(&adc, p.PC4, p.PC5);
    let mut left_adc = LineAdc::new(&adc, p.PB0, p.PB1);
    let mut right_adc = LineAdc::new(&adc, p.PA0, p.PA1);

    // 4. HC-SR04: TRIG PA6, ECHO PA7
    let ranger = RangeSensor::new(
        Output::new(p.PA6.degrade(), Level::Low, Speed::Low),
        EchoPin::new(Input::new(p.PA7.degrade(), Pull::Down)),
        Delay,
    );

    let sensors = CourseSensors {
        range: ranger,
        left: LineSensorArray::new(&mut left_adc as &mut dyn TimedAdcPair),
        front: LineSensorArray::new(&mut front_adc as &mut dyn TimedAdcPair),
        right: LineSensorArray::new(&mut right_adc as &mut dyn TimedAdcPair),
    };

    // 5. Stop button (PC13, active low)
    let mut button = ExtiInput::new(Input::new(p.PC13, Pull::None), p.EXTI13);

    // 6. Course task
    let fsm = NavigationFsm::new(NavConfig::default(), SteeringConfig::default());
    let mut nav = NavTask::new(fsm, sensors, left_motor, right_motor).unwrap();

    Timer::after(Duration::from_millis(500)).await;

    let mut sched: Scheduler<'_> = Scheduler::new();
    sched
        .register(
            TaskSpec { name: "nav", priority: NAV_PRIORITY, period_ms: NAV_PERIOD_MS },
            &mut nav,
        )
        .unwrap();
    log_info!("course start at {} ms", clock.now_ms());

    // 7. Scheduler loop until a fault or the stop button
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
                log_info!("stop button");
                sched.shutdown();
                break;
            }
        }
    }

    loop {
        Timer::after(Duration::from_secs(1)).await;
    }
}
