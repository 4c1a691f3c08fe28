#[macro_use]
extern crate assert_approx_eq;

use gpio::mock::{EchoPin, MockClock};
use gpio::{Clock, Level};
use ultrasonic::{DistanceSensor, EchoConfig, EchoError, NO_READING};

#[test]
pub fn distance_test() {
    let clock = MockClock::new();
    let sensor = DistanceSensor::with_defaults(&clock);

    // Echo starts 100 µs after the trigger and lasts 580 µs (10 cm there and back)
    let mut pin = EchoPin::echo(&clock, 100, 580);
    assert_approx_eq!(sensor.measure(&mut pin), 580. / 29. / 2.);
    assert_approx_eq!(sensor.measure(&mut EchoPin::echo(&clock, 100, 580)), 10., 0.01);

    let mut pin = EchoPin::echo(&clock, 450, 5800);
    assert_approx_eq!(sensor.measure(&mut pin), 100.);
}

#[test]
pub fn trigger_pulse_test() {
    let clock = MockClock::new();
    let sensor = DistanceSensor::with_defaults(&clock);

    let mut pin = EchoPin::echo(&clock, 100, 580);
    sensor.measure(&mut pin);

    assert_eq!(pin.writes, vec![Level::Low, Level::High, Level::Low]);
}

#[test]
pub fn stuck_low_test() {
    let clock = MockClock::new();
    let sensor = DistanceSensor::with_defaults(&clock);
    let start = clock.ticks_us();

    let mut pin = EchoPin::stuck_low(&clock);
    assert_eq!(sensor.measure(&mut pin), NO_READING);
    assert_eq!(sensor.measure(&mut pin), -1.);

    let mut pin = EchoPin::stuck_low(&clock);
    assert_eq!(sensor.try_measure(&mut pin), Err(EchoError::NoEcho));

    // The deadline is wall-clock time, whatever a read costs
    let mut slow_pin = EchoPin::stuck_low(&clock).with_read_cost(1000);
    assert_eq!(sensor.try_measure(&mut slow_pin), Err(EchoError::NoEcho));
    assert_eq!(slow_pin.reads, 10);

    assert!(clock.ticks_diff(clock.ticks_us(), start) < 100_000);
}

#[test]
pub fn late_answer_test() {
    let clock = MockClock::new();
    let sensor = DistanceSensor::with_defaults(&clock);

    // The falling edge arrives in time, but the sensor answered too late
    let mut pin = EchoPin::echo(&clock, 6000, 580);
    assert_eq!(sensor.measure(&mut pin), NO_READING);

    let mut pin = EchoPin::echo(&clock, 6000, 580);
    assert_eq!(
        sensor.try_measure(&mut pin),
        Err(EchoError::InvalidEcho {
            rising_delay_us: 6000
        })
    );

    let mut pin = EchoPin::echo(&clock, 5300, 580);
    assert_approx_eq!(sensor.measure(&mut pin), 10.);
}

#[test]
pub fn echo_timeout_test() {
    let clock = MockClock::new();
    let sensor = DistanceSensor::with_defaults(&clock);

    let mut pin = EchoPin::stuck_high(&clock);
    assert_eq!(sensor.try_measure(&mut pin), Err(EchoError::EchoTimeout));

    let mut pin = EchoPin::echo(&clock, 100, 40_000);
    assert_eq!(sensor.measure(&mut pin), NO_READING);
}

#[test]
pub fn pin_failure_test() {
    let clock = MockClock::new();
    let sensor = DistanceSensor::with_defaults(&clock);

    let mut pin = EchoPin::echo(&clock, 100, 580);
    pin.failing = true;
    assert!(matches!(sensor.try_measure(&mut pin), Err(EchoError::Pin(_))));

    let mut pin = EchoPin::echo(&clock, 100, 580);
    pin.failing = true;
    assert_eq!(sensor.measure(&mut pin), NO_READING);
}

#[test]
pub fn clock_wraparound_test() {
    let clock = MockClock::starting_at(u32::MAX - 300);
    let sensor = DistanceSensor::with_defaults(&clock);

    let mut pin = EchoPin::echo(&clock, 100, 580);
    assert_approx_eq!(sensor.measure(&mut pin), 10.);
}

#[test]
pub fn custom_config_test() {
    let clock = MockClock::new();
    let config = EchoConfig {
        rising_timeout_us: 500,
        max_rising_delay_us: 200,
        speed_of_sound_divisor: 58.,
        ..EchoConfig::default()
    };
    let sensor = DistanceSensor::new(&clock, config);

    assert_approx_eq!(sensor.measure(&mut EchoPin::echo(&clock, 100, 1160)), 10.);
    assert_eq!(
        sensor.try_measure(&mut EchoPin::echo(&clock, 300, 580)),
        Err(EchoError::InvalidEcho {
            rising_delay_us: 300
        })
    );
    assert_eq!(
        sensor.try_measure(&mut EchoPin::echo(&clock, 600, 580)),
        Err(EchoError::NoEcho)
    );
}

#[test]
pub fn never_panics_test() {
    let clock = MockClock::new();
    let sensor = DistanceSensor::with_defaults(&clock);

    for &rise in &[0, 1, 99, 5299, 5301, 9999, 10_000, 20_000] {
        for &width in &[0, 1, 580, 29_999, 30_000, 60_000] {
            for &cost in &[1, 7, 250] {
                let mut pin = EchoPin::echo(&clock, rise, width).with_read_cost(cost);
                let distance = sensor.measure(&mut pin);
                assert!(distance == NO_READING || distance >= 0.);
            }
        }
    }
}
