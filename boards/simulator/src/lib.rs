//! Host-side stand-in for the servoknob hardware.
//!
//! The motor and display are fakes, and the two encoders are real
//! [`ky040::EncoderCore`] instances fed by background threads: a "knob"
//! thread that slowly sweeps the setpoint, and a "plant" thread that
//! turns the feedback encoder according to the fake motor state. This
//! closes the loop well enough to watch the whole pipeline run on a
//! development machine.

use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use ky040::{EncoderCore, Ky040Config, Ky040Error};
use servoloop::hardware::{AngleSource, Motor, StatusDisplay};
use simple_logger::SimpleLogger;

/// How fast the fake setpoint knob is turned
const KNOB_STEP_PERIOD: Duration = Duration::from_millis(250);

/// Plant integration step
const PLANT_STEP_PERIOD: Duration = Duration::from_millis(5);

/// Duty accumulator threshold for one tick of shaft motion: at full duty
/// (1023) the shaft advances roughly one tick per plant step
const PLANT_TICK_THRESHOLD: u32 = 1024;

#[derive(Debug, Default, Clone, Copy)]
struct MotorState {
    duty: u32,
    forward: bool,
    /// Direction lines asserted; false after stop()
    engaged: bool,
}

pub struct BoardMotor(Arc<Mutex<MotorState>>);

impl Motor for BoardMotor {
    type Error = Infallible;

    fn set_direction(&mut self, forward: bool) -> Result<(), Infallible> {
        let mut state = self.0.lock().unwrap();
        state.forward = forward;
        state.engaged = true;
        Ok(())
    }

    fn set_speed(&mut self, duty: u32) -> Result<(), Infallible> {
        self.0.lock().unwrap().duty = duty;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Infallible> {
        let mut state = self.0.lock().unwrap();
        state.duty = 0;
        state.engaged = false;
        Ok(())
    }
}

/// Renders the status "screen" into the log.
pub struct BoardDisplay;

impl StatusDisplay for BoardDisplay {
    type Error = Infallible;

    fn init(&mut self, width: u32, height: u32) -> Result<(), Infallible> {
        log::info!("display: {width}x{height}");
        Ok(())
    }

    fn clear(&mut self) -> Result<(), Infallible> {
        Ok(())
    }

    fn draw_text(&mut self, line: u8, text: &str) -> Result<(), Infallible> {
        log::info!("display[{line}]: {text}");
        Ok(())
    }
}

pub struct BoardEncoder(Arc<EncoderCore>);

impl AngleSource for BoardEncoder {
    fn angle(&self) -> u16 {
        self.0.angle()
    }
}

pub struct Board {
    motor_state: Arc<Mutex<MotorState>>,
    motor: Option<BoardMotor>,
    display: Option<BoardDisplay>,
    epoch: Instant,
}

impl Board {
    pub fn init() -> Self {
        SimpleLogger::new()
            .with_level(log::LevelFilter::Info)
            .env()
            .init()
            .ok();
        log::info!("simulator board up");

        let motor_state = Arc::new(Mutex::new(MotorState::default()));
        Self {
            motor: Some(BoardMotor(motor_state.clone())),
            motor_state,
            display: Some(BoardDisplay),
            epoch: Instant::now(),
        }
    }

    /// Setpoint encoder, swept one clockwise tick at a time by a
    /// background thread standing in for a human turning the knob.
    pub fn desired_encoder(&mut self, config: &Ky040Config) -> Result<BoardEncoder, Ky040Error> {
        let epoch = self.epoch;
        let core = Arc::new(EncoderCore::new(config, now_us(&epoch))?);

        let knob = core.clone();
        thread::Builder::new()
            .name("knob".to_string())
            .spawn(move || loop {
                knob.clock_edge(false, now_us(&epoch));
                thread::sleep(KNOB_STEP_PERIOD);
            })
            .unwrap();

        Ok(BoardEncoder(core))
    }

    /// Feedback encoder, turned by a trivial plant model: shaft speed
    /// proportional to the fake motor duty while the direction lines
    /// are asserted.
    pub fn current_encoder(&mut self, config: &Ky040Config) -> Result<BoardEncoder, Ky040Error> {
        let epoch = self.epoch;
        let core = Arc::new(EncoderCore::new(config, now_us(&epoch))?);

        let shaft = core.clone();
        let motor_state = self.motor_state.clone();
        thread::Builder::new()
            .name("plant".to_string())
            .spawn(move || {
                let mut accumulator = 0u32;
                loop {
                    let state = *motor_state.lock().unwrap();
                    if state.engaged && state.duty > 0 {
                        accumulator += state.duty;
                        if accumulator >= PLANT_TICK_THRESHOLD {
                            accumulator -= PLANT_TICK_THRESHOLD;
                            // forward rotation reads the partner input low
                            shaft.clock_edge(!state.forward, now_us(&epoch));
                        }
                    } else {
                        accumulator = 0;
                    }
                    thread::sleep(PLANT_STEP_PERIOD);
                }
            })
            .unwrap();

        Ok(BoardEncoder(core))
    }

    pub fn motor(&mut self) -> Option<BoardMotor> {
        self.motor.take()
    }

    pub fn display(&mut self) -> Option<BoardDisplay> {
        self.display.take()
    }
}

fn now_us(epoch: &Instant) -> i64 {
    epoch.elapsed().as_micros() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_fake_motor_state() {
        let state = Arc::new(Mutex::new(MotorState::default()));
        let mut motor = BoardMotor(state.clone());

        motor.set_direction(true).unwrap();
        motor.set_speed(480).unwrap();
        {
            let state = state.lock().unwrap();
            assert!(state.engaged);
            assert!(state.forward);
            assert_eq!(state.duty, 480);
        }

        //stop releases the direction lines, it does not just zero the duty
        motor.stop().unwrap();
        let state = state.lock().unwrap();
        assert!(!state.engaged);
        assert_eq!(state.duty, 0);
    }
}
