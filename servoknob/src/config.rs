use embassy_time::Duration;
use ky040::Ky040Config;
use servoloop::control::ControllerConfiguration;
use servoloop::pid::PidConfiguration;

/// Runtime configuration for the whole appliance, built once in main
/// and handed into board init and the task entry points. Pin
/// assignments live in the board crates since they only exist on the
/// ESP32 target; queue depths are compile-time constants in `queues`.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    pub desired: Ky040Config,
    pub current: Ky040Config,

    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
    pub dead_band: f32,
    pub max_duty: u32,

    pub sample_period: Duration,

    pub display_width: u32,
    pub display_height: u32,
}

impl Default for Config {
    fn default() -> Self {
        let encoder = Ky040Config {
            angle_min: 0,
            angle_max: 90,
            debounce_us: 1500,
            reverse: false,
        };
        Self {
            desired: encoder,
            current: encoder,

            kp: 15.0,
            ki: 0.5,
            kd: 0.5,
            dead_band: 10.0,
            max_duty: 1023,

            sample_period: Duration::from_millis(100),

            display_width: 128,
            display_height: 64,
        }
    }
}

impl Config {
    pub fn controller(&self) -> ControllerConfiguration {
        ControllerConfiguration {
            pid: PidConfiguration {
                kp: self.kp,
                ki: self.ki,
                kd: self.kd,
                max_output: self.max_duty as f32,
            },
            dead_band: self.dead_band,
        }
    }
}
