use crate::pid::{Pid, PidConfiguration};

/// One desired/current angle pair, published to the display each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AngleSample {
    pub current: u16,
    pub desired: u16,
}

/// Actuator order: duty magnitude already bounded to the power stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorCommand {
    pub speed: u32,
    pub forward: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ControllerConfiguration {
    pub pid: PidConfiguration,
    /// Error magnitude below which the emitted speed is forced to zero,
    /// to keep the motor from hunting around its setpoint
    pub dead_band: f32,
}

/// Closed-loop position controller with sample-and-hold inputs.
///
/// Owned by a single task; nothing here is shared.
pub struct Controller {
    pid: Pid,
    dead_band: f32,

    held_desired: u16,
    held_current: u16,
}

impl Controller {
    pub fn new(configuration: ControllerConfiguration) -> Controller {
        Controller {
            pid: Pid::new(configuration.pid),
            dead_band: configuration.dead_band,

            held_desired: 0,
            held_current: 0,
        }
    }

    /// Run one control cycle.
    ///
    /// A `None` input means the matching queue yielded nothing this
    /// cycle; the last observed value is reused instead.
    pub fn update(
        &mut self,
        desired: Option<u16>,
        current: Option<u16>,
    ) -> (MotorCommand, AngleSample) {
        if let Some(desired) = desired {
            self.held_desired = desired;
        }
        if let Some(current) = current {
            self.held_current = current;
        }

        let error = self.held_desired as f32 - self.held_current as f32;
        let output = self.pid.compute(error);

        let speed = if error.abs() < self.dead_band {
            0
        } else {
            output.abs() as u32
        };
        let command = MotorCommand { speed, forward: output >= 0.0 };

        log::trace!(
            "desired {} current {} error {} output {} -> speed {} forward {}",
            self.held_desired,
            self.held_current,
            error,
            output,
            command.speed,
            command.forward,
        );

        let sample = AngleSample {
            current: self.held_current,
            desired: self.held_desired,
        };
        (command, sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: ControllerConfiguration = ControllerConfiguration {
        pid: PidConfiguration {
            kp: 15.0,
            ki: 0.5,
            kd: 0.5,
            max_output: 1023.0,
        },
        dead_band: 10.0,
    };

    #[test]
    fn check_first_cycle_command() {
        let mut controller = Controller::new(CONFIG);

        //desired 30, current 0: output 15*30 + 0.5*30 + 0.5*30 = 480
        let (command, sample) = controller.update(Some(30), Some(0));
        assert_eq!(command, MotorCommand { speed: 480, forward: true });
        assert_eq!(sample, AngleSample { current: 0, desired: 30 });
    }

    #[test]
    fn check_backward_direction() {
        let mut controller = Controller::new(CONFIG);

        let (command, _) = controller.update(Some(0), Some(30));
        assert_eq!(command, MotorCommand { speed: 480, forward: false });
    }

    #[test]
    fn check_speed_never_exceeds_max_duty() {
        let mut controller = Controller::new(CONFIG);

        let (command, _) = controller.update(Some(90), Some(0));
        assert_eq!(command.speed, 1023);
    }

    #[test]
    fn check_dead_band_forces_stop() {
        let mut controller = Controller::new(CONFIG);

        //build up some integral first, away from the setpoint
        for _ in 0..20 {
            controller.update(Some(90), Some(0));
        }

        //inside the dead band the speed is zero no matter what the
        //accumulated integral says
        let (command, _) = controller.update(Some(45), Some(40));
        assert_eq!(command.speed, 0);
    }

    #[test]
    fn check_sample_and_hold() {
        let mut controller = Controller::new(CONFIG);

        controller.update(Some(30), Some(12));

        //no fresh samples: both held values are reused
        let (_, sample) = controller.update(None, None);
        assert_eq!(sample, AngleSample { current: 12, desired: 30 });

        //one side updates, the other is held
        let (_, sample) = controller.update(Some(50), None);
        assert_eq!(sample, AngleSample { current: 12, desired: 50 });
    }
}
