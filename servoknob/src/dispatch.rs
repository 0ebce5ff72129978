//! Terminal tasks draining the motor-command and display queues into
//! the hardware collaborators.

use servoloop::hardware::{Motor, StatusDisplay};

use crate::platform::{BoardDisplay, BoardMotor};
use crate::queues;

#[embassy_executor::task]
pub async fn actuate(mut motor: BoardMotor) {
    loop {
        let command = queues::MOTOR_COMMAND.receive().await;
        // zero speed releases the direction lines; "forward at zero
        // duty" would brake the motor on some bridges
        let result = if command.speed == 0 {
            motor.stop()
        } else {
            motor
                .set_direction(command.forward)
                .and_then(|_| motor.set_speed(command.speed))
        };
        match result {
            Ok(()) => log::debug!(
                "motor: speed {} {}",
                command.speed,
                if command.forward { "forward" } else { "backward" }
            ),
            Err(err) => log::warn!("motor command failed: {err:?}"),
        }
    }
}

/// Best effort: a failed render is neither retried nor reported.
#[embassy_executor::task]
pub async fn show_status(mut display: BoardDisplay, width: u32, height: u32) {
    let _ = display.init(width, height);
    loop {
        let sample = queues::DISPLAY.receive().await;
        let _ = display.clear();
        let _ = display.draw_text(0, &format!("Current: {:3}", sample.current));
        let _ = display.draw_text(1, &format!("Desired: {:3}", sample.desired));
    }
}
