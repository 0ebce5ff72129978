use embassy_time::{with_timeout, Duration};
use servoloop::control::Controller;

use crate::queues::{self, QueueId, TaskId};

/// The control loop proper: one sample from each angle queue per cycle
/// (sample-and-hold on a miss), one motor command and one display
/// sample out. The two bounded receives run in sequence, so the loop
/// naturally throttles to the slower producer.
#[embassy_executor::task]
pub async fn control_loop(mut controller: Controller, cycle_wait: Duration) {
    loop {
        let desired = with_timeout(cycle_wait, queues::DESIRED_ANGLE.receive())
            .await
            .ok();
        let current = with_timeout(cycle_wait, queues::CURRENT_ANGLE.receive())
            .await
            .ok();

        let (command, sample) = controller.update(desired, current);

        queues::send_or_report(
            &queues::MOTOR_COMMAND,
            QueueId::MotorCommand,
            &queues::BACKPRESSURE,
            TaskId::Controller,
            command,
        );
        queues::send_or_report(
            &queues::DISPLAY,
            QueueId::Display,
            &queues::BACKPRESSURE,
            TaskId::Controller,
            sample,
        );
    }
}
