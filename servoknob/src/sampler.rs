use embassy_time::{Duration, Timer};
use servoloop::hardware::AngleSource;

use crate::platform::BoardEncoder;
use crate::queues::{self, Queue, QueueId, TaskId, ANGLE_QUEUE_DEPTH};

/// Periodically snapshot one encoder angle into its queue. Two
/// instances run, one per encoder.
#[embassy_executor::task(pool_size = 2)]
pub async fn sample_angle(
    encoder: BoardEncoder,
    target: &'static Queue<u16, ANGLE_QUEUE_DEPTH>,
    target_id: QueueId,
    id: TaskId,
    period: Duration,
) {
    loop {
        let angle = encoder.angle();
        log::debug!("{id:?}: angle {angle}");
        queues::send_or_report(target, target_id, &queues::BACKPRESSURE, id, angle);
        Timer::after(period).await;
    }
}
