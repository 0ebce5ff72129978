//! Static bounded queues wiring the pipeline together, and the
//! backpressure discipline shared by every producer.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use servoloop::control::{AngleSample, MotorCommand};

pub type Queue<T, const N: usize> = Channel<CriticalSectionRawMutex, T, N>;

pub const ANGLE_QUEUE_DEPTH: usize = 3;
pub const MOTOR_QUEUE_DEPTH: usize = 3;
pub const DISPLAY_QUEUE_DEPTH: usize = 3;
pub const REPORT_QUEUE_DEPTH: usize = 2;

pub static DESIRED_ANGLE: Queue<u16, ANGLE_QUEUE_DEPTH> = Channel::new();
pub static CURRENT_ANGLE: Queue<u16, ANGLE_QUEUE_DEPTH> = Channel::new();
pub static MOTOR_COMMAND: Queue<MotorCommand, MOTOR_QUEUE_DEPTH> = Channel::new();
pub static DISPLAY: Queue<AngleSample, DISPLAY_QUEUE_DEPTH> = Channel::new();
pub static BACKPRESSURE: Queue<BackpressureEvent, REPORT_QUEUE_DEPTH> = Channel::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskId {
    DesiredSampler,
    CurrentSampler,
    Controller,
}

/// Names a purgeable queue, so a backpressure report can reference the
/// one that was full. The report queue itself is not listed: it is never
/// a backpressure target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueId {
    DesiredAngle,
    CurrentAngle,
    MotorCommand,
    Display,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackpressureEvent {
    pub producer: TaskId,
    pub queue: QueueId,
}

/// Drop every queued element from the named queue.
pub fn purge(queue: QueueId) {
    match queue {
        QueueId::DesiredAngle => DESIRED_ANGLE.clear(),
        QueueId::CurrentAngle => CURRENT_ANGLE.clear(),
        QueueId::MotorCommand => MOTOR_COMMAND.clear(),
        QueueId::Display => DISPLAY.clear(),
    }
}

/// Non-blocking enqueue with the backpressure discipline: a full target
/// queue is a fault to report, not a value to drop or overwrite. The
/// producer files one report and moves on; it never retries.
pub fn send_or_report<T, const N: usize, const R: usize>(
    target: &Queue<T, N>,
    target_id: QueueId,
    reports: &Queue<BackpressureEvent, R>,
    producer: TaskId,
    value: T,
) {
    if target.try_send(value).is_err() {
        log::warn!("{producer:?}: queue {target_id:?} full, reporting backpressure");
        // a full report queue means the recovery actor is already on it
        let _ = reports.try_send(BackpressureEvent { producer, queue: target_id });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_send_passes_through() {
        let target: Queue<u16, 3> = Channel::new();
        let reports: Queue<BackpressureEvent, 2> = Channel::new();

        send_or_report(&target, QueueId::DesiredAngle, &reports, TaskId::DesiredSampler, 42);
        assert_eq!(target.try_receive(), Ok(42));
        assert!(reports.is_empty());
    }

    #[test]
    fn check_full_queue_raises_one_report() {
        let target: Queue<u16, 2> = Channel::new();
        let reports: Queue<BackpressureEvent, 2> = Channel::new();

        target.try_send(1).unwrap();
        target.try_send(2).unwrap();

        send_or_report(&target, QueueId::CurrentAngle, &reports, TaskId::CurrentSampler, 3);

        //exactly one report, naming the producer and the full queue
        assert_eq!(
            reports.try_receive(),
            Ok(BackpressureEvent { producer: TaskId::CurrentSampler, queue: QueueId::CurrentAngle })
        );
        assert!(reports.is_empty());

        //the full queue itself was not touched
        assert_eq!(target.len(), 2);
        assert_eq!(target.try_receive(), Ok(1));
    }

    #[test]
    fn check_sends_succeed_after_purge() {
        //uses the shared static; tests run in parallel, keep this the
        //only one that touches it
        MOTOR_COMMAND
            .try_send(servoloop::control::MotorCommand { speed: 1, forward: true })
            .unwrap();
        while !MOTOR_COMMAND.is_full() {
            MOTOR_COMMAND
                .try_send(servoloop::control::MotorCommand { speed: 1, forward: true })
                .unwrap();
        }

        purge(QueueId::MotorCommand);
        assert!(MOTOR_COMMAND.is_empty());

        MOTOR_COMMAND
            .try_send(servoloop::control::MotorCommand { speed: 2, forward: false })
            .unwrap();
        assert_eq!(MOTOR_COMMAND.len(), 1);
        MOTOR_COMMAND.clear();
    }
}
