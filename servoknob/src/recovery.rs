//! Backpressure recovery actor.
//!
//! Blocked on the report queue; on a report it purges the offending
//! queue and drops back to baseline priority. Purging discards unread
//! samples, which is the right call for a periodic position-sample
//! stream where only the freshest value matters. Do not reuse this
//! actor in front of a queue that needs at-least-once delivery.

use crate::queues::{self, BackpressureEvent};

const BASELINE_PRIORITY: u32 = 1;
const RAISED_PRIORITY: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryState {
    /// Blocked on the report queue at baseline priority
    Idle,
    /// Priority elevated while a queue reset runs
    Raised,
}

pub struct RecoveryActor {
    state: RecoveryState,
}

impl RecoveryActor {
    pub fn new() -> Self {
        Self { state: RecoveryState::Idle }
    }

    pub fn state(&self) -> RecoveryState {
        self.state
    }

    pub fn raise(&mut self, event: &BackpressureEvent) {
        log::error!(
            "backpressure: {:?} found queue {:?} full",
            event.producer,
            event.queue
        );
        set_scheduling_priority(RAISED_PRIORITY);
        self.state = RecoveryState::Raised;
    }

    pub fn settle(&mut self) {
        set_scheduling_priority(BASELINE_PRIORITY);
        self.state = RecoveryState::Idle;
    }
}

#[embassy_executor::task]
pub async fn recover() {
    let mut actor = RecoveryActor::new();
    loop {
        let event = queues::BACKPRESSURE.receive().await;
        actor.raise(&event);
        queues::purge(event.queue);
        actor.settle();
    }
}

/// On the ESP32 the whole pipeline runs on the executor thread, so the
/// elevation is applied to that FreeRTOS task relative to the rest of
/// the system.
#[cfg(target_os = "espidf")]
fn set_scheduling_priority(priority: u32) {
    unsafe { esp_idf_svc::sys::vTaskPrioritySet(core::ptr::null_mut(), priority) };
}

/// Hosts without priority scheduling fall back to wake-on-report, which
/// the channel receive already gives us; the transition is only logged.
#[cfg(not(target_os = "espidf"))]
fn set_scheduling_priority(priority: u32) {
    log::debug!("recovery priority -> {priority}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queues::{QueueId, TaskId};

    #[test]
    fn check_state_transitions() {
        let mut actor = RecoveryActor::new();
        assert_eq!(actor.state(), RecoveryState::Idle);

        let event = BackpressureEvent {
            producer: TaskId::DesiredSampler,
            queue: QueueId::DesiredAngle,
        };
        actor.raise(&event);
        assert_eq!(actor.state(), RecoveryState::Raised);

        //one reset cycle always ends back at baseline
        actor.settle();
        assert_eq!(actor.state(), RecoveryState::Idle);
    }
}
