mod config;
mod controller;
mod dispatch;
mod platform;
mod queues;
mod recovery;
mod sampler;

use embassy_executor::Executor;
use servoloop::control::Controller;
use static_cell::StaticCell;

use crate::config::Config;
use crate::queues::{QueueId, TaskId, CURRENT_ANGLE, DESIRED_ANGLE};

static EXECUTOR: StaticCell<Executor> = StaticCell::new();

fn main() {
    let mut board = platform::Board::init();
    let config = Config::default();

    // Hardware setup failures are fatal here: there is no degraded mode
    // to fall back to without a knob, a shaft encoder or a motor.
    let desired = board.desired_encoder(&config.desired).unwrap();
    let current = board.current_encoder(&config.current).unwrap();
    let motor = board.motor().unwrap();
    let display = board.display().unwrap();

    let control = Controller::new(config.controller());

    log::info!("starting control pipeline");
    let executor = EXECUTOR.init(Executor::new());
    executor.run(|spawner| {
        spawner
            .spawn(sampler::sample_angle(
                desired,
                &DESIRED_ANGLE,
                QueueId::DesiredAngle,
                TaskId::DesiredSampler,
                config.sample_period,
            ))
            .unwrap();
        spawner
            .spawn(sampler::sample_angle(
                current,
                &CURRENT_ANGLE,
                QueueId::CurrentAngle,
                TaskId::CurrentSampler,
                config.sample_period,
            ))
            .unwrap();
        spawner
            .spawn(controller::control_loop(control, config.sample_period))
            .unwrap();
        spawner.spawn(recovery::recover()).unwrap();
        spawner.spawn(dispatch::actuate(motor)).unwrap();
        spawner
            .spawn(dispatch::show_status(
                display,
                config.display_width,
                config.display_height,
            ))
            .unwrap();
    });
}
