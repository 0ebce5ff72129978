//! Board selection: real hardware on the ESP32 target, the simulator
//! everywhere else.

#[cfg(target_os = "espidf")]
pub use board_servoknob::{Board, BoardDisplay, BoardEncoder, BoardMotor};

#[cfg(not(target_os = "espidf"))]
pub use board_simulator::{Board, BoardDisplay, BoardEncoder, BoardMotor};
