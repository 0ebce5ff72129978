pub mod control;
pub mod hardware;
pub mod pid;
