#![cfg_attr(not(test), no_std)]

// Must stay first so the logging macros are visible to every module below.
#[macro_use]
mod fmt;

#[cfg(feature = "firmware")]
pub mod board;
pub mod calibration;
pub mod command;
pub mod config;
pub mod drivers;
pub mod ipc;
pub mod motion;
pub mod moves;
pub mod protocol;
#[cfg(feature = "firmware")]
pub mod tasks;
pub mod telemetry;

#[cfg(test)]
mod testing;

#[cfg(feature = "firmware")]
pub use board::Board;
pub use drivers::imu::{EulerAngles, ImuData};
