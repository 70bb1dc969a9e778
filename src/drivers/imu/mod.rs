pub mod bno055;
pub mod mpu6050;
pub mod regs;

pub use bno055::Bno055;
pub use mpu6050::{Mpu6050, MotionSample, RawSample};

use embedded_hal_async::i2c::ErrorKind;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Quaternion {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Orientation in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EulerAngles {
    pub yaw: f32,
    pub roll: f32,
    pub pitch: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationStatus {
    pub sys: u8,   // System calibration (0-3)
    pub gyro: u8,  // Gyroscope calibration (0-3)
    pub accel: u8, // Accelerometer calibration (0-3)
    pub mag: u8,   // Magnetometer calibration (0-3)
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ImuData {
    pub accel: Vector3,
    pub gyro: Vector3,
    pub mag: Vector3,
    pub quat: Quaternion,
    pub euler: EulerAngles,
    pub temp: i8,
    pub calib: CalibrationStatus,
}

impl CalibrationStatus {
    pub fn from_byte(calib_byte: u8) -> Self {
        Self {
            sys: (calib_byte >> 6) & 0x03,
            gyro: (calib_byte >> 4) & 0x03,
            accel: (calib_byte >> 2) & 0x03,
            mag: calib_byte & 0x03,
        }
    }

    pub fn is_fully_calibrated(&self) -> bool {
        self.sys == 3 && self.gyro == 3 && self.accel == 3 && self.mag == 3
    }
}

impl ImuData {
    pub fn is_duplicate_of(&self, other: &Self) -> bool {
        const EPS: f32 = 1e-5;
        let close = |a: f32, b: f32| (a - b).abs() < EPS;
        close(self.accel.x, other.accel.x)
            && close(self.accel.y, other.accel.y)
            && close(self.accel.z, other.accel.z)
            && close(self.gyro.x, other.gyro.x)
            && close(self.gyro.y, other.gyro.y)
            && close(self.gyro.z, other.gyro.z)
            && close(self.mag.x, other.mag.x)
            && close(self.mag.y, other.mag.y)
            && close(self.mag.z, other.mag.z)
            && close(self.quat.w, other.quat.w)
            && close(self.quat.x, other.quat.x)
            && close(self.quat.y, other.quat.y)
            && close(self.quat.z, other.quat.z)
            && self.temp == other.temp
            && self.calib == other.calib
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ImuError {
    Bus(ErrorKind),
    /// Unexpected WHO_AM_I / CHIP_ID value.
    WrongChipId(u8),
    /// Operating mode read back differs from the one written.
    ModeMismatch { expected: u8, got: u8 },
    /// SYS_STAT reported an error; carries SYS_ERR.
    System(u8),
    Timeout,
}

impl ImuError {
    pub(crate) fn bus<E: embedded_hal_async::i2c::Error>(e: E) -> Self {
        Self::Bus(e.kind())
    }
}

#[inline]
pub(crate) fn le_i16(lo: u8, hi: u8) -> i16 {
    i16::from_le_bytes([lo, hi])
}

#[inline]
pub(crate) fn be_i16(hi: u8, lo: u8) -> i16 {
    i16::from_be_bytes([hi, lo])
}
