pub mod claw;
pub mod eeprom;
pub mod imu;
pub mod motor;
pub mod servo;

pub use claw::{ClawCommand, ClawDirection, LinearActuator};
pub use eeprom::{Eeprom, EepromError};
pub use imu::{Bno055, ImuData, Mpu6050, Quaternion, Vector3};
pub use motor::{ActuatorError, DcMotor, Direction};
pub use servo::{PwmServo, ServoError};
