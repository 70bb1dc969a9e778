//! Brushed DC motor behind an H-bridge: PWM on SIG, level on DIR.

use embedded_hal::digital::{Error as _, OutputPin};
use embedded_hal::pwm::{Error as _, SetDutyCycle};

use crate::config::MotorJointConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Forward,
    Reverse,
}

impl Direction {
    pub fn reversed(self) -> Self {
        match self {
            Direction::Forward => Direction::Reverse,
            Direction::Reverse => Direction::Forward,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ActuatorError {
    Pwm(embedded_hal::pwm::ErrorKind),
    Pin(embedded_hal::digital::ErrorKind),
}

pub struct DcMotor<P, D> {
    sig: P,
    dir: D,
    cfg: MotorJointConfig,
    /// Swap DIR polarity for motors wired backwards.
    inverted: bool,
    speed: u8,
    direction: Direction,
}

impl<P: SetDutyCycle, D: OutputPin> DcMotor<P, D> {
    pub fn new(sig: P, dir: D, cfg: MotorJointConfig) -> Self {
        Self {
            sig,
            dir,
            cfg,
            inverted: false,
            speed: 0,
            direction: Direction::Forward,
        }
    }

    pub fn inverted(mut self, inverted: bool) -> Self {
        self.inverted = inverted;
        self
    }

    pub fn speed(&self) -> u8 {
        self.speed
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn is_running(&self) -> bool {
        self.speed > 0
    }

    /// Set direction first, then duty. Speed is clamped to the joint's enable window.
    pub fn drive(&mut self, direction: Direction, speed_pct: u8) -> Result<(), ActuatorError> {
        let speed = speed_pct.clamp(self.cfg.enable_pwm_min_pct, self.cfg.enable_pwm_max_pct);

        let high = (direction == Direction::Forward) != self.inverted;
        let res = if high {
            self.dir.set_high()
        } else {
            self.dir.set_low()
        };
        res.map_err(|e| ActuatorError::Pin(e.kind()))?;

        self.sig
            .set_duty_cycle_percent(speed)
            .map_err(|e| ActuatorError::Pwm(e.kind()))?;

        self.direction = direction;
        self.speed = speed;
        Ok(())
    }

    pub fn stop(&mut self) -> Result<(), ActuatorError> {
        self.sig
            .set_duty_cycle_fully_off()
            .map_err(|e| ActuatorError::Pwm(e.kind()))?;
        self.speed = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SHOULDER, WRIST};
    use crate::testing::{MockPin, MockPwm};

    #[test]
    fn test_drive_sets_direction_and_duty() {
        let mut m = DcMotor::new(MockPwm::new(), MockPin::new(), SHOULDER);
        m.drive(Direction::Forward, 60).unwrap();
        assert!(m.dir.high);
        assert_eq!(m.sig.percent(), 60.0);
        assert!(m.is_running());

        m.drive(Direction::Reverse, 30).unwrap();
        assert!(!m.dir.high);
        assert_eq!(m.speed(), 30);
    }

    #[test]
    fn test_speed_clamped_to_enable_window() {
        let cfg = MotorJointConfig {
            enable_pwm_min_pct: 10,
            enable_pwm_max_pct: 80,
            ..WRIST
        };
        let mut m = DcMotor::new(MockPwm::new(), MockPin::new(), cfg);
        m.drive(Direction::Forward, 200).unwrap();
        assert_eq!(m.speed(), 80);
        m.drive(Direction::Forward, 0).unwrap();
        assert_eq!(m.speed(), 10);
    }

    #[test]
    fn test_inverted_polarity() {
        let mut m = DcMotor::new(MockPwm::new(), MockPin::new(), WRIST).inverted(true);
        m.drive(Direction::Forward, 50).unwrap();
        assert!(!m.dir.high);
        assert_eq!(m.direction(), Direction::Forward);
    }

    #[test]
    fn test_stop_zeroes_duty() {
        let mut m = DcMotor::new(MockPwm::new(), MockPin::new(), SHOULDER);
        m.drive(Direction::Reverse, 100).unwrap();
        m.stop().unwrap();
        assert_eq!(m.sig.duty, 0);
        assert!(!m.is_running());
        assert_eq!(Direction::Reverse.reversed(), Direction::Forward);
    }
}
