//! Claw linear actuator: PHASE selects the stroke direction, ENABLE carries the speed PWM.

use embedded_hal::digital::StatefulOutputPin;
use embedded_hal::pwm::{Error as _, SetDutyCycle};

use super::motor::ActuatorError;
use crate::config::CLAW_MAX_SPEED_PCT;

/// Wire values match the mission-control `command` field: open = 1, close = -1, stop = 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClawDirection {
    Open,
    Close,
    #[default]
    Stop,
}

impl ClawDirection {
    pub fn code(self) -> i8 {
        match self {
            ClawDirection::Open => 1,
            ClawDirection::Close => -1,
            ClawDirection::Stop => 2,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(ClawDirection::Open),
            -1 => Some(ClawDirection::Close),
            2 => Some(ClawDirection::Stop),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClawCommand {
    pub direction: ClawDirection,
    pub speed: i32,
}

pub struct LinearActuator<PH, EN> {
    phase: PH,
    enable: EN,
    speed: u8,
}

impl<PH: StatefulOutputPin, EN: SetDutyCycle> LinearActuator<PH, EN> {
    pub fn new(phase: PH, enable: EN) -> Self {
        Self {
            phase,
            enable,
            speed: 0,
        }
    }

    /// Phase low, actuator idle.
    pub fn init(&mut self) -> Result<(), ActuatorError> {
        self.phase.set_low().map_err(pin_err)?;
        self.set_speed(0)
    }

    /// Returns whether the phase latch reads back high.
    pub fn open(&mut self) -> Result<bool, ActuatorError> {
        self.phase.set_high().map_err(pin_err)?;
        self.phase.is_set_high().map_err(pin_err)
    }

    /// Returns whether the phase latch reads back low.
    pub fn close(&mut self) -> Result<bool, ActuatorError> {
        self.phase.set_low().map_err(pin_err)?;
        self.phase.is_set_low().map_err(pin_err)
    }

    pub fn set_speed(&mut self, speed: i32) -> Result<(), ActuatorError> {
        let speed = speed.clamp(0, CLAW_MAX_SPEED_PCT) as u8;
        self.enable
            .set_duty_cycle_percent(speed)
            .map_err(|e| ActuatorError::Pwm(e.kind()))?;
        self.speed = speed;
        Ok(())
    }

    pub fn speed(&self) -> u8 {
        self.speed
    }

    /// Apply a mission-control claw command. `Ok(false)` means the phase latch
    /// did not take the requested level; the actuator is stopped in that case.
    pub fn apply(&mut self, cmd: ClawCommand) -> Result<bool, ActuatorError> {
        let latched = match cmd.direction {
            ClawDirection::Open => self.open()?,
            ClawDirection::Close => self.close()?,
            ClawDirection::Stop => {
                self.set_speed(0)?;
                return Ok(true);
            }
        };

        if latched {
            self.set_speed(cmd.speed)?;
        } else {
            self.set_speed(0)?;
        }
        Ok(latched)
    }
}

fn pin_err<E: embedded_hal::digital::Error>(e: E) -> ActuatorError {
    ActuatorError::Pin(e.kind())
}
