//! Positional hobby servo on a 50 Hz PWM channel.

use embedded_hal::pwm::{Error as _, ErrorKind, SetDutyCycle};

use crate::config::ServoJointConfig;

/// Duty resolution: 1/100 of a percent.
const DUTY_DENOM: u16 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ServoError(pub ErrorKind);

pub struct PwmServo<P> {
    pwm: P,
    cfg: ServoJointConfig,
    position: f32,
}

impl<P: SetDutyCycle> PwmServo<P> {
    pub fn new(pwm: P, cfg: ServoJointConfig) -> Self {
        Self {
            pwm,
            cfg,
            position: cfg.start_pos,
        }
    }

    pub fn config(&self) -> &ServoJointConfig {
        &self.cfg
    }

    /// Last position written.
    pub fn position(&self) -> f32 {
        self.position
    }

    /// Drive to `pos`, clamped to the joint limits. Returns the position applied.
    pub fn set_position(&mut self, pos: f32) -> Result<f32, ServoError> {
        let pos = pos.clamp(self.cfg.pos_min, self.cfg.pos_max);
        let duty = duty_percent(&self.cfg, pos);
        let num = (duty * 100.0) as u16;
        self.pwm
            .set_duty_cycle_fraction(num, DUTY_DENOM)
            .map_err(|e| ServoError(e.kind()))?;
        self.position = pos;
        Ok(pos)
    }

    /// Cut the pulse train; the servo stops holding.
    pub fn release(&mut self) -> Result<(), ServoError> {
        self.pwm
            .set_duty_cycle_fully_off()
            .map_err(|e| ServoError(e.kind()))
    }
}

/// Duty cycle in percent for a joint position.
pub fn duty_percent(cfg: &ServoJointConfig, pos: f32) -> f32 {
    let span = cfg.duty_max_pct - cfg.duty_min_pct;
    cfg.duty_min_pct + (pos - cfg.pos_min) / cfg.range * span
}

/// Pulse width in microseconds for a joint position.
pub fn pulse_us(cfg: &ServoJointConfig, pos: f32) -> u32 {
    let period_us = 1_000_000.0 / cfg.freq_hz as f32;
    (duty_percent(cfg, pos) / 100.0 * period_us) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ELBOW, ROTUNDA};
    use crate::testing::MockPwm;

    #[test]
    fn test_rotunda_duty_endpoints() {
        assert_eq!(duty_percent(&ROTUNDA, 0.0), 2.5);
        assert_eq!(duty_percent(&ROTUNDA, 1800.0), 7.5);
        assert_eq!(duty_percent(&ROTUNDA, 3600.0), 12.5);
        assert_eq!(pulse_us(&ROTUNDA, 1800.0), 1500);
    }

    #[test]
    fn test_elbow_uses_range_not_limits() {
        // 150 of a 300 range sits mid-span even though the lower limit is 100.
        let d = duty_percent(&ELBOW, 150.0);
        assert!((d - (2.5 + (150.0 - 100.0) / 300.0 * 10.0)).abs() < 1e-5);
    }

    #[test]
    fn test_set_position_clamps_and_writes() {
        let mut servo = PwmServo::new(MockPwm::new(), ELBOW);
        assert_eq!(servo.set_position(500.0), Ok(290.0));
        assert_eq!(servo.position(), 290.0);
        let expected = duty_percent(&ELBOW, 290.0);
        assert!((servo.pwm.percent() - expected).abs() < 0.02);

        assert_eq!(servo.set_position(0.0), Ok(100.0));
    }

    #[test]
    fn test_release_turns_output_off() {
        let mut servo = PwmServo::new(MockPwm::new(), ROTUNDA);
        servo.set_position(1800.0).unwrap();
        servo.release().unwrap();
        assert_eq!(servo.pwm.duty, 0);
    }
}
