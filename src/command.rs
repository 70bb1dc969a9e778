//! Mission-control parameter block and its `key=value&...` request parser.
//!
//! Fields keep the last value received; a request only names the fields it
//! changes. Fields are applied in a fixed order regardless of their order in
//! the request, so `speed` always lands before `command` reads it.

use crate::drivers::claw::{ClawCommand, ClawDirection};
use crate::motion::{WristCommand, WristDimension};

pub const MAX_UPDATE_SPEED: i32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ArmParams {
    pub rotunda_target: i32,
    pub elbow_target: i32,
    pub shoulder_duration_ms: i32,
    pub wrist_delta: i32,
    pub wrist_dimension: i32,
    pub update_speed: i32,
    pub actuator_speed: i32,
    /// 1 open, -1 close, 2 stop, 0 before the first command.
    pub current_direction: i32,
}

/// What a request changed. `wrist` is the wrist semaphore: raised when either
/// wrist field was present, even if its value did not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ArmUpdate {
    pub rotunda: Option<i32>,
    pub elbow: Option<i32>,
    pub shoulder: Option<i32>,
    pub wrist: bool,
    pub claw: Option<ClawCommand>,
}

impl ArmUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl ArmParams {
    pub const fn new() -> Self {
        Self {
            rotunda_target: 0,
            elbow_target: 0,
            shoulder_duration_ms: 0,
            wrist_delta: 0,
            wrist_dimension: 0,
            update_speed: 0,
            actuator_speed: 0,
            current_direction: 0,
        }
    }

    pub fn apply_args(&mut self, form: &str) -> ArmUpdate {
        let mut update = ArmUpdate::default();

        if let Some(v) = arg(form, "RotundaTarget") {
            self.rotunda_target = atoi(v);
            update.rotunda = Some(self.rotunda_target);
        }
        if let Some(v) = arg(form, "ElbowTarget") {
            self.elbow_target = atoi(v);
            update.elbow = Some(self.elbow_target);
        }
        // Mission control sends the misspelled key.
        if let Some(v) =
            arg(form, "ShoudlerDuration_ms").or_else(|| arg(form, "ShoulderDuration_ms"))
        {
            self.shoulder_duration_ms = atoi(v);
            update.shoulder = Some(self.shoulder_duration_ms);
        }

        let delta = arg(form, "Wrist_Delta");
        let dimension = arg(form, "Wrist_Dimension");
        if let Some(v) = delta {
            self.wrist_delta = atoi(v);
        }
        if let Some(v) = dimension {
            self.wrist_dimension = atoi(v);
        }
        update.wrist = delta.is_some() || dimension.is_some();

        if let Some(v) = arg(form, "speed") {
            self.update_speed = atoi(v);
        }
        if let Some(cmd) = arg(form, "command") {
            if self.update_speed > MAX_UPDATE_SPEED {
                self.update_speed = MAX_UPDATE_SPEED;
            }
            self.actuator_speed = self.update_speed;
            match cmd {
                "open" => self.current_direction = ClawDirection::Open.code() as i32,
                "close" => self.current_direction = ClawDirection::Close.code() as i32,
                "stop" => {
                    self.current_direction = ClawDirection::Stop.code() as i32;
                    self.actuator_speed = 0;
                }
                _ => {}
            }
            update.claw = Some(self.claw_command());
        }

        update
    }

    /// `None` when `Wrist_Dimension` is not a known axis.
    pub fn wrist_command(&self) -> Option<WristCommand> {
        WristDimension::from_code(self.wrist_dimension).map(|dimension| WristCommand {
            delta: self.wrist_delta as f32,
            dimension,
        })
    }

    pub fn claw_command(&self) -> ClawCommand {
        ClawCommand {
            direction: ClawDirection::from_code(self.current_direction).unwrap_or_default(),
            speed: self.actuator_speed,
        }
    }
}

/// Value of the first `key` in the form. A bare `key` yields `""`.
fn arg<'a>(form: &'a str, key: &str) -> Option<&'a str> {
    form.split('&').find_map(|pair| match pair.split_once('=') {
        Some((k, v)) => (k == key).then_some(v),
        None => (pair == key).then_some(""),
    })
}

/// C `atoi`: leading whitespace, optional sign, then digits up to the first
/// non-digit. No digits gives 0; overflow saturates.
pub fn atoi(s: &str) -> i32 {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let mut value: i32 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        let d = (b - b'0') as i32;
        value = if negative {
            value.saturating_mul(10).saturating_sub(d)
        } else {
            value.saturating_mul(10).saturating_add(d)
        };
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atoi() {
        assert_eq!(atoi("123"), 123);
        assert_eq!(atoi("  -45xyz"), -45);
        assert_eq!(atoi("+7"), 7);
        assert_eq!(atoi("abc"), 0);
        assert_eq!(atoi(""), 0);
        assert_eq!(atoi("99999999999"), i32::MAX);
        assert_eq!(atoi("-99999999999"), i32::MIN);
    }

    #[test]
    fn test_joint_targets() {
        let mut p = ArmParams::new();
        let u = p.apply_args("RotundaTarget=2400&ElbowTarget=200");
        assert_eq!(u.rotunda, Some(2400));
        assert_eq!(u.elbow, Some(200));
        assert_eq!(u.shoulder, None);
        assert!(!u.wrist);
        assert_eq!(p.rotunda_target, 2400);
    }

    #[test]
    fn test_shoulder_key_spellings() {
        let mut p = ArmParams::new();
        assert_eq!(p.apply_args("ShoudlerDuration_ms=-500").shoulder, Some(-500));
        assert_eq!(p.apply_args("ShoulderDuration_ms=250").shoulder, Some(250));
        assert_eq!(p.shoulder_duration_ms, 250);
    }

    #[test]
    fn test_wrist_semaphore_on_either_key() {
        let mut p = ArmParams::new();
        let u = p.apply_args("Wrist_Dimension=1");
        assert!(u.wrist);
        assert_eq!(p.wrist_delta, 0);

        let u = p.apply_args("Wrist_Delta=30");
        assert!(u.wrist);
        assert_eq!(
            p.wrist_command(),
            Some(WristCommand {
                delta: 30.0,
                dimension: WristDimension::Roll
            })
        );

        p.apply_args("Wrist_Dimension=9");
        assert_eq!(p.wrist_command(), None);
    }

    #[test]
    fn test_claw_command_uses_capped_speed_regardless_of_order() {
        let mut p = ArmParams::new();
        let u = p.apply_args("command=open&speed=250");
        assert_eq!(p.update_speed, 100);
        assert_eq!(
            u.claw,
            Some(ClawCommand {
                direction: ClawDirection::Open,
                speed: 100
            })
        );

        let u = p.apply_args("speed=40&command=close");
        assert_eq!(u.claw.map(|c| c.direction), Some(ClawDirection::Close));
        assert_eq!(p.actuator_speed, 40);
    }

    #[test]
    fn test_claw_stop_zeroes_speed() {
        let mut p = ArmParams::new();
        p.apply_args("speed=60&command=open");
        let u = p.apply_args("command=stop");
        assert_eq!(
            u.claw,
            Some(ClawCommand {
                direction: ClawDirection::Stop,
                speed: 0
            })
        );
        // update_speed is kept for the next command
        assert_eq!(p.update_speed, 60);
    }

    #[test]
    fn test_speed_alone_does_not_touch_claw() {
        let mut p = ArmParams::new();
        let u = p.apply_args("speed=70");
        assert!(u.is_empty());
        assert_eq!(p.update_speed, 70);
        assert_eq!(p.actuator_speed, 0);
    }

    #[test]
    fn test_unknown_command_keeps_direction() {
        let mut p = ArmParams::new();
        p.apply_args("command=close");
        let u = p.apply_args("speed=20&command=wiggle");
        assert_eq!(
            u.claw,
            Some(ClawCommand {
                direction: ClawDirection::Close,
                speed: 20
            })
        );
    }

    #[test]
    fn test_first_duplicate_wins_and_unknown_keys_ignored() {
        let mut p = ArmParams::new();
        let u = p.apply_args("foo=1&ElbowTarget=120&ElbowTarget=130&bar");
        assert_eq!(u.elbow, Some(120));
        assert_eq!(p.elbow_target, 120);
        let u = p.apply_args("RotundaTarget&RotundaTarget=900");
        assert_eq!(u.rotunda, Some(0));
        assert!(ArmParams::new().apply_args("").is_empty());
    }
}
