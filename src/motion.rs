//! Joint motion planning shared by the joint tasks.

use crate::config::{
    MotorJointConfig, ServoJointConfig, SERVO_SETTLE_EPSILON, SHOULDER, WRIST, WRIST_DEG_PER_SEC,
};
use crate::drivers::imu::EulerAngles;
use crate::drivers::motor::Direction;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotionError {
    /// EMA weight outside `0.0..=1.0`.
    InvalidAlpha(f32),
}

/// `target * alpha + current * (1 - alpha)`.
pub fn exp_moving_avg(current: f32, target: f32, alpha: f32) -> Result<f32, MotionError> {
    if !(0.0..=1.0).contains(&alpha) {
        return Err(MotionError::InvalidAlpha(alpha));
    }
    Ok(target * alpha + current * (1.0 - alpha))
}

/// Servo joint eased toward its target one frame at a time.
#[derive(Debug, Clone, Copy)]
pub struct ServoJoint {
    cfg: ServoJointConfig,
    current: f32,
    target: f32,
}

impl ServoJoint {
    pub fn new(cfg: ServoJointConfig, start: f32) -> Self {
        let start = start.clamp(cfg.pos_min, cfg.pos_max);
        Self {
            cfg,
            current: start,
            target: start,
        }
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    /// Returns the target actually accepted after clamping.
    pub fn set_target(&mut self, target: f32) -> f32 {
        self.target = target.clamp(self.cfg.pos_min, self.cfg.pos_max);
        self.target
    }

    pub fn is_settled(&self) -> bool {
        self.current == self.target
    }

    /// Advance one frame and return the new commanded position.
    pub fn step(&mut self, alpha: f32) -> Result<f32, MotionError> {
        let next = exp_moving_avg(self.current, self.target, alpha)?;
        self.current = if (self.target - next).abs() < SERVO_SETTLE_EPSILON {
            self.target
        } else {
            next
        };
        Ok(self.current)
    }
}

/// Timed shoulder move. Positive durations raise the arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ShoulderMove {
    pub direction: Direction,
    pub duration_ms: u32,
}

impl ShoulderMove {
    /// `None` for a zero duration, which means stop.
    pub fn from_duration(ms: i32) -> Option<Self> {
        let direction = match ms {
            0 => return None,
            ms if ms > 0 => Direction::Forward,
            _ => Direction::Reverse,
        };
        Some(Self {
            direction,
            duration_ms: ms.unsigned_abs(),
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ShoulderLimits {
    min: f32,
    max: f32,
}

impl Default for ShoulderLimits {
    fn default() -> Self {
        Self::from_config(&SHOULDER)
    }
}

impl ShoulderLimits {
    pub fn from_config(cfg: &MotorJointConfig) -> Self {
        Self {
            min: cfg.limit_min,
            max: cfg.limit_max,
        }
    }

    /// Whether the shoulder may keep moving in `direction` at `pitch` degrees.
    /// Moving back toward the allowed window is always permitted.
    pub fn allows(&self, pitch: f32, direction: Direction) -> bool {
        match direction {
            Direction::Forward => pitch < self.max,
            Direction::Reverse => pitch > self.min,
        }
    }

    /// `None` orientation means the IMU is stale or missing, so the limit
    /// cannot be checked.
    pub fn check(&self, euler: Option<EulerAngles>, direction: Direction) -> LimitCheck {
        match euler {
            Some(e) if self.allows(e.pitch, direction) => LimitCheck::Allowed,
            Some(_) => LimitCheck::Blocked,
            None => LimitCheck::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LimitCheck {
    Allowed,
    Blocked,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ShoulderStep {
    Continue,
    /// First check without fresh orientation; the move carries on by duration only.
    EnteredOpenLoop,
    Finished,
    LimitReached,
}

/// Progress of one timed shoulder move, checked against the pitch limits
/// every poll.
#[derive(Debug, Clone, Copy)]
pub struct ShoulderRun {
    limits: ShoulderLimits,
    mv: ShoulderMove,
    open_loop: bool,
}

impl ShoulderRun {
    /// Refuses to start a move that is already past its limit.
    pub fn start(
        limits: ShoulderLimits,
        mv: ShoulderMove,
        euler: Option<EulerAngles>,
    ) -> Option<Self> {
        if limits.check(euler, mv.direction) == LimitCheck::Blocked {
            return None;
        }
        Some(Self {
            limits,
            mv,
            open_loop: euler.is_none(),
        })
    }

    pub fn is_open_loop(&self) -> bool {
        self.open_loop
    }

    pub fn step(&mut self, elapsed_ms: u64, euler: Option<EulerAngles>) -> ShoulderStep {
        match self.limits.check(euler, self.mv.direction) {
            LimitCheck::Blocked => return ShoulderStep::LimitReached,
            LimitCheck::Allowed => self.open_loop = false,
            LimitCheck::Unknown if !self.open_loop => {
                self.open_loop = true;
                if elapsed_ms < self.mv.duration_ms as u64 {
                    return ShoulderStep::EnteredOpenLoop;
                }
            }
            LimitCheck::Unknown => {}
        }
        if elapsed_ms >= self.mv.duration_ms as u64 {
            ShoulderStep::Finished
        } else {
            ShoulderStep::Continue
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WristDimension {
    Pitch,
    Roll,
}

impl WristDimension {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(WristDimension::Pitch),
            1 => Some(WristDimension::Roll),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WristCommand {
    /// Degrees.
    pub delta: f32,
    pub dimension: WristDimension,
}

/// Planned differential move: both motors run for `duration_ms`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WristMove {
    pub left: Direction,
    pub right: Direction,
    pub duration_ms: u32,
    pub dimension: WristDimension,
    /// Signed degrees actually covered once the move completes.
    pub delta: f32,
}

/// Open-loop estimate of the differential wrist orientation.
#[derive(Debug, Clone, Copy)]
pub struct DiffGearbox {
    cfg: MotorJointConfig,
    deg_per_sec: f32,
    pitch: f32,
    roll: f32,
}

impl DiffGearbox {
    pub fn new(pitch: f32) -> Self {
        Self {
            cfg: WRIST,
            deg_per_sec: WRIST_DEG_PER_SEC,
            pitch: pitch.clamp(WRIST.limit_min, WRIST.limit_max),
            roll: 0.0,
        }
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn roll(&self) -> f32 {
        self.roll
    }

    /// `None` when the command would not move the wrist (zero delta, or a
    /// pitch already at the limit).
    pub fn plan(&self, cmd: WristCommand) -> Option<WristMove> {
        let delta = match cmd.dimension {
            WristDimension::Pitch => {
                let target = (self.pitch + cmd.delta).clamp(self.cfg.limit_min, self.cfg.limit_max);
                target - self.pitch
            }
            WristDimension::Roll => cmd.delta,
        };
        if delta == 0.0 {
            return None;
        }

        let left = if delta > 0.0 {
            Direction::Forward
        } else {
            Direction::Reverse
        };
        let right = match cmd.dimension {
            WristDimension::Pitch => left,
            WristDimension::Roll => left.reversed(),
        };

        Some(WristMove {
            left,
            right,
            duration_ms: (delta.abs() / self.deg_per_sec * 1000.0) as u32,
            dimension: cmd.dimension,
            delta,
        })
    }

    /// Account for `elapsed_ms` of a planned move. Interrupted moves
    /// contribute proportionally.
    pub fn commit(&mut self, mv: &WristMove, elapsed_ms: u32) {
        let covered = if mv.duration_ms == 0 || elapsed_ms >= mv.duration_ms {
            mv.delta
        } else {
            mv.delta * elapsed_ms as f32 / mv.duration_ms as f32
        };
        match mv.dimension {
            WristDimension::Pitch => {
                self.pitch = (self.pitch + covered).clamp(self.cfg.limit_min, self.cfg.limit_max)
            }
            WristDimension::Roll => self.roll += covered,
        }
    }
}
