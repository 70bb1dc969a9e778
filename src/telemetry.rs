//! Arm status as seen by the host link.

use bytemuck::{Pod, Zeroable};

use crate::config::{ELBOW, ROTUNDA};
use crate::drivers::claw::{ClawCommand, ClawDirection};
use crate::drivers::imu::EulerAngles;
use crate::drivers::motor::Direction;

/// Last commanded state of every joint. Written by the joint tasks.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct JointStates {
    pub rotunda: f32,
    pub elbow: f32,
    /// `Some` while the shoulder motor runs.
    pub shoulder: Option<Direction>,
    pub wrist_pitch: f32,
    pub wrist_roll: f32,
    pub claw: ClawCommand,
}

impl JointStates {
    pub const fn new() -> Self {
        Self {
            rotunda: ROTUNDA.start_pos,
            elbow: ELBOW.start_pos,
            shoulder: None,
            wrist_pitch: 0.0,
            wrist_roll: 0.0,
            claw: ClawCommand {
                direction: ClawDirection::Stop,
                speed: 0,
            },
        }
    }
}

impl Default for JointStates {
    fn default() -> Self {
        Self::new()
    }
}

/// Most recent sensor readings, `None` when stale or never read.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SensorReadings {
    pub euler: Option<EulerAngles>,
    /// (pitch, roll) from the MPU6050.
    pub tilt: Option<(f32, f32)>,
}

pub const FLAG_EULER_VALID: u8 = 1 << 0;
pub const FLAG_TILT_VALID: u8 = 1 << 1;

/// Wire-format status packet: exactly what the host link copies out.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Zeroable, Pod)]
pub struct ArmSnapshot {
    pub rotunda: f32,
    pub elbow: f32,
    pub wrist_pitch: f32,
    pub wrist_roll: f32,
    pub imu_yaw: f32,
    pub imu_roll: f32,
    pub imu_pitch: f32,
    pub tilt_pitch: f32,
    pub tilt_roll: f32,
    pub boot_count: u32,
    pub uptime_ms: u32,
    /// 0 idle, 1 raising, 2 lowering.
    pub shoulder: u8,
    /// Claw direction code as sent by mission control, two's complement.
    pub claw_direction: u8,
    pub claw_speed: u8,
    pub flags: u8,
}

pub const SNAPSHOT_LEN: usize = core::mem::size_of::<ArmSnapshot>();

impl ArmSnapshot {
    pub fn from_states(
        joints: &JointStates,
        sensors: &SensorReadings,
        boot_count: u32,
        uptime_ms: u32,
    ) -> Self {
        let mut snap = Self {
            rotunda: joints.rotunda,
            elbow: joints.elbow,
            wrist_pitch: joints.wrist_pitch,
            wrist_roll: joints.wrist_roll,
            boot_count,
            uptime_ms,
            shoulder: match joints.shoulder {
                None => 0,
                Some(Direction::Forward) => 1,
                Some(Direction::Reverse) => 2,
            },
            claw_direction: joints.claw.direction.code() as u8,
            claw_speed: joints.claw.speed.clamp(0, u8::MAX as i32) as u8,
            ..Self::default()
        };

        if let Some(e) = sensors.euler {
            snap.imu_yaw = e.yaw;
            snap.imu_roll = e.roll;
            snap.imu_pitch = e.pitch;
            snap.flags |= FLAG_EULER_VALID;
        }
        if let Some((pitch, roll)) = sensors.tilt {
            snap.tilt_pitch = pitch;
            snap.tilt_roll = roll;
            snap.flags |= FLAG_TILT_VALID;
        }
        snap
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_is_packed() {
        assert_eq!(SNAPSHOT_LEN, 9 * 4 + 2 * 4 + 4);
    }

    #[test]
    fn test_from_states_without_sensors() {
        let mut joints = JointStates::new();
        joints.shoulder = Some(Direction::Reverse);
        joints.claw = ClawCommand {
            direction: ClawDirection::Close,
            speed: 35,
        };
        let snap = ArmSnapshot::from_states(&joints, &SensorReadings::default(), 3, 1234);

        assert_eq!(snap.rotunda, ROTUNDA.start_pos);
        assert_eq!(snap.shoulder, 2);
        assert_eq!(snap.claw_direction as i8, -1);
        assert_eq!(snap.claw_speed, 35);
        assert_eq!(snap.flags, 0);
        assert_eq!(snap.boot_count, 3);
    }

    #[test]
    fn test_sensor_flags_and_layout() {
        let sensors = SensorReadings {
            euler: Some(EulerAngles {
                yaw: 10.0,
                roll: -2.0,
                pitch: 33.5,
            }),
            tilt: Some((1.0, 2.0)),
        };
        let snap = ArmSnapshot::from_states(&JointStates::new(), &sensors, 0, 0);
        assert_eq!(snap.flags, FLAG_EULER_VALID | FLAG_TILT_VALID);

        let bytes = snap.as_bytes();
        assert_eq!(bytes.len(), SNAPSHOT_LEN);
        // imu_pitch is the seventh f32
        assert_eq!(&bytes[24..28], &33.5f32.to_ne_bytes());
        let back: ArmSnapshot = bytemuck::pod_read_unaligned(bytes);
        assert_eq!(back, snap);
    }
}
