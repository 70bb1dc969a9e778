//! Pose record kept in the emulated EEPROM so the arm resumes where it stopped.
//!
//! ```text
//! 0x00        boot counter (owned by the count task)
//! 0x01        record version
//! 0x02..0x03  rotunda position, u16 LE
//! 0x04..0x05  elbow position, u16 LE
//! 0x06..0x07  wrist pitch in centidegrees, i16 LE
//! 0x08..0x09  crc16 of 0x01..0x07
//! ```

use crc16::{State, CCITT_FALSE};
use embassy_time::{Duration, Instant};
use embedded_storage_async::nor_flash::NorFlash;

use crate::config::{ELBOW, EEPROM_BASE_ADDR, ROTUNDA, WRIST};
use crate::drivers::eeprom::{Eeprom, EepromError};

pub const BOOT_COUNT_ADDR: usize = EEPROM_BASE_ADDR;
pub const POSE_ADDR: usize = EEPROM_BASE_ADDR + 1;
pub const POSE_VERSION: u8 = 1;
const POSE_BODY_LEN: usize = 7;
pub const POSE_LEN: usize = POSE_BODY_LEN + 2;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StoredPose {
    pub rotunda: f32,
    pub elbow: f32,
    pub wrist_pitch: f32,
}

impl Default for StoredPose {
    fn default() -> Self {
        Self {
            rotunda: ROTUNDA.start_pos,
            elbow: ELBOW.start_pos,
            wrist_pitch: 0.0,
        }
    }
}

impl StoredPose {
    pub fn encode(&self) -> [u8; POSE_LEN] {
        let mut out = [0u8; POSE_LEN];
        out[0] = POSE_VERSION;
        out[1..3].copy_from_slice(&(self.rotunda as u16).to_le_bytes());
        out[3..5].copy_from_slice(&(self.elbow as u16).to_le_bytes());
        out[5..7].copy_from_slice(&((self.wrist_pitch * 100.0) as i16).to_le_bytes());
        let crc = State::<CCITT_FALSE>::calculate(&out[..POSE_BODY_LEN]);
        out[POSE_BODY_LEN..].copy_from_slice(&crc.to_le_bytes());
        out
    }

    /// `None` for a missing, stale-format, corrupt or out-of-limits record.
    pub fn decode(buf: &[u8; POSE_LEN]) -> Option<Self> {
        if buf[0] != POSE_VERSION {
            return None;
        }
        let crc = u16::from_le_bytes([buf[POSE_BODY_LEN], buf[POSE_BODY_LEN + 1]]);
        if State::<CCITT_FALSE>::calculate(&buf[..POSE_BODY_LEN]) != crc {
            return None;
        }

        let pose = Self {
            rotunda: u16::from_le_bytes([buf[1], buf[2]]) as f32,
            elbow: u16::from_le_bytes([buf[3], buf[4]]) as f32,
            wrist_pitch: i16::from_le_bytes([buf[5], buf[6]]) as f32 / 100.0,
        };
        pose.within_limits().then_some(pose)
    }

    pub fn within_limits(&self) -> bool {
        (ROTUNDA.pos_min..=ROTUNDA.pos_max).contains(&self.rotunda)
            && (ELBOW.pos_min..=ELBOW.pos_max).contains(&self.elbow)
            && (WRIST.limit_min..=WRIST.limit_max).contains(&self.wrist_pitch)
    }

    pub fn load<F: NorFlash>(eeprom: &Eeprom<F>) -> Option<Self> {
        let mut buf = [0u8; POSE_LEN];
        eeprom.read_slice(POSE_ADDR, &mut buf).ok()?;
        Self::decode(&buf)
    }

    /// Stage the record; the caller decides when to commit.
    pub fn store<F: NorFlash>(&self, eeprom: &mut Eeprom<F>) -> Result<(), EepromError> {
        eeprom.write_slice(POSE_ADDR, &self.encode())
    }
}

/// Spaces out EEPROM commits so a stream of pose updates erases the flash
/// page at most once per `min_interval`.
#[derive(Debug, Clone, Copy)]
pub struct CommitThrottle {
    min_interval: Duration,
    last: Instant,
}

impl CommitThrottle {
    /// The first commit waits a full interval after `now`.
    pub fn new(min_interval: Duration, now: Instant) -> Self {
        Self {
            min_interval,
            last: now,
        }
    }

    pub fn ready(&self, now: Instant, dirty: bool) -> bool {
        dirty && now.saturating_duration_since(self.last) >= self.min_interval
    }

    /// Record a commit attempt. Failed commits count too so a broken flash
    /// is not hammered.
    pub fn committed(&mut self, now: Instant) {
        self.last = now;
    }
}
