use core::cell::{Cell, RefCell};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex as RawMutex;
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::{channel::Channel, signal::Signal};
use embassy_time::{Duration, Instant};
use portable_atomic::{AtomicU32, Ordering};

use crate::command::{ArmParams, ArmUpdate};
use crate::config::*;
use crate::drivers::claw::ClawCommand;
use crate::drivers::imu::{EulerAngles, ImuData};
use crate::telemetry::{ArmSnapshot, JointStates, SensorReadings};

#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SystemMessage {
    ImuData { timestamp: Instant, data: ImuData },
    SystemAlert(SystemAlert),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SystemAlert {
    ImuError,
    CommunicationTimeout,
    StorageError,
    /// Shoulder move cut short at a pitch limit.
    ShoulderLimit,
}

/// Storage work for the count task, which owns the EEPROM.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PersistRequest {
    Rotunda(f32),
    Elbow(f32),
    WristPitch(f32),
}

/// One wake-up per subsystem. Signals keep only the newest value, so a
/// burst of requests collapses into the last one.
pub struct ArmSignals {
    pub rotunda: Signal<RawMutex, i32>,
    pub elbow: Signal<RawMutex, i32>,
    /// Signed duration in ms; 0 stops the shoulder.
    pub shoulder: Signal<RawMutex, i32>,
    /// Wrist semaphore. The wrist task reads delta and dimension from `ARM_PARAMS`.
    pub wrist: Signal<RawMutex, ()>,
    pub claw: Signal<RawMutex, ClawCommand>,
}

impl ArmSignals {
    pub const fn new() -> Self {
        Self {
            rotunda: Signal::new(),
            elbow: Signal::new(),
            shoulder: Signal::new(),
            wrist: Signal::new(),
            claw: Signal::new(),
        }
    }

    /// Wake every subsystem the update touched.
    pub fn publish(&self, update: &ArmUpdate) {
        if let Some(t) = update.rotunda {
            self.rotunda.signal(t);
        }
        if let Some(t) = update.elbow {
            self.elbow.signal(t);
        }
        if let Some(ms) = update.shoulder {
            self.shoulder.signal(ms);
        }
        if update.wrist {
            self.wrist.signal(());
        }
        if let Some(cmd) = update.claw {
            self.claw.signal(cmd);
        }
    }
}

/// Latest value of a sensor with the time it was taken.
pub struct Stamped<T> {
    inner: BlockingMutex<RawMutex, Cell<Option<(Instant, T)>>>,
}

impl<T: Copy> Stamped<T> {
    pub const fn new() -> Self {
        Self {
            inner: BlockingMutex::new(Cell::new(None)),
        }
    }

    pub fn publish(&self, at: Instant, value: T) {
        self.inner.lock(|c| c.set(Some((at, value))));
    }

    pub fn latest(&self) -> Option<(Instant, T)> {
        self.inner.lock(|c| c.get())
    }

    /// `None` if never published or older than `max_age` at `now`.
    pub fn fresh(&self, now: Instant, max_age: Duration) -> Option<T> {
        self.latest()
            .filter(|(at, _)| now.saturating_duration_since(*at) <= max_age)
            .map(|(_, v)| v)
    }
}

pub static SIGNALS: ArmSignals = ArmSignals::new();

pub static ARM_PARAMS: BlockingMutex<RawMutex, RefCell<ArmParams>> =
    BlockingMutex::new(RefCell::new(ArmParams::new()));
pub static JOINT_STATES: BlockingMutex<RawMutex, Cell<JointStates>> =
    BlockingMutex::new(Cell::new(JointStates::new()));

pub static SHOULDER_EULER: Stamped<EulerAngles> = Stamped::new();
/// (pitch, roll) from the MPU6050.
pub static TILT: Stamped<(f32, f32)> = Stamped::new();

pub static BOOT_COUNT: AtomicU32 = AtomicU32::new(0);

/*  storage & telemetry channels */
pub static STORAGE_CH: Channel<RawMutex, PersistRequest, STORAGE_CHANNEL_SIZE> = Channel::new();
pub static IMU_CH: Channel<RawMutex, (Instant, ImuData), IMU_CHANNEL_SIZE> = Channel::new();
pub static SYSTEM_CH: Channel<RawMutex, SystemMessage, SYSTEM_CHANNEL_SIZE> = Channel::new();

pub fn update_joints(f: impl FnOnce(&mut JointStates)) {
    JOINT_STATES.lock(|c| {
        let mut states = c.get();
        f(&mut states);
        c.set(states);
    });
}

pub fn sensor_readings(now: Instant) -> SensorReadings {
    let max_age = Duration::from_millis(IMU_STALE_MS);
    SensorReadings {
        euler: SHOULDER_EULER.fresh(now, max_age),
        tilt: TILT.fresh(now, max_age),
    }
}

pub fn arm_snapshot(now: Instant) -> ArmSnapshot {
    ArmSnapshot::from_states(
        &JOINT_STATES.lock(|c| c.get()),
        &sensor_readings(now),
        BOOT_COUNT.load(Ordering::Relaxed),
        now.as_millis() as u32,
    )
}

pub fn raise_alert(alert: SystemAlert) {
    SYSTEM_CH.try_send(SystemMessage::SystemAlert(alert)).ok();
}
