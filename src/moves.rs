//! Timed motor moves raced against the signal that can cut them short.

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex as RawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant, Timer};

use crate::config::{IMU_STALE_MS, SHOULDER_CHECK_PERIOD_MS};
use crate::drivers::imu::EulerAngles;
use crate::ipc::Stamped;
use crate::motion::{ShoulderRun, ShoulderStep, WristMove};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ShoulderOutcome {
    Finished,
    LimitReached,
    /// A new duration arrived while moving.
    Replaced(i32),
}

/// Poll `orientation` every check period until the move times out, hits a
/// limit, or `next` delivers a new duration.
pub async fn run_shoulder(
    run: &mut ShoulderRun,
    orientation: &Stamped<EulerAngles>,
    next: &Signal<RawMutex, i32>,
) -> ShoulderOutcome {
    let started = Instant::now();
    let stale = Duration::from_millis(IMU_STALE_MS);

    loop {
        let tick = Timer::after(Duration::from_millis(SHOULDER_CHECK_PERIOD_MS));
        if let Either::Second(ms) = select(tick, next.wait()).await {
            return ShoulderOutcome::Replaced(ms);
        }

        let now = Instant::now();
        let elapsed = now.saturating_duration_since(started).as_millis();
        match run.step(elapsed, orientation.fresh(now, stale)) {
            ShoulderStep::Continue => {}
            ShoulderStep::EnteredOpenLoop => warn!("Shoulder IMU stale, running open loop"),
            ShoulderStep::Finished => return ShoulderOutcome::Finished,
            ShoulderStep::LimitReached => return ShoulderOutcome::LimitReached,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WristRun {
    pub elapsed_ms: u32,
    /// A new wrist semaphore arrived before the move finished.
    pub preempted: bool,
}

/// Wait out a wrist move unless `preempt` fires first.
pub async fn run_wrist(mv: &WristMove, preempt: &Signal<RawMutex, ()>) -> WristRun {
    let started = Instant::now();
    let run = Timer::after(Duration::from_millis(mv.duration_ms as u64));
    let preempted = matches!(select(run, preempt.wait()).await, Either::Second(()));
    WristRun {
        elapsed_ms: started.elapsed().as_millis() as u32,
        preempted,
    }
}
