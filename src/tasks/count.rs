use embassy_executor::task;
use embassy_futures::select::{select, Either};
use embassy_time::{Duration, Instant, Ticker};
use portable_atomic::Ordering;

use crate::board::EepromFlash;
use crate::calibration::{CommitThrottle, StoredPose, BOOT_COUNT_ADDR};
use crate::config::{HEARTBEAT_PERIOD_MS, PERSIST_MIN_INTERVAL_MS};
use crate::drivers::eeprom::Eeprom;
use crate::ipc::{raise_alert, PersistRequest, SystemAlert, BOOT_COUNT, STORAGE_CH};

/// Owns the EEPROM: bumps the boot counter once, then keeps the pose
/// record in step with the joints without wearing out the flash page.
#[task]
pub async fn count_task(mut eeprom: Eeprom<EepromFlash>, mut pose: StoredPose) {
    match eeprom.count(BOOT_COUNT_ADDR).await {
        Ok(n) => {
            BOOT_COUNT.store(n as u32, Ordering::Relaxed);
            info!("Boot count: {}", n);
        }
        Err(e) => {
            error!("Boot counter update failed: {:?}", e);
            raise_alert(SystemAlert::StorageError);
        }
    }

    let mut heartbeat = Ticker::every(Duration::from_millis(HEARTBEAT_PERIOD_MS));
    let min_interval = Duration::from_millis(PERSIST_MIN_INTERVAL_MS);
    let mut throttle = CommitThrottle::new(min_interval, Instant::now());
    let mut beats = 0u32;

    loop {
        match select(heartbeat.next(), STORAGE_CH.receive()).await {
            Either::First(()) => {
                beats = beats.wrapping_add(1);
                trace!("heartbeat {}", beats);
            }
            Either::Second(req) => {
                match req {
                    PersistRequest::Rotunda(p) => pose.rotunda = p,
                    PersistRequest::Elbow(p) => pose.elbow = p,
                    PersistRequest::WristPitch(p) => pose.wrist_pitch = p,
                }
                if let Err(e) = pose.store(&mut eeprom) {
                    warn!("Pose record rejected: {:?}", e);
                }
            }
        }

        let now = Instant::now();
        if throttle.ready(now, eeprom.is_dirty()) {
            match eeprom.commit().await {
                Ok(()) => debug!("Pose saved: {}", pose),
                Err(e) => {
                    error!("EEPROM commit failed: {:?}", e);
                    raise_alert(SystemAlert::StorageError);
                }
            }
            throttle.committed(now);
        }
    }
}
