use embassy_executor::task;
use embassy_time::{Duration, Instant, Ticker};

use crate::config::{HEARTBEAT_PERIOD_MS, TELEMETRY_PERIOD_MS};
use crate::ipc::{arm_snapshot, SystemMessage, SYSTEM_CH};

/// Periodic status publisher. Drains the system channel and logs a status
/// line every heartbeat.
#[task]
pub async fn telemetry_task() {
    info!("Telemetry task started");
    let mut ticker = Ticker::every(Duration::from_millis(TELEMETRY_PERIOD_MS));
    let beats_per_log = (HEARTBEAT_PERIOD_MS / TELEMETRY_PERIOD_MS).max(1) as u32;
    let mut ticks = 0u32;
    let mut imu_samples = 0u32;

    loop {
        ticker.next().await;

        while let Ok(msg) = SYSTEM_CH.try_receive() {
            match msg {
                SystemMessage::ImuData { .. } => imu_samples += 1,
                SystemMessage::SystemAlert(alert) => warn!("ALERT: {:?}", alert),
            }
        }

        ticks += 1;
        if ticks % beats_per_log == 0 {
            let snap = arm_snapshot(Instant::now());
            info!(
                "rotunda={} elbow={} wrist p={} r={} shoulder={} claw={}/{}% imu pitch={} ({} samples) boot={}",
                snap.rotunda,
                snap.elbow,
                snap.wrist_pitch,
                snap.wrist_roll,
                snap.shoulder,
                snap.claw_direction as i8,
                snap.claw_speed,
                snap.imu_pitch,
                imu_samples,
                snap.boot_count
            );
            imu_samples = 0;
        }
    }
}
