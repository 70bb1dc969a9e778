use embassy_executor::task;
use embassy_time::{Duration, Instant, Ticker};

use crate::board::SharedI2c;
use crate::config::{IMU_ERROR_ALERT_THRESHOLD, IMU_SAMPLE_PERIOD_MS, MPU6050_SAMPLE_PERIOD_MS};
use crate::drivers::imu::{Bno055, ImuData, Mpu6050};
use crate::ipc::{
    raise_alert, SystemAlert, SystemMessage, IMU_CH, SHOULDER_EULER, SYSTEM_CH, TILT,
};

/// Counts read failures and decides when to log and when to alert.
struct ErrorTracker {
    total: u32,
    consecutive: u32,
}

impl ErrorTracker {
    const fn new() -> Self {
        Self {
            total: 0,
            consecutive: 0,
        }
    }

    fn failed(&mut self) -> (bool, bool) {
        self.total += 1;
        self.consecutive += 1;
        let log = self.consecutive % 100 == 1;
        let alert = self.consecutive >= IMU_ERROR_ALERT_THRESHOLD;
        (log, alert)
    }

    fn recovered(&mut self) -> Option<u32> {
        let n = core::mem::replace(&mut self.consecutive, 0);
        (n > 0).then_some(n)
    }
}

/// BNO055 on the shoulder link. Publishes fused orientation for the shoulder limit check.
#[task]
pub async fn shoulder_imu_task(mut imu: Bno055<SharedI2c>) {
    info!(
        "Shoulder IMU task started - sampling at {}ms intervals",
        IMU_SAMPLE_PERIOD_MS
    );
    let mut ticker = Ticker::every(Duration::from_millis(IMU_SAMPLE_PERIOD_MS));
    let mut errors = ErrorTracker::new();

    loop {
        ticker.next().await;

        match imu.read_all_data().await {
            Ok(data) => {
                debug!(
                    "Euler: yaw={} roll={} pitch={} | calib sys={} gyro={} accel={} mag={}",
                    data.euler.yaw,
                    data.euler.roll,
                    data.euler.pitch,
                    data.calib.sys,
                    data.calib.gyro,
                    data.calib.accel,
                    data.calib.mag
                );

                let timestamp = Instant::now();
                SHOULDER_EULER.publish(timestamp, data.euler);

                IMU_CH.try_send((timestamp, data)).ok();
                SYSTEM_CH
                    .try_send(SystemMessage::ImuData { timestamp, data })
                    .ok();

                if let Some(n) = errors.recovered() {
                    info!("IMU recovered after {} consecutive errors", n);
                }
            }
            Err(e) => {
                let (log, alert) = errors.failed();
                if log {
                    warn!("IMU read error #{}: {:?}", errors.total, e);
                }
                if alert {
                    raise_alert(SystemAlert::ImuError);
                }
            }
        }
    }
}

/// MPU6050 accelerometer/gyro. Publishes a gravity-derived tilt estimate.
#[task]
pub async fn mpu6050_task(mut imu: Mpu6050<SharedI2c>) {
    info!(
        "MPU6050 task started - sampling at {}ms intervals",
        MPU6050_SAMPLE_PERIOD_MS
    );
    let mut ticker = Ticker::every(Duration::from_millis(MPU6050_SAMPLE_PERIOD_MS));
    let mut errors = ErrorTracker::new();

    loop {
        ticker.next().await;

        match imu.read().await {
            Ok(sample) => {
                let tilt = sample.tilt();
                trace!(
                    "MPU6050: tilt pitch={} roll={} temp={}",
                    tilt.0,
                    tilt.1,
                    sample.temp_c
                );
                TILT.publish(Instant::now(), tilt);

                if let Some(n) = errors.recovered() {
                    info!("MPU6050 recovered after {} consecutive errors", n);
                }
            }
            Err(e) => {
                let (log, alert) = errors.failed();
                if log {
                    warn!("MPU6050 read error #{}: {:?}", errors.total, e);
                }
                if alert {
                    raise_alert(SystemAlert::ImuError);
                }
            }
        }
    }
}

#[task]
pub async fn imu_stats_task() {
    info!("IMU stats task started");
    let mut last_sec = Instant::now();
    let mut samples = 0u32;
    let mut duplicates = 0u32;
    let mut prev: Option<ImuData> = None;

    loop {
        let (timestamp, data) = IMU_CH.receive().await;
        samples += 1;

        if let Some(ref previous_data) = prev {
            if data.is_duplicate_of(previous_data) {
                duplicates += 1;
            }
        }
        prev = Some(data);

        // Report stats every second
        if timestamp.duration_since(last_sec) >= Duration::from_secs(1) {
            let duplicate_rate = (duplicates * 100) / samples.max(1);
            info!("IMU: {} Hz, {}% duplicates", samples, duplicate_rate);
            samples = 0;
            duplicates = 0;
            last_sec = timestamp;
        }
    }
}
