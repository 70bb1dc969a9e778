use embassy_executor::task;
use embassy_stm32::gpio::Output;
use embassy_time::{Duration, Instant};

use crate::board::MotorPwm;
use crate::config::{IMU_STALE_MS, SHOULDER_SPEED_PCT};
use crate::drivers::motor::DcMotor;
use crate::ipc::{raise_alert, update_joints, SystemAlert, SHOULDER_EULER, SIGNALS};
use crate::motion::{ShoulderLimits, ShoulderMove, ShoulderRun};
use crate::moves::{run_shoulder, ShoulderOutcome};

type ShoulderMotor = DcMotor<MotorPwm, Output<'static>>;

#[task]
pub async fn shoulder_task(mut motor: ShoulderMotor) {
    info!("Shoulder task started");
    let limits = ShoulderLimits::default();
    let stale = Duration::from_millis(IMU_STALE_MS);
    let mut pending: Option<i32> = None;

    loop {
        let ms = match pending.take() {
            Some(ms) => ms,
            None => SIGNALS.shoulder.wait().await,
        };

        let Some(mv) = ShoulderMove::from_duration(ms) else {
            stop(&mut motor);
            continue;
        };

        let euler = SHOULDER_EULER.fresh(Instant::now(), stale);
        let Some(mut run) = ShoulderRun::start(limits, mv, euler) else {
            warn!("Shoulder {:?} refused at pitch limit", mv.direction);
            raise_alert(SystemAlert::ShoulderLimit);
            stop(&mut motor);
            continue;
        };
        if run.is_open_loop() {
            warn!("Shoulder IMU stale, running open loop");
        }

        info!("Shoulder {:?} for {} ms", mv.direction, mv.duration_ms);
        if let Err(e) = motor.drive(mv.direction, SHOULDER_SPEED_PCT) {
            error!("Shoulder drive failed: {:?}", e);
            stop(&mut motor);
            continue;
        }
        update_joints(|s| s.shoulder = Some(mv.direction));

        match run_shoulder(&mut run, &SHOULDER_EULER, &SIGNALS.shoulder).await {
            ShoulderOutcome::Finished => debug!("Shoulder move complete"),
            ShoulderOutcome::LimitReached => {
                warn!("Shoulder stopped at pitch limit");
                raise_alert(SystemAlert::ShoulderLimit);
            }
            ShoulderOutcome::Replaced(next) => pending = Some(next),
        }
        stop(&mut motor);
    }
}

fn stop(motor: &mut ShoulderMotor) {
    if let Err(e) = motor.stop() {
        error!("Shoulder stop failed: {:?}", e);
    }
    update_joints(|s| s.shoulder = None);
}
