use embassy_executor::task;
use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Ticker};

use crate::board::ServoPwm;
use crate::config::{ELBOW, ROTUNDA, SERVO_EMA_ALPHA, SERVO_UPDATE_PERIOD_MS};
use crate::drivers::servo::PwmServo;
use crate::ipc::{update_joints, PersistRequest, SIGNALS, STORAGE_CH};
use crate::motion::ServoJoint;
use crate::telemetry::JointStates;

#[task]
pub async fn rotunda_task(pwm: ServoPwm, start: f32) {
    run_servo_joint(
        "rotunda",
        PwmServo::new(pwm, ROTUNDA),
        start,
        &SIGNALS.rotunda,
        |s, p| s.rotunda = p,
        PersistRequest::Rotunda,
    )
    .await
}

#[task]
pub async fn elbow_task(pwm: ServoPwm, start: f32) {
    run_servo_joint(
        "elbow",
        PwmServo::new(pwm, ELBOW),
        start,
        &SIGNALS.elbow,
        |s, p| s.elbow = p,
        PersistRequest::Elbow,
    )
    .await
}

/// Ease the servo toward each new target one 50 Hz frame at a time, then
/// hand the settled position to the count task for storage.
async fn run_servo_joint(
    name: &'static str,
    mut servo: PwmServo<ServoPwm>,
    start: f32,
    targets: &Signal<CriticalSectionRawMutex, i32>,
    record: fn(&mut JointStates, f32),
    persist: fn(f32) -> PersistRequest,
) {
    let mut joint = ServoJoint::new(*servo.config(), start);
    match servo.set_position(joint.current()) {
        Ok(p) => info!("{} servo holding {}", name, p),
        Err(e) => error!("{} servo PWM error: {:?}", name, e),
    }
    update_joints(|s| record(s, joint.current()));

    let mut frames = Ticker::every(Duration::from_millis(SERVO_UPDATE_PERIOD_MS));

    loop {
        let new_target = if joint.is_settled() {
            Some(targets.wait().await)
        } else {
            match select(frames.next(), targets.wait()).await {
                Either::First(()) => None,
                Either::Second(t) => Some(t),
            }
        };

        if let Some(t) = new_target {
            let accepted = joint.set_target(t as f32);
            if accepted != t as f32 {
                warn!("{} target {} clamped to {}", name, t, accepted);
            }
            info!("{} -> {}", name, accepted);
            frames.reset();
            continue;
        }

        let pos = match joint.step(SERVO_EMA_ALPHA) {
            Ok(p) => p,
            Err(e) => {
                error!("{} step failed: {:?}", name, e);
                continue;
            }
        };
        if let Err(e) = servo.set_position(pos) {
            warn!("{} servo PWM error: {:?}", name, e);
        }
        update_joints(|s| record(s, pos));

        if joint.is_settled() {
            debug!("{} settled at {}", name, pos);
            STORAGE_CH.try_send(persist(pos)).ok();
        }
    }
}
