use embassy_executor::task;

use crate::board::MotorPwm;
use crate::config::WRIST_SPEED_PCT;
use crate::drivers::motor::{ActuatorError, DcMotor};
use crate::ipc::{update_joints, PersistRequest, ARM_PARAMS, SIGNALS, STORAGE_CH};
use crate::motion::{DiffGearbox, WristMove};
use crate::moves::run_wrist;
use embassy_stm32::gpio::Output;

type WristMotor = DcMotor<MotorPwm, Output<'static>>;

/// Differential wrist: two motors driven together for pitch, against each other for roll.
#[task]
pub async fn wrist_task(mut left: WristMotor, mut right: WristMotor, pitch: f32) {
    info!("Wrist task started at pitch {}", pitch);
    let mut gearbox = DiffGearbox::new(pitch);
    update_joints(|s| s.wrist_pitch = gearbox.pitch());
    let mut preempted = false;

    loop {
        if !preempted {
            SIGNALS.wrist.wait().await;
        }
        preempted = false;

        let params = ARM_PARAMS.lock(|p| *p.borrow());
        let Some(cmd) = params.wrist_command() else {
            warn!("Unknown wrist dimension {}", params.wrist_dimension);
            continue;
        };
        let Some(mv) = gearbox.plan(cmd) else {
            debug!("Wrist command {:?} needs no motion", cmd);
            continue;
        };

        info!(
            "Wrist {:?} {} deg over {} ms",
            mv.dimension, mv.delta, mv.duration_ms
        );
        if let Err(e) = drive(&mut left, &mut right, &mv) {
            error!("Wrist drive failed: {:?}", e);
            halt(&mut left, &mut right);
            continue;
        }

        let done = run_wrist(&mv, &SIGNALS.wrist).await;
        preempted = done.preempted;
        halt(&mut left, &mut right);

        gearbox.commit(&mv, done.elapsed_ms);
        update_joints(|s| {
            s.wrist_pitch = gearbox.pitch();
            s.wrist_roll = gearbox.roll();
        });
        STORAGE_CH
            .try_send(PersistRequest::WristPitch(gearbox.pitch()))
            .ok();
    }
}

fn drive(
    left: &mut WristMotor,
    right: &mut WristMotor,
    mv: &WristMove,
) -> Result<(), ActuatorError> {
    left.drive(mv.left, WRIST_SPEED_PCT)?;
    right.drive(mv.right, WRIST_SPEED_PCT)
}

fn halt(left: &mut WristMotor, right: &mut WristMotor) {
    for motor in [left, right] {
        if let Err(e) = motor.stop() {
            error!("Wrist stop failed: {:?}", e);
        }
    }
}
