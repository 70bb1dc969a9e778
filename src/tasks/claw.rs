use embassy_executor::task;
use embassy_stm32::gpio::Output;

use crate::board::MotorPwm;
use crate::drivers::claw::LinearActuator;
use crate::ipc::{update_joints, SIGNALS};

#[task]
pub async fn claw_task(mut claw: LinearActuator<Output<'static>, MotorPwm>) {
    if let Err(e) = claw.init() {
        error!("Claw init failed: {:?}", e);
    }
    info!("Claw task started");

    loop {
        let cmd = SIGNALS.claw.wait().await;
        match claw.apply(cmd) {
            Ok(true) => {
                info!("Claw {:?} at {}%", cmd.direction, claw.speed());
                update_joints(|s| s.claw = cmd);
            }
            Ok(false) => {
                warn!("Claw phase did not latch for {:?}, stopped", cmd.direction);
                update_joints(|s| s.claw.speed = 0);
            }
            Err(e) => error!("Claw command failed: {:?}", e),
        }
    }
}
