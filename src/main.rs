#![no_std]
#![no_main]

use defmt::*;
use embassy_embedded_hal::shared_bus::asynch::i2c::I2cDevice;
use embassy_executor::Spawner;
use embassy_sync::mutex::Mutex;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use arm_embassy::{
    board::I2cBus,
    calibration::StoredPose,
    config::{EEPROM_FLASH_OFFSET, IMU_ADDRESS_SHOULDER, MPU6050_ADDRESS, SHOULDER, WRIST},
    drivers::{Bno055, DcMotor, Eeprom, LinearActuator, Mpu6050},
    tasks::{
        claw_task, count_task, elbow_task, host_link_task, imu_stats_task, mpu6050_task,
        rotunda_task, shoulder_imu_task, shoulder_task, telemetry_task, wrist_task,
    },
    Board,
};

static I2C_BUS: StaticCell<I2cBus> = StaticCell::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Starting arm-embassy joint controller");
    let board = Board::init();

    // Resume from the last saved pose
    let mut eeprom = Eeprom::new(board.flash, EEPROM_FLASH_OFFSET);
    let pose = match eeprom.begin().await {
        Ok(()) => StoredPose::load(&eeprom).unwrap_or_else(|| {
            info!("No saved pose, using start positions");
            StoredPose::default()
        }),
        Err(e) => {
            error!("EEPROM unavailable: {:?}", e);
            StoredPose::default()
        }
    };
    info!("Pose: {}", pose);

    spawner.spawn(count_task(eeprom, pose)).unwrap();
    spawner.spawn(rotunda_task(board.rotunda, pose.rotunda)).unwrap();
    spawner.spawn(elbow_task(board.elbow, pose.elbow)).unwrap();

    let shoulder = DcMotor::new(board.shoulder.sig, board.shoulder.dir, SHOULDER);
    spawner.spawn(shoulder_task(shoulder)).unwrap();

    let left = DcMotor::new(board.wrist_left.sig, board.wrist_left.dir, WRIST);
    // Right motor is mounted mirrored
    let right = DcMotor::new(board.wrist_right.sig, board.wrist_right.dir, WRIST).inverted(true);
    spawner.spawn(wrist_task(left, right, pose.wrist_pitch)).unwrap();

    let claw = LinearActuator::new(board.claw_phase, board.claw_enable);
    spawner.spawn(claw_task(claw)).unwrap();
    info!("Joint tasks spawned");

    let bus = I2C_BUS.init(Mutex::new(board.i2c2));

    let mut bno = Bno055::new(I2cDevice::new(bus), IMU_ADDRESS_SHOULDER);
    match bno.init().await {
        Ok(()) => {
            spawner.spawn(shoulder_imu_task(bno)).unwrap();
            spawner.spawn(imu_stats_task()).unwrap();
            info!("Shoulder IMU task spawned");
        }
        Err(e) => error!("Shoulder IMU initialization failed: {:?}", e),
    }

    let mut mpu = Mpu6050::new(I2cDevice::new(bus), MPU6050_ADDRESS);
    match mpu.init().await {
        Ok(()) => {
            spawner.spawn(mpu6050_task(mpu)).unwrap();
            info!("MPU6050 task spawned");
        }
        Err(e) => error!("MPU6050 initialization failed: {:?}", e),
    }

    spawner.spawn(telemetry_task()).unwrap();
    spawner
        .spawn(host_link_task(board.spi1, board.data_ready_spi))
        .unwrap();
    info!("Host link task spawned");

    core::future::pending::<()>().await;
}
