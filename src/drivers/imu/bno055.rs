use embassy_time::{Duration, Timer};
use embedded_hal_async::i2c::I2c;

use super::regs::bno055::*;
use super::{le_i16, CalibrationStatus, EulerAngles, ImuData, ImuError, Quaternion, Vector3};

/// 200ms, 400ms, 800ms ... capped at 6.4s.
fn backoff_ms(attempt: u8) -> u64 {
    200u64 << attempt.saturating_sub(1).min(5)
}

pub struct Bno055<I2C> {
    i2c: I2C,
    addr: u8,
}

impl<I2C: I2c> Bno055<I2C> {
    pub fn new(i2c: I2C, addr: u8) -> Self {
        Self { i2c, addr }
    }

    pub fn address(&self) -> u8 {
        self.addr
    }

    pub fn release(self) -> I2C {
        self.i2c
    }

    /// Bring the chip up in NDOF fusion mode, retrying with progressive backoff.
    pub async fn init_with_retries(&mut self, attempts: u8) -> Result<(), ImuError> {
        info!(
            "Starting BNO055 initialization sequence at 0x{:02X}...",
            self.addr
        );

        // Give the chip time to power up
        Timer::after(Duration::from_millis(100)).await;

        let mut last_error = ImuError::Timeout;
        for attempt in 1..=attempts {
            info!("BNO055 init attempt {}/{}", attempt, attempts);

            match self.try_init().await {
                Ok(()) => {
                    info!("BNO055 successfully initialized on attempt {}", attempt);
                    return Ok(());
                }
                Err(e) => {
                    warn!("BNO055 init attempt {} failed: {:?}", attempt, e);
                    last_error = e;

                    if attempt < attempts {
                        let delay_ms = backoff_ms(attempt);
                        info!("Waiting {}ms before next attempt...", delay_ms);
                        Timer::after(Duration::from_millis(delay_ms)).await;
                    }
                }
            }
        }

        error!("BNO055 initialization failed after {} attempts", attempts);
        Err(last_error)
    }

    pub async fn init(&mut self) -> Result<(), ImuError> {
        self.init_with_retries(5).await
    }

    async fn try_init(&mut self) -> Result<(), ImuError> {
        // A dummy read clears a half-finished transaction left on the bus.
        let _ = self.read_byte_with_retries(CHIP_ID, 3).await;

        let id = self.read_byte_with_retries(CHIP_ID, 5).await?;
        if id != CHIP_ID_VALUE {
            error!(
                "Invalid BNO055 ID: 0x{:02X}, expected 0x{:02X}",
                id, CHIP_ID_VALUE
            );
            return Err(ImuError::WrongChipId(id));
        }
        debug!("BNO055 chip ID verified: 0x{:02X}", id);

        info!("Performing software reset...");
        self.write_byte_with_retries(SYS_TRIGGER, SYS_TRIGGER_RST_SYS, 3)
            .await?;

        // Datasheet: up to 650ms
        Timer::after(Duration::from_millis(800)).await;
        self.wait_for_chip_ready().await?;

        self.write_byte_with_retries(PAGE_ID, 0x00, 3).await?;
        self.set_power_mode(PowerMode::Normal).await?;
        self.set_mode(OperationMode::Config).await?;

        self.write_byte_with_retries(UNIT_SEL, UNIT_SEL_DEFAULT, 3)
            .await?;
        Timer::after(Duration::from_millis(10)).await;

        self.set_mode(OperationMode::Ndof).await?;

        let mode = self.read_byte_with_retries(OPR_MODE, 3).await?;
        if mode != OperationMode::Ndof as u8 {
            error!("Failed to set NDOF mode: got 0x{:02X}, expected 0x0C", mode);
            return Err(ImuError::ModeMismatch {
                expected: OperationMode::Ndof as u8,
                got: mode,
            });
        }

        self.check_system_status().await?;

        info!("BNO055 initialization completed successfully");
        Ok(())
    }

    async fn wait_for_chip_ready(&mut self) -> Result<(), ImuError> {
        // Up to 2 seconds
        for _ in 0..20 {
            if let Ok(id) = self.read_byte(CHIP_ID).await {
                if id == CHIP_ID_VALUE {
                    return Ok(());
                }
            }
            Timer::after(Duration::from_millis(100)).await;
        }
        error!("Timeout waiting for chip to be ready");
        Err(ImuError::Timeout)
    }

    async fn check_system_status(&mut self) -> Result<(), ImuError> {
        let sys_stat = self.read_byte_with_retries(SYS_STAT, 3).await?;
        let sys_err = self.read_byte_with_retries(SYS_ERR, 3).await?;

        info!(
            "System status: 0x{:02X}, System error: 0x{:02X}",
            sys_stat, sys_err
        );

        match sys_stat {
            SYS_STAT_IDLE => info!("System idle"),
            SYS_STAT_SYS_ERROR => {
                error!("System error detected, error code: 0x{:02X}", sys_err);
                return Err(ImuError::System(sys_err));
            }
            SYS_STAT_INIT_PERIPHERALS => info!("Initializing peripherals..."),
            SYS_STAT_SYS_INIT => info!("System initialization..."),
            SYS_STAT_EXECUTING_SELFTEST => info!("Executing self-test..."),
            SYS_STAT_SENSOR_FUSION_RUNNING => info!("Sensor fusion running"),
            SYS_STAT_RUNNING_NO_FUSION => info!("Running without fusion"),
            _ => warn!("Unknown system status: 0x{:02X}", sys_stat),
        }
        Ok(())
    }

    pub async fn chip_id(&mut self) -> Result<u8, ImuError> {
        self.read_byte(CHIP_ID).await
    }

    pub async fn accel_id(&mut self) -> Result<u8, ImuError> {
        self.read_byte(ACC_ID).await
    }

    pub async fn set_mode(&mut self, mode: OperationMode) -> Result<(), ImuError> {
        self.write_byte_with_retries(OPR_MODE, mode as u8, 3).await?;
        // Any -> config takes 19ms, config -> any 7ms
        let settle = if mode == OperationMode::Config { 30 } else { 50 };
        Timer::after(Duration::from_millis(settle)).await;
        Ok(())
    }

    pub async fn set_power_mode(&mut self, mode: PowerMode) -> Result<(), ImuError> {
        self.write_byte_with_retries(PWR_MODE, mode as u8, 3).await
    }

    /// Fused orientation in degrees.
    pub async fn read_euler(&mut self) -> Result<EulerAngles, ImuError> {
        let raw = self.read_bytes::<6>(EUL_YAW_LSB).await?;
        Ok(EulerAngles {
            yaw: le_i16(raw[0], raw[1]) as f32 / EULER_LSB_PER_DEG,
            roll: le_i16(raw[2], raw[3]) as f32 / EULER_LSB_PER_DEG,
            pitch: le_i16(raw[4], raw[5]) as f32 / EULER_LSB_PER_DEG,
        })
    }

    pub async fn read_accel(&mut self) -> Result<Vector3, ImuError> {
        let raw = self.read_bytes::<6>(ACC_DATA_X_LSB).await?;
        Ok(Vector3 {
            x: le_i16(raw[0], raw[1]) as f32 / ACCEL_LSB_PER_MS2,
            y: le_i16(raw[2], raw[3]) as f32 / ACCEL_LSB_PER_MS2,
            z: le_i16(raw[4], raw[5]) as f32 / ACCEL_LSB_PER_MS2,
        })
    }

    pub async fn read_all_data(&mut self) -> Result<ImuData, ImuError> {
        let accel = self.read_accel().await?;

        let mag_raw = self.read_bytes::<6>(MAG_DATA_X_LSB).await?;
        let mag = Vector3 {
            x: le_i16(mag_raw[0], mag_raw[1]) as f32 / 16.0,
            y: le_i16(mag_raw[2], mag_raw[3]) as f32 / 16.0,
            z: le_i16(mag_raw[4], mag_raw[5]) as f32 / 16.0,
        };

        let gyro_raw = self.read_bytes::<6>(GYR_DATA_X_LSB).await?;
        let gyro = Vector3 {
            x: le_i16(gyro_raw[0], gyro_raw[1]) as f32 / 16.0,
            y: le_i16(gyro_raw[2], gyro_raw[3]) as f32 / 16.0,
            z: le_i16(gyro_raw[4], gyro_raw[5]) as f32 / 16.0,
        };

        let euler = self.read_euler().await?;

        let quat_raw = self.read_bytes::<8>(QUA_DATA_W_LSB).await?;
        let quat_scale = 1.0 / (1 << 14) as f32;
        let quat = Quaternion {
            w: le_i16(quat_raw[0], quat_raw[1]) as f32 * quat_scale,
            x: le_i16(quat_raw[2], quat_raw[3]) as f32 * quat_scale,
            y: le_i16(quat_raw[4], quat_raw[5]) as f32 * quat_scale,
            z: le_i16(quat_raw[6], quat_raw[7]) as f32 * quat_scale,
        };

        let temp = self.read_byte(TEMP).await? as i8;
        let calib = CalibrationStatus::from_byte(self.read_byte(CALIB_STAT).await?);

        Ok(ImuData {
            accel,
            gyro,
            mag,
            quat,
            euler,
            temp,
            calib,
        })
    }

    /* ================= register helpers ============================ */

    async fn read_byte_with_retries(&mut self, reg: u8, retries: u8) -> Result<u8, ImuError> {
        let mut last_error = ImuError::Timeout;

        for attempt in 1..=retries {
            match self.read_byte(reg).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    last_error = e;
                    if attempt < retries {
                        Timer::after(Duration::from_millis(10)).await;
                    }
                }
            }
        }

        Err(last_error)
    }

    async fn write_byte_with_retries(
        &mut self,
        reg: u8,
        value: u8,
        retries: u8,
    ) -> Result<(), ImuError> {
        let mut last_error = ImuError::Timeout;

        for attempt in 1..=retries {
            match self.write_byte(reg, value).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    last_error = e;
                    if attempt < retries {
                        Timer::after(Duration::from_millis(10)).await;
                    }
                }
            }
        }

        Err(last_error)
    }

    async fn write_byte(&mut self, reg: u8, value: u8) -> Result<(), ImuError> {
        self.i2c
            .write(self.addr, &[reg, value])
            .await
            .map_err(ImuError::bus)
    }

    async fn read_byte(&mut self, reg: u8) -> Result<u8, ImuError> {
        let mut buf = [0u8; 1];
        self.i2c
            .write_read(self.addr, &[reg], &mut buf)
            .await
            .map_err(ImuError::bus)?;
        Ok(buf[0])
    }

    async fn read_bytes<const N: usize>(&mut self, reg: u8) -> Result<[u8; N], ImuError> {
        let mut buf = [0u8; N];
        self.i2c
            .write_read(self.addr, &[reg], &mut buf)
            .await
            .map_err(ImuError::bus)?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RegisterBus;
    use embassy_futures::block_on;

    #[test]
    fn test_backoff_doubles_then_caps() {
        assert_eq!(backoff_ms(1), 200);
        assert_eq!(backoff_ms(2), 400);
        assert_eq!(backoff_ms(6), 6400);
        assert_eq!(backoff_ms(7), 6400);
        assert_eq!(backoff_ms(u8::MAX), 6400);
    }

    fn ready_bus() -> RegisterBus {
        let mut bus = RegisterBus::new(ADDR1);
        bus.regs[CHIP_ID as usize] = CHIP_ID_VALUE;
        bus.regs[SYS_STAT as usize] = SYS_STAT_SENSOR_FUSION_RUNNING;
        bus
    }

    #[test]
    fn test_init_reaches_ndof() {
        let mut imu = Bno055::new(ready_bus(), ADDR1);
        block_on(imu.init_with_retries(1)).unwrap();

        let bus = imu.release();
        assert_eq!(bus.regs[OPR_MODE as usize], OperationMode::Ndof as u8);
        assert_eq!(bus.regs[UNIT_SEL as usize], UNIT_SEL_DEFAULT);
        assert_eq!(bus.regs[PWR_MODE as usize], PowerMode::Normal as u8);
        assert!(bus
            .writes
            .iter()
            .any(|w| w.as_slice() == [SYS_TRIGGER, SYS_TRIGGER_RST_SYS]));
    }

    #[test]
    fn test_wrong_chip_id_rejected() {
        let mut bus = ready_bus();
        bus.regs[CHIP_ID as usize] = 0x68;
        let mut imu = Bno055::new(bus, ADDR1);
        assert_eq!(
            block_on(imu.init_with_retries(1)),
            Err(ImuError::WrongChipId(0x68))
        );
    }

    #[test]
    fn test_system_error_reported() {
        let mut bus = ready_bus();
        bus.regs[SYS_STAT as usize] = SYS_STAT_SYS_ERROR;
        bus.regs[SYS_ERR as usize] = 0x03;
        let mut imu = Bno055::new(bus, ADDR1);
        assert_eq!(block_on(imu.init_with_retries(1)), Err(ImuError::System(0x03)));
    }

    #[test]
    fn test_missing_device_is_bus_error() {
        let mut imu = Bno055::new(ready_bus(), ADDR0);
        assert!(matches!(
            block_on(imu.chip_id()),
            Err(ImuError::Bus(_))
        ));
    }

    #[test]
    fn test_read_euler_scaling() {
        let mut bus = ready_bus();
        // yaw 90°, roll -45°, pitch 12.5°
        bus.load(EUL_YAW_LSB, &(90i16 * 16).to_le_bytes());
        bus.load(EUL_ROLL_LSB, &(-45i16 * 16).to_le_bytes());
        bus.load(EUL_PITCH_LSB, &200i16.to_le_bytes());
        let mut imu = Bno055::new(bus, ADDR1);

        let e = block_on(imu.read_euler()).unwrap();
        assert_eq!(e.yaw, 90.0);
        assert_eq!(e.roll, -45.0);
        assert_eq!(e.pitch, 12.5);
    }

    #[test]
    fn test_read_all_data() {
        let mut bus = ready_bus();
        bus.load(ACC_DATA_X_LSB, &981i16.to_le_bytes());
        bus.load(QUA_DATA_W_LSB, &(1i16 << 14).to_le_bytes());
        bus.regs[TEMP as usize] = (-5i8) as u8;
        bus.regs[CALIB_STAT as usize] = 0xFF;
        let mut imu = Bno055::new(bus, ADDR1);

        let data = block_on(imu.read_all_data()).unwrap();
        assert!((data.accel.x - 9.81).abs() < 1e-4);
        assert_eq!(data.quat.w, 1.0);
        assert_eq!(data.temp, -5);
        assert!(data.calib.is_fully_calibrated());
        assert!(data.is_duplicate_of(&data));
    }
}
