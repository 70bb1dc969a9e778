//! InvenSense MPU6050 accelerometer/gyroscope over I2C.
//!
//! Only the power-on defaults are used (±2 g, ±250 °/s, no DLPF), so the scale
//! factors in [`regs::mpu6050`](super::regs::mpu6050) apply unchanged.

use embassy_time::{Duration, Timer};
use embedded_hal_async::i2c::I2c;
use micromath::F32Ext;

use super::regs::mpu6050::*;
use super::{be_i16, ImuError, Vector3};

const STANDARD_GRAVITY: f32 = 9.80665;

/// Counts straight from the data registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawSample {
    pub accel: [i16; 3],
    pub temp: i16,
    pub gyro: [i16; 3],
}

/// Scaled sample: m/s², °/s, °C.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotionSample {
    pub accel: Vector3,
    pub gyro: Vector3,
    pub temp_c: f32,
}

impl RawSample {
    pub fn from_burst(buf: &[u8; BURST_LEN]) -> Self {
        let word = |i: usize| be_i16(buf[i], buf[i + 1]);
        Self {
            accel: [word(0), word(2), word(4)],
            temp: word(6),
            gyro: [word(8), word(10), word(12)],
        }
    }

    pub fn scaled(&self) -> MotionSample {
        let g = |c: i16| c as f32 / ACCEL_LSB_PER_G * STANDARD_GRAVITY;
        let dps = |c: i16| c as f32 / GYRO_LSB_PER_DPS;
        MotionSample {
            accel: Vector3 {
                x: g(self.accel[0]),
                y: g(self.accel[1]),
                z: g(self.accel[2]),
            },
            gyro: Vector3 {
                x: dps(self.gyro[0]),
                y: dps(self.gyro[1]),
                z: dps(self.gyro[2]),
            },
            temp_c: self.temp as f32 / TEMP_LSB_PER_C + TEMP_OFFSET_C,
        }
    }
}

impl MotionSample {
    /// (pitch, roll) in degrees from the gravity vector. Only meaningful at rest.
    pub fn tilt(&self) -> (f32, f32) {
        let a = self.accel;
        let horiz = F32Ext::sqrt(a.y * a.y + a.z * a.z);
        let pitch = F32Ext::atan2(-a.x, horiz);
        let roll = F32Ext::atan2(a.y, a.z);
        (pitch.to_degrees(), roll.to_degrees())
    }
}

pub struct Mpu6050<I2C> {
    i2c: I2C,
    addr: u8,
}

impl<I2C: I2c> Mpu6050<I2C> {
    pub fn new(i2c: I2C, addr: u8) -> Self {
        Self { i2c, addr }
    }

    pub fn address(&self) -> u8 {
        self.addr
    }

    pub fn release(self) -> I2C {
        self.i2c
    }

    pub async fn init(&mut self) -> Result<(), ImuError> {
        let id = self.read_byte(WHO_AM_I).await?;
        if id != WHO_AM_I_VALUE {
            error!("MPU6050 at 0x{:02X}: WHO_AM_I 0x{:02X}", self.addr, id);
            return Err(ImuError::WrongChipId(id));
        }

        // Leaves sleep mode, which is the power-on state.
        self.write_byte(PWR_MGMT_1, PWR_MGMT_1_WAKE_PLL_X).await?;
        Timer::after(Duration::from_millis(10)).await;

        let pwr = self.read_byte(PWR_MGMT_1).await?;
        if pwr != PWR_MGMT_1_WAKE_PLL_X {
            return Err(ImuError::ModeMismatch {
                expected: PWR_MGMT_1_WAKE_PLL_X,
                got: pwr,
            });
        }
        info!("MPU6050 awake at 0x{:02X}", self.addr);
        Ok(())
    }

    pub async fn reset(&mut self) -> Result<(), ImuError> {
        self.write_byte(PWR_MGMT_1, PWR_MGMT_1_DEVICE_RESET).await?;
        Timer::after(Duration::from_millis(100)).await;
        Ok(())
    }

    pub async fn read_raw(&mut self) -> Result<RawSample, ImuError> {
        let mut buf = [0u8; BURST_LEN];
        self.i2c
            .write_read(self.addr, &[ACCEL_XOUT_H], &mut buf)
            .await
            .map_err(ImuError::bus)?;
        Ok(RawSample::from_burst(&buf))
    }

    pub async fn read(&mut self) -> Result<MotionSample, ImuError> {
        Ok(self.read_raw().await?.scaled())
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RegisterBus;
    use embassy_futures::block_on;

    fn bus_at(addr: u8) -> RegisterBus {
        let mut bus = RegisterBus::new(addr);
        bus.regs[WHO_AM_I as usize] = WHO_AM_I_VALUE;
        bus.regs[PWR_MGMT_1 as usize] = 0x40; // SLEEP after power-on
        bus
    }

    #[test]
    fn test_init_wakes_device() {
        let mut imu = Mpu6050::new(bus_at(ADDR1), ADDR1);
        block_on(imu.init()).unwrap();
        assert_eq!(imu.release().regs[PWR_MGMT_1 as usize], PWR_MGMT_1_WAKE_PLL_X);
    }

    #[test]
    fn test_init_rejects_other_chip() {
        let mut bus = bus_at(ADDR0);
        bus.regs[WHO_AM_I as usize] = 0x71;
        let mut imu = Mpu6050::new(bus, ADDR0);
        assert_eq!(block_on(imu.init()), Err(ImuError::WrongChipId(0x71)));
    }

    #[test]
    fn test_burst_is_big_endian() {
        let mut bus = bus_at(ADDR0);
        bus.load(ACCEL_XOUT_H, &16384i16.to_be_bytes());
        bus.load(ACCEL_ZOUT_H, &(-8192i16).to_be_bytes());
        bus.load(TEMP_OUT_H, &340i16.to_be_bytes());
        bus.load(GYRO_YOUT_H, &131i16.to_be_bytes());
        let mut imu = Mpu6050::new(bus, ADDR0);

        let raw = block_on(imu.read_raw()).unwrap();
        assert_eq!(raw.accel, [16384, 0, -8192]);
        assert_eq!(raw.temp, 340);
        assert_eq!(raw.gyro, [0, 131, 0]);

        let s = raw.scaled();
        assert!((s.accel.x - STANDARD_GRAVITY).abs() < 1e-4);
        assert!((s.accel.z + STANDARD_GRAVITY / 2.0).abs() < 1e-4);
        assert!((s.temp_c - 37.53).abs() < 1e-4);
        assert!((s.gyro.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_tilt_level_and_nose_down() {
        let level = RawSample {
            accel: [0, 0, 16384],
            ..Default::default()
        }
        .scaled();
        let (pitch, roll) = level.tilt();
        assert!(pitch.abs() < 0.5 && roll.abs() < 0.5);

        let nose = RawSample {
            accel: [16384, 0, 0],
            ..Default::default()
        }
        .scaled();
        let (pitch, _) = nose.tilt();
        assert!((pitch + 90.0).abs() < 0.5);
    }
}
