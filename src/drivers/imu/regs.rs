// BNO055 / MPU6050 register maps.

#![allow(dead_code)]

/* ───── BNO055 ─────────────────────────────────────────────────────── */
pub mod bno055 {
    /* ────────────────── Bus addresses ─────────────── */
    pub const ADDR0: u8 = 0x28; // COM3 low
    pub const ADDR1: u8 = 0x29; // COM3 high

    /* ────────────────── Page 0 registers ──────────── */
    pub const CHIP_ID: u8 = 0x00;
    pub const ACC_ID: u8 = 0x01;
    pub const PAGE_ID: u8 = 0x07;

    pub const ACC_DATA_X_LSB: u8 = 0x08;
    pub const ACC_DATA_X_MSB: u8 = 0x09;
    pub const MAG_DATA_X_LSB: u8 = 0x0E;
    pub const GYR_DATA_X_LSB: u8 = 0x14;

    pub const EUL_YAW_LSB: u8 = 0x1A;
    pub const EUL_YAW_MSB: u8 = 0x1B;
    pub const EUL_ROLL_LSB: u8 = 0x1C;
    pub const EUL_ROLL_MSB: u8 = 0x1D;
    pub const EUL_PITCH_LSB: u8 = 0x1E;
    pub const EUL_PITCH_MSB: u8 = 0x1F;

    pub const QUA_DATA_W_LSB: u8 = 0x20;
    pub const TEMP: u8 = 0x34;
    pub const CALIB_STAT: u8 = 0x35;
    pub const SYS_STAT: u8 = 0x39;
    pub const SYS_ERR: u8 = 0x3A;
    pub const UNIT_SEL: u8 = 0x3B;
    pub const OPR_MODE: u8 = 0x3D;
    pub const PWR_MODE: u8 = 0x3E;
    pub const SYS_TRIGGER: u8 = 0x3F;

    /* ────────────────── Fixed values ──────────────── */
    pub const CHIP_ID_VALUE: u8 = 0xA0;
    pub const ACC_ID_VALUE: u8 = 0xFB;

    pub const SYS_TRIGGER_RST_SYS: u8 = 0x20;

    /// Android orientation, Celsius, degrees, dps, m/s².
    pub const UNIT_SEL_DEFAULT: u8 = 0x80;

    /// 1 degree = 16 LSB
    pub const EULER_LSB_PER_DEG: f32 = 16.0;
    /// 1 m/s² = 100 LSB
    pub const ACCEL_LSB_PER_MS2: f32 = 100.0;

    /* ────────────────── SYS_STAT values ───────────── */
    pub const SYS_STAT_IDLE: u8 = 0;
    pub const SYS_STAT_SYS_ERROR: u8 = 1;
    pub const SYS_STAT_INIT_PERIPHERALS: u8 = 2;
    pub const SYS_STAT_SYS_INIT: u8 = 3;
    pub const SYS_STAT_EXECUTING_SELFTEST: u8 = 4;
    pub const SYS_STAT_SENSOR_FUSION_RUNNING: u8 = 5;
    pub const SYS_STAT_RUNNING_NO_FUSION: u8 = 6;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    #[repr(u8)]
    pub enum OperationMode {
        Config = 0x00,
        AccOnly = 0x01,
        MagOnly = 0x02,
        GyroOnly = 0x03,
        AccMag = 0x04,
        AccGyro = 0x05,
        MagGyro = 0x06,
        Amg = 0x07,
        Imu = 0x08,
        Compass = 0x09,
        M4g = 0x0A,
        NdofFmcOff = 0x0B,
        Ndof = 0x0C,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    #[repr(u8)]
    pub enum PowerMode {
        Normal = 0x00,
        LowPower = 0x01,
        Suspend = 0x02,
    }
}

/* ───── MPU6050 ────────────────────────────────────────────────────── */
pub mod mpu6050 {
    pub const ADDR0: u8 = 0x68; // AD0 low
    pub const ADDR1: u8 = 0x69; // AD0 high

    pub const ACCEL_XOUT_H: u8 = 0x3B;
    pub const ACCEL_XOUT_L: u8 = 0x3C;
    pub const ACCEL_YOUT_H: u8 = 0x3D;
    pub const ACCEL_YOUT_L: u8 = 0x3E;
    pub const ACCEL_ZOUT_H: u8 = 0x3F;
    pub const ACCEL_ZOUT_L: u8 = 0x40;
    pub const TEMP_OUT_H: u8 = 0x41;
    pub const TEMP_OUT_L: u8 = 0x42;
    pub const GYRO_XOUT_H: u8 = 0x43;
    pub const GYRO_XOUT_L: u8 = 0x44;
    pub const GYRO_YOUT_H: u8 = 0x45;
    pub const GYRO_YOUT_L: u8 = 0x46;
    pub const GYRO_ZOUT_H: u8 = 0x47;
    pub const GYRO_ZOUT_L: u8 = 0x48;

    pub const PWR_MGMT_1: u8 = 0x6B;
    pub const WHO_AM_I: u8 = 0x75;

    /// WHO_AM_I does not reflect AD0, both addresses read 0x68.
    pub const WHO_AM_I_VALUE: u8 = 0x68;
    /// Sleep cleared, clock from the X gyro PLL.
    pub const PWR_MGMT_1_WAKE_PLL_X: u8 = 0x01;
    pub const PWR_MGMT_1_DEVICE_RESET: u8 = 0x80;

    /// ACCEL_XOUT_H .. GYRO_ZOUT_L
    pub const BURST_LEN: usize = (GYRO_ZOUT_L - ACCEL_XOUT_H + 1) as usize;

    /// ±2 g full scale
    pub const ACCEL_LSB_PER_G: f32 = 16384.0;
    /// ±250 °/s full scale
    pub const GYRO_LSB_PER_DPS: f32 = 131.0;
    pub const TEMP_LSB_PER_C: f32 = 340.0;
    pub const TEMP_OFFSET_C: f32 = 36.53;
}
