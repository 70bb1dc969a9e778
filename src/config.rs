// Centralize all configuration constants

// ── Sampling & loop timing ───────────────────────────────
pub const IMU_SAMPLE_RATE_HZ: u32 = 100;
pub const IMU_SAMPLE_PERIOD_MS: u64 = 1000 / IMU_SAMPLE_RATE_HZ as u64;
pub const MPU6050_SAMPLE_PERIOD_MS: u64 = 20;
pub const I2C_FREQUENCY_HZ: u32 = 100_000;

/// One 50 Hz servo frame.
pub const SERVO_UPDATE_PERIOD_MS: u64 = 20;
pub const SERVO_EMA_ALPHA: f32 = 0.2;
pub const SERVO_SETTLE_EPSILON: f32 = 0.5;

pub const SHOULDER_CHECK_PERIOD_MS: u64 = 10;
pub const SHOULDER_SPEED_PCT: u8 = 100;
/// Orientation older than this is not trusted for limit checks.
pub const IMU_STALE_MS: u64 = 100;

pub const WRIST_SPEED_PCT: u8 = 100;
/// Output rate of the wrist gearbox at full duty.
pub const WRIST_DEG_PER_SEC: f32 = 45.0;

/// Consecutive IMU read failures before the system channel is alerted.
pub const IMU_ERROR_ALERT_THRESHOLD: u32 = 50;

/// How long the host gets to clock out a reply once data-ready is raised.
pub const HOST_RESPONSE_TIMEOUT_MS: u64 = 500;

pub const TELEMETRY_PERIOD_MS: u64 = 100;
pub const HEARTBEAT_PERIOD_MS: u64 = 1000;
/// Minimum spacing between EEPROM commits of the pose record.
pub const PERSIST_MIN_INTERVAL_MS: u64 = 2000;

// Channel sizes
pub const IMU_CHANNEL_SIZE: usize = 16;
pub const SYSTEM_CHANNEL_SIZE: usize = 32;
pub const STORAGE_CHANNEL_SIZE: usize = 8;

// ── EEPROM ────────────────────────────────────────────────
pub const EEPROM_SIZE: usize = 0x64;
pub const EEPROM_BASE_ADDR: usize = 0x00;
/// Last 2 KiB page of the 128 KiB STM32G071RB flash, relative to the flash base.
pub const EEPROM_FLASH_OFFSET: u32 = 126 * 1024;

// ── IMUs ──────────────────────────────────────────────────
pub const IMU_ADDRESS_SHOULDER: u8 = crate::drivers::imu::regs::bno055::ADDR1;
pub const MPU6050_ADDRESS: u8 = crate::drivers::imu::regs::mpu6050::ADDR0;

// ── Harness pins ──────────────────────────────────────────
// Connector numbering of the arm wiring harness. `board` routes each one to an MCU pin.
pub const ACT_PHASE_PIN: u8 = 5;
pub const ACT_ENABLE_PIN: u8 = 17;
pub const ROTUNDA_PIN: u8 = 19; // Servo 1
pub const ELBOW_PIN: u8 = 27; // Servo 2
pub const SHOULDER_SIG_PIN: u8 = 25;
pub const SHOULDER_DIR_PIN: u8 = 26;
pub const WRIST_LEFT_SIG_PIN: u8 = 0;
pub const WRIST_LEFT_DIR_PIN: u8 = 2;
pub const WRIST_RIGHT_SIG_PIN: u8 = 16;
pub const WRIST_RIGHT_DIR_PIN: u8 = 4; // port 2

/// (harness pin, function) pairs, logged at boot next to their MCU routing.
pub const HARNESS: [(u8, &str); 10] = [
    (ROTUNDA_PIN, "rotunda servo"),
    (ELBOW_PIN, "elbow servo"),
    (SHOULDER_SIG_PIN, "shoulder signal"),
    (SHOULDER_DIR_PIN, "shoulder direction"),
    (WRIST_LEFT_SIG_PIN, "wrist left signal"),
    (WRIST_LEFT_DIR_PIN, "wrist left direction"),
    (WRIST_RIGHT_SIG_PIN, "wrist right signal"),
    (WRIST_RIGHT_DIR_PIN, "wrist right direction"),
    (ACT_PHASE_PIN, "claw phase"),
    (ACT_ENABLE_PIN, "claw enable"),
];

// ── Joint tables ──────────────────────────────────────────

/// Positional hobby servo driven by a 50 Hz pulse train.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ServoJointConfig {
    pub pos_min: f32,
    pub pos_max: f32,
    /// Position span covered by `duty_min_pct..duty_max_pct`.
    pub range: f32,
    pub start_pos: f32,
    pub freq_hz: u32,
    pub duty_min_pct: f32,
    pub duty_max_pct: f32,
}

/// Brushed DC joint: PWM on the signal pin, level on the direction pin.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotorJointConfig {
    /// Angular limits in degrees.
    pub limit_min: f32,
    pub limit_max: f32,
    pub freq_hz: u32,
    pub enable_pwm_min_pct: u8,
    pub enable_pwm_max_pct: u8,
}

pub const MOTOR_FREQ_HZ: u32 = 5000;
pub const SERVO_FREQ_HZ: u32 = 50;

/// Rotunda position is tenths of a degree over a full turn.
pub const ROTUNDA: ServoJointConfig = ServoJointConfig {
    pos_min: 0.0,
    pos_max: 3600.0,
    range: 3600.0,
    start_pos: 1800.0,
    freq_hz: SERVO_FREQ_HZ,
    duty_min_pct: 2.5,
    duty_max_pct: 12.5,
};
/// Where in the duty span the rotunda starts, in percent.
pub const ROTUNDA_START_DUTY_PCT: f32 = 50.0;

pub const ELBOW: ServoJointConfig = ServoJointConfig {
    pos_min: 100.0,
    pos_max: 290.0,
    range: 300.0,
    start_pos: 150.0,
    freq_hz: SERVO_FREQ_HZ,
    duty_min_pct: 2.5,
    duty_max_pct: 12.5,
};

pub const SHOULDER: MotorJointConfig = MotorJointConfig {
    limit_min: 5.0,
    limit_max: 70.0,
    freq_hz: MOTOR_FREQ_HZ,
    enable_pwm_min_pct: 0,
    enable_pwm_max_pct: 100,
};

/// Pitch limits of the differential wrist. Roll is unbounded.
pub const WRIST: MotorJointConfig = MotorJointConfig {
    limit_min: -90.0,
    limit_max: 90.0,
    freq_hz: MOTOR_FREQ_HZ,
    enable_pwm_min_pct: 0,
    enable_pwm_max_pct: 100,
};

pub const CLAW_MAX_SPEED_PCT: i32 = 100;
