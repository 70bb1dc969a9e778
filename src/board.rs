use embassy_embedded_hal::adapter::BlockingAsync;
use embassy_embedded_hal::shared_bus::asynch::i2c::I2cDevice;
use embassy_stm32::flash::{Blocking, Flash};
use embassy_stm32::mode::Async;
use embassy_stm32::peripherals::{TIM1, TIM3};
use embassy_stm32::spi::SpiSlave;
use embassy_stm32::time::Hertz;
use embassy_stm32::timer::low_level::CountingMode;
use embassy_stm32::timer::simple_pwm::{PwmPin, SimplePwm, SimplePwmChannel};
use embassy_stm32::{
    bind_interrupts,
    gpio::{Level, Output, OutputType, Speed},
    i2c, peripherals, rcc, spi, Config,
};
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::mutex::Mutex;

use crate::config::{HARNESS, I2C_FREQUENCY_HZ, MOTOR_FREQ_HZ, SERVO_FREQ_HZ};

// ── IRQ table ─────────────────────────────────────────────
bind_interrupts!(pub struct Irqs {
    I2C2   => i2c::EventInterruptHandler<peripherals::I2C2>,
              i2c::ErrorInterruptHandler<peripherals::I2C2>;
});

pub type I2cBus = Mutex<NoopRawMutex, i2c::I2c<'static, Async>>;
pub type SharedI2c = I2cDevice<'static, NoopRawMutex, i2c::I2c<'static, Async>>;
pub type ServoPwm = SimplePwmChannel<'static, TIM3>;
pub type MotorPwm = SimplePwmChannel<'static, TIM1>;
pub type EepromFlash = BlockingAsync<Flash<'static, Blocking>>;

/// MCU routing of each `config::HARNESS` entry, same order.
const ROUTING: [&str; 10] = [
    "PB4 TIM3_CH1",
    "PB5 TIM3_CH2",
    "PA8 TIM1_CH1",
    "PB0",
    "PB3 TIM1_CH2",
    "PB1",
    "PA10 TIM1_CH3",
    "PB2",
    "PC6",
    "PA11 TIM1_CH4",
];

pub struct MotorPins {
    pub sig: MotorPwm,
    pub dir: Output<'static>,
}

// ── Board struct ──────────────────────────────────────────
pub struct Board {
    pub i2c2: i2c::I2c<'static, Async>, // DMA
    pub spi1: SpiSlave<'static, Async>, // DMA
    pub data_ready_spi: Output<'static>,
    pub rotunda: ServoPwm,
    pub elbow: ServoPwm,
    pub shoulder: MotorPins,
    pub wrist_left: MotorPins,
    pub wrist_right: MotorPins,
    pub claw_phase: Output<'static>,
    pub claw_enable: MotorPwm,
    pub flash: EepromFlash,
}

impl Board {
    pub fn init() -> Self {
        let mut config = Config::default();

        // HSI 16 MHz -> PLL -> 64 MHz SYSCLK
        config.rcc.hsi = Some(rcc::Hsi {
            sys_div: rcc::HsiSysDiv::DIV1,
        });
        config.rcc.pll = Some(rcc::Pll {
            source: rcc::PllSource::HSI,
            prediv: rcc::PllPreDiv::DIV2,   // 16MHz / 2 = 8MHz
            mul: rcc::PllMul::MUL16,        // 8MHz * 16 = 128MHz
            divp: None,
            divq: None,
            divr: Some(rcc::PllRDiv::DIV2), // 128MHz / 2 = 64MHz
        });
        config.rcc.sys = rcc::Sysclk::PLL1_R;
        let p = embassy_stm32::init(config);

        let data_ready_spi = Output::new(p.PA9, Level::Low, Speed::Low);

        // I²C2  (DMA CH7 TX, CH6 RX), shared by both IMUs
        let mut i2c_cfg = i2c::Config::default();
        i2c_cfg.sda_pullup = false;
        i2c_cfg.scl_pullup = false;

        let i2c2 = i2c::I2c::new(
            p.I2C2,
            p.PB10,
            p.PB11,
            Irqs,
            p.DMA1_CH7,
            p.DMA1_CH6,
            Hertz(I2C_FREQUENCY_HZ),
            i2c_cfg,
        );

        // SPI1 slave  (DMA CH5 TX, CH4 RX)
        let mut spi_cfg = spi::ConfigSlave::default();
        spi_cfg.mode = spi::MODE_0;
        let spi1 = SpiSlave::new_hardware_cs(
            p.SPI1,
            p.PA5, p.PA7, p.PA6, p.PA4, // SCK, MOSI, MISO, NSS
            p.DMA1_CH5,          // TX
            p.DMA1_CH4,          // RX
            spi_cfg,
        );

        // TIM3: 50 Hz servo frames
        let servos = SimplePwm::new(
            p.TIM3,
            Some(PwmPin::new_ch1(p.PB4, OutputType::PushPull)),
            Some(PwmPin::new_ch2(p.PB5, OutputType::PushPull)),
            None,
            None,
            Hertz(SERVO_FREQ_HZ),
            CountingMode::EdgeAlignedUp,
        )
        .split();
        let mut rotunda = servos.ch1;
        let mut elbow = servos.ch2;
        rotunda.enable();
        elbow.enable();

        // TIM1: 5 kHz motor drive
        let motors = SimplePwm::new(
            p.TIM1,
            Some(PwmPin::new_ch1(p.PA8, OutputType::PushPull)),
            Some(PwmPin::new_ch2(p.PB3, OutputType::PushPull)),
            Some(PwmPin::new_ch3(p.PA10, OutputType::PushPull)),
            Some(PwmPin::new_ch4(p.PA11, OutputType::PushPull)),
            Hertz(MOTOR_FREQ_HZ),
            CountingMode::EdgeAlignedUp,
        )
        .split();
        let mut shoulder_sig = motors.ch1;
        let mut wrist_left_sig = motors.ch2;
        let mut wrist_right_sig = motors.ch3;
        let mut claw_enable = motors.ch4;
        for ch in [
            &mut shoulder_sig,
            &mut wrist_left_sig,
            &mut wrist_right_sig,
            &mut claw_enable,
        ] {
            ch.set_duty_cycle_fully_off();
            ch.enable();
        }

        let flash = BlockingAsync::new(Flash::new_blocking(p.FLASH));

        for ((pin, function), mcu) in HARNESS.iter().zip(ROUTING) {
            info!("harness {} ({}) -> {}", pin, function, mcu);
        }

        Self {
            i2c2,
            spi1,
            data_ready_spi,
            rotunda,
            elbow,
            shoulder: MotorPins {
                sig: shoulder_sig,
                dir: Output::new(p.PB0, Level::Low, Speed::Low),
            },
            wrist_left: MotorPins {
                sig: wrist_left_sig,
                dir: Output::new(p.PB1, Level::Low, Speed::Low),
            },
            wrist_right: MotorPins {
                sig: wrist_right_sig,
                dir: Output::new(p.PB2, Level::Low, Speed::Low),
            },
            claw_phase: Output::new(p.PC6, Level::Low, Speed::Low),
            claw_enable,
            flash,
        }
    }
}
