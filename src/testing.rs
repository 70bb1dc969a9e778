//! Host-side stand-ins for the board peripherals.

use core::convert::Infallible;

use embedded_hal::digital::{self, OutputPin, StatefulOutputPin};
use embedded_hal::pwm::{self, SetDutyCycle};
use embedded_hal_async::i2c::{self, ErrorKind, NoAcknowledgeSource, Operation};
use embedded_storage_async::nor_flash::{self, NorFlash, NorFlashErrorKind, ReadNorFlash};

/// One I2C device modelled as a flat register file with an auto-incrementing pointer.
pub struct RegisterBus {
    pub addr: u8,
    pub regs: [u8; 256],
    /// Every write transfer, register pointer first.
    pub writes: Vec<Vec<u8>>,
    ptr: u8,
}

impl RegisterBus {
    pub fn new(addr: u8) -> Self {
        Self {
            addr,
            regs: [0; 256],
            writes: Vec::new(),
            ptr: 0,
        }
    }

    pub fn load(&mut self, reg: u8, bytes: &[u8]) {
        let start = reg as usize;
        self.regs[start..start + bytes.len()].copy_from_slice(bytes);
    }
}

impl i2c::ErrorType for RegisterBus {
    type Error = ErrorKind;
}

impl i2c::I2c for RegisterBus {
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if address != self.addr {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }
        for op in operations {
            match op {
                Operation::Write(bytes) => {
                    if let Some((&reg, data)) = bytes.split_first() {
                        self.ptr = reg;
                        for &b in data {
                            self.regs[self.ptr as usize] = b;
                            self.ptr = self.ptr.wrapping_add(1);
                        }
                    }
                    self.writes.push(bytes.to_vec());
                }
                Operation::Read(buf) => {
                    for b in buf.iter_mut() {
                        *b = self.regs[self.ptr as usize];
                        self.ptr = self.ptr.wrapping_add(1);
                    }
                }
            }
        }
        Ok(())
    }
}

/// PWM channel that remembers the last duty written.
pub struct MockPwm {
    pub max: u16,
    pub duty: u16,
}

impl MockPwm {
    pub fn new() -> Self {
        Self { max: 10_000, duty: 0 }
    }

    /// Duty in percent.
    pub fn percent(&self) -> f32 {
        self.duty as f32 * 100.0 / self.max as f32
    }
}

impl pwm::ErrorType for MockPwm {
    type Error = Infallible;
}

impl SetDutyCycle for MockPwm {
    fn max_duty_cycle(&self) -> u16 {
        self.max
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        self.duty = duty;
        Ok(())
    }
}

/// Output pin. `stuck` models a latch that ignores writes.
pub struct MockPin {
    pub high: bool,
    pub stuck: bool,
}

impl MockPin {
    pub fn new() -> Self {
        Self {
            high: false,
            stuck: false,
        }
    }
}

impl digital::ErrorType for MockPin {
    type Error = Infallible;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        if !self.stuck {
            self.high = false;
        }
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        if !self.stuck {
            self.high = true;
        }
        Ok(())
    }
}

impl StatefulOutputPin for MockPin {
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.high)
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.high)
    }
}

/// NOR flash in RAM with STM32G0 geometry: 8-byte writes, 2 KiB pages.
pub struct RamFlash {
    pub data: Vec<u8>,
    pub erases: usize,
}

impl RamFlash {
    pub const PAGE: usize = 2048;

    pub fn new(pages: usize) -> Self {
        Self {
            data: vec![0xFF; pages * Self::PAGE],
            erases: 0,
        }
    }
}

impl nor_flash::ErrorType for RamFlash {
    type Error = NorFlashErrorKind;
}

impl ReadNorFlash for RamFlash {
    const READ_SIZE: usize = 1;

    async fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let start = offset as usize;
        let end = start + bytes.len();
        if end > self.data.len() {
            return Err(NorFlashErrorKind::OutOfBounds);
        }
        bytes.copy_from_slice(&self.data[start..end]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.data.len()
    }
}

impl NorFlash for RamFlash {
    const WRITE_SIZE: usize = 8;
    const ERASE_SIZE: usize = Self::PAGE;

    async fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        let (from, to) = (from as usize, to as usize);
        if from % Self::PAGE != 0 || to % Self::PAGE != 0 {
            return Err(NorFlashErrorKind::NotAligned);
        }
        if to > self.data.len() {
            return Err(NorFlashErrorKind::OutOfBounds);
        }
        self.data[from..to].fill(0xFF);
        self.erases += 1;
        Ok(())
    }

    async fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        let start = offset as usize;
        if start % Self::WRITE_SIZE != 0 || bytes.len() % Self::WRITE_SIZE != 0 {
            return Err(NorFlashErrorKind::NotAligned);
        }
        if start + bytes.len() > self.data.len() {
            return Err(NorFlashErrorKind::OutOfBounds);
        }
        for (cell, &b) in self.data[start..].iter_mut().zip(bytes) {
            // NOR can only clear bits.
            *cell &= b;
        }
        Ok(())
    }
}
