//! Byte-addressable EEPROM emulated on one NOR flash page.
//!
//! The whole image lives in RAM. `commit()` rewrites the page only when
//! something changed. Page layout:
//!
//! ```text
//! | magic (2, LE) | data (EEPROM_SIZE) | crc16 (2, LE) | 0xFF padding |
//! ```
//!
//! A blank or corrupt page loads as an all-zero image.

use crc16::{State, CCITT_FALSE};
use embedded_storage_async::nor_flash::NorFlash;

use crate::config::EEPROM_SIZE;

const MAGIC: u16 = 0xEE5A;
const HEADER_LEN: usize = 2;
const CRC_LEN: usize = 2;
const PAYLOAD_LEN: usize = HEADER_LEN + EEPROM_SIZE + CRC_LEN;
/// Payload rounded up to the largest write granule we support.
const IMAGE_LEN: usize = (PAYLOAD_LEN + 7) / 8 * 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EepromError {
    Flash,
    OutOfRange { addr: usize },
    /// Flash write/erase granularity does not fit the image.
    Geometry,
    NotInitialized,
}

pub struct Eeprom<F> {
    flash: F,
    offset: u32,
    data: [u8; EEPROM_SIZE],
    dirty: bool,
    ready: bool,
}

impl<F: NorFlash> Eeprom<F> {
    /// `offset` must be the start of an erase page reserved for the EEPROM.
    pub fn new(flash: F, offset: u32) -> Self {
        Self {
            flash,
            offset,
            data: [0; EEPROM_SIZE],
            dirty: false,
            ready: false,
        }
    }

    /// Load the image from flash.
    pub async fn begin(&mut self) -> Result<(), EepromError> {
        if IMAGE_LEN % F::WRITE_SIZE != 0
            || IMAGE_LEN > F::ERASE_SIZE
            || self.offset as usize % F::ERASE_SIZE != 0
            || self.offset as usize + F::ERASE_SIZE > self.flash.capacity()
        {
            error!("ERROR: EEPROM initialization failure.");
            return Err(EepromError::Geometry);
        }

        let mut image = [0u8; IMAGE_LEN];
        if self.flash.read(self.offset, &mut image).await.is_err() {
            error!("ERROR: EEPROM initialization failure.");
            return Err(EepromError::Flash);
        }

        match decode_image(&image) {
            Some(data) => self.data.copy_from_slice(data),
            None => {
                debug!("EEPROM page blank or corrupt, starting from zeros");
                self.data = [0; EEPROM_SIZE];
            }
        }
        self.dirty = false;
        self.ready = true;
        info!("Successfully initialized EEPROM, size = {}.", EEPROM_SIZE);
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn len(&self) -> usize {
        EEPROM_SIZE
    }

    pub fn read(&self, addr: usize) -> Result<u8, EepromError> {
        self.check(addr, 1)?;
        Ok(self.data[addr])
    }

    pub fn read_slice(&self, addr: usize, out: &mut [u8]) -> Result<(), EepromError> {
        self.check(addr, out.len())?;
        out.copy_from_slice(&self.data[addr..addr + out.len()]);
        Ok(())
    }

    /// Stage a byte. Nothing reaches flash until [`commit`](Self::commit).
    pub fn write(&mut self, addr: usize, value: u8) -> Result<(), EepromError> {
        self.check(addr, 1)?;
        if self.data[addr] != value {
            self.data[addr] = value;
            self.dirty = true;
        }
        Ok(())
    }

    pub fn write_slice(&mut self, addr: usize, bytes: &[u8]) -> Result<(), EepromError> {
        self.check(addr, bytes.len())?;
        let dst = &mut self.data[addr..addr + bytes.len()];
        if dst != bytes {
            dst.copy_from_slice(bytes);
            self.dirty = true;
        }
        Ok(())
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub async fn commit(&mut self) -> Result<(), EepromError> {
        if !self.ready {
            return Err(EepromError::NotInitialized);
        }
        if !self.dirty {
            return Ok(());
        }

        let image = encode_image(&self.data);
        let page_end = self.offset + F::ERASE_SIZE as u32;
        self.flash
            .erase(self.offset, page_end)
            .await
            .map_err(|_| EepromError::Flash)?;
        self.flash
            .write(self.offset, &image)
            .await
            .map_err(|_| EepromError::Flash)?;

        self.dirty = false;
        Ok(())
    }

    /// Increment the byte at `addr` (wrapping), persist it, and return the new value.
    pub async fn count(&mut self, addr: usize) -> Result<u8, EepromError> {
        let data = self.read(addr)?.wrapping_add(1);
        self.write(addr, data)?;
        self.commit().await?;
        Ok(data)
    }

    fn check(&self, addr: usize, len: usize) -> Result<(), EepromError> {
        if !self.ready {
            return Err(EepromError::NotInitialized);
        }
        match addr.checked_add(len) {
            Some(end) if end <= EEPROM_SIZE => Ok(()),
            _ => Err(EepromError::OutOfRange { addr }),
        }
    }
}

fn encode_image(data: &[u8; EEPROM_SIZE]) -> [u8; IMAGE_LEN] {
    let mut image = [0xFFu8; IMAGE_LEN];
    image[..HEADER_LEN].copy_from_slice(&MAGIC.to_le_bytes());
    image[HEADER_LEN..HEADER_LEN + EEPROM_SIZE].copy_from_slice(data);
    let crc = State::<CCITT_FALSE>::calculate(&image[..HEADER_LEN + EEPROM_SIZE]);
    image[HEADER_LEN + EEPROM_SIZE..PAYLOAD_LEN].copy_from_slice(&crc.to_le_bytes());
    image
}

fn decode_image(image: &[u8; IMAGE_LEN]) -> Option<&[u8]> {
    if u16::from_le_bytes([image[0], image[1]]) != MAGIC {
        return None;
    }
    let body = &image[..HEADER_LEN + EEPROM_SIZE];
    let crc = u16::from_le_bytes([image[HEADER_LEN + EEPROM_SIZE], image[PAYLOAD_LEN - 1]]);
    if State::<CCITT_FALSE>::calculate(body) != crc {
        return None;
    }
    Some(&body[HEADER_LEN..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EEPROM_BASE_ADDR;
    use crate::testing::RamFlash;
    use embassy_futures::block_on;

    const OFFSET: u32 = RamFlash::PAGE as u32;

    fn fresh() -> Eeprom<RamFlash> {
        let mut e = Eeprom::new(RamFlash::new(2), OFFSET);
        block_on(e.begin()).unwrap();
        e
    }

    #[test]
    fn test_blank_page_reads_zero() {
        let e = fresh();
        assert_eq!(e.len(), 100);
        assert!((0..e.len()).all(|a| e.read(a) == Ok(0)));
    }

    #[test]
    fn test_count_increments_and_persists() {
        let mut e = fresh();
        assert_eq!(block_on(e.count(EEPROM_BASE_ADDR)), Ok(1));
        assert_eq!(block_on(e.count(EEPROM_BASE_ADDR)), Ok(2));

        // Power cycle
        let mut e2 = Eeprom::new(e.flash, OFFSET);
        block_on(e2.begin()).unwrap();
        assert_eq!(e2.read(EEPROM_BASE_ADDR), Ok(2));
    }

    #[test]
    fn test_count_wraps() {
        let mut e = fresh();
        e.write(5, 0xFF).unwrap();
        assert_eq!(block_on(e.count(5)), Ok(0));
    }

    #[test]
    fn test_commit_skips_clean_image() {
        let mut e = fresh();
        block_on(e.commit()).unwrap();
        assert_eq!(e.flash.erases, 0);

        e.write(3, 7).unwrap();
        e.write(3, 7).unwrap();
        block_on(e.commit()).unwrap();
        assert_eq!(e.flash.erases, 1);
        assert!(!e.is_dirty());
    }

    #[test]
    fn test_out_of_range() {
        let mut e = fresh();
        assert_eq!(e.read(100), Err(EepromError::OutOfRange { addr: 100 }));
        assert_eq!(
            e.write_slice(98, &[1, 2, 3]),
            Err(EepromError::OutOfRange { addr: 98 })
        );
    }

    #[test]
    fn test_corrupt_page_falls_back_to_zero() {
        let mut e = fresh();
        e.write_slice(10, &[1, 2, 3, 4]).unwrap();
        block_on(e.commit()).unwrap();

        let mut flash = e.flash;
        flash.data[OFFSET as usize + HEADER_LEN + 11] ^= 0x01;
        let mut e2 = Eeprom::new(flash, OFFSET);
        block_on(e2.begin()).unwrap();
        assert_eq!(e2.read(10), Ok(0));
    }

    #[test]
    fn test_use_before_begin() {
        let e = Eeprom::new(RamFlash::new(1), 0);
        assert_eq!(e.read(0), Err(EepromError::NotInitialized));
    }

    #[test]
    fn test_misaligned_offset_rejected() {
        let mut e = Eeprom::new(RamFlash::new(2), 100);
        assert_eq!(block_on(e.begin()), Err(EepromError::Geometry));
    }
}
