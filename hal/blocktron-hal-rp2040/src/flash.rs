//! Flash-backed update state for RP2040
//!
//! Uses sequential-storage for wear-leveled key-value storage in the
//! last 16KB of flash. Each `NvmKey` is stored as a one-byte item.
//!
//! Implements the `NvmStorage` trait from `blocktron-hal`.

use embassy_rp::dma::Channel;
use embassy_rp::flash::{Async, Flash, ERASE_SIZE};
use embassy_rp::peripherals::FLASH;
use embassy_rp::Peri;
use embedded_storage_async::nor_flash::NorFlash;
use sequential_storage::cache::NoCache;
use sequential_storage::map;

// Re-export shared types from blocktron-hal
pub use blocktron_hal::nvm::{NvmError, NvmKey};

/// Flash storage configuration
pub const FLASH_SIZE: usize = 2 * 1024 * 1024; // 2MB flash on Pico W
pub const STATE_PARTITION_SIZE: usize = 4 * ERASE_SIZE; // 16KB for update state
pub const STATE_PARTITION_START: usize = FLASH_SIZE - STATE_PARTITION_SIZE;

/// Flash range for the state partition
pub const STATE_RANGE: core::ops::Range<u32> =
    (STATE_PARTITION_START as u32)..(FLASH_SIZE as u32);

/// Scratch buffer size for map operations (key + value + item header)
const ITEM_BUFFER_SIZE: usize = 32;

/// RP2040 non-volatile update state
///
/// Every write is awaited through to flash before it returns, so the
/// stored byte survives a power cut immediately afterwards.
pub struct Rp2040Nvm<'d> {
    flash: Flash<'d, FLASH, Async, FLASH_SIZE>,
}

impl<'d> Rp2040Nvm<'d> {
    /// Create a new NVM instance
    pub fn new(flash: Peri<'d, FLASH>, dma: Peri<'d, impl Channel>) -> Self {
        Self {
            flash: Flash::new(flash, dma),
        }
    }

    /// Erase the whole state partition
    ///
    /// Every key reads as `NotFound` afterwards.
    pub async fn erase(&mut self) -> Result<(), NvmError> {
        self.flash
            .erase(STATE_RANGE.start, STATE_RANGE.end)
            .await
            .map_err(|_| NvmError::Flash)
    }
}

impl<'d> blocktron_hal::NvmStorage for Rp2040Nvm<'d> {
    async fn read(&mut self, key: NvmKey) -> Result<u8, NvmError> {
        let mut data_buffer = [0u8; ITEM_BUFFER_SIZE];

        let result = map::fetch_item::<NvmKey, &[u8], _>(
            &mut self.flash,
            STATE_RANGE,
            &mut NoCache::new(),
            &mut data_buffer,
            &key,
        )
        .await;

        match result {
            Ok(Some(data)) => data.first().copied().ok_or(NvmError::Corrupted),
            Ok(None) => Err(NvmError::NotFound),
            Err(sequential_storage::Error::Corrupted { .. }) => Err(NvmError::Corrupted),
            Err(_) => Err(NvmError::Storage),
        }
    }

    async fn write(&mut self, key: NvmKey, value: u8) -> Result<(), NvmError> {
        let mut data_buffer = [0u8; ITEM_BUFFER_SIZE];
        let item: &[u8] = &[value];

        map::store_item(
            &mut self.flash,
            STATE_RANGE,
            &mut NoCache::new(),
            &mut data_buffer,
            &key,
            &item,
        )
        .await
        .map_err(|e| match e {
            sequential_storage::Error::FullStorage => NvmError::Full,
            _ => NvmError::Storage,
        })
    }
}
